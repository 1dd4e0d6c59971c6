//! URL layout of the service API.

use crate::model::SearchQuery;

const API_BASE_PATH: &str = "api";
const VIEWS_BASE_PATH: &str = "views";
const IMPORTS_BASE_PATH: &str = "imports2";
const GEOCODING_BASE_PATH: &str = "geocoding";
const SEARCH_BASE_PATH: &str = "search/views";

/// Builds request URLs relative to a service domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    api: String,
}

impl Endpoints {
    /// `domain` is the service root, e.g. "https://data.example.org".
    pub fn new(domain: &str) -> Self {
        Self {
            api: format!("{}/{}", domain.trim().trim_end_matches('/'), API_BASE_PATH),
        }
    }

    pub fn api_root(&self) -> &str {
        &self.api
    }

    pub fn views(&self) -> String {
        format!("{}/{}", self.api, VIEWS_BASE_PATH)
    }

    pub fn view(&self, id: &str) -> String {
        format!("{}/{}", self.views(), urlencoding::encode(id))
    }

    pub fn publication(&self, id: &str) -> String {
        format!("{}/publication", self.view(id))
    }

    pub fn working_copy(&self, id: &str) -> String {
        format!("{}?method=copy", self.publication(id))
    }

    pub fn imports(&self) -> String {
        format!("{}/{}", self.api, IMPORTS_BASE_PATH)
    }

    pub fn scan(&self, file_name: &str) -> String {
        format!(
            "{}?method=scan&name={}",
            self.imports(),
            urlencoding::encode(file_name)
        )
    }

    pub fn pending_geocoding(&self, id: &str) -> String {
        format!(
            "{}/{}/{}?method=pending",
            self.api,
            GEOCODING_BASE_PATH,
            urlencoding::encode(id)
        )
    }

    pub fn search(&self, query: &SearchQuery) -> String {
        format!(
            "{}/{}?q={}&limit={}&page={}",
            self.api,
            SEARCH_BASE_PATH,
            urlencoding::encode(&query.text),
            query.limit,
            query.page
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let endpoints = Endpoints::new("https://data.example.org/");
        assert_eq!(endpoints.api_root(), "https://data.example.org/api");
    }

    #[test]
    fn test_view_urls() {
        let endpoints = Endpoints::new("https://data.example.org");
        assert_eq!(endpoints.views(), "https://data.example.org/api/views");
        assert_eq!(
            endpoints.publication("abcd-1234"),
            "https://data.example.org/api/views/abcd-1234/publication"
        );
        assert_eq!(
            endpoints.working_copy("abcd-1234"),
            "https://data.example.org/api/views/abcd-1234/publication?method=copy"
        );
    }

    #[test]
    fn test_import_urls() {
        let endpoints = Endpoints::new("https://data.example.org");
        assert_eq!(endpoints.imports(), "https://data.example.org/api/imports2");
        assert_eq!(
            endpoints.scan("crimes 2012.csv"),
            "https://data.example.org/api/imports2?method=scan&name=crimes%202012.csv"
        );
    }

    #[test]
    fn test_geocoding_and_search_urls() {
        let endpoints = Endpoints::new("https://data.example.org");
        assert_eq!(
            endpoints.pending_geocoding("abcd-1234"),
            "https://data.example.org/api/geocoding/abcd-1234?method=pending"
        );
        assert_eq!(
            endpoints.search(&SearchQuery::new("crime & punishment").with_page(2)),
            "https://data.example.org/api/search/views?q=crime%20%26%20punishment&limit=20&page=2"
        );
    }

    #[test]
    fn test_ids_are_path_encoded() {
        let endpoints = Endpoints::new("https://data.example.org");
        assert_eq!(
            endpoints.view("../admin"),
            "https://data.example.org/api/views/..%2Fadmin"
        );
    }
}
