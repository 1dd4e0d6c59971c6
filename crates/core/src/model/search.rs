use serde::{Deserialize, Serialize};

use super::Dataset;

/// One hit of a dataset search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(default)]
    pub total_rows: u64,
    pub view: Dataset,
}

/// A page of dataset search results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    /// Total number of matches across all pages.
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

impl SearchResults {
    pub fn datasets(&self) -> impl Iterator<Item = &Dataset> {
        self.results.iter().map(|r| &r.view)
    }
}

/// Parameters of a dataset search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub limit: u32,
    /// 1-indexed page.
    pub page: u32,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            limit: 20,
            page: 1,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }
}
