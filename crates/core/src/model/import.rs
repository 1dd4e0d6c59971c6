use serde::{Deserialize, Serialize};

/// Result of uploading a file for sniffing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    /// Handle of the uploaded file on the service, quoted back on commit.
    pub file_id: String,
    #[serde(default)]
    pub summary: ScanSummary,
}

impl ScanResult {
    /// Column guesses in file order.
    pub fn inferred_columns(&self) -> &[ColumnGuess] {
        &self.summary.columns
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    #[serde(default)]
    pub columns: Vec<ColumnGuess>,
    /// Number of header rows the service detected.
    #[serde(default)]
    pub headers: i64,
}

/// The service's guess for one column of a scanned file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnGuess {
    pub name: String,
    /// Suggested datatype (e.g. "text", "number", "calendar_date").
    #[serde(default = "default_datatype")]
    pub suggestion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processor: Option<String>,
}

fn default_datatype() -> String {
    "text".to_string()
}

/// Target schema of an import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Leading rows of the file to ignore (headers).
    #[serde(rename = "skip", default)]
    pub skip_rows: u32,
    #[serde(default)]
    pub columns: Vec<BlueprintColumn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueprintColumn {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub datatype: String,
}

impl BlueprintColumn {
    pub fn new(name: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            datatype: datatype.into(),
        }
    }
}

/// Positional mapping from source fields to blueprint columns.
///
/// Entry `i` feeds column `i`; there are no keys, so order is the contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Translation(Vec<String>);

impl Translation {
    pub fn new(entries: Vec<String>) -> Self {
        Self(entries)
    }

    /// Maps every blueprint column to itself.
    pub fn identity(blueprint: &Blueprint) -> Self {
        Self(blueprint.columns.iter().map(|c| c.name.clone()).collect())
    }

    pub fn entries(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for Translation {
    fn from(entries: Vec<String>) -> Self {
        Self(entries)
    }
}
