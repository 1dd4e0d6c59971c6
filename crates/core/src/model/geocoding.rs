use serde::{Deserialize, Serialize};

/// Outstanding geocoding work for a dataset. Always a fresh read.
///
/// The count is required: a body without it is not a status and must not
/// read as drained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeocodingStatus {
    #[serde(rename = "total", alias = "pendingCount")]
    pub pending_count: u64,
}

impl GeocodingStatus {
    pub fn is_drained(&self) -> bool {
        self.pending_count == 0
    }
}
