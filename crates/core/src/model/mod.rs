//! Resource shapes exchanged with the dataset service.

mod dataset;
mod geocoding;
mod import;
mod search;

pub use dataset::*;
pub use geocoding::*;
pub use import::*;
pub use search::*;
