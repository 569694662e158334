pub mod get;

pub use get::{DependentCounts, GetDatasetError, GetDatasetQuery, GetDatasetResponse};
