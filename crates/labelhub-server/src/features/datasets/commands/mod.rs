pub mod delete;

pub use delete::{DeleteDatasetCommand, DeleteDatasetError};
