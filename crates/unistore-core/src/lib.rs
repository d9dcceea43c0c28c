pub mod config;
pub mod content_type;
pub mod error;
pub mod service;
pub mod types;
pub mod validate;

pub use error::{Backend, Result, StorageError, ValidationError};
pub use service::StorageService;
