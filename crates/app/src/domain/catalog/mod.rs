//! Catalog

pub mod errors;
pub(crate) mod history;
pub mod models;
pub mod service;
pub(crate) mod store;

pub use errors::CatalogServiceError;
pub use service::*;
