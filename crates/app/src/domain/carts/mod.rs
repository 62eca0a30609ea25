//! Carts

pub mod errors;
pub mod models;
pub mod service;
pub(crate) mod store;

pub use errors::CartsServiceError;
pub use service::*;
