//! Orders
//!
//! The order store and the reconciliation service that keeps stock, purchase records and orders
//! consistent.

pub(crate) mod book;
pub mod errors;
pub mod models;
pub mod service;

pub use errors::OrdersServiceError;
pub use service::*;
