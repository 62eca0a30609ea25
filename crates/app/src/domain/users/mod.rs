//! Users

pub(crate) mod directory;
pub mod errors;
pub mod models;
pub(crate) mod password;
pub mod service;

pub use errors::UsersServiceError;
pub use service::*;
