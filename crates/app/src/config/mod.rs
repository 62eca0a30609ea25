//! Runtime configuration
//!
//! Settings are read from CLI arguments, then environment variables (a `.env` file is loaded
//! first when present), then the defaults below.

mod db;
mod logging;

pub use db::DatabaseConfig;
pub use logging::{LogFormat, LoggingConfig};
