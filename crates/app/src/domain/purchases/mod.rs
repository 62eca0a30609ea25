//! Purchases

pub(crate) mod ledger;
pub mod models;
