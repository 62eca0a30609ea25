//! Bookstore services: catalog, carts, users, and the order reconciliation engine over a
//! versioned document store.

pub mod clock;
pub mod config;
pub mod context;
pub mod database;
pub(crate) mod documents;
pub mod domain;
pub mod observability;
pub mod storage;

#[cfg(test)]
mod test;

mod uuids;
