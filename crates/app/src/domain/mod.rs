//! Tome Domain Concerns

pub mod carts;
pub mod catalog;
pub mod orders;
pub mod purchases;
pub mod users;
