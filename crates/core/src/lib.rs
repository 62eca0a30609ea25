//! Tome
//!
//! Tome holds the pure bookstore rules shared by every storage and service layer: order pricing,
//! refund penalties, stock arithmetic and the order and purchase status machines.

pub mod pricing;
pub mod refunds;
pub mod status;
pub mod stock;
