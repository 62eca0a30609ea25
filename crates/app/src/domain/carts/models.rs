//! Cart Models

use serde::{Deserialize, Serialize};

use crate::domain::catalog::models::BookUuid;

/// One cart line with the title and price shown when it was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub book_id: BookUuid,
    pub title: String,
    pub price: u64,
    pub quantity: u32,
}

