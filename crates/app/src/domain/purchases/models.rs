//! Purchase Models

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tome::status::PurchaseStatus;

use crate::{
    domain::{catalog::models::BookUuid, users::models::UserId},
    uuids::TypedUuid,
};

/// Purchase Record UUID
pub type PurchaseUuid = TypedUuid<PurchaseRecord>;

/// One physical unit of one book bought by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    pub id: PurchaseUuid,
    pub book_id: BookUuid,
    pub user_id: UserId,
    pub purchase_date: Timestamp,
    pub status: PurchaseStatus,
}

impl PurchaseRecord {
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.status.is_active()
    }
}
