//! Order Models

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use jiff::Timestamp;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tome::{
    pricing::{OrderTotals, PricedLine, PricingError, order_totals},
    status::OrderStatus,
};

use crate::domain::{catalog::models::BookUuid, users::models::UserId};

const ORDER_ID_PREFIX: &str = "ORD";
const ORDER_ID_SUFFIX_LEN: usize = 7;
const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Human-readable order number, `ORD-<unix millis>-<7 base-36 chars>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Generate an order number for an order placed at `placed_at`.
    pub fn generate(placed_at: Timestamp, rng: &mut impl Rng) -> Self {
        let suffix: String = (0..ORDER_ID_SUFFIX_LEN)
            .map(|_| char::from(BASE36[rng.gen_range(0..BASE36.len())]))
            .collect();

        Self(format!(
            "{ORDER_ID_PREFIX}-{}-{suffix}",
            placed_at.as_millisecond()
        ))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Transfer,
    Phone,
    Kakao,
}

impl PaymentMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Transfer => "transfer",
            Self::Phone => "phone",
            Self::Kakao => "kakao",
        }
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "card" => Ok(Self::Card),
            "transfer" => Ok(Self::Transfer),
            "phone" => Ok(Self::Phone),
            "kakao" => Ok(Self::Kakao),
            other => Err(format!("unknown payment method: {other}")),
        }
    }
}

/// Payment and delivery details captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub payment_method: PaymentMethod,
    pub recipient: String,
    pub phone: String,
    pub address: String,
    pub detail_address: String,
    pub zip_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_request: Option<String>,
}

/// Book details as they were when the order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub book_id: BookUuid,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub cover_image: String,
    pub price: u64,
    pub quantity: u32,
}

impl OrderItem {
    #[must_use]
    pub const fn priced(&self) -> PricedLine {
        PricedLine::new(self.price, self.quantity)
    }
}

/// Order Model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total_amount: u64,
    pub delivery_fee: u64,
    pub final_amount: u64,
    #[serde(flatten)]
    pub payment: PaymentInfo,
    pub status: OrderStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Order {
    /// Totals implied by the current items.
    ///
    /// # Errors
    ///
    /// Returns an error if the amounts overflow.
    pub fn computed_totals(&self) -> Result<OrderTotals, PricingError> {
        let lines: Vec<PricedLine> = self.items.iter().map(OrderItem::priced).collect();

        order_totals(&lines)
    }

    pub(crate) fn apply_totals(&mut self, totals: OrderTotals) {
        self.total_amount = totals.total_amount;
        self.delivery_fee = totals.delivery_fee;
        self.final_amount = totals.final_amount;
    }

    #[must_use]
    pub fn units(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }
}

/// One requested line of a checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutLine {
    pub book: BookUuid,
    pub quantity: u32,
}

/// Units to cancel from the order line at `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSelection {
    pub index: usize,
    pub quantity: u32,
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};
    use testresult::TestResult;

    use super::*;

    #[test]
    fn order_ids_carry_timestamp_and_base36_suffix() -> TestResult {
        let mut rng = StdRng::seed_from_u64(7);
        let placed_at = Timestamp::from_millisecond(1_700_000_000_123)?;

        let id = OrderId::generate(placed_at, &mut rng);
        let suffix = id
            .as_str()
            .strip_prefix("ORD-1700000000123-")
            .ok_or("missing prefix")?;

        assert_eq!(suffix.len(), 7);
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );

        Ok(())
    }

    #[test]
    fn payment_is_flattened_into_the_order_document() -> TestResult {
        let order = Order {
            order_id: OrderId::from("ORD-1-ABCDEFG"),
            user_id: UserId::from("KT"),
            items: Vec::new(),
            total_amount: 0,
            delivery_fee: 0,
            final_amount: 0,
            payment: PaymentInfo {
                payment_method: PaymentMethod::Kakao,
                recipient: "Kim".to_string(),
                phone: "010-0000-0000".to_string(),
                address: "Seoul".to_string(),
                detail_address: "101".to_string(),
                zip_code: "04524".to_string(),
                delivery_request: None,
            },
            status: OrderStatus::Paid,
            created_at: Timestamp::UNIX_EPOCH,
            updated_at: Timestamp::UNIX_EPOCH,
        };

        let value = serde_json::to_value(&order)?;

        assert_eq!(value["paymentMethod"], "kakao");
        assert_eq!(value["zipCode"], "04524");
        assert_eq!(value["status"], "paid");

        Ok(())
    }
}
