//! Shared test helpers.

mod clock;
mod context;

pub use context::TestContext;

use crate::domain::orders::models::{PaymentInfo, PaymentMethod};

pub fn payment_info() -> PaymentInfo {
    PaymentInfo {
        payment_method: PaymentMethod::Card,
        recipient: "Kim Minji".to_string(),
        phone: "010-1234-5678".to_string(),
        address: "12 Sejong-daero, Jung-gu, Seoul".to_string(),
        detail_address: "Apt 301".to_string(),
        zip_code: "04524".to_string(),
        delivery_request: Some("Leave at the door".to_string()),
    }
}
