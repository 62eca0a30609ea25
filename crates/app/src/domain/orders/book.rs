//! Order Store
//!
//! Orders are persisted per user under `orders_<userId>`. Totals are recomputed from the items
//! whenever the items change, so `finalAmount = totalAmount + deliveryFee` holds on every order
//! that is not cancelled.

use jiff::Timestamp;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tome::{
    pricing::{OrderTotals, PricingError},
    status::{OrderStatus, TransitionError},
};

use crate::{
    database::Transaction,
    documents::DocumentKey,
    domain::{
        catalog::models::BookUuid,
        orders::models::{LineSelection, Order, OrderId, OrderItem, PaymentInfo},
        users::models::UserId,
    },
    storage::StorageError,
};

#[derive(Debug, Error, PartialEq)]
pub(crate) enum OrderBookError {
    #[error("order {0} not found")]
    NotFound(OrderId),

    #[error("order {0} is already cancelled")]
    AlreadyCancelled(OrderId),

    #[error("invalid selection for line {index}")]
    InvalidSelection { index: usize },

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// Units released from an order, per book.
pub(crate) type Released = Vec<(BookUuid, u32)>;

#[derive(Debug)]
pub(crate) struct OrderBook {
    owner: UserId,
    orders: Vec<Order>,
}

impl OrderBook {
    pub(crate) async fn load(tx: &Transaction, owner: &UserId) -> Result<Self, StorageError> {
        Ok(Self {
            owner: owner.clone(),
            orders: tx.load(&DocumentKey::Orders(owner.clone())).await?,
        })
    }

    pub(crate) fn stage(&self, tx: &mut Transaction) -> Result<(), StorageError> {
        tx.stage(&DocumentKey::Orders(self.owner.clone()), &self.orders)
    }

    /// Place a paid order for `items`.
    pub(crate) fn create_order(
        &mut self,
        order_id: OrderId,
        items: Vec<OrderItem>,
        payment: PaymentInfo,
        placed_at: Timestamp,
    ) -> Result<Order, OrderBookError> {
        let mut order = Order {
            order_id,
            user_id: self.owner.clone(),
            items,
            total_amount: 0,
            delivery_fee: 0,
            final_amount: 0,
            payment,
            status: OrderStatus::Paid,
            created_at: placed_at,
            updated_at: placed_at,
        };

        let totals = order.computed_totals()?;

        order.apply_totals(totals);

        self.orders.push(order.clone());

        Ok(order)
    }

    pub(crate) fn get(&self, order_id: &OrderId) -> Option<&Order> {
        self.orders.iter().find(|order| &order.order_id == order_id)
    }

    /// Newest first.
    pub(crate) fn newest_first(&self) -> Vec<Order> {
        let mut orders = self.orders.clone();

        orders.sort_by(|left, right| right.created_at.cmp(&left.created_at));

        orders
    }

    fn get_mut(&mut self, order_id: &OrderId) -> Result<&mut Order, OrderBookError> {
        self.orders
            .iter_mut()
            .find(|order| &order.order_id == order_id)
            .ok_or_else(|| OrderBookError::NotFound(order_id.clone()))
    }

    /// Move an order to the immediate next status.
    pub(crate) fn advance_status(
        &mut self,
        order_id: &OrderId,
        next: OrderStatus,
        now: Timestamp,
    ) -> Result<Order, OrderBookError> {
        let order = self.get_mut(order_id)?;

        order.status = order.status.advance_to(next)?;
        order.updated_at = now;

        Ok(order.clone())
    }

    /// Remove units from the selected lines, dropping lines that reach zero.
    ///
    /// Every selection is checked before the order changes. When no line is left the order is
    /// cancelled: its last item snapshot is kept and every total drops to zero.
    pub(crate) fn cancel_items(
        &mut self,
        order_id: &OrderId,
        selections: &[LineSelection],
        now: Timestamp,
    ) -> Result<(Order, Released), OrderBookError> {
        let order = self.get_mut(order_id)?;

        if order.status.is_cancelled() {
            return Err(OrderBookError::AlreadyCancelled(order_id.clone()));
        }

        let mut requested: FxHashMap<usize, u32> = FxHashMap::default();

        for selection in selections {
            let total = requested.entry(selection.index).or_default();

            *total = total
                .checked_add(selection.quantity)
                .ok_or(OrderBookError::InvalidSelection {
                    index: selection.index,
                })?;
        }

        if requested.is_empty() {
            return Err(OrderBookError::InvalidSelection { index: 0 });
        }

        for (&index, &quantity) in &requested {
            let item = order
                .items
                .get(index)
                .ok_or(OrderBookError::InvalidSelection { index })?;

            if quantity == 0 || quantity > item.quantity {
                return Err(OrderBookError::InvalidSelection { index });
            }
        }

        let snapshot = order.items.clone();
        let mut released = Vec::new();

        for (index, item) in order.items.iter_mut().enumerate() {
            if let Some(&quantity) = requested.get(&index) {
                item.quantity -= quantity;
                released.push((item.book_id, quantity));
            }
        }

        if order.items.iter().all(|item| item.quantity == 0) {
            order.items = snapshot;
            order.status = OrderStatus::Cancelled;
            order.apply_totals(OrderTotals::ZERO);
        } else {
            order.items.retain(|item| item.quantity > 0);

            let totals = order.computed_totals()?;

            order.apply_totals(totals);
        }

        order.updated_at = now;

        Ok((order.clone(), released))
    }

    /// Cancel every remaining unit of an order.
    pub(crate) fn cancel_whole(
        &mut self,
        order_id: &OrderId,
        now: Timestamp,
    ) -> Result<(Order, Released), OrderBookError> {
        let selections: Vec<LineSelection> = self
            .get(order_id)
            .ok_or_else(|| OrderBookError::NotFound(order_id.clone()))?
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| LineSelection {
                index,
                quantity: item.quantity,
            })
            .collect();

        self.cancel_items(order_id, &selections, now)
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::domain::orders::models::PaymentMethod;

    use super::*;

    fn payment() -> PaymentInfo {
        PaymentInfo {
            payment_method: PaymentMethod::Card,
            recipient: "Kim".to_string(),
            phone: "010-1234-5678".to_string(),
            address: "Seoul".to_string(),
            detail_address: "Apt 3".to_string(),
            zip_code: "04524".to_string(),
            delivery_request: None,
        }
    }

    fn item(price: u64, quantity: u32) -> OrderItem {
        OrderItem {
            book_id: BookUuid::new(),
            title: "Demian".to_string(),
            author: "Hermann Hesse".to_string(),
            cover_image: String::new(),
            price,
            quantity,
        }
    }

    fn book_with(items: Vec<OrderItem>) -> Result<(OrderBook, OrderId), OrderBookError> {
        let mut book = OrderBook {
            owner: UserId::from("KT"),
            orders: Vec::new(),
        };
        let order_id = OrderId::from("ORD-1-AAAAAAA");

        book.create_order(order_id.clone(), items, payment(), Timestamp::UNIX_EPOCH)?;

        Ok((book, order_id))
    }

    #[test]
    fn new_orders_are_paid_with_computed_totals() -> TestResult {
        let (book, order_id) = book_with(vec![item(10_000, 2), item(5_000, 1)])?;
        let order = book.get(&order_id).ok_or("missing order")?;

        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.total_amount, 25_000);
        assert_eq!(order.delivery_fee, 3_000);
        assert_eq!(order.final_amount, 28_000);

        Ok(())
    }

    #[test]
    fn status_advances_one_step_at_a_time() -> TestResult {
        let (mut book, order_id) = book_with(vec![item(10_000, 1)])?;

        let result = book.advance_status(&order_id, OrderStatus::Delivered, Timestamp::UNIX_EPOCH);

        assert!(
            matches!(result, Err(OrderBookError::Transition(_))),
            "expected Transition, got {result:?}"
        );
        assert_eq!(
            book.get(&order_id).ok_or("missing order")?.status,
            OrderStatus::Paid
        );

        book.advance_status(&order_id, OrderStatus::Shipped, Timestamp::UNIX_EPOCH)?;
        let order = book.advance_status(&order_id, OrderStatus::Delivered, Timestamp::UNIX_EPOCH)?;

        assert_eq!(order.status, OrderStatus::Delivered);

        Ok(())
    }

    #[test]
    fn partial_cancel_recomputes_totals_and_fee() -> TestResult {
        let (mut book, order_id) = book_with(vec![item(10_000, 3), item(8_000, 1)])?;

        let (order, released) = book.cancel_items(
            &order_id,
            &[LineSelection {
                index: 0,
                quantity: 2,
            }],
            Timestamp::UNIX_EPOCH,
        )?;

        assert_eq!(released.len(), 1);
        assert_eq!(order.total_amount, 18_000);
        assert_eq!(order.delivery_fee, 3_000);
        assert_eq!(order.final_amount, 21_000);
        assert_eq!(order.status, OrderStatus::Paid);

        Ok(())
    }

    #[test]
    fn lines_reaching_zero_are_removed() -> TestResult {
        let (mut book, order_id) = book_with(vec![item(10_000, 1), item(8_000, 1)])?;

        let (order, _) = book.cancel_items(
            &order_id,
            &[LineSelection {
                index: 0,
                quantity: 1,
            }],
            Timestamp::UNIX_EPOCH,
        )?;

        assert_eq!(order.items.len(), 1);
        assert_eq!(order.total_amount, 8_000);

        Ok(())
    }

    #[test]
    fn cancelling_every_line_cancels_the_order() -> TestResult {
        let (mut book, order_id) = book_with(vec![item(10_000, 2), item(8_000, 1)])?;

        let (order, released) = book.cancel_whole(&order_id, Timestamp::UNIX_EPOCH)?;

        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.total_amount, 0);
        assert_eq!(order.final_amount, 0);
        assert_eq!(order.items.len(), 2);
        assert_eq!(released.iter().map(|(_, quantity)| quantity).sum::<u32>(), 3);

        let again = book.cancel_whole(&order_id, Timestamp::UNIX_EPOCH);

        assert!(
            matches!(again, Err(OrderBookError::AlreadyCancelled(_))),
            "expected AlreadyCancelled, got {again:?}"
        );

        Ok(())
    }

    #[test]
    fn over_selection_leaves_order_untouched() -> TestResult {
        let (mut book, order_id) = book_with(vec![item(10_000, 2)])?;

        let result = book.cancel_items(
            &order_id,
            &[
                LineSelection {
                    index: 0,
                    quantity: 1,
                },
                LineSelection {
                    index: 0,
                    quantity: 2,
                },
            ],
            Timestamp::UNIX_EPOCH,
        );

        assert!(
            matches!(result, Err(OrderBookError::InvalidSelection { index: 0 })),
            "expected InvalidSelection, got {result:?}"
        );
        assert_eq!(
            book.get(&order_id).ok_or("missing order")?.total_amount,
            20_000
        );

        Ok(())
    }
}
