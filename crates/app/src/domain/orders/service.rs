//! Reconciliation service.
//!
//! The only writer of stock levels, purchase records and orders. Each operation loads the
//! stores it needs inside one transaction, validates the whole request, applies every change in
//! memory and commits once. A rejected request commits nothing.

use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use rustc_hash::FxHashMap;
use tome::{
    refunds::refund_amount,
    status::{OrderStatus, PurchaseStatus},
    stock::{StockError, ensure_available},
};
use tracing::{Span, debug, info, warn};

use crate::{
    clock::Clock,
    database::{Db, Transaction},
    documents::{DocumentKey, ORDERS_PREFIX},
    domain::{
        catalog::{
            models::{Book, BookUuid},
            store::Catalog,
        },
        orders::{
            book::{OrderBook, Released},
            errors::OrdersServiceError,
            models::{CheckoutLine, LineSelection, Order, OrderId, OrderItem, PaymentInfo},
        },
        purchases::{
            ledger::PurchaseLedger,
            models::{PurchaseRecord, PurchaseUuid},
        },
        users::{directory::UserDirectory, models::UserId},
    },
    storage::StorageError,
};

/// Status given to unit records created at checkout.
pub const CHECKOUT_PURCHASE_STATUS: PurchaseStatus = PurchaseStatus::Shipped;

#[derive(Clone)]
pub struct LocalReconciliationService {
    db: Db,
    clock: Arc<dyn Clock>,
}

impl LocalReconciliationService {
    #[must_use]
    pub fn new(db: Db, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    fn ensure_not_suspended(
        &self,
        users: &UserDirectory,
        user: &UserId,
    ) -> Result<(), OrdersServiceError> {
        let account = users
            .get(user)
            .ok_or_else(|| OrdersServiceError::UserNotFound(user.clone()))?;

        match account.suspension_until {
            Some(until) if account.is_suspended_at(self.clock.now()) => {
                debug!(user_id = %user, %until, "rejected suspended user");

                Err(OrdersServiceError::Suspended { until })
            }
            _ => Ok(()),
        }
    }
}

fn is_admin(users: &UserDirectory, caller: &UserId) -> Result<bool, OrdersServiceError> {
    users
        .get(caller)
        .map(|user| user.is_admin())
        .ok_or_else(|| OrdersServiceError::UserNotFound(caller.clone()))
}

fn require_admin(users: &UserDirectory, caller: &UserId) -> Result<(), OrdersServiceError> {
    if is_admin(users, caller)? {
        Ok(())
    } else {
        Err(OrdersServiceError::Unauthorized)
    }
}

fn require_owner_or_admin(
    users: &UserDirectory,
    caller: &UserId,
    owner: &UserId,
) -> Result<(), OrdersServiceError> {
    if caller == owner || is_admin(users, caller)? {
        Ok(())
    } else {
        Err(OrdersServiceError::Unauthorized)
    }
}

/// Merge lines for the same book, keeping the order books were first requested in.
fn merge_lines(lines: &[CheckoutLine]) -> Result<Vec<CheckoutLine>, OrdersServiceError> {
    if lines.is_empty() {
        return Err(OrdersServiceError::EmptyCheckout);
    }

    let mut merged: Vec<CheckoutLine> = Vec::with_capacity(lines.len());
    let mut positions: FxHashMap<BookUuid, usize> = FxHashMap::default();

    for line in lines {
        if line.quantity == 0 {
            return Err(OrdersServiceError::InvalidQuantity);
        }

        match positions.get(&line.book) {
            Some(&index) => {
                if let Some(existing) = merged.get_mut(index) {
                    existing.quantity = existing
                        .quantity
                        .checked_add(line.quantity)
                        .ok_or(OrdersServiceError::InvalidQuantity)?;
                }
            }
            None => {
                positions.insert(line.book, merged.len());
                merged.push(*line);
            }
        }
    }

    Ok(merged)
}

fn snapshot(book: &Book, quantity: u32) -> OrderItem {
    OrderItem {
        book_id: book.id,
        title: book.title.clone(),
        author: book.author.clone(),
        cover_image: book.cover_image.clone(),
        price: book.price,
        quantity,
    }
}

/// Find the order book holding `order_id`, whoever owns it.
async fn find_order_book(
    tx: &Transaction,
    order_id: &OrderId,
) -> Result<Option<OrderBook>, StorageError> {
    for key in tx.keys(ORDERS_PREFIX).await? {
        let Some(owner) = DocumentKey::orders_owner(&key) else {
            continue;
        };

        let book = OrderBook::load(tx, &owner).await?;

        if book.get(order_id).is_some() {
            return Ok(Some(book));
        }
    }

    Ok(None)
}

/// The records behind a ledger-level cancel or return, validated together.
struct LedgerSelection {
    book: BookUuid,
    owner: UserId,
}

fn select_records(
    ledger: &PurchaseLedger,
    ids: &[PurchaseUuid],
) -> Result<Option<LedgerSelection>, OrdersServiceError> {
    let mut selection: Option<LedgerSelection> = None;

    for &id in ids {
        let record = ledger
            .get(id)
            .ok_or(OrdersServiceError::PurchaseNotFound(id))?;

        match &selection {
            None => {
                selection = Some(LedgerSelection {
                    book: record.book_id,
                    owner: record.user_id.clone(),
                });
            }
            Some(existing) if existing.book != record.book_id => {
                return Err(OrdersServiceError::MixedBooks);
            }
            Some(existing) if existing.owner != record.user_id => {
                return Err(OrdersServiceError::Unauthorized);
            }
            Some(_) => {}
        }
    }

    Ok(selection)
}

/// Cancel the oldest active records matching each released line.
fn cancel_released_units(
    ledger: &mut PurchaseLedger,
    owner: &UserId,
    released: &Released,
) -> Result<usize, OrdersServiceError> {
    let mut cancelled = 0;

    for &(book, quantity) in released {
        let ids = ledger.oldest_active(owner, book, quantity);

        if ids.len() < usize::try_from(quantity).unwrap_or(usize::MAX) {
            warn!(
                user_id = %owner,
                book_id = %book,
                requested = quantity,
                found = ids.len(),
                "fewer active purchase records than cancelled order units"
            );
        }

        cancelled += ledger.set_status(&ids, PurchaseStatus::Cancelled)?.len();
    }

    Ok(cancelled)
}

#[async_trait]
impl ReconciliationService for LocalReconciliationService {
    #[tracing::instrument(
        name = "orders.service.complete_checkout",
        skip(self, lines, payment),
        fields(
            user_id = %user,
            order_id = tracing::field::Empty,
            units = tracing::field::Empty
        ),
        err
    )]
    async fn complete_checkout(
        &self,
        user: &UserId,
        lines: Vec<CheckoutLine>,
        payment: PaymentInfo,
    ) -> Result<Order, OrdersServiceError> {
        let lines = merge_lines(&lines)?;

        let mut tx = self.db.begin().await;
        let users = UserDirectory::load(&tx).await?;
        let mut catalog = Catalog::load(&tx).await?;
        let mut ledger = PurchaseLedger::load(&tx).await?;
        let mut orders = OrderBook::load(&tx, user).await?;

        self.ensure_not_suspended(&users, user)?;

        let mut items = Vec::with_capacity(lines.len());

        for line in &lines {
            let book = catalog
                .get(line.book)
                .ok_or(OrdersServiceError::BookNotFound(line.book))?;

            if !book.is_purchasable() {
                return Err(OrdersServiceError::NotPurchasable(line.book));
            }

            ensure_available(book.stock, line.quantity).map_err(|error| match error {
                StockError::Insufficient {
                    available,
                    requested,
                } => OrdersServiceError::InsufficientStock {
                    book: line.book,
                    available,
                    requested,
                },
                source @ StockError::OutOfRange { .. } => OrdersServiceError::InvalidStock {
                    book: line.book,
                    source,
                },
            })?;

            items.push(snapshot(book, line.quantity));
        }

        let now = self.clock.now();
        let mut units = 0_u64;

        for line in &lines {
            catalog.adjust_stock(line.book, -i64::from(line.quantity))?;
            ledger.create_units(line.book, user, line.quantity, CHECKOUT_PURCHASE_STATUS, now);

            units += u64::from(line.quantity);
        }

        let order_id = OrderId::generate(now, &mut rand::thread_rng());
        let order = orders.create_order(order_id, items, payment, now)?;

        let span = Span::current();

        span.record("order_id", tracing::field::display(&order.order_id));
        span.record("units", units);

        catalog.stage(&mut tx)?;
        ledger.stage(&mut tx)?;
        orders.stage(&mut tx)?;

        tx.commit().await?;

        info!(
            order_id = %order.order_id,
            user_id = %user,
            units,
            final_amount = order.final_amount,
            "completed checkout"
        );

        Ok(order)
    }

    #[tracing::instrument(
        name = "orders.service.cancel_purchases",
        skip(self, ids),
        fields(caller = %caller, requested = ids.len(), cancelled = tracing::field::Empty),
        err
    )]
    async fn cancel_purchases(
        &self,
        caller: &UserId,
        ids: Vec<PurchaseUuid>,
    ) -> Result<Vec<PurchaseUuid>, OrdersServiceError> {
        let mut tx = self.db.begin().await;
        let users = UserDirectory::load(&tx).await?;
        let mut catalog = Catalog::load(&tx).await?;
        let mut ledger = PurchaseLedger::load(&tx).await?;

        let Some(selection) = select_records(&ledger, &ids)? else {
            return Ok(Vec::new());
        };

        require_owner_or_admin(&users, caller, &selection.owner)?;

        let cancelled = ledger.set_status(&ids, PurchaseStatus::Cancelled)?;

        Span::current().record("cancelled", cancelled.len());

        if cancelled.is_empty() {
            debug!(book_id = %selection.book, "purchases were already cancelled");

            return Ok(cancelled);
        }

        // A deleted book has no stock left to restore.
        let stock = if catalog.get(selection.book).is_some() {
            let restored =
                i64::try_from(cancelled.len()).map_err(|_err| OrdersServiceError::Overflow)?;
            let stock = catalog.adjust_stock(selection.book, restored)?;

            catalog.stage(&mut tx)?;

            Some(stock)
        } else {
            warn!(book_id = %selection.book, "book no longer exists, stock not restored");

            None
        };

        ledger.stage(&mut tx)?;

        tx.commit().await?;

        info!(
            book_id = %selection.book,
            owner = %selection.owner,
            cancelled = cancelled.len(),
            stock,
            "cancelled purchases"
        );

        Ok(cancelled)
    }

    #[tracing::instrument(
        name = "orders.service.return_purchases",
        skip(self, ids),
        fields(caller = %caller, requested = ids.len(), refund = tracing::field::Empty),
        err
    )]
    async fn return_purchases(
        &self,
        caller: &UserId,
        ids: Vec<PurchaseUuid>,
    ) -> Result<u64, OrdersServiceError> {
        let mut tx = self.db.begin().await;
        let mut catalog = Catalog::load(&tx).await?;
        let mut ledger = PurchaseLedger::load(&tx).await?;

        let Some(selection) = select_records(&ledger, &ids)? else {
            return Ok(0);
        };

        if &selection.owner != caller {
            return Err(OrdersServiceError::Unauthorized);
        }

        let price = catalog
            .get(selection.book)
            .map(|book| book.price)
            .ok_or(OrdersServiceError::BookNotFound(selection.book))?;

        let returned = ledger.set_status(&ids, PurchaseStatus::Cancelled)?;

        if returned.is_empty() {
            debug!(book_id = %selection.book, "purchases were already returned");

            return Ok(0);
        }

        let count = u32::try_from(returned.len()).map_err(|_err| OrdersServiceError::Overflow)?;
        let refund = refund_amount(price, count)?;

        Span::current().record("refund", refund);

        let stock = catalog.adjust_stock(selection.book, i64::from(count))?;

        catalog.stage(&mut tx)?;
        ledger.stage(&mut tx)?;

        tx.commit().await?;

        info!(
            book_id = %selection.book,
            user_id = %caller,
            returned = count,
            refund,
            stock,
            "returned purchases"
        );

        Ok(refund)
    }

    #[tracing::instrument(
        name = "orders.service.cancel_order_lines",
        skip(self, selections),
        fields(caller = %caller, order_id = %order_id, cancelled_units = tracing::field::Empty),
        err
    )]
    async fn cancel_order_lines(
        &self,
        caller: &UserId,
        order_id: &OrderId,
        selections: Vec<LineSelection>,
    ) -> Result<Order, OrdersServiceError> {
        let mut tx = self.db.begin().await;
        let users = UserDirectory::load(&tx).await?;
        let mut ledger = PurchaseLedger::load(&tx).await?;

        let mut orders = find_order_book(&tx, order_id)
            .await?
            .ok_or_else(|| OrdersServiceError::OrderNotFound(order_id.clone()))?;

        let owner = orders
            .get(order_id)
            .map(|order| order.user_id.clone())
            .ok_or_else(|| OrdersServiceError::OrderNotFound(order_id.clone()))?;

        require_owner_or_admin(&users, caller, &owner)?;

        let (order, released) = orders.cancel_items(order_id, &selections, self.clock.now())?;
        let cancelled = cancel_released_units(&mut ledger, &owner, &released)?;

        Span::current().record("cancelled_units", cancelled);

        orders.stage(&mut tx)?;
        ledger.stage(&mut tx)?;

        tx.commit().await?;

        info!(
            order_id = %order_id,
            status = %order.status,
            cancelled_units = cancelled,
            total_amount = order.total_amount,
            "cancelled order lines"
        );

        Ok(order)
    }

    #[tracing::instrument(
        name = "orders.service.cancel_whole_order",
        skip(self),
        fields(caller = %caller, order_id = %order_id),
        err
    )]
    async fn cancel_whole_order(
        &self,
        caller: &UserId,
        order_id: &OrderId,
    ) -> Result<Order, OrdersServiceError> {
        let mut tx = self.db.begin().await;
        let users = UserDirectory::load(&tx).await?;
        let mut ledger = PurchaseLedger::load(&tx).await?;

        let mut orders = find_order_book(&tx, order_id)
            .await?
            .ok_or_else(|| OrdersServiceError::OrderNotFound(order_id.clone()))?;

        let owner = orders
            .get(order_id)
            .map(|order| order.user_id.clone())
            .ok_or_else(|| OrdersServiceError::OrderNotFound(order_id.clone()))?;

        require_owner_or_admin(&users, caller, &owner)?;

        let (order, released) = orders.cancel_whole(order_id, self.clock.now())?;
        let cancelled = cancel_released_units(&mut ledger, &owner, &released)?;

        orders.stage(&mut tx)?;
        ledger.stage(&mut tx)?;

        tx.commit().await?;

        info!(order_id = %order_id, cancelled_units = cancelled, "cancelled order");

        Ok(order)
    }

    #[tracing::instrument(
        name = "orders.service.advance_order_status",
        skip(self),
        fields(caller = %caller, order_id = %order_id, next = %next),
        err
    )]
    async fn advance_order_status(
        &self,
        caller: &UserId,
        order_id: &OrderId,
        next: OrderStatus,
    ) -> Result<Order, OrdersServiceError> {
        let mut tx = self.db.begin().await;
        let users = UserDirectory::load(&tx).await?;

        require_admin(&users, caller)?;

        let mut orders = find_order_book(&tx, order_id)
            .await?
            .ok_or_else(|| OrdersServiceError::OrderNotFound(order_id.clone()))?;

        let order = orders.advance_status(order_id, next, self.clock.now())?;

        orders.stage(&mut tx)?;
        tx.commit().await?;

        info!(order_id = %order_id, status = %order.status, "advanced order");

        Ok(order)
    }

    #[tracing::instrument(
        name = "orders.service.set_book_stock",
        skip(self),
        fields(caller = %caller, book = %book, stock = stock),
        err
    )]
    async fn set_book_stock(
        &self,
        caller: &UserId,
        book: BookUuid,
        stock: u32,
    ) -> Result<Book, OrdersServiceError> {
        let mut tx = self.db.begin().await;
        let users = UserDirectory::load(&tx).await?;
        let mut catalog = Catalog::load(&tx).await?;

        require_admin(&users, caller)?;

        let updated = catalog.set_stock(book, stock)?.clone();

        catalog.stage(&mut tx)?;
        tx.commit().await?;

        info!(book_id = %book, stock, "set book stock");

        Ok(updated)
    }

    #[tracing::instrument(
        name = "orders.service.adjust_book_stock",
        skip(self),
        fields(caller = %caller, book = %book, delta = delta),
        err
    )]
    async fn adjust_book_stock(
        &self,
        caller: &UserId,
        book: BookUuid,
        delta: i64,
    ) -> Result<Book, OrdersServiceError> {
        let mut tx = self.db.begin().await;
        let users = UserDirectory::load(&tx).await?;
        let mut catalog = Catalog::load(&tx).await?;

        require_admin(&users, caller)?;

        let stock = catalog.adjust_stock(book, delta)?;

        let updated = catalog
            .get(book)
            .cloned()
            .ok_or(OrdersServiceError::BookNotFound(book))?;

        catalog.stage(&mut tx)?;
        tx.commit().await?;

        info!(book_id = %book, delta, stock, "adjusted book stock");

        Ok(updated)
    }

    async fn get_order(
        &self,
        caller: &UserId,
        order_id: &OrderId,
    ) -> Result<Order, OrdersServiceError> {
        let tx = self.db.begin().await;
        let users = UserDirectory::load(&tx).await?;

        let order = find_order_book(&tx, order_id)
            .await?
            .and_then(|orders| orders.get(order_id).cloned())
            .ok_or_else(|| OrdersServiceError::OrderNotFound(order_id.clone()))?;

        require_owner_or_admin(&users, caller, &order.user_id)?;

        Ok(order)
    }

    async fn list_user_orders(
        &self,
        caller: &UserId,
        user: &UserId,
    ) -> Result<Vec<Order>, OrdersServiceError> {
        let tx = self.db.begin().await;
        let users = UserDirectory::load(&tx).await?;

        require_owner_or_admin(&users, caller, user)?;

        Ok(OrderBook::load(&tx, user).await?.newest_first())
    }

    async fn list_all_orders(&self, caller: &UserId) -> Result<Vec<Order>, OrdersServiceError> {
        let tx = self.db.begin().await;
        let users = UserDirectory::load(&tx).await?;

        require_admin(&users, caller)?;

        let mut all = Vec::new();

        for key in tx.keys(ORDERS_PREFIX).await? {
            if let Some(owner) = DocumentKey::orders_owner(&key) {
                all.extend(OrderBook::load(&tx, &owner).await?.newest_first());
            }
        }

        all.sort_by(|left, right| right.created_at.cmp(&left.created_at));

        Ok(all)
    }

    async fn list_user_purchases(
        &self,
        caller: &UserId,
        user: &UserId,
        include_cancelled: bool,
    ) -> Result<Vec<PurchaseRecord>, OrdersServiceError> {
        let tx = self.db.begin().await;
        let users = UserDirectory::load(&tx).await?;

        require_owner_or_admin(&users, caller, user)?;

        Ok(PurchaseLedger::load(&tx)
            .await?
            .list_by_user(user, include_cancelled))
    }

    async fn list_book_sales(
        &self,
        caller: &UserId,
        book: BookUuid,
    ) -> Result<Vec<PurchaseRecord>, OrdersServiceError> {
        let tx = self.db.begin().await;
        let users = UserDirectory::load(&tx).await?;

        require_admin(&users, caller)?;

        Ok(PurchaseLedger::load(&tx).await?.list_by_book(book, true))
    }

    async fn units_sold(&self, book: BookUuid) -> Result<usize, OrdersServiceError> {
        let tx = self.db.begin().await;

        Ok(PurchaseLedger::load(&tx).await?.units_sold(book))
    }
}

#[automock]
#[async_trait]
pub trait ReconciliationService: Send + Sync {
    /// Turn checkout lines into stock decrements, unit records and one paid order.
    ///
    /// Nothing is written unless every line can be fulfilled.
    async fn complete_checkout(
        &self,
        user: &UserId,
        lines: Vec<CheckoutLine>,
        payment: PaymentInfo,
    ) -> Result<Order, OrdersServiceError>;

    /// Cancel unit records of one book and put their stock back, returning the ids that changed.
    ///
    /// Allowed for the owner of the records or an admin. Orders are not touched.
    async fn cancel_purchases(
        &self,
        caller: &UserId,
        ids: Vec<PurchaseUuid>,
    ) -> Result<Vec<PurchaseUuid>, OrdersServiceError>;

    /// Return the caller's unit records of one book, restoring stock and returning the refund.
    async fn return_purchases(
        &self,
        caller: &UserId,
        ids: Vec<PurchaseUuid>,
    ) -> Result<u64, OrdersServiceError>;

    /// Cancel units from order lines, cancelling as many unit records. Stock is not restored.
    async fn cancel_order_lines(
        &self,
        caller: &UserId,
        order_id: &OrderId,
        selections: Vec<LineSelection>,
    ) -> Result<Order, OrdersServiceError>;

    /// Cancel every line of an order. Stock is not restored.
    async fn cancel_whole_order(
        &self,
        caller: &UserId,
        order_id: &OrderId,
    ) -> Result<Order, OrdersServiceError>;

    /// Move an order to its immediate next status.
    async fn advance_order_status(
        &self,
        caller: &UserId,
        order_id: &OrderId,
        next: OrderStatus,
    ) -> Result<Order, OrdersServiceError>;

    /// Replace a book's stock level.
    async fn set_book_stock(
        &self,
        caller: &UserId,
        book: BookUuid,
        stock: u32,
    ) -> Result<Book, OrdersServiceError>;

    /// Change a book's stock level by `delta`.
    async fn adjust_book_stock(
        &self,
        caller: &UserId,
        book: BookUuid,
        delta: i64,
    ) -> Result<Book, OrdersServiceError>;

    async fn get_order(&self, caller: &UserId, order_id: &OrderId)
    -> Result<Order, OrdersServiceError>;

    /// Orders placed by `user`, newest first.
    async fn list_user_orders(
        &self,
        caller: &UserId,
        user: &UserId,
    ) -> Result<Vec<Order>, OrdersServiceError>;

    /// Every order in the store, newest first.
    async fn list_all_orders(&self, caller: &UserId) -> Result<Vec<Order>, OrdersServiceError>;

    async fn list_user_purchases(
        &self,
        caller: &UserId,
        user: &UserId,
        include_cancelled: bool,
    ) -> Result<Vec<PurchaseRecord>, OrdersServiceError>;

    /// Sales history of a book, cancelled records included.
    async fn list_book_sales(
        &self,
        caller: &UserId,
        book: BookUuid,
    ) -> Result<Vec<PurchaseRecord>, OrdersServiceError>;

    /// Active unit records of a book across all users.
    async fn units_sold(&self, book: BookUuid) -> Result<usize, OrdersServiceError>;
}
