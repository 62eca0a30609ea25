//! Carts service.

use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use rustc_hash::FxHashSet;
use tracing::{info, warn};

use crate::{
    database::Db,
    domain::{
        carts::{errors::CartsServiceError, models::CartLine, store::Cart},
        catalog::{
            models::{Book, BookUuid},
            store::Catalog,
        },
        orders::{
            ReconciliationService,
            models::{CheckoutLine, Order, PaymentInfo},
        },
        users::models::UserId,
    },
    storage::StorageError,
};

#[derive(Clone)]
pub struct LocalCartsService {
    db: Db,
    orders: Arc<dyn ReconciliationService>,
}

impl LocalCartsService {
    #[must_use]
    pub fn new(db: Db, orders: Arc<dyn ReconciliationService>) -> Self {
        Self { db, orders }
    }

    async fn remove_purchased(&self, user: &UserId, books: &[BookUuid]) -> Result<(), StorageError> {
        let mut tx = self.db.begin().await;
        let mut cart = Cart::load(&tx, user).await?;

        cart.remove(books);
        cart.stage(&mut tx)?;

        tx.commit().await
    }
}

fn purchasable(catalog: &Catalog, book: BookUuid) -> Result<&Book, CartsServiceError> {
    let entry = catalog
        .get(book)
        .ok_or(CartsServiceError::BookNotFound(book))?;

    if !entry.is_purchasable() {
        return Err(CartsServiceError::NotPurchasable(book));
    }

    Ok(entry)
}

fn ensure_in_stock(book: &Book, requested: u32) -> Result<(), CartsServiceError> {
    if requested > book.stock {
        return Err(CartsServiceError::InsufficientStock {
            book: book.id,
            available: book.stock,
            requested,
        });
    }

    Ok(())
}

#[async_trait]
impl CartsService for LocalCartsService {
    async fn list_cart(&self, user: &UserId) -> Result<Vec<CartLine>, CartsServiceError> {
        let tx = self.db.begin().await;

        Ok(Cart::load(&tx, user).await?.lines().to_vec())
    }

    async fn add_to_cart(
        &self,
        user: &UserId,
        book: BookUuid,
        quantity: u32,
    ) -> Result<Vec<CartLine>, CartsServiceError> {
        if quantity == 0 {
            return Err(CartsServiceError::InvalidQuantity);
        }

        let mut tx = self.db.begin().await;
        let catalog = Catalog::load(&tx).await?;
        let mut cart = Cart::load(&tx, user).await?;

        let entry = purchasable(&catalog, book)?;

        if let Some(line) = cart.line_mut(book) {
            let merged = line
                .quantity
                .checked_add(quantity)
                .ok_or(CartsServiceError::InvalidQuantity)?;

            ensure_in_stock(entry, merged)?;

            line.quantity = merged;
        } else {
            ensure_in_stock(entry, quantity)?;

            cart.push(CartLine {
                book_id: book,
                title: entry.title.clone(),
                price: entry.price,
                quantity,
            });
        }

        cart.stage(&mut tx)?;
        tx.commit().await?;

        Ok(cart.lines().to_vec())
    }

    async fn update_quantity(
        &self,
        user: &UserId,
        book: BookUuid,
        quantity: u32,
    ) -> Result<Vec<CartLine>, CartsServiceError> {
        if quantity == 0 {
            return Err(CartsServiceError::InvalidQuantity);
        }

        let mut tx = self.db.begin().await;
        let catalog = Catalog::load(&tx).await?;
        let mut cart = Cart::load(&tx, user).await?;

        let entry = purchasable(&catalog, book)?;

        ensure_in_stock(entry, quantity)?;

        cart.line_mut(book)
            .ok_or(CartsServiceError::LineNotFound(book))?
            .quantity = quantity;

        cart.stage(&mut tx)?;
        tx.commit().await?;

        Ok(cart.lines().to_vec())
    }

    async fn remove_from_cart(
        &self,
        user: &UserId,
        books: Vec<BookUuid>,
    ) -> Result<Vec<CartLine>, CartsServiceError> {
        let mut tx = self.db.begin().await;
        let mut cart = Cart::load(&tx, user).await?;

        if cart.remove(&books) > 0 {
            cart.stage(&mut tx)?;
            tx.commit().await?;
        }

        Ok(cart.lines().to_vec())
    }

    async fn clear_cart(&self, user: &UserId) -> Result<(), CartsServiceError> {
        let mut tx = self.db.begin().await;
        let mut cart = Cart::load(&tx, user).await?;

        cart.clear();
        cart.stage(&mut tx)?;

        tx.commit().await?;

        Ok(())
    }

    async fn checkout_cart(
        &self,
        user: &UserId,
        mut books: Vec<BookUuid>,
        payment: PaymentInfo,
    ) -> Result<Order, CartsServiceError> {
        let mut seen = FxHashSet::default();

        books.retain(|book| seen.insert(*book));

        if books.is_empty() {
            return Err(CartsServiceError::EmptySelection);
        }

        let lines: Vec<CheckoutLine> = {
            let tx = self.db.begin().await;
            let cart = Cart::load(&tx, user).await?;

            books
                .iter()
                .map(|&book| {
                    cart.lines()
                        .iter()
                        .find(|line| line.book_id == book)
                        .map(|line| CheckoutLine {
                            book,
                            quantity: line.quantity,
                        })
                        .ok_or(CartsServiceError::LineNotFound(book))
                })
                .collect::<Result<_, _>>()?
        };

        let order = self.orders.complete_checkout(user, lines, payment).await?;

        // The order is already committed.
        if let Err(error) = self.remove_purchased(user, &books).await {
            warn!(
                user_id = %user,
                order_id = %order.order_id,
                error = %error,
                "failed to remove purchased lines from cart"
            );
        }

        info!(user_id = %user, order_id = %order.order_id, lines = books.len(), "checked out cart");

        Ok(order)
    }
}

#[automock]
#[async_trait]
pub trait CartsService: Send + Sync {
    /// Retrieve the user's cart.
    async fn list_cart(&self, user: &UserId) -> Result<Vec<CartLine>, CartsServiceError>;

    /// Add units of a book, merging with an existing line.
    async fn add_to_cart(
        &self,
        user: &UserId,
        book: BookUuid,
        quantity: u32,
    ) -> Result<Vec<CartLine>, CartsServiceError>;

    /// Replace the quantity of an existing line.
    async fn update_quantity(
        &self,
        user: &UserId,
        book: BookUuid,
        quantity: u32,
    ) -> Result<Vec<CartLine>, CartsServiceError>;

    async fn remove_from_cart(
        &self,
        user: &UserId,
        books: Vec<BookUuid>,
    ) -> Result<Vec<CartLine>, CartsServiceError>;

    async fn clear_cart(&self, user: &UserId) -> Result<(), CartsServiceError>;

    /// Check out the selected lines and remove them from the cart once the order exists.
    async fn checkout_cart(
        &self,
        user: &UserId,
        books: Vec<BookUuid>,
        payment: PaymentInfo,
    ) -> Result<Order, CartsServiceError>;
}
