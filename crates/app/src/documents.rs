//! Versioned documents
//!
//! Every stored value is wrapped as `{"version": N, "data": ...}`. Documents written before the
//! envelope existed are bare JSON arrays and read as version 1. Older documents are brought up
//! to [`CURRENT_VERSION`] one step at a time by the registered [`Migration`]s before they are
//! deserialized.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value, json};
use tome::pricing::delivery_fee_for;
use tracing::debug;

use crate::{
    domain::users::{models::UserId, password::hash_password},
    storage::StorageError,
    uuids::uuid_from_legacy,
};

/// Version written by this build.
pub(crate) const CURRENT_VERSION: u32 = 2;

pub(crate) const ORDERS_PREFIX: &str = "orders_";
pub(crate) const CART_PREFIX: &str = "cart_";

/// Storage key of a persisted document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DocumentKey {
    Books,
    Purchases,
    Users,
    Orders(UserId),
    Cart(UserId),
    DeletedBooks,
    BookEdits,
}

impl DocumentKey {
    pub(crate) fn storage_key(&self) -> String {
        match self {
            Self::Books => "books".to_string(),
            Self::Purchases => "purchases".to_string(),
            Self::Users => "users".to_string(),
            Self::Orders(user) => format!("{ORDERS_PREFIX}{user}"),
            Self::Cart(user) => format!("{CART_PREFIX}{user}"),
            Self::DeletedBooks => "deleted_books".to_string(),
            Self::BookEdits => "book_edits".to_string(),
        }
    }

    /// Owner of an `orders_<user>` key.
    pub(crate) fn orders_owner(storage_key: &str) -> Option<UserId> {
        storage_key
            .strip_prefix(ORDERS_PREFIX)
            .filter(|user| !user.is_empty())
            .map(UserId::from)
    }

    const fn kind(&self) -> DocumentKind {
        match self {
            Self::Books => DocumentKind::Books,
            Self::Purchases => DocumentKind::Purchases,
            Self::Users => DocumentKind::Users,
            Self::Orders(_) => DocumentKind::Orders,
            Self::Cart(_) => DocumentKind::Cart,
            Self::DeletedBooks => DocumentKind::DeletedBooks,
            Self::BookEdits => DocumentKind::BookEdits,
        }
    }
}

impl Display for DocumentKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.storage_key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Books,
    Purchases,
    Users,
    Orders,
    Cart,
    DeletedBooks,
    BookEdits,
}

/// One upgrade step for a document kind.
struct Migration {
    kind: DocumentKind,
    from_version: u32,
    to_version: u32,
    transform: fn(Value) -> Value,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        kind: DocumentKind::Books,
        from_version: 1,
        to_version: 2,
        transform: books_v1_to_v2,
    },
    Migration {
        kind: DocumentKind::Purchases,
        from_version: 1,
        to_version: 2,
        transform: purchases_v1_to_v2,
    },
    Migration {
        kind: DocumentKind::Users,
        from_version: 1,
        to_version: 2,
        transform: users_v1_to_v2,
    },
    Migration {
        kind: DocumentKind::Orders,
        from_version: 1,
        to_version: 2,
        transform: orders_v1_to_v2,
    },
    Migration {
        kind: DocumentKind::Cart,
        from_version: 1,
        to_version: 2,
        transform: cart_v1_to_v2,
    },
    Migration {
        kind: DocumentKind::DeletedBooks,
        from_version: 1,
        to_version: 2,
        transform: deleted_books_v1_to_v2,
    },
    Migration {
        kind: DocumentKind::BookEdits,
        from_version: 1,
        to_version: 2,
        transform: book_edits_v1_to_v2,
    },
];

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    data: Value,
}

pub(crate) fn encode<T: Serialize>(key: &DocumentKey, value: &T) -> Result<String, StorageError> {
    serde_json::to_string(&EnvelopeRef {
        version: CURRENT_VERSION,
        data: value,
    })
    .map_err(|source| StorageError::Encode {
        key: key.storage_key(),
        source,
    })
}

pub(crate) fn decode<T: DeserializeOwned>(key: &DocumentKey, raw: &str) -> Result<T, StorageError> {
    let malformed = |source| StorageError::Malformed {
        key: key.storage_key(),
        source,
    };

    let value: Value = serde_json::from_str(raw).map_err(malformed)?;

    let (version, data) = if value.is_object() {
        let envelope: Envelope = serde_json::from_value(value).map_err(malformed)?;
        (envelope.version, envelope.data)
    } else {
        (1, value)
    };

    let data = upcast(key, version, data)?;

    serde_json::from_value(data).map_err(malformed)
}

fn upcast(key: &DocumentKey, version: u32, data: Value) -> Result<Value, StorageError> {
    if version > CURRENT_VERSION {
        return Err(StorageError::UnsupportedVersion {
            key: key.storage_key(),
            found: version,
            supported: CURRENT_VERSION,
        });
    }

    let kind = key.kind();
    let mut version = version;
    let mut data = data;

    while version < CURRENT_VERSION {
        let migration = MIGRATIONS
            .iter()
            .find(|migration| migration.kind == kind && migration.from_version == version)
            .ok_or_else(|| StorageError::MissingMigration {
                key: key.storage_key(),
                from_version: version,
            })?;

        data = (migration.transform)(data);
        version = migration.to_version;

        debug!(key = %key, version, "migrated document");
    }

    Ok(data)
}

fn books_v1_to_v2(data: Value) -> Value {
    map_array(data, book_v1_to_v2)
}

fn book_v1_to_v2(mut book: Value) -> Value {
    if let Some(fields) = book.as_object_mut() {
        legacy_id_field(fields, "id");
        default_field(fields, "stock", json!(0));
        default_field(fields, "status", json!("approved"));
        default_field(fields, "ratings", json!([]));
        default_field(fields, "reviews", json!([]));

        if let Some(Value::Array(reviews)) = fields.get_mut("reviews") {
            for review in reviews.iter_mut().filter_map(Value::as_object_mut) {
                legacy_id_field(review, "id");
                default_field(review, "likes", json!([]));
                default_field(review, "reports", json!([]));
                default_field(review, "isHidden", json!(false));
            }
        }
    }

    book
}

fn purchases_v1_to_v2(data: Value) -> Value {
    map_array(data, |mut purchase| {
        if let Some(fields) = purchase.as_object_mut() {
            legacy_id_field(fields, "id");
            legacy_id_field(fields, "bookId");
            default_field(fields, "status", json!("shipped"));
        }

        purchase
    })
}

fn users_v1_to_v2(data: Value) -> Value {
    map_array(data, |mut user| {
        if let Some(fields) = user.as_object_mut() {
            if !fields.contains_key("passwordHash")
                && let Some(Value::String(password)) = fields.remove("password")
            {
                fields.insert("passwordHash".to_string(), json!(hash_password(&password)));
            }

            default_field(fields, "role", json!("user"));
            default_field(fields, "wishlist", json!([]));

            if let Some(Value::Array(wishlist)) = fields.get_mut("wishlist") {
                wishlist.iter_mut().for_each(legacy_id);
                dedup_values(wishlist);
            }
        }

        user
    })
}

fn orders_v1_to_v2(data: Value) -> Value {
    map_array(data, |mut order| {
        if let Some(fields) = order.as_object_mut() {
            if let Some(Value::Array(items)) = fields.get_mut("items") {
                for item in items.iter_mut().filter_map(Value::as_object_mut) {
                    legacy_id_field(item, "bookId");
                }
            }

            let total = fields
                .get("totalAmount")
                .and_then(Value::as_u64)
                .unwrap_or_default();

            default_field(fields, "deliveryFee", json!(delivery_fee_for(total)));

            let fee = fields
                .get("deliveryFee")
                .and_then(Value::as_u64)
                .unwrap_or_default();

            default_field(fields, "finalAmount", json!(total.saturating_add(fee)));
            default_field(fields, "status", json!("paid"));

            if let Some(created_at) = fields.get("createdAt").cloned() {
                default_field(fields, "updatedAt", created_at);
            }
        }

        order
    })
}

/// Legacy carts held a full book snapshot per line.
fn cart_v1_to_v2(data: Value) -> Value {
    map_array(data, |line| match line {
        Value::Object(mut fields) => {
            if let Some(Value::Object(book)) = fields.remove("book") {
                for (from, to) in [("id", "bookId"), ("title", "title"), ("price", "price")] {
                    if let Some(value) = book.get(from) {
                        fields.entry(to).or_insert_with(|| value.clone());
                    }
                }
            }

            legacy_id_field(&mut fields, "bookId");

            Value::Object(fields)
        }
        other => other,
    })
}

fn deleted_books_v1_to_v2(data: Value) -> Value {
    map_array(data, |mut record| {
        if let Some(fields) = record.as_object_mut() {
            legacy_id_field(fields, "id");

            if let Some(book) = fields.remove("book") {
                fields.insert("book".to_string(), book_v1_to_v2(book));
            }
        }

        record
    })
}

fn book_edits_v1_to_v2(data: Value) -> Value {
    map_array(data, |mut record| {
        if let Some(fields) = record.as_object_mut() {
            legacy_id_field(fields, "id");
            legacy_id_field(fields, "bookId");

            for side in ["before", "after"] {
                if let Some(book) = fields.remove(side) {
                    fields.insert(side.to_string(), book_v1_to_v2(book));
                }
            }

            default_field(fields, "changes", json!([]));
        }

        record
    })
}

fn map_array(data: Value, transform: impl Fn(Value) -> Value) -> Value {
    match data {
        Value::Array(entries) => Value::Array(entries.into_iter().map(transform).collect()),
        other => other,
    }
}

fn default_field(fields: &mut Map<String, Value>, name: &str, default: Value) {
    match fields.get(name) {
        Some(value) if !value.is_null() => {}
        _ => {
            fields.insert(name.to_string(), default);
        }
    }
}

fn legacy_id_field(fields: &mut Map<String, Value>, name: &str) {
    if let Some(value) = fields.get_mut(name) {
        legacy_id(value);
    }
}

fn legacy_id(value: &mut Value) {
    let uuid = match value {
        Value::String(raw) => uuid_from_legacy(raw),
        Value::Number(number) => uuid_from_legacy(&number.to_string()),
        _ => return,
    };

    *value = Value::String(uuid.to_string());
}

fn dedup_values(values: &mut Vec<Value>) {
    let mut seen = Vec::with_capacity(values.len());

    values.retain(|value| {
        if seen.contains(value) {
            false
        } else {
            seen.push(value.clone());
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use testresult::TestResult;

    use crate::{
        domain::{
            catalog::models::{Book, BookStatus},
            purchases::models::PurchaseRecord,
            users::{models::User, password::verify_password},
        },
        uuids::uuid_from_legacy,
    };
    use tome::status::PurchaseStatus;

    use super::*;

    #[test]
    fn encoded_documents_carry_the_current_version() -> TestResult {
        let raw = encode(&DocumentKey::Books, &Vec::<u32>::new())?;
        let value: Value = serde_json::from_str(&raw)?;

        assert_eq!(value, json!({ "version": CURRENT_VERSION, "data": [] }));

        Ok(())
    }

    #[test]
    fn legacy_purchases_default_to_shipped_with_stable_ids() -> TestResult {
        let raw = json!([{
            "id": "1700000000000_3_0_0.42",
            "bookId": "3",
            "userId": "KT",
            "purchaseDate": "2024-03-01T09:00:00.000Z"
        }])
        .to_string();

        let records: Vec<PurchaseRecord> = decode(&DocumentKey::Purchases, &raw)?;
        let record = records.first().ok_or("missing record")?;

        assert_eq!(record.status, PurchaseStatus::Shipped);
        assert_eq!(record.book_id.into_uuid(), uuid_from_legacy("3"));
        assert_eq!(record.id.into_uuid(), uuid_from_legacy("1700000000000_3_0_0.42"));

        Ok(())
    }

    #[test]
    fn legacy_books_gain_stock_status_and_review_defaults() -> TestResult {
        let raw = json!([{
            "id": "3",
            "title": "Demian",
            "author": "Hermann Hesse",
            "genre": "Novel",
            "description": "",
            "coverImage": "",
            "publishedYear": 1919,
            "price": 9000,
            "createdBy": "ADMIN",
            "createdAt": "2024-01-01T00:00:00.000Z",
            "ratings": [],
            "reviews": [{
                "id": "r1",
                "userId": "KT",
                "comment": "good",
                "timestamp": "2024-01-02T00:00:00.000Z"
            }]
        }])
        .to_string();

        let books: Vec<Book> = decode(&DocumentKey::Books, &raw)?;
        let book = books.first().ok_or("missing book")?;
        let review = book.reviews.first().ok_or("missing review")?;

        assert_eq!(book.stock, 0);
        assert_eq!(book.status, BookStatus::Approved);
        assert!(review.likes.is_empty());
        assert!(review.reports.is_empty());
        assert!(!review.is_hidden);

        Ok(())
    }

    #[test]
    fn legacy_plaintext_passwords_are_hashed() -> TestResult {
        let raw = json!([{
            "id": "KT",
            "password": "1234",
            "role": "user",
            "wishlist": ["3", "3"]
        }])
        .to_string();

        let users: Vec<User> = decode(&DocumentKey::Users, &raw)?;
        let user = users.first().ok_or("missing user")?;

        assert!(verify_password("1234", &user.password_hash));
        assert_eq!(user.wishlist.len(), 1);

        Ok(())
    }

    #[test]
    fn newer_documents_are_rejected() {
        let raw = json!({ "version": CURRENT_VERSION + 1, "data": [] }).to_string();

        let result = decode::<Vec<Book>>(&DocumentKey::Books, &raw);

        assert!(
            matches!(
                result,
                Err(StorageError::UnsupportedVersion { found, .. }) if found == CURRENT_VERSION + 1
            ),
            "expected UnsupportedVersion, got {result:?}"
        );
    }

    #[test]
    fn orders_keys_name_their_owner() {
        assert_eq!(
            DocumentKey::orders_owner("orders_KT"),
            Some(UserId::from("KT"))
        );
        assert_eq!(DocumentKey::orders_owner("orders_"), None);
        assert_eq!(DocumentKey::orders_owner("cart_KT"), None);
    }
}
