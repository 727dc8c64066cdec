//! Subscription persistence
//!
//! `PgSubscriptionStore` is the production store. `InMemorySubscriptionStore`
//! keeps everything behind a lock and is used by tests and local runs without
//! a database.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::admin::{self, ListingQuery, Subscriber, SubscriptionListing};
use crate::error::{BillingError, BillingResult};
use crate::models::{
    PaymentStatus, Subscription, SubscriptionRecord, Transaction, TransactionStatus,
};

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Persist a subscription and its first transaction together
    async fn create_subscription(
        &self,
        subscription: &Subscription,
        transaction: &Transaction,
    ) -> BillingResult<()>;

    async fn get_subscription(&self, id: Uuid) -> BillingResult<Option<SubscriptionRecord>>;

    /// Set the status of the most recent transaction of a subscription.
    /// Returns the updated transaction, or `None` if the subscription has none.
    async fn set_latest_transaction_status(
        &self,
        subscription_id: Uuid,
        status: TransactionStatus,
    ) -> BillingResult<Option<Transaction>>;

    /// All subscriptions with their transactions, newest first
    async fn list_subscriptions(&self) -> BillingResult<Vec<SubscriptionRecord>>;

    /// One page of the admin listing, searched and filtered, newest first
    async fn list_page(&self, query: &ListingQuery) -> BillingResult<SubscriptionListing>;
}

// =============================================================================
// Postgres
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: Uuid,
    #[sqlx(rename = "type")]
    kind: String,
    date: OffsetDateTime,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = BillingError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: row.id,
            user_id: row.user_id,
            kind: row
                .kind
                .parse()
                .map_err(|_| BillingError::InvalidData(format!("subscription type '{}'", row.kind)))?,
            date: row.date,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    subscription_id: Uuid,
    code: String,
    price: Decimal,
    status: String,
    created_at: OffsetDateTime,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = BillingError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Transaction {
            id: row.id,
            subscription_id: row.subscription_id,
            code: row.code,
            price: row.price,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ListingRow {
    id: Uuid,
    #[sqlx(rename = "type")]
    kind: String,
    date: OffsetDateTime,
    name: String,
    status: String,
}

impl TryFrom<ListingRow> for admin::SubscriptionRow {
    type Error = BillingError;

    fn try_from(row: ListingRow) -> Result<Self, Self::Error> {
        Ok(admin::SubscriptionRow {
            id: row.id,
            name: row.name,
            kind: row.kind.parse()?,
            date: row.date,
            status: row.status.parse()?,
        })
    }
}

/// Subscriptions with subscriber name and payment status (done > canceled >
/// pending). `$1` is an optional search term, `$2` an optional status.
const LISTING_CTE: &str = r#"
    WITH listing AS (
        SELECT
            s.id, s.type, s.date,
            COALESCE(p.name, '') AS name,
            CASE
                WHEN bool_or(t.status = 'done') THEN 'confirmed'
                WHEN bool_or(t.status = 'canceled') THEN 'canceled'
                ELSE 'pending'
            END AS status
        FROM subscriptions s
        JOIN users u ON u.id = s.user_id
        LEFT JOIN account_profiles p ON p.user_id = s.user_id
        LEFT JOIN transactions t ON t.subscription_id = s.id
        WHERE $1::TEXT IS NULL
            OR u.email ILIKE '%' || $1 || '%'
            OR u.username ILIKE '%' || $1 || '%'
        GROUP BY s.id, p.name
    )
"#;

pub struct PgSubscriptionStore {
    pool: PgPool,
}

impl PgSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn transactions_for(&self, ids: &[Uuid]) -> BillingResult<Vec<Transaction>> {
        let rows: Vec<TransactionRow> = sqlx::query_as(
            r#"
            SELECT id, subscription_id, code, price, status, created_at
            FROM transactions
            WHERE subscription_id = ANY($1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Transaction::try_from).collect()
    }
}

#[async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    async fn create_subscription(
        &self,
        subscription: &Subscription,
        transaction: &Transaction,
    ) -> BillingResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO subscriptions (id, user_id, type, date)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(subscription.id)
        .bind(subscription.user_id)
        .bind(subscription.kind.as_str())
        .bind(subscription.date)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO transactions (id, subscription_id, code, price, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(transaction.id)
        .bind(transaction.subscription_id)
        .bind(&transaction.code)
        .bind(transaction.price)
        .bind(transaction.status.as_str())
        .bind(transaction.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                BillingError::DuplicateTransactionCode(transaction.code.clone())
            }
            other => BillingError::Database(other),
        })?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_subscription(&self, id: Uuid) -> BillingResult<Option<SubscriptionRecord>> {
        let row: Option<SubscriptionRow> =
            sqlx::query_as("SELECT id, user_id, type, date FROM subscriptions WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let subscription = Subscription::try_from(row)?;
        let transactions = self.transactions_for(&[subscription.id]).await?;
        Ok(Some(SubscriptionRecord {
            subscription,
            transactions,
        }))
    }

    async fn set_latest_transaction_status(
        &self,
        subscription_id: Uuid,
        status: TransactionStatus,
    ) -> BillingResult<Option<Transaction>> {
        let row: Option<TransactionRow> = sqlx::query_as(
            r#"
            UPDATE transactions
            SET status = $2
            WHERE id = (
                SELECT id FROM transactions
                WHERE subscription_id = $1
                ORDER BY created_at DESC
                LIMIT 1
            )
            RETURNING id, subscription_id, code, price, status, created_at
            "#,
        )
        .bind(subscription_id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Transaction::try_from).transpose()
    }

    async fn list_subscriptions(&self) -> BillingResult<Vec<SubscriptionRecord>> {
        let rows: Vec<SubscriptionRow> =
            sqlx::query_as("SELECT id, user_id, type, date FROM subscriptions ORDER BY date DESC")
                .fetch_all(&self.pool)
                .await?;

        let subscriptions = rows
            .into_iter()
            .map(Subscription::try_from)
            .collect::<BillingResult<Vec<_>>>()?;
        let ids: Vec<Uuid> = subscriptions.iter().map(|s| s.id).collect();

        let mut by_subscription: HashMap<Uuid, Vec<Transaction>> = HashMap::new();
        for transaction in self.transactions_for(&ids).await? {
            by_subscription
                .entry(transaction.subscription_id)
                .or_default()
                .push(transaction);
        }

        Ok(subscriptions
            .into_iter()
            .map(|subscription| SubscriptionRecord {
                transactions: by_subscription.remove(&subscription.id).unwrap_or_default(),
                subscription,
            })
            .collect())
    }

    async fn list_page(&self, query: &ListingQuery) -> BillingResult<SubscriptionListing> {
        let search = query.search_term();
        let status = query.status.as_ref().map(PaymentStatus::as_str);
        let limit = i64::try_from(query.limit()).unwrap_or(i64::MAX);
        let offset = i64::try_from(query.offset()).unwrap_or(i64::MAX);

        let rows: Vec<ListingRow> = sqlx::query_as(&format!(
            r#"{LISTING_CTE}
            SELECT id, type, date, name, status
            FROM listing
            WHERE $2::TEXT IS NULL OR status = $2
            ORDER BY date DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(&search)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: (i64,) = sqlx::query_as(&format!(
            r#"{LISTING_CTE}
            SELECT COUNT(*) FROM listing
            WHERE $2::TEXT IS NULL OR status = $2
            "#
        ))
        .bind(&search)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok(SubscriptionListing {
            subscriptions: rows
                .into_iter()
                .map(admin::SubscriptionRow::try_from)
                .collect::<BillingResult<_>>()?,
            total: usize::try_from(total.0).unwrap_or_default(),
            page: query.page(),
            limit: query.limit(),
        })
    }
}

// =============================================================================
// In-memory
// =============================================================================

#[derive(Default)]
struct MemoryTables {
    subscriptions: Vec<Subscription>,
    /// Insertion order doubles as creation order
    transactions: Vec<Transaction>,
    subscribers: HashMap<Uuid, Subscriber>,
}

#[derive(Default)]
pub struct InMemorySubscriptionStore {
    tables: RwLock<MemoryTables>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record another payment attempt for an existing subscription
    pub async fn add_transaction(&self, transaction: Transaction) -> BillingResult<()> {
        let mut tables = self.tables.write().await;
        Self::check_code_unused(&tables, &transaction.code)?;
        tables.transactions.push(transaction);
        Ok(())
    }

    fn check_code_unused(tables: &MemoryTables, code: &str) -> BillingResult<()> {
        if tables.transactions.iter().any(|t| t.code == code) {
            return Err(BillingError::DuplicateTransactionCode(code.to_string()));
        }
        Ok(())
    }

    /// Make a user known to the admin listing's search and name column
    pub async fn add_subscriber(&self, user_id: Uuid, subscriber: Subscriber) {
        self.tables
            .write()
            .await
            .subscribers
            .insert(user_id, subscriber);
    }

    fn record(tables: &MemoryTables, subscription: &Subscription) -> SubscriptionRecord {
        SubscriptionRecord {
            subscription: subscription.clone(),
            transactions: tables
                .transactions
                .iter()
                .filter(|t| t.subscription_id == subscription.id)
                .cloned()
                .collect(),
        }
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn create_subscription(
        &self,
        subscription: &Subscription,
        transaction: &Transaction,
    ) -> BillingResult<()> {
        let mut tables = self.tables.write().await;
        Self::check_code_unused(&tables, &transaction.code)?;
        tables.subscriptions.push(subscription.clone());
        tables.transactions.push(transaction.clone());
        Ok(())
    }

    async fn get_subscription(&self, id: Uuid) -> BillingResult<Option<SubscriptionRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .subscriptions
            .iter()
            .find(|s| s.id == id)
            .map(|s| Self::record(&tables, s)))
    }

    async fn set_latest_transaction_status(
        &self,
        subscription_id: Uuid,
        status: TransactionStatus,
    ) -> BillingResult<Option<Transaction>> {
        let mut tables = self.tables.write().await;
        let latest = tables
            .transactions
            .iter_mut()
            .rev()
            .find(|t| t.subscription_id == subscription_id);

        Ok(latest.map(|t| {
            t.status = status;
            t.clone()
        }))
    }

    async fn list_subscriptions(&self) -> BillingResult<Vec<SubscriptionRecord>> {
        let tables = self.tables.read().await;
        let mut records: Vec<SubscriptionRecord> = tables
            .subscriptions
            .iter()
            .map(|s| Self::record(&tables, s))
            .collect();
        records.sort_by(|a, b| b.subscription.date.cmp(&a.subscription.date));
        Ok(records)
    }

    async fn list_page(&self, query: &ListingQuery) -> BillingResult<SubscriptionListing> {
        let records = self.list_subscriptions().await?;
        let tables = self.tables.read().await;
        Ok(admin::build_listing(
            records,
            |user_id| tables.subscribers.get(&user_id).cloned(),
            query,
        ))
    }
}
