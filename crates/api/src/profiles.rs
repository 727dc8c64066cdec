//! Account profiles
//!
//! Profiles belong to the registration site's account management. This
//! service only reads them: the name gates subscribing and the category sets
//! the price. The admin listing reads names straight from the tables.

use std::collections::HashMap;

use async_trait::async_trait;
use confreg_billing::{Category, Subscriber};
use sqlx::{FromRow, PgPool};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ApiResult;

#[derive(Debug, Clone, PartialEq)]
pub struct AccountProfile {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    /// Display name; empty when the user never filled it in
    pub name: String,
    pub category: Option<Category>,
}

impl AccountProfile {
    /// A profile is usable for subscribing once it has a name and a category
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && self.category.is_some()
    }
}

impl From<AccountProfile> for Subscriber {
    fn from(profile: AccountProfile) -> Self {
        let name = Some(profile.name).filter(|n| !n.is_empty());
        Subscriber {
            username: profile.username,
            email: profile.email,
            name,
        }
    }
}

#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn profile(&self, user_id: Uuid) -> ApiResult<Option<AccountProfile>>;
}

#[derive(Debug, FromRow)]
struct ProfileRow {
    user_id: Uuid,
    username: String,
    email: String,
    name: String,
    category: Option<String>,
}

impl From<ProfileRow> for AccountProfile {
    fn from(row: ProfileRow) -> Self {
        let category = row.category.as_deref().and_then(|c| match c.parse() {
            Ok(category) => Some(category),
            Err(_) => {
                tracing::warn!(user_id = %row.user_id, category = %c, "Unrecognized profile category");
                None
            }
        });

        AccountProfile {
            user_id: row.user_id,
            username: row.username,
            email: row.email,
            name: row.name,
            category,
        }
    }
}

pub struct PgProfileDirectory {
    pool: PgPool,
}

impl PgProfileDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileDirectory for PgProfileDirectory {
    async fn profile(&self, user_id: Uuid) -> ApiResult<Option<AccountProfile>> {
        let row: Option<ProfileRow> = sqlx::query_as(
            r#"
            SELECT u.id AS user_id, u.username, u.email, p.name, p.category
            FROM users u
            JOIN account_profiles p ON p.user_id = u.id
            WHERE u.id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AccountProfile::from))
    }
}

#[derive(Default)]
pub struct InMemoryProfileDirectory {
    profiles: RwLock<HashMap<Uuid, AccountProfile>>,
}

impl InMemoryProfileDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, profile: AccountProfile) {
        self.profiles.write().await.insert(profile.user_id, profile);
    }
}

#[async_trait]
impl ProfileDirectory for InMemoryProfileDirectory {
    async fn profile(&self, user_id: Uuid) -> ApiResult<Option<AccountProfile>> {
        Ok(self.profiles.read().await.get(&user_id).cloned())
    }
}
