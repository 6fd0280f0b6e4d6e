//! `PostgreSQL` implementation of the repository traits.
//!
//! Queries are checked at runtime (`sqlx::query_as` + `FromRow` rows) so the
//! crate builds without a live database or an offline query cache.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use bazaar_core::{
    AccountId, ChatPresetId, DeviceId, Email, PendingRegistrationId, VerificationCode,
};

use super::{
    AccountRepository, ChatPresetRepository, PendingRegistrationRepository, RepositoryError,
    Store, map_unique_violation,
};
use crate::models::{
    Account, CartData, ChatPreset, NewChatPreset, NewPendingRegistration, PendingRegistration,
    ProfileUpdate,
};

macro_rules! account_columns {
    () => {
        "id, name, email, password_hash, verified, phone, address, joined_at, cart_data, \
         one_time_token, one_time_token_expires_at, device_ids"
    };
}

macro_rules! pending_columns {
    () => {
        "id, name, email, password_hash, code, created_at, expires_at"
    };
}

/// Repository backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn account_exists(&self, id: AccountId) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM bazaar.account WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }
}

// =============================================================================
// Row types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: i32,
    name: String,
    email: String,
    password_hash: String,
    verified: bool,
    phone: Option<String>,
    address: Option<serde_json::Value>,
    joined_at: DateTime<Utc>,
    cart_data: Json<CartData>,
    one_time_token: Option<String>,
    one_time_token_expires_at: Option<DateTime<Utc>>,
    device_ids: Vec<String>,
}

impl TryFrom<AccountRow> for Account {
    type Error = RepositoryError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: AccountId::new(row.id),
            name: row.name,
            email,
            password_hash: row.password_hash,
            verified: row.verified,
            phone: row.phone,
            address: row.address,
            joined_at: row.joined_at,
            cart: row.cart_data.0,
            one_time_token: row.one_time_token,
            one_time_token_expires_at: row.one_time_token_expires_at,
            devices: row.device_ids,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PendingRow {
    id: i32,
    name: String,
    email: String,
    password_hash: String,
    code: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TryFrom<PendingRow> for PendingRegistration {
    type Error = RepositoryError;

    fn try_from(row: PendingRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let code = VerificationCode::parse(&row.code).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid code in database: {e}"))
        })?;

        Ok(Self {
            id: PendingRegistrationId::new(row.id),
            name: row.name,
            email,
            password_hash: row.password_hash,
            code,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ChatPresetRow {
    id: i32,
    question: String,
    responses: Vec<String>,
    keywords: Vec<String>,
}

impl From<ChatPresetRow> for ChatPreset {
    fn from(row: ChatPresetRow) -> Self {
        Self {
            id: ChatPresetId::new(row.id),
            question: row.question,
            responses: row.responses,
            keywords: row.keywords,
        }
    }
}

// =============================================================================
// Accounts
// =============================================================================

#[async_trait]
impl AccountRepository for PgStore {
    async fn get_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(concat!(
            "SELECT ",
            account_columns!(),
            " FROM bazaar.account WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(concat!(
            "SELECT ",
            account_columns!(),
            " FROM bazaar.account WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn set_one_time_token_if_absent(
        &self,
        id: AccountId,
        token: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Account, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent issuers on the same account.
        let current = sqlx::query_as::<_, AccountRow>(concat!(
            "SELECT ",
            account_columns!(),
            " FROM bazaar.account WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;
        let current = Account::try_from(current)?;

        if current.live_one_time_token(now).is_some() {
            tx.commit().await?;
            return Ok(current);
        }

        let row = sqlx::query_as::<_, AccountRow>(concat!(
            "UPDATE bazaar.account SET one_time_token = $2, one_time_token_expires_at = $3 ",
            "WHERE id = $1 RETURNING ",
            account_columns!()
        ))
        .bind(id)
        .bind(token)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;
        let account = Account::try_from(row)?;
        tx.commit().await?;

        Ok(account)
    }

    async fn consume_one_time_token(
        &self,
        id: AccountId,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let consumed: Option<i32> = sqlx::query_scalar(
            r"
            UPDATE bazaar.account
            SET one_time_token = NULL, one_time_token_expires_at = NULL
            WHERE id = $1 AND one_time_token = $2 AND one_time_token_expires_at > $3
            RETURNING id
            ",
        )
        .bind(id)
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(consumed.is_some())
    }

    async fn record_device(
        &self,
        id: AccountId,
        device: &DeviceId,
    ) -> Result<bool, RepositoryError> {
        // Single conditional UPDATE: two concurrent logins cannot both append.
        let appended: Option<i32> = sqlx::query_scalar(
            r"
            UPDATE bazaar.account
            SET device_ids = array_append(device_ids, $2)
            WHERE id = $1 AND NOT ($2 = ANY(device_ids))
            RETURNING id
            ",
        )
        .bind(id)
        .bind(device.as_str())
        .fetch_optional(&self.pool)
        .await?;

        if appended.is_some() {
            return Ok(true);
        }
        if self.account_exists(id).await? {
            Ok(false)
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    async fn update_profile(
        &self,
        id: AccountId,
        update: &ProfileUpdate,
    ) -> Result<Account, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(concat!(
            "UPDATE bazaar.account SET name = $2, email = $3, phone = $4, address = $5 ",
            "WHERE id = $1 RETURNING ",
            account_columns!()
        ))
        .bind(id)
        .bind(&update.name)
        .bind(&update.email)
        .bind(update.phone.as_deref())
        .bind(update.address.clone())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "email"))?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }
}

// =============================================================================
// Pending registrations
// =============================================================================

#[async_trait]
impl PendingRegistrationRepository for PgStore {
    async fn get_pending(
        &self,
        email: &Email,
    ) -> Result<Option<PendingRegistration>, RepositoryError> {
        let row = sqlx::query_as::<_, PendingRow>(concat!(
            "SELECT ",
            pending_columns!(),
            " FROM bazaar.pending_registration WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn create_pending(
        &self,
        pending: &NewPendingRegistration,
    ) -> Result<PendingRegistration, RepositoryError> {
        let row = sqlx::query_as::<_, PendingRow>(concat!(
            "INSERT INTO bazaar.pending_registration (name, email, password_hash, code, expires_at) ",
            "VALUES ($1, $2, $3, $4, $5) RETURNING ",
            pending_columns!()
        ))
        .bind(&pending.name)
        .bind(&pending.email)
        .bind(&pending.password_hash)
        .bind(&pending.code)
        .bind(pending.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "pending registration"))?;

        row.try_into()
    }

    async fn delete_pending(&self, id: PendingRegistrationId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM bazaar.pending_registration WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn promote_pending(&self, id: PendingRegistrationId) -> Result<Account, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let pending = sqlx::query_as::<_, PendingRow>(concat!(
            "DELETE FROM bazaar.pending_registration WHERE id = $1 RETURNING ",
            pending_columns!()
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let row = sqlx::query_as::<_, AccountRow>(concat!(
            "INSERT INTO bazaar.account (name, email, password_hash, verified) ",
            "VALUES ($1, $2, $3, TRUE) RETURNING ",
            account_columns!()
        ))
        .bind(&pending.name)
        .bind(&pending.email)
        .bind(&pending.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "email"))?;

        let account = Account::try_from(row)?;
        tx.commit().await?;

        Ok(account)
    }

    async fn purge_expired_pending(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM bazaar.pending_registration WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// Chat presets
// =============================================================================

#[async_trait]
impl ChatPresetRepository for PgStore {
    async fn list_presets(&self) -> Result<Vec<ChatPreset>, RepositoryError> {
        let rows = sqlx::query_as::<_, ChatPresetRow>(
            "SELECT id, question, responses, keywords FROM bazaar.chat_preset ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_preset(&self, preset: &NewChatPreset) -> Result<ChatPreset, RepositoryError> {
        let row = sqlx::query_as::<_, ChatPresetRow>(
            r"
            INSERT INTO bazaar.chat_preset (question, responses, keywords)
            VALUES ($1, $2, $3)
            RETURNING id, question, responses, keywords
            ",
        )
        .bind(&preset.question)
        .bind(&preset.responses)
        .bind(&preset.keywords)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update_preset(
        &self,
        id: ChatPresetId,
        preset: &NewChatPreset,
    ) -> Result<Option<ChatPreset>, RepositoryError> {
        let row = sqlx::query_as::<_, ChatPresetRow>(
            r"
            UPDATE bazaar.chat_preset
            SET question = $2, responses = $3, keywords = $4
            WHERE id = $1
            RETURNING id, question, responses, keywords
            ",
        )
        .bind(id)
        .bind(&preset.question)
        .bind(&preset.responses)
        .bind(&preset.keywords)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn delete_preset(&self, id: ChatPresetId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM bazaar.chat_preset WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
