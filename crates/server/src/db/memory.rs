//! Process-local implementation of the repository traits.
//!
//! All state sits behind one `tokio::sync::Mutex`, so every operation
//! (including the conditional ones) is atomic with respect to the others.
//! Nothing survives a restart.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use bazaar_core::{AccountId, ChatPresetId, DeviceId, Email, PendingRegistrationId};

use super::{
    AccountRepository, ChatPresetRepository, PendingRegistrationRepository, RepositoryError,
    Store,
};
use crate::models::{
    Account, CartData, ChatPreset, NewChatPreset, NewPendingRegistration, PendingRegistration,
    ProfileUpdate,
};

#[derive(Debug, Default)]
struct Inner {
    accounts: BTreeMap<AccountId, Account>,
    pending: BTreeMap<PendingRegistrationId, PendingRegistration>,
    presets: BTreeMap<ChatPresetId, ChatPreset>,
    next_account: i32,
    next_pending: i32,
    next_preset: i32,
}

impl Inner {
    fn account_by_email(&self, email: &Email) -> Option<&Account> {
        self.accounts.values().find(|a| &a.email == email)
    }

    fn account_mut(&mut self, id: AccountId) -> Result<&mut Account, RepositoryError> {
        self.accounts.get_mut(&id).ok_or(RepositoryError::NotFound)
    }
}

fn next_id(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

/// In-memory store for tests and database-less development.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the verification flag directly, as an account import would.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist.
    pub async fn set_verified(&self, id: AccountId, verified: bool) -> Result<(), RepositoryError> {
        self.inner.lock().await.account_mut(id)?.verified = verified;
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for MemoryStore {
    async fn get_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError> {
        Ok(self.inner.lock().await.account_by_email(email).cloned())
    }

    async fn get_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        Ok(self.inner.lock().await.accounts.get(&id).cloned())
    }

    async fn set_one_time_token_if_absent(
        &self,
        id: AccountId,
        token: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Account, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let account = inner.account_mut(id)?;
        if account.live_one_time_token(now).is_none() {
            account.one_time_token = Some(token.to_owned());
            account.one_time_token_expires_at = Some(expires_at);
        }
        Ok(account.clone())
    }

    async fn consume_one_time_token(
        &self,
        id: AccountId,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let Some(account) = inner.accounts.get_mut(&id) else {
            return Ok(false);
        };
        if account.live_one_time_token(now) != Some(token) {
            return Ok(false);
        }
        account.one_time_token = None;
        account.one_time_token_expires_at = None;
        Ok(true)
    }

    async fn record_device(
        &self,
        id: AccountId,
        device: &DeviceId,
    ) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let account = inner.account_mut(id)?;
        if account.knows_device(device) {
            return Ok(false);
        }
        account.devices.push(device.as_str().to_owned());
        Ok(true)
    }

    async fn update_profile(
        &self,
        id: AccountId,
        update: &ProfileUpdate,
    ) -> Result<Account, RepositoryError> {
        let mut inner = self.inner.lock().await;
        if inner
            .account_by_email(&update.email)
            .is_some_and(|other| other.id != id)
        {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        let account = inner.account_mut(id)?;
        account.name.clone_from(&update.name);
        account.email = update.email.clone();
        account.phone.clone_from(&update.phone);
        account.address.clone_from(&update.address);
        Ok(account.clone())
    }
}

#[async_trait]
impl PendingRegistrationRepository for MemoryStore {
    async fn get_pending(
        &self,
        email: &Email,
    ) -> Result<Option<PendingRegistration>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner.pending.values().find(|p| &p.email == email).cloned())
    }

    async fn create_pending(
        &self,
        pending: &NewPendingRegistration,
    ) -> Result<PendingRegistration, RepositoryError> {
        let mut inner = self.inner.lock().await;
        if inner.pending.values().any(|p| p.email == pending.email) {
            return Err(RepositoryError::Conflict(
                "pending registration already exists".to_owned(),
            ));
        }
        let id = PendingRegistrationId::new(next_id(&mut inner.next_pending));
        let record = PendingRegistration {
            id,
            name: pending.name.clone(),
            email: pending.email.clone(),
            password_hash: pending.password_hash.clone(),
            code: pending.code.clone(),
            created_at: Utc::now(),
            expires_at: pending.expires_at,
        };
        inner.pending.insert(id, record.clone());
        Ok(record)
    }

    async fn delete_pending(&self, id: PendingRegistrationId) -> Result<bool, RepositoryError> {
        Ok(self.inner.lock().await.pending.remove(&id).is_some())
    }

    async fn promote_pending(&self, id: PendingRegistrationId) -> Result<Account, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let Some(pending) = inner.pending.get(&id) else {
            return Err(RepositoryError::NotFound);
        };
        if inner.account_by_email(&pending.email).is_some() {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        let Some(pending) = inner.pending.remove(&id) else {
            return Err(RepositoryError::NotFound);
        };

        let account_id = AccountId::new(next_id(&mut inner.next_account));
        let account = Account {
            id: account_id,
            name: pending.name,
            email: pending.email,
            password_hash: pending.password_hash,
            verified: true,
            phone: None,
            address: None,
            joined_at: Utc::now(),
            cart: CartData::new(),
            one_time_token: None,
            one_time_token_expires_at: None,
            devices: Vec::new(),
        };
        inner.accounts.insert(account_id, account.clone());
        Ok(account)
    }

    async fn purge_expired_pending(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let before = inner.pending.len();
        inner.pending.retain(|_, p| !p.is_expired(now));
        Ok(u64::try_from(before - inner.pending.len()).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl ChatPresetRepository for MemoryStore {
    async fn list_presets(&self) -> Result<Vec<ChatPreset>, RepositoryError> {
        Ok(self.inner.lock().await.presets.values().cloned().collect())
    }

    async fn create_preset(&self, preset: &NewChatPreset) -> Result<ChatPreset, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let id = ChatPresetId::new(next_id(&mut inner.next_preset));
        let record = ChatPreset {
            id,
            question: preset.question.clone(),
            responses: preset.responses.clone(),
            keywords: preset.keywords.clone(),
        };
        inner.presets.insert(id, record.clone());
        Ok(record)
    }

    async fn update_preset(
        &self,
        id: ChatPresetId,
        preset: &NewChatPreset,
    ) -> Result<Option<ChatPreset>, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let Some(existing) = inner.presets.get_mut(&id) else {
            return Ok(None);
        };
        existing.question.clone_from(&preset.question);
        existing.responses.clone_from(&preset.responses);
        existing.keywords.clone_from(&preset.keywords);
        Ok(Some(existing.clone()))
    }

    async fn delete_preset(&self, id: ChatPresetId) -> Result<bool, RepositoryError> {
        Ok(self.inner.lock().await.presets.remove(&id).is_some())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bazaar_core::VerificationCode;
    use chrono::Duration;

    fn new_pending(email: &str, expires_at: DateTime<Utc>) -> NewPendingRegistration {
        NewPendingRegistration {
            name: "Ada".to_owned(),
            email: Email::parse(email).unwrap(),
            password_hash: "hash".to_owned(),
            code: VerificationCode::parse("123456").unwrap(),
            expires_at,
        }
    }

    async fn account(store: &MemoryStore, email: &str) -> Account {
        let pending = store
            .create_pending(&new_pending(email, Utc::now() + Duration::minutes(5)))
            .await
            .unwrap();
        store.promote_pending(pending.id).await.unwrap()
    }

    #[tokio::test]
    async fn test_promote_moves_pending_to_account() {
        let store = MemoryStore::new();
        let created = account(&store, "ada@example.com").await;

        assert!(created.verified);
        assert!(created.devices.is_empty());
        let email = Email::parse("ada@example.com").unwrap();
        assert!(store.get_pending(&email).await.unwrap().is_none());
        assert_eq!(
            store.get_by_email(&email).await.unwrap().unwrap().id,
            created.id
        );
    }

    #[tokio::test]
    async fn test_create_pending_rejects_duplicate_email() {
        let store = MemoryStore::new();
        let expiry = Utc::now() + Duration::minutes(5);
        store
            .create_pending(&new_pending("ada@example.com", expiry))
            .await
            .unwrap();

        let err = store
            .create_pending(&new_pending("ada@example.com", expiry))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_promote_missing_pending_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .promote_pending(PendingRegistrationId::new(42))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_record_device_only_once() {
        let store = MemoryStore::new();
        let created = account(&store, "ada@example.com").await;
        let device = DeviceId::parse("10.0.0.7").unwrap();

        assert!(store.record_device(created.id, &device).await.unwrap());
        assert!(!store.record_device(created.id, &device).await.unwrap());

        let reloaded = store.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(reloaded.devices, vec!["10.0.0.7".to_owned()]);
    }

    #[tokio::test]
    async fn test_record_device_concurrent_appends_once() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let created = account(&store, "ada@example.com").await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let device = DeviceId::parse("10.0.0.7").unwrap();
                store.record_device(created.id, &device).await.unwrap()
            }));
        }
        let mut new_count = 0;
        for handle in handles {
            if handle.await.unwrap() {
                new_count += 1;
            }
        }

        assert_eq!(new_count, 1);
        let reloaded = store.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(reloaded.devices.len(), 1);
    }

    #[tokio::test]
    async fn test_consume_one_time_token_is_single_use() {
        let store = MemoryStore::new();
        let created = account(&store, "ada@example.com").await;
        let now = Utc::now();
        store
            .set_one_time_token_if_absent(created.id, "tok", now + Duration::minutes(15), now)
            .await
            .unwrap();

        assert!(!store.consume_one_time_token(created.id, "other", now).await.unwrap());
        assert!(store.consume_one_time_token(created.id, "tok", now).await.unwrap());
        assert!(!store.consume_one_time_token(created.id, "tok", now).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_one_time_token_keeps_live_token() {
        let store = MemoryStore::new();
        let created = account(&store, "mei@example.com").await;
        let now = Utc::now();
        let later = now + Duration::minutes(15);

        let first = store
            .set_one_time_token_if_absent(created.id, "qr-first", later, now)
            .await
            .unwrap();
        assert_eq!(first.one_time_token.as_deref(), Some("qr-first"));

        // A second writer sees the live token and leaves it alone.
        let second = store
            .set_one_time_token_if_absent(created.id, "qr-second", later, now)
            .await
            .unwrap();
        assert_eq!(second.one_time_token.as_deref(), Some("qr-first"));

        // Once expired, the next writer replaces it.
        let after_expiry = later + Duration::seconds(1);
        let third = store
            .set_one_time_token_if_absent(
                created.id,
                "qr-third",
                after_expiry + Duration::minutes(15),
                after_expiry,
            )
            .await
            .unwrap();
        assert_eq!(third.one_time_token.as_deref(), Some("qr-third"));
    }

    #[tokio::test]
    async fn test_concurrent_one_time_token_writers_agree() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let id = account(&store, "mei@example.com").await.id;
        let now = Utc::now();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = std::sync::Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .set_one_time_token_if_absent(
                            id,
                            &format!("qr-{i}"),
                            now + Duration::minutes(15),
                            now,
                        )
                        .await
                        .unwrap()
                        .one_time_token
                        .unwrap()
                })
            })
            .collect();

        let mut seen = Vec::new();
        for handle in handles {
            seen.push(handle.await.unwrap());
        }
        seen.dedup();
        assert_eq!(seen.len(), 1, "writers saw different tokens: {seen:?}");

        let stored = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.one_time_token.as_ref(), seen.first());
    }

    #[tokio::test]
    async fn test_consume_expired_one_time_token_fails() {
        let store = MemoryStore::new();
        let created = account(&store, "ada@example.com").await;
        let now = Utc::now();
        store
            .set_one_time_token_if_absent(created.id, "tok", now - Duration::seconds(1), now)
            .await
            .unwrap();

        assert!(!store.consume_one_time_token(created.id, "tok", now).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_profile_email_conflict() {
        let store = MemoryStore::new();
        let ada = account(&store, "ada@example.com").await;
        account(&store, "bob@example.com").await;

        let update = ProfileUpdate {
            name: "Ada".to_owned(),
            email: Email::parse("bob@example.com").unwrap(),
            phone: None,
            address: None,
        };
        let err = store.update_profile(ada.id, &update).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_purge_expired_pending() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .create_pending(&new_pending("old@example.com", now - Duration::minutes(1)))
            .await
            .unwrap();
        store
            .create_pending(&new_pending("new@example.com", now + Duration::minutes(5)))
            .await
            .unwrap();

        assert_eq!(store.purge_expired_pending(now).await.unwrap(), 1);
        let fresh = Email::parse("new@example.com").unwrap();
        assert!(store.get_pending(&fresh).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_preset_crud() {
        let store = MemoryStore::new();
        let input = NewChatPreset {
            question: "Shipping?".to_owned(),
            responses: vec!["3-5 days".to_owned()],
            keywords: vec!["shipping".to_owned()],
        };
        let created = store.create_preset(&input).await.unwrap();
        assert_eq!(store.list_presets().await.unwrap().len(), 1);

        let updated = NewChatPreset {
            question: "Delivery?".to_owned(),
            ..input
        };
        let after = store.update_preset(created.id, &updated).await.unwrap().unwrap();
        assert_eq!(after.question, "Delivery?");

        assert!(store.delete_preset(created.id).await.unwrap());
        assert!(!store.delete_preset(created.id).await.unwrap());
        assert!(store.update_preset(created.id, &updated).await.unwrap().is_none());
    }
}
