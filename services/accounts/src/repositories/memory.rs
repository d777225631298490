//! In-memory account repository (for development and testing)

use async_trait::async_trait;
use chrono::Utc;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AccountRepository, RepositoryError, RepositoryResult, UniqueField};
use crate::models::{Account, NewAccount};

/// Account repository holding everything in a process-local map.
///
/// Uniqueness checks and the insert happen under one write lock, so two
/// concurrent registrations for the same identity cannot both succeed.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAccountRepository {
    accounts: Arc<RwLock<HashMap<Uuid, Account>>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts
    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }

    /// Flip the active flag of a user, returning false if it does not exist
    pub async fn set_active(&self, id: Uuid, is_active: bool) -> bool {
        match self.accounts.write().await.get_mut(&id) {
            Some(account) => {
                account.user.is_active = is_active;
                true
            }
            None => false,
        }
    }

    async fn any(&self, predicate: impl Fn(&Account) -> bool) -> bool {
        self.accounts.read().await.values().any(predicate)
    }
}

fn conflict(accounts: &HashMap<Uuid, Account>, new_account: &NewAccount) -> Option<UniqueField> {
    accounts.values().find_map(|account| {
        if account.user.email == new_account.email {
            Some(UniqueField::Email)
        } else if account.user.username == new_account.username {
            Some(UniqueField::Username)
        } else if account.profile.phone_number == new_account.phone_number {
            Some(UniqueField::PhoneNumber)
        } else {
            None
        }
    })
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn email_exists(&self, email: &str) -> RepositoryResult<bool> {
        Ok(self.any(|account| account.user.email == email).await)
    }

    async fn username_exists(&self, username: &str) -> RepositoryResult<bool> {
        Ok(self.any(|account| account.user.username == username).await)
    }

    async fn phone_number_exists(&self, phone_number: &str) -> RepositoryResult<bool> {
        Ok(self
            .any(|account| account.profile.phone_number == phone_number)
            .await)
    }

    async fn create_account(&self, new_account: NewAccount) -> RepositoryResult<Account> {
        let mut accounts = self.accounts.write().await;

        if let Some(field) = conflict(&accounts, &new_account) {
            return Err(RepositoryError::Conflict(field));
        }

        let account = new_account.into_account(Uuid::new_v4(), Utc::now());
        accounts.insert(account.user.id, account.clone());

        tracing::info!(user_id = %account.user.id, "Created account");
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|account| account.user.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Account>> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(true)
    }
}
