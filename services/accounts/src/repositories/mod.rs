//! Repositories for account persistence
//!
//! [`AccountRepository`] is the seam between the handlers and storage.
//! Uniqueness of email, username and phone number is enforced by the store
//! itself, atomically with the write, and surfaces as
//! [`RepositoryError::Conflict`].

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    models::{Account, NewAccount},
    validation,
};

pub mod memory;
pub mod user;

pub use memory::InMemoryAccountRepository;
pub use user::PgAccountRepository;

/// A column carrying a uniqueness constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    Username,
    PhoneNumber,
}

impl UniqueField {
    /// Request field the constraint is reported against
    pub fn field_name(&self) -> &'static str {
        match self {
            UniqueField::Email => "email",
            UniqueField::Username => "username",
            UniqueField::PhoneNumber => "phone_number",
        }
    }

    /// Message reported when the constraint is violated
    pub fn message(&self) -> &'static str {
        match self {
            UniqueField::Email => validation::EMAIL_TAKEN,
            UniqueField::Username => validation::USERNAME_TAKEN,
            UniqueField::PhoneNumber => validation::PHONE_NUMBER_TAKEN,
        }
    }

    /// Map a database constraint name to its field
    pub fn from_constraint(constraint: &str) -> Option<Self> {
        match constraint {
            "users_email_key" => Some(UniqueField::Email),
            "users_username_key" => Some(UniqueField::Username),
            "profiles_phone_number_key" => Some(UniqueField::PhoneNumber),
            _ => None,
        }
    }
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Repository errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A uniqueness constraint rejected the write
    #[error("{0} is already registered")]
    Conflict(UniqueField),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be mapped back to a model
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Repository trait for User+Profile persistence
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Check if an email (already normalized) is registered
    async fn email_exists(&self, email: &str) -> RepositoryResult<bool>;

    /// Check if a username is registered
    async fn username_exists(&self, username: &str) -> RepositoryResult<bool>;

    /// Check if a phone number (digits only) is registered
    async fn phone_number_exists(&self, phone_number: &str) -> RepositoryResult<bool>;

    /// Create a user and its profile as one atomic unit
    async fn create_account(&self, new_account: NewAccount) -> RepositoryResult<Account>;

    /// Find an account by normalized email
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<Account>>;

    /// Find an account by user ID
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Account>>;

    /// Check that the store is reachable
    async fn health_check(&self) -> RepositoryResult<bool>;
}
