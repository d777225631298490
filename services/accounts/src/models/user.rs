//! User model and related functionality

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Profile, ProfileResponse, Role};

/// User entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// A user together with its profile, as persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub user: User,
    pub profile: Profile,
}

/// Validated registration data ready to be persisted.
///
/// The password is already hashed; fields are normalized.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub phone_number: String,
    pub role: Role,
    pub date_of_birth: Option<NaiveDate>,
}

impl NewAccount {
    /// Build the entity pair this payload describes, stamped with `id` and `created_at`
    pub fn into_account(self, id: Uuid, created_at: DateTime<Utc>) -> Account {
        Account {
            user: User {
                id,
                email: self.email,
                username: self.username,
                password_hash: self.password_hash,
                is_active: true,
                is_verified: false,
                created_at,
            },
            profile: Profile {
                user_id: id,
                phone_number: self.phone_number,
                role: self.role,
                date_of_birth: self.date_of_birth,
            },
        }
    }
}

/// Public view of a user with its nested profile. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub profile: ProfileResponse,
}

impl From<&Account> for UserResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.user.id,
            email: account.user.email.clone(),
            username: account.user.username.clone(),
            is_active: account.user.is_active,
            is_verified: account.user.is_verified,
            created_at: account.user.created_at,
            profile: ProfileResponse::from(&account.profile),
        }
    }
}
