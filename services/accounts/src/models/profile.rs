//! Profile model and related functionality

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;

/// Profile entity, one per user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub user_id: Uuid,
    /// Digits only; formatting is stripped before storage
    pub phone_number: String,
    pub role: Role,
    pub date_of_birth: Option<NaiveDate>,
}

/// Public view of a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub phone_number: String,
    pub role: Role,
    pub date_of_birth: Option<NaiveDate>,
}

impl From<&Profile> for ProfileResponse {
    fn from(profile: &Profile) -> Self {
        Self {
            phone_number: profile.phone_number.clone(),
            role: profile.role,
            date_of_birth: profile.date_of_birth,
        }
    }
}
