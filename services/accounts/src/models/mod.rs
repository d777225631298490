//! Accounts service models

pub mod profile;
pub mod role;
pub mod user;

pub use profile::{Profile, ProfileResponse};
pub use role::{Role, UnknownRole};
pub use user::{Account, NewAccount, User, UserResponse};
