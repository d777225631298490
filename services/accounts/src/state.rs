//! Application state shared across handlers

use std::sync::Arc;

use crate::{jwt::JwtService, repositories::AccountRepository, service::AccountService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
}

impl AppState {
    pub fn new(repository: Arc<dyn AccountRepository>, jwt_service: JwtService) -> Self {
        Self {
            accounts: AccountService::new(repository, jwt_service),
        }
    }
}
