//! Account business logic: registration, login, introspection and refresh

use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    jwt::{JwtService, TokenPair, TokenType},
    models::{Account, NewAccount},
    password,
    repositories::AccountRepository,
    validation::{self, FieldErrors},
};

/// Raw registration input, before validation
///
/// Fields hold the JSON exactly as sent, so a value of the wrong type is
/// reported against its own field instead of failing the whole request.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub email: Option<Value>,
    pub username: Option<Value>,
    pub password: Option<Value>,
    pub password_confirm: Option<Value>,
    pub profile: Option<Value>,
}

/// Service layer for account operations
#[derive(Clone)]
pub struct AccountService {
    repository: Arc<dyn AccountRepository>,
    jwt_service: JwtService,
}

impl AccountService {
    pub fn new(repository: Arc<dyn AccountRepository>, jwt_service: JwtService) -> Self {
        Self {
            repository,
            jwt_service,
        }
    }

    /// Validate a registration, create the user and its profile, and issue tokens
    pub async fn register(&self, registration: Registration) -> ApiResult<(Account, TokenPair)> {
        let new_account = self.validate_registration(registration).await?;

        info!("Registering user: {}", new_account.username);
        let account = self.repository.create_account(new_account).await?;
        let tokens = self.jwt_service.issue_pair(account.user.id)?;

        info!(user_id = %account.user.id, "User registered");
        Ok((account, tokens))
    }

    /// Run every field rule, then the uniqueness checks for fields that passed,
    /// and hash the password once everything holds.
    async fn validate_registration(&self, registration: Registration) -> ApiResult<NewAccount> {
        let mut errors = FieldErrors::new();

        let email = errors.check(
            "email",
            validation::text_field(registration.email.as_ref())
                .and_then(|email| validation::validate_email(email.as_deref())),
        );
        let username = errors.check(
            "username",
            validation::text_field(registration.username.as_ref())
                .and_then(|username| validation::validate_username(username.as_deref())),
        );
        let raw_password = validation::text_field(registration.password.as_ref());
        let password = errors.check(
            "password",
            raw_password
                .clone()
                .and_then(|password| validation::validate_password(password.as_deref())),
        );
        let submitted_password = raw_password.as_ref().ok().and_then(|p| p.as_deref());
        errors.check(
            "password_confirm",
            validation::text_field(registration.password_confirm.as_ref()).and_then(|confirm| {
                validation::validate_password_confirm(submitted_password, confirm.as_deref())
            }),
        );

        let (phone_number, role, date_of_birth) = match errors.check(
            "profile",
            validation::object_field(registration.profile.as_ref()),
        ) {
            Some(profile) => (
                errors.check(
                    "phone_number",
                    validation::text_field(profile.and_then(|p| p.get("phone_number"))).and_then(
                        |phone_number| validation::normalize_phone_number(phone_number.as_deref()),
                    ),
                ),
                errors.check(
                    "role",
                    validation::text_field(profile.and_then(|p| p.get("role")))
                        .and_then(|role| validation::parse_role(role.as_deref())),
                ),
                errors.check(
                    "date_of_birth",
                    validation::text_field(profile.and_then(|p| p.get("date_of_birth"))).and_then(
                        |date| validation::parse_date_of_birth(date.as_deref()),
                    ),
                ),
            ),
            None => (None, None, None),
        };

        if let Some(email) = &email {
            if self.repository.email_exists(email).await? {
                errors.add("email", validation::EMAIL_TAKEN);
            }
        }
        if let Some(username) = &username {
            if self.repository.username_exists(username).await? {
                errors.add("username", validation::USERNAME_TAKEN);
            }
        }
        if let Some(phone_number) = &phone_number {
            if self.repository.phone_number_exists(phone_number).await? {
                errors.add("phone_number", validation::PHONE_NUMBER_TAKEN);
            }
        }

        let (
            true,
            Some(email),
            Some(username),
            Some(password),
            Some(phone_number),
            Some(role),
            Some(date_of_birth),
        ) = (
            errors.is_empty(),
            email,
            username,
            password,
            phone_number,
            role,
            date_of_birth,
        )
        else {
            return Err(ApiError::Validation(errors));
        };

        let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&password))
            .await
            .map_err(ApiError::internal)?
            .map_err(ApiError::Internal)?;

        Ok(NewAccount {
            email,
            username,
            password_hash,
            phone_number,
            role,
            date_of_birth,
        })
    }

    /// Check credentials and issue a fresh token pair
    pub async fn login(
        &self,
        email: Option<&Value>,
        password: Option<&Value>,
    ) -> ApiResult<(Account, TokenPair)> {
        let mut errors = FieldErrors::new();
        let email = match validation::text_field(email) {
            Ok(Some(email)) if !email.trim().is_empty() => {
                Some(validation::normalize_email(&email))
            }
            Ok(_) => {
                errors.add("email", validation::REQUIRED);
                None
            }
            Err(message) => {
                errors.add("email", message);
                None
            }
        };
        let password = match validation::text_field(password) {
            Ok(Some(password)) if !password.is_empty() => Some(password),
            Ok(_) => {
                errors.add("password", validation::REQUIRED);
                None
            }
            Err(message) => {
                errors.add("password", message);
                None
            }
        };
        let (Some(email), Some(password)) = (email, password) else {
            return Err(ApiError::Validation(errors));
        };

        info!("Login attempt for: {}", email);

        let account = self.repository.find_by_email(&email).await?;
        let password_hash = account.as_ref().map(|a| a.user.password_hash.clone());

        let verified = tokio::task::spawn_blocking(move || match password_hash {
            Some(hash) => password::verify_password(&password, &hash),
            None => {
                password::verify_against_dummy(&password);
                Ok(false)
            }
        })
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::Internal)?;

        let account = match (account, verified) {
            (Some(account), true) => account,
            _ => {
                warn!("Failed login attempt for: {}", email);
                return Err(ApiError::InvalidCredentials);
            }
        };

        if !account.user.is_active {
            warn!(user_id = %account.user.id, "Login attempt for disabled account");
            return Err(ApiError::AccountDisabled);
        }

        let tokens = self.jwt_service.issue_pair(account.user.id)?;
        Ok((account, tokens))
    }

    /// Resolve the active account a verified token points at
    pub async fn active_account(&self, user_id: Uuid) -> ApiResult<Account> {
        match self.repository.find_by_id(user_id).await? {
            Some(account) if account.user.is_active => Ok(account),
            _ => Err(ApiError::InvalidToken),
        }
    }

    /// Verify an access token and resolve its account
    pub async fn authenticate(&self, access_token: &str) -> ApiResult<Account> {
        let claims = self
            .jwt_service
            .validate_token(access_token, TokenType::Access)?;
        self.active_account(claims.sub).await
    }

    /// Exchange a refresh token for a new access token and a rotated refresh token
    pub async fn refresh(&self, refresh_token: Option<&Value>) -> ApiResult<TokenPair> {
        let refresh_token = match validation::text_field(refresh_token) {
            Ok(Some(token)) if !token.is_empty() => token,
            Ok(_) => {
                return Err(ApiError::Validation(FieldErrors::single(
                    "refresh",
                    validation::REQUIRED,
                )));
            }
            Err(message) => {
                return Err(ApiError::Validation(FieldErrors::single("refresh", message)));
            }
        };

        let claims = self
            .jwt_service
            .validate_token(&refresh_token, TokenType::Refresh)?;
        let account = self.active_account(claims.sub).await?;

        info!(user_id = %account.user.id, "Token refresh");
        Ok(self.jwt_service.issue_pair(account.user.id)?)
    }

    /// Check that the backing store answers
    pub async fn health_check(&self) -> bool {
        match self.repository.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!("Store health check failed: {}", e);
                false
            }
        }
    }
}
