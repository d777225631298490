//! PostgreSQL account repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use tracing::{info, warn};
use uuid::Uuid;

use super::{AccountRepository, RepositoryError, RepositoryResult, UniqueField};
use crate::models::{Account, NewAccount, Profile, Role, User};

const SELECT_ACCOUNT: &str = r#"
    SELECT u.id, u.email, u.username, u.password_hash, u.is_active, u.is_verified,
           u.created_at, p.phone_number, p.role, p.date_of_birth
    FROM users u
    JOIN profiles p ON p.user_id = u.id
"#;

/// Account repository backed by PostgreSQL
#[derive(Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    /// Create a new account repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, query: &str, value: &str) -> RepositoryResult<bool> {
        let exists: bool = sqlx::query_scalar(query)
            .bind(value)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

/// Insert both rows of an account inside `tx`, returning the stored creation time
async fn insert_account(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    new_account: &NewAccount,
) -> Result<DateTime<Utc>, sqlx::Error> {
    let created_at: DateTime<Utc> = sqlx::query_scalar(
        r#"
        INSERT INTO users (id, email, username, password_hash)
        VALUES ($1, $2, $3, $4)
        RETURNING created_at
        "#,
    )
    .bind(id)
    .bind(&new_account.email)
    .bind(&new_account.username)
    .bind(&new_account.password_hash)
    .fetch_one(&mut **tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO profiles (user_id, phone_number, role, date_of_birth)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(id)
    .bind(&new_account.phone_number)
    .bind(new_account.role.as_str())
    .bind(new_account.date_of_birth)
    .execute(&mut **tx)
    .await?;

    Ok(created_at)
}

/// Turn a unique violation into a conflict on the field it protects
fn classify(error: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_error) = &error {
        if db_error.is_unique_violation() {
            if let Some(field) = db_error.constraint().and_then(UniqueField::from_constraint) {
                return RepositoryError::Conflict(field);
            }
        }
    }
    RepositoryError::Database(error)
}

fn account_from_row(row: &PgRow) -> RepositoryResult<Account> {
    let id: Uuid = row.try_get("id")?;
    let role: String = row.try_get("role")?;
    let role = role
        .parse::<Role>()
        .map_err(|e| RepositoryError::Corrupt(format!("profile of user {}: {}", id, e)))?;

    Ok(Account {
        user: User {
            id,
            email: row.try_get("email")?,
            username: row.try_get("username")?,
            password_hash: row.try_get("password_hash")?,
            is_active: row.try_get("is_active")?,
            is_verified: row.try_get("is_verified")?,
            created_at: row.try_get("created_at")?,
        },
        profile: Profile {
            user_id: id,
            phone_number: row.try_get("phone_number")?,
            role,
            date_of_birth: row.try_get("date_of_birth")?,
        },
    })
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn email_exists(&self, email: &str) -> RepositoryResult<bool> {
        self.exists("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)", email)
            .await
    }

    async fn username_exists(&self, username: &str) -> RepositoryResult<bool> {
        self.exists(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)",
            username,
        )
        .await
    }

    async fn phone_number_exists(&self, phone_number: &str) -> RepositoryResult<bool> {
        self.exists(
            "SELECT EXISTS(SELECT 1 FROM profiles WHERE phone_number = $1)",
            phone_number,
        )
        .await
    }

    async fn create_account(&self, new_account: NewAccount) -> RepositoryResult<Account> {
        info!("Creating new account: {}", new_account.username);

        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        match insert_account(&mut tx, id, &new_account).await {
            Ok(created_at) => {
                tx.commit().await.map_err(classify)?;
                Ok(new_account.into_account(id, created_at))
            }
            Err(e) => {
                if let Err(rollback_error) = tx.rollback().await {
                    warn!("Failed to roll back account creation: {}", rollback_error);
                }
                Err(classify(e))
            }
        }
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<Account>> {
        info!("Finding account by email: {}", email);

        let sql = format!("{} WHERE u.email = $1", SELECT_ACCOUNT);
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Account>> {
        let sql = format!("{} WHERE u.id = $1", SELECT_ACCOUNT);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn health_check(&self) -> RepositoryResult<bool> {
        match common::database::health_check(&self.pool).await {
            Ok(healthy) => Ok(healthy),
            Err(e) => {
                warn!("Database health check failed: {}", e);
                Ok(false)
            }
        }
    }
}
