//! Handle database requests.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::error::Result;
use crate::user::{CitizenProfile, NewAccount, ProfileFields, User};

/// Port for account persistence.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Whether an account already uses `email`.
    async fn exists_by_email(&self, email: &str) -> Result<bool>;

    /// Find an account by its exact email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Find an account by ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Find the citizen profile owned by `user_id`.
    async fn find_profile(&self, user_id: i64) -> Result<Option<CitizenProfile>>;

    /// Insert an account and, when given, its profile. Both rows are written
    /// or neither is. A duplicate email is [`crate::ServerError::Conflict`].
    async fn create(
        &self,
        account: &NewAccount,
        profile: Option<&ProfileFields>,
    ) -> Result<User>;
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at";

/// PostgreSQL account repository.
#[derive(Clone)]
pub struct PgAccountRepository {
    pool: Pool<Postgres>,
}

impl PgAccountRepository {
    /// Create a new [`PgAccountRepository`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn exists_by_email(&self, email: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_profile(&self, user_id: i64) -> Result<Option<CitizenProfile>> {
        Ok(sqlx::query_as::<_, CitizenProfile>(
            r#"SELECT id, user_id, dob, phone, address, gender, created_at
                FROM citizens WHERE user_id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create(
        &self,
        account: &NewAccount,
        profile: Option<&ProfileFields>,
    ) -> Result<User> {
        // Dropping `tx` on an early return rolls both writes back.
        let mut tx = self.pool.begin().await?;

        let query = format!(
            r#"INSERT INTO users (name, email, password_hash, role)
                VALUES ($1, $2, $3, $4)
                RETURNING {USER_COLUMNS}"#
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(&account.name)
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(account.role.as_str())
            .fetch_one(&mut *tx)
            .await?;

        if let Some(profile) = profile {
            sqlx::query(
                r#"INSERT INTO citizens (user_id, dob, phone, address, gender)
                    VALUES ($1, $2, $3, $4, $5)"#,
            )
            .bind(user.id)
            .bind(profile.dob)
            .bind(&profile.phone)
            .bind(&profile.address)
            .bind(&profile.gender)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(user)
    }
}
