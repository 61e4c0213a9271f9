//! User and address repositories.

use super::types::{Address, User};
use crate::db::DbPool;
use crate::Result;

/// Repository for user rows.
pub struct UserRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert the user if missing and return it.
    ///
    /// Safe against concurrent first contact by the same identity.
    pub async fn get_or_create(&self, external_id: &str) -> Result<User> {
        sqlx::query("INSERT INTO users (external_id) VALUES ($1) ON CONFLICT (external_id) DO NOTHING")
            .bind(external_id)
            .execute(self.pool)
            .await?;

        let user = sqlx::query_as::<_, User>(
            "SELECT id, external_id FROM users WHERE external_id = $1",
        )
        .bind(external_id)
        .fetch_one(self.pool)
        .await?;

        Ok(user)
    }

    /// All users with the given external id.
    pub async fn find_by_external_id(&self, external_id: &str) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, external_id FROM users WHERE external_id = $1",
        )
        .bind(external_id)
        .fetch_all(self.pool)
        .await?;

        Ok(users)
    }

    /// All users owning the given address.
    pub async fn find_by_address(&self, address: &str) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.external_id
            FROM users u
            INNER JOIN addresses a ON a.user_id = u.id
            WHERE a.address = $1
            "#,
        )
        .bind(address)
        .fetch_all(self.pool)
        .await?;

        Ok(users)
    }
}

/// Repository for claimed addresses.
pub struct AddressRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert an address row.
    ///
    /// Returns the raw sqlx error so callers can detect unique violations.
    pub async fn create(&self, address: &str, user_id: i64) -> std::result::Result<Address, sqlx::Error> {
        sqlx::query_as::<_, Address>(
            r#"
            INSERT INTO addresses (address, user_id)
            VALUES ($1, $2)
            RETURNING id, address, user_id
            "#,
        )
        .bind(address)
        .bind(user_id)
        .fetch_one(self.pool)
        .await
    }

    /// Get an address row by address string.
    pub async fn get_by_address(&self, address: &str) -> Result<Option<Address>> {
        let row = sqlx::query_as::<_, Address>(
            "SELECT id, address, user_id FROM addresses WHERE address = $1",
        )
        .bind(address)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Addresses owned by a user, in claim order.
    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<String>> {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT address FROM addresses WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Delete an address only if `user_id` owns it. Returns whether a row was removed.
    pub async fn delete_owned(&self, address: &str, user_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM addresses WHERE address = $1 AND user_id = $2")
            .bind(address)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
