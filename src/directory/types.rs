//! Directory types.

/// A directory principal, identified externally by its chat platform id.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    /// Internal ID.
    pub id: i64,
    /// Chat platform identity.
    pub external_id: String,
}

/// An email address claimed by a user.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Address {
    /// Internal ID.
    pub id: i64,
    /// The claimed address.
    pub address: String,
    /// Owning user ID.
    pub user_id: i64,
}
