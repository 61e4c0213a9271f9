//! Address directory.
//!
//! Maps email addresses to the users who claimed them and back. Every call
//! reads the store; nothing is cached between requests. Claim exclusivity is
//! enforced by the unique constraint on `addresses.address`, so two racing
//! claims of the same address resolve to one success and one
//! [`DirectoryError::AlreadyClaimed`].

mod repository;
mod types;
mod validation;

pub use repository::{AddressRepository, UserRepository};
pub use types::{Address, User};
pub use validation::{is_valid_address, MAX_ADDRESS_LENGTH};

use thiserror::Error;
use tracing::info;

use crate::db::{is_unique_violation, Database};
use crate::{ForwarderError, Result};

/// Outcome of a rejected claim or release.
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// Address failed the syntax check.
    #[error("invalid address format")]
    InvalidFormat,

    /// Another user (or the caller) already owns the address.
    #[error("address is already claimed")]
    AlreadyClaimed,

    /// The address is owned by someone else.
    #[error("address is owned by another user")]
    NotOwned,

    /// Nobody owns the address.
    #[error("address is not claimed")]
    NotFound,

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] ForwarderError),
}

impl From<sqlx::Error> for DirectoryError {
    fn from(e: sqlx::Error) -> Self {
        DirectoryError::Store(e.into())
    }
}

/// Directory operations over the shared database.
pub struct AddressDirectory<'a> {
    db: &'a Database,
}

impl<'a> AddressDirectory<'a> {
    /// Create a directory bound to the given database.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// The single owner of `address`, if exactly one exists.
    pub async fn resolve_owner(&self, address: &str) -> Result<Option<User>> {
        let users = UserRepository::new(self.db.pool())
            .find_by_address(address)
            .await?;
        Ok(single(users))
    }

    /// The single user with `external_id`, if exactly one exists.
    pub async fn resolve_user(&self, external_id: &str) -> Result<Option<User>> {
        let users = UserRepository::new(self.db.pool())
            .find_by_external_id(external_id)
            .await?;
        Ok(single(users))
    }

    /// Get the user for `external_id`, creating it on first contact.
    pub async fn ensure_user(&self, external_id: &str) -> Result<User> {
        UserRepository::new(self.db.pool())
            .get_or_create(external_id)
            .await
    }

    /// Addresses owned by `user`, in claim order.
    pub async fn owned_addresses(&self, user: &User) -> Result<Vec<String>> {
        AddressRepository::new(self.db.pool())
            .list_by_user(user.id)
            .await
    }

    /// Claim `address` for the user with `external_id`.
    pub async fn claim(
        &self,
        external_id: &str,
        address: &str,
    ) -> std::result::Result<Address, DirectoryError> {
        if !is_valid_address(address) {
            return Err(DirectoryError::InvalidFormat);
        }

        let user = self.ensure_user(external_id).await?;

        match AddressRepository::new(self.db.pool())
            .create(address, user.id)
            .await
        {
            Ok(created) => {
                info!(address, user_id = user.id, "Address claimed");
                Ok(created)
            }
            Err(e) if is_unique_violation(&e) => Err(DirectoryError::AlreadyClaimed),
            Err(e) => Err(e.into()),
        }
    }

    /// Release `address` held by the user with `external_id`.
    pub async fn release(
        &self,
        external_id: &str,
        address: &str,
    ) -> std::result::Result<(), DirectoryError> {
        if !is_valid_address(address) {
            return Err(DirectoryError::InvalidFormat);
        }

        let user = self.ensure_user(external_id).await?;
        let addresses = AddressRepository::new(self.db.pool());

        if addresses.delete_owned(address, user.id).await? {
            info!(address, user_id = user.id, "Address released");
            return Ok(());
        }

        // Nothing deleted: tell apart unclaimed and foreign addresses
        match addresses.get_by_address(address).await? {
            Some(_) => Err(DirectoryError::NotOwned),
            None => Err(DirectoryError::NotFound),
        }
    }
}

/// Unique-match discipline: anything other than exactly one row is "none".
fn single<T>(mut rows: Vec<T>) -> Option<T> {
    if rows.len() == 1 {
        rows.pop()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single() {
        assert_eq!(single::<i32>(vec![]), None);
        assert_eq!(single(vec![1]), Some(1));
        assert_eq!(single(vec![1, 2]), None);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            DirectoryError::InvalidFormat.to_string(),
            "invalid address format"
        );
        let store = DirectoryError::Store(ForwarderError::Database("locked".into()));
        assert_eq!(store.to_string(), "database error: locked");
    }
}
