//! Email repository.

use sqlx::QueryBuilder;

use super::types::{Email, NewEmail};
use crate::db::{DbBackend, DbPool};
use crate::Result;

/// Repository for stored emails.
pub struct EmailRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> EmailRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert an email and return it with its assigned ID.
    pub async fn create(&self, email: &NewEmail) -> Result<Email> {
        let created = sqlx::query_as::<_, Email>(
            r#"
            INSERT INTO emails (sender, recipient, content)
            VALUES ($1, $2, $3)
            RETURNING id, sender, recipient, content, received_at
            "#,
        )
        .bind(&email.sender)
        .bind(&email.recipient)
        .bind(&email.content)
        .fetch_one(self.pool)
        .await?;

        Ok(created)
    }

    /// Get an email by ID, regardless of recipient.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Email>> {
        let email = sqlx::query_as::<_, Email>(
            "SELECT id, sender, recipient, content, received_at FROM emails WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(email)
    }

    /// Count emails addressed to any of `recipients`.
    pub async fn count_for_recipients(&self, recipients: &[String]) -> Result<i64> {
        if recipients.is_empty() {
            return Ok(0);
        }

        let mut query: QueryBuilder<DbBackend> =
            QueryBuilder::new("SELECT COUNT(*) FROM emails WHERE recipient IN (");
        let mut separated = query.separated(", ");
        for recipient in recipients {
            separated.push_bind(recipient.as_str());
        }
        separated.push_unseparated(")");

        let count: i64 = query.build_query_scalar().fetch_one(self.pool).await?;
        Ok(count)
    }

    /// Emails addressed to any of `recipients`, newest first.
    pub async fn list_for_recipients(
        &self,
        recipients: &[String],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Email>> {
        if recipients.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<DbBackend> = QueryBuilder::new(
            "SELECT id, sender, recipient, content, received_at FROM emails WHERE recipient IN (",
        );
        let mut separated = query.separated(", ");
        for recipient in recipients {
            separated.push_bind(recipient.as_str());
        }
        separated.push_unseparated(") ORDER BY id DESC LIMIT ");
        query.push_bind(limit);
        query.push(" OFFSET ");
        query.push_bind(offset);

        let emails = query.build_query_as::<Email>().fetch_all(self.pool).await?;
        Ok(emails)
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn insert(repo: &EmailRepository<'_>, recipient: &str) -> Email {
        repo.create(&NewEmail::new("a@x.com", recipient, "aGk="))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_increasing_ids() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = EmailRepository::new(db.pool());

        let first = insert(&repo, "b@y.com").await;
        let second = insert(&repo, "b@y.com").await;
        assert_eq!(first.id, 1);
        assert!(second.id > first.id);
        assert!(!first.received_at.is_empty());

        let fetched = repo.get_by_id(first.id).await.unwrap().unwrap();
        assert_eq!(fetched, first);
        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_count_and_list_scoped() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = EmailRepository::new(db.pool());

        insert(&repo, "b@y.com").await;
        insert(&repo, "other@y.com").await;
        insert(&repo, "c@y.com").await;

        let owned = vec!["b@y.com".to_string(), "c@y.com".to_string()];
        assert_eq!(repo.count_for_recipients(&owned).await.unwrap(), 2);

        let emails = repo.list_for_recipients(&owned, 10, 0).await.unwrap();
        let recipients: Vec<&str> = emails.iter().map(|e| e.recipient.as_str()).collect();
        assert_eq!(recipients, vec!["c@y.com", "b@y.com"]);
    }

    #[tokio::test]
    async fn test_empty_recipient_set() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = EmailRepository::new(db.pool());
        insert(&repo, "b@y.com").await;

        assert_eq!(repo.count_for_recipients(&[]).await.unwrap(), 0);
        assert!(repo.list_for_recipients(&[], 10, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_limit_offset() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = EmailRepository::new(db.pool());
        for _ in 0..5 {
            insert(&repo, "b@y.com").await;
        }

        let owned = vec!["b@y.com".to_string()];
        let page: Vec<i64> = repo
            .list_for_recipients(&owned, 2, 2)
            .await
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(page, vec![3, 2]);
    }
}
