//! Durable queue stored in the relational database.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use super::{dead_letter_name, Delivery, DurableQueue};
use crate::config::QueueConfig;
use crate::db::{is_foreign_key_violation, Database};
use crate::{ForwarderError, Result};

// Row locking for the lease subquery
#[cfg(feature = "sqlite")]
const LEASE_LOCK: &str = "";
#[cfg(feature = "postgres")]
const LEASE_LOCK: &str = "FOR UPDATE SKIP LOCKED";

/// Row returned by a lease.
#[derive(Debug, sqlx::FromRow)]
struct LeasedRow {
    id: i64,
    payload: Vec<u8>,
    deliveries: i32,
}

/// Queue backed by the `queues` and `queue_messages` tables.
///
/// Published messages are rows, so they survive restarts. Receiving a
/// message pushes its `available_at` forward by the visibility timeout;
/// acknowledging deletes the row.
pub struct SqlQueue {
    db: Arc<Database>,
    visibility_timeout_ms: i64,
    max_deliveries: u32,
}

impl SqlQueue {
    /// Create a queue handle over the given database.
    pub fn new(db: Arc<Database>, config: &QueueConfig) -> Self {
        Self {
            db,
            visibility_timeout_ms: (config.visibility_timeout_secs as i64).saturating_mul(1000),
            max_deliveries: config.max_deliveries.max(1),
        }
    }

    /// Number of stored messages in `queue`, leased or not.
    pub async fn depth(&self, queue: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM queue_messages WHERE queue = $1")
            .bind(queue)
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    async fn dead_letter(&self, delivery: &Delivery) -> Result<()> {
        let dead = dead_letter_name(&delivery.queue);
        self.declare(&dead).await?;

        sqlx::query("UPDATE queue_messages SET queue = $1, available_at = $2 WHERE id = $3")
            .bind(&dead)
            .bind(now())
            .bind(delivery.tag)
            .execute(self.db.pool())
            .await?;

        warn!(
            queue = %delivery.queue,
            tag = delivery.tag,
            attempt = delivery.attempt,
            payload = %delivery.payload_lossy(),
            "Message moved to {}",
            dead
        );
        Ok(())
    }
}

// Unix milliseconds
fn now() -> i64 {
    Utc::now().timestamp_millis()
}

#[async_trait]
impl DurableQueue for SqlQueue {
    async fn declare(&self, queue: &str) -> Result<()> {
        sqlx::query("INSERT INTO queues (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(queue)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<()> {
        sqlx::query("INSERT INTO queue_messages (queue, payload, available_at) VALUES ($1, $2, $3)")
            .bind(queue)
            .bind(payload)
            .bind(now())
            .execute(self.db.pool())
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    ForwarderError::Queue(format!("queue not declared: {queue}"))
                } else {
                    ForwarderError::from(e)
                }
            })?;

        debug!(queue, bytes = payload.len(), "Published message");
        Ok(())
    }

    async fn receive(&self, queue: &str) -> Result<Option<Delivery>> {
        let now = now();
        let query = format!(
            r#"
            UPDATE queue_messages
            SET available_at = $1, deliveries = deliveries + 1
            WHERE id = (
                SELECT id FROM queue_messages
                WHERE queue = $2 AND available_at <= $3
                ORDER BY id
                LIMIT 1
                {LEASE_LOCK}
            )
            RETURNING id, payload, deliveries
            "#
        );

        let row = sqlx::query_as::<_, LeasedRow>(&query)
            .bind(now + self.visibility_timeout_ms)
            .bind(queue)
            .bind(now)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(|row| Delivery {
            tag: row.id,
            queue: queue.to_string(),
            payload: row.payload,
            attempt: row.deliveries.max(1) as u32,
        }))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<()> {
        let result = sqlx::query("DELETE FROM queue_messages WHERE id = $1")
            .bind(delivery.tag)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            debug!(queue = %delivery.queue, tag = delivery.tag, "Ack for unknown message");
        }
        Ok(())
    }

    async fn nack(&self, delivery: &Delivery, requeue: bool) -> Result<()> {
        if !requeue || delivery.attempt >= self.max_deliveries {
            return self.dead_letter(delivery).await;
        }

        sqlx::query("UPDATE queue_messages SET available_at = $1 WHERE id = $2")
            .bind(now())
            .bind(delivery.tag)
            .execute(self.db.pool())
            .await?;

        debug!(
            queue = %delivery.queue,
            tag = delivery.tag,
            attempt = delivery.attempt,
            "Message requeued"
        );
        Ok(())
    }

    async fn retry_after(&self, delivery: &Delivery, delay: Duration) -> Result<()> {
        let delay_ms = i64::try_from(delay.as_millis()).unwrap_or(i64::MAX);

        sqlx::query("UPDATE queue_messages SET available_at = $1 WHERE id = $2")
            .bind(now().saturating_add(delay_ms))
            .bind(delivery.tag)
            .execute(self.db.pool())
            .await?;

        debug!(
            queue = %delivery.queue,
            tag = delivery.tag,
            attempt = delivery.attempt,
            "Message scheduled for retry in {:?}",
            delay
        );
        Ok(())
    }
}
