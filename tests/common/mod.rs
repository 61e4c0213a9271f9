//! Test helpers for integration tests.
//!
//! Provides a wired-up pipeline over an in-memory database, a chat client
//! that records messages, and a queue wrapper that can be told to fail.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use forwarder::chat::{ChatClient, ChatUser};
use forwarder::config::QueueConfig;
use forwarder::notifier::DeliveryReport;
use forwarder::queue::Delivery;
use forwarder::{
    Database, DurableQueue, ForwarderError, IngestService, MailProcessor, MailTransaction,
    NotificationForwarder, Notifier, PendingNotifications, Result, SharedQueue, SqlQueue,
};

/// Command prefix used throughout the tests.
pub const PREFIX: &str = ">";

/// Chat client that records every direct message.
#[derive(Default)]
pub struct RecordingChat {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingChat {
    /// Messages sent so far as `(user id, text)` pairs.
    pub async fn messages(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl ChatClient for RecordingChat {
    async fn fetch_user(&self, external_id: &str) -> Result<ChatUser> {
        Ok(ChatUser {
            id: external_id.to_string(),
            username: format!("user{external_id}"),
        })
    }

    async fn send_direct_message(&self, user: &ChatUser, text: &str) -> Result<()> {
        self.sent
            .lock()
            .await
            .push((user.id.clone(), text.to_string()));
        Ok(())
    }
}

/// Queue wrapper whose publishes fail while `fail_publish` is set.
pub struct FlakyPublishQueue {
    inner: Arc<SqlQueue>,
    pub fail_publish: AtomicBool,
}

impl FlakyPublishQueue {
    pub fn new(inner: Arc<SqlQueue>) -> Self {
        Self {
            inner,
            fail_publish: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_publish.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl DurableQueue for FlakyPublishQueue {
    async fn declare(&self, queue: &str) -> Result<()> {
        self.inner.declare(queue).await
    }

    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<()> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(ForwarderError::Queue("connection reset".into()));
        }
        self.inner.publish(queue, payload).await
    }

    async fn receive(&self, queue: &str) -> Result<Option<Delivery>> {
        self.inner.receive(queue).await
    }

    async fn ack(&self, delivery: &Delivery) -> Result<()> {
        self.inner.ack(delivery).await
    }

    async fn nack(&self, delivery: &Delivery, requeue: bool) -> Result<()> {
        self.inner.nack(delivery, requeue).await
    }

    async fn retry_after(&self, delivery: &Delivery, delay: Duration) -> Result<()> {
        self.inner.retry_after(delivery, delay).await
    }
}

/// Every stage of the pipeline, wired over one in-memory database.
pub struct Pipeline {
    pub db: Arc<Database>,
    pub sql_queue: Arc<SqlQueue>,
    pub config: QueueConfig,
    pub ingest: IngestService,
    pub processor: MailProcessor,
    pub forwarder: NotificationForwarder,
    pub notifier: Notifier,
    pub chat: Arc<RecordingChat>,
}

impl Pipeline {
    /// Build a pipeline whose stages share `queue`.
    pub async fn with_queue(
        db: Arc<Database>,
        sql_queue: Arc<SqlQueue>,
        queue: SharedQueue,
    ) -> Self {
        let config = fast_queue_config();
        sql_queue.declare(&config.relay_queue).await.unwrap();
        sql_queue.declare(&config.notification_queue).await.unwrap();

        let chat = Arc::new(RecordingChat::default());
        let pending = PendingNotifications::new();

        Self {
            ingest: IngestService::new(Arc::clone(&queue), config.relay_queue.clone()),
            processor: MailProcessor::new(Arc::clone(&db), Arc::clone(&queue), &config),
            forwarder: NotificationForwarder::new(Arc::clone(&queue), pending.clone()),
            notifier: Notifier::new(Arc::clone(&db), chat.clone(), pending, 10, PREFIX),
            db,
            sql_queue,
            config,
            chat,
        }
    }

    /// Build a pipeline over a fresh in-memory database.
    pub async fn new() -> Self {
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let sql_queue = Arc::new(SqlQueue::new(Arc::clone(&db), &fast_queue_config()));
        let queue: SharedQueue = sql_queue.clone();
        Self::with_queue(db, sql_queue, queue).await
    }

    /// Submit a mail through the SMTP ingest service.
    pub async fn send(&self, sender: &str, recipient: &str, subject: &str, body: &str) {
        let content = raw_mail(sender, recipient, subject, body);
        let reply = self
            .ingest
            .accept(MailTransaction::new(
                sender,
                vec![recipient.to_string()],
                content,
            ))
            .await
            .unwrap();
        assert_eq!(reply, "250 OK");
    }

    /// Wait for the next relay message to become available and handle it.
    pub async fn process_when_ready(
        &self,
    ) -> std::result::Result<forwarder::NotificationEvent, forwarder::ProcessError> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(result) = self.processor.process_next().await.unwrap() {
                return result;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "no relay message became available"
            );
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    /// Process every envelope waiting on the relay queue.
    pub async fn process_all(&self) -> usize {
        let mut processed = 0;
        while let Some(result) = self.processor.process_next().await.unwrap() {
            result.unwrap();
            processed += 1;
        }
        processed
    }

    /// Move every waiting notification into the notifier buffer.
    pub async fn forward_all(&self) -> usize {
        let mut forwarded = 0;
        while let Some(delivery) = self
            .sql_queue
            .receive(&self.config.notification_queue)
            .await
            .unwrap()
        {
            self.forwarder.forward(&delivery).await;
            forwarded += 1;
        }
        forwarded
    }

    /// Run one full pass: process, forward, notify.
    pub async fn run_once(&self) -> DeliveryReport {
        self.process_all().await;
        self.forward_all().await;
        self.notifier.deliver_pending().await
    }
}

/// Queue settings with millisecond retry delays.
pub fn fast_queue_config() -> QueueConfig {
    QueueConfig {
        poll_interval_ms: 5,
        backoff_initial_ms: 1,
        backoff_max_ms: 10,
        ..QueueConfig::default()
    }
}

/// Build a minimal RFC 5322 message.
pub fn raw_mail(sender: &str, recipient: &str, subject: &str, body: &str) -> Vec<u8> {
    format!("From: {sender}\r\nTo: {recipient}\r\nSubject: {subject}\r\n\r\n{body}\r\n")
        .into_bytes()
}
