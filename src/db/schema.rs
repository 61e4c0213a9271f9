//! Database schema and migrations for the forwarder.
//!
//! Migrations are applied sequentially when the database is first opened or
//! upgraded. The two backends differ only in identity and blob column types.

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
#[cfg(feature = "sqlite")]
pub const MIGRATIONS: &[&str] = &[
    // v1: Directory - users and their claimed addresses
    r#"
CREATE TABLE users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    external_id TEXT NOT NULL UNIQUE,           -- chat platform identity
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE addresses (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    address     TEXT NOT NULL UNIQUE,           -- claims are exclusive
    user_id     INTEGER NOT NULL REFERENCES users(id),
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_addresses_user_id ON addresses(user_id);
"#,
    // v2: Stored mail
    r#"
-- No foreign key on recipient: mail to unclaimed addresses is kept
CREATE TABLE emails (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    sender      TEXT NOT NULL,
    recipient   TEXT NOT NULL,
    content     TEXT NOT NULL,                  -- base64 of the raw message
    received_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_emails_recipient ON emails(recipient, id);
"#,
    // v3: Durable queues
    r#"
CREATE TABLE queues (
    name        TEXT PRIMARY KEY,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE queue_messages (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    queue        TEXT NOT NULL REFERENCES queues(name),
    payload      BLOB NOT NULL,
    deliveries   INTEGER NOT NULL DEFAULT 0,
    available_at INTEGER NOT NULL,              -- unix milliseconds
    created_at   TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_queue_messages_ready ON queue_messages(queue, available_at, id);
"#,
];

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
#[cfg(feature = "postgres")]
pub const MIGRATIONS: &[&str] = &[
    // v1: Directory - users and their claimed addresses
    r#"
CREATE TABLE users (
    id          BIGSERIAL PRIMARY KEY,
    external_id TEXT NOT NULL UNIQUE,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE addresses (
    id          BIGSERIAL PRIMARY KEY,
    address     TEXT NOT NULL UNIQUE,
    user_id     BIGINT NOT NULL REFERENCES users(id),
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_addresses_user_id ON addresses(user_id);
"#,
    // v2: Stored mail
    r#"
CREATE TABLE emails (
    id          BIGSERIAL PRIMARY KEY,
    sender      TEXT NOT NULL,
    recipient   TEXT NOT NULL,
    content     TEXT NOT NULL,
    received_at TEXT NOT NULL DEFAULT TO_CHAR(NOW() AT TIME ZONE 'UTC', 'YYYY-MM-DD HH24:MI:SS')
);

CREATE INDEX idx_emails_recipient ON emails(recipient, id);
"#,
    // v3: Durable queues
    r#"
CREATE TABLE queues (
    name        TEXT PRIMARY KEY,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE queue_messages (
    id           BIGSERIAL PRIMARY KEY,
    queue        TEXT NOT NULL REFERENCES queues(name),
    payload      BYTEA NOT NULL,
    deliveries   INTEGER NOT NULL DEFAULT 0,
    available_at BIGINT NOT NULL,
    created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_queue_messages_ready ON queue_messages(queue, available_at, id);
"#,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_not_empty() {
        assert!(!MIGRATIONS.is_empty());
    }

    #[test]
    fn test_directory_migration_enforces_unique_claims() {
        let first = MIGRATIONS[0];
        assert!(first.contains("CREATE TABLE users"));
        assert!(first.contains("external_id TEXT NOT NULL UNIQUE"));
        assert!(first.contains("CREATE TABLE addresses"));
        assert!(first.contains("address     TEXT NOT NULL UNIQUE"));
    }

    #[test]
    fn test_emails_recipient_has_no_foreign_key() {
        let emails = MIGRATIONS[1];
        assert!(emails.contains("CREATE TABLE emails"));
        let recipient_line = emails
            .lines()
            .find(|line| line.trim_start().starts_with("recipient"))
            .unwrap();
        assert!(!recipient_line.contains("REFERENCES"));
    }

    #[test]
    fn test_queue_migration_contains_tables() {
        let queues = MIGRATIONS[2];
        assert!(queues.contains("CREATE TABLE queues"));
        assert!(queues.contains("CREATE TABLE queue_messages"));
        assert!(queues.contains("REFERENCES queues(name)"));
        assert!(queues.contains("available_at"));
    }
}
