//! SQL schema for the Tally SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Credentials are empty for stub users that have not registered yet.
CREATE TABLE IF NOT EXISTS users (
    user_id     INTEGER PRIMARY KEY,
    login       TEXT NOT NULL DEFAULT '',
    password    TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL,   -- RFC 3339 UTC
    updated_at  TEXT NOT NULL
);

-- last_seen is the fingerprint of the last delivered snapshot; '' = never.
CREATE TABLE IF NOT EXISTS subscriptions (
    user_id         INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    account_number  TEXT NOT NULL,
    chat_id         INTEGER NOT NULL,
    last_seen       TEXT NOT NULL DEFAULT '',
    PRIMARY KEY (user_id, account_number)
);

PRAGMA user_version = 1;
";
