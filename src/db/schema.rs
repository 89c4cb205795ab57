//! Database schema and migrations for mureader.
//!
//! Migrations are applied in order; the `schema_version` table records which
//! ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: users
    r#"
CREATE TABLE users (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    email           TEXT NOT NULL UNIQUE COLLATE NOCASE,
    email_confirmed INTEGER NOT NULL DEFAULT 0,
    username        TEXT UNIQUE COLLATE NOCASE,
    public_profile  INTEGER NOT NULL DEFAULT 0,
    otp_secret      TEXT,                 -- base32 TOTP secret
    password        TEXT,                 -- Argon2 hash
    registered_on   TEXT NOT NULL,
    is_pro          INTEGER NOT NULL DEFAULT 0
);
"#,
    // v2: feeds, entries and their per-user associations
    r#"
CREATE TABLE feeds (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    url          TEXT NOT NULL UNIQUE,
    homepage_url TEXT,
    title        TEXT,
    updated_at   TEXT,
    fetched_at   TEXT
);

CREATE TABLE entries (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    feed_id           INTEGER NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
    url               TEXT NOT NULL UNIQUE,
    title             TEXT,
    content_from_feed TEXT,
    updated_at        TEXT
);

CREATE INDEX idx_entries_feed_id ON entries(feed_id);
CREATE INDEX idx_entries_updated_at ON entries(updated_at);

CREATE TABLE subscriptions (
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    feed_id INTEGER NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
    PRIMARY KEY (user_id, feed_id)
);

CREATE INDEX idx_subscriptions_feed_id ON subscriptions(feed_id);

CREATE TABLE user_entries (
    user_id  INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    entry_id INTEGER NOT NULL REFERENCES entries(id) ON DELETE CASCADE,
    liked    INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (user_id, entry_id)
);

CREATE INDEX idx_user_entries_entry_id ON user_entries(entry_id);
"#,
    // v3: refresh tokens backing the refresh cookie
    r#"
CREATE TABLE refresh_tokens (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    token       TEXT NOT NULL UNIQUE,
    expires_at  TEXT NOT NULL,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    revoked_at  TEXT
);

CREATE INDEX idx_refresh_tokens_user_id ON refresh_tokens(user_id);
"#,
];

/// Tables created by the migrations, children first.
pub const TABLES: &[&str] = &[
    "refresh_tokens",
    "user_entries",
    "subscriptions",
    "entries",
    "feeds",
    "users",
    "schema_version",
];
