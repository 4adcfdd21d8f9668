//! SQL schema for the Obra SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One counter per record type. Bumped with an upsert, never reset.
CREATE TABLE IF NOT EXISTS code_sequences (
    record_type TEXT PRIMARY KEY,
    last_value  INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS submissions (
    record_type  TEXT NOT NULL,
    record_id    TEXT NOT NULL,
    code         TEXT NOT NULL UNIQUE,
    state        TEXT NOT NULL,
    submitted_at TEXT NOT NULL,   -- fixed-width RFC 3339 UTC
    submitted_by TEXT NOT NULL,
    payload_json TEXT NOT NULL,
    PRIMARY KEY (record_type, record_id)
);

-- One row per link; queried from both ends.
CREATE TABLE IF NOT EXISTS relationships (
    relationship_id TEXT PRIMARY KEY,
    source_type     TEXT NOT NULL,
    source_id       TEXT NOT NULL,
    target_type     TEXT NOT NULL,
    target_id       TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    created_by      TEXT NOT NULL,
    project_id      TEXT NOT NULL,
    UNIQUE (source_type, source_id, target_type, target_id)
);

-- History is strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS history (
    entry_id     TEXT PRIMARY KEY,
    item_type    TEXT NOT NULL,
    item_id      TEXT NOT NULL,
    user_id      TEXT NOT NULL,
    user_name    TEXT NOT NULL,
    action       TEXT NOT NULL,   -- 'create' | 'update' | 'delete'
    changes_json TEXT NOT NULL,   -- JSON array of {field, old_value?, new_value}
    timestamp    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS comments (
    comment_id TEXT PRIMARY KEY,
    item_type  TEXT NOT NULL,
    item_id    TEXT NOT NULL,
    user_id    TEXT NOT NULL,
    user_name  TEXT NOT NULL,
    content    TEXT NOT NULL,
    timestamp  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS activity (
    log_id       TEXT PRIMARY KEY,
    timestamp    TEXT NOT NULL,
    kind         TEXT NOT NULL,
    user_id      TEXT NOT NULL,
    user_name    TEXT NOT NULL,
    user_role    TEXT NOT NULL,
    project_id   TEXT,
    project_name TEXT,
    description  TEXT NOT NULL,
    details_json TEXT
);

CREATE INDEX IF NOT EXISTS relationships_source_idx ON relationships(source_type, source_id);
CREATE INDEX IF NOT EXISTS relationships_target_idx ON relationships(target_type, target_id);
-- At most one link per unordered pair of endpoints.
CREATE UNIQUE INDEX IF NOT EXISTS relationships_pair_idx ON relationships(
  min(source_type || ':' || source_id, target_type || ':' || target_id),
  max(source_type || ':' || source_id, target_type || ':' || target_id)
);
CREATE INDEX IF NOT EXISTS history_item_idx         ON history(item_type, item_id, timestamp);
CREATE INDEX IF NOT EXISTS comments_item_idx        ON comments(item_type, item_id, timestamp);
CREATE INDEX IF NOT EXISTS activity_timestamp_idx   ON activity(timestamp);

PRAGMA user_version = 1;
";
