//! SQL schema for the Charter SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS policies (
    id          TEXT PRIMARY KEY,
    policy_id   TEXT NOT NULL UNIQUE,   -- external text id, e.g. '1.1.1'
    name        TEXT NOT NULL,
    section     TEXT NOT NULL,
    content     TEXT NOT NULL DEFAULT '',
    status      TEXT NOT NULL DEFAULT 'draft'
                CHECK (status IN ('draft', 'approved')),
    created_at  TEXT NOT NULL,          -- ISO 8601 UTC; server-assigned
    updated_at  TEXT NOT NULL,          -- stamped by the store on every update
    created_by  TEXT,
    updated_by  TEXT
);

CREATE TABLE IF NOT EXISTS bylaws (
    id          TEXT PRIMARY KEY,
    number      INTEGER NOT NULL UNIQUE,
    title       TEXT NOT NULL,
    content     TEXT NOT NULL DEFAULT '',
    status      TEXT NOT NULL DEFAULT 'draft'
                CHECK (status IN ('draft', 'approved')),
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    created_by  TEXT,
    updated_by  TEXT
);

-- A suggestion outlives its target: deleting the referenced document only
-- clears the link.
CREATE TABLE IF NOT EXISTS suggestions (
    id          TEXT PRIMARY KEY,
    policy_id   TEXT REFERENCES policies(id) ON DELETE SET NULL,
    bylaw_id    TEXT REFERENCES bylaws(id)   ON DELETE SET NULL,
    suggestion  TEXT NOT NULL,
    status      TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'reviewed', 'implemented', 'rejected')),
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

-- Primary key is the identity provider's subject id, not locally generated.
CREATE TABLE IF NOT EXISTS users (
    id          TEXT PRIMARY KEY,
    email       TEXT NOT NULL UNIQUE,
    name        TEXT,
    role        TEXT NOT NULL DEFAULT 'public'
                CHECK (role IN ('public', 'admin', 'policy_working_group')),
    created_at  TEXT NOT NULL
);

-- Write-once snapshots; owned history, removed with the parent policy.
CREATE TABLE IF NOT EXISTS policy_versions (
    id              TEXT PRIMARY KEY,
    policy_id       TEXT NOT NULL REFERENCES policies(id) ON DELETE CASCADE,
    version_number  INTEGER NOT NULL,
    name            TEXT NOT NULL,
    section         TEXT NOT NULL,
    content         TEXT NOT NULL,
    status          TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    created_by      TEXT,
    UNIQUE (policy_id, version_number)
);

-- policy_id here is the external text id; the relationship to policies is
-- enforced by the store, not by a foreign key.
CREATE TABLE IF NOT EXISTS policy_reviews (
    id             TEXT PRIMARY KEY,
    policy_id      TEXT NOT NULL,
    user_email     TEXT NOT NULL,
    review_status  TEXT NOT NULL
                   CHECK (review_status IN ('confirm', 'needs_work')),
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL,
    UNIQUE (policy_id, user_email)
);

CREATE INDEX IF NOT EXISTS policies_status_idx    ON policies(status);
CREATE INDEX IF NOT EXISTS policies_section_idx   ON policies(section);
CREATE INDEX IF NOT EXISTS bylaws_status_idx      ON bylaws(status);
CREATE INDEX IF NOT EXISTS suggestions_policy_idx ON suggestions(policy_id);
CREATE INDEX IF NOT EXISTS suggestions_bylaw_idx  ON suggestions(bylaw_id);
CREATE INDEX IF NOT EXISTS suggestions_status_idx ON suggestions(status);
CREATE INDEX IF NOT EXISTS versions_policy_idx    ON policy_versions(policy_id);
CREATE INDEX IF NOT EXISTS reviews_policy_idx     ON policy_reviews(policy_id);

PRAGMA user_version = 1;
";
