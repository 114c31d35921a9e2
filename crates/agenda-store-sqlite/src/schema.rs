//! SQL schema for the agenda SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision for future migrations.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Novelties are never deleted; voiding is a state change.
CREATE TABLE IF NOT EXISTS novelties (
    novelty_id    TEXT PRIMARY KEY,
    provider_id   TEXT NOT NULL,
    date          TEXT NOT NULL,   -- YYYY-MM-DD
    state         TEXT NOT NULL,   -- 'absent' | 'late' | 'voided'
    absence_kind  TEXT,            -- 'full_day' | 'partial_hours' | NULL
    absence_start TEXT,            -- HH:MM:SS[.fff]
    absence_end   TEXT,
    entry_time    TEXT,
    exit_time     TEXT,
    reason        TEXT,
    void_reason   TEXT,
    voided_at     TEXT,            -- RFC 3339 UTC
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    CHECK (state != 'voided' OR (void_reason IS NOT NULL AND voided_at IS NOT NULL))
);

-- At most one active novelty per provider and date.
CREATE UNIQUE INDEX IF NOT EXISTS novelties_active_pair_idx
    ON novelties(provider_id, date) WHERE state != 'voided';
CREATE INDEX IF NOT EXISTS novelties_date_idx ON novelties(date);

CREATE TABLE IF NOT EXISTS appointments (
    appointment_id      TEXT PRIMARY KEY,
    provider_id         TEXT NOT NULL,
    date                TEXT NOT NULL,
    time                TEXT NOT NULL,
    state               TEXT NOT NULL,
    novelty_id          TEXT REFERENCES novelties(novelty_id),
    cancellation_reason TEXT
);

CREATE INDEX IF NOT EXISTS appointments_pair_idx    ON appointments(provider_id, date);
CREATE INDEX IF NOT EXISTS appointments_novelty_idx ON appointments(novelty_id);

PRAGMA user_version = 1;
";
