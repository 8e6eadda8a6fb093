//! SQL schema for the Gridprep SQLite warehouse.
//!
//! Only the base tables live here. The derived artifacts (`locations_ranked`,
//! `locations_clean`, `customers_enriched`) are owned by the pipeline and
//! rebuilt wholesale on each run, so they are never part of the schema DDL.

/// Base-table DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS states (
    state_id   TEXT PRIMARY KEY,
    state_code TEXT NOT NULL
);

-- The location dimension. Sourced externally (dirty feeds may repeat
-- location_id, so it carries no UNIQUE constraint). row_seq is an explicitly
-- stored insertion-order sequence: the portable stand-in for a physical row
-- identifier, and the identity the compactor keys on.
-- The pipeline later adds location_key and dq_status columns in place.
CREATE TABLE IF NOT EXISTS locations (
    row_seq     INTEGER PRIMARY KEY,
    location_id TEXT NOT NULL,
    state_id    TEXT NOT NULL,
    city        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS customers (
    customer_id   INTEGER PRIMARY KEY,
    customer_name TEXT NOT NULL,
    city          TEXT,
    state_code    TEXT,
    customer_kind TEXT,
    joined_on     TEXT NOT NULL    -- ISO 8601 date
);

CREATE TABLE IF NOT EXISTS energy_readings (
    reading_id      INTEGER PRIMARY KEY,
    customer_id     INTEGER NOT NULL,
    read_on         TEXT NOT NULL,
    consumption_kwh REAL NOT NULL,
    reading_kind    TEXT NOT NULL    -- 'normal' | 'estimated'
);

CREATE TABLE IF NOT EXISTS energy_losses (
    loss_id           INTEGER PRIMARY KEY,
    recorded_on       TEXT NOT NULL,
    state_code        TEXT NOT NULL,
    technical_kwh     REAL NOT NULL,
    non_technical_kwh REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS locations_state_idx   ON locations(state_id);
CREATE INDEX IF NOT EXISTS readings_customer_idx ON energy_readings(customer_id);

PRAGMA user_version = 1;
";
