//! SQL schema for the Parkade SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision for future migrations.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;

CREATE TABLE IF NOT EXISTS spots (
    number    INTEGER PRIMARY KEY CHECK (number > 0),
    occupied  INTEGER NOT NULL DEFAULT 0 CHECK (occupied IN (0, 1))
);

-- Vehicle events are strictly append-only; the triggers below reject any
-- UPDATE or DELETE. `seq` is never reused (AUTOINCREMENT).
CREATE TABLE IF NOT EXISTS vehicle_events (
    seq            INTEGER PRIMARY KEY AUTOINCREMENT,
    vehicle_id     TEXT NOT NULL,
    license_plate  TEXT NOT NULL,
    model          TEXT NOT NULL DEFAULT '',
    color          TEXT NOT NULL DEFAULT '',
    year           INTEGER,
    status         TEXT NOT NULL
                   CHECK (status IN ('entering', 'parked', 'leaving', 'has_left')),
    recorded_at    TEXT NOT NULL,   -- RFC 3339, UTC, fixed microsecond width
    spot_number    INTEGER REFERENCES spots(number),
    CHECK ((status = 'parked') = (spot_number IS NOT NULL))
);

CREATE INDEX IF NOT EXISTS vehicle_events_vehicle_idx
    ON vehicle_events(vehicle_id, recorded_at, seq);
CREATE INDEX IF NOT EXISTS vehicle_events_status_idx
    ON vehicle_events(status);
CREATE INDEX IF NOT EXISTS vehicle_events_recorded_idx
    ON vehicle_events(recorded_at, seq);

CREATE TRIGGER IF NOT EXISTS vehicle_events_no_update
BEFORE UPDATE ON vehicle_events
BEGIN
    SELECT RAISE(ABORT, 'vehicle_events is append-only');
END;

CREATE TRIGGER IF NOT EXISTS vehicle_events_no_delete
BEFORE DELETE ON vehicle_events
BEGIN
    SELECT RAISE(ABORT, 'vehicle_events is append-only');
END;

PRAGMA user_version = 1;
";
