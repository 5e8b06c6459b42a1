//! SQL schema for the consultation SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS states (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    name  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS districts (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    name      TEXT NOT NULL,
    state_id  INTEGER NOT NULL REFERENCES states(id)
);

-- state_id is denormalised from the district so visibility filters need a
-- single join.
CREATE TABLE IF NOT EXISTS facilities (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    name         TEXT NOT NULL,
    district_id  INTEGER NOT NULL REFERENCES districts(id),
    state_id     INTEGER NOT NULL REFERENCES states(id)
);

CREATE TABLE IF NOT EXISTS users (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    username       TEXT NOT NULL UNIQUE,
    password_hash  TEXT NOT NULL,
    user_type      INTEGER NOT NULL,   -- Role::value()
    is_superuser   INTEGER NOT NULL DEFAULT 0,
    state_id       INTEGER REFERENCES states(id),
    district_id    INTEGER REFERENCES districts(id)
);

CREATE TABLE IF NOT EXISTS facility_users (
    facility_id  INTEGER NOT NULL REFERENCES facilities(id),
    user_id      INTEGER NOT NULL REFERENCES users(id),
    PRIMARY KEY (facility_id, user_id)
);

CREATE TABLE IF NOT EXISTS patients (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    external_id  TEXT NOT NULL UNIQUE,
    name         TEXT NOT NULL,
    facility_id  INTEGER NOT NULL REFERENCES facilities(id)
);

CREATE TABLE IF NOT EXISTS consultations (
    id                     INTEGER PRIMARY KEY AUTOINCREMENT,
    external_id            TEXT NOT NULL UNIQUE,
    patient_id             INTEGER NOT NULL REFERENCES patients(id),
    facility_id            INTEGER NOT NULL REFERENCES facilities(id),
    assigned_to            INTEGER REFERENCES users(id),
    symptoms               TEXT NOT NULL DEFAULT '[]',   -- JSON array
    other_symptoms         TEXT,
    symptoms_onset_date    TEXT,
    category               TEXT,
    examination_details    TEXT,
    existing_medication    TEXT,
    prescribed_medication  TEXT,
    suggestion             TEXT NOT NULL,                -- 'HI' | 'A' | 'R'
    referred_to            INTEGER REFERENCES facilities(id),
    admitted               INTEGER NOT NULL DEFAULT 0,
    admission_date         TEXT,
    discharge_date         TEXT,
    bed_number             TEXT,
    created_date           TEXT NOT NULL,
    modified_date          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS daily_rounds (
    id                         INTEGER PRIMARY KEY AUTOINCREMENT,
    consultation_id            INTEGER NOT NULL REFERENCES consultations(id),
    temperature                REAL,
    temperature_measured_at    TEXT,
    physical_examination_info  TEXT,
    additional_symptoms        TEXT NOT NULL DEFAULT '[]',
    other_symptoms             TEXT,
    patient_category           TEXT,
    current_health             INTEGER NOT NULL DEFAULT 0,
    recommend_discharge        INTEGER NOT NULL DEFAULT 0,
    other_details              TEXT,
    created_date               TEXT NOT NULL,
    modified_date              TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS facilities_district_idx    ON facilities(district_id);
CREATE INDEX IF NOT EXISTS facilities_state_idx       ON facilities(state_id);
CREATE INDEX IF NOT EXISTS facility_users_user_idx    ON facility_users(user_id);
CREATE INDEX IF NOT EXISTS consultations_patient_idx  ON consultations(patient_id);
CREATE INDEX IF NOT EXISTS consultations_assigned_idx ON consultations(assigned_to);
CREATE INDEX IF NOT EXISTS daily_rounds_consult_idx   ON daily_rounds(consultation_id);

PRAGMA user_version = 1;
";
