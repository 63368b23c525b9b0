//! SQLite schema definition.

/// Complete database schema for herdcare.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Profiles and Farms
-- ============================================================================

CREATE TABLE IF NOT EXISTS profiles (
    id TEXT PRIMARY KEY,
    full_name TEXT NOT NULL,
    email TEXT NOT NULL,
    role TEXT NOT NULL CHECK (role IN ('farmer', 'veterinarian', 'admin', 'lab')),
    phone TEXT,
    reward_points INTEGER NOT NULL DEFAULT 0,
    is_vet_verified INTEGER NOT NULL DEFAULT 0,
    vet_license_id TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_profiles_role ON profiles(role);

CREATE TABLE IF NOT EXISTS farms (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL REFERENCES profiles(id),
    farm_name TEXT NOT NULL,
    address TEXT NOT NULL,
    registration_number TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_farms_owner ON farms(owner_id);

-- ============================================================================
-- Medication Registry
-- ============================================================================

CREATE TABLE IF NOT EXISTS medications (
    id TEXT PRIMARY KEY,
    med_name TEXT NOT NULL,
    active_ingredient TEXT NOT NULL,
    withdrawal_period_milk_hours INTEGER NOT NULL CHECK (withdrawal_period_milk_hours >= 0),
    withdrawal_period_meat_days INTEGER NOT NULL CHECK (withdrawal_period_meat_days >= 0),
    dosage_instructions TEXT,
    created_at TEXT NOT NULL
);

-- FTS5 virtual table for full-text search
CREATE VIRTUAL TABLE IF NOT EXISTS medications_fts USING fts5(
    med_name,
    active_ingredient,
    content='medications',
    content_rowid='rowid'
);

-- Triggers to keep FTS5 in sync with main table
CREATE TRIGGER IF NOT EXISTS medications_ai AFTER INSERT ON medications BEGIN
    INSERT INTO medications_fts(rowid, med_name, active_ingredient)
    VALUES (new.rowid, new.med_name, new.active_ingredient);
END;

CREATE TRIGGER IF NOT EXISTS medications_ad AFTER DELETE ON medications BEGIN
    INSERT INTO medications_fts(medications_fts, rowid, med_name, active_ingredient)
    VALUES ('delete', old.rowid, old.med_name, old.active_ingredient);
END;

CREATE TRIGGER IF NOT EXISTS medications_au AFTER UPDATE ON medications BEGIN
    INSERT INTO medications_fts(medications_fts, rowid, med_name, active_ingredient)
    VALUES ('delete', old.rowid, old.med_name, old.active_ingredient);
    INSERT INTO medications_fts(rowid, med_name, active_ingredient)
    VALUES (new.rowid, new.med_name, new.active_ingredient);
END;

-- ============================================================================
-- Animals
-- ============================================================================

CREATE TABLE IF NOT EXISTS animals (
    id TEXT PRIMARY KEY,
    farm_id TEXT NOT NULL REFERENCES farms(id),
    tag_id TEXT NOT NULL,
    species TEXT NOT NULL,
    breed TEXT,
    name TEXT,
    gender TEXT,
    birth_date TEXT,
    status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'withdrawal')),
    withdrawal_until_milk TEXT,
    withdrawal_until_meat TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (farm_id, tag_id)
);

CREATE INDEX IF NOT EXISTS idx_animals_farm ON animals(farm_id);
CREATE INDEX IF NOT EXISTS idx_animals_status ON animals(status);

-- ============================================================================
-- Treatments (Append-Only)
-- ============================================================================

CREATE TABLE IF NOT EXISTS treatments (
    id TEXT PRIMARY KEY,
    animal_id TEXT NOT NULL REFERENCES animals(id),
    vet_id TEXT NOT NULL REFERENCES profiles(id),
    medication_id TEXT NOT NULL REFERENCES medications(id),
    diagnosis TEXT NOT NULL,
    dosage TEXT NOT NULL,
    route_of_administration TEXT,
    notes TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_treatments_animal ON treatments(animal_id, created_at);

CREATE TRIGGER IF NOT EXISTS treatments_no_update BEFORE UPDATE ON treatments
BEGIN
    SELECT RAISE(ABORT, 'Treatments are append-only');
END;

-- ============================================================================
-- Prescription Tasks
-- ============================================================================

CREATE TABLE IF NOT EXISTS prescription_tasks (
    id TEXT PRIMARY KEY,
    treatment_id TEXT NOT NULL REFERENCES treatments(id),
    animal_id TEXT NOT NULL REFERENCES animals(id),
    farmer_id TEXT NOT NULL REFERENCES profiles(id),
    medication_name TEXT NOT NULL,
    dosage TEXT NOT NULL,
    scheduled_date TEXT NOT NULL,                -- YYYY-MM-DD
    scheduled_time TEXT NOT NULL,                -- HH:MM:SS
    is_completed INTEGER NOT NULL DEFAULT 0,
    completed_at TEXT,
    points_awarded INTEGER NOT NULL DEFAULT 0 CHECK (points_awarded >= 0),
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tasks_farmer_date ON prescription_tasks(farmer_id, scheduled_date, scheduled_time);
CREATE INDEX IF NOT EXISTS idx_tasks_animal ON prescription_tasks(animal_id);
CREATE INDEX IF NOT EXISTS idx_tasks_treatment ON prescription_tasks(treatment_id);

-- Completion is one-way
CREATE TRIGGER IF NOT EXISTS prescription_tasks_no_uncomplete BEFORE UPDATE ON prescription_tasks
WHEN old.is_completed = 1 AND new.is_completed = 0
BEGIN
    SELECT RAISE(ABORT, 'Completed tasks cannot be reopened');
END;

-- ============================================================================
-- Compliance Alerts
-- ============================================================================

CREATE TABLE IF NOT EXISTS compliance_alerts (
    id TEXT PRIMARY KEY,
    farm_id TEXT NOT NULL REFERENCES farms(id),
    animal_id TEXT REFERENCES animals(id),
    alert_type TEXT NOT NULL,
    severity TEXT NOT NULL CHECK (severity IN ('low', 'medium', 'high')),
    description TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'resolved')),
    created_at TEXT NOT NULL,
    resolved_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_alerts_farm_status ON compliance_alerts(farm_id, status);
CREATE INDEX IF NOT EXISTS idx_alerts_animal_type ON compliance_alerts(animal_id, alert_type, status);

-- ============================================================================
-- Requests and Reports
-- ============================================================================

CREATE TABLE IF NOT EXISTS consultation_requests (
    id TEXT PRIMARY KEY,
    farmer_id TEXT NOT NULL REFERENCES profiles(id),
    vet_id TEXT REFERENCES profiles(id),
    animal_id TEXT REFERENCES animals(id),
    consultation_type TEXT NOT NULL DEFAULT 'visit',
    priority TEXT NOT NULL DEFAULT 'medium',
    symptoms TEXT NOT NULL,
    notes TEXT,
    scheduled_at TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    rating INTEGER CHECK (rating IS NULL OR rating BETWEEN 1 AND 5),
    feedback TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_consultations_status ON consultation_requests(status);

CREATE TABLE IF NOT EXISTS problem_reports (
    id TEXT PRIMARY KEY,
    farmer_id TEXT NOT NULL REFERENCES profiles(id),
    animal_id TEXT REFERENCES animals(id),
    problem_type TEXT NOT NULL,
    symptoms TEXT NOT NULL,
    severity TEXT NOT NULL DEFAULT 'medium',
    description TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    vet_id TEXT REFERENCES profiles(id),
    vet_response TEXT,
    responded_at TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_problems_status ON problem_reports(status);

CREATE TABLE IF NOT EXISTS testing_reports (
    id TEXT PRIMARY KEY,
    animal_id TEXT NOT NULL REFERENCES animals(id),
    vet_id TEXT NOT NULL REFERENCES profiles(id),
    lab_id TEXT REFERENCES profiles(id),
    test_type TEXT NOT NULL,
    test_description TEXT,
    sample_type TEXT NOT NULL,
    priority TEXT NOT NULL DEFAULT 'medium',
    status TEXT NOT NULL DEFAULT 'pending',
    results TEXT,
    notes TEXT,
    requested_at TEXT NOT NULL,
    received_at TEXT,
    completed_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_testing_status ON testing_reports(status);
"#;
