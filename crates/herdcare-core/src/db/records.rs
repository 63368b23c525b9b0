//! Consultation, problem report and testing report persistence.
//!
//! These records are saved whole: the model applies the status transition,
//! then `save_*` upserts the row.

use rusqlite::{params, OptionalExtension, Row};

use super::{decode_opt_ts, decode_ts, encode_opt_ts, encode_ts, Database, DbError, DbResult};
use crate::models::{
    ConsultationRequest, ConsultationStatus, Priority, ProblemReport, ProblemStatus, Severity,
    TestingReport, TestingStatus,
};

const CONSULTATION_COLUMNS: &str = "id, farmer_id, vet_id, animal_id, consultation_type, priority, symptoms, notes, scheduled_at, status, rating, feedback, created_at, updated_at";
const PROBLEM_COLUMNS: &str = "id, farmer_id, animal_id, problem_type, symptoms, severity, description, status, vet_id, vet_response, responded_at, created_at";
const TESTING_COLUMNS: &str = "id, animal_id, vet_id, lab_id, test_type, test_description, sample_type, priority, status, results, notes, requested_at, received_at, completed_at";

impl Database {
    // =========================================================================
    // Consultation requests
    // =========================================================================

    pub fn save_consultation(&self, c: &ConsultationRequest) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO consultation_requests (
                id, farmer_id, vet_id, animal_id, consultation_type, priority, symptoms,
                notes, scheduled_at, status, rating, feedback, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ON CONFLICT(id) DO UPDATE SET
                vet_id = excluded.vet_id,
                priority = excluded.priority,
                notes = excluded.notes,
                scheduled_at = excluded.scheduled_at,
                status = excluded.status,
                rating = excluded.rating,
                feedback = excluded.feedback,
                updated_at = excluded.updated_at
            "#,
            params![
                c.id,
                c.farmer_id,
                c.vet_id,
                c.animal_id,
                c.consultation_type,
                c.priority.as_str(),
                c.symptoms,
                c.notes,
                encode_opt_ts(&c.scheduled_at),
                c.status.as_str(),
                c.rating,
                c.feedback,
                encode_ts(&c.created_at),
                encode_ts(&c.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_consultation(&self, id: &str) -> DbResult<Option<ConsultationRequest>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM consultation_requests WHERE id = ?", CONSULTATION_COLUMNS),
                [id],
                ConsultationRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// A farmer's requests, newest first.
    pub fn list_consultations_for_farmer(&self, farmer_id: &str) -> DbResult<Vec<ConsultationRequest>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM consultation_requests WHERE farmer_id = ? ORDER BY created_at DESC",
            CONSULTATION_COLUMNS
        ))?;
        let rows = stmt.query_map([farmer_id], ConsultationRow::from_row)?;
        collect_rows(rows)
    }

    /// Requests with the given status, oldest first.
    pub fn list_consultations_by_status(
        &self,
        status: ConsultationStatus,
    ) -> DbResult<Vec<ConsultationRequest>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM consultation_requests WHERE status = ? ORDER BY created_at",
            CONSULTATION_COLUMNS
        ))?;
        let rows = stmt.query_map([status.as_str()], ConsultationRow::from_row)?;
        collect_rows(rows)
    }

    // =========================================================================
    // Problem reports
    // =========================================================================

    pub fn save_problem_report(&self, p: &ProblemReport) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO problem_reports (
                id, farmer_id, animal_id, problem_type, symptoms, severity, description,
                status, vet_id, vet_response, responded_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                vet_id = excluded.vet_id,
                vet_response = excluded.vet_response,
                responded_at = excluded.responded_at
            "#,
            params![
                p.id,
                p.farmer_id,
                p.animal_id,
                p.problem_type,
                p.symptoms,
                p.severity.as_str(),
                p.description,
                p.status.as_str(),
                p.vet_id,
                p.vet_response,
                encode_opt_ts(&p.responded_at),
                encode_ts(&p.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_problem_report(&self, id: &str) -> DbResult<Option<ProblemReport>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM problem_reports WHERE id = ?", PROBLEM_COLUMNS),
                [id],
                ProblemRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    pub fn list_problem_reports_for_farmer(&self, farmer_id: &str) -> DbResult<Vec<ProblemReport>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM problem_reports WHERE farmer_id = ? ORDER BY created_at DESC",
            PROBLEM_COLUMNS
        ))?;
        let rows = stmt.query_map([farmer_id], ProblemRow::from_row)?;
        collect_rows(rows)
    }

    /// Reports awaiting a veterinarian, most severe first.
    pub fn list_pending_problem_reports(&self) -> DbResult<Vec<ProblemReport>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM problem_reports
            WHERE status = 'pending'
            ORDER BY CASE severity WHEN 'high' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END, created_at
            "#,
            PROBLEM_COLUMNS
        ))?;
        let rows = stmt.query_map([], ProblemRow::from_row)?;
        collect_rows(rows)
    }

    // =========================================================================
    // Testing reports
    // =========================================================================

    pub fn save_testing_report(&self, t: &TestingReport) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO testing_reports (
                id, animal_id, vet_id, lab_id, test_type, test_description, sample_type,
                priority, status, results, notes, requested_at, received_at, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ON CONFLICT(id) DO UPDATE SET
                lab_id = excluded.lab_id,
                status = excluded.status,
                results = excluded.results,
                notes = excluded.notes,
                received_at = excluded.received_at,
                completed_at = excluded.completed_at
            "#,
            params![
                t.id,
                t.animal_id,
                t.vet_id,
                t.lab_id,
                t.test_type,
                t.test_description,
                t.sample_type,
                t.priority.as_str(),
                t.status.as_str(),
                t.results,
                t.notes,
                encode_ts(&t.requested_at),
                encode_opt_ts(&t.received_at),
                encode_opt_ts(&t.completed_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_testing_report(&self, id: &str) -> DbResult<Option<TestingReport>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM testing_reports WHERE id = ?", TESTING_COLUMNS),
                [id],
                TestingRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Lab work queue: everything not yet completed, urgent first.
    pub fn list_open_testing_reports(&self) -> DbResult<Vec<TestingReport>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM testing_reports
            WHERE status != 'completed'
            ORDER BY CASE priority WHEN 'urgent' THEN 0 WHEN 'high' THEN 1 WHEN 'medium' THEN 2 ELSE 3 END,
                     requested_at
            "#,
            TESTING_COLUMNS
        ))?;
        let rows = stmt.query_map([], TestingRow::from_row)?;
        collect_rows(rows)
    }
}

fn collect_rows<R, T, F>(rows: rusqlite::MappedRows<'_, F>) -> DbResult<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<R>,
    T: TryFrom<R, Error = DbError>,
{
    let mut out = Vec::new();
    for row in rows {
        out.push(T::try_from(row?)?);
    }
    Ok(out)
}

fn parse_priority(s: &str) -> DbResult<Priority> {
    Priority::parse(s).ok_or_else(|| DbError::Constraint(format!("Unknown priority: {}", s)))
}

struct ConsultationRow {
    id: String,
    farmer_id: String,
    vet_id: Option<String>,
    animal_id: Option<String>,
    consultation_type: String,
    priority: String,
    symptoms: String,
    notes: Option<String>,
    scheduled_at: Option<String>,
    status: String,
    rating: Option<u8>,
    feedback: Option<String>,
    created_at: String,
    updated_at: String,
}

impl ConsultationRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            farmer_id: row.get(1)?,
            vet_id: row.get(2)?,
            animal_id: row.get(3)?,
            consultation_type: row.get(4)?,
            priority: row.get(5)?,
            symptoms: row.get(6)?,
            notes: row.get(7)?,
            scheduled_at: row.get(8)?,
            status: row.get(9)?,
            rating: row.get(10)?,
            feedback: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }
}

impl TryFrom<ConsultationRow> for ConsultationRequest {
    type Error = DbError;

    fn try_from(row: ConsultationRow) -> Result<Self, Self::Error> {
        let status = ConsultationStatus::parse(&row.status).ok_or_else(|| {
            DbError::Constraint(format!("Unknown consultation status: {}", row.status))
        })?;

        Ok(ConsultationRequest {
            priority: parse_priority(&row.priority)?,
            id: row.id,
            farmer_id: row.farmer_id,
            vet_id: row.vet_id,
            animal_id: row.animal_id,
            consultation_type: row.consultation_type,
            symptoms: row.symptoms,
            notes: row.notes,
            scheduled_at: decode_opt_ts(row.scheduled_at)?,
            status,
            rating: row.rating,
            feedback: row.feedback,
            created_at: decode_ts(&row.created_at)?,
            updated_at: decode_ts(&row.updated_at)?,
        })
    }
}

struct ProblemRow {
    id: String,
    farmer_id: String,
    animal_id: Option<String>,
    problem_type: String,
    symptoms: String,
    severity: String,
    description: Option<String>,
    status: String,
    vet_id: Option<String>,
    vet_response: Option<String>,
    responded_at: Option<String>,
    created_at: String,
}

impl ProblemRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            farmer_id: row.get(1)?,
            animal_id: row.get(2)?,
            problem_type: row.get(3)?,
            symptoms: row.get(4)?,
            severity: row.get(5)?,
            description: row.get(6)?,
            status: row.get(7)?,
            vet_id: row.get(8)?,
            vet_response: row.get(9)?,
            responded_at: row.get(10)?,
            created_at: row.get(11)?,
        })
    }
}

impl TryFrom<ProblemRow> for ProblemReport {
    type Error = DbError;

    fn try_from(row: ProblemRow) -> Result<Self, Self::Error> {
        let severity = Severity::parse(&row.severity)
            .ok_or_else(|| DbError::Constraint(format!("Unknown severity: {}", row.severity)))?;
        let status = ProblemStatus::parse(&row.status)
            .ok_or_else(|| DbError::Constraint(format!("Unknown problem status: {}", row.status)))?;

        Ok(ProblemReport {
            id: row.id,
            farmer_id: row.farmer_id,
            animal_id: row.animal_id,
            problem_type: row.problem_type,
            symptoms: row.symptoms,
            severity,
            description: row.description,
            status,
            vet_id: row.vet_id,
            vet_response: row.vet_response,
            responded_at: decode_opt_ts(row.responded_at)?,
            created_at: decode_ts(&row.created_at)?,
        })
    }
}

struct TestingRow {
    id: String,
    animal_id: String,
    vet_id: String,
    lab_id: Option<String>,
    test_type: String,
    test_description: Option<String>,
    sample_type: String,
    priority: String,
    status: String,
    results: Option<String>,
    notes: Option<String>,
    requested_at: String,
    received_at: Option<String>,
    completed_at: Option<String>,
}

impl TestingRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            animal_id: row.get(1)?,
            vet_id: row.get(2)?,
            lab_id: row.get(3)?,
            test_type: row.get(4)?,
            test_description: row.get(5)?,
            sample_type: row.get(6)?,
            priority: row.get(7)?,
            status: row.get(8)?,
            results: row.get(9)?,
            notes: row.get(10)?,
            requested_at: row.get(11)?,
            received_at: row.get(12)?,
            completed_at: row.get(13)?,
        })
    }
}

impl TryFrom<TestingRow> for TestingReport {
    type Error = DbError;

    fn try_from(row: TestingRow) -> Result<Self, Self::Error> {
        let status = TestingStatus::parse(&row.status)
            .ok_or_else(|| DbError::Constraint(format!("Unknown testing status: {}", row.status)))?;

        Ok(TestingReport {
            priority: parse_priority(&row.priority)?,
            id: row.id,
            animal_id: row.animal_id,
            vet_id: row.vet_id,
            lab_id: row.lab_id,
            test_type: row.test_type,
            test_description: row.test_description,
            sample_type: row.sample_type,
            status,
            results: row.results,
            notes: row.notes,
            requested_at: decode_ts(&row.requested_at)?,
            received_at: decode_opt_ts(row.received_at)?,
            completed_at: decode_opt_ts(row.completed_at)?,
        })
    }
}
