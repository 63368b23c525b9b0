//! Medication registry database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{decode_ts, encode_ts, Database, DbError, DbResult};
use crate::models::Medication;

const MEDICATION_COLUMNS: &str = "m.id, m.med_name, m.active_ingredient, m.withdrawal_period_milk_hours, m.withdrawal_period_meat_days, m.dosage_instructions, m.created_at";

impl Database {
    /// Insert or update a medication.
    pub fn upsert_medication(&self, med: &Medication) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO medications (
                id, med_name, active_ingredient, withdrawal_period_milk_hours,
                withdrawal_period_meat_days, dosage_instructions, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                med_name = excluded.med_name,
                active_ingredient = excluded.active_ingredient,
                withdrawal_period_milk_hours = excluded.withdrawal_period_milk_hours,
                withdrawal_period_meat_days = excluded.withdrawal_period_meat_days,
                dosage_instructions = excluded.dosage_instructions
            "#,
            params![
                med.id,
                med.name,
                med.active_ingredient,
                med.withdrawal_period_milk_hours,
                med.withdrawal_period_meat_days,
                med.dosage_instructions,
                encode_ts(&med.created_at),
            ],
        )?;
        Ok(())
    }

    /// Get a medication by ID.
    pub fn get_medication(&self, id: &str) -> DbResult<Option<Medication>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM medications m WHERE m.id = ?", MEDICATION_COLUMNS),
                [id],
                MedicationRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List the whole registry ordered by name.
    pub fn list_medications(&self) -> DbResult<Vec<Medication>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM medications m ORDER BY m.med_name",
            MEDICATION_COLUMNS
        ))?;
        let rows = stmt.query_map([], MedicationRow::from_row)?;

        let mut meds = Vec::new();
        for row in rows {
            meds.push(row?.try_into()?);
        }
        Ok(meds)
    }

    /// Search by name or active ingredient using FTS5 (BM25 ranking).
    pub fn search_medications(&self, query: &str, limit: usize) -> DbResult<Vec<Medication>> {
        let escaped_query = escape_fts_query(query);
        if escaped_query.is_empty() {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {}, bm25(medications_fts) as rank
            FROM medications m
            JOIN medications_fts fts ON m.rowid = fts.rowid
            WHERE medications_fts MATCH ?
            ORDER BY rank
            LIMIT ?
            "#,
            MEDICATION_COLUMNS
        ))?;
        let rows = stmt.query_map(params![escaped_query, limit as i64], MedicationRow::from_row)?;

        let mut meds = Vec::new();
        for row in rows {
            meds.push(row?.try_into()?);
        }
        Ok(meds)
    }
}

/// Intermediate row struct for database mapping.
struct MedicationRow {
    id: String,
    name: String,
    active_ingredient: String,
    milk_hours: i64,
    meat_days: i64,
    dosage_instructions: Option<String>,
    created_at: String,
}

impl MedicationRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            active_ingredient: row.get(2)?,
            milk_hours: row.get(3)?,
            meat_days: row.get(4)?,
            dosage_instructions: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

impl TryFrom<MedicationRow> for Medication {
    type Error = DbError;

    fn try_from(row: MedicationRow) -> Result<Self, Self::Error> {
        let to_u32 = |v: i64, column: &str| {
            u32::try_from(v).map_err(|_| DbError::Parse(format!("{} out of range: {}", column, v)))
        };
        Ok(Medication {
            withdrawal_period_milk_hours: to_u32(row.milk_hours, "withdrawal_period_milk_hours")?,
            withdrawal_period_meat_days: to_u32(row.meat_days, "withdrawal_period_meat_days")?,
            id: row.id,
            name: row.name,
            active_ingredient: row.active_ingredient,
            dosage_instructions: row.dosage_instructions,
            created_at: decode_ts(&row.created_at)?,
        })
    }
}

/// Escape special FTS5 characters and prepare query for prefix matching.
fn escape_fts_query(query: &str) -> String {
    let cleaned: String = query
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    cleaned
        .split_whitespace()
        .map(|word| format!("{}*", word))
        .collect::<Vec<_>>()
        .join(" ")
}
