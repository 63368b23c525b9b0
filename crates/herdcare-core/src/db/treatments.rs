//! Treatment database operations. Treatments are append-only.

use rusqlite::{params, OptionalExtension, Row};

use super::{decode_ts, encode_ts, Database, DbError, DbResult};
use crate::models::Treatment;

impl Database {
    pub fn insert_treatment(&self, treatment: &Treatment) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO treatments (
                id, animal_id, vet_id, medication_id, diagnosis, dosage,
                route_of_administration, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                treatment.id,
                treatment.animal_id,
                treatment.vet_id,
                treatment.medication_id,
                treatment.diagnosis,
                treatment.dosage,
                treatment.route_of_administration,
                treatment.notes,
                encode_ts(&treatment.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_treatment(&self, id: &str) -> DbResult<Option<Treatment>> {
        self.conn
            .query_row(
                r#"
                SELECT id, animal_id, vet_id, medication_id, diagnosis, dosage,
                       route_of_administration, notes, created_at
                FROM treatments WHERE id = ?
                "#,
                [id],
                TreatmentRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Treatment history for an animal, most recent first.
    pub fn list_treatments_for_animal(&self, animal_id: &str) -> DbResult<Vec<Treatment>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, animal_id, vet_id, medication_id, diagnosis, dosage,
                   route_of_administration, notes, created_at
            FROM treatments
            WHERE animal_id = ?
            ORDER BY created_at DESC
            "#,
        )?;
        let rows = stmt.query_map([animal_id], TreatmentRow::from_row)?;

        let mut treatments = Vec::new();
        for row in rows {
            treatments.push(row?.try_into()?);
        }
        Ok(treatments)
    }
}

struct TreatmentRow {
    id: String,
    animal_id: String,
    vet_id: String,
    medication_id: String,
    diagnosis: String,
    dosage: String,
    route_of_administration: Option<String>,
    notes: Option<String>,
    created_at: String,
}

impl TreatmentRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            animal_id: row.get(1)?,
            vet_id: row.get(2)?,
            medication_id: row.get(3)?,
            diagnosis: row.get(4)?,
            dosage: row.get(5)?,
            route_of_administration: row.get(6)?,
            notes: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}

impl TryFrom<TreatmentRow> for Treatment {
    type Error = DbError;

    fn try_from(row: TreatmentRow) -> Result<Self, Self::Error> {
        Ok(Treatment {
            id: row.id,
            animal_id: row.animal_id,
            vet_id: row.vet_id,
            medication_id: row.medication_id,
            diagnosis: row.diagnosis,
            dosage: row.dosage,
            route_of_administration: row.route_of_administration,
            notes: row.notes,
            created_at: decode_ts(&row.created_at)?,
        })
    }
}
