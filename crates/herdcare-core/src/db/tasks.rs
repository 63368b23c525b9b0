//! Prescription task database operations.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{
    decode_date, decode_opt_ts, decode_time, decode_ts, encode_date, encode_time, encode_ts,
    Database, DbError, DbResult,
};
use crate::models::{Task, TaskView};

const TASK_COLUMNS: &str = "t.id, t.treatment_id, t.animal_id, t.farmer_id, t.medication_name, t.dosage, t.scheduled_date, t.scheduled_time, t.is_completed, t.completed_at, t.points_awarded, t.created_at";

impl Database {
    /// Insert a batch of tasks. Callers that need atomicity with other writes
    /// run this inside [`Database::in_transaction`].
    pub fn insert_tasks(&self, tasks: &[Task]) -> DbResult<()> {
        let mut stmt = self.conn.prepare(
            r#"
            INSERT INTO prescription_tasks (
                id, treatment_id, animal_id, farmer_id, medication_name, dosage,
                scheduled_date, scheduled_time, is_completed, completed_at,
                points_awarded, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )?;

        for task in tasks {
            stmt.execute(params![
                task.id,
                task.treatment_id,
                task.animal_id,
                task.farmer_id,
                task.medication_name,
                task.dosage,
                encode_date(&task.scheduled_date),
                encode_time(&task.scheduled_time),
                task.is_completed,
                task.completed_at.as_ref().map(encode_ts),
                task.points_awarded,
                encode_ts(&task.created_at),
            ])?;
        }
        Ok(())
    }

    pub fn get_task(&self, id: &str) -> DbResult<Option<Task>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM prescription_tasks t WHERE t.id = ?", TASK_COLUMNS),
                [id],
                TaskRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Tasks generated for a treatment, in schedule order.
    pub fn list_tasks_for_treatment(&self, treatment_id: &str) -> DbResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM prescription_tasks t
            WHERE t.treatment_id = ?
            ORDER BY t.scheduled_date, t.scheduled_time
            "#,
            TASK_COLUMNS
        ))?;
        let rows = stmt.query_map([treatment_id], TaskRow::from_row)?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?.try_into()?);
        }
        Ok(tasks)
    }

    /// Flag a task completed.
    ///
    /// Guarded on `is_completed = 0` so a concurrent second completion
    /// affects no rows; returns whether this call did the completion.
    pub fn mark_task_completed(&self, id: &str, completed_at: &DateTime<Utc>) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE prescription_tasks
            SET is_completed = 1, completed_at = ?2
            WHERE id = ?1 AND is_completed = 0
            "#,
            params![id, encode_ts(completed_at)],
        )?;
        Ok(rows_affected > 0)
    }

    /// A farmer's tasks scheduled on or after `since`, joined with the animal.
    pub fn list_task_views_for_farmer(
        &self,
        farmer_id: &str,
        since: NaiveDate,
    ) -> DbResult<Vec<TaskView>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {}, a.name, a.tag_id
            FROM prescription_tasks t
            JOIN animals a ON a.id = t.animal_id
            WHERE t.farmer_id = ?1 AND t.scheduled_date >= ?2
            ORDER BY t.scheduled_date, t.scheduled_time
            "#,
            TASK_COLUMNS
        ))?;
        let rows = stmt.query_map(params![farmer_id, encode_date(&since)], |row| {
            Ok((TaskRow::from_row(row)?, row.get::<_, Option<String>>(12)?, row.get::<_, String>(13)?))
        })?;

        let mut views = Vec::new();
        for row in rows {
            let (task_row, animal_name, animal_tag_id) = row?;
            views.push(TaskView {
                task: task_row.try_into()?,
                animal_name,
                animal_tag_id,
            });
        }
        Ok(views)
    }

    /// Incomplete tasks whose scheduled date is on or before `cutoff`.
    pub fn list_incomplete_tasks_due_by(&self, cutoff: NaiveDate) -> DbResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM prescription_tasks t
            WHERE t.is_completed = 0 AND t.scheduled_date <= ?
            ORDER BY t.animal_id, t.scheduled_date
            "#,
            TASK_COLUMNS
        ))?;
        let rows = stmt.query_map([encode_date(&cutoff)], TaskRow::from_row)?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?.try_into()?);
        }
        Ok(tasks)
    }
}

/// Intermediate row struct for database mapping.
struct TaskRow {
    id: String,
    treatment_id: String,
    animal_id: String,
    farmer_id: String,
    medication_name: String,
    dosage: String,
    scheduled_date: String,
    scheduled_time: String,
    is_completed: bool,
    completed_at: Option<String>,
    points_awarded: i64,
    created_at: String,
}

impl TaskRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            treatment_id: row.get(1)?,
            animal_id: row.get(2)?,
            farmer_id: row.get(3)?,
            medication_name: row.get(4)?,
            dosage: row.get(5)?,
            scheduled_date: row.get(6)?,
            scheduled_time: row.get(7)?,
            is_completed: row.get(8)?,
            completed_at: row.get(9)?,
            points_awarded: row.get(10)?,
            created_at: row.get(11)?,
        })
    }
}

impl TryFrom<TaskRow> for Task {
    type Error = DbError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let points_awarded = u32::try_from(row.points_awarded)
            .map_err(|_| DbError::Parse(format!("points_awarded out of range: {}", row.points_awarded)))?;

        Ok(Task {
            id: row.id,
            treatment_id: row.treatment_id,
            animal_id: row.animal_id,
            farmer_id: row.farmer_id,
            medication_name: row.medication_name,
            dosage: row.dosage,
            scheduled_date: decode_date(&row.scheduled_date)?,
            scheduled_time: decode_time(&row.scheduled_time)?,
            is_completed: row.is_completed,
            completed_at: decode_opt_ts(row.completed_at)?,
            points_awarded,
            created_at: decode_ts(&row.created_at)?,
        })
    }
}
