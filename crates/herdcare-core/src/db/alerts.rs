//! Compliance alert database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{decode_opt_ts, decode_ts, encode_opt_ts, encode_ts, Database, DbError, DbResult};
use crate::models::{AlertStatus, AlertType, ComplianceAlert, Severity};

const ALERT_COLUMNS: &str =
    "id, farm_id, animal_id, alert_type, severity, description, status, created_at, resolved_at";

impl Database {
    pub fn insert_alert(&self, alert: &ComplianceAlert) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO compliance_alerts (
                id, farm_id, animal_id, alert_type, severity, description,
                status, created_at, resolved_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                alert.id,
                alert.farm_id,
                alert.animal_id,
                alert.alert_type.as_str(),
                alert.severity.as_str(),
                alert.description,
                alert.status.as_str(),
                encode_ts(&alert.created_at),
                encode_opt_ts(&alert.resolved_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_alert(&self, id: &str) -> DbResult<Option<ComplianceAlert>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM compliance_alerts WHERE id = ?", ALERT_COLUMNS),
                [id],
                AlertRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Active alerts for a farm, newest first.
    pub fn list_active_alerts_for_farm(&self, farm_id: &str) -> DbResult<Vec<ComplianceAlert>> {
        self.query_alerts(
            &format!(
                r#"
                SELECT {} FROM compliance_alerts
                WHERE farm_id = ? AND status = 'active'
                ORDER BY created_at DESC
                "#,
                ALERT_COLUMNS
            ),
            [farm_id],
        )
    }

    /// Active alerts across every farm, newest first.
    pub fn list_active_alerts(&self) -> DbResult<Vec<ComplianceAlert>> {
        self.query_alerts(
            &format!(
                "SELECT {} FROM compliance_alerts WHERE status = 'active' ORDER BY created_at DESC",
                ALERT_COLUMNS
            ),
            [],
        )
    }

    /// The active alert of a given type for an animal, if any.
    pub fn find_active_alert(
        &self,
        animal_id: &str,
        alert_type: &AlertType,
    ) -> DbResult<Option<ComplianceAlert>> {
        self.conn
            .query_row(
                &format!(
                    r#"
                    SELECT {} FROM compliance_alerts
                    WHERE animal_id = ?1 AND alert_type = ?2 AND status = 'active'
                    ORDER BY created_at DESC
                    LIMIT 1
                    "#,
                    ALERT_COLUMNS
                ),
                params![animal_id, alert_type.as_str()],
                AlertRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Rewrite the severity and description of an active alert.
    pub fn refresh_alert(&self, id: &str, severity: Severity, description: &str) -> DbResult<()> {
        self.conn.execute(
            r#"
            UPDATE compliance_alerts
            SET severity = ?2, description = ?3
            WHERE id = ?1 AND status = 'active'
            "#,
            params![id, severity.as_str(), description],
        )?;
        Ok(())
    }

    /// Resolve an active alert; returns false if it was not active.
    pub fn resolve_alert_record(&self, id: &str, resolved_at: &DateTime<Utc>) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE compliance_alerts
            SET status = 'resolved', resolved_at = ?2
            WHERE id = ?1 AND status = 'active'
            "#,
            params![id, encode_ts(resolved_at)],
        )?;
        Ok(rows_affected > 0)
    }

    fn query_alerts<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> DbResult<Vec<ComplianceAlert>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, AlertRow::from_row)?;

        let mut alerts = Vec::new();
        for row in rows {
            alerts.push(row?.try_into()?);
        }
        Ok(alerts)
    }
}

struct AlertRow {
    id: String,
    farm_id: String,
    animal_id: Option<String>,
    alert_type: String,
    severity: String,
    description: String,
    status: String,
    created_at: String,
    resolved_at: Option<String>,
}

impl AlertRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            farm_id: row.get(1)?,
            animal_id: row.get(2)?,
            alert_type: row.get(3)?,
            severity: row.get(4)?,
            description: row.get(5)?,
            status: row.get(6)?,
            created_at: row.get(7)?,
            resolved_at: row.get(8)?,
        })
    }
}

impl TryFrom<AlertRow> for ComplianceAlert {
    type Error = DbError;

    fn try_from(row: AlertRow) -> Result<Self, Self::Error> {
        let severity = Severity::parse(&row.severity)
            .ok_or_else(|| DbError::Constraint(format!("Unknown severity: {}", row.severity)))?;
        let status = AlertStatus::parse(&row.status)
            .ok_or_else(|| DbError::Constraint(format!("Unknown alert status: {}", row.status)))?;

        Ok(ComplianceAlert {
            id: row.id,
            farm_id: row.farm_id,
            animal_id: row.animal_id,
            alert_type: AlertType::parse(&row.alert_type),
            severity,
            description: row.description,
            status,
            created_at: decode_ts(&row.created_at)?,
            resolved_at: decode_opt_ts(row.resolved_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Animal, Farm, Profile, Role};
    use chrono::{Duration, TimeZone};

    fn setup() -> (Database, Farm, Animal) {
        let db = Database::open_in_memory().unwrap();
        let owner = Profile::new("Asha".into(), "asha@example.com".into(), Role::Farmer);
        db.insert_profile(&owner).unwrap();
        let farm = Farm::new(owner.id, "Green Acres".into(), "Lane 1".into());
        db.insert_farm(&farm).unwrap();
        let animal = Animal::new(farm.id.clone(), "TAG-001".into(), "bovine".into());
        db.insert_animal(&animal).unwrap();
        (db, farm, animal)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let (db, farm, animal) = setup();
        let alert = ComplianceAlert::new(
            farm.id,
            Some(animal.id),
            AlertType::MissedTask,
            Severity::Medium,
            "1 task overdue".into(),
            now(),
        );
        db.insert_alert(&alert).unwrap();
        assert_eq!(db.get_alert(&alert.id).unwrap().unwrap(), alert);
    }

    #[test]
    fn test_find_and_resolve() {
        let (db, farm, animal) = setup();
        let alert = ComplianceAlert::new(
            farm.id.clone(),
            Some(animal.id.clone()),
            AlertType::ProlongedWithdrawal,
            Severity::Low,
            "40 days remaining".into(),
            now(),
        );
        db.insert_alert(&alert).unwrap();

        let found = db
            .find_active_alert(&animal.id, &AlertType::ProlongedWithdrawal)
            .unwrap();
        assert_eq!(found.map(|a| a.id), Some(alert.id.clone()));
        assert!(db.find_active_alert(&animal.id, &AlertType::MissedTask).unwrap().is_none());

        let resolved_at = now() + Duration::hours(1);
        assert!(db.resolve_alert_record(&alert.id, &resolved_at).unwrap());
        assert!(!db.resolve_alert_record(&alert.id, &resolved_at).unwrap());

        let stored = db.get_alert(&alert.id).unwrap().unwrap();
        assert_eq!(stored.status, AlertStatus::Resolved);
        assert_eq!(stored.resolved_at, Some(resolved_at));
        assert!(db.list_active_alerts_for_farm(&farm.id).unwrap().is_empty());
    }

    #[test]
    fn test_custom_alert_type_round_trips() {
        let (db, farm, _) = setup();
        let alert = ComplianceAlert::new(
            farm.id,
            None,
            AlertType::Other("feed_contamination".into()),
            Severity::High,
            "Mycotoxin found in silage".into(),
            now(),
        );
        db.insert_alert(&alert).unwrap();

        let active = db.list_active_alerts().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].alert_type, AlertType::Other("feed_contamination".into()));
    }

    #[test]
    fn test_refresh_alert() {
        let (db, farm, animal) = setup();
        let alert = ComplianceAlert::new(
            farm.id,
            Some(animal.id),
            AlertType::MissedTask,
            Severity::Medium,
            "overdue".into(),
            now(),
        );
        db.insert_alert(&alert).unwrap();
        db.refresh_alert(&alert.id, Severity::High, "overdue by 3 days").unwrap();
        let stored = db.get_alert(&alert.id).unwrap().unwrap();
        assert_eq!(stored.severity, Severity::High);
        assert_eq!(stored.description, "overdue by 3 days");

        // Resolved alerts are left alone.
        db.resolve_alert_record(&alert.id, &now()).unwrap();
        db.refresh_alert(&alert.id, Severity::Low, "stale").unwrap();
        assert_eq!(db.get_alert(&alert.id).unwrap().unwrap().description, "overdue by 3 days");
    }
}
