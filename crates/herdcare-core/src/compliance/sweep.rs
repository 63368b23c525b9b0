//! Periodic compliance sweep and alert lifecycle.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Days, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::AlertSettings;
use crate::db::Database;
use crate::error::{CoreError, CoreResult};
use crate::models::{
    AlertStatus, AlertType, AnimalStatus, CallerContext, ComplianceAlert, Role, Severity, Task,
};

/// What a sweep changed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SweepReport {
    /// Animals moved from `withdrawal` back to `active`
    pub animals_reset: u32,
    pub alerts_raised: u32,
    /// Existing alerts whose severity or description changed
    pub alerts_updated: u32,
    pub alerts_resolved: u32,
}

/// Re-evaluates persisted animal status and maintains the
/// `missed_task` / `prolonged_withdrawal` alerts.
pub struct ComplianceSweep<'a> {
    db: &'a Database,
    settings: &'a AlertSettings,
}

impl<'a> ComplianceSweep<'a> {
    pub fn new(db: &'a Database, settings: &'a AlertSettings) -> Self {
        Self { db, settings }
    }

    /// Run one sweep at `now`. All changes commit together.
    pub fn run(&self, now: DateTime<Utc>) -> CoreResult<SweepReport> {
        let report = self.db.in_transaction(|db| {
            let mut report = SweepReport::default();
            self.reset_elapsed(db, now, &mut report)?;
            self.sync_missed_task_alerts(db, now, &mut report)?;
            self.sync_prolonged_withdrawal_alerts(db, now, &mut report)?;
            Ok::<_, CoreError>(report)
        })?;

        info!(
            animals_reset = report.animals_reset,
            raised = report.alerts_raised,
            updated = report.alerts_updated,
            resolved = report.alerts_resolved,
            "Compliance sweep finished"
        );
        Ok(report)
    }

    fn reset_elapsed(
        &self,
        db: &Database,
        now: DateTime<Utc>,
        report: &mut SweepReport,
    ) -> CoreResult<()> {
        for mut animal in db.list_animals_by_status(AnimalStatus::Withdrawal)? {
            let window = animal.withdrawal_window();
            if window.evaluate(now).is_safe() {
                animal.apply_window(window, now);
                db.update_withdrawal(&animal)?;
                debug!(animal_id = %animal.id, "Withdrawal elapsed, animal active");
                report.animals_reset += 1;
            }
        }
        Ok(())
    }

    fn sync_missed_task_alerts(
        &self,
        db: &Database,
        now: DateTime<Utc>,
        report: &mut SweepReport,
    ) -> CoreResult<()> {
        let today = now.date_naive();
        let Some(yesterday) = today.checked_sub_days(Days::new(1)) else {
            return Ok(());
        };

        // Every incomplete task scheduled before today, grouped per animal.
        let mut overdue: BTreeMap<String, Vec<Task>> = BTreeMap::new();
        for task in db.list_incomplete_tasks_due_by(yesterday)? {
            overdue.entry(task.animal_id.clone()).or_default().push(task);
        }

        let grace = i64::from(self.settings.missed_task_grace_days.max(1));
        let high = i64::from(self.settings.missed_task_high_days);

        for (animal_id, tasks) in &overdue {
            let oldest = tasks.iter().map(|t| t.days_overdue(today)).max().unwrap_or(0);
            if oldest < grace {
                continue;
            }
            let severity = if oldest >= high {
                Severity::High
            } else {
                Severity::Medium
            };

            let Some(animal) = db.get_animal(animal_id)? else {
                continue;
            };
            let description = format!(
                "{} care task(s) overdue for {}, oldest by {} day(s)",
                tasks.len(),
                animal.display_name(),
                oldest
            );
            self.upsert_alert(
                db,
                &animal.farm_id,
                animal_id,
                AlertType::MissedTask,
                severity,
                description,
                now,
                report,
            )?;
        }

        let still_overdue: HashSet<&str> = overdue.keys().map(String::as_str).collect();
        self.resolve_where(db, &AlertType::MissedTask, now, report, |animal_id| {
            !still_overdue.contains(animal_id)
        })
    }

    fn sync_prolonged_withdrawal_alerts(
        &self,
        db: &Database,
        now: DateTime<Utc>,
        report: &mut SweepReport,
    ) -> CoreResult<()> {
        let threshold = chrono::Duration::days(i64::from(self.settings.prolonged_withdrawal_days));
        let mut prolonged = HashSet::new();

        for animal in db.list_all_animals()? {
            let Some(until) = animal.withdrawal_window().restricted_until(now) else {
                continue;
            };
            let remaining = until - now;
            if remaining <= threshold {
                continue;
            }

            let description = format!(
                "{} is restricted for another {} day(s), until {}",
                animal.display_name(),
                remaining.num_days(),
                until.format("%Y-%m-%d %H:%M UTC")
            );
            self.upsert_alert(
                db,
                &animal.farm_id,
                &animal.id,
                AlertType::ProlongedWithdrawal,
                Severity::Low,
                description,
                now,
                report,
            )?;
            prolonged.insert(animal.id);
        }

        self.resolve_where(db, &AlertType::ProlongedWithdrawal, now, report, |animal_id| {
            !prolonged.contains(animal_id)
        })
    }

    /// Raise an alert unless one is already active for (animal, type); an
    /// existing alert takes the new severity and description.
    #[allow(clippy::too_many_arguments)]
    fn upsert_alert(
        &self,
        db: &Database,
        farm_id: &str,
        animal_id: &str,
        alert_type: AlertType,
        severity: Severity,
        description: String,
        now: DateTime<Utc>,
        report: &mut SweepReport,
    ) -> CoreResult<()> {
        match db.find_active_alert(animal_id, &alert_type)? {
            Some(existing) => {
                if existing.severity != severity || existing.description != description {
                    db.refresh_alert(&existing.id, severity, &description)?;
                    report.alerts_updated += 1;
                }
            }
            None => {
                let alert = ComplianceAlert::new(
                    farm_id.to_string(),
                    Some(animal_id.to_string()),
                    alert_type,
                    severity,
                    description,
                    now,
                );
                db.insert_alert(&alert)?;
                debug!(alert_id = %alert.id, animal_id, "Compliance alert raised");
                report.alerts_raised += 1;
            }
        }
        Ok(())
    }

    fn resolve_where<F>(
        &self,
        db: &Database,
        alert_type: &AlertType,
        now: DateTime<Utc>,
        report: &mut SweepReport,
        cleared: F,
    ) -> CoreResult<()>
    where
        F: Fn(&str) -> bool,
    {
        for alert in db.list_active_alerts()? {
            if &alert.alert_type != alert_type {
                continue;
            }
            let Some(animal_id) = alert.animal_id.as_deref() else {
                continue;
            };
            if cleared(animal_id) && db.resolve_alert_record(&alert.id, &now)? {
                report.alerts_resolved += 1;
            }
        }
        Ok(())
    }
}

/// Manually resolve an active alert.
///
/// Allowed for admins, veterinarians and the owner of the alert's farm.
pub fn resolve_alert(
    db: &Database,
    ctx: &CallerContext,
    alert_id: &str,
    now: DateTime<Utc>,
) -> CoreResult<ComplianceAlert> {
    let mut alert = db
        .get_alert(alert_id)?
        .ok_or_else(|| CoreError::not_found("alert", alert_id))?;

    if !matches!(ctx.role, Role::Admin | Role::Veterinarian) {
        let owner = db.get_farm(&alert.farm_id)?.map(|f| f.owner_id);
        if owner.as_deref() != Some(ctx.user_id.as_str()) {
            return Err(CoreError::Forbidden(format!(
                "{} may not resolve alerts on farm {}",
                ctx.role.as_str(),
                alert.farm_id
            )));
        }
    }

    if !alert.is_active() || !db.resolve_alert_record(alert_id, &now)? {
        return Err(CoreError::InvalidState(format!(
            "alert {} is already resolved",
            alert_id
        )));
    }

    info!(alert_id, user_id = %ctx.user_id, "Alert resolved");
    alert.status = AlertStatus::Resolved;
    alert.resolved_at = Some(now);
    Ok(alert)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Animal, Farm, Medication, NewTreatment, Profile};
    use chrono::{Duration, NaiveDate, NaiveTime, TimeZone};

    struct Fixture {
        db: Database,
        farmer: Profile,
        farm: Farm,
        animal: Animal,
        treatment_id: String,
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn setup() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let farmer = Profile::new("Asha".into(), "asha@example.com".into(), Role::Farmer);
        let vet = Profile::new("Dr. Rao".into(), "rao@example.com".into(), Role::Veterinarian);
        db.insert_profile(&farmer).unwrap();
        db.insert_profile(&vet).unwrap();
        let farm = Farm::new(farmer.id.clone(), "Green Acres".into(), "Lane 1".into());
        db.insert_farm(&farm).unwrap();
        let animal = Animal::new(farm.id.clone(), "TAG-001".into(), "bovine".into());
        db.insert_animal(&animal).unwrap();
        let med = Medication::new("Drug".into(), "x".into(), 48, 5);
        db.upsert_medication(&med).unwrap();
        let treatment = NewTreatment {
            animal_id: animal.id.clone(),
            medication_id: med.id,
            diagnosis: "Mastitis".into(),
            dosage: "10 mL".into(),
            ..Default::default()
        }
        .into_treatment(vet.id, t0());
        db.insert_treatment(&treatment).unwrap();

        Fixture {
            db,
            farmer,
            farm,
            animal,
            treatment_id: treatment.id,
        }
    }

    fn add_task(f: &Fixture, day: u32) -> Task {
        let task = Task {
            id: uuid::Uuid::new_v4().to_string(),
            treatment_id: f.treatment_id.clone(),
            animal_id: f.animal.id.clone(),
            farmer_id: f.farmer.id.clone(),
            medication_name: "Drug".into(),
            dosage: "10 mL".into(),
            scheduled_date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            scheduled_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            is_completed: false,
            completed_at: None,
            points_awarded: 5,
            created_at: t0(),
        };
        f.db.insert_tasks(std::slice::from_ref(&task)).unwrap();
        task
    }

    fn restrict(f: &Fixture, milk: Duration, meat: Duration) {
        let mut animal = f.db.get_animal(&f.animal.id).unwrap().unwrap();
        animal.apply_window(
            crate::compliance::WithdrawalWindow {
                milk_until: Some(t0() + milk),
                meat_until: Some(t0() + meat),
            },
            t0(),
        );
        f.db.update_withdrawal(&animal).unwrap();
    }

    fn missed_alert(f: &Fixture) -> Option<ComplianceAlert> {
        f.db.find_active_alert(&f.animal.id, &AlertType::MissedTask).unwrap()
    }

    #[test]
    fn test_resets_elapsed_withdrawal() {
        let f = setup();
        restrict(&f, Duration::hours(48), Duration::days(5));
        let settings = AlertSettings::default();
        let sweep = ComplianceSweep::new(&f.db, &settings);

        // Still restricted on day 3
        let report = sweep.run(t0() + Duration::days(3)).unwrap();
        assert_eq!(report.animals_reset, 0);

        // Meat window end is exactly now: still restricted
        let report = sweep.run(t0() + Duration::days(5)).unwrap();
        assert_eq!(report.animals_reset, 0);

        let report = sweep.run(t0() + Duration::days(6)).unwrap();
        assert_eq!(report.animals_reset, 1);
        let animal = f.db.get_animal(&f.animal.id).unwrap().unwrap();
        assert_eq!(animal.status, AnimalStatus::Active);
    }

    #[test]
    fn test_missed_task_alert_escalates_then_resolves() {
        let f = setup();
        let task = add_task(&f, 1);
        let settings = AlertSettings::default();
        let sweep = ComplianceSweep::new(&f.db, &settings);

        // Due today: nothing yet
        sweep.run(t0() + Duration::hours(12)).unwrap();
        assert!(missed_alert(&f).is_none());

        // One day overdue: medium
        let report = sweep.run(t0() + Duration::days(1)).unwrap();
        assert_eq!(report.alerts_raised, 1);
        assert_eq!(missed_alert(&f).unwrap().severity, Severity::Medium);

        // Running again does not duplicate
        let report = sweep.run(t0() + Duration::days(1) + Duration::hours(1)).unwrap();
        assert_eq!(report.alerts_raised, 0);
        assert_eq!(report.alerts_updated, 0);

        // Three days overdue: escalated to high, description follows
        let report = sweep.run(t0() + Duration::days(3)).unwrap();
        assert_eq!(report.alerts_updated, 1);
        let escalated = missed_alert(&f).unwrap();
        assert_eq!(escalated.severity, Severity::High);
        assert!(escalated.description.contains("oldest by 3 day(s)"));
        assert_eq!(f.db.list_active_alerts_for_farm(&f.farm.id).unwrap().len(), 1);

        // Completed: resolved
        f.db.mark_task_completed(&task.id, &(t0() + Duration::days(3))).unwrap();
        let report = sweep.run(t0() + Duration::days(4)).unwrap();
        assert_eq!(report.alerts_resolved, 1);
        assert!(missed_alert(&f).is_none());
    }

    #[test]
    fn test_grace_period_delays_alert() {
        let f = setup();
        add_task(&f, 1);
        let settings = AlertSettings {
            missed_task_grace_days: 2,
            ..AlertSettings::default()
        };
        let sweep = ComplianceSweep::new(&f.db, &settings);

        sweep.run(t0() + Duration::days(1)).unwrap();
        assert!(missed_alert(&f).is_none());
        sweep.run(t0() + Duration::days(2)).unwrap();
        assert!(missed_alert(&f).is_some());
    }

    #[test]
    fn test_prolonged_withdrawal_alert() {
        let f = setup();
        restrict(&f, Duration::hours(96), Duration::days(60));
        let settings = AlertSettings::default();
        let sweep = ComplianceSweep::new(&f.db, &settings);

        let report = sweep.run(t0()).unwrap();
        assert_eq!(report.alerts_raised, 1);
        let alert = f
            .db
            .find_active_alert(&f.animal.id, &AlertType::ProlongedWithdrawal)
            .unwrap()
            .unwrap();
        assert_eq!(alert.severity, Severity::Low);

        // 29 days remaining: under the 30-day threshold
        let report = sweep.run(t0() + Duration::days(31)).unwrap();
        assert_eq!(report.alerts_resolved, 1);
    }

    #[test]
    fn test_manual_resolution() {
        let f = setup();
        let alert = ComplianceAlert::new(
            f.farm.id.clone(),
            None,
            AlertType::Other("inspection".into()),
            Severity::Medium,
            "Inspection follow-up".into(),
            t0(),
        );
        f.db.insert_alert(&alert).unwrap();

        let stranger = CallerContext::new("someone-else", Role::Farmer);
        assert!(matches!(
            resolve_alert(&f.db, &stranger, &alert.id, t0()),
            Err(CoreError::Forbidden(_))
        ));

        let owner = CallerContext::new(f.farmer.id.clone(), Role::Farmer);
        let resolved = resolve_alert(&f.db, &owner, &alert.id, t0()).unwrap();
        assert!(!resolved.is_active());

        let vet = CallerContext::new("vet-2", Role::Veterinarian);
        assert!(matches!(
            resolve_alert(&f.db, &vet, &alert.id, t0()),
            Err(CoreError::InvalidState(_))
        ));
    }
}
