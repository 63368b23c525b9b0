//! Task completion, reward credit and compliance sweep workflows.

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use herdcare_core::compliance::{farmer_dashboard, resolve_alert, ComplianceSweep};
use herdcare_core::config::{AlertSettings, Settings, TaskSettings};
use herdcare_core::db::Database;
use herdcare_core::error::CoreError;
use herdcare_core::models::{
    AlertType, Animal, AnimalStatus, CallerContext, Farm, Medication, NewTreatment, Profile, Role,
    Severity, Task,
};
use herdcare_core::tasks::{TaskPolicy, TaskTracker};
use herdcare_core::treatment::TreatmentRecorder;

struct Fixture {
    db: Database,
    farmer: Profile,
    farmer_ctx: CallerContext,
    vet_ctx: CallerContext,
    farm: Farm,
    animal: Animal,
}

fn fixture(db: Database) -> Result<Fixture> {
    let farmer = Profile::new("Asha".into(), "asha@example.com".into(), Role::Farmer);
    let vet = Profile::new("Dr. Rao".into(), "rao@example.com".into(), Role::Veterinarian);
    db.insert_profile(&farmer)?;
    db.insert_profile(&vet)?;

    let farm = Farm::new(farmer.id.clone(), "Green Acres".into(), "Lane 1".into());
    db.insert_farm(&farm)?;
    let mut animal = Animal::new(farm.id.clone(), "TAG-001".into(), "bovine".into());
    animal.name = Some("Daisy".into());
    db.insert_animal(&animal)?;

    Ok(Fixture {
        farmer_ctx: CallerContext::new(farmer.id.clone(), Role::Farmer),
        vet_ctx: CallerContext::new(vet.id, Role::Veterinarian),
        db,
        farmer,
        farm,
        animal,
    })
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
}

/// Record a 48h/5d treatment on day 1 and return its tasks.
fn treat(f: &Fixture, settings: &TaskSettings) -> Result<Vec<Task>> {
    let med = Medication::new("Drug".into(), "x".into(), 48, 5);
    f.db.upsert_medication(&med)?;
    let recorded = TreatmentRecorder::new(&f.db, settings).record(
        &f.vet_ctx,
        NewTreatment {
            animal_id: f.animal.id.clone(),
            medication_id: med.id,
            diagnosis: "Mastitis".into(),
            dosage: "10 mL".into(),
            ..Default::default()
        },
        at(1, 0),
    )?;
    Ok(recorded.tasks)
}

#[test]
fn test_complete_task_credits_points_once() -> Result<()> {
    let f = fixture(Database::open_in_memory()?)?;
    let tasks = treat(&f, &TaskSettings::default())?;
    let first = &tasks[0];
    assert_eq!(first.scheduled_date, at(1, 0).date_naive());
    assert_eq!(first.points_awarded, 5);

    let tracker = TaskTracker::new(&f.db);
    let completion = tracker.complete_task(&f.farmer_ctx, &first.id, at(1, 12))?;
    assert!(completion.task.is_completed);
    assert_eq!(completion.reward_balance, Some(5));
    assert!(!completion.is_partial());

    let profile = f.db.get_profile(&f.farmer.id)?.unwrap();
    assert_eq!(profile.reward_points, 5);

    // Second completion is rejected and credits nothing.
    let again = tracker.complete_task(&f.farmer_ctx, &first.id, at(1, 13));
    assert!(matches!(again, Err(CoreError::InvalidState(_))));
    assert_eq!(f.db.get_profile(&f.farmer.id)?.unwrap().reward_points, 5);
    Ok(())
}

#[test]
fn test_future_task_cannot_be_completed() -> Result<()> {
    let f = fixture(Database::open_in_memory()?)?;
    let tasks = treat(&f, &TaskSettings::default())?;

    let result = TaskTracker::new(&f.db).complete_task(&f.farmer_ctx, &tasks[2].id, at(1, 12));
    assert!(matches!(result, Err(CoreError::InvalidState(_))));
    assert!(!f.db.get_task(&tasks[2].id)?.unwrap().is_completed);
    Ok(())
}

#[test]
fn test_interval_policy_from_settings() -> Result<()> {
    let settings = Settings::from_toml(
        r#"
        [tasks]
        points_per_task = 10
        administration_time = "18:30:00"

        [tasks.policy]
        kind = "interval_days"
        interval_days = 2
        span_days = 5
        "#,
    )?;
    let f = fixture(Database::open_in_memory()?)?;
    let tasks = treat(&f, &settings.tasks)?;

    let days: Vec<u32> = tasks
        .iter()
        .map(|t| t.scheduled_date.format("%d").to_string().parse().unwrap())
        .collect();
    assert_eq!(days, vec![1, 3, 5]);
    assert!(tasks.iter().all(|t| t.points_awarded == 10));
    assert_eq!(tasks[0].scheduled_time.format("%H:%M").to_string(), "18:30");
    Ok(())
}

#[test]
fn test_dashboard_task_states() -> Result<()> {
    let f = fixture(Database::open_in_memory()?)?;
    treat(&f, &TaskSettings::default())?;

    let dash = farmer_dashboard(&f.db, &f.farmer_ctx, &f.farmer.id, 7, at(2, 9))?;
    assert_eq!(dash.tasks.len(), 3);
    assert_eq!(dash.overdue, 1);
    assert_eq!(dash.due_today, 1);
    assert_eq!(dash.tasks[0].view.animal_name.as_deref(), Some("Daisy"));
    assert_eq!(dash.summary.fully_restricted, 1);
    Ok(())
}

#[test]
fn test_sweep_raises_escalates_and_resolves_missed_tasks() -> Result<()> {
    let f = fixture(Database::open_in_memory()?)?;
    let tasks = treat(&f, &TaskSettings::default())?;
    let alerts = AlertSettings::default();
    let sweep = ComplianceSweep::new(&f.db, &alerts);

    // Day 3: the day-1 task is two days late.
    let report = sweep.run(at(3, 6))?;
    assert_eq!(report.alerts_raised, 1);
    let alert = f
        .db
        .find_active_alert(&f.animal.id, &AlertType::MissedTask)?
        .unwrap();
    assert_eq!(alert.severity, Severity::Medium);

    // Day 4: three days late, same alert escalated.
    let report = sweep.run(at(4, 6))?;
    assert_eq!(report.alerts_raised, 0);
    assert_eq!(report.alerts_updated, 1);
    let escalated = f
        .db
        .find_active_alert(&f.animal.id, &AlertType::MissedTask)?
        .unwrap();
    assert_eq!(escalated.id, alert.id);
    assert_eq!(escalated.severity, Severity::High);

    // Catch up on everything; the alert clears on the next sweep.
    let tracker = TaskTracker::new(&f.db);
    for task in &tasks {
        tracker.complete_task(&f.farmer_ctx, &task.id, at(4, 7))?;
    }
    let report = sweep.run(at(4, 8))?;
    assert_eq!(report.alerts_resolved, 1);
    assert!(f
        .db
        .find_active_alert(&f.animal.id, &AlertType::MissedTask)?
        .is_none());
    assert_eq!(f.db.get_profile(&f.farmer.id)?.unwrap().reward_points, 15);
    Ok(())
}

#[test]
fn test_sweep_resets_elapsed_withdrawal() -> Result<()> {
    let f = fixture(Database::open_in_memory()?)?;
    treat(&f, &TaskSettings::default())?;
    let alerts = AlertSettings::default();
    let sweep = ComplianceSweep::new(&f.db, &alerts);

    // Meat window ends on day 6 at midnight; still restricted at that instant.
    assert_eq!(sweep.run(at(6, 0))?.animals_reset, 0);
    assert_eq!(
        f.db.get_animal(&f.animal.id)?.unwrap().status,
        AnimalStatus::Withdrawal
    );

    assert_eq!(sweep.run(at(6, 1))?.animals_reset, 1);
    assert_eq!(
        f.db.get_animal(&f.animal.id)?.unwrap().status,
        AnimalStatus::Active
    );
    Ok(())
}

#[test]
fn test_manual_resolution() -> Result<()> {
    let f = fixture(Database::open_in_memory()?)?;
    treat(&f, &TaskSettings::default())?;
    let alerts = AlertSettings::default();
    ComplianceSweep::new(&f.db, &alerts).run(at(3, 6))?;
    let alert = f
        .db
        .find_active_alert(&f.animal.id, &AlertType::MissedTask)?
        .unwrap();

    let stranger = CallerContext::new("someone-else", Role::Farmer);
    assert!(matches!(
        resolve_alert(&f.db, &stranger, &alert.id, at(3, 7)),
        Err(CoreError::Forbidden(_))
    ));

    let resolved = resolve_alert(&f.db, &f.farmer_ctx, &alert.id, at(3, 7))?;
    assert_eq!(resolved.resolved_at, Some(at(3, 7)));
    assert!(f.db.list_active_alerts_for_farm(&f.farm.id)?.is_empty());

    assert!(matches!(
        resolve_alert(&f.db, &f.farmer_ctx, &alert.id, at(3, 8)),
        Err(CoreError::InvalidState(_))
    ));
    Ok(())
}

#[test]
fn test_file_backed_database_persists() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("herdcare.db");

    let task_id = {
        let f = fixture(Database::open(&path)?)?;
        let tasks = treat(&f, &TaskSettings::default())?;
        TaskTracker::new(&f.db).complete_task(&f.farmer_ctx, &tasks[0].id, at(1, 9))?;
        tasks[0].id.clone()
    };

    let reopened = Database::open(&path)?;
    let task = reopened.get_task(&task_id)?.unwrap();
    assert!(task.is_completed);
    assert_eq!(task.completed_at, Some(at(1, 9)));
    Ok(())
}

#[test]
fn test_fixed_count_default_policy() {
    assert_eq!(TaskPolicy::default(), TaskPolicy::FixedCount { count: 3 });
}
