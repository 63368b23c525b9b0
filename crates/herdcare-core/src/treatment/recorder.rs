//! Treatment recording.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::compliance::{ComplianceStatus, WithdrawalWindow};
use crate::config::TaskSettings;
use crate::db::Database;
use crate::error::{CoreError, CoreResult};
use crate::herd::visible_animal;
use crate::models::{Animal, CallerContext, NewTreatment, Role, Task, Treatment};
use crate::tasks::generate_tasks;

/// Everything a successful recording wrote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordedTreatment {
    pub treatment: Treatment,
    /// The animal after its windows were overwritten
    pub animal: Animal,
    pub status: ComplianceStatus,
    pub tasks: Vec<Task>,
}

/// Records treatments and applies their withdrawal windows.
pub struct TreatmentRecorder<'a> {
    db: &'a Database,
    settings: &'a TaskSettings,
}

impl<'a> TreatmentRecorder<'a> {
    pub fn new(db: &'a Database, settings: &'a TaskSettings) -> Self {
        Self { db, settings }
    }

    /// Record a treatment given at `now` by the calling veterinarian.
    ///
    /// The treatment row, the animal's new windows and status, and the
    /// follow-up tasks are written in one transaction. New windows replace
    /// the previous ones even when they end sooner.
    pub fn record(
        &self,
        ctx: &CallerContext,
        mut input: NewTreatment,
        now: DateTime<Utc>,
    ) -> CoreResult<RecordedTreatment> {
        ctx.require_any(&[Role::Veterinarian], "record treatments")?;

        let missing = input.missing_fields();
        if !missing.is_empty() {
            return Err(CoreError::Validation(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )));
        }

        let medication = self.db.get_medication(&input.medication_id)?.ok_or_else(|| {
            CoreError::Validation(format!("unknown medication: {}", input.medication_id))
        })?;
        let window = WithdrawalWindow::from_treatment(&medication, now)?;
        let policy = input
            .task_policy
            .take()
            .unwrap_or_else(|| self.settings.policy.clone());

        let recorded = self.db.in_transaction(|db| {
            let mut animal = db
                .get_animal(&input.animal_id)?
                .ok_or_else(|| CoreError::not_found("animal", input.animal_id.as_str()))?;
            let farm = db
                .get_farm(&animal.farm_id)?
                .ok_or_else(|| CoreError::not_found("farm", animal.farm_id.as_str()))?;

            let treatment = input.into_treatment(ctx.user_id.clone(), now);
            animal.apply_window(window, treatment.created_at);
            let tasks = generate_tasks(
                &treatment,
                &medication.name,
                &farm.owner_id,
                &policy,
                self.settings,
            )?;

            db.insert_treatment(&treatment)?;
            db.update_withdrawal(&animal)?;
            db.insert_tasks(&tasks)?;

            Ok::<_, CoreError>(RecordedTreatment {
                status: window.evaluate(treatment.created_at),
                treatment,
                animal,
                tasks,
            })
        })?;

        info!(
            treatment_id = %recorded.treatment.id,
            animal_id = %recorded.animal.id,
            status = recorded.status.as_str(),
            tasks = recorded.tasks.len(),
            "Treatment recorded"
        );
        Ok(recorded)
    }

    /// Treatment history for an animal the caller may view, newest first.
    pub fn history(&self, ctx: &CallerContext, animal_id: &str) -> CoreResult<Vec<Treatment>> {
        let animal = visible_animal(self.db, ctx, animal_id)?;
        Ok(self.db.list_treatments_for_animal(&animal.id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnimalStatus, Farm, Medication, Profile};
    use crate::tasks::TaskPolicy;
    use chrono::{Duration, TimeZone};

    struct Fixture {
        db: Database,
        farmer: Profile,
        vet: CallerContext,
        animal: Animal,
        med: Medication,
    }

    fn setup() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let farmer = Profile::new("Asha".into(), "asha@example.com".into(), Role::Farmer);
        let vet = Profile::new("Dr. Rao".into(), "rao@example.com".into(), Role::Veterinarian);
        db.insert_profile(&farmer).unwrap();
        db.insert_profile(&vet).unwrap();
        let farm = Farm::new(farmer.id.clone(), "Green Acres".into(), "Lane 1".into());
        db.insert_farm(&farm).unwrap();
        let animal = Animal::new(farm.id, "TAG-001".into(), "bovine".into());
        db.insert_animal(&animal).unwrap();
        let med = Medication::new("Drug".into(), "x".into(), 48, 5);
        db.upsert_medication(&med).unwrap();

        Fixture {
            db,
            farmer,
            vet: CallerContext::new(vet.id, Role::Veterinarian),
            animal,
            med,
        }
    }

    fn input(f: &Fixture) -> NewTreatment {
        NewTreatment {
            animal_id: f.animal.id.clone(),
            medication_id: f.med.id.clone(),
            diagnosis: "Mastitis".into(),
            dosage: "10 mL".into(),
            ..Default::default()
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_record_sets_windows_and_tasks() {
        let f = setup();
        let settings = TaskSettings::default();
        let recorder = TreatmentRecorder::new(&f.db, &settings);

        let recorded = recorder.record(&f.vet, input(&f), t0()).unwrap();
        assert_eq!(recorded.status, ComplianceStatus::FullyRestricted);
        assert_eq!(recorded.tasks.len(), 3);
        assert!(recorded.tasks.iter().all(|t| t.farmer_id == f.farmer.id));

        let animal = f.db.get_animal(&f.animal.id).unwrap().unwrap();
        assert_eq!(animal.status, AnimalStatus::Withdrawal);
        assert_eq!(animal.withdrawal_until_milk, Some(t0() + Duration::hours(48)));
        assert_eq!(animal.withdrawal_until_meat, Some(t0() + Duration::days(5)));
        assert_eq!(f.db.list_tasks_for_treatment(&recorded.treatment.id).unwrap().len(), 3);
    }

    #[test]
    fn test_policy_override() {
        let f = setup();
        let settings = TaskSettings::default();
        let mut with_policy = input(&f);
        with_policy.task_policy = Some(TaskPolicy::FixedCount { count: 1 });

        let recorded = TreatmentRecorder::new(&f.db, &settings)
            .record(&f.vet, with_policy, t0())
            .unwrap();
        assert_eq!(recorded.tasks.len(), 1);
    }

    #[test]
    fn test_missing_fields_rejected_before_write() {
        let f = setup();
        let settings = TaskSettings::default();
        let mut bad = input(&f);
        bad.dosage = " ".into();

        let result = TreatmentRecorder::new(&f.db, &settings).record(&f.vet, bad, t0());
        assert!(matches!(result, Err(CoreError::Validation(msg)) if msg.contains("dosage")));
        assert!(f.db.list_treatments_for_animal(&f.animal.id).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_medication_is_validation() {
        let f = setup();
        let settings = TaskSettings::default();
        let mut bad = input(&f);
        bad.medication_id = "nope".into();

        let result = TreatmentRecorder::new(&f.db, &settings).record(&f.vet, bad, t0());
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_unknown_animal_is_not_found() {
        let f = setup();
        let settings = TaskSettings::default();
        let mut bad = input(&f);
        bad.animal_id = "ghost".into();

        let result = TreatmentRecorder::new(&f.db, &settings).record(&f.vet, bad, t0());
        assert!(matches!(result, Err(CoreError::NotFound { entity: "animal", .. })));
    }

    #[test]
    fn test_only_vets_record() {
        let f = setup();
        let settings = TaskSettings::default();
        let farmer = CallerContext::new(f.farmer.id.clone(), Role::Farmer);

        let result = TreatmentRecorder::new(&f.db, &settings).record(&farmer, input(&f), t0());
        assert!(matches!(result, Err(CoreError::Forbidden(_))));
    }

    #[test]
    fn test_invalid_policy_rolls_back() {
        let f = setup();
        let settings = TaskSettings::default();
        let mut bad = input(&f);
        bad.task_policy = Some(TaskPolicy::ExplicitDates {
            dates: vec![t0().date_naive() - Duration::days(1)],
        });

        let result = TreatmentRecorder::new(&f.db, &settings).record(&f.vet, bad, t0());
        assert!(matches!(result, Err(CoreError::Validation(_))));

        let animal = f.db.get_animal(&f.animal.id).unwrap().unwrap();
        assert_eq!(animal.status, AnimalStatus::Active);
        assert!(animal.withdrawal_until_milk.is_none());
        assert!(f.db.list_treatments_for_animal(&f.animal.id).unwrap().is_empty());
    }

    #[test]
    fn test_oversized_medication_rejected_before_write() {
        let f = setup();
        let settings = TaskSettings::default();
        let huge = Medication::new("Forever".into(), "x".into(), 0, u32::MAX);
        f.db.upsert_medication(&huge).unwrap();
        let mut bad = input(&f);
        bad.medication_id = huge.id;

        let result = TreatmentRecorder::new(&f.db, &settings).record(&f.vet, bad, t0());
        assert!(matches!(result, Err(CoreError::Validation(_))));

        let animal = f.db.get_animal(&f.animal.id).unwrap().unwrap();
        assert_eq!(animal.status, AnimalStatus::Active);
        assert!(animal.withdrawal_until_meat.is_none());
        assert!(f.db.list_treatments_for_animal(&f.animal.id).unwrap().is_empty());

        // The store is still usable afterwards.
        TreatmentRecorder::new(&f.db, &settings)
            .record(&f.vet, input(&f), t0())
            .unwrap();
    }

    #[test]
    fn test_zero_period_medication_restricts_only_at_treatment_instant() {
        let f = setup();
        let settings = TaskSettings::default();
        let vitamin = Medication::new("Vitamin B".into(), "cyanocobalamin".into(), 0, 0);
        f.db.upsert_medication(&vitamin).unwrap();
        let mut zero = input(&f);
        zero.medication_id = vitamin.id;

        let recorded = TreatmentRecorder::new(&f.db, &settings)
            .record(&f.vet, zero, t0())
            .unwrap();
        assert_eq!(recorded.status, ComplianceStatus::FullyRestricted);
        assert_eq!(recorded.animal.withdrawal_until_milk, Some(t0()));
        assert_eq!(recorded.animal.withdrawal_until_meat, Some(t0()));
        assert_eq!(recorded.animal.status, AnimalStatus::Withdrawal);
        assert!(recorded
            .animal
            .withdrawal_window()
            .evaluate(t0() + Duration::seconds(1))
            .is_safe());
    }

    #[test]
    fn test_history_requires_known_animal() {
        let f = setup();
        let settings = TaskSettings::default();
        let recorder = TreatmentRecorder::new(&f.db, &settings);
        recorder.record(&f.vet, input(&f), t0()).unwrap();

        assert_eq!(recorder.history(&f.vet, &f.animal.id).unwrap().len(), 1);
        assert!(matches!(recorder.history(&f.vet, "ghost"), Err(CoreError::NotFound { .. })));

        let owner = CallerContext::new(f.farmer.id.clone(), Role::Farmer);
        assert_eq!(recorder.history(&owner, &f.animal.id).unwrap().len(), 1);
        let stranger = CallerContext::new("stranger", Role::Farmer);
        assert!(matches!(
            recorder.history(&stranger, &f.animal.id),
            Err(CoreError::Forbidden(_))
        ));
    }
}
