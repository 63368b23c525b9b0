//! Withdrawal window and compliance scenarios, end to end through the store.

use chrono::{DateTime, Duration, TimeZone, Utc};
use herdcare_core::compliance::{
    compliance_rate, evaluate, farm_compliance, ComplianceStatus, ComplianceSweep,
};
use herdcare_core::config::{AlertSettings, TaskSettings};
use herdcare_core::db::Database;
use herdcare_core::error::CoreError;
use herdcare_core::models::{
    Animal, AnimalStatus, CallerContext, Farm, Medication, NewTreatment, Profile, Role,
};
use herdcare_core::treatment::TreatmentRecorder;

struct Herd {
    db: Database,
    farmer: CallerContext,
    vet: CallerContext,
    farm: Farm,
    animal: Animal,
}

fn herd() -> Herd {
    let db = Database::open_in_memory().unwrap();
    let farmer = Profile::new("Asha".into(), "asha@example.com".into(), Role::Farmer);
    let vet = Profile::new("Dr. Rao".into(), "rao@example.com".into(), Role::Veterinarian);
    db.insert_profile(&farmer).unwrap();
    db.insert_profile(&vet).unwrap();

    let farm = Farm::new(farmer.id.clone(), "Green Acres".into(), "Lane 1".into());
    db.insert_farm(&farm).unwrap();
    let animal = Animal::new(farm.id.clone(), "TAG-001".into(), "bovine".into());
    db.insert_animal(&animal).unwrap();

    Herd {
        db,
        farmer: CallerContext::new(farmer.id, Role::Farmer),
        vet: CallerContext::new(vet.id, Role::Veterinarian),
        farm,
        animal,
    }
}

fn medication(db: &Database, milk_hours: u32, meat_days: u32) -> Medication {
    let med = Medication::new(
        format!("Drug {}h/{}d", milk_hours, meat_days),
        "test ingredient".into(),
        milk_hours,
        meat_days,
    );
    db.upsert_medication(&med).unwrap();
    med
}

fn treat(h: &Herd, med: &Medication, at: DateTime<Utc>) {
    let settings = TaskSettings::default();
    TreatmentRecorder::new(&h.db, &settings)
        .record(
            &h.vet,
            NewTreatment {
                animal_id: h.animal.id.clone(),
                medication_id: med.id.clone(),
                diagnosis: "Mastitis".into(),
                dosage: "10 mL".into(),
                ..Default::default()
            },
            at,
        )
        .unwrap();
}

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
}

#[test]
fn test_48h_5d_scenario() {
    let h = herd();
    let med = medication(&h.db, 48, 5);
    treat(&h, &med, day(1));

    let animal = h.db.get_animal(&h.animal.id).unwrap().unwrap();
    assert_eq!(animal.withdrawal_until_milk, Some(day(3)));
    assert_eq!(animal.withdrawal_until_meat, Some(day(6)));
    assert_eq!(animal.status, AnimalStatus::Withdrawal);

    let window = animal.withdrawal_window();
    assert_eq!(window.evaluate(day(2)), ComplianceStatus::FullyRestricted);
    assert_eq!(window.evaluate(day(7)), ComplianceStatus::Safe);
}

#[test]
fn test_window_end_is_still_restricted() {
    let h = herd();
    let med = medication(&h.db, 48, 5);
    treat(&h, &med, day(1));
    let window = h.db.get_animal(&h.animal.id).unwrap().unwrap().withdrawal_window();

    // Milk ends exactly at day 3: restricted at that instant, safe just after.
    assert_eq!(window.evaluate(day(3)), ComplianceStatus::FullyRestricted);
    assert_eq!(
        window.evaluate(day(3) + Duration::seconds(1)),
        ComplianceStatus::MeatRestricted
    );
    assert_eq!(window.evaluate(day(6)), ComplianceStatus::MeatRestricted);
    assert_eq!(window.evaluate(day(6) + Duration::seconds(1)), ComplianceStatus::Safe);
}

#[test]
fn test_later_treatment_overwrites_window() {
    let h = herd();
    let long = medication(&h.db, 0, 5);
    let short = medication(&h.db, 0, 1);

    treat(&h, &long, day(1));
    treat(&h, &short, day(2));

    // T2's one-day window replaces T1's longer one.
    let animal = h.db.get_animal(&h.animal.id).unwrap().unwrap();
    assert_eq!(animal.withdrawal_until_meat, Some(day(3)));
    assert_eq!(
        animal.withdrawal_window().evaluate(day(4)),
        ComplianceStatus::Safe
    );
    assert_eq!(h.db.list_treatments_for_animal(&h.animal.id).unwrap().len(), 2);
}

#[test]
fn test_window_starts_at_treatment_time() {
    let h = herd();
    let med = medication(&h.db, 72, 14);
    let at = Utc.with_ymd_and_hms(2024, 3, 10, 15, 45, 30).unwrap();
    treat(&h, &med, at);

    let animal = h.db.get_animal(&h.animal.id).unwrap().unwrap();
    assert_eq!(animal.withdrawal_until_milk, Some(at + Duration::hours(72)));
    assert_eq!(animal.withdrawal_until_meat, Some(at + Duration::days(14)));
}

#[test]
fn test_zero_period_medication_then_sweep() {
    let h = herd();
    let med = medication(&h.db, 0, 0);
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    treat(&h, &med, at);

    // Restricted at exactly T, safe immediately after.
    let animal = h.db.get_animal(&h.animal.id).unwrap().unwrap();
    assert_eq!(animal.withdrawal_until_milk, Some(at));
    assert_eq!(animal.withdrawal_until_meat, Some(at));
    assert_eq!(animal.status, AnimalStatus::Withdrawal);
    assert_eq!(animal.withdrawal_window().evaluate(at), ComplianceStatus::FullyRestricted);

    let alerts = AlertSettings::default();
    let sweep = ComplianceSweep::new(&h.db, &alerts);
    assert_eq!(sweep.run(at).unwrap().animals_reset, 0);

    let report = sweep.run(at + Duration::seconds(1)).unwrap();
    assert_eq!(report.animals_reset, 1);
    assert_eq!(report.alerts_raised, 0);
    let animal = h.db.get_animal(&h.animal.id).unwrap().unwrap();
    assert_eq!(animal.status, AnimalStatus::Active);
    assert_eq!(animal.withdrawal_window().evaluate(at + Duration::seconds(1)), ComplianceStatus::Safe);
}

#[test]
fn test_oversized_medication_is_rejected() {
    let h = herd();
    let med = medication(&h.db, u32::MAX, u32::MAX);
    let result = TreatmentRecorder::new(&h.db, &TaskSettings::default()).record(
        &h.vet,
        NewTreatment {
            animal_id: h.animal.id.clone(),
            medication_id: med.id,
            diagnosis: "Mastitis".into(),
            dosage: "10 mL".into(),
            ..Default::default()
        },
        day(1),
    );
    assert!(matches!(result, Err(CoreError::Validation(_))));
    assert!(h.db.list_treatments_for_animal(&h.animal.id).unwrap().is_empty());
}

#[test]
fn test_farm_compliance_rate() {
    let h = herd();
    let mut other = Animal::new(h.farm.id.clone(), "TAG-002".into(), "bovine".into());
    other.name = Some("Bella".into());
    h.db.insert_animal(&other).unwrap();

    let summary = farm_compliance(&h.db, &h.farmer, &h.farm.id, day(1)).unwrap().summary;
    assert_eq!(summary.compliance_rate_rounded(), 100);

    let med = medication(&h.db, 48, 5);
    treat(&h, &med, day(1));

    let summary = farm_compliance(&h.db, &h.farmer, &h.farm.id, day(2)).unwrap().summary;
    assert_eq!(summary.total_animals, 2);
    assert_eq!(summary.compliant, 1);
    assert_eq!(summary.fully_restricted, 1);
    assert_eq!(summary.compliance_rate_rounded(), 50);

    // Evaluated at read time, independent of the persisted status.
    let summary = farm_compliance(&h.db, &h.farmer, &h.farm.id, day(7)).unwrap().summary;
    assert_eq!(summary.compliant, 2);
}

#[test]
fn test_compliance_rate_edges() {
    assert_eq!(compliance_rate(0, 0), 100.0);
    assert_eq!(compliance_rate(4, 4), 100.0);
    assert_eq!(compliance_rate(0, 4), 0.0);
}

#[test]
fn test_null_windows_are_safe() {
    assert_eq!(evaluate(None, None, day(1)), ComplianceStatus::Safe);
    assert_eq!(
        evaluate(Some(day(1)), None, day(1)),
        ComplianceStatus::MilkRestricted
    );
}
