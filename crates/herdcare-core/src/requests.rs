//! Consultation, problem report and lab test workflows.
//!
//! Each operation loads the record, applies the model transition (which
//! rejects disallowed transitions), and saves it back.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::db::Database;
use crate::error::{CoreError, CoreResult};
use crate::models::{
    CallerContext, ConsultationRequest, Priority, ProblemReport, Role, Severity, TestingReport,
};

// =========================================================================
// Consultations
// =========================================================================

/// A farmer asks for a veterinary consultation.
pub fn request_consultation(
    db: &Database,
    ctx: &CallerContext,
    animal_id: Option<String>,
    symptoms: String,
    priority: Priority,
    now: DateTime<Utc>,
) -> CoreResult<ConsultationRequest> {
    ctx.require_any(&[Role::Farmer], "request consultations")?;

    let mut request = ConsultationRequest::request(ctx.user_id.clone(), symptoms, now);
    request.animal_id = animal_id;
    request.priority = priority;
    request.validate()?;

    db.save_consultation(&request)?;
    info!(consultation_id = %request.id, "Consultation requested");
    Ok(request)
}

/// A veterinarian books a visit for a farmer.
pub fn schedule_consultation(
    db: &Database,
    ctx: &CallerContext,
    farmer_id: String,
    symptoms: String,
    scheduled_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> CoreResult<ConsultationRequest> {
    ctx.require_any(&[Role::Veterinarian], "schedule consultations")?;

    let request =
        ConsultationRequest::schedule(farmer_id, ctx.user_id.clone(), symptoms, scheduled_at, now);
    request.validate()?;

    db.save_consultation(&request)?;
    info!(consultation_id = %request.id, "Consultation scheduled");
    Ok(request)
}

pub fn accept_consultation(
    db: &Database,
    ctx: &CallerContext,
    consultation_id: &str,
    now: DateTime<Utc>,
) -> CoreResult<ConsultationRequest> {
    ctx.require_any(&[Role::Veterinarian], "accept consultations")?;

    let mut request = load_consultation(db, consultation_id)?;
    request.accept(ctx.user_id.clone(), now)?;
    db.save_consultation(&request)?;
    Ok(request)
}

/// Close a consultation. The requesting farmer may attach a rating.
pub fn complete_consultation(
    db: &Database,
    ctx: &CallerContext,
    consultation_id: &str,
    rating: Option<u8>,
    feedback: Option<String>,
    now: DateTime<Utc>,
) -> CoreResult<ConsultationRequest> {
    let mut request = load_consultation(db, consultation_id)?;

    let is_party = request.farmer_id == ctx.user_id
        || request.vet_id.as_deref() == Some(ctx.user_id.as_str());
    if !is_party && !ctx.is_admin() {
        return Err(CoreError::Forbidden(format!(
            "{} is not a party to consultation {}",
            ctx.user_id, consultation_id
        )));
    }

    request.complete(rating, feedback, now)?;
    db.save_consultation(&request)?;
    Ok(request)
}

fn load_consultation(db: &Database, id: &str) -> CoreResult<ConsultationRequest> {
    db.get_consultation(id)?
        .ok_or_else(|| CoreError::not_found("consultation", id))
}

// =========================================================================
// Problem reports
// =========================================================================

#[allow(clippy::too_many_arguments)]
pub fn report_problem(
    db: &Database,
    ctx: &CallerContext,
    animal_id: Option<String>,
    problem_type: String,
    symptoms: String,
    severity: Severity,
    description: Option<String>,
    now: DateTime<Utc>,
) -> CoreResult<ProblemReport> {
    ctx.require_any(&[Role::Farmer], "report problems")?;

    let mut report = ProblemReport::new(ctx.user_id.clone(), problem_type, symptoms, severity, now);
    report.animal_id = animal_id;
    report.description = description;
    report.validate()?;

    db.save_problem_report(&report)?;
    info!(report_id = %report.id, severity = severity.as_str(), "Problem reported");
    Ok(report)
}

pub fn respond_to_problem(
    db: &Database,
    ctx: &CallerContext,
    report_id: &str,
    response: String,
    now: DateTime<Utc>,
) -> CoreResult<ProblemReport> {
    ctx.require_any(&[Role::Veterinarian], "respond to problem reports")?;

    let mut report = db
        .get_problem_report(report_id)?
        .ok_or_else(|| CoreError::not_found("problem report", report_id))?;
    report.respond(ctx.user_id.clone(), response, now)?;
    db.save_problem_report(&report)?;
    Ok(report)
}

// =========================================================================
// Lab tests
// =========================================================================

pub fn request_test(
    db: &Database,
    ctx: &CallerContext,
    animal_id: String,
    test_type: String,
    sample_type: String,
    priority: Priority,
    now: DateTime<Utc>,
) -> CoreResult<TestingReport> {
    ctx.require_any(&[Role::Veterinarian], "request lab tests")?;

    let mut report = TestingReport::new(animal_id, ctx.user_id.clone(), test_type, sample_type, now);
    report.priority = priority;
    report.validate()?;
    if db.get_animal(&report.animal_id)?.is_none() {
        return Err(CoreError::not_found("animal", report.animal_id.as_str()));
    }

    db.save_testing_report(&report)?;
    info!(report_id = %report.id, "Lab test requested");
    Ok(report)
}

pub fn receive_sample(
    db: &Database,
    ctx: &CallerContext,
    report_id: &str,
    now: DateTime<Utc>,
) -> CoreResult<TestingReport> {
    ctx.require_any(&[Role::Lab], "receive samples")?;

    let mut report = load_testing_report(db, report_id)?;
    report.mark_received(ctx.user_id.clone(), now)?;
    db.save_testing_report(&report)?;
    Ok(report)
}

pub fn complete_test(
    db: &Database,
    ctx: &CallerContext,
    report_id: &str,
    results: String,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> CoreResult<TestingReport> {
    ctx.require_any(&[Role::Lab], "complete lab tests")?;

    let mut report = load_testing_report(db, report_id)?;
    if report.lab_id.as_deref() != Some(ctx.user_id.as_str()) {
        return Err(CoreError::Forbidden(format!(
            "sample {} was received by another lab",
            report_id
        )));
    }
    report.complete(results, notes, now)?;
    db.save_testing_report(&report)?;
    Ok(report)
}

fn load_testing_report(db: &Database, id: &str) -> CoreResult<TestingReport> {
    db.get_testing_report(id)?
        .ok_or_else(|| CoreError::not_found("testing report", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Animal, ConsultationStatus, Farm, Profile, TestingStatus};
    use chrono::{Duration, TimeZone};

    struct Fixture {
        db: Database,
        farmer: CallerContext,
        vet: CallerContext,
        lab: CallerContext,
        animal: Animal,
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap()
    }

    fn setup() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let farmer = Profile::new("Asha".into(), "asha@example.com".into(), Role::Farmer);
        let vet = Profile::new("Dr. Rao".into(), "rao@example.com".into(), Role::Veterinarian);
        let lab = Profile::new("County Lab".into(), "lab@example.com".into(), Role::Lab);
        for p in [&farmer, &vet, &lab] {
            db.insert_profile(p).unwrap();
        }
        let farm = Farm::new(farmer.id.clone(), "Green Acres".into(), "Lane 1".into());
        db.insert_farm(&farm).unwrap();
        let animal = Animal::new(farm.id, "TAG-001".into(), "bovine".into());
        db.insert_animal(&animal).unwrap();

        Fixture {
            db,
            farmer: CallerContext::new(farmer.id, Role::Farmer),
            vet: CallerContext::new(vet.id, Role::Veterinarian),
            lab: CallerContext::new(lab.id, Role::Lab),
            animal,
        }
    }

    #[test]
    fn test_consultation_flow() {
        let f = setup();
        let request = request_consultation(
            &f.db,
            &f.farmer,
            Some(f.animal.id.clone()),
            "Limping on left hind".into(),
            Priority::High,
            now(),
        )
        .unwrap();

        let accepted = accept_consultation(&f.db, &f.vet, &request.id, now()).unwrap();
        assert_eq!(accepted.status, ConsultationStatus::Accepted);

        // Cannot accept twice
        assert!(matches!(
            accept_consultation(&f.db, &f.vet, &request.id, now()),
            Err(CoreError::InvalidState(_))
        ));

        let done = complete_consultation(&f.db, &f.farmer, &request.id, Some(4), None, now()).unwrap();
        assert_eq!(done.status, ConsultationStatus::Completed);
        assert_eq!(done.rating, Some(4));
    }

    #[test]
    fn test_scheduled_visit_needs_vet() {
        let f = setup();
        let result = schedule_consultation(
            &f.db,
            &f.farmer,
            f.farmer.user_id.clone(),
            "Herd check".into(),
            now() + Duration::days(2),
            now(),
        );
        assert!(matches!(result, Err(CoreError::Forbidden(_))));

        let visit = schedule_consultation(
            &f.db,
            &f.vet,
            f.farmer.user_id.clone(),
            "Herd check".into(),
            now() + Duration::days(2),
            now(),
        )
        .unwrap();
        assert_eq!(visit.status, ConsultationStatus::Scheduled);
    }

    #[test]
    fn test_problem_report_flow() {
        let f = setup();
        let report = report_problem(
            &f.db,
            &f.farmer,
            None,
            "digestive".into(),
            "Bloating".into(),
            Severity::High,
            None,
            now(),
        )
        .unwrap();

        let answered = respond_to_problem(&f.db, &f.vet, &report.id, "Withhold feed 12h".into(), now()).unwrap();
        assert_eq!(answered.vet_id.as_deref(), Some(f.vet.user_id.as_str()));
        assert!(matches!(
            respond_to_problem(&f.db, &f.vet, &report.id, "Again".into(), now()),
            Err(CoreError::InvalidState(_))
        ));
    }

    #[test]
    fn test_lab_flow() {
        let f = setup();
        let report = request_test(
            &f.db,
            &f.vet,
            f.animal.id.clone(),
            "Antibiotic residue".into(),
            "milk".into(),
            Priority::Urgent,
            now(),
        )
        .unwrap();

        // Cannot complete before receipt
        assert!(complete_test(&f.db, &f.lab, &report.id, "Negative".into(), None, now()).is_err());

        receive_sample(&f.db, &f.lab, &report.id, now()).unwrap();
        let done = complete_test(&f.db, &f.lab, &report.id, "Negative".into(), None, now() + Duration::hours(6)).unwrap();
        assert_eq!(done.status, TestingStatus::Completed);
    }

    #[test]
    fn test_lab_test_unknown_animal() {
        let f = setup();
        let result = request_test(&f.db, &f.vet, "ghost".into(), "CBC".into(), "blood".into(), Priority::Low, now());
        assert!(matches!(result, Err(CoreError::NotFound { .. })));
    }
}
