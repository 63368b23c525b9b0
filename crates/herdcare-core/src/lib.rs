//! HerdCare Core Library
//!
//! Livestock treatment records, withdrawal-period compliance and follow-up
//! care tasks for farmers, veterinarians, labs and administrators.
//!
//! # Architecture
//!
//! ```text
//! Vet records treatment ──► TreatmentRecorder ──────────────┐
//!                               │  (one transaction)        │
//!                               ├─ insert treatment         │
//!                               ├─ overwrite animal windows │
//!                               └─ insert follow-up tasks   │
//!                                                           ▼
//! Farmer completes task ──► TaskTracker ──► reward points   Store
//!                                                           │
//! Scheduled sweep ──► ComplianceSweep ──► alerts ───────────┤
//!                                                           ▼
//!                         Read model ──► Evaluator ──► Aggregator ──► Dashboards
//!                                                                └──► Report export
//! ```
//!
//! # Core Principle
//!
//! **A withdrawal window that ends exactly now is still restricted.** Milk
//! or meat becomes safe only strictly after the window end.
//!
//! # Modules
//!
//! - [`db`]: SQLite store and the compliance read model
//! - [`accounts`]: Profile lookup and veterinarian verification
//! - [`models`]: Domain types (Animal, Medication, Treatment, Task, etc.)
//! - [`compliance`]: Evaluator, aggregator, sweep and dashboards
//! - [`treatment`]: Treatment recording
//! - [`tasks`]: Task generation policies and completion tracking
//! - [`herd`]: Animal and medication registration
//! - [`requests`]: Consultations, problem reports and lab tests
//! - [`export`]: Farm compliance report export
//! - [`config`]: Application settings

pub mod accounts;
pub mod compliance;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod herd;
pub mod models;
pub mod requests;
pub mod tasks;
pub mod treatment;

// Re-export commonly used types
pub use compliance::{ComplianceStatus, ComplianceSummary, ComplianceSweep, WithdrawalWindow};
pub use crate::config::Settings;
pub use db::Database;
pub use error::{CoreError, CoreResult};
pub use models::{
    Animal, AnimalStatus, CallerContext, ComplianceAlert, Medication, NewTreatment, Role, Task,
    Treatment,
};
pub use tasks::{TaskPolicy, TaskTracker};
pub use treatment::TreatmentRecorder;

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum HerdCareError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Dependency failure: {0}")]
    Dependency(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<CoreError> for HerdCareError {
    fn from(e: CoreError) -> Self {
        let message = e.to_string();
        match e {
            CoreError::Validation(_) => HerdCareError::Validation(message),
            CoreError::NotFound { .. } => HerdCareError::NotFound(message),
            CoreError::InvalidState(_) => HerdCareError::InvalidState(message),
            CoreError::Forbidden(_) => HerdCareError::Forbidden(message),
            CoreError::Dependency(_) => HerdCareError::Dependency(message),
        }
    }
}

impl From<db::DbError> for HerdCareError {
    fn from(e: db::DbError) -> Self {
        CoreError::from(e).into()
    }
}

impl From<::config::ConfigError> for HerdCareError {
    fn from(e: ::config::ConfigError) -> Self {
        HerdCareError::Config(e.to_string())
    }
}

impl From<serde_json::Error> for HerdCareError {
    fn from(e: serde_json::Error) -> Self {
        HerdCareError::Serialization(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for HerdCareError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        HerdCareError::Dependency(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Install a `tracing` subscriber writing to stderr.
///
/// `filter` uses `EnvFilter` syntax; `RUST_LOG` wins when set. Calling this
/// more than once is a no-op.
#[uniffi::export]
pub fn init_logging(filter: Option<String>) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let default = filter.unwrap_or_else(|| "herdcare_core=info".into());
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Open or create a database at the given path.
///
/// Settings come from the optional TOML file plus `HERDCARE__*` variables.
#[uniffi::export]
pub fn open_database(
    path: String,
    config_path: Option<String>,
) -> Result<Arc<HerdCareCore>, HerdCareError> {
    let settings = Settings::load(config_path.as_deref().map(Path::new))?;
    let db = Database::open(&path)?;
    tracing::info!(path = %path, "Database opened");
    Ok(Arc::new(HerdCareCore {
        db: Arc::new(Mutex::new(db)),
        settings,
    }))
}

/// Create an in-memory database with default settings (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<HerdCareCore>, HerdCareError> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(HerdCareCore {
        db: Arc::new(Mutex::new(db)),
        settings: Settings::default(),
    }))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
///
/// Every call evaluates against the wall clock at the time of the call.
#[derive(uniffi::Object)]
pub struct HerdCareCore {
    db: Arc<Mutex<Database>>,
    settings: Settings,
}

#[uniffi::export]
impl HerdCareCore {
    // =========================================================================
    // Profiles and farms
    // =========================================================================

    /// Create a user profile. Identity itself is managed by the auth layer.
    pub fn create_profile(
        &self,
        full_name: String,
        email: String,
        role: String,
    ) -> Result<FfiProfile, HerdCareError> {
        let role = parse_role(&role)?;
        let db = self.db.lock()?;
        let profile = models::Profile::new(full_name, email, role);
        db.insert_profile(&profile)?;
        Ok(profile.into())
    }

    /// A profile, visible to its owner and to admins.
    pub fn get_profile(
        &self,
        caller: FfiCaller,
        user_id: String,
    ) -> Result<Option<FfiProfile>, HerdCareError> {
        let ctx = CallerContext::try_from(caller)?;
        let db = self.db.lock()?;
        Ok(accounts::get_profile(&db, &ctx, &user_id)?.map(|p| p.into()))
    }

    /// Every user, newest first. Admins only.
    pub fn list_users(&self, caller: FfiCaller) -> Result<Vec<FfiProfile>, HerdCareError> {
        let ctx = CallerContext::try_from(caller)?;
        let db = self.db.lock()?;
        Ok(accounts::list_users(&db, &ctx)?
            .into_iter()
            .map(|p| p.into())
            .collect())
    }

    /// Grant or revoke a veterinarian's verification. Admins only.
    pub fn verify_veterinarian(
        &self,
        caller: FfiCaller,
        user_id: String,
        verified: bool,
    ) -> Result<FfiProfile, HerdCareError> {
        let ctx = CallerContext::try_from(caller)?;
        let db = self.db.lock()?;
        Ok(accounts::verify_veterinarian(&db, &ctx, &user_id, verified)?.into())
    }

    /// Create a farm owned by the calling farmer.
    pub fn create_farm(
        &self,
        caller: FfiCaller,
        farm_name: String,
        address: String,
        registration_number: Option<String>,
    ) -> Result<FfiFarm, HerdCareError> {
        let ctx = CallerContext::try_from(caller)?;
        ctx.require_any(&[Role::Farmer, Role::Admin], "create farms")?;
        if farm_name.trim().is_empty() {
            return Err(HerdCareError::Validation("farm name is required".into()));
        }

        let db = self.db.lock()?;
        let mut farm = models::Farm::new(ctx.user_id, farm_name.trim().to_string(), address);
        farm.registration_number = registration_number;
        db.insert_farm(&farm)?;
        Ok(farm.into())
    }

    // =========================================================================
    // Medication registry
    // =========================================================================

    pub fn register_medication(
        &self,
        caller: FfiCaller,
        medication: FfiMedication,
    ) -> Result<FfiMedication, HerdCareError> {
        let ctx = CallerContext::try_from(caller)?;
        let db = self.db.lock()?;
        let saved = herd::register_medication(&db, &ctx, medication.into())?;
        Ok(saved.into())
    }

    pub fn get_medication(&self, id: String) -> Result<Option<FfiMedication>, HerdCareError> {
        let db = self.db.lock()?;
        Ok(db.get_medication(&id)?.map(|m| m.into()))
    }

    /// All medications ordered by name.
    pub fn list_medications(&self) -> Result<Vec<FfiMedication>, HerdCareError> {
        let db = self.db.lock()?;
        Ok(db.list_medications()?.into_iter().map(|m| m.into()).collect())
    }

    /// Search medications by name or active ingredient.
    pub fn search_medications(
        &self,
        query: String,
        limit: u32,
    ) -> Result<Vec<FfiMedication>, HerdCareError> {
        let db = self.db.lock()?;
        let meds = db.search_medications(&query, limit as usize)?;
        Ok(meds.into_iter().map(|m| m.into()).collect())
    }

    // =========================================================================
    // Animals
    // =========================================================================

    pub fn register_animal(
        &self,
        caller: FfiCaller,
        animal: FfiNewAnimal,
    ) -> Result<FfiAnimal, HerdCareError> {
        let ctx = CallerContext::try_from(caller)?;
        let input = herd::NewAnimal::try_from(animal)?;
        let db = self.db.lock()?;
        let animal = herd::register_animal(&db, &ctx, input, Utc::now())?;
        Ok(FfiAnimal::at(animal, Utc::now()))
    }

    pub fn get_animal(
        &self,
        caller: FfiCaller,
        animal_id: String,
    ) -> Result<Option<FfiAnimal>, HerdCareError> {
        let ctx = CallerContext::try_from(caller)?;
        let db = self.db.lock()?;
        let now = Utc::now();
        Ok(herd::get_animal(&db, &ctx, &animal_id)?.map(|a| FfiAnimal::at(a, now)))
    }

    pub fn list_farm_animals(
        &self,
        caller: FfiCaller,
        farm_id: String,
    ) -> Result<Vec<FfiAnimal>, HerdCareError> {
        let ctx = CallerContext::try_from(caller)?;
        let db = self.db.lock()?;
        let now = Utc::now();
        let animals = herd::list_farm_animals(&db, &ctx, &farm_id)?;
        Ok(animals.into_iter().map(|a| FfiAnimal::at(a, now)).collect())
    }

    // =========================================================================
    // Treatments
    // =========================================================================

    /// Record a treatment by the calling veterinarian.
    pub fn record_treatment(
        &self,
        caller: FfiCaller,
        treatment: FfiNewTreatment,
    ) -> Result<FfiRecordedTreatment, HerdCareError> {
        let ctx = CallerContext::try_from(caller)?;
        let input = NewTreatment::try_from(treatment)?;
        let db = self.db.lock()?;
        let recorder = TreatmentRecorder::new(&db, &self.settings.tasks);
        let recorded = recorder.record(&ctx, input, Utc::now())?;
        Ok(recorded.into())
    }

    /// Treatment history for an animal, newest first.
    pub fn treatment_history(
        &self,
        caller: FfiCaller,
        animal_id: String,
    ) -> Result<Vec<FfiTreatment>, HerdCareError> {
        let ctx = CallerContext::try_from(caller)?;
        let db = self.db.lock()?;
        let recorder = TreatmentRecorder::new(&db, &self.settings.tasks);
        Ok(recorder
            .history(&ctx, &animal_id)?
            .into_iter()
            .map(|t| t.into())
            .collect())
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    /// Complete a task and credit its points.
    pub fn complete_task(
        &self,
        caller: FfiCaller,
        task_id: String,
    ) -> Result<FfiTaskCompletion, HerdCareError> {
        let ctx = CallerContext::try_from(caller)?;
        let db = self.db.lock()?;
        let now = Utc::now();
        let completion = TaskTracker::new(&db).complete_task(&ctx, &task_id, now)?;
        Ok(FfiTaskCompletion {
            task: FfiTask::on(completion.task, None, now),
            points_credited: completion.points_credited,
            reward_balance: completion.reward_balance,
            warning: completion.warning,
        })
    }

    /// The farmer's task list over the configured look-back window.
    pub fn farmer_tasks(
        &self,
        caller: FfiCaller,
        farmer_id: String,
    ) -> Result<Vec<FfiTask>, HerdCareError> {
        let ctx = CallerContext::try_from(caller)?;
        let db = self.db.lock()?;
        let now = Utc::now();
        let views = TaskTracker::new(&db).tasks_for_farmer(
            &ctx,
            &farmer_id,
            self.settings.tasks.lookback_days,
            now,
        )?;
        Ok(views
            .into_iter()
            .map(|v| FfiTask::on(v.task, Some((v.animal_tag_id, v.animal_name)), now))
            .collect())
    }

    // =========================================================================
    // Compliance
    // =========================================================================

    /// Run the periodic compliance sweep. Admins only.
    pub fn run_compliance_sweep(&self, caller: FfiCaller) -> Result<FfiSweepReport, HerdCareError> {
        let ctx = CallerContext::try_from(caller)?;
        ctx.require_any(&[Role::Admin], "run the compliance sweep")?;
        let db = self.db.lock()?;
        let report = ComplianceSweep::new(&db, &self.settings.alerts).run(Utc::now())?;
        Ok(FfiSweepReport {
            animals_reset: report.animals_reset,
            alerts_raised: report.alerts_raised,
            alerts_updated: report.alerts_updated,
            alerts_resolved: report.alerts_resolved,
        })
    }

    pub fn resolve_alert(
        &self,
        caller: FfiCaller,
        alert_id: String,
    ) -> Result<FfiAlert, HerdCareError> {
        let ctx = CallerContext::try_from(caller)?;
        let db = self.db.lock()?;
        let alert = compliance::resolve_alert(&db, &ctx, &alert_id, Utc::now())?;
        Ok(alert.into())
    }

    pub fn farm_compliance(
        &self,
        caller: FfiCaller,
        farm_id: String,
    ) -> Result<FfiFarmCompliance, HerdCareError> {
        let ctx = CallerContext::try_from(caller)?;
        let db = self.db.lock()?;
        let now = Utc::now();
        let result = compliance::farm_compliance(&db, &ctx, &farm_id, now)?;
        Ok(FfiFarmCompliance {
            farm: result.snapshot.farm.into(),
            summary: result.summary.into(),
            animals: result
                .snapshot
                .animals
                .into_iter()
                .map(|a| FfiAnimal::at(a, now))
                .collect(),
            active_alerts: result
                .snapshot
                .active_alerts
                .into_iter()
                .map(|a| a.into())
                .collect(),
        })
    }

    pub fn farmer_dashboard(
        &self,
        caller: FfiCaller,
        farmer_id: String,
    ) -> Result<FfiFarmerDashboard, HerdCareError> {
        let ctx = CallerContext::try_from(caller)?;
        let db = self.db.lock()?;
        let now = Utc::now();
        let dash = compliance::farmer_dashboard(
            &db,
            &ctx,
            &farmer_id,
            self.settings.tasks.lookback_days,
            now,
        )?;
        Ok(FfiFarmerDashboard {
            farmer_id: dash.farmer_id,
            reward_points: dash.reward_points,
            summary: dash.summary.into(),
            active_alerts: dash.active_alerts.into_iter().map(|a| a.into()).collect(),
            tasks: dash
                .tasks
                .into_iter()
                .map(|t| FfiTask::on(t.view.task, Some((t.view.animal_tag_id, t.view.animal_name)), now))
                .collect(),
            due_today: dash.due_today,
            overdue: dash.overdue,
        })
    }

    pub fn admin_overview(&self, caller: FfiCaller) -> Result<FfiAdminOverview, HerdCareError> {
        let ctx = CallerContext::try_from(caller)?;
        let db = self.db.lock()?;
        let overview = compliance::admin_overview(&db, &ctx, Utc::now())?;
        Ok(FfiAdminOverview {
            users_by_role: overview
                .users_by_role
                .into_iter()
                .map(|(role, count)| FfiRoleCount {
                    role: role.as_str().to_string(),
                    count,
                })
                .collect(),
            total_users: overview.total_users,
            summary: overview.summary.into(),
            active_alerts: overview.active_alerts.into_iter().map(|a| a.into()).collect(),
        })
    }

    pub fn vet_overview(&self, caller: FfiCaller) -> Result<FfiVetOverview, HerdCareError> {
        let ctx = CallerContext::try_from(caller)?;
        let db = self.db.lock()?;
        let overview = compliance::vet_overview(&db, &ctx)?;
        Ok(FfiVetOverview {
            high_risk_animals: overview.high_risk_animals,
            pending_consultations: overview.pending_consultations,
            pending_problem_reports: overview.pending_problem_reports,
            open_lab_tests: overview.open_lab_tests,
        })
    }

    // =========================================================================
    // Consultations, problem reports and lab tests
    // =========================================================================

    pub fn request_consultation(
        &self,
        caller: FfiCaller,
        animal_id: Option<String>,
        symptoms: String,
        priority: String,
    ) -> Result<FfiConsultation, HerdCareError> {
        let ctx = CallerContext::try_from(caller)?;
        let priority = parse_priority(&priority)?;
        let db = self.db.lock()?;
        let request =
            requests::request_consultation(&db, &ctx, animal_id, symptoms, priority, Utc::now())?;
        Ok(request.into())
    }

    pub fn schedule_consultation(
        &self,
        caller: FfiCaller,
        farmer_id: String,
        symptoms: String,
        scheduled_at: String,
    ) -> Result<FfiConsultation, HerdCareError> {
        let ctx = CallerContext::try_from(caller)?;
        let scheduled_at = parse_timestamp(&scheduled_at)?;
        let db = self.db.lock()?;
        let request = requests::schedule_consultation(
            &db,
            &ctx,
            farmer_id,
            symptoms,
            scheduled_at,
            Utc::now(),
        )?;
        Ok(request.into())
    }

    pub fn accept_consultation(
        &self,
        caller: FfiCaller,
        consultation_id: String,
    ) -> Result<FfiConsultation, HerdCareError> {
        let ctx = CallerContext::try_from(caller)?;
        let db = self.db.lock()?;
        Ok(requests::accept_consultation(&db, &ctx, &consultation_id, Utc::now())?.into())
    }

    pub fn complete_consultation(
        &self,
        caller: FfiCaller,
        consultation_id: String,
        rating: Option<u8>,
        feedback: Option<String>,
    ) -> Result<FfiConsultation, HerdCareError> {
        let ctx = CallerContext::try_from(caller)?;
        let db = self.db.lock()?;
        let request = requests::complete_consultation(
            &db,
            &ctx,
            &consultation_id,
            rating,
            feedback,
            Utc::now(),
        )?;
        Ok(request.into())
    }

    pub fn report_problem(
        &self,
        caller: FfiCaller,
        animal_id: Option<String>,
        problem_type: String,
        symptoms: String,
        severity: String,
        description: Option<String>,
    ) -> Result<FfiProblemReport, HerdCareError> {
        let ctx = CallerContext::try_from(caller)?;
        let severity = models::Severity::parse(&severity)
            .ok_or_else(|| HerdCareError::Validation(format!("unknown severity: {}", severity)))?;
        let db = self.db.lock()?;
        let report = requests::report_problem(
            &db,
            &ctx,
            animal_id,
            problem_type,
            symptoms,
            severity,
            description,
            Utc::now(),
        )?;
        Ok(report.into())
    }

    pub fn respond_to_problem(
        &self,
        caller: FfiCaller,
        report_id: String,
        response: String,
    ) -> Result<FfiProblemReport, HerdCareError> {
        let ctx = CallerContext::try_from(caller)?;
        let db = self.db.lock()?;
        Ok(requests::respond_to_problem(&db, &ctx, &report_id, response, Utc::now())?.into())
    }

    pub fn request_lab_test(
        &self,
        caller: FfiCaller,
        animal_id: String,
        test_type: String,
        sample_type: String,
        priority: String,
    ) -> Result<FfiTestingReport, HerdCareError> {
        let ctx = CallerContext::try_from(caller)?;
        let priority = parse_priority(&priority)?;
        let db = self.db.lock()?;
        let report = requests::request_test(
            &db,
            &ctx,
            animal_id,
            test_type,
            sample_type,
            priority,
            Utc::now(),
        )?;
        Ok(report.into())
    }

    pub fn receive_lab_sample(
        &self,
        caller: FfiCaller,
        report_id: String,
    ) -> Result<FfiTestingReport, HerdCareError> {
        let ctx = CallerContext::try_from(caller)?;
        let db = self.db.lock()?;
        Ok(requests::receive_sample(&db, &ctx, &report_id, Utc::now())?.into())
    }

    pub fn complete_lab_test(
        &self,
        caller: FfiCaller,
        report_id: String,
        results: String,
        notes: Option<String>,
    ) -> Result<FfiTestingReport, HerdCareError> {
        let ctx = CallerContext::try_from(caller)?;
        let db = self.db.lock()?;
        Ok(requests::complete_test(&db, &ctx, &report_id, results, notes, Utc::now())?.into())
    }

    // =========================================================================
    // Export Operations
    // =========================================================================

    /// Export a farm's compliance report as JSON.
    pub fn export_farm_report_json(
        &self,
        caller: FfiCaller,
        farm_id: String,
    ) -> Result<String, HerdCareError> {
        let ctx = CallerContext::try_from(caller)?;
        let db = self.db.lock()?;
        let report = export::ReportExporter::new(&db).farm_report(&ctx, &farm_id, Utc::now())?;
        Ok(report.to_json()?)
    }

    /// Export a farm's compliance report as CSV.
    pub fn export_farm_report_csv(
        &self,
        caller: FfiCaller,
        farm_id: String,
    ) -> Result<String, HerdCareError> {
        let ctx = CallerContext::try_from(caller)?;
        let db = self.db.lock()?;
        let report = export::ReportExporter::new(&db).farm_report(&ctx, &farm_id, Utc::now())?;
        Ok(report.to_csv())
    }
}

// =========================================================================
// Parsing helpers
// =========================================================================

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, HerdCareError> {
    DateTime::parse_from_rfc3339(s)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| HerdCareError::Validation(format!("invalid timestamp {}: {}", s, e)))
}

fn parse_role(s: &str) -> Result<Role, HerdCareError> {
    Role::parse(s).ok_or_else(|| HerdCareError::Validation(format!("unknown role: {}", s)))
}

fn parse_priority(s: &str) -> Result<models::Priority, HerdCareError> {
    models::Priority::parse(s)
        .ok_or_else(|| HerdCareError::Validation(format!("unknown priority: {}", s)))
}

// =========================================================================
// FFI Types
// =========================================================================

/// Caller identity as supplied by the auth layer.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCaller {
    pub user_id: String,
    /// farmer, veterinarian, admin or lab
    pub role: String,
}

impl TryFrom<FfiCaller> for CallerContext {
    type Error = HerdCareError;

    fn try_from(caller: FfiCaller) -> Result<Self, Self::Error> {
        Ok(CallerContext::new(caller.user_id, parse_role(&caller.role)?))
    }
}

/// FFI-safe profile.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiProfile {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub reward_points: i64,
    pub is_vet_verified: bool,
}

impl From<models::Profile> for FfiProfile {
    fn from(profile: models::Profile) -> Self {
        Self {
            id: profile.id,
            full_name: profile.full_name,
            email: profile.email,
            role: profile.role.as_str().to_string(),
            reward_points: profile.reward_points,
            is_vet_verified: profile.is_vet_verified,
        }
    }
}

/// FFI-safe farm.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiFarm {
    pub id: String,
    pub owner_id: String,
    pub farm_name: String,
    pub address: String,
    pub registration_number: Option<String>,
}

impl From<models::Farm> for FfiFarm {
    fn from(farm: models::Farm) -> Self {
        Self {
            id: farm.id,
            owner_id: farm.owner_id,
            farm_name: farm.farm_name,
            address: farm.address,
            registration_number: farm.registration_number,
        }
    }
}

/// FFI-safe medication. An empty `id` gets a fresh one on registration.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedication {
    pub id: String,
    pub name: String,
    pub active_ingredient: String,
    pub withdrawal_period_milk_hours: u32,
    pub withdrawal_period_meat_days: u32,
    pub dosage_instructions: Option<String>,
}

impl From<Medication> for FfiMedication {
    fn from(med: Medication) -> Self {
        Self {
            id: med.id,
            name: med.name,
            active_ingredient: med.active_ingredient,
            withdrawal_period_milk_hours: med.withdrawal_period_milk_hours,
            withdrawal_period_meat_days: med.withdrawal_period_meat_days,
            dosage_instructions: med.dosage_instructions,
        }
    }
}

impl From<FfiMedication> for Medication {
    fn from(med: FfiMedication) -> Self {
        let mut medication = Medication::new(
            med.name,
            med.active_ingredient,
            med.withdrawal_period_milk_hours,
            med.withdrawal_period_meat_days,
        );
        if !med.id.is_empty() {
            medication.id = med.id;
        }
        medication.dosage_instructions = med.dosage_instructions;
        medication
    }
}

/// Animal registration form.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewAnimal {
    pub farm_id: String,
    pub tag_id: String,
    pub species: String,
    pub breed: Option<String>,
    pub name: Option<String>,
    pub gender: Option<String>,
    /// YYYY-MM-DD
    pub birth_date: Option<String>,
}

impl TryFrom<FfiNewAnimal> for herd::NewAnimal {
    type Error = HerdCareError;

    fn try_from(animal: FfiNewAnimal) -> Result<Self, Self::Error> {
        let birth_date = animal
            .birth_date
            .filter(|d| !d.trim().is_empty())
            .map(|d| {
                NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d")
                    .map_err(|e| HerdCareError::Validation(format!("invalid birth date {}: {}", d, e)))
            })
            .transpose()?;

        Ok(herd::NewAnimal {
            farm_id: animal.farm_id,
            tag_id: animal.tag_id,
            species: animal.species,
            breed: animal.breed,
            name: animal.name,
            gender: animal.gender,
            birth_date,
        })
    }
}

/// FFI-safe animal with its compliance status at read time.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAnimal {
    pub id: String,
    pub farm_id: String,
    pub tag_id: String,
    pub species: String,
    pub breed: Option<String>,
    pub name: Option<String>,
    /// Persisted status: active or withdrawal
    pub status: String,
    /// Evaluated: safe, milk_restricted, meat_restricted, fully_restricted
    pub compliance_status: String,
    pub withdrawal_until_milk: Option<String>,
    pub withdrawal_until_meat: Option<String>,
}

impl FfiAnimal {
    fn at(animal: Animal, now: DateTime<Utc>) -> Self {
        let compliance = animal.withdrawal_window().evaluate(now);
        Self {
            compliance_status: compliance.as_str().to_string(),
            status: animal.status.as_str().to_string(),
            withdrawal_until_milk: animal.withdrawal_until_milk.map(format_ts),
            withdrawal_until_meat: animal.withdrawal_until_meat.map(format_ts),
            id: animal.id,
            farm_id: animal.farm_id,
            tag_id: animal.tag_id,
            species: animal.species,
            breed: animal.breed,
            name: animal.name,
        }
    }
}

/// Treatment form. The prescriber is the caller.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewTreatment {
    pub animal_id: String,
    pub medication_id: String,
    pub diagnosis: String,
    pub dosage: String,
    pub route_of_administration: Option<String>,
    pub notes: Option<String>,
    /// Follow-up policy as JSON, e.g. `{"kind":"fixed_count","count":2}`
    pub task_policy_json: Option<String>,
}

impl TryFrom<FfiNewTreatment> for NewTreatment {
    type Error = HerdCareError;

    fn try_from(t: FfiNewTreatment) -> Result<Self, Self::Error> {
        let task_policy = t
            .task_policy_json
            .as_deref()
            .map(serde_json::from_str::<TaskPolicy>)
            .transpose()
            .map_err(|e| HerdCareError::Validation(format!("invalid task policy: {}", e)))?;

        Ok(NewTreatment {
            animal_id: t.animal_id,
            medication_id: t.medication_id,
            diagnosis: t.diagnosis,
            dosage: t.dosage,
            route_of_administration: t.route_of_administration,
            notes: t.notes,
            task_policy,
        })
    }
}

/// FFI-safe treatment.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTreatment {
    pub id: String,
    pub animal_id: String,
    pub vet_id: String,
    pub medication_id: String,
    pub diagnosis: String,
    pub dosage: String,
    pub route_of_administration: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
}

impl From<Treatment> for FfiTreatment {
    fn from(t: Treatment) -> Self {
        Self {
            id: t.id,
            animal_id: t.animal_id,
            vet_id: t.vet_id,
            medication_id: t.medication_id,
            diagnosis: t.diagnosis,
            dosage: t.dosage,
            route_of_administration: t.route_of_administration,
            notes: t.notes,
            created_at: format_ts(t.created_at),
        }
    }
}

/// Result of recording a treatment.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRecordedTreatment {
    pub treatment: FfiTreatment,
    pub animal: FfiAnimal,
    pub compliance_status: String,
    pub tasks: Vec<FfiTask>,
}

impl From<treatment::RecordedTreatment> for FfiRecordedTreatment {
    fn from(recorded: treatment::RecordedTreatment) -> Self {
        let at = recorded.treatment.created_at;
        Self {
            compliance_status: recorded.status.as_str().to_string(),
            animal: FfiAnimal::at(recorded.animal, at),
            tasks: recorded
                .tasks
                .into_iter()
                .map(|t| FfiTask::on(t, None, at))
                .collect(),
            treatment: recorded.treatment.into(),
        }
    }
}

/// FFI-safe task with its display status on the day it was read.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTask {
    pub id: String,
    pub treatment_id: String,
    pub animal_id: String,
    pub animal_tag_id: Option<String>,
    pub animal_name: Option<String>,
    pub farmer_id: String,
    pub medication_name: String,
    pub dosage: String,
    /// YYYY-MM-DD
    pub scheduled_date: String,
    /// HH:MM:SS
    pub scheduled_time: String,
    pub is_completed: bool,
    pub completed_at: Option<String>,
    pub points_awarded: u32,
    /// completed, overdue, due_today or upcoming
    pub status: String,
}

impl FfiTask {
    fn on(task: Task, animal: Option<(String, Option<String>)>, now: DateTime<Utc>) -> Self {
        let status = match task.display_status(now.date_naive()) {
            models::TaskDisplayStatus::Completed => "completed",
            models::TaskDisplayStatus::Overdue => "overdue",
            models::TaskDisplayStatus::DueToday => "due_today",
            models::TaskDisplayStatus::Upcoming => "upcoming",
        };
        let (animal_tag_id, animal_name) = match animal {
            Some((tag, name)) => (Some(tag), name),
            None => (None, None),
        };
        Self {
            id: task.id,
            treatment_id: task.treatment_id,
            animal_id: task.animal_id,
            animal_tag_id,
            animal_name,
            farmer_id: task.farmer_id,
            medication_name: task.medication_name,
            dosage: task.dosage,
            scheduled_date: task.scheduled_date.format("%Y-%m-%d").to_string(),
            scheduled_time: task.scheduled_time.format("%H:%M:%S").to_string(),
            is_completed: task.is_completed,
            completed_at: task.completed_at.map(format_ts),
            points_awarded: task.points_awarded,
            status: status.to_string(),
        }
    }
}

/// Task completion outcome; `warning` is set when the point credit failed.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTaskCompletion {
    pub task: FfiTask,
    pub points_credited: bool,
    pub reward_balance: Option<i64>,
    pub warning: Option<String>,
}

/// FFI-safe alert.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAlert {
    pub id: String,
    pub farm_id: String,
    pub animal_id: Option<String>,
    pub alert_type: String,
    pub severity: String,
    pub description: String,
    pub status: String,
    pub created_at: String,
    pub resolved_at: Option<String>,
}

impl From<ComplianceAlert> for FfiAlert {
    fn from(alert: ComplianceAlert) -> Self {
        Self {
            alert_type: alert.alert_type.as_str().to_string(),
            severity: alert.severity.as_str().to_string(),
            status: alert.status.as_str().to_string(),
            created_at: format_ts(alert.created_at),
            resolved_at: alert.resolved_at.map(format_ts),
            id: alert.id,
            farm_id: alert.farm_id,
            animal_id: alert.animal_id,
            description: alert.description,
        }
    }
}

/// FFI-safe compliance summary.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSummary {
    pub total_animals: u32,
    pub compliant: u32,
    pub restricted: u32,
    pub milk_restricted: u32,
    pub meat_restricted: u32,
    pub fully_restricted: u32,
    pub alerts_low: u32,
    pub alerts_medium: u32,
    pub alerts_high: u32,
    /// Percentage, 100 when there are no animals
    pub compliance_rate: f64,
}

impl From<ComplianceSummary> for FfiSummary {
    fn from(s: ComplianceSummary) -> Self {
        Self {
            total_animals: s.total_animals,
            compliant: s.compliant,
            restricted: s.restricted,
            milk_restricted: s.milk_restricted,
            meat_restricted: s.meat_restricted,
            fully_restricted: s.fully_restricted,
            alerts_low: s.alerts.low,
            alerts_medium: s.alerts.medium,
            alerts_high: s.alerts.high,
            compliance_rate: s.compliance_rate,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSweepReport {
    pub animals_reset: u32,
    pub alerts_raised: u32,
    pub alerts_updated: u32,
    pub alerts_resolved: u32,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiFarmCompliance {
    pub farm: FfiFarm,
    pub summary: FfiSummary,
    pub animals: Vec<FfiAnimal>,
    pub active_alerts: Vec<FfiAlert>,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiFarmerDashboard {
    pub farmer_id: String,
    pub reward_points: i64,
    pub summary: FfiSummary,
    pub active_alerts: Vec<FfiAlert>,
    pub tasks: Vec<FfiTask>,
    pub due_today: u32,
    pub overdue: u32,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRoleCount {
    pub role: String,
    pub count: u32,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAdminOverview {
    pub users_by_role: Vec<FfiRoleCount>,
    pub total_users: u32,
    pub summary: FfiSummary,
    pub active_alerts: Vec<FfiAlert>,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiVetOverview {
    pub high_risk_animals: u32,
    pub pending_consultations: u32,
    pub pending_problem_reports: u32,
    pub open_lab_tests: u32,
}

/// FFI-safe consultation request.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiConsultation {
    pub id: String,
    pub farmer_id: String,
    pub vet_id: Option<String>,
    pub animal_id: Option<String>,
    pub priority: String,
    pub symptoms: String,
    pub scheduled_at: Option<String>,
    pub status: String,
    pub rating: Option<u8>,
    pub feedback: Option<String>,
    pub created_at: String,
}

impl From<models::ConsultationRequest> for FfiConsultation {
    fn from(c: models::ConsultationRequest) -> Self {
        Self {
            priority: c.priority.as_str().to_string(),
            status: c.status.as_str().to_string(),
            scheduled_at: c.scheduled_at.map(format_ts),
            created_at: format_ts(c.created_at),
            id: c.id,
            farmer_id: c.farmer_id,
            vet_id: c.vet_id,
            animal_id: c.animal_id,
            symptoms: c.symptoms,
            rating: c.rating,
            feedback: c.feedback,
        }
    }
}

/// FFI-safe problem report.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiProblemReport {
    pub id: String,
    pub farmer_id: String,
    pub animal_id: Option<String>,
    pub problem_type: String,
    pub symptoms: String,
    pub severity: String,
    pub status: String,
    pub vet_id: Option<String>,
    pub vet_response: Option<String>,
    pub created_at: String,
}

impl From<models::ProblemReport> for FfiProblemReport {
    fn from(r: models::ProblemReport) -> Self {
        Self {
            severity: r.severity.as_str().to_string(),
            status: r.status.as_str().to_string(),
            created_at: format_ts(r.created_at),
            id: r.id,
            farmer_id: r.farmer_id,
            animal_id: r.animal_id,
            problem_type: r.problem_type,
            symptoms: r.symptoms,
            vet_id: r.vet_id,
            vet_response: r.vet_response,
        }
    }
}

/// FFI-safe lab testing report.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTestingReport {
    pub id: String,
    pub animal_id: String,
    pub vet_id: String,
    pub lab_id: Option<String>,
    pub test_type: String,
    pub sample_type: String,
    pub priority: String,
    pub status: String,
    pub results: Option<String>,
    pub requested_at: String,
    pub completed_at: Option<String>,
}

impl From<models::TestingReport> for FfiTestingReport {
    fn from(r: models::TestingReport) -> Self {
        Self {
            priority: r.priority.as_str().to_string(),
            status: r.status.as_str().to_string(),
            requested_at: format_ts(r.requested_at),
            completed_at: r.completed_at.map(format_ts),
            id: r.id,
            animal_id: r.animal_id,
            vet_id: r.vet_id,
            lab_id: r.lab_id,
            test_type: r.test_type,
            sample_type: r.sample_type,
            results: r.results,
        }
    }
}
