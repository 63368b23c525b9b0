//! Role dashboards built from the read model. Recomputed on every call.

use chrono::{DateTime, Days, Utc};
use serde::{Deserialize, Serialize};

use super::ComplianceSummary;
use crate::db::{ComplianceReadModel, Database, FarmSnapshot};
use crate::error::{CoreError, CoreResult};
use crate::herd::visible_farm;
use crate::models::{
    AnimalStatus, CallerContext, ComplianceAlert, ConsultationStatus, Role, TaskDisplayStatus,
    TaskView,
};

/// A task list entry with its state on the dashboard date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskItem {
    pub view: TaskView,
    pub status: TaskDisplayStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FarmerDashboard {
    pub farmer_id: String,
    pub reward_points: i64,
    pub summary: ComplianceSummary,
    pub active_alerts: Vec<ComplianceAlert>,
    pub tasks: Vec<TaskItem>,
    pub due_today: u32,
    pub overdue: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FarmCompliance {
    pub snapshot: FarmSnapshot,
    pub summary: ComplianceSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdminOverview {
    pub users_by_role: Vec<(Role, u32)>,
    pub total_users: u32,
    pub summary: ComplianceSummary,
    /// Newest first
    pub active_alerts: Vec<ComplianceAlert>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VetOverview {
    /// Animals whose persisted status is `withdrawal`
    pub high_risk_animals: u32,
    pub pending_consultations: u32,
    pub pending_problem_reports: u32,
    pub open_lab_tests: u32,
}

pub fn farmer_dashboard(
    db: &Database,
    ctx: &CallerContext,
    farmer_id: &str,
    lookback_days: u32,
    now: DateTime<Utc>,
) -> CoreResult<FarmerDashboard> {
    if ctx.user_id != farmer_id && !ctx.is_admin() {
        return Err(CoreError::Forbidden(format!(
            "{} may not view another farmer's dashboard",
            ctx.role.as_str()
        )));
    }

    let profile = db
        .get_profile(farmer_id)?
        .ok_or_else(|| CoreError::not_found("profile", farmer_id))?;
    let herd = db.owner_snapshot(farmer_id)?;
    let summary = ComplianceSummary::compute(&herd.animals, &herd.active_alerts, now);

    let today = now.date_naive();
    let since = today
        .checked_sub_days(Days::new(u64::from(lookback_days)))
        .unwrap_or(today);
    let tasks: Vec<TaskItem> = db
        .list_task_views_for_farmer(farmer_id, since)?
        .into_iter()
        .map(|view| TaskItem {
            status: view.task.display_status(today),
            view,
        })
        .collect();

    let count = |s: TaskDisplayStatus| tasks.iter().filter(|t| t.status == s).count() as u32;

    Ok(FarmerDashboard {
        farmer_id: profile.id,
        reward_points: profile.reward_points,
        due_today: count(TaskDisplayStatus::DueToday),
        overdue: count(TaskDisplayStatus::Overdue),
        summary,
        active_alerts: herd.active_alerts,
        tasks,
    })
}

/// Compliance for one farm: visible to its owner, veterinarians and admins.
pub fn farm_compliance(
    db: &Database,
    ctx: &CallerContext,
    farm_id: &str,
    now: DateTime<Utc>,
) -> CoreResult<FarmCompliance> {
    let farm = visible_farm(db, ctx, farm_id)?;
    let snapshot = db.farm_snapshot(&farm.id).map_err(|e| match e {
        crate::db::DbError::NotFound(_) => CoreError::not_found("farm", farm_id),
        other => other.into(),
    })?;

    let summary = ComplianceSummary::compute(&snapshot.animals, &snapshot.active_alerts, now);
    Ok(FarmCompliance { snapshot, summary })
}

pub fn admin_overview(
    db: &Database,
    ctx: &CallerContext,
    now: DateTime<Utc>,
) -> CoreResult<AdminOverview> {
    ctx.require_any(&[Role::Admin], "view the admin overview")?;

    let users_by_role = db.count_profiles_by_role()?;
    let herd = db.global_snapshot()?;

    Ok(AdminOverview {
        total_users: users_by_role.iter().map(|(_, n)| n).sum(),
        users_by_role,
        summary: ComplianceSummary::compute(&herd.animals, &herd.active_alerts, now),
        active_alerts: herd.active_alerts,
    })
}

pub fn vet_overview(db: &Database, ctx: &CallerContext) -> CoreResult<VetOverview> {
    ctx.require_any(&[Role::Veterinarian, Role::Admin], "view the veterinary overview")?;

    Ok(VetOverview {
        high_risk_animals: db.list_animals_by_status(AnimalStatus::Withdrawal)?.len() as u32,
        pending_consultations: db
            .list_consultations_by_status(ConsultationStatus::Pending)?
            .len() as u32,
        pending_problem_reports: db.list_pending_problem_reports()?.len() as u32,
        open_lab_tests: db.list_open_testing_reports()?.len() as u32,
    })
}
