//! Task completion and reward credit.

use chrono::{DateTime, Days, Utc};
use tracing::{debug, info, warn};

use crate::db::{Database, DbResult};
use crate::error::{CoreError, CoreResult};
use crate::models::{CallerContext, TaskCompletion, TaskView};

/// Storage-side reward balance.
pub trait RewardLedger {
    /// Add `points` to the user's balance and return the new balance.
    fn increment_reward_points(&self, user_id: &str, points: u32) -> DbResult<i64>;
}

impl RewardLedger for Database {
    fn increment_reward_points(&self, user_id: &str, points: u32) -> DbResult<i64> {
        Database::increment_reward_points(self, user_id, points)
    }
}

/// Tracks completion of generated tasks.
pub struct TaskTracker<'a, L: RewardLedger = Database> {
    db: &'a Database,
    ledger: &'a L,
}

impl<'a> TaskTracker<'a, Database> {
    pub fn new(db: &'a Database) -> Self {
        Self { db, ledger: db }
    }
}

impl<'a, L: RewardLedger> TaskTracker<'a, L> {
    /// Use a separate ledger for the point credit.
    pub fn with_ledger(db: &'a Database, ledger: &'a L) -> Self {
        Self { db, ledger }
    }

    /// Complete a task and credit its points to the responsible farmer.
    ///
    /// The completion is persisted first. If the credit then fails the
    /// completion stands and the failure is returned as a warning.
    pub fn complete_task(
        &self,
        ctx: &CallerContext,
        task_id: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<TaskCompletion> {
        let task = self
            .db
            .get_task(task_id)?
            .ok_or_else(|| CoreError::not_found("task", task_id))?;

        if ctx.user_id != task.farmer_id && !ctx.is_admin() {
            return Err(CoreError::Forbidden(format!(
                "task {} belongs to another farmer",
                task_id
            )));
        }

        let today = now.date_naive();
        if task.is_completed {
            return Err(CoreError::InvalidState(format!(
                "task {} is already completed",
                task_id
            )));
        }
        if !task.is_completable_on(today) {
            return Err(CoreError::InvalidState(format!(
                "task {} is scheduled for {} and cannot be completed on {}",
                task_id, task.scheduled_date, today
            )));
        }

        // Guarded update: a concurrent completion leaves zero rows touched.
        if !self.db.mark_task_completed(task_id, &now)? {
            return Err(CoreError::InvalidState(format!(
                "task {} is already completed",
                task_id
            )));
        }

        let mut completed = task;
        completed.is_completed = true;
        completed.completed_at = Some(now);
        info!(task_id, farmer_id = %completed.farmer_id, "Task completed");

        if completed.points_awarded == 0 {
            return Ok(TaskCompletion {
                task: completed,
                points_credited: false,
                reward_balance: None,
                warning: None,
            });
        }

        match self
            .ledger
            .increment_reward_points(&completed.farmer_id, completed.points_awarded)
        {
            Ok(balance) => {
                debug!(task_id, balance, "Reward points credited");
                Ok(TaskCompletion {
                    task: completed,
                    points_credited: true,
                    reward_balance: Some(balance),
                    warning: None,
                })
            }
            Err(e) => {
                warn!(task_id, error = %e, "Task completed but reward credit failed");
                let warning = format!(
                    "task completed, but {} reward points could not be credited: {}",
                    completed.points_awarded, e
                );
                Ok(TaskCompletion {
                    task: completed,
                    points_credited: false,
                    reward_balance: None,
                    warning: Some(warning),
                })
            }
        }
    }

    /// The caller's task list: everything scheduled from `lookback_days` ago
    /// onward, ordered by date then time.
    pub fn tasks_for_farmer(
        &self,
        ctx: &CallerContext,
        farmer_id: &str,
        lookback_days: u32,
        now: DateTime<Utc>,
    ) -> CoreResult<Vec<TaskView>> {
        if ctx.user_id != farmer_id && !ctx.is_admin() {
            return Err(CoreError::Forbidden(format!(
                "{} may not view another farmer's tasks",
                ctx.role.as_str()
            )));
        }

        let today = now.date_naive();
        let since = today
            .checked_sub_days(Days::new(u64::from(lookback_days)))
            .unwrap_or(today);
        Ok(self.db.list_task_views_for_farmer(farmer_id, since)?)
    }
}
