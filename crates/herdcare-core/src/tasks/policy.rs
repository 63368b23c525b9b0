//! Follow-up task generation.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::TaskSettings;
use crate::error::{CoreError, CoreResult};
use crate::models::{Task, Treatment};

/// Upper bound on both the number of tasks a policy yields and how many
/// days past the treatment date they may reach.
pub const MAX_SCHEDULE_DAYS: u32 = 366;

/// How many follow-up tasks a treatment produces, and on which days.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskPolicy {
    /// `count` consecutive daily tasks starting on the treatment date.
    FixedCount { count: u32 },
    /// One task every `interval_days`, starting on the treatment date, for
    /// offsets strictly below `span_days`.
    IntervalDays { interval_days: u32, span_days: u32 },
    /// Exactly these calendar dates.
    ExplicitDates { dates: Vec<NaiveDate> },
}

impl Default for TaskPolicy {
    fn default() -> Self {
        TaskPolicy::FixedCount { count: 3 }
    }
}

impl TaskPolicy {
    pub fn validate(&self) -> Result<(), String> {
        match self {
            TaskPolicy::FixedCount { count: 0 } => Err("count must be at least 1".into()),
            TaskPolicy::IntervalDays { interval_days: 0, .. } => {
                Err("interval_days must be at least 1".into())
            }
            TaskPolicy::IntervalDays { span_days: 0, .. } => {
                Err("span_days must be at least 1".into())
            }
            TaskPolicy::FixedCount { count } if *count > MAX_SCHEDULE_DAYS => Err(format!(
                "count {} exceeds the {} task limit",
                count, MAX_SCHEDULE_DAYS
            )),
            TaskPolicy::IntervalDays { span_days, .. } if *span_days > MAX_SCHEDULE_DAYS => {
                Err(format!(
                    "span_days {} exceeds the {} day limit",
                    span_days, MAX_SCHEDULE_DAYS
                ))
            }
            TaskPolicy::ExplicitDates { dates } if dates.is_empty() => {
                Err("at least one date is required".into())
            }
            TaskPolicy::ExplicitDates { dates } if dates.len() > MAX_SCHEDULE_DAYS as usize => {
                Err(format!(
                    "{} dates exceed the {} task limit",
                    dates.len(),
                    MAX_SCHEDULE_DAYS
                ))
            }
            _ => Ok(()),
        }
    }

    /// Scheduled dates for a treatment given on `start`, ascending, without
    /// duplicates.
    pub fn schedule(&self, start: NaiveDate) -> CoreResult<Vec<NaiveDate>> {
        self.validate().map_err(CoreError::Validation)?;

        let dates = match self {
            TaskPolicy::FixedCount { count } => (0..*count)
                .map(|offset| add_days(start, offset))
                .collect::<CoreResult<Vec<_>>>()?,
            TaskPolicy::IntervalDays {
                interval_days,
                span_days,
            } => (0..*span_days)
                .step_by(*interval_days as usize)
                .map(|offset| add_days(start, offset))
                .collect::<CoreResult<Vec<_>>>()?,
            TaskPolicy::ExplicitDates { dates } => {
                if let Some(early) = dates.iter().find(|d| **d < start) {
                    return Err(CoreError::Validation(format!(
                        "task date {} is before the treatment date {}",
                        early, start
                    )));
                }
                let horizon = add_days(start, MAX_SCHEDULE_DAYS)?;
                if let Some(late) = dates.iter().find(|d| **d > horizon) {
                    return Err(CoreError::Validation(format!(
                        "task date {} is more than {} days after the treatment date {}",
                        late, MAX_SCHEDULE_DAYS, start
                    )));
                }
                let mut dates = dates.clone();
                dates.sort();
                dates.dedup();
                dates
            }
        };
        Ok(dates)
    }
}

fn add_days(start: NaiveDate, offset: u32) -> CoreResult<NaiveDate> {
    start
        .checked_add_days(Days::new(u64::from(offset)))
        .ok_or_else(|| CoreError::Validation(format!("{} + {} days is out of range", start, offset)))
}

/// Build the task batch for a freshly recorded treatment.
///
/// Tasks are dated from the UTC calendar date of the treatment and
/// assigned to `farmer_id`.
pub fn generate_tasks(
    treatment: &Treatment,
    medication_name: &str,
    farmer_id: &str,
    policy: &TaskPolicy,
    settings: &TaskSettings,
) -> CoreResult<Vec<Task>> {
    let start = treatment.created_at.date_naive();

    Ok(policy
        .schedule(start)?
        .into_iter()
        .map(|date| Task {
            id: uuid::Uuid::new_v4().to_string(),
            treatment_id: treatment.id.clone(),
            animal_id: treatment.animal_id.clone(),
            farmer_id: farmer_id.to_string(),
            medication_name: medication_name.to_string(),
            dosage: treatment.dosage.clone(),
            scheduled_date: date,
            scheduled_time: settings.administration_time,
            is_completed: false,
            completed_at: None,
            points_awarded: settings.points_per_task,
            created_at: treatment.created_at,
        })
        .collect())
}
