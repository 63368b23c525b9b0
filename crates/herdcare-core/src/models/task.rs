//! Care task models.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a task.
///
/// Only `Completed` is persisted; `Overdue` is derived from the calendar.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Scheduled,
    Overdue,
    Completed,
}

/// Finer-grained state for to-do lists.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskDisplayStatus {
    Completed,
    Overdue,
    DueToday,
    Upcoming,
}

/// A scheduled dosing/monitoring task generated from a treatment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub treatment_id: String,
    pub animal_id: String,
    /// Farmer responsible for carrying out the task
    pub farmer_id: String,
    /// Denormalized from the medication at generation time
    pub medication_name: String,
    pub dosage: String,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    /// Reward points credited to the farmer on completion
    pub points_awarded: u32,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// State on the given calendar day.
    pub fn state_on(&self, today: NaiveDate) -> TaskState {
        if self.is_completed {
            TaskState::Completed
        } else if today > self.scheduled_date {
            TaskState::Overdue
        } else {
            TaskState::Scheduled
        }
    }

    pub fn display_status(&self, today: NaiveDate) -> TaskDisplayStatus {
        match self.state_on(today) {
            TaskState::Completed => TaskDisplayStatus::Completed,
            TaskState::Overdue => TaskDisplayStatus::Overdue,
            TaskState::Scheduled if self.scheduled_date == today => TaskDisplayStatus::DueToday,
            TaskState::Scheduled => TaskDisplayStatus::Upcoming,
        }
    }

    /// Completion is allowed from the scheduled day onward, once.
    pub fn is_completable_on(&self, today: NaiveDate) -> bool {
        !self.is_completed && self.scheduled_date <= today
    }

    /// Days past the scheduled date, zero if not overdue.
    pub fn days_overdue(&self, today: NaiveDate) -> i64 {
        if self.is_completed {
            return 0;
        }
        (today - self.scheduled_date).num_days().max(0)
    }
}

/// A task joined with the animal it concerns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskView {
    pub task: Task,
    pub animal_name: Option<String>,
    pub animal_tag_id: String,
}

/// Outcome of completing a task.
///
/// The completion is always persisted; the point credit is a second step
/// whose failure is reported in `warning` instead of failing the call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskCompletion {
    pub task: Task,
    pub points_credited: bool,
    /// Farmer balance after the credit, when it succeeded
    pub reward_balance: Option<i64>,
    pub warning: Option<String>,
}

impl TaskCompletion {
    pub fn is_partial(&self) -> bool {
        self.warning.is_some()
    }
}
