//! Animal models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::compliance::WithdrawalWindow;

/// Persisted animal status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnimalStatus {
    /// No withdrawal restriction recorded
    Active,
    /// At least one withdrawal window was active when last evaluated
    Withdrawal,
}

impl AnimalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnimalStatus::Active => "active",
            AnimalStatus::Withdrawal => "withdrawal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(AnimalStatus::Active),
            "withdrawal" => Some(AnimalStatus::Withdrawal),
            _ => None,
        }
    }
}

/// A livestock animal belonging to a farm.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Animal {
    /// Unique identifier
    pub id: String,
    /// Owning farm
    pub farm_id: String,
    /// Ear tag, unique within the farm
    pub tag_id: String,
    /// Species (e.g., "bovine", "caprine")
    pub species: String,
    pub breed: Option<String>,
    pub name: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    /// Persisted status, refreshed by treatments and the sweep
    pub status: AnimalStatus,
    /// Milk may not enter the food supply until strictly after this instant
    pub withdrawal_until_milk: Option<DateTime<Utc>>,
    /// Meat may not enter the food supply until strictly after this instant
    pub withdrawal_until_meat: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Animal {
    /// Create a new animal with required fields.
    pub fn new(farm_id: String, tag_id: String, species: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            farm_id,
            tag_id,
            species,
            breed: None,
            name: None,
            gender: None,
            birth_date: None,
            status: AnimalStatus::Active,
            withdrawal_until_milk: None,
            withdrawal_until_meat: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Name if set, otherwise the tag.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.tag_id)
    }

    /// Current withdrawal window.
    pub fn withdrawal_window(&self) -> WithdrawalWindow {
        WithdrawalWindow {
            milk_until: self.withdrawal_until_milk,
            meat_until: self.withdrawal_until_meat,
        }
    }

    /// Overwrite the withdrawal window and derive the status at `now`.
    pub fn apply_window(&mut self, window: WithdrawalWindow, now: DateTime<Utc>) {
        self.withdrawal_until_milk = window.milk_until;
        self.withdrawal_until_meat = window.meat_until;
        self.status = if window.evaluate(now).is_safe() {
            AnimalStatus::Active
        } else {
            AnimalStatus::Withdrawal
        };
        self.updated_at = now;
    }
}
