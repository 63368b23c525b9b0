//! Medication registry models.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Longest milk withdrawal the registry accepts, in hours (ten years).
pub const MAX_MILK_WITHDRAWAL_HOURS: u32 = 10 * 365 * 24;

/// Longest meat withdrawal the registry accepts, in days (ten years).
pub const MAX_MEAT_WITHDRAWAL_DAYS: u32 = 10 * 365;

/// A medication in the withdrawal reference catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medication {
    /// Unique identifier
    pub id: String,
    /// Trade or generic name shown to prescribers
    pub name: String,
    /// Active ingredient (e.g., "oxytetracycline")
    pub active_ingredient: String,
    /// Hours after treatment during which milk must be discarded
    pub withdrawal_period_milk_hours: u32,
    /// Days after treatment during which the animal must not be slaughtered
    pub withdrawal_period_meat_days: u32,
    /// Free-text dosage guidance
    pub dosage_instructions: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Medication {
    /// Create a new medication with required fields.
    pub fn new(
        name: String,
        active_ingredient: String,
        withdrawal_period_milk_hours: u32,
        withdrawal_period_meat_days: u32,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            active_ingredient,
            withdrawal_period_milk_hours,
            withdrawal_period_meat_days,
            dosage_instructions: None,
            created_at: Utc::now(),
        }
    }

    /// Milk withdrawal duration.
    pub fn milk_withdrawal(&self) -> Duration {
        Duration::hours(i64::from(self.withdrawal_period_milk_hours))
    }

    /// Meat withdrawal duration.
    pub fn meat_withdrawal(&self) -> Duration {
        Duration::days(i64::from(self.withdrawal_period_meat_days))
    }

    /// Reject withdrawal periods beyond the registry limits.
    pub fn validate_withdrawal(&self) -> Result<(), String> {
        if self.withdrawal_period_milk_hours > MAX_MILK_WITHDRAWAL_HOURS {
            return Err(format!(
                "milk withdrawal of {} hours exceeds the {} hour limit",
                self.withdrawal_period_milk_hours, MAX_MILK_WITHDRAWAL_HOURS
            ));
        }
        if self.withdrawal_period_meat_days > MAX_MEAT_WITHDRAWAL_DAYS {
            return Err(format!(
                "meat withdrawal of {} days exceeds the {} day limit",
                self.withdrawal_period_meat_days, MAX_MEAT_WITHDRAWAL_DAYS
            ));
        }
        Ok(())
    }

    /// Whether either product has a non-zero withdrawal period.
    pub fn has_withdrawal(&self) -> bool {
        self.withdrawal_period_milk_hours > 0 || self.withdrawal_period_meat_days > 0
    }
}
