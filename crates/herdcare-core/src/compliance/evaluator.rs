//! Withdrawal window evaluation.
//!
//! A window end is the instant after which the product may enter the food
//! supply. The window has elapsed only when `end < now`; an end equal to
//! `now` is still restricted.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::models::Medication;

/// Compliance classification of an animal at an instant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Safe,
    MilkRestricted,
    MeatRestricted,
    FullyRestricted,
}

impl ComplianceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceStatus::Safe => "safe",
            ComplianceStatus::MilkRestricted => "milk_restricted",
            ComplianceStatus::MeatRestricted => "meat_restricted",
            ComplianceStatus::FullyRestricted => "fully_restricted",
        }
    }

    pub fn is_safe(&self) -> bool {
        *self == ComplianceStatus::Safe
    }

    pub fn milk_safe(&self) -> bool {
        matches!(self, ComplianceStatus::Safe | ComplianceStatus::MeatRestricted)
    }

    pub fn meat_safe(&self) -> bool {
        matches!(self, ComplianceStatus::Safe | ComplianceStatus::MilkRestricted)
    }
}

/// Milk and meat withdrawal ends. `None` means no restriction recorded.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WithdrawalWindow {
    pub milk_until: Option<DateTime<Utc>>,
    pub meat_until: Option<DateTime<Utc>>,
}

impl WithdrawalWindow {
    /// Window produced by treating with `medication` at `treated_at`.
    ///
    /// Fails with `Validation` when a period is beyond the registry limits
    /// or the end is not representable.
    pub fn from_treatment(medication: &Medication, treated_at: DateTime<Utc>) -> CoreResult<Self> {
        medication
            .validate_withdrawal()
            .map_err(|e| CoreError::Validation(format!("{}: {}", medication.name, e)))?;

        let end = |period: Duration, product: &str| {
            treated_at.checked_add_signed(period).ok_or_else(|| {
                CoreError::Validation(format!(
                    "{} withdrawal end for {} is out of range",
                    product, medication.name
                ))
            })
        };
        Ok(Self {
            milk_until: Some(end(medication.milk_withdrawal(), "milk")?),
            meat_until: Some(end(medication.meat_withdrawal(), "meat")?),
        })
    }

    pub fn evaluate(&self, now: DateTime<Utc>) -> ComplianceStatus {
        evaluate(self.milk_until, self.meat_until, now)
    }

    /// Latest end still in force at `now`, if any.
    pub fn restricted_until(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        [self.milk_until, self.meat_until]
            .into_iter()
            .flatten()
            .filter(|end| is_restricted(Some(*end), now))
            .max()
    }
}

/// Classify an animal's withdrawal windows at `now`.
pub fn evaluate(
    milk_until: Option<DateTime<Utc>>,
    meat_until: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> ComplianceStatus {
    match (is_restricted(milk_until, now), is_restricted(meat_until, now)) {
        (false, false) => ComplianceStatus::Safe,
        (true, false) => ComplianceStatus::MilkRestricted,
        (false, true) => ComplianceStatus::MeatRestricted,
        (true, true) => ComplianceStatus::FullyRestricted,
    }
}

/// A single window end is in force unless it lies strictly before `now`.
pub fn is_restricted(end: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match end {
        Some(end) => end >= now,
        None => false,
    }
}
