//! Roll per-animal compliance into dashboard counts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ComplianceStatus;
use crate::models::{Animal, ComplianceAlert, Severity};

/// Active alert counts per severity.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeverityCounts {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
}

impl SeverityCounts {
    pub fn total(&self) -> u32 {
        self.low + self.medium + self.high
    }

    fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Low => self.low += 1,
            Severity::Medium => self.medium += 1,
            Severity::High => self.high += 1,
        }
    }
}

/// Compliance counts for a set of animals at one instant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceSummary {
    pub total_animals: u32,
    pub compliant: u32,
    pub restricted: u32,
    pub milk_restricted: u32,
    pub meat_restricted: u32,
    pub fully_restricted: u32,
    pub alerts: SeverityCounts,
    /// Percentage in `[0, 100]`; 100 when there are no animals.
    pub compliance_rate: f64,
    pub evaluated_at: DateTime<Utc>,
}

impl ComplianceSummary {
    /// Evaluate every animal's windows at `now` and count active alerts.
    ///
    /// Status comes from the windows, not the persisted `status` column, so a
    /// stale column between sweeps does not skew the counts.
    pub fn compute(animals: &[Animal], alerts: &[ComplianceAlert], now: DateTime<Utc>) -> Self {
        let mut summary = Self {
            total_animals: 0,
            compliant: 0,
            restricted: 0,
            milk_restricted: 0,
            meat_restricted: 0,
            fully_restricted: 0,
            alerts: SeverityCounts::default(),
            compliance_rate: 100.0,
            evaluated_at: now,
        };

        for animal in animals {
            summary.total_animals += 1;
            match animal.withdrawal_window().evaluate(now) {
                ComplianceStatus::Safe => summary.compliant += 1,
                ComplianceStatus::MilkRestricted => summary.milk_restricted += 1,
                ComplianceStatus::MeatRestricted => summary.meat_restricted += 1,
                ComplianceStatus::FullyRestricted => summary.fully_restricted += 1,
            }
        }
        summary.restricted = summary.total_animals - summary.compliant;

        for alert in alerts.iter().filter(|a| a.is_active()) {
            summary.alerts.record(alert.severity);
        }

        summary.compliance_rate = compliance_rate(summary.compliant, summary.total_animals);
        summary
    }

    /// Rate rounded to the nearest whole percent for display.
    pub fn compliance_rate_rounded(&self) -> u32 {
        self.compliance_rate.round() as u32
    }
}

/// `compliant / total` as a percentage, 100 for an empty herd.
pub fn compliance_rate(compliant: u32, total: u32) -> f64 {
    if total == 0 {
        100.0
    } else {
        f64::from(compliant) / f64::from(total) * 100.0
    }
}
