//! Compliance alert models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Alert severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Active,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Resolved => "resolved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(AlertStatus::Active),
            "resolved" => Some(AlertStatus::Resolved),
            _ => None,
        }
    }
}

/// What raised the alert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// Care tasks left incomplete past their scheduled date
    MissedTask,
    /// Remaining withdrawal restriction exceeds the configured threshold
    ProlongedWithdrawal,
    /// Raised outside the sweep (e.g., by an inspector)
    Other(String),
}

impl AlertType {
    pub fn as_str(&self) -> &str {
        match self {
            AlertType::MissedTask => "missed_task",
            AlertType::ProlongedWithdrawal => "prolonged_withdrawal",
            AlertType::Other(kind) => kind,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "missed_task" => AlertType::MissedTask,
            "prolonged_withdrawal" => AlertType::ProlongedWithdrawal,
            other => AlertType::Other(other.to_string()),
        }
    }
}

/// A farm- or animal-level compliance alert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceAlert {
    pub id: String,
    pub farm_id: String,
    pub animal_id: Option<String>,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub description: String,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ComplianceAlert {
    /// Create a new active alert.
    pub fn new(
        farm_id: String,
        animal_id: Option<String>,
        alert_type: AlertType,
        severity: Severity,
        description: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            farm_id,
            animal_id,
            alert_type,
            severity,
            description,
            status: AlertStatus::Active,
            created_at: now,
            resolved_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AlertStatus::Active
    }
}
