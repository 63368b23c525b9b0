//! Treatment models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tasks::TaskPolicy;

/// A recorded treatment (append-only dosing history).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Treatment {
    pub id: String,
    pub animal_id: String,
    /// Prescribing veterinarian
    pub vet_id: String,
    pub medication_id: String,
    pub diagnosis: String,
    pub dosage: String,
    pub route_of_administration: Option<String>,
    pub notes: Option<String>,
    /// Treatment time; withdrawal windows are measured from here
    pub created_at: DateTime<Utc>,
}

/// Form input for recording a treatment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct NewTreatment {
    pub animal_id: String,
    pub medication_id: String,
    pub diagnosis: String,
    pub dosage: String,
    pub route_of_administration: Option<String>,
    pub notes: Option<String>,
    /// Overrides the configured follow-up policy for this treatment
    #[serde(default)]
    pub task_policy: Option<TaskPolicy>,
}

impl NewTreatment {
    /// Names of required fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.animal_id.trim().is_empty() {
            missing.push("animal_id");
        }
        if self.medication_id.trim().is_empty() {
            missing.push("medication_id");
        }
        if self.diagnosis.trim().is_empty() {
            missing.push("diagnosis");
        }
        if self.dosage.trim().is_empty() {
            missing.push("dosage");
        }
        missing
    }

    /// Build the persisted record.
    pub fn into_treatment(self, vet_id: String, now: DateTime<Utc>) -> Treatment {
        Treatment {
            id: uuid::Uuid::new_v4().to_string(),
            animal_id: self.animal_id,
            vet_id,
            medication_id: self.medication_id,
            diagnosis: self.diagnosis.trim().to_string(),
            dosage: self.dosage.trim().to_string(),
            route_of_administration: non_blank(self.route_of_administration),
            notes: non_blank(self.notes),
            created_at: now,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
