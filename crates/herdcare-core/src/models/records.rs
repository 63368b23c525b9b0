//! Status-tagged request records: consultations, problem reports, lab tests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Severity;
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            "urgent" => Some(Priority::Urgent),
            _ => None,
        }
    }
}

// =========================================================================
// Consultation requests
// =========================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationStatus {
    /// Raised by a farmer, waiting for a veterinarian
    Pending,
    /// Picked up by a veterinarian
    Accepted,
    /// Booked by a veterinarian for a given time
    Scheduled,
    Completed,
}

impl ConsultationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationStatus::Pending => "pending",
            ConsultationStatus::Accepted => "accepted",
            ConsultationStatus::Scheduled => "scheduled",
            ConsultationStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ConsultationStatus::Pending),
            "accepted" => Some(ConsultationStatus::Accepted),
            "scheduled" => Some(ConsultationStatus::Scheduled),
            "completed" => Some(ConsultationStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsultationRequest {
    pub id: String,
    pub farmer_id: String,
    pub vet_id: Option<String>,
    pub animal_id: Option<String>,
    /// visit, video, emergency, routine
    pub consultation_type: String,
    pub priority: Priority,
    pub symptoms: String,
    pub notes: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: ConsultationStatus,
    /// 1-5, given by the farmer after completion
    pub rating: Option<u8>,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConsultationRequest {
    /// A farmer-raised request awaiting a veterinarian.
    pub fn request(farmer_id: String, symptoms: String, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            farmer_id,
            vet_id: None,
            animal_id: None,
            consultation_type: "visit".into(),
            priority: Priority::Medium,
            symptoms,
            notes: None,
            scheduled_at: None,
            status: ConsultationStatus::Pending,
            rating: None,
            feedback: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A visit booked directly by a veterinarian.
    pub fn schedule(
        farmer_id: String,
        vet_id: String,
        symptoms: String,
        scheduled_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut request = Self::request(farmer_id, symptoms, now);
        request.vet_id = Some(vet_id);
        request.scheduled_at = Some(scheduled_at);
        request.status = ConsultationStatus::Scheduled;
        request
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.farmer_id.trim().is_empty() {
            return Err(CoreError::Validation("farmer_id is required".into()));
        }
        if self.symptoms.trim().is_empty() {
            return Err(CoreError::Validation("symptoms are required".into()));
        }
        if self.status == ConsultationStatus::Scheduled && self.scheduled_at.is_none() {
            return Err(CoreError::Validation(
                "scheduled visits need a date and time".into(),
            ));
        }
        Ok(())
    }

    pub fn accept(&mut self, vet_id: String, now: DateTime<Utc>) -> CoreResult<()> {
        if self.status != ConsultationStatus::Pending {
            return Err(CoreError::InvalidState(format!(
                "consultation {} is {}, only pending requests can be accepted",
                self.id,
                self.status.as_str()
            )));
        }
        self.vet_id = Some(vet_id);
        self.status = ConsultationStatus::Accepted;
        self.updated_at = now;
        Ok(())
    }

    pub fn complete(
        &mut self,
        rating: Option<u8>,
        feedback: Option<String>,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        if !matches!(
            self.status,
            ConsultationStatus::Accepted | ConsultationStatus::Scheduled
        ) {
            return Err(CoreError::InvalidState(format!(
                "consultation {} is {}, cannot complete",
                self.id,
                self.status.as_str()
            )));
        }
        if let Some(r) = rating {
            if !(1..=5).contains(&r) {
                return Err(CoreError::Validation(format!(
                    "rating must be between 1 and 5, got {}",
                    r
                )));
            }
        }
        self.rating = rating;
        self.feedback = feedback;
        self.status = ConsultationStatus::Completed;
        self.updated_at = now;
        Ok(())
    }
}

// =========================================================================
// Problem reports
// =========================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProblemStatus {
    Pending,
    Responded,
}

impl ProblemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemStatus::Pending => "pending",
            ProblemStatus::Responded => "responded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ProblemStatus::Pending),
            "responded" => Some(ProblemStatus::Responded),
            _ => None,
        }
    }
}

/// A farmer-reported health problem awaiting veterinary response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProblemReport {
    pub id: String,
    pub farmer_id: String,
    /// None for farm-wide issues
    pub animal_id: Option<String>,
    pub problem_type: String,
    pub symptoms: String,
    pub severity: Severity,
    pub description: Option<String>,
    pub status: ProblemStatus,
    pub vet_id: Option<String>,
    pub vet_response: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ProblemReport {
    pub fn new(
        farmer_id: String,
        problem_type: String,
        symptoms: String,
        severity: Severity,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            farmer_id,
            animal_id: None,
            problem_type,
            symptoms,
            severity,
            description: None,
            status: ProblemStatus::Pending,
            vet_id: None,
            vet_response: None,
            responded_at: None,
            created_at: now,
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.problem_type.trim().is_empty() || self.symptoms.trim().is_empty() {
            return Err(CoreError::Validation(
                "problem type and symptoms are required".into(),
            ));
        }
        Ok(())
    }

    pub fn respond(&mut self, vet_id: String, response: String, now: DateTime<Utc>) -> CoreResult<()> {
        if self.status != ProblemStatus::Pending {
            return Err(CoreError::InvalidState(format!(
                "problem report {} already has a response",
                self.id
            )));
        }
        if response.trim().is_empty() {
            return Err(CoreError::Validation("response text is required".into()));
        }
        self.vet_id = Some(vet_id);
        self.vet_response = Some(response);
        self.responded_at = Some(now);
        self.status = ProblemStatus::Responded;
        Ok(())
    }
}

// =========================================================================
// Testing reports
// =========================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TestingStatus {
    Pending,
    Received,
    Completed,
}

impl TestingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestingStatus::Pending => "pending",
            TestingStatus::Received => "received",
            TestingStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TestingStatus::Pending),
            "received" => Some(TestingStatus::Received),
            "completed" => Some(TestingStatus::Completed),
            _ => None,
        }
    }
}

/// A lab test requested by a veterinarian.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestingReport {
    pub id: String,
    pub animal_id: String,
    pub vet_id: String,
    pub lab_id: Option<String>,
    pub test_type: String,
    pub test_description: Option<String>,
    pub sample_type: String,
    pub priority: Priority,
    pub status: TestingStatus,
    pub results: Option<String>,
    pub notes: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub received_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TestingReport {
    pub fn new(
        animal_id: String,
        vet_id: String,
        test_type: String,
        sample_type: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            animal_id,
            vet_id,
            lab_id: None,
            test_type,
            test_description: None,
            sample_type,
            priority: Priority::Medium,
            status: TestingStatus::Pending,
            results: None,
            notes: None,
            requested_at: now,
            received_at: None,
            completed_at: None,
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.animal_id.trim().is_empty()
            || self.test_type.trim().is_empty()
            || self.sample_type.trim().is_empty()
        {
            return Err(CoreError::Validation(
                "animal, test type and sample type are required".into(),
            ));
        }
        Ok(())
    }

    pub fn mark_received(&mut self, lab_id: String, now: DateTime<Utc>) -> CoreResult<()> {
        if self.status != TestingStatus::Pending {
            return Err(CoreError::InvalidState(format!(
                "testing report {} is {}, cannot mark received",
                self.id,
                self.status.as_str()
            )));
        }
        self.lab_id = Some(lab_id);
        self.received_at = Some(now);
        self.status = TestingStatus::Received;
        Ok(())
    }

    pub fn complete(
        &mut self,
        results: String,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        if self.status != TestingStatus::Received {
            return Err(CoreError::InvalidState(format!(
                "testing report {} is {}, cannot complete",
                self.id,
                self.status.as_str()
            )));
        }
        if results.trim().is_empty() {
            return Err(CoreError::Validation("results are required".into()));
        }
        self.results = Some(results);
        self.notes = notes;
        self.completed_at = Some(now);
        self.status = TestingStatus::Completed;
        Ok(())
    }
}
