//! Farm and user profile models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User role, supplied by the auth layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Farmer,
    Veterinarian,
    Admin,
    Lab,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Farmer => "farmer",
            Role::Veterinarian => "veterinarian",
            Role::Admin => "admin",
            Role::Lab => "lab",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "farmer" => Some(Role::Farmer),
            "veterinarian" => Some(Role::Veterinarian),
            "admin" => Some(Role::Admin),
            "lab" => Some(Role::Lab),
            _ => None,
        }
    }
}

/// A user profile with its reward balance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub phone: Option<String>,
    /// Gamification balance credited on task completion
    pub reward_points: i64,
    /// Set by an admin after license verification (veterinarians only)
    pub is_vet_verified: bool,
    pub vet_license_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Create a new profile with a zero balance.
    pub fn new(full_name: String, email: String, role: Role) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            full_name,
            email,
            role,
            phone: None,
            reward_points: 0,
            is_vet_verified: false,
            vet_license_id: None,
            created_at: Utc::now(),
        }
    }
}

/// A farm owned by a farmer profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Farm {
    pub id: String,
    /// Owning farmer; receives the care tasks for the farm's animals
    pub owner_id: String,
    pub farm_name: String,
    pub address: String,
    pub registration_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Farm {
    pub fn new(owner_id: String, farm_name: String, address: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id,
            farm_name,
            address,
            registration_number: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_strings() {
        for role in [Role::Farmer, Role::Veterinarian, Role::Admin, Role::Lab] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("guest"), None);
    }

    #[test]
    fn test_new_profile_has_zero_balance() {
        let profile = Profile::new("Asha".into(), "asha@example.com".into(), Role::Farmer);
        assert_eq!(profile.reward_points, 0);
        assert!(!profile.is_vet_verified);
    }
}
