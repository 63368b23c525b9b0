//! Request-scoped caller identity.

use serde::{Deserialize, Serialize};

use super::Role;
use crate::error::{CoreError, CoreResult};

/// Identity and role of the caller, passed into every core operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallerContext {
    /// Profile ID of the caller
    pub user_id: String,
    pub role: Role,
}

impl CallerContext {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fail with `Forbidden` unless the caller has one of `roles`.
    pub fn require_any(&self, roles: &[Role], action: &str) -> CoreResult<()> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!(
                "{} may not {}",
                self.role.as_str(),
                action
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_any() {
        let vet = CallerContext::new("vet-1", Role::Veterinarian);
        assert!(vet.require_any(&[Role::Veterinarian], "prescribe").is_ok());

        let farmer = CallerContext::new("farmer-1", Role::Farmer);
        let err = farmer.require_any(&[Role::Veterinarian], "prescribe").unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
        assert!(err.to_string().contains("farmer may not prescribe"));
    }
}
