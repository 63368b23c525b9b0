//! Read model: the joined views the compliance aggregator consumes.

use serde::{Deserialize, Serialize};

use super::{Database, DbError, DbResult};
use crate::models::{Animal, ComplianceAlert, Farm};

/// One farm's animals together with its active alerts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FarmSnapshot {
    pub farm: Farm,
    pub animals: Vec<Animal>,
    pub active_alerts: Vec<ComplianceAlert>,
}

/// Animals and active alerts across a set of farms (an owner's, or all).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HerdSnapshot {
    pub animals: Vec<Animal>,
    pub active_alerts: Vec<ComplianceAlert>,
}

/// Read-only queries backing the dashboards.
pub trait ComplianceReadModel {
    fn farm_snapshot(&self, farm_id: &str) -> DbResult<FarmSnapshot>;

    /// Every farm owned by `owner_id`, merged.
    fn owner_snapshot(&self, owner_id: &str) -> DbResult<HerdSnapshot>;

    fn global_snapshot(&self) -> DbResult<HerdSnapshot>;
}

impl ComplianceReadModel for Database {
    fn farm_snapshot(&self, farm_id: &str) -> DbResult<FarmSnapshot> {
        let farm = self
            .get_farm(farm_id)?
            .ok_or_else(|| DbError::NotFound(format!("farm {}", farm_id)))?;

        Ok(FarmSnapshot {
            animals: self.list_animals_for_farm(farm_id)?,
            active_alerts: self.list_active_alerts_for_farm(farm_id)?,
            farm,
        })
    }

    fn owner_snapshot(&self, owner_id: &str) -> DbResult<HerdSnapshot> {
        let mut active_alerts = Vec::new();
        for farm in self.list_farms_for_owner(owner_id)? {
            active_alerts.extend(self.list_active_alerts_for_farm(&farm.id)?);
        }
        active_alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(HerdSnapshot {
            animals: self.list_animals_for_owner(owner_id)?,
            active_alerts,
        })
    }

    fn global_snapshot(&self) -> DbResult<HerdSnapshot> {
        Ok(HerdSnapshot {
            animals: self.list_all_animals()?,
            active_alerts: self.list_active_alerts()?,
        })
    }
}
