//! Farm compliance report export.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::compliance::{farm_compliance, ComplianceSummary};
use crate::db::Database;
use crate::error::CoreResult;
use crate::models::CallerContext;

/// Report format version, bumped when columns change.
pub const REPORT_FORMAT_VERSION: &str = "1.0";

/// Compliance report for one farm.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FarmComplianceReport {
    pub metadata: ReportMetadata,
    pub summary: ComplianceSummary,
    pub animals: Vec<AnimalComplianceRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportMetadata {
    pub format_version: String,
    pub farm_id: String,
    pub farm_name: String,
    pub registration_number: Option<String>,
    /// Instant the report was evaluated at
    pub generated_at: String,
    /// Who requested it
    pub generated_by: String,
}

/// One animal's line in the report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnimalComplianceRow {
    pub animal_id: String,
    pub tag_id: String,
    pub name: Option<String>,
    pub species: String,
    /// Evaluated at report time, not the persisted column
    pub compliance_status: String,
    pub milk_safe: bool,
    pub meat_safe: bool,
    pub withdrawal_until_milk: Option<String>,
    pub withdrawal_until_meat: Option<String>,
}

impl FarmComplianceReport {
    /// Export to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export the per-animal rows to CSV.
    pub fn to_csv(&self) -> String {
        let mut csv = String::from(
            "tag_id,name,species,compliance_status,milk_safe,meat_safe,withdrawal_until_milk,withdrawal_until_meat\n",
        );

        for row in &self.animals {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{}\n",
                escape_csv(&row.tag_id),
                escape_csv(row.name.as_deref().unwrap_or("")),
                escape_csv(&row.species),
                row.compliance_status,
                row.milk_safe,
                row.meat_safe,
                row.withdrawal_until_milk.as_deref().unwrap_or(""),
                row.withdrawal_until_meat.as_deref().unwrap_or(""),
            ));
        }

        csv
    }
}

/// Builds compliance reports.
pub struct ReportExporter<'a> {
    db: &'a Database,
}

impl<'a> ReportExporter<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Report for a farm as of `now`. Same access rules as the farm view.
    pub fn farm_report(
        &self,
        ctx: &CallerContext,
        farm_id: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<FarmComplianceReport> {
        let compliance = farm_compliance(self.db, ctx, farm_id, now)?;
        let farm = &compliance.snapshot.farm;

        let animals = compliance
            .snapshot
            .animals
            .iter()
            .map(|animal| {
                let status = animal.withdrawal_window().evaluate(now);
                AnimalComplianceRow {
                    animal_id: animal.id.clone(),
                    tag_id: animal.tag_id.clone(),
                    name: animal.name.clone(),
                    species: animal.species.clone(),
                    compliance_status: status.as_str().to_string(),
                    milk_safe: status.milk_safe(),
                    meat_safe: status.meat_safe(),
                    withdrawal_until_milk: animal.withdrawal_until_milk.map(format_ts),
                    withdrawal_until_meat: animal.withdrawal_until_meat.map(format_ts),
                }
            })
            .collect();

        Ok(FarmComplianceReport {
            metadata: ReportMetadata {
                format_version: REPORT_FORMAT_VERSION.to_string(),
                farm_id: farm.id.clone(),
                farm_name: farm.farm_name.clone(),
                registration_number: farm.registration_number.clone(),
                generated_at: format_ts(now),
                generated_by: ctx.user_id.clone(),
            },
            summary: compliance.summary,
            animals,
        })
    }
}

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
