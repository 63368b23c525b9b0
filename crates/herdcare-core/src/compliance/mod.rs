//! Withdrawal compliance: evaluation, aggregation and the periodic sweep.
//!
//! ```text
//! Treatment ──► WithdrawalWindow ──► Animal.status
//!                                        │
//!               ComplianceSweep ◄────────┤  (elapsed windows, missed tasks)
//!                     │                  │
//!                     ▼                  ▼
//!              ComplianceAlert ──► ComplianceSummary ──► dashboards
//! ```

mod aggregator;
mod dashboard;
mod evaluator;
mod sweep;

pub use aggregator::*;
pub use dashboard::*;
pub use evaluator::*;
pub use sweep::*;
