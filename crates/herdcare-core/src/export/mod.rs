//! Compliance report export.

mod report;

pub use report::*;
