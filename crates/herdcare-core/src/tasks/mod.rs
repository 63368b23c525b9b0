//! Follow-up task scheduling and tracking.

mod policy;
mod tracker;

pub use policy::*;
pub use tracker::*;
