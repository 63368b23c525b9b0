//! Treatment recording.
//!
//! Control flow for one treatment:
//!
//! ```text
//! NewTreatment ─► validate ─► medication lookup ─┐
//!                                                ▼
//!                ┌──────────── one transaction ─────────────┐
//!                │ insert treatment                          │
//!                │ overwrite animal windows + status         │
//!                │ insert follow-up tasks                    │
//!                └───────────────────────────────────────────┘
//! ```

mod recorder;

pub use recorder::*;
