//! Domain models for the herdcare system.

mod alert;
mod animal;
mod context;
mod farm;
mod medication;
mod records;
mod task;
mod treatment;

pub use alert::*;
pub use animal::*;
pub use context::*;
pub use farm::*;
pub use medication::*;
pub use records::*;
pub use task::*;
pub use treatment::*;
