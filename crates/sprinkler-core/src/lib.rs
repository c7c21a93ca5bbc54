//! Core reconciliation engine for sprinklerd
//!
//! [`Controller`] owns the zone store, the schedule cache, and the shift
//! register, and runs every multi-step mutation (ownership arbitration,
//! schedule reconciliation, hash-gated hardware writes) as one logical
//! unit. [`SchedulerLoop`] drives it on the calendar polling interval.

mod controller;
mod scheduler;

pub use controller::*;
pub use scheduler::*;
