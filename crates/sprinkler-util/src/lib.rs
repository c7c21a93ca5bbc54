//! Shared utilities for sprinklerd
//!
//! This crate provides:
//! - The `EventId` newtype (opaque key minted by the calendar source)
//! - Legacy timestamp helpers (the state files predate this daemon)
//! - Default paths for config and state files

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;
