//! Shift-register interface for the zone valve hardware
//!
//! This crate defines the line-level interface between the daemon and
//! platform-specific GPIO implementations, plus the serialization protocol
//! that clocks zone status bits into the daisy-chained shift register. It
//! contains no platform code itself.

mod mock;
mod register;
mod traits;

pub use mock::*;
pub use register::*;
pub use traits::*;
