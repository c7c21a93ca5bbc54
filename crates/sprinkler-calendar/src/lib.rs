//! Calendar event source for schedule reconciliation
//!
//! Defines the interface the scheduler polls for upcoming watering events,
//! plus the Google Calendar implementation and a mock for testing. Event
//! summaries carry the zone name; zone resolution happens later in the
//! schedule store.

mod google;
mod mock;
mod source;

pub use google::*;
pub use mock::*;
pub use source::*;
