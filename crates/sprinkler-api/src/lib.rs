//! Protocol types for the sprinklerd command surface
//!
//! This crate defines the stable API between sprinklerd and its request
//! layer: the command set, the reply envelope, and the validation error
//! codes. Payload shapes follow the legacy state-file layout so existing
//! clients keep working unchanged.

mod commands;

pub use commands::*;

/// Key under which snapshot fingerprints appear in reply payloads.
///
/// Clients poll with the hash from their last snapshot; an unchanged
/// fingerprint lets the daemon answer with a skeleton payload instead of
/// the full event list.
pub const DATA_HASH_KEY: &str = "_data_hash";
