//! # Revive State
//!
//! Durable mapping from device id to recovery record.
//!
//! - [`DeviceStateStore`]: concurrent in-memory store shared by alert intake
//!   and the recovery loop
//! - [`StatePersistence`]: how the map reaches disk; [`JsonFileState`] in
//!   production, [`InMemoryState`] in tests

pub mod error;
pub mod persistence;
pub mod store;

pub use error::{StateError, StateResult};
pub use persistence::{DeviceMap, InMemoryState, JsonFileState, StatePersistence};
pub use store::{DeviceStateStore, RegisterOutcome, Registration, Removal};
