//! # Revive Types
//!
//! Core domain types shared by the state store, the remediation client and
//! the recovery daemon.

pub mod ids;
pub mod record;
pub mod status;

pub use ids::{json_scalar, DeviceId, PortId};
pub use record::DeviceRecoveryRecord;
pub use status::OperStatus;
