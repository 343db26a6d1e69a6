//! # Revive Remediation
//!
//! Side effects recovery drives against the monitoring platform.
//!
//! - [`LibreNmsClient`]: the four LibreNMS REST calls recovery needs
//! - [`CommandRefresher`]: runs the local poller for one device
//! - [`Remediation`]: the façade intake and the recovery loop call, with
//!   per-operation failure policy; [`RemediationClient`] in production

pub mod client;
pub mod error;
pub mod librenms;
pub mod refresh;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use client::{Remediation, RemediationClient};
pub use error::{RemediationError, RemediationResult};
pub use librenms::{LibreNmsClient, LibreNmsConfig};
pub use refresh::{CommandRefresher, RefreshReport, StatusRefresher};
