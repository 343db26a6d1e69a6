//! Revive daemon library
//!
//! This module provides the core components for the revive daemon:
//! - Alert intake and its REST webhook
//! - Recovery scheduling and reconciliation
//! - Configuration, logging, and server lifecycle

pub mod api;
pub mod config;
pub mod error;
pub mod intake;
pub mod logging;
pub mod scheduler;
pub mod server;

pub use config::ReviveConfig;
pub use error::{ApiError, DaemonError, DaemonResult};
pub use intake::{AlertFields, AlertIntake, IntakeError};
pub use scheduler::{DeviceOutcome, PassReport, RecoveryOrchestrator, WakeSignal};
pub use server::Server;
