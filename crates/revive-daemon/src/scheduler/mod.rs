//! Recovery scheduling
//!
//! The scheduler is responsible for:
//! - Idling while no device is tracked
//! - Running a reconciliation pass every interval otherwise
//! - Waking up as soon as intake tracks a new device

mod reconciler;
mod wake;

pub use reconciler::{DeviceOutcome, PassReport, RecoveryOrchestrator};
pub use wake::WakeSignal;
