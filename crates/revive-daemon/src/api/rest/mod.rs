//! REST endpoints for alert intake and status

pub mod handlers;
pub mod router;
pub mod state;
