//! API request handlers

mod alerts;
mod health;

pub use alerts::*;
pub use health::*;
