//! System orchestration, startup, and shutdown logic.

pub mod admin_system;
pub mod tracing;

pub use admin_system::*;
pub use tracing::*;
