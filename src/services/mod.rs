//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the analysis flow, rendering and timers so route
//! handlers can stay focused on protocol translation.

pub mod advisor;
pub mod debounce;
pub mod display;
pub mod preview;
pub mod sweeper;
pub mod workspace;
