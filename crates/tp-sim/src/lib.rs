//! # Planner simulation harness
//!
//! Drives `crates/tp`'s `Planner` through a scripted `MotionIo` (`SimIo`)
//! instead of real hardware, recording a serializable per-cycle status
//! trace (`SimHarness`) for scenario tests, manual replay via the
//! `scenario_runner` binary, and CI comparison against a golden trace.

pub mod capability;
pub mod harness;
pub mod scenario;

pub use capability::{IoScript, SimIo};
pub use harness::{SimHarness, TraceEntry};
pub use scenario::{Scenario, SimError};
