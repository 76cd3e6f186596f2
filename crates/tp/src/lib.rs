//! A real-time trajectory planner for multi-axis coordinated motion.
//!
//! The planner owns a fixed-capacity queue of motion segments (lines,
//! circular/helical arcs, rigid taps, and synthesized blend arcs), blends
//! adjacent segments at tool-path corners, sweeps the queue tail backward to
//! compute reachable final velocities, and advances the head segment once
//! per servo tick via [`Planner::run_cycle`].
//!
//! Two threads are expected to drive this crate: a non-real-time producer
//! calling `add_line`/`add_circle`/`add_rigid_tap`/`set_*`, and a hard
//! real-time servo thread calling `run_cycle` exactly once per period. This
//! crate does not itself provide synchronization between them; the caller is
//! expected to enforce exclusion (see the crate's design notes).

#![cfg_attr(not(feature = "std"), no_std)]

pub mod blend;
pub mod capability;
pub mod constants;
pub mod controller;
pub mod errors;
pub(crate) mod math;
pub mod optimizer;
pub mod planner;
pub mod queue;
pub mod rigid_tap;
pub mod segment;
pub mod spindle;
pub mod stepper;

pub use capability::MotionIo;
pub use controller::ControlResult;
pub use errors::PlannerError;
pub use planner::{MotionType, Planner};
pub use segment::{AccelMode, RigidTapState, Segment, SyncMode, TermCond};

pub use posemath::{CartCircle, CartLine, Cartesian, Pose9, SphericalArc};
