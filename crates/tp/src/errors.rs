//! Planner error kinds.
//!
//! Plain hand-rolled enum rather than `thiserror`: this crate is
//! `no_std`-capable and its variant set is small and closed.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerError {
    /// The planner has not been initialized (`set_pos` never called).
    NotInitialized,
    /// A cycle time, velocity or acceleration argument was not positive.
    InvalidCycleTime,
    InvalidVelocity,
    InvalidAccel,
    /// A motion id referenced a segment not present in the queue.
    InvalidMotionId,
    /// The segment queue is at capacity.
    QueueFull,
    /// A `pop_front(n)` requested more items than are present.
    Underflow,
    /// A requested line, circle or arc has zero or near-zero length, or its
    /// defining points are degenerate (e.g. collinear circle points).
    DegenerateGeometry,
    /// `add_rigid_tap` was called without an active `Position` spindle sync.
    RigidTapNotSynchronized,
    /// Adding a move while the planner is aborting.
    Aborting,
}

impl core::fmt::Display for PlannerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            PlannerError::NotInitialized => "planner has no initial position set",
            PlannerError::InvalidCycleTime => "cycle time must be positive",
            PlannerError::InvalidVelocity => "velocity must be non-negative",
            PlannerError::InvalidAccel => "acceleration must be positive",
            PlannerError::InvalidMotionId => "motion id not found in queue",
            PlannerError::QueueFull => "segment queue is full",
            PlannerError::Underflow => "pop_front requested more items than queued",
            PlannerError::DegenerateGeometry => "move geometry is degenerate",
            PlannerError::RigidTapNotSynchronized => {
                "rigid tap requires an active position-synchronized spindle"
            }
            PlannerError::Aborting => "planner is aborting; new moves are rejected",
        };
        f.write_str(msg)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PlannerError {}
