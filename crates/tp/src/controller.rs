//! Non-exception result codes returned by the controller API and by
//! `run_cycle`.

use crate::errors::PlannerError;

/// Outcome of a controller-API call or a cycle step. `Ok`/`Fail` cover the
/// input-validation paths; the remaining variants are advisory, non-fatal
/// outcomes a caller is expected to poll for rather than treat as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlResult {
    /// The call completed and had an effect.
    Ok,
    /// The call was rejected; state was not mutated.
    Fail(PlannerError),
    /// The call had nothing to do (e.g. `resume` while not paused).
    NoAction,
    /// An operation is in progress; the caller should poll again next tick.
    Waiting,
    /// Abort has completed; motion is fully stopped and the queue is clear.
    Stopped,
    /// The planner is decelerating (e.g. mid-abort, not yet stopped).
    Slowing,
}

impl ControlResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, ControlResult::Ok)
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, ControlResult::Fail(_))
    }
}

impl From<Result<(), PlannerError>> for ControlResult {
    fn from(r: Result<(), PlannerError>) -> Self {
        match r {
            Ok(()) => ControlResult::Ok,
            Err(e) => ControlResult::Fail(e),
        }
    }
}
