//! The forward/backward velocity optimizer: a reverse sweep over the queue
//! tail that propagates reachable final velocities under the acceleration
//! limit of each segment.

use crate::constants::MIN_SEGMENT_CYCLES;
use crate::math::sqrt;
use crate::queue::SegmentQueue;
use crate::segment::{OptimizationState, TermCond};

/// Maximum number of consecutive already-at-max segments to encounter
/// before exiting early in lazy mode.
const LAZY_PEAK_LIMIT: u32 = 4;

/// Sweeps backward from the tail of the queue (optionally bounded to
/// `depth` segments plus two guard elements), assigning `finalvel` to each
/// segment so that its successor can still decelerate to its own
/// `finalvel` within its own acceleration limit.
///
/// `lazy`: stop early after `LAZY_PEAK_LIMIT` consecutive segments are
/// clipped to their hard maximum (further sweeping cannot improve them).
pub fn run_optimization<const CAP: usize>(
    queue: &mut SegmentQueue<CAP>,
    cycle_time: f64,
    depth: Option<usize>,
    lazy: bool,
) {
    let len = queue.len();
    if len < 2 {
        return;
    }
    let bound = depth.map(|d| d + 2).unwrap_or(len).min(len);
    let start = len - bound;

    let mut consecutive_peaks = 0u32;

    // Iterate pairs (curr, prev) from the tail backward: curr = i, prev = i-1.
    let mut i = len - 1;
    while i > start {
        let prev_idx = i - 1;

        // Skip if curr is not finalized or prev is already executing.
        let curr_finalized = queue.item(i).map(|s| s.finalized).unwrap_or(false);
        let prev_progress = queue.item(prev_idx).map(|s| s.progress).unwrap_or(0.0);
        if !curr_finalized || prev_progress > 0.0 {
            i -= 1;
            continue;
        }

        let prev_term_cond = queue.item(prev_idx).map(|s| s.term_cond);
        if prev_term_cond != Some(TermCond::Tangent) {
            // A hard stop (or parabolic) resets the chain; nothing further
            // upstream can be affected through this junction.
            break;
        }

        let (curr_finalvel, curr_accel, curr_target, curr_maxvel_before) = {
            let curr = queue.item(i).unwrap();
            (curr.finalvel, curr.maxaccel, curr.target, curr.maxvel)
        };

        let v_back = sqrt(curr_finalvel * curr_finalvel + 2.0 * curr_accel * curr_target);

        let prev_maxvel = queue.item(prev_idx).unwrap().maxvel;
        let curr_maxvel_clip = curr_target / (cycle_time * MIN_SEGMENT_CYCLES);
        let curr_maxvel = curr_maxvel_before.min(curr_maxvel_clip);

        let clipped = v_back.min(prev_maxvel).min(curr_maxvel);
        let at_max = clipped >= prev_maxvel.min(curr_maxvel) - crate::constants::VEL_EPSILON;

        if let Some(curr) = queue.item_mut(i) {
            curr.maxvel = curr_maxvel;
        }
        if let Some(prev) = queue.item_mut(prev_idx) {
            prev.finalvel = clipped;
            if at_max {
                prev.optimization_state = OptimizationState::AtMax;
                consecutive_peaks += 1;
            } else {
                prev.optimization_state = OptimizationState::Untouched;
                consecutive_peaks = 0;
            }
        }

        if lazy && consecutive_peaks >= LAZY_PEAK_LIMIT {
            break;
        }

        if i == 0 {
            break;
        }
        i -= 1;
    }
}
