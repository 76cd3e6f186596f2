//! Spindle synchronization: `Velocity` mode (feed tracks spindle speed
//! directly) and `Position` mode (open-loop accel latch, then closed-loop
//! position-error tracking), driven once per cycle for a synchronized
//! segment.

use crate::constants::SYNC_ACCEL_MAX_CYCLES;
use crate::math::sqrt;
use crate::segment::Segment;

/// `Velocity`-mode sync: requested velocity tracks `|spindle_speed_in| *
/// uu_per_rev`, reduced by the successor's progress if it is already
/// blending in (so the pair never both demand full speed at once).
pub fn sync_velocity_mode(seg: &mut Segment, spindle_speed_in: f64, next_progress: f64) {
    let target = spindle_speed_in.abs() * seg.uu_per_rev;
    seg.target_vel = (target - next_progress).max(0.0);
}

/// `Position`-mode sync state carried across cycles for a single segment's
/// acceleration ramp, owned by the caller (the planner's `SpindleState`
/// fields `offset`/`revs` plus this segment's own `sync_accel` counter).
pub struct PositionSyncInput {
    pub revs: f64,
    pub offset: f64,
    pub cycle_time: f64,
    pub scaled_accel: f64,
}

/// Advances `Position`-mode sync by one cycle. Returns the computed
/// `target_vel`; mutates `seg.sync_accel` (the open-loop ramp counter) and
/// `seg.currentvel`-adjacent bookkeeping is left to the stepper, which reads
/// back the returned velocity.
pub fn sync_position_mode(seg: &mut Segment, input: &PositionSyncInput, next_progress_if_blending: f64) -> f64 {
    let p_des = (input.revs - input.offset) * seg.uu_per_rev;
    let e = p_des - seg.progress - next_progress_if_blending;

    if seg.sync_accel > 0 {
        seg.sync_accel += 1;
        let counter = seg.sync_accel as f64;
        let spindle_vel = if input.cycle_time * counter > 0.0 {
            input.revs / (input.cycle_time * counter)
        } else {
            0.0
        };
        let v_tgt = spindle_vel * seg.uu_per_rev;

        if seg.currentvel >= v_tgt || seg.sync_accel >= SYNC_ACCEL_MAX_CYCLES {
            return v_tgt;
        }
        return seg.maxvel;
    }

    let sign = if e >= 0.0 { 1.0 } else { -1.0 };
    let errorvel = sign * sqrt(e.abs() * input.scaled_accel.max(0.0));
    let spindle_vel = (input.revs - input.offset).abs() * seg.uu_per_rev;
    (spindle_vel + errorvel).max(0.0)
}

/// Latches the open-loop acceleration ramp: called once `currentvel` has
/// reached the ramp's target, fixing `offset` so position tracking starts
/// from the current progress rather than drifting.
pub fn latch_accel_ramp(seg: &mut Segment, revs: f64) -> f64 {
    seg.sync_accel = 0;
    revs - seg.progress / seg.uu_per_rev.max(f64::MIN_POSITIVE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::{Geometry, LineTriple, Segment};
    use posemath::{CartLine, Cartesian};

    fn line_seg() -> Segment {
        let line = CartLine::new(Cartesian::ZERO, Cartesian::new(10.0, 0.0, 0.0));
        let triple = LineTriple { xyz: line, uvw: line, abc: line };
        let mut seg = Segment::new(1, Geometry::Linear(triple), line.length(), 0.001);
        seg.uu_per_rev = 1.0;
        seg.maxvel = 200.0;
        seg
    }

    #[test]
    fn velocity_mode_tracks_spindle_speed() {
        let mut seg = line_seg();
        sync_velocity_mode(&mut seg, 10.0, 0.0);
        assert!((seg.target_vel - 10.0).abs() < 1e-9);
    }

    #[test]
    fn velocity_mode_reduces_for_blending_successor() {
        let mut seg = line_seg();
        sync_velocity_mode(&mut seg, 10.0, 3.0);
        assert!((seg.target_vel - 7.0).abs() < 1e-9);
    }

    #[test]
    fn position_mode_open_loop_requests_maxvel_before_latch() {
        let mut seg = line_seg();
        seg.sync_accel = 1;
        seg.currentvel = 0.0;
        let input = PositionSyncInput { revs: 0.001, offset: 0.0, cycle_time: 0.001, scaled_accel: 100.0 };
        let v = sync_position_mode(&mut seg, &input, 0.0);
        assert!(v >= 0.0);
    }
}
