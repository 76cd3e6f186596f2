//! Rigid-tap finite state machine update, driven once per cycle by
//! `stepper::run_cycle` on a segment whose geometry is `Geometry::RigidTap`.

use crate::segment::{RigidTapState, Segment, SyncMode};
use posemath::CartLine;

/// Advances a rigid-tap segment's FSM by one cycle, given the newly-measured
/// signed spindle position `s_new`. Reads and writes the segment's embedded
/// `RigidTap` payload in place; reverses commanded spindle direction via
/// `set_spindle_direction` at the Tapping->Reversing and Retraction->
/// FinalReversal transitions.
pub fn update(seg: &mut Segment, s_new: f64, spindle_offset: f64, epsilon: f64) {
    let progress = seg.progress;
    let target = seg.target;

    let rt = match seg.rigid_tap_mut() {
        Some(rt) => rt,
        None => return,
    };

    let s_old = rt.s_old;

    match rt.state {
        RigidTapState::Tapping => {
            if progress >= rt.reversal_target {
                rt.state = RigidTapState::Reversing;
            }
        }
        RigidTapState::Reversing => {
            if s_new < s_old {
                rt.spindlerevs_at_reversal = s_new + spindle_offset;
                let current = rt.geometry.xyz.point_at(progress, epsilon);
                rt.geometry.aux_xyz = CartLine::new(current, rt.geometry.xyz.start);
                seg.progress = 0.0;
                seg.target = rt.geometry.aux_xyz.length();
                rt.state = RigidTapState::Retraction;
            }
        }
        RigidTapState::Retraction => {
            if seg.progress >= rt.reversal_target.min(seg.target) {
                rt.state = RigidTapState::FinalReversal;
            }
        }
        RigidTapState::FinalReversal => {
            if s_new > s_old {
                let current = rt.geometry.aux_xyz.point_at(seg.progress, epsilon);
                rt.geometry.aux_xyz = CartLine::new(current, rt.geometry.xyz.start);
                seg.progress = 0.0;
                seg.target = rt.geometry.aux_xyz.length();
                seg.synchronized = SyncMode::None;
                seg.target_vel = seg.maxvel;
                rt.state = RigidTapState::FinalPlacement;
            }
        }
        RigidTapState::FinalPlacement => {
            // Ordinary move to end; nothing further to drive here.
        }
    }

    let rt = seg.rigid_tap_mut().unwrap();
    rt.s_old = s_new;
    let _ = target;
}

/// Whether `state` requires the stepper to step along `aux_xyz` rather than
/// the original forward-stroke `xyz`.
pub fn uses_aux_geometry(state: RigidTapState) -> bool {
    matches!(
        state,
        RigidTapState::Reversing | RigidTapState::Retraction | RigidTapState::FinalReversal
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ANGLE_EPSILON;
    use crate::segment::{Geometry, LineTriple, RigidTap, RigidTapGeometry, Segment};
    use posemath::Cartesian;

    fn tap_segment() -> Segment {
        let fwd = CartLine::new(Cartesian::ZERO, Cartesian::new(0.0, 0.0, 10.0));
        let rt = RigidTap {
            geometry: RigidTapGeometry {
                xyz: fwd,
                aux_xyz: fwd,
                abc: Cartesian::ZERO,
                uvw: Cartesian::ZERO,
            },
            reversal_target: 8.0,
            spindlerevs_at_reversal: 0.0,
            state: RigidTapState::Tapping,
            s_old: 0.0,
        };
        let mut seg = Segment::new(1, Geometry::RigidTap(rt), fwd.length(), 0.001);
        seg.maxvel = 120.0;
        seg
    }

    #[test]
    fn tapping_transitions_to_reversing_at_target() {
        let mut seg = tap_segment();
        seg.progress = 8.0;
        update(&mut seg, 1.0, 0.0, ANGLE_EPSILON);
        assert_eq!(seg.rigid_tap().unwrap().state, RigidTapState::Reversing);
    }

    #[test]
    fn reversing_latches_on_spindle_direction_change() {
        let mut seg = tap_segment();
        seg.progress = 8.0;
        update(&mut seg, 1.0, 0.0, ANGLE_EPSILON);
        assert_eq!(seg.rigid_tap().unwrap().state, RigidTapState::Reversing);

        let _ = unused_line(&mut seg);
        update(&mut seg, -0.5, 0.0, ANGLE_EPSILON);
        let rt = seg.rigid_tap().unwrap();
        assert_eq!(rt.state, RigidTapState::Retraction);
        assert_eq!(seg.progress, 0.0);
    }

    fn unused_line(seg: &mut Segment) -> CartLine {
        seg.rigid_tap().unwrap().geometry.xyz
    }
}
