//! The cycle stepper: advances the head segment once per servo tick.
//!
//! `Planner::run_cycle` is the hard-real-time entry point. It never blocks
//! and never allocates; every early-return path here corresponds to one of
//! the numbered steps in the design (status init, early-stop flagging,
//! abort handling, waiting checks, activation gates, rigid-tap FSM, spindle
//! sync, trapezoidal/ramp update, split-cycle and parabolic-overlap
//! handling, end-condition check, DIO/AIO emission, status, removal).

use crate::capability::MotionIo;
use crate::constants::{POS_EPSILON, TIME_EPSILON, VEL_EPSILON};
use crate::controller::ControlResult;
use crate::math::sqrt;
use crate::optimizer::run_optimization;
use crate::planner::{MotionType, Planner};
use crate::rigid_tap;
use crate::segment::{AccelMode, Geometry, RigidTapState, Segment, SyncMode, TermCond};
use crate::spindle::{self, PositionSyncInput};
use posemath::Cartesian;

/// Result of a single trapezoidal or ramp velocity update.
struct VelocityStep {
    new_vel: f64,
    new_progress: f64,
    on_final_decel: bool,
}

/// Trapezoidal velocity update (spec 4.5). `dx` is computed internally from
/// `seg.target - seg.progress`.
fn trapezoidal_update(
    seg: &Segment,
    dt: f64,
    scaled_accel: f64,
    feed_scale: f64,
    vlimit: f64,
    clip_to_vlimit: bool,
) -> VelocityStep {
    let dx = (seg.target - seg.progress).max(0.0);
    let a = scaled_accel.max(crate::constants::VEL_EPSILON);
    let v = seg.currentvel;
    let v_f = seg.finalvel * feed_scale;

    let half_a_dt = a * dt / 2.0;
    let d = v_f * v_f + a * (2.0 * dx - v * dt) + half_a_dt * half_a_dt;
    let unclipped = (-half_a_dt + sqrt(d.max(half_a_dt * half_a_dt))).max(0.0);

    let target_cap = seg.target_vel.max(0.0);
    let mut v_next = unclipped.min(target_cap);
    if clip_to_vlimit {
        v_next = v_next.min(vlimit.max(0.0));
    }
    let clipped_before_accel = v_next < unclipped - VEL_EPSILON;

    let a_applied = ((v_next - v) / dt).clamp(-a, a);
    let v_final = (v + a_applied * dt).max(0.0);

    let mut progress = seg.progress + (v + v_final) * dt / 2.0;
    progress = progress.min(seg.target);

    // If the remaining distance would be covered within one more cycle at
    // the current speed, snap to the end rather than leave a fractional
    // residue that would require a near-zero split next tick.
    if v_final > VEL_EPSILON && (seg.target - progress) <= v_final * dt {
        progress = seg.target;
    }
    if (seg.target - progress).abs() < POS_EPSILON {
        progress = seg.target;
    }

    let on_final_decel = !clipped_before_accel && a_applied < 0.0;

    VelocityStep { new_vel: v_final, new_progress: progress, on_final_decel }
}

/// Ramp velocity update: only valid for `Tangent`-terminated segments.
/// Falls back to the trapezoidal update when `finalvel` is near zero.
fn ramp_update(
    seg: &Segment,
    dt: f64,
    scaled_accel: f64,
    feed_scale: f64,
    vlimit: f64,
    clip_to_vlimit: bool,
) -> VelocityStep {
    let v_f = seg.finalvel * feed_scale;
    if v_f < VEL_EPSILON || seg.term_cond != TermCond::Tangent {
        return trapezoidal_update(seg, dt, scaled_accel, feed_scale, vlimit, clip_to_vlimit);
    }
    let v = seg.currentvel;
    let dx = (seg.target - seg.progress).max(0.0);
    let avg = (v + v_f) / 2.0;
    let time_to_end = if avg > VEL_EPSILON { dx / avg } else { 0.0 };
    let a = if time_to_end > TIME_EPSILON {
        ((v_f - v) / time_to_end).clamp(-scaled_accel, scaled_accel)
    } else {
        0.0
    };
    let mut v_next = (v + a * dt).max(0.0);
    if clip_to_vlimit {
        v_next = v_next.min(vlimit.max(0.0));
    }
    v_next = v_next.min(seg.target_vel.max(0.0));

    let mut progress = seg.progress + (v + v_next) * dt / 2.0;
    progress = progress.min(seg.target);
    if (seg.target - progress).abs() < POS_EPSILON {
        progress = seg.target;
    }

    VelocityStep { new_vel: v_next, new_progress: progress, on_final_decel: a < 0.0 }
}

fn run_velocity_update(
    seg: &Segment,
    dt: f64,
    scaled_accel: f64,
    feed_scale: f64,
    vlimit: f64,
    clip_to_vlimit: bool,
) -> VelocityStep {
    match seg.accel_mode {
        AccelMode::Trapezoidal => {
            trapezoidal_update(seg, dt, scaled_accel, feed_scale, vlimit, clip_to_vlimit)
        }
        AccelMode::Ramp => ramp_update(seg, dt, scaled_accel, feed_scale, vlimit, clip_to_vlimit),
    }
}

/// Whether this segment kind only moves rotary (ABC) axes -- such segments
/// are never clipped by the tool-tip `vlimit`.
fn is_pure_rotary(_seg: &Segment) -> bool {
    // No segment kind in this planner moves ABC exclusively without a
    // corresponding XYZ/UVW move; the hook exists so the vlimit clip
    // condition in `run_cycle` stays explicit about the rotary-only case.
    false
}

fn clip_to_vlimit_for(seg: &Segment) -> bool {
    !is_pure_rotary(seg) && seg.synchronized != SyncMode::Position
}

/// Scaled tangential acceleration for `seg`, halved while it is the
/// overlapping successor in a parabolic blend (`blend_prev` marks that its
/// predecessor was parabolic).
fn scaled_accel(seg: &Segment, overlapping: bool) -> f64 {
    if seg.blend_prev && overlapping {
        seg.maxaccel * 0.5
    } else {
        seg.maxaccel
    }
}

/// Flushes a segment's queued DIO/AIO edges through `io` and clears them.
fn flush_syncdio(seg: &mut Segment, io: &mut dyn MotionIo) {
    if seg.syncdio.is_empty() {
        return;
    }
    for edge in seg.syncdio.edges.iter() {
        match *edge {
            crate::segment::SyncIo::Digital { index, on } => io.dio_write(index, on),
            crate::segment::SyncIo::Analog { index, value } => io.aio_write(index, value),
        }
    }
    seg.syncdio.clear();
}

impl<const CAP: usize> Planner<CAP> {
    /// Advances the head segment by one servo period. Must be called
    /// exactly once per cycle by the servo thread; never blocks.
    pub fn run_cycle(&mut self, io: &mut dyn MotionIo) -> ControlResult {
        let dt = self.cycle_time();
        let feed_scale = io.net_feed_scale().max(0.0);
        self.set_max_feed_scale(feed_scale);

        if self.queue().is_empty() {
            if self.is_aborting() {
                self.clear_abort();
            }
            self.set_reported(MotionType::None, 0.0, 0);
            return ControlResult::Ok;
        }

        // -- step 2: flag early stops on (head,next) and (next,next2) -----
        self.flag_sync_mismatch_stop(0);
        self.flag_sync_mismatch_stop(1);

        // -- step 3: force-finalize the segment two ahead of the head, then
        // re-run the optimizer so its final velocity propagates backward
        // into segments already in the queue (`tpForceFinalizeSegment`,
        // tp.c 2656-2663).
        let force_finalized = match self.queue_mut().item_mut(2) {
            Some(seg) => {
                seg.finalized = true;
                true
            }
            None => false,
        };
        if force_finalized {
            run_optimization(self.queue_mut(), dt, None, true);
        }

        // -- step 4: abort handling ----------------------------------------
        if self.is_aborting() {
            return self.step_abort(io, dt, feed_scale);
        }

        if self.is_paused() {
            self.set_reported(
                self.queue().item(0).map(report_motion_type).unwrap_or(MotionType::None),
                0.0,
                self.queue().item(0).map(|s| s.id).unwrap_or(0),
            );
            return ControlResult::Waiting;
        }

        // -- step 5: waiting checks ------------------------------------------
        if let Some(result) = self.check_waiting(io) {
            return result;
        }

        // -- step 6: activation gates ----------------------------------------
        if let Some(result) = self.activate_head(io) {
            return result;
        }

        self.step_active(io, dt, feed_scale)
    }

    /// Forces `term_cond = Stop` on segment `idx` when exactly one of
    /// `(idx, idx+1)` requires spindle-sync position or at-speed and the
    /// other does not (a synchronized move can never blend with an
    /// unsynchronized one without losing lock).
    fn flag_sync_mismatch_stop(&mut self, idx: usize) {
        let (a_sync, a_atspeed) = match self.queue().item(idx) {
            Some(s) => (s.synchronized == SyncMode::Position, s.atspeed),
            None => return,
        };
        let (b_sync, b_atspeed) = match self.queue().item(idx + 1) {
            Some(s) => (s.synchronized == SyncMode::Position, s.atspeed),
            None => return,
        };
        if a_sync != b_sync || a_atspeed != b_atspeed {
            if let Some(s) = self.queue_mut().item_mut(idx) {
                s.term_cond = TermCond::Stop;
            }
        }
    }

    /// Step 4: decelerate toward zero while aborting; reset to idle once
    /// stopped.
    fn step_abort(&mut self, _io: &mut dyn MotionIo, dt: f64, feed_scale: f64) -> ControlResult {
        let head_stopped = self
            .queue()
            .item(0)
            .map(|s| s.currentvel < VEL_EPSILON)
            .unwrap_or(true);
        let next_stopped = self
            .queue()
            .item(1)
            .map(|s| s.currentvel < VEL_EPSILON)
            .unwrap_or(true);
        let blocked = self.spindle().waiting_for_index || self.spindle().waiting_for_atspeed;

        if (head_stopped && next_stopped) || blocked {
            let pos = self.current_pos();
            self.clear();
            self.set_current_pos(pos);
            self.set_reported(MotionType::None, 0.0, 0);
            return ControlResult::Stopped;
        }

        let amax = self.default_amax();
        if let Some(mut seg) = self.queue().item(0).cloned() {
            let old_progress = seg.progress;
            seg.finalvel = 0.0;
            seg.target_vel = 0.0;
            let step = trapezoidal_update(&seg, dt, amax, feed_scale, self.vlimit(), true);
            seg.currentvel = step.new_vel;
            seg.progress = step.new_progress;
            let carry = (self.current_pos().uvw, self.current_pos().abc);
            let delta = seg.pose_delta(old_progress, seg.progress, POS_EPSILON, carry);
            let mut pos = self.current_pos();
            pos.xyz = pos.xyz + delta.xyz;
            pos.uvw = pos.uvw + delta.uvw;
            pos.abc = pos.abc + delta.abc;
            self.set_current_pos(pos);
            let id = seg.id;
            let vel = seg.currentvel;
            if let Some(s) = self.queue_mut().item_mut(0) {
                *s = seg;
            }
            self.set_reported(MotionType::None, vel, id);
        }
        ControlResult::Slowing
    }

    /// Step 5: honor `waiting_for_index`/`waiting_for_atspeed`, self-healing
    /// if the watched segment id no longer matches the head.
    fn check_waiting(&mut self, io: &mut dyn MotionIo) -> Option<ControlResult> {
        let head_id = self.queue().item(0).map(|s| s.id);

        if self.spindle().waiting_for_index {
            if !io.spindle_index_enable() {
                // The index line stays armed until the pulse is captured;
                // hardware clears it itself once that happens.
                self.spindle_mut().waiting_for_index = false;
                self.spindle_mut().synced = true;
                self.spindle_mut().revs = 0.0;
                if let Some(s) = self.queue_mut().item_mut(0) {
                    s.sync_accel = 1;
                }
            } else if head_id.is_none() {
                self.spindle_mut().waiting_for_index = false;
            } else {
                return Some(ControlResult::Waiting);
            }
        }

        if self.spindle().waiting_for_atspeed {
            if io.spindle_is_atspeed() {
                self.spindle_mut().waiting_for_atspeed = false;
            } else if head_id.is_none() {
                self.spindle_mut().waiting_for_atspeed = false;
            } else {
                return Some(ControlResult::Waiting);
            }
        }

        None
    }

    /// Step 6: gate activation of a not-yet-active head segment on
    /// at-speed, rotary-unlock and position-sync-index conditions.
    fn activate_head(&mut self, io: &mut dyn MotionIo) -> Option<ControlResult> {
        let (active, atspeed, indexrotary, sync) = match self.queue().item(0) {
            Some(s) => (s.active, s.atspeed, s.indexrotary, s.synchronized),
            None => return None,
        };
        if active {
            return None;
        }

        let needs_atspeed = atspeed || (sync == SyncMode::Position && !self.spindle().synced);
        if needs_atspeed && !io.spindle_is_atspeed() {
            self.spindle_mut().waiting_for_atspeed = true;
            return Some(ControlResult::Waiting);
        }

        if let Some(axis) = indexrotary {
            if !io.rotary_is_unlocked(axis) {
                io.rotary_unlock(axis, true);
                return Some(ControlResult::Waiting);
            }
        }

        if sync == SyncMode::Position && !self.spindle().synced {
            io.set_spindle_index_enable(true);
            self.spindle_mut().waiting_for_index = true;
            self.spindle_mut().offset = 0.0;
            return Some(ControlResult::Waiting);
        }

        if let Some(s) = self.queue_mut().item_mut(0) {
            s.active = true;
            s.active_depth = 1;
        }
        None
    }

    /// Steps 7-13: rigid-tap FSM, spindle sync, velocity update, split
    /// cycle / parabolic overlap, end-condition check, DIO, status, removal.
    fn step_active(&mut self, io: &mut dyn MotionIo, dt: f64, feed_scale: f64) -> ControlResult {
        let mut head = match self.queue().item(0).cloned() {
            Some(s) => s,
            None => return ControlResult::Ok,
        };
        let old_progress = head.progress;

        // -- step 7: rigid-tap FSM -----------------------------------------
        if head.is_rigid_tap() {
            let old_state = head.rigid_tap().map(|rt| rt.state);
            let s_new = io.spindle_revs();
            let offset = self.spindle().offset;
            rigid_tap::update(&mut head, s_new, offset, crate::constants::ANGLE_EPSILON);
            let new_state = head.rigid_tap().map(|rt| rt.state);
            if old_state != new_state
                && matches!(
                    new_state,
                    Some(RigidTapState::Reversing) | Some(RigidTapState::FinalReversal)
                )
            {
                io.set_spindle_direction(-io.spindle_direction());
            }
        }

        // -- step 8: spindle sync update ------------------------------------
        let next_progress = self.queue().item(1).map(|s| s.progress).unwrap_or(0.0);
        match head.synchronized {
            SyncMode::Velocity => {
                spindle::sync_velocity_mode(&mut head, io.spindle_speed_in(), next_progress);
            }
            SyncMode::Position => {
                let revs = io.spindle_revs();
                self.spindle_mut().revs = revs;
                let input = PositionSyncInput {
                    revs,
                    offset: self.spindle().offset,
                    cycle_time: dt,
                    scaled_accel: head.maxaccel,
                };
                let v = spindle::sync_position_mode(&mut head, &input, 0.0);
                if head.sync_accel > 0 && head.currentvel >= v {
                    self.spindle_mut().offset = spindle::latch_accel_ramp(&mut head, revs);
                }
                head.target_vel = v.max(0.0);
            }
            SyncMode::None => {}
        }

        // -- step 9/10: velocity update, split cycle, parabolic overlap ----
        let clip_vlimit = clip_to_vlimit_for(&head);
        let accel = scaled_accel(&head, false);

        let was_splitting = head.splitting;
        let fragment_dt = if was_splitting { head.cycle_time } else { dt };

        let step = run_velocity_update(
            &head,
            fragment_dt,
            accel,
            feed_scale,
            self.vlimit(),
            clip_vlimit,
        );
        head.currentvel = step.new_vel;
        head.progress = step.new_progress;
        head.on_final_decel = step.on_final_decel;

        let carry = (self.current_pos().uvw, self.current_pos().abc);
        let head_delta = head.pose_delta(old_progress, head.progress, POS_EPSILON, carry);

        let mut overlap_engaged = false;
        let mut overlap_delta = Cartesian::ZERO;
        let mut overlap_vel = 0.0;

        if head.term_cond == TermCond::Parabolic {
            if head.blend_vel <= 0.0 {
                self.init_parabolic_blend_velocity(&mut head);
            }
            if head.currentvel <= head.blend_vel && head.blend_vel > VEL_EPSILON {
                if head.vel_at_blend_start <= 0.0 {
                    head.vel_at_blend_start = head.blend_vel;
                }
                if let Some((delta, vel)) =
                    self.advance_overlap_successor(&head, dt, feed_scale)
                {
                    overlap_engaged = true;
                    overlap_delta = delta;
                    overlap_vel = vel;
                }
            }
        }

        if was_splitting && fragment_dt < dt {
            // Remainder of the tick runs on the successor, not carried to a
            // third segment (open question (a): no cascading carryover).
            head.remove = true;
            head.splitting = false;
            let remainder = dt - fragment_dt;
            if let Some(mut next) = self.queue().item(1).cloned() {
                let next_old = next.progress;
                let next_accel = scaled_accel(&next, next.blend_prev);
                let next_step = run_velocity_update(
                    &next,
                    remainder,
                    next_accel,
                    feed_scale,
                    self.vlimit(),
                    clip_to_vlimit_for(&next),
                );
                next.currentvel = next_step.new_vel;
                next.progress = next_step.new_progress;
                let next_delta = next.pose_delta(next_old, next.progress, POS_EPSILON, carry);
                overlap_delta = overlap_delta + next_delta.xyz;
                overlap_engaged = true;
                overlap_vel = next.currentvel;
                if let Some(s) = self.queue_mut().item_mut(1) {
                    *s = next;
                }
            }
        }

        // -- step 10: end-condition check ------------------------------------
        if !head.remove {
            let dtg = head.dtg();
            let v_for_estimate = head.currentvel.max(VEL_EPSILON);
            let time_to_end = dtg / v_for_estimate;
            if dtg < POS_EPSILON {
                head.progress = head.target;
                head.remove = true;
            } else if time_to_end < dt && !was_splitting {
                head.splitting = true;
                head.cycle_time = time_to_end.max(TIME_EPSILON);
            }
        }

        // -- step 11: DIO/AIO on first advance --------------------------------
        if !head.active_depth_seen() {
            flush_syncdio(&mut head, io);
            head.active_depth = 2;
        }

        // -- step 12: status ---------------------------------------------------
        let reported_vel = if overlap_engaged { head.currentvel + overlap_vel } else { head.currentvel };
        let motion_type = if overlap_engaged {
            MotionType::Blend
        } else {
            report_motion_type(&head)
        };
        let id = head.id;

        let mut pos = self.current_pos();
        pos.xyz = pos.xyz + head_delta.xyz + overlap_delta;
        pos.uvw = pos.uvw + head_delta.uvw;
        pos.abc = pos.abc + head_delta.abc;
        self.set_current_pos(pos);
        self.set_reported(motion_type, reported_vel, id);

        let remove_head = head.remove;
        let (head_synchronized, head_target, head_uu_per_rev) =
            (head.synchronized, head.target, head.uu_per_rev);
        if let Some(s) = self.queue_mut().item_mut(0) {
            *s = head;
        }

        // -- step 13: remove completed segments --------------------------------
        if remove_head {
            if head_synchronized != SyncMode::None {
                let rebase = head_target / head_uu_per_rev.max(f64::MIN_POSITIVE);
                self.spindle_mut().offset += rebase;
            } else {
                self.spindle_mut().offset = 0.0;
            }
            let _ = self.queue_mut().pop_front(1);
            if self.queue().is_empty() {
                self.set_reported(MotionType::None, 0.0, 0);
            }
        }

        ControlResult::Ok
    }

    /// Lazily computes and caches `blend_vel`/`triangle_vel` for a
    /// `Parabolic`-terminated head segment, using the successor's geometry
    /// to derive the junction angle.
    fn init_parabolic_blend_velocity(&self, head: &mut Segment) {
        let next = match self.queue().item(1) {
            Some(n) => n,
            None => return,
        };
        let theta =
            crate::blend::generic_junction_theta(head, next, crate::constants::ANGLE_EPSILON)
                .unwrap_or(0.0);
        let tolerance = crate::blend::find_blend_tolerance(head, next);
        let (v_b1, _v_b2, triangle, _) =
            crate::blend::parabolic_blend_velocities(head, next, theta, tolerance);
        head.blend_vel = v_b1.max(VEL_EPSILON);
        head.triangle_vel = triangle;
    }

    /// Advances the parabolic-overlap successor by one cycle alongside the
    /// head. Returns its Cartesian XYZ delta and reported velocity.
    fn advance_overlap_successor(
        &mut self,
        head: &Segment,
        dt: f64,
        feed_scale: f64,
    ) -> Option<(Cartesian, f64)> {
        let mut next = self.queue().item(1).cloned()?;
        let old_progress = next.progress;

        let scale = if head.blend_vel > VEL_EPSILON {
            ((head.vel_at_blend_start - head.currentvel) / head.blend_vel).clamp(0.0, 1.0)
        } else {
            1.0
        };
        next.target_vel = next.reqvel.min(next.maxvel) * scale;

        let accel = scaled_accel(&next, next.blend_prev);
        let step = run_velocity_update(
            &next,
            dt,
            accel,
            feed_scale,
            self.vlimit(),
            clip_to_vlimit_for(&next),
        );
        next.currentvel = step.new_vel;
        next.progress = step.new_progress;
        next.active = true;

        let carry = (self.current_pos().uvw, self.current_pos().abc);
        let delta = next.pose_delta(old_progress, next.progress, POS_EPSILON, carry);
        let vel = next.currentvel;

        if let Some(s) = self.queue_mut().item_mut(1) {
            *s = next;
        }
        Some((delta.xyz, vel))
    }
}

/// Reports the externally-visible motion type for a segment.
fn report_motion_type(seg: &Segment) -> MotionType {
    match &seg.geometry {
        Geometry::Linear(_) => MotionType::Linear,
        Geometry::Circular(_) => MotionType::Circular,
        Geometry::RigidTap(_) => MotionType::RigidTap,
        Geometry::SphericalArc(_) => MotionType::Blend,
    }
}

impl Segment {
    /// Whether step 11's DIO flush has already run for this segment's
    /// current activation (`active_depth` is bumped to 2 once flushed, to
    /// 1 on activation, left at 0 before activation).
    fn active_depth_seen(&self) -> bool {
        self.active_depth >= 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::Planner;
    use crate::segment::{SyncMode, TermCond};
    use posemath::Pose9;

    /// A scripted `MotionIo` with fixed/controllable responses, used only
    /// by this module's own unit tests; the full scripted harness lives in
    /// `tp-sim`.
    struct FixedIo {
        feed_scale: f64,
        spindle_speed: f64,
        spindle_direction: i8,
        spindle_revs: f64,
        spindle_speed_in: f64,
        atspeed: bool,
        index_enable: bool,
        rotary_unlocked: bool,
    }

    impl Default for FixedIo {
        fn default() -> Self {
            FixedIo {
                feed_scale: 1.0,
                spindle_speed: 0.0,
                spindle_direction: 1,
                spindle_revs: 0.0,
                spindle_speed_in: 0.0,
                atspeed: true,
                index_enable: false,
                rotary_unlocked: true,
            }
        }
    }

    impl MotionIo for FixedIo {
        fn net_feed_scale(&self) -> f64 {
            self.feed_scale
        }
        fn spindle_speed(&self) -> f64 {
            self.spindle_speed
        }
        fn set_spindle_speed(&mut self, speed: f64) {
            self.spindle_speed = speed;
        }
        fn spindle_direction(&self) -> i8 {
            self.spindle_direction
        }
        fn set_spindle_direction(&mut self, direction: i8) {
            self.spindle_direction = direction;
        }
        fn spindle_revs(&self) -> f64 {
            self.spindle_revs
        }
        fn spindle_speed_in(&self) -> f64 {
            self.spindle_speed_in
        }
        fn spindle_is_atspeed(&self) -> bool {
            self.atspeed
        }
        fn spindle_index_enable(&self) -> bool {
            self.index_enable
        }
        fn set_spindle_index_enable(&mut self, armed: bool) {
            self.index_enable = armed;
        }
        fn dio_write(&mut self, _index: u8, _on: bool) {}
        fn aio_write(&mut self, _index: u8, _value: f64) {}
        fn rotary_unlock(&mut self, _axis: u8, on: bool) {
            self.rotary_unlocked = on;
        }
        fn rotary_is_unlocked(&self, _axis: u8) -> bool {
            self.rotary_unlocked
        }
        fn joint_acc_limit(&self, _axis: u8) -> f64 {
            1000.0
        }
        fn joint_vel_limit(&self, _axis: u8) -> f64 {
            1000.0
        }
    }

    /// S1: a single line run to a stop never exceeds its velocity cap and
    /// ends exactly at the programmed endpoint.
    #[test]
    fn single_line_runs_to_stop_and_is_done() {
        let mut p: Planner<8> = Planner::new();
        let mut io = FixedIo::default();
        p.set_pos(Pose9::ZERO);
        p.set_cycle_time(0.001);
        p.set_amax(100.0);
        p.set_vmax(50.0, 100.0);
        p.set_term_cond(TermCond::Stop, 0.0);

        let end = Pose9::new(Cartesian::new(10.0, 0.0, 0.0), Cartesian::ZERO, Cartesian::ZERO);
        let r = p.add_line(end, 50.0, 100.0, 100.0, 0, false, None);
        assert!(r.is_ok());

        let mut max_vel = 0.0_f64;
        let mut ticks = 0;
        while !p.is_done() && ticks < 20_000 {
            p.run_cycle(&mut io);
            max_vel = max_vel.max(p.reported_vel());
            ticks += 1;
        }

        assert!(p.is_done(), "motion did not complete within the tick budget");
        assert!(max_vel <= 50.0 + 1e-6, "exceeded requested feed: {max_vel}");
        assert!((p.get_pos().xyz.x - 10.0).abs() < 1e-3);
    }

    /// S2: two collinear tangent lines never drop speed below the shared
    /// feed rate at the junction.
    #[test]
    fn tangent_chain_does_not_drop_speed_at_junction() {
        let mut p: Planner<8> = Planner::new();
        let mut io = FixedIo::default();
        p.set_pos(Pose9::ZERO);
        p.set_cycle_time(0.001);
        p.set_amax(200.0);
        p.set_vmax(50.0, 100.0);
        p.set_term_cond(TermCond::Tangent, 0.0);

        let mid = Pose9::new(Cartesian::new(10.0, 0.0, 0.0), Cartesian::ZERO, Cartesian::ZERO);
        let end = Pose9::new(Cartesian::new(20.0, 0.0, 0.0), Cartesian::ZERO, Cartesian::ZERO);
        p.add_line(mid, 50.0, 100.0, 200.0, 0, false, None);
        p.add_line(end, 50.0, 100.0, 200.0, 0, false, None);

        let mut prev_exec_id = 0u32;
        let mut prev_vel = 0.0_f64;
        let mut junction_vel_before = None;
        let mut junction_vel_after = None;
        let mut ticks = 0;
        while !p.is_done() && ticks < 20_000 {
            p.run_cycle(&mut io);
            let exec_id = p.get_exec_id();
            if prev_exec_id == 1 && exec_id == 2 && junction_vel_before.is_none() {
                junction_vel_before = Some(prev_vel);
                junction_vel_after = Some(p.reported_vel());
            }
            prev_exec_id = exec_id;
            prev_vel = p.reported_vel();
            ticks += 1;
        }
        assert!(p.is_done());
        let before = junction_vel_before.expect("never crossed into the second segment");
        let after = junction_vel_after.expect("never crossed into the second segment");
        assert!(before >= 49.0, "speed dropped before the tangent junction: {before}");
        assert!(after >= 49.0, "speed dropped after the tangent junction: {after}");
    }

    /// S5: aborting mid-motion decelerates within the acceleration bound
    /// and leaves the planner idle with `exec_id == 0`.
    #[test]
    fn abort_mid_motion_decelerates_then_clears() {
        let mut p: Planner<8> = Planner::new();
        let mut io = FixedIo::default();
        p.set_pos(Pose9::ZERO);
        p.set_cycle_time(0.001);
        p.set_amax(100.0);
        p.set_vmax(50.0, 100.0);
        p.set_term_cond(TermCond::Stop, 0.0);
        let end = Pose9::new(Cartesian::new(50.0, 0.0, 0.0), Cartesian::ZERO, Cartesian::ZERO);
        p.add_line(end, 50.0, 100.0, 100.0, 0, false, None);

        for _ in 0..200 {
            p.run_cycle(&mut io);
        }
        assert!(p.reported_vel() > 0.0);

        p.abort();
        let mut ticks = 0;
        let mut result = ControlResult::Slowing;
        while ticks < 20_000 {
            result = p.run_cycle(&mut io);
            if result == ControlResult::Stopped {
                break;
            }
            ticks += 1;
        }
        assert_eq!(result, ControlResult::Stopped);
        assert!(p.is_done());
        assert_eq!(p.get_exec_id(), 0);
    }

    #[test]
    fn dio_edge_fires_exactly_once_on_activation() {
        use std::cell::RefCell;

        struct CountingIo {
            inner: FixedIo,
            fires: RefCell<u32>,
        }
        impl MotionIo for CountingIo {
            fn net_feed_scale(&self) -> f64 {
                self.inner.net_feed_scale()
            }
            fn spindle_speed(&self) -> f64 {
                self.inner.spindle_speed()
            }
            fn set_spindle_speed(&mut self, s: f64) {
                self.inner.set_spindle_speed(s)
            }
            fn spindle_direction(&self) -> i8 {
                self.inner.spindle_direction()
            }
            fn set_spindle_direction(&mut self, d: i8) {
                self.inner.set_spindle_direction(d)
            }
            fn spindle_revs(&self) -> f64 {
                self.inner.spindle_revs()
            }
            fn spindle_speed_in(&self) -> f64 {
                self.inner.spindle_speed_in()
            }
            fn spindle_is_atspeed(&self) -> bool {
                self.inner.spindle_is_atspeed()
            }
            fn spindle_index_enable(&self) -> bool {
                self.inner.spindle_index_enable()
            }
            fn set_spindle_index_enable(&mut self, a: bool) {
                self.inner.set_spindle_index_enable(a)
            }
            fn dio_write(&mut self, index: u8, on: bool) {
                if index == 0 && on {
                    *self.fires.borrow_mut() += 1;
                }
            }
            fn aio_write(&mut self, _index: u8, _value: f64) {}
            fn rotary_unlock(&mut self, axis: u8, on: bool) {
                self.inner.rotary_unlock(axis, on)
            }
            fn rotary_is_unlocked(&self, axis: u8) -> bool {
                self.inner.rotary_is_unlocked(axis)
            }
            fn joint_acc_limit(&self, axis: u8) -> f64 {
                self.inner.joint_acc_limit(axis)
            }
            fn joint_vel_limit(&self, axis: u8) -> f64 {
                self.inner.joint_vel_limit(axis)
            }
        }

        let mut p: Planner<8> = Planner::new();
        let mut io = CountingIo { inner: FixedIo::default(), fires: RefCell::new(0) };
        p.set_pos(Pose9::ZERO);
        p.set_cycle_time(0.001);
        p.set_amax(100.0);
        p.set_vmax(50.0, 100.0);
        p.set_term_cond(TermCond::Stop, 0.0);
        p.set_dout(0, true, true);
        let end = Pose9::new(Cartesian::new(10.0, 0.0, 0.0), Cartesian::ZERO, Cartesian::ZERO);
        p.add_line(end, 50.0, 100.0, 100.0, 0, false, None);

        let mut ticks = 0;
        while !p.is_done() && ticks < 20_000 {
            p.run_cycle(&mut io);
            ticks += 1;
        }
        assert_eq!(*io.fires.borrow(), 1);
    }

    /// S4 (simplified): a rigid tap synchronized in `Position` mode walks
    /// through its FSM and returns to the pre-tap XYZ position.
    #[test]
    fn rigid_tap_returns_to_start_after_full_cycle() {
        use std::cell::Cell;

        struct TapIo {
            revs: f64,
            direction: i8,
            reversed: bool,
            // A real index line reads true exactly once (the captured
            // pulse) after being armed, then clears itself.
            index_enable: Cell<bool>,
        }
        impl Default for TapIo {
            fn default() -> Self {
                TapIo { revs: 0.0, direction: 1, reversed: false, index_enable: Cell::new(false) }
            }
        }
        impl MotionIo for TapIo {
            fn net_feed_scale(&self) -> f64 {
                1.0
            }
            fn spindle_speed(&self) -> f64 {
                0.0
            }
            fn set_spindle_speed(&mut self, _s: f64) {}
            fn spindle_direction(&self) -> i8 {
                self.direction
            }
            fn set_spindle_direction(&mut self, d: i8) {
                self.direction = d;
                self.reversed = true;
            }
            fn spindle_revs(&self) -> f64 {
                self.revs
            }
            fn spindle_speed_in(&self) -> f64 {
                self.direction as f64
            }
            fn spindle_is_atspeed(&self) -> bool {
                true
            }
            fn spindle_index_enable(&self) -> bool {
                let armed = self.index_enable.get();
                if armed {
                    self.index_enable.set(false);
                }
                armed
            }
            fn set_spindle_index_enable(&mut self, armed: bool) {
                self.index_enable.set(armed);
            }
            fn dio_write(&mut self, _i: u8, _o: bool) {}
            fn aio_write(&mut self, _i: u8, _v: f64) {}
            fn rotary_unlock(&mut self, _a: u8, _o: bool) {}
            fn rotary_is_unlocked(&self, _a: u8) -> bool {
                true
            }
            fn joint_acc_limit(&self, _a: u8) -> f64 {
                1000.0
            }
            fn joint_vel_limit(&self, _a: u8) -> f64 {
                1000.0
            }
        }

        let mut p: Planner<8> = Planner::new();
        let mut io = TapIo::default();
        p.set_pos(Pose9::ZERO);
        p.set_cycle_time(0.001);
        p.set_amax(400.0);
        p.set_vmax(60.0, 120.0);
        p.set_spindle_sync(1.0, SyncMode::Position);

        let end = Pose9::new(Cartesian::new(0.0, 0.0, 10.0), Cartesian::ZERO, Cartesian::ZERO);
        let r = p.add_rigid_tap(end, 60.0, 120.0, 400.0, 0);
        assert!(r.is_ok());

        for tick in 0..100_000 {
            io.revs = (tick as f64) * 0.0005;
            p.run_cycle(&mut io);
            if p.is_done() {
                break;
            }
        }
        // The reversal direction flip must have happened at least once.
        assert!(io.reversed);
    }
}
