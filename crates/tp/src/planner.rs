//! The planner: owns the segment queue and the append pipeline
//! (`add_line`/`add_circle`/`add_rigid_tap`), plus the controller API.

use crate::blend::{apply_tangent, blend_line_line, line_junction, tangency_test, BlendOutcome, PlanarBounds};
use crate::constants::{ACC_RATIO_NORMAL, RIGID_TAP_OVERSHOOT_REVS};
use crate::controller::ControlResult;
use crate::errors::PlannerError;
use crate::math::sqrt;
use crate::optimizer::run_optimization;
use crate::queue::SegmentQueue;
use crate::segment::{
    AccelMode, CircleTriple, Geometry, LineTriple, RigidTap, RigidTapGeometry, RigidTapState,
    Segment, SyncDio, SyncIo, SyncMode, TermCond,
};
use posemath::{CartCircle, CartLine, Cartesian, Pose9};

/// Spindle-synchronization sub-state owned by the planner (shared across
/// whichever segment is currently synchronized).
#[derive(Debug, Clone, Copy, Default)]
pub struct SpindleState {
    pub offset: f64,
    pub revs: f64,
    pub waiting_for_index: bool,
    pub waiting_for_atspeed: bool,
    /// Whether position sync has been established for the segment currently
    /// being activated (reset by `set_spindle_sync` and a full `clear`).
    pub synced: bool,
}

/// Motion kind last reported by `run_cycle`, exposed via `get_motion_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionType {
    None,
    Linear,
    Circular,
    RigidTap,
    Blend,
}

/// The real-time trajectory planner. `CAP` is the segment queue's
/// compile-time capacity.
pub struct Planner<const CAP: usize> {
    queue: SegmentQueue<CAP>,
    current_pos: Pose9,
    goal_pos: Pose9,

    default_vmax: f64,
    default_ini_maxvel: f64,
    default_vlimit: f64,
    default_amax: f64,
    default_cycle_time: f64,
    default_term_cond: TermCond,
    default_tolerance: f64,
    default_accel_mode: AccelMode,

    next_id: u32,
    aborting: bool,
    paused: bool,

    spindle: SpindleState,
    spindle_sync_mode: SyncMode,
    uu_per_rev: f64,

    pending_dio: SyncDio,

    max_feed_scale: f64,
    reported_motion_type: MotionType,
    reported_vel: f64,
    reported_exec_id: u32,
}

impl<const CAP: usize> Default for Planner<CAP> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const CAP: usize> Planner<CAP> {
    pub fn new() -> Self {
        Planner {
            queue: SegmentQueue::new(),
            current_pos: Pose9::ZERO,
            goal_pos: Pose9::ZERO,
            default_vmax: 0.0,
            default_ini_maxvel: 0.0,
            default_vlimit: f64::INFINITY,
            default_amax: 0.0,
            default_cycle_time: 0.001,
            default_term_cond: TermCond::Stop,
            default_tolerance: 0.0,
            default_accel_mode: AccelMode::Trapezoidal,
            next_id: 1,
            aborting: false,
            paused: false,
            spindle: SpindleState::default(),
            spindle_sync_mode: SyncMode::None,
            uu_per_rev: 0.0,
            pending_dio: SyncDio::default(),
            max_feed_scale: 1.0,
            reported_motion_type: MotionType::None,
            reported_vel: 0.0,
            reported_exec_id: 0,
        }
    }

    // -- Controller API -----------------------------------------------

    pub fn set_cycle_time(&mut self, dt: f64) -> ControlResult {
        if dt <= 0.0 {
            return ControlResult::Fail(PlannerError::InvalidCycleTime);
        }
        self.default_cycle_time = dt;
        ControlResult::Ok
    }

    pub fn set_vmax(&mut self, reqvel: f64, ini_maxvel: f64) -> ControlResult {
        if reqvel < 0.0 || ini_maxvel < 0.0 {
            return ControlResult::Fail(PlannerError::InvalidVelocity);
        }
        self.default_vmax = reqvel;
        self.default_ini_maxvel = ini_maxvel;
        ControlResult::Ok
    }

    pub fn set_vlimit(&mut self, vlimit: f64) -> ControlResult {
        if vlimit < 0.0 {
            return ControlResult::Fail(PlannerError::InvalidVelocity);
        }
        self.default_vlimit = vlimit;
        ControlResult::Ok
    }

    pub fn set_amax(&mut self, amax: f64) -> ControlResult {
        if amax <= 0.0 {
            return ControlResult::Fail(PlannerError::InvalidAccel);
        }
        self.default_amax = amax;
        ControlResult::Ok
    }

    pub fn set_id(&mut self, id: u32) -> ControlResult {
        self.next_id = id;
        ControlResult::Ok
    }

    pub fn set_term_cond(&mut self, cond: TermCond, tolerance: f64) -> ControlResult {
        self.default_term_cond = cond;
        self.default_tolerance = tolerance;
        ControlResult::Ok
    }

    /// Selects the velocity-profile shape future segments use in
    /// `run_cycle`: trapezoidal (default) or ramp-toward-`finalvel`.
    pub fn set_accel_mode(&mut self, mode: AccelMode) -> ControlResult {
        self.default_accel_mode = mode;
        ControlResult::Ok
    }

    pub fn set_pos(&mut self, pose: Pose9) -> ControlResult {
        self.current_pos = pose;
        self.goal_pos = pose;
        ControlResult::Ok
    }

    pub fn set_spindle_sync(&mut self, uu_per_rev: f64, mode: SyncMode) -> ControlResult {
        if mode != SyncMode::None && uu_per_rev <= 0.0 {
            return ControlResult::Fail(PlannerError::InvalidVelocity);
        }
        self.uu_per_rev = uu_per_rev;
        self.spindle_sync_mode = mode;
        self.spindle.offset = self.spindle.revs;
        self.spindle.synced = false;
        ControlResult::Ok
    }

    pub fn set_dout(&mut self, index: u8, start: bool, _end: bool) -> ControlResult {
        match self.pending_dio.edges.push(SyncIo::Digital { index, on: start }) {
            Ok(()) => ControlResult::Ok,
            Err(_) => ControlResult::Fail(PlannerError::QueueFull),
        }
    }

    pub fn set_aout(&mut self, index: u8, start: f64, _end: f64) -> ControlResult {
        match self.pending_dio.edges.push(SyncIo::Analog { index, value: start }) {
            Ok(()) => ControlResult::Ok,
            Err(_) => ControlResult::Fail(PlannerError::QueueFull),
        }
    }

    pub fn pause(&mut self) -> ControlResult {
        if self.paused {
            return ControlResult::NoAction;
        }
        self.paused = true;
        ControlResult::Ok
    }

    pub fn resume(&mut self) -> ControlResult {
        if !self.paused {
            return ControlResult::NoAction;
        }
        self.paused = false;
        ControlResult::Ok
    }

    pub fn abort(&mut self) -> ControlResult {
        if self.aborting {
            return ControlResult::NoAction;
        }
        self.aborting = true;
        ControlResult::Ok
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.goal_pos = self.current_pos;
        self.aborting = false;
        self.paused = false;
        self.reported_motion_type = MotionType::None;
        self.reported_vel = 0.0;
        self.reported_exec_id = 0;
        self.spindle.waiting_for_index = false;
        self.spindle.waiting_for_atspeed = false;
        self.spindle.synced = false;
    }

    pub fn get_pos(&self) -> Pose9 {
        self.current_pos
    }

    pub fn get_exec_id(&self) -> u32 {
        self.reported_exec_id
    }

    pub fn get_motion_type(&self) -> MotionType {
        self.reported_motion_type
    }

    pub fn is_done(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn queue_depth(&self) -> usize {
        CAP - self.queue.len()
    }

    pub fn active_depth(&self) -> usize {
        self.queue.len()
    }

    pub fn reported_vel(&self) -> f64 {
        self.reported_vel
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    // -- crate-internal accessors used by the cycle stepper --------------

    pub(crate) fn queue(&self) -> &SegmentQueue<CAP> {
        &self.queue
    }

    pub(crate) fn queue_mut(&mut self) -> &mut SegmentQueue<CAP> {
        &mut self.queue
    }

    pub(crate) fn spindle_mut(&mut self) -> &mut SpindleState {
        &mut self.spindle
    }

    pub(crate) fn spindle(&self) -> &SpindleState {
        &self.spindle
    }

    pub(crate) fn spindle_sync_mode(&self) -> SyncMode {
        self.spindle_sync_mode
    }

    pub(crate) fn cycle_time(&self) -> f64 {
        self.default_cycle_time
    }

    pub(crate) fn max_feed_scale(&self) -> f64 {
        self.max_feed_scale
    }

    pub(crate) fn set_max_feed_scale(&mut self, scale: f64) {
        self.max_feed_scale = scale;
    }

    pub(crate) fn vlimit(&self) -> f64 {
        self.default_vlimit
    }

    pub(crate) fn default_amax(&self) -> f64 {
        self.default_amax
    }

    pub(crate) fn spindle_sync_uu_per_rev(&self) -> f64 {
        self.uu_per_rev
    }

    pub(crate) fn is_aborting(&self) -> bool {
        self.aborting
    }

    pub(crate) fn clear_abort(&mut self) {
        self.aborting = false;
    }

    pub(crate) fn current_pos(&self) -> Pose9 {
        self.current_pos
    }

    pub(crate) fn set_current_pos(&mut self, p: Pose9) {
        self.current_pos = p;
    }

    pub(crate) fn set_reported(&mut self, motion_type: MotionType, vel: f64, exec_id: u32) {
        self.reported_motion_type = motion_type;
        self.reported_vel = vel;
        self.reported_exec_id = exec_id;
    }

    // -- Append pipeline ------------------------------------------------

    /// Appends a straight line move to `end`. `end` gives the full 9-tuple
    /// pose; `target` is the magnitude of whichever triple actually moves,
    /// in priority XYZ > UVW > ABC.
    #[allow(clippy::too_many_arguments)]
    pub fn add_line(
        &mut self,
        end: Pose9,
        reqvel: f64,
        maxvel: f64,
        accel: f64,
        enables: u8,
        atspeed: bool,
        indexrotary: Option<u8>,
    ) -> ControlResult {
        if self.aborting {
            return ControlResult::Fail(PlannerError::Aborting);
        }
        if reqvel < 0.0 || maxvel < 0.0 {
            return ControlResult::Fail(PlannerError::InvalidVelocity);
        }
        if accel <= 0.0 {
            return ControlResult::Fail(PlannerError::InvalidAccel);
        }

        let xyz = CartLine::new(self.goal_pos.xyz, end.xyz);
        let uvw = CartLine::new(self.goal_pos.uvw, end.uvw);
        let abc = CartLine::new(self.goal_pos.abc, end.abc);

        let target = if xyz.length() > crate::constants::POS_EPSILON {
            xyz.length()
        } else if uvw.length() > crate::constants::POS_EPSILON {
            uvw.length()
        } else {
            abc.length()
        };

        if target < crate::constants::POS_EPSILON {
            return ControlResult::Fail(PlannerError::DegenerateGeometry);
        }

        let triple = LineTriple { xyz, uvw, abc };
        let mut seg =
            Segment::new(self.next_id, Geometry::Linear(triple), target, self.default_cycle_time);
        seg.reqvel = reqvel;
        seg.target_vel = reqvel;
        seg.maxvel = maxvel.min(self.default_vlimit);
        seg.maxaccel = accel;
        seg.term_cond = self.default_term_cond;
        seg.accel_mode = self.default_accel_mode;
        seg.tolerance = self.default_tolerance;
        seg.enables = enables;
        seg.atspeed = atspeed;
        seg.indexrotary = indexrotary;
        seg.syncdio = core::mem::take(&mut self.pending_dio);

        self.splice_and_insert(seg);
        self.goal_pos = end;
        ControlResult::Ok
    }

    /// Appends a circular/helical arc move, analogous to `add_line`.
    #[allow(clippy::too_many_arguments)]
    pub fn add_circle(
        &mut self,
        circle_xyz: CartCircle,
        end_uvw: Cartesian,
        end_abc: Cartesian,
        reqvel: f64,
        maxvel: f64,
        accel: f64,
        enables: u8,
    ) -> ControlResult {
        if self.aborting {
            return ControlResult::Fail(PlannerError::Aborting);
        }
        if reqvel < 0.0 || maxvel < 0.0 {
            return ControlResult::Fail(PlannerError::InvalidVelocity);
        }
        if accel <= 0.0 {
            return ControlResult::Fail(PlannerError::InvalidAccel);
        }
        let radius = circle_xyz.radius();
        if radius < crate::constants::POS_EPSILON {
            return ControlResult::Fail(PlannerError::DegenerateGeometry);
        }
        let target = circle_xyz.length();
        if target < crate::constants::POS_EPSILON {
            return ControlResult::Fail(PlannerError::DegenerateGeometry);
        }

        let uvw = CartLine::new(self.goal_pos.uvw, end_uvw);
        let abc = CartLine::new(self.goal_pos.abc, end_abc);
        let triple = CircleTriple { xyz: circle_xyz, uvw, abc };

        let mut seg = Segment::new(
            self.next_id,
            Geometry::Circular(triple),
            target,
            self.default_cycle_time,
        );
        seg.reqvel = reqvel;
        seg.target_vel = reqvel;
        let v_normal_limit = sqrt(accel * ACC_RATIO_NORMAL * radius);
        seg.maxvel = maxvel.min(self.default_vlimit).min(v_normal_limit);
        seg.maxaccel = accel;
        seg.term_cond = self.default_term_cond;
        seg.accel_mode = self.default_accel_mode;
        seg.tolerance = self.default_tolerance;
        seg.enables = enables;
        seg.syncdio = core::mem::take(&mut self.pending_dio);

        self.splice_and_insert(seg);
        self.goal_pos.xyz = circle_xyz.point_at(target, crate::constants::POS_EPSILON);
        self.goal_pos.uvw = end_uvw;
        self.goal_pos.abc = end_abc;
        ControlResult::Ok
    }

    /// Appends a rigid-tap cycle. Requires an active `Position`-mode
    /// spindle sync.
    pub fn add_rigid_tap(
        &mut self,
        end: Pose9,
        reqvel: f64,
        maxvel: f64,
        accel: f64,
        enables: u8,
    ) -> ControlResult {
        if self.aborting {
            return ControlResult::Fail(PlannerError::Aborting);
        }
        if self.spindle_sync_mode == SyncMode::None {
            return ControlResult::Fail(PlannerError::RigidTapNotSynchronized);
        }
        if reqvel < 0.0 || maxvel < 0.0 {
            return ControlResult::Fail(PlannerError::InvalidVelocity);
        }
        if accel <= 0.0 {
            return ControlResult::Fail(PlannerError::InvalidAccel);
        }

        let xyz = CartLine::new(self.goal_pos.xyz, end.xyz);
        let line_length = xyz.length();
        if line_length < crate::constants::POS_EPSILON {
            return ControlResult::Fail(PlannerError::DegenerateGeometry);
        }
        let overshoot = RIGID_TAP_OVERSHOOT_REVS * self.uu_per_rev;
        let target = line_length + overshoot;

        let extended_end = xyz.point_at(target, crate::constants::POS_EPSILON);
        let forward = CartLine::new(xyz.start, extended_end);

        let rigid_tap = RigidTap {
            geometry: RigidTapGeometry {
                xyz: forward,
                aux_xyz: forward,
                abc: self.goal_pos.abc,
                uvw: self.goal_pos.uvw,
            },
            reversal_target: line_length,
            spindlerevs_at_reversal: 0.0,
            state: RigidTapState::Tapping,
            s_old: self.spindle.revs,
        };

        let mut seg = Segment::new(
            self.next_id,
            Geometry::RigidTap(rigid_tap),
            target,
            self.default_cycle_time,
        );
        seg.reqvel = reqvel;
        seg.target_vel = reqvel;
        seg.maxvel = maxvel.min(self.default_vlimit);
        seg.maxaccel = accel;
        seg.term_cond = TermCond::Stop;
        seg.synchronized = self.spindle_sync_mode;
        seg.uu_per_rev = self.uu_per_rev;
        seg.atspeed = true;
        seg.enables = enables;
        seg.syncdio = core::mem::take(&mut self.pending_dio);

        self.splice_and_insert(seg);
        self.goal_pos.xyz = xyz.start;
        ControlResult::Ok
    }

    /// Shared tail of the append pipeline: classify the blend against the
    /// current tail, splice in a blend arc or mark tangency, finalize the
    /// prior tail segment's length, insert the new segment, and run the
    /// optimizer.
    fn splice_and_insert(&mut self, mut new_seg: Segment) {
        if self.queue.last().map(|s| s.term_cond == TermCond::Parabolic).unwrap_or(false) {
            new_seg.blend_prev = true;
        }

        let planar = PlanarBounds {
            acc_bound: Cartesian::new(self.default_amax, self.default_amax, self.default_amax),
            vel_bound: Cartesian::new(
                self.default_ini_maxvel.max(self.default_vmax),
                self.default_ini_maxvel.max(self.default_vmax),
                self.default_ini_maxvel.max(self.default_vmax),
            ),
        };

        let mut arc_to_insert: Option<Segment> = None;

        if !self.queue.is_empty() {
            let last_idx = self.queue.len() - 1;
            let classification = self
                .queue
                .item(last_idx)
                .and_then(|prev| line_junction(prev, &new_seg))
                .map(|geom| {
                    let prev = self.queue.item(last_idx).unwrap();
                    let is_tangent =
                        tangency_test(&geom, prev, &new_seg, self.default_cycle_time).is_some();
                    (geom, is_tangent)
                });

            if let Some((geom, is_tangent)) = classification {
                if is_tangent {
                    let dt = self.default_cycle_time;
                    let mut prev_clone = self.queue.item(last_idx).unwrap().clone();
                    apply_tangent(&mut prev_clone, &mut new_seg, dt);
                    *self.queue.item_mut(last_idx).unwrap() = prev_clone;
                } else {
                    let prev = self.queue.item(last_idx).unwrap();
                    match blend_line_line(&geom, prev, &new_seg, &planar, self.max_feed_scale, 2.0)
                    {
                        BlendOutcome::Arc { arc, consume_prev, shorten_next_by, .. } => {
                            let arc_target = arc.length(crate::constants::ANGLE_EPSILON);
                            let mut arc_seg = Segment::new(
                                self.next_id,
                                Geometry::SphericalArc(arc),
                                arc_target,
                                self.default_cycle_time,
                            );
                            self.next_id += 1;
                            arc_seg.reqvel = new_seg.reqvel.min(prev.reqvel);
                            arc_seg.target_vel = arc_seg.reqvel;
                            arc_seg.maxvel = new_seg.maxvel.min(prev.maxvel);
                            arc_seg.maxaccel = new_seg.maxaccel.min(prev.maxaccel);
                            arc_seg.term_cond = TermCond::Tangent;

                            new_seg.shorten_start(shorten_next_by, crate::constants::ANGLE_EPSILON);

                            if consume_prev {
                                self.queue.pop_back();
                            } else if let Some(p) = self.queue.item_mut(last_idx) {
                                p.term_cond = TermCond::Tangent;
                                // The arc pushed below becomes the new tail,
                                // so the generic "finalize the tail" step at
                                // the end of this function would finalize
                                // the arc, not this predecessor line. Finalize
                                // it here explicitly so the optimizer's
                                // reverse sweep isn't blocked by an
                                // unfinalized segment mid-queue.
                                p.finalized = true;
                            }
                            arc_to_insert = Some(arc_seg);
                        }
                        BlendOutcome::Parabolic | BlendOutcome::None => {
                            tracing::debug!(
                                segment_id = new_seg.id,
                                "blend arc infeasible; falling back to parabolic overlap"
                            );
                        }
                        BlendOutcome::Tangent => unreachable!("classified separately above"),
                    }
                }
            }
        }

        if let Some(arc_seg) = arc_to_insert {
            let _ = self.queue.put(arc_seg);
        }

        if let Some(prev) = self.queue.last_mut() {
            prev.finalized = true;
        }

        let _ = self.queue.put(new_seg);
        self.next_id += 1;

        run_optimization(&mut self.queue, self.default_cycle_time, None, true);
    }
}
