//! The segment (`TC`) data model: one executable motion element.

use heapless::Vec as HVec;
use posemath::{CartCircle, CartLine, Cartesian, Pose9, SphericalArc};

/// Maximum number of DIO/AIO edges a single segment can carry.
pub const MAX_SYNC_EDGES: usize = 4;

/// How a segment terminates relative to its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermCond {
    /// Come to an exact stop at the end of this segment.
    Stop,
    /// Overlap-in-time decel/accel with the successor (see `stepper`).
    Parabolic,
    /// Continuous velocity direction into the successor; no stop.
    Tangent,
}

/// Spindle synchronization mode for a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    None,
    Velocity,
    Position,
}

/// Velocity-profile shape the cycle stepper uses to advance a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccelMode {
    /// The default trapezoidal (or triangular) profile.
    Trapezoidal,
    /// A ramp toward `finalvel` over the estimated remaining time; only
    /// applies to `Tangent`-terminated segments and falls back to
    /// `Trapezoidal` when `finalvel` is near zero.
    Ramp,
}

/// Whether the optimizer has already pinned this segment's final velocity
/// to its hard maximum (no further increase possible on a later pass).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationState {
    Untouched,
    AtMax,
}

/// One digital or analog output edge to emit when a segment first advances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncIo {
    Digital { index: u8, on: bool },
    Analog { index: u8, value: f64 },
}

/// Pending I/O edges bundled into a segment, flushed on its first advance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncDio {
    pub edges: HVec<SyncIo, MAX_SYNC_EDGES>,
}

impl SyncDio {
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn clear(&mut self) {
        self.edges.clear();
    }
}

/// Geometry for one Cartesian triple pair used by a rigid-tap segment: the
/// original forward stroke plus an auxiliary line regenerated at each FSM
/// state change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTapGeometry {
    pub xyz: CartLine,
    pub aux_xyz: CartLine,
    pub abc: Cartesian,
    pub uvw: Cartesian,
}

/// Rigid-tap finite state machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigidTapState {
    Tapping,
    Reversing,
    Retraction,
    FinalReversal,
    FinalPlacement,
}

/// Rigid-tap payload: geometry plus FSM bookkeeping. `s_old` is the
/// previous signed spindle-revolution reading; kept here (per-segment)
/// rather than as a function-local static, so repeated taps and multiple
/// planners never share mutable state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTap {
    pub geometry: RigidTapGeometry,
    pub reversal_target: f64,
    pub spindlerevs_at_reversal: f64,
    pub state: RigidTapState,
    pub s_old: f64,
}

/// Geometry for a linear or circular/helical move, one per Cartesian
/// triple. Tool-axis (UVW) and rotary (ABC) triples degrade to a
/// point-to-point line when not moved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineTriple {
    pub xyz: CartLine,
    pub uvw: CartLine,
    pub abc: CartLine,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleTriple {
    pub xyz: CartCircle,
    pub uvw: CartLine,
    pub abc: CartLine,
}

/// The tagged union of motion kinds a segment can carry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Geometry {
    Linear(LineTriple),
    Circular(CircleTriple),
    RigidTap(RigidTap),
    SphericalArc(SphericalArc),
}

/// One executable motion element: a line, a circular/helical arc, a rigid
/// tap, or a synthesized spherical blend arc, plus all kinematic and
/// synchronization state needed to step it.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub id: u32,
    pub geometry: Geometry,

    // Position
    pub target: f64,
    pub progress: f64,
    pub nominal_length: f64,

    // Velocity
    pub reqvel: f64,
    pub target_vel: f64,
    pub maxvel: f64,
    pub currentvel: f64,
    pub finalvel: f64,

    // Acceleration
    pub maxaccel: f64,

    pub cycle_time: f64,

    pub term_cond: TermCond,
    pub tolerance: f64,
    pub accel_mode: AccelMode,

    pub synchronized: SyncMode,
    pub uu_per_rev: f64,
    pub sync_accel: u32,

    pub blend_prev: bool,
    pub blending_next: bool,
    pub blend_vel: f64,
    pub triangle_vel: f64,
    pub vel_at_blend_start: f64,

    pub active: bool,
    pub finalized: bool,
    pub on_final_decel: bool,
    pub splitting: bool,
    pub remove: bool,

    pub optimization_state: OptimizationState,

    pub enables: u8,
    pub atspeed: bool,
    pub syncdio: SyncDio,
    pub indexrotary: Option<u8>,

    pub active_depth: u32,
}

impl Segment {
    /// Field defaults applied at insertion, before the caller's explicit
    /// overrides. Mirrors the exact field-default table used when a new
    /// segment enters the queue.
    pub fn new(id: u32, geometry: Geometry, target: f64, cycle_time: f64) -> Self {
        Segment {
            id,
            geometry,
            target,
            progress: 0.0,
            nominal_length: target,
            reqvel: 0.0,
            target_vel: 0.0,
            maxvel: 0.0,
            currentvel: 0.0,
            finalvel: 0.0,
            maxaccel: 0.0,
            cycle_time,
            term_cond: TermCond::Stop,
            tolerance: 0.0,
            accel_mode: AccelMode::Trapezoidal,
            synchronized: SyncMode::None,
            uu_per_rev: 0.0,
            sync_accel: 0,
            blend_prev: false,
            blending_next: false,
            blend_vel: 0.0,
            triangle_vel: 0.0,
            vel_at_blend_start: 0.0,
            active: false,
            finalized: false,
            on_final_decel: false,
            splitting: false,
            remove: false,
            optimization_state: OptimizationState::Untouched,
            enables: 0,
            atspeed: false,
            syncdio: SyncDio::default(),
            indexrotary: None,
            active_depth: 0,
        }
    }

    pub fn is_rigid_tap(&self) -> bool {
        matches!(self.geometry, Geometry::RigidTap(_))
    }

    pub fn rigid_tap(&self) -> Option<&RigidTap> {
        match &self.geometry {
            Geometry::RigidTap(rt) => Some(rt),
            _ => None,
        }
    }

    pub fn rigid_tap_mut(&mut self) -> Option<&mut RigidTap> {
        match &mut self.geometry {
            Geometry::RigidTap(rt) => Some(rt),
            _ => None,
        }
    }

    /// Distance-to-go: remaining arc length this segment has to travel.
    pub fn dtg(&self) -> f64 {
        (self.target - self.progress).max(0.0)
    }

    /// Emitted Cartesian position at the current `progress`.
    pub fn position_at(&self, progress: f64, epsilon: f64) -> Cartesian {
        match &self.geometry {
            Geometry::Linear(l) => l.xyz.point_at(progress, epsilon),
            Geometry::Circular(c) => c.xyz.point_at(progress, epsilon),
            Geometry::RigidTap(rt) => rt.geometry.xyz.point_at(progress, epsilon),
            Geometry::SphericalArc(a) => a.point_at(progress, epsilon),
        }
    }

    /// Emitted full 9-axis pose at the given arc-length `progress`. For a
    /// `SphericalArc` (blend) or `RigidTap` segment, the UVW/ABC triples
    /// don't move independently of XYZ, so `carry` (the pose's current
    /// UVW/ABC) is threaded through unchanged.
    pub fn pose_at(&self, progress: f64, epsilon: f64, carry: (Cartesian, Cartesian)) -> Pose9 {
        match &self.geometry {
            Geometry::Linear(l) => Pose9 {
                xyz: l.xyz.point_at(progress, epsilon),
                uvw: l.uvw.point_at(progress, epsilon),
                abc: l.abc.point_at(progress, epsilon),
            },
            Geometry::Circular(c) => Pose9 {
                xyz: c.xyz.point_at(progress, epsilon),
                uvw: c.uvw.point_at(progress, epsilon),
                abc: c.abc.point_at(progress, epsilon),
            },
            Geometry::RigidTap(rt) => {
                let xyz = if super::rigid_tap::uses_aux_geometry(rt.state) {
                    rt.geometry.aux_xyz.point_at(progress, epsilon)
                } else {
                    rt.geometry.xyz.point_at(progress, epsilon)
                };
                Pose9 { xyz, uvw: rt.geometry.uvw, abc: rt.geometry.abc }
            }
            Geometry::SphericalArc(a) => {
                Pose9 { xyz: a.point_at(progress, epsilon), uvw: carry.0, abc: carry.1 }
            }
        }
    }

    /// Vector difference `pose_at(new) - pose_at(old)`, component-wise per
    /// triple. Used to accumulate displacement during a full-cycle update
    /// or a parabolic overlap, where two segments each contribute a delta.
    pub fn pose_delta(
        &self,
        old_progress: f64,
        new_progress: f64,
        epsilon: f64,
        carry: (Cartesian, Cartesian),
    ) -> Pose9 {
        let before = self.pose_at(old_progress, epsilon, carry);
        let after = self.pose_at(new_progress, epsilon, carry);
        Pose9 { xyz: after.xyz - before.xyz, uvw: after.uvw - before.uvw, abc: after.abc - before.abc }
    }

    /// Unit tangent at the very end of this segment's path (progress ==
    /// target). Used by the stepper to classify a generic (possibly
    /// circular) junction for parabolic blend-velocity calculation. `None`
    /// for degenerate geometry or kinds with no well-defined tangent
    /// (rigid taps, blend arcs use their own XYZ tangent via `SphericalArc`).
    pub fn end_tangent(&self, epsilon: f64) -> Option<Cartesian> {
        match &self.geometry {
            Geometry::Linear(l) => l.xyz.tangent(epsilon),
            Geometry::Circular(c) => c.xyz.tangent_at(c.xyz.length(), epsilon),
            Geometry::RigidTap(rt) => rt.geometry.xyz.tangent(epsilon),
            Geometry::SphericalArc(a) => a.tangent_at(a.length(epsilon), epsilon),
        }
    }

    /// Unit tangent at the very start of this segment's path.
    pub fn start_tangent(&self, epsilon: f64) -> Option<Cartesian> {
        match &self.geometry {
            Geometry::Linear(l) => l.xyz.tangent(epsilon),
            Geometry::Circular(c) => c.xyz.tangent_at(0.0, epsilon),
            Geometry::RigidTap(rt) => rt.geometry.xyz.tangent(epsilon),
            Geometry::SphericalArc(a) => a.tangent_at(0.0, epsilon),
        }
    }

    /// Shortens a linear segment's XYZ line by moving its start forward by
    /// `d` along its tangent, and reduces `target`/`nominal_length` to
    /// match. Used when a blend arc consumes the start of this segment.
    pub fn shorten_start(&mut self, d: f64, epsilon: f64) {
        if let Geometry::Linear(l) = &mut self.geometry {
            l.xyz = l.xyz.shorten_start(d, epsilon);
            self.target = (self.target - d).max(0.0);
            self.nominal_length = self.target;
        }
    }
}
