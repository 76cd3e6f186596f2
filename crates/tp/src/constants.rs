//! Named numerical tolerances.
//!
//! These bound numerical stability, not user-facing behavior, so unlike
//! `set_vmax`/`set_amax`/etc they are compile-time constants rather than
//! per-planner settings.

/// Position error below which a segment is considered "at target" and its
/// `progress` is snapped to `target` rather than left fractionally short.
pub const POS_EPSILON: f64 = 1e-6;

/// Below this remaining time, a cycle is treated as a split cycle (the
/// current segment finishes mid-tick and the remainder runs on its
/// successor) rather than an ordinary full-cycle update.
pub const TIME_EPSILON: f64 = 1e-9;

/// Below this speed, a final velocity is treated as zero.
pub const VEL_EPSILON: f64 = 1e-6;

/// Below this angle, two tangent vectors are treated as collinear.
pub const ANGLE_EPSILON: f64 = 1e-6;

/// Minimum turning angle for a blend arc to be considered worth
/// constructing at all (below this, two segments are simply tangent).
pub const MIN_ARC_ANGLE: f64 = 1e-3;

/// Minimum arc length for a blend arc to be viable; shorter candidates fall
/// back to a parabolic blend.
pub const MIN_ARC_LENGTH: f64 = 1e-4;

/// Minimum number of servo cycles a segment must take to traverse, used to
/// clip `maxvel` so the queue always advances at a sane rate.
pub const MIN_SEGMENT_CYCLES: f64 = 2.0;

/// Fraction of the inscribed-box acceleration bound usable as the normal
/// (centripetal) acceleration bound during a blend.
pub const ACC_RATIO_NORMAL: f64 = 0.5;

/// Fraction of `maxaccel` allowed as tangential acceleration error at a
/// tangent-classified corner; small enough that a tangent transition never
/// visibly jerks the tool.
pub const ACC_RATIO_TANGENTIAL: f64 = 0.2 * ACC_RATIO_NORMAL;

/// Maximum fraction of a neighboring segment's length a blend arc may
/// consume from it.
pub const BLEND_GREEDINESS: f64 = 0.5;

/// Overshoot budget appended to a rigid tap's forward-stroke target length,
/// in units of `uu_per_rev`, so the tap always has room to decelerate past
/// the programmed depth before reversing.
pub const RIGID_TAP_OVERSHOOT_REVS: f64 = 10.0;

/// Number of consecutive cycles before an open-loop spindle-sync
/// acceleration ramp is considered stalled and force-latched.
pub const SYNC_ACCEL_MAX_CYCLES: u32 = 1 << 20;
