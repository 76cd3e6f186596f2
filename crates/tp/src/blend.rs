//! The blend planner: given two adjacent segments, decide whether to mark
//! them tangent, splice a spherical blend arc between them, or leave a
//! parabolic overlap in place.

use crate::constants::{
    ACC_RATIO_NORMAL, ACC_RATIO_TANGENTIAL, BLEND_GREEDINESS, MIN_ARC_LENGTH, MIN_SEGMENT_CYCLES,
};
use crate::segment::{Geometry, Segment, TermCond};
use posemath::{Cartesian, SphericalArc};

/// Outcome of classifying the junction between the outgoing tail segment
/// and an incoming one.
#[derive(Debug)]
pub enum BlendOutcome {
    /// The prior segment was marked `Tangent`; no new segment is needed.
    Tangent,
    /// A spherical blend arc should be spliced in; carries the arc geometry
    /// plus how much of the prior segment's line it consumes (`None` if the
    /// prior line is fully consumed and should be popped).
    Arc { arc: SphericalArc, d_plan: f64, consume_prev: bool, shorten_next_by: f64 },
    /// No arc is geometrically viable at an acceptable radius; caller should
    /// fall back to `Parabolic`.
    Parabolic,
    /// Corner is not continuous at all (e.g. mixed geometry not yet
    /// supported, or one side degenerate); leave as an exact stop.
    None,
}

/// Start/end unit tangents plus intersection point needed to classify a
/// line-line junction.
pub struct LineJunctionGeom {
    pub u1: Cartesian,
    pub u2: Cartesian,
    pub p: Cartesian,
}

/// Reachable speed used for the tangency test: the higher of what either
/// neighbor could realistically demand.
pub fn max_target_vel(seg: &Segment) -> f64 {
    seg.reqvel.min(seg.maxvel).max(0.0).max(seg.target_vel.min(seg.maxvel))
}

/// Intersection half-angle `theta = acos(-u1.u2)/2` and turning angle
/// `phi = pi - 2*theta`.
pub fn intersection_angle(u1: Cartesian, u2: Cartesian) -> (f64, f64) {
    let dot = u1.dot(&u2).clamp(-1.0, 1.0);
    let theta = crate::math::acos(-dot) / 2.0;
    let phi = core::f64::consts::PI - 2.0 * theta;
    (theta, phi)
}

/// Classifies a straight-line junction as tangent or not, per the maximum
/// allowable corner angle test. Returns `Some((theta, phi))` when tangent.
pub fn tangency_test(
    geom: &LineJunctionGeom,
    prev: &Segment,
    next: &Segment,
    cycle_time: f64,
) -> Option<(f64, f64)> {
    let (theta, phi) = intersection_angle(geom.u1, geom.u2);
    let v = max_target_vel(prev).max(max_target_vel(next));
    if v <= crate::constants::VEL_EPSILON {
        return Some((theta, phi));
    }
    let a_margin = ACC_RATIO_TANGENTIAL * prev.maxaccel.min(next.maxaccel);
    let phi_max = a_margin * cycle_time / v;
    if phi <= phi_max {
        Some((theta, phi))
    } else {
        None
    }
}

/// Applies the effects of a `Tangent` classification to both segments:
/// clips acceleration by the tangent-normal ratio and velocity by the
/// sample-rate bound.
pub fn apply_tangent(prev: &mut Segment, next: &mut Segment, cycle_time: f64) {
    prev.term_cond = TermCond::Tangent;
    let a_clip = ACC_RATIO_TANGENTIAL * prev.maxaccel.min(next.maxaccel);
    prev.maxaccel = prev.maxaccel.min(a_clip.max(crate::constants::VEL_EPSILON));
    next.maxaccel = next.maxaccel.min(a_clip.max(crate::constants::VEL_EPSILON));
    let v_clip_prev = prev.target / (cycle_time * MIN_SEGMENT_CYCLES);
    let v_clip_next = next.target / (cycle_time * MIN_SEGMENT_CYCLES);
    prev.maxvel = prev.maxvel.min(v_clip_prev);
    next.maxvel = next.maxvel.min(v_clip_next);
}

/// Per-axis acceleration/velocity bound lookups needed for the planar
/// inscribed-diameter computation. The caller derives these from
/// `MotionIo::joint_acc_limit`/`joint_vel_limit` for each of X, Y, Z.
pub struct PlanarBounds {
    pub acc_bound: Cartesian,
    pub vel_bound: Cartesian,
}

/// Diameter of the circle inscribed on the central cross-section of the
/// rectangular prism defined by `bounds`, sliced by the plane with the
/// given `normal`.
pub fn calculate_inscribed_diameter(normal: Cartesian, bounds: Cartesian) -> f64 {
    let planar_x = Cartesian::new(
        1.0 - normal.x * normal.x,
        (-normal.x * normal.y).abs(),
        (-normal.x * normal.z).abs(),
    );
    let planar_y = Cartesian::new(
        (-normal.y * normal.x).abs(),
        1.0 - normal.y * normal.y,
        (-normal.y * normal.z).abs(),
    );
    let planar_z = Cartesian::new(
        (-normal.z * normal.x).abs(),
        (-normal.z * normal.y).abs(),
        1.0 - normal.z * normal.z,
    );
    let scale_x = planar_x.mag();
    let scale_y = planar_y.mag();
    let scale_z = planar_z.mag();
    let ex = if scale_x > 0.0 { bounds.x / scale_x } else { f64::INFINITY };
    let ey = if scale_y > 0.0 { bounds.y / scale_y } else { f64::INFINITY };
    let ez = if scale_z > 0.0 { bounds.z / scale_z } else { f64::INFINITY };
    ex.min(ey).min(ez)
}

/// Parameters computed while attempting a line-line blend arc.
pub struct BlendParameters {
    pub theta: f64,
    pub phi: f64,
    pub a_n_max: f64,
    pub l1: f64,
    pub l2: f64,
    pub v_goal: f64,
    pub tolerance: f64,
    pub v_plan: f64,
    pub r_plan: f64,
    pub d_plan: f64,
    pub s_arc: f64,
}

/// Net blend tolerance: the declared per-segment tolerance, or a quarter of
/// nominal length if zero, minimum of both neighbors, clipped by a quarter
/// of each neighbor's nominal length.
pub fn find_blend_tolerance(prev: &Segment, next: &Segment) -> f64 {
    let t_prev = if prev.tolerance > 0.0 { prev.tolerance } else { prev.nominal_length * 0.25 };
    let t_next = if next.tolerance > 0.0 { next.tolerance } else { next.nominal_length * 0.25 };
    let t = t_prev.min(t_next);
    t.min(prev.nominal_length * 0.25).min(next.nominal_length * 0.25)
}

/// Computes blend parameters for a candidate line-line arc. Returns `None`
/// if the blend is geometrically infeasible (radius or arc length below
/// minimum) — the caller should fall back to `Parabolic` in that case.
pub fn compute_line_line_blend(
    geom: &LineJunctionGeom,
    prev: &Segment,
    next: &Segment,
    planar: &PlanarBounds,
    max_feed_scale: f64,
) -> Option<BlendParameters> {
    let (theta, phi) = intersection_angle(geom.u1, geom.u2);
    let binormal = geom.u1.cross(&geom.u2).unit(crate::constants::ANGLE_EPSILON)?;

    let a_max = calculate_inscribed_diameter(binormal, planar.acc_bound);
    let a_n_max = a_max * ACC_RATIO_NORMAL;

    let v_req = prev.reqvel.min(next.reqvel);
    let mut v_goal = v_req * max_feed_scale;
    let v_max = calculate_inscribed_diameter(binormal, planar.vel_bound);
    v_goal = v_goal.min(v_max);

    let l1 = prev.target.min(prev.nominal_length * BLEND_GREEDINESS);
    let l2 = next.target * BLEND_GREEDINESS;

    let tolerance = find_blend_tolerance(prev, next);

    let sin_theta = crate::math::sin(theta);
    if (1.0 - sin_theta).abs() < crate::constants::ANGLE_EPSILON {
        return None;
    }
    let h_tol = tolerance / (1.0 - sin_theta);
    let d_tol = crate::math::cos(theta) * h_tol;

    let d_lengths = l1.min(l2);
    let d_geom = d_lengths.min(d_tol);
    let r_geom = crate::math::tan(theta) * d_geom;

    let v_normal = crate::math::sqrt(a_n_max * r_geom);
    let v_plan = v_normal.min(v_goal);
    let r_plan = v_plan * v_plan / a_n_max;
    let tan_theta = crate::math::tan(theta);
    if tan_theta.abs() < crate::constants::ANGLE_EPSILON {
        return None;
    }
    let d_plan = r_plan / tan_theta;

    let s_arc = r_plan * phi;

    if r_plan < crate::constants::POS_EPSILON || s_arc < MIN_ARC_LENGTH {
        return None;
    }

    Some(BlendParameters { theta, phi, a_n_max, l1, l2, v_goal, tolerance, v_plan, r_plan, d_plan, s_arc })
}

/// Whether the prior line should be fully consumed (popped) rather than
/// shortened, based on how much time its remaining length would take.
pub fn check_consume(param: &BlendParameters, prev: &Segment, gap_cycles: f64) -> bool {
    let l_prev = prev.target - param.d_plan;
    let prev_seg_time = l_prev / param.v_plan;
    prev_seg_time < gap_cycles * prev.cycle_time
}

/// Computes the three points of the spherical blend arc from the junction
/// geometry and blend parameters.
pub fn find_blend_points(
    geom: &LineJunctionGeom,
    param: &BlendParameters,
) -> Option<(Cartesian, Cartesian, Cartesian)> {
    let sin_theta = crate::math::sin(param.theta);
    if sin_theta.abs() < crate::constants::ANGLE_EPSILON {
        return None;
    }
    let center_dist = param.r_plan / sin_theta;
    let normal = (geom.u2 - geom.u1).unit(crate::constants::ANGLE_EPSILON)?;
    let arc_center = geom.p + normal * center_dist;
    let arc_start = geom.p + geom.u1 * (-param.d_plan);
    let arc_end = geom.p + geom.u2 * param.d_plan;
    Some((arc_start, arc_end, arc_center))
}

/// Builds the full line-line blend arc outcome, including whether the
/// prior segment is consumed.
pub fn blend_line_line(
    geom: &LineJunctionGeom,
    prev: &Segment,
    next: &Segment,
    planar: &PlanarBounds,
    max_feed_scale: f64,
    gap_cycles: f64,
) -> BlendOutcome {
    let param = match compute_line_line_blend(geom, prev, next, planar, max_feed_scale) {
        Some(p) => p,
        None => return BlendOutcome::Parabolic,
    };
    let (arc_start, arc_end, arc_center) = match find_blend_points(geom, &param) {
        Some(p) => p,
        None => return BlendOutcome::Parabolic,
    };
    let consume_prev = check_consume(&param, prev, gap_cycles);
    BlendOutcome::Arc {
        arc: SphericalArc::new(arc_start, arc_end, arc_center),
        d_plan: param.d_plan,
        consume_prev,
        shorten_next_by: param.d_plan,
    }
}

/// Per-segment blend velocity for a parabolic-overlap junction: the
/// velocity below which the next segment should begin overlapping the
/// current one. Enforces equal blend time (`v_b / a` constant across the
/// pair) clipped by each segment's triangular-profile peak and by the
/// tolerance-derived chord speed.
pub fn parabolic_blend_velocities(
    prev: &Segment,
    next: &Segment,
    theta: f64,
    tolerance: f64,
) -> (f64, f64, f64, f64) {
    let triangle_prev = crate::math::sqrt(prev.maxaccel * prev.target);
    let triangle_next = crate::math::sqrt(next.maxaccel * next.target);

    let cos_theta = crate::math::cos(theta);
    let chord_prev = if cos_theta.abs() > crate::constants::ANGLE_EPSILON {
        2.0 * crate::math::sqrt(prev.maxaccel * tolerance / cos_theta)
    } else {
        f64::INFINITY
    };
    let chord_next = if cos_theta.abs() > crate::constants::ANGLE_EPSILON {
        2.0 * crate::math::sqrt(next.maxaccel * tolerance / cos_theta)
    } else {
        f64::INFINITY
    };

    let cap_prev = triangle_prev.min(chord_prev);
    let cap_next = triangle_next.min(chord_next);

    let t_blend = (cap_prev / prev.maxaccel).min(cap_next / next.maxaccel);

    let v_b1 = prev.maxaccel * t_blend;
    let v_b2 = next.maxaccel * t_blend;
    (v_b1, v_b2, triangle_prev, triangle_next)
}

/// Junction half-angle `theta` between any two adjacent segments (line,
/// circle, or blend arc), derived from their end/start tangents. Used by
/// the stepper to compute parabolic blend velocities for pairs the line-line
/// arc constructor doesn't handle (circular neighbors, or a pair that
/// already fell back to `Parabolic`). Returns `None` for degenerate tangents.
pub fn generic_junction_theta(prev: &Segment, next: &Segment, epsilon: f64) -> Option<f64> {
    let u1 = prev.end_tangent(epsilon)?;
    let u2 = next.start_tangent(epsilon)?;
    let (theta, _phi) = intersection_angle(u1, u2);
    Some(theta)
}

/// Extracts line-junction geometry (unit tangents and intersection point)
/// from two adjacent linear segments, if both are lines.
pub fn line_junction(prev: &Segment, next: &Segment) -> Option<LineJunctionGeom> {
    match (&prev.geometry, &next.geometry) {
        (Geometry::Linear(p), Geometry::Linear(n)) => {
            let u1 = p.xyz.tangent(crate::constants::ANGLE_EPSILON)?;
            let u2 = n.xyz.tangent(crate::constants::ANGLE_EPSILON)?;
            Some(LineJunctionGeom { u1, u2, p: p.xyz.end })
        }
        _ => None,
    }
}
