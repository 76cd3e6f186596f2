use crate::vector::Cartesian;
use crate::f_sqrt;

/// A small spherical arc spliced between two line (or line/arc) segments to
/// round a corner. Unlike `CartCircle` this carries its endpoints directly
/// rather than an angle, since blend arcs are always constructed from
/// `arc_start`/`arc_end`/`arc_center` (see `blendFindPoints3` in the
/// original blend math).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct SphericalArc {
    pub start: Cartesian,
    pub end: Cartesian,
    pub center: Cartesian,
}

impl SphericalArc {
    pub fn new(start: Cartesian, end: Cartesian, center: Cartesian) -> Self {
        SphericalArc { start, end, center }
    }

    pub fn radius(&self) -> f64 {
        (self.start - self.center).mag()
    }

    /// Angle swept between `start` and `end`, in `[0, pi]`.
    pub fn angle(&self, epsilon: f64) -> f64 {
        let r1 = match (self.start - self.center).unit(epsilon) {
            Some(u) => u,
            None => return 0.0,
        };
        let r2 = match (self.end - self.center).unit(epsilon) {
            Some(u) => u,
            None => return 0.0,
        };
        crate::f_acos(r1.dot(&r2).clamp(-1.0, 1.0))
    }

    pub fn length(&self, epsilon: f64) -> f64 {
        self.radius() * self.angle(epsilon)
    }

    /// Unit tangent at arc-length `s` from `start`. The derivative of
    /// `point_at` w.r.t. arc length is already unit-length since `r1`/`perp`
    /// are orthonormal and `dtheta/ds = 1/radius`.
    pub fn tangent_at(&self, s: f64, epsilon: f64) -> Option<Cartesian> {
        let angle = self.angle(epsilon);
        let len = self.length(epsilon);
        if len < epsilon || angle < epsilon {
            return None;
        }
        let frac = (s.clamp(0.0, len)) / len;
        let theta = frac * angle;

        let r1 = (self.start - self.center).unit(epsilon)?;
        let r2 = (self.end - self.center).unit(epsilon)?;
        let proj = r1.dot(&r2);
        let perp = (r2 - r1 * proj).unit(epsilon)?;
        (r1 * (-crate::f_sin(theta)) + perp * crate::f_cos(theta)).unit(epsilon)
    }

    /// Position at arc-length `s` from `start`, via spherical interpolation
    /// between the start and end radius vectors.
    pub fn point_at(&self, s: f64, epsilon: f64) -> Cartesian {
        let angle = self.angle(epsilon);
        let len = self.length(epsilon);
        if len < epsilon || angle < epsilon {
            return self.start;
        }
        let frac = (s.clamp(0.0, len)) / len;
        let theta = frac * angle;

        let r1 = match (self.start - self.center).unit(epsilon) {
            Some(u) => u,
            None => return self.start,
        };
        let r2 = match (self.end - self.center).unit(epsilon) {
            Some(u) => u,
            None => return self.start,
        };
        // Orthonormalize r2 against r1 (Gram-Schmidt) to get the in-plane
        // perpendicular basis vector, then rotate r1 toward it by theta.
        let proj = r1.dot(&r2);
        let perp_raw = r2 - r1 * proj;
        let perp = match perp_raw.unit(epsilon) {
            Some(u) => u,
            None => return self.start,
        };
        let radius = self.radius();
        let dir = r1 * crate::f_cos(theta) + perp * crate::f_sin(theta);
        self.center + dir * radius
    }
}
