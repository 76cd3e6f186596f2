use crate::vector::Cartesian;
use crate::{f_cos, f_sin, f_sqrt};

/// A circular or helical arc, one per Cartesian triple.
///
/// `radius_vec` is the vector from `center` to the start point; it fixes
/// both the radius and the angular reference direction. `angle` is the
/// total swept angle in radians (signed: positive is counter-clockwise
/// about `normal`). `rise` is the total displacement along `normal` over
/// the full sweep (zero for a planar circle, non-zero for a helix).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct CartCircle {
    pub center: Cartesian,
    pub normal: Cartesian,
    pub radius_vec: Cartesian,
    pub angle: f64,
    pub rise: f64,
}

impl CartCircle {
    pub fn new(
        center: Cartesian,
        normal: Cartesian,
        radius_vec: Cartesian,
        angle: f64,
        rise: f64,
    ) -> Self {
        CartCircle { center, normal, radius_vec, angle, rise }
    }

    pub fn radius(&self) -> f64 {
        self.radius_vec.mag()
    }

    fn basis(&self, epsilon: f64) -> Option<(Cartesian, Cartesian, Cartesian)> {
        let n = self.normal.unit(epsilon)?;
        let u = self.radius_vec.unit(epsilon)?;
        let v = n.cross(&u);
        Some((u, v, n))
    }

    /// Arc length of the full swept path (includes helical rise).
    pub fn length(&self) -> f64 {
        let r = self.radius();
        let planar = r * self.angle;
        f_sqrt(planar * planar + self.rise * self.rise)
    }

    /// Position at arc-length `s` from the start, clamped to `[0, length]`.
    pub fn point_at(&self, s: f64, epsilon: f64) -> Cartesian {
        let len = self.length();
        if len < epsilon {
            return self.center + self.radius_vec;
        }
        let (u, v, n) = match self.basis(epsilon) {
            Some(b) => b,
            None => return self.center + self.radius_vec,
        };
        let frac = (s.clamp(0.0, len)) / len;
        let theta = frac * self.angle;
        let r = self.radius();
        let radial = u * (r * f_cos(theta)) + v * (r * f_sin(theta));
        let axial = n * (frac * self.rise);
        self.center + radial + axial
    }

    /// Unit tangent at arc-length `s` from the start.
    pub fn tangent_at(&self, s: f64, epsilon: f64) -> Option<Cartesian> {
        let len = self.length();
        if len < epsilon {
            return None;
        }
        let (u, v, n) = self.basis(epsilon)?;
        let frac = (s.clamp(0.0, len)) / len;
        let theta = frac * self.angle;
        let r = self.radius();
        let d_radial = u * (-r * f_sin(theta) * self.angle) + v * (r * f_cos(theta) * self.angle);
        let d_axial = n * self.rise;
        (d_radial + d_axial).unit(epsilon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planar_circle_length_matches_circumference_fraction() {
        let c = CartCircle::new(
            Cartesian::ZERO,
            Cartesian::new(0.0, 0.0, 1.0),
            Cartesian::new(1.0, 0.0, 0.0),
            core::f64::consts::PI,
            0.0,
        );
        assert!((c.length() - core::f64::consts::PI).abs() < 1e-9);
    }

    #[test]
    fn full_turn_returns_to_start() {
        let c = CartCircle::new(
            Cartesian::ZERO,
            Cartesian::new(0.0, 0.0, 1.0),
            Cartesian::new(2.0, 0.0, 0.0),
            2.0 * core::f64::consts::PI,
            0.0,
        );
        let p = c.point_at(c.length(), 1e-9);
        assert!((p.x - 2.0).abs() < 1e-6);
        assert!(p.y.abs() < 1e-6);
    }

    #[test]
    fn helix_rises_along_normal() {
        let c = CartCircle::new(
            Cartesian::ZERO,
            Cartesian::new(0.0, 0.0, 1.0),
            Cartesian::new(1.0, 0.0, 0.0),
            2.0 * core::f64::consts::PI,
            5.0,
        );
        let p = c.point_at(c.length(), 1e-9);
        assert!((p.z - 5.0).abs() < 1e-6);
    }
}
