use crate::Cartesian;

/// A straight line segment between two points, one per Cartesian triple
/// (XYZ, UVW or ABC).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct CartLine {
    pub start: Cartesian,
    pub end: Cartesian,
}

impl CartLine {
    pub fn new(start: Cartesian, end: Cartesian) -> Self {
        CartLine { start, end }
    }

    pub fn length(&self) -> f64 {
        (self.end - self.start).mag()
    }

    /// Unit tangent at any point along the line (constant).
    pub fn tangent(&self, epsilon: f64) -> Option<Cartesian> {
        (self.end - self.start).unit(epsilon)
    }

    /// Point at arc-length `s` from `start`, clamped to `[0, length]`.
    pub fn point_at(&self, s: f64, epsilon: f64) -> Cartesian {
        let len = self.length();
        if len < epsilon {
            return self.start;
        }
        let clamped = s.clamp(0.0, len);
        match self.tangent(epsilon) {
            Some(u) => self.start + u * clamped,
            None => self.start,
        }
    }

    /// Shortens the line by moving `start` forward by `d` along its tangent,
    /// used when a blend arc consumes part of a neighboring line.
    pub fn shorten_start(&self, d: f64, epsilon: f64) -> CartLine {
        let new_start = self.point_at(d, epsilon);
        CartLine::new(new_start, self.end)
    }

    /// Shortens the line by moving `end` backward by `d` along its tangent.
    pub fn shorten_end(&self, d: f64, epsilon: f64) -> CartLine {
        let len = self.length();
        let new_end = self.point_at((len - d).max(0.0), epsilon);
        CartLine::new(self.start, new_end)
    }
}
