use crate::Cartesian;

/// A full nine-axis pose: translational XYZ, tool-axis UVW, rotary ABC.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct Pose9 {
    pub xyz: Cartesian,
    pub uvw: Cartesian,
    pub abc: Cartesian,
}

impl Pose9 {
    pub const ZERO: Pose9 = Pose9 {
        xyz: Cartesian::ZERO,
        uvw: Cartesian::ZERO,
        abc: Cartesian::ZERO,
    };

    pub const fn new(xyz: Cartesian, uvw: Cartesian, abc: Cartesian) -> Self {
        Pose9 { xyz, uvw, abc }
    }

    /// Tuple form `(x,y,z,a,b,c,u,v,w)` matching the external interface.
    pub fn as_tuple(&self) -> (f64, f64, f64, f64, f64, f64, f64, f64, f64) {
        (
            self.xyz.x, self.xyz.y, self.xyz.z, self.abc.x, self.abc.y, self.abc.z, self.uvw.x,
            self.uvw.y, self.uvw.z,
        )
    }

    pub fn from_tuple(t: (f64, f64, f64, f64, f64, f64, f64, f64, f64)) -> Self {
        Pose9 {
            xyz: Cartesian::new(t.0, t.1, t.2),
            abc: Cartesian::new(t.3, t.4, t.5),
            uvw: Cartesian::new(t.6, t.7, t.8),
        }
    }
}
