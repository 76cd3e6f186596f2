//! Cartesian vector, line, circle and spherical-arc primitives.
//!
//! This crate is a minimal geometry kernel: it carries exactly the
//! operations a trajectory planner needs (length, point-at-parameter,
//! start/end tangent, stretch) and nothing from a general CAD/CAM vector
//! library.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
use libm::{acos, cos, sin, sqrt};

mod arc;
mod circle;
mod line;
mod pose;
mod vector;

pub use arc::SphericalArc;
pub use circle::CartCircle;
pub use line::CartLine;
pub use pose::Pose9;
pub use vector::Cartesian;

#[cfg(feature = "std")]
pub(crate) fn f_sqrt(x: f64) -> f64 {
    x.sqrt()
}
#[cfg(not(feature = "std"))]
pub(crate) fn f_sqrt(x: f64) -> f64 {
    sqrt(x)
}

#[cfg(feature = "std")]
pub(crate) fn f_acos(x: f64) -> f64 {
    x.acos()
}
#[cfg(not(feature = "std"))]
pub(crate) fn f_acos(x: f64) -> f64 {
    acos(x)
}

#[cfg(feature = "std")]
pub(crate) fn f_sin(x: f64) -> f64 {
    x.sin()
}
#[cfg(not(feature = "std"))]
pub(crate) fn f_sin(x: f64) -> f64 {
    sin(x)
}

#[cfg(feature = "std")]
pub(crate) fn f_cos(x: f64) -> f64 {
    x.cos()
}
#[cfg(not(feature = "std"))]
pub(crate) fn f_cos(x: f64) -> f64 {
    cos(x)
}
