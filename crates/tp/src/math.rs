//! `std`/`no_std` math shims, mirroring the pattern used throughout the
//! workspace's other `no_std`-capable crates.

#[cfg(not(feature = "std"))]
use libm::{acos, cos, sin, sqrt, tan};

#[cfg(feature = "std")]
pub fn sqrt(x: f64) -> f64 {
    x.sqrt()
}
#[cfg(not(feature = "std"))]
pub fn sqrt(x: f64) -> f64 {
    sqrt(x)
}

#[cfg(feature = "std")]
pub fn acos(x: f64) -> f64 {
    x.acos()
}
#[cfg(not(feature = "std"))]
pub fn acos(x: f64) -> f64 {
    acos(x)
}

#[cfg(feature = "std")]
pub fn sin(x: f64) -> f64 {
    x.sin()
}
#[cfg(not(feature = "std"))]
pub fn sin(x: f64) -> f64 {
    sin(x)
}

#[cfg(feature = "std")]
pub fn cos(x: f64) -> f64 {
    x.cos()
}
#[cfg(not(feature = "std"))]
pub fn cos(x: f64) -> f64 {
    cos(x)
}

#[cfg(feature = "std")]
pub fn tan(x: f64) -> f64 {
    x.tan()
}
#[cfg(not(feature = "std"))]
pub fn tan(x: f64) -> f64 {
    tan(x)
}
