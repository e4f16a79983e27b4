//! Basic numerical concepts used throughout the program

#![allow(missing_docs)]

// Floating-point precision is configured here
#[cfg(feature = "f32")]
pub type Float = f32;
#[cfg(feature = "f32")]
pub use std::f32 as reals;
#[cfg(not(feature = "f32"))]
pub type Float = f64;
#[cfg(not(feature = "f32"))]
pub use std::f64 as reals;

/// Physical constants of the decay hypothesis
pub mod consts {
    use super::Float;

    /// Electron rest mass (MeV)
    pub const ELECTRON_MASS: Float = 0.511;

    /// Speed of light in vacuum (mm/ns)
    pub const SPEED_OF_LIGHT: Float = 299.792458;
}
