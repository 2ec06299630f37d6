//! # LensRay Materials
//!
//! Optical media for the LensRay framework. Every medium implements the
//! [`Medium`](provider::Medium) trait, which returns the complex refractive
//! index $\tilde{n} = n + i\kappa$ at a wavelength. The tracer uses the real
//! part for Snell's law and $\kappa$ for absorption along each segment.
//!
//! ## Available sources
//!
//! | Source | Module | Notes |
//! |--------|--------|-------|
//! | Constant index (air, vacuum, ideal glass) | [`constant`] | Any wavelength |
//! | Sellmeier glasses (N-BK7, F2, N-SF11, fused silica) | [`sellmeier`] | Closed form |
//! | Tabulated (n, κ) data | [`tabulated`] | Cubic-spline interpolated |
//!
//! [`catalog::resolve`] maps the identifiers used in prescriptions to
//! shared medium instances.

pub mod catalog;
pub mod constant;
pub mod provider;
pub mod sellmeier;
pub mod spline;
pub mod tabulated;

pub use provider::{MaterialError, Medium};
