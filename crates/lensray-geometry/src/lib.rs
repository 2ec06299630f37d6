//! # LensRay Geometry
//!
//! Geometry handling for the LensRay framework. This crate provides:
//!
//! - **Rigid transforms** ([`transform`]): Rotation + translation between an
//!   element's local frame and its parent's frame.
//! - **Surface curves** ([`curve`]): Sagitta functions for flat, spherical,
//!   conic, aspheric, cylindrical and biconic surfaces.
//! - **Aperture shapes** ([`shape`]): 2D inside/outside tests applied at the
//!   intersection point.
//! - **Ray-curve intersection** ([`intersect`]): The iterative tangent-plane
//!   intersector used by the sequential tracer at every surface.

pub mod curve;
pub mod intersect;
pub mod shape;
pub mod transform;

pub use curve::Curve;
pub use intersect::intersect;
pub use shape::Shape;
pub use transform::{Transform3, Vec3};
