//! # LensRay Core
//!
//! Sequential geometric ray tracing through lens systems, and the damped
//! least-squares machinery built on it.
//!
//! ## Architecture
//!
//! An [`system::OpticalSystem`] is an arena of elements (groups, lenses,
//! surfaces, sources) with a precomputed [`system::TransformCache`]. The
//! [`trace::SequentialTracer`] walks a ray through the surfaces in axial
//! order, using [`lensray_geometry`] for intersection and
//! [`lensray_materials`] for refractive indices. Bundles fan out over a
//! [`lensray_compute::ComputeBackend`].
//!
//! ## Modules
//!
//! - [`types`]: Rays, segments and traced paths.
//! - [`system`]: Elements, surfaces, the builder, prescriptions.
//! - [`trace`]: Refraction, the surface walk, bundles.
//! - [`solver`]: Levenberg-Marquardt, chief-ray aiming, auto-adjustment.

pub mod solver;
pub mod system;
pub mod trace;
pub mod types;

pub use system::{OpticalSystem, Prescription, SurfaceSpec, SystemBuilder, SystemError};
pub use trace::{trace_bundle, trace_ray, TraceError};
pub use types::{LightRay, RaySegment, TracedRay};
