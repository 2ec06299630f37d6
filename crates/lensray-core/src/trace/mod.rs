//! Sequential ray tracing.
//!
//! - [`interact`]: Refraction and reflection in vector form.
//! - [`sequential`]: The per-ray surface walk.
//! - [`bundle`]: Field points, pupil sampling and parallel bundle traces.

pub mod bundle;
pub mod interact;
pub mod sequential;

use lensray_geometry::Vec3;
use lensray_materials::MaterialError;
use thiserror::Error;

use crate::system::ElementId;

pub use bundle::{trace_bundle, Distribution, FieldPoint, RayBundleSpec, RayOutcome, TraceResults};
pub use sequential::{trace_ray, SequentialTracer};

/// Why a ray failed to reach the image.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TraceError {
    #[error("Ray missed surface {surface}")]
    MissedSurface { surface: ElementId },

    #[error("Ray blocked by the aperture of surface {surface}")]
    ObstructedByAperture { surface: ElementId },

    #[error("Total internal reflection at surface {surface} (n = {n_in} -> {n_out})")]
    TotalInternalReflection {
        surface: ElementId,
        /// Incident direction, global.
        incident: Vec3,
        /// Surface normal, global.
        normal: Vec3,
        n_in: f64,
        n_out: f64,
    },

    #[error("Medium error at surface {surface}: {source}")]
    Medium {
        surface: ElementId,
        #[source]
        source: MaterialError,
    },
}

impl TraceError {
    /// The surface at which the ray failed.
    pub fn surface(&self) -> ElementId {
        match self {
            TraceError::MissedSurface { surface }
            | TraceError::ObstructedByAperture { surface }
            | TraceError::TotalInternalReflection { surface, .. }
            | TraceError::Medium { surface, .. } => *surface,
        }
    }
}
