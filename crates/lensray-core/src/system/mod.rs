//! The optical system: an arena of elements, its media, the traced surface
//! sequence and the cached global transforms.
//!
//! Systems are assembled with [`SystemBuilder`] (or from a tabular
//! [`Prescription`]) and are immutable afterwards. Every query the tracer
//! makes on the hot path is an index into a precomputed table.

pub mod builder;
pub mod cache;
pub mod element;
pub mod prescription;
pub mod surface;

use std::sync::Arc;

use lensray_geometry::Vec3;
use lensray_materials::{MaterialError, Medium};
use thiserror::Error;

pub use builder::SystemBuilder;
pub use cache::TransformCache;
pub use element::{Element, ElementId, ElementKind, MediumId};
pub use prescription::{Prescription, SurfaceSpec};
pub use surface::{Interaction, Surface, SurfaceBuilder, SurfaceRole};

/// Errors raised while assembling or querying an optical system.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SystemError {
    #[error("System has no surfaces to trace")]
    EmptySequence,

    #[error("System has no image surface")]
    MissingImage,

    #[error("Image surface {image} is not the last surface in the sequence")]
    ImageNotLast { image: ElementId },

    #[error("System has more than one aperture stop ({first} and {second})")]
    MultipleApertureStops { first: ElementId, second: ElementId },

    #[error("Unknown element {0}")]
    UnknownElement(ElementId),

    #[error("Element {0} is not a surface")]
    NotASurface(ElementId),

    #[error("Element {0} cannot have children")]
    InvalidParent(ElementId),

    #[error("Unknown medium id {0}")]
    UnknownMedium(usize),

    #[error("Medium for surface {surface}: {source}")]
    Material {
        surface: usize,
        #[source]
        source: MaterialError,
    },

    #[error("Surface '{surface}' is out of order along the optical axis")]
    SequenceOrder { surface: String },

    #[error("Invalid surface: {0}")]
    InvalidSurface(String),
}

/// A built optical system.
#[derive(Debug, Clone)]
pub struct OpticalSystem {
    elements: Vec<Element>,
    media: Vec<Arc<dyn Medium>>,
    sequence: Vec<ElementId>,
    cache: TransformCache,
    aperture_stop: Option<ElementId>,
    length_unit_nm: f64,
}

impl OpticalSystem {
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn element(&self, id: ElementId) -> Result<&Element, SystemError> {
        self.elements
            .get(id.0)
            .ok_or(SystemError::UnknownElement(id))
    }

    /// The surface stored at `id`.
    pub fn surface(&self, id: ElementId) -> Result<&Surface, SystemError> {
        self.element(id)?
            .surface()
            .ok_or(SystemError::NotASurface(id))
    }

    /// Find an element by name.
    pub fn find(&self, name: &str) -> Option<ElementId> {
        self.elements
            .iter()
            .position(|e| e.name == name)
            .map(ElementId)
    }

    /// Surfaces in trace order. The image is always last.
    pub fn sequence(&self) -> &[ElementId] {
        &self.sequence
    }

    /// Iterate over `(id, surface)` pairs in trace order.
    pub fn surfaces(&self) -> impl Iterator<Item = (ElementId, &Surface)> + '_ {
        self.sequence.iter().map(move |&id| (id, self.surface_at(id)))
    }

    pub fn first_surface(&self) -> ElementId {
        self.sequence[0]
    }

    pub fn image(&self) -> ElementId {
        self.sequence[self.sequence.len() - 1]
    }

    pub fn aperture_stop(&self) -> Option<ElementId> {
        self.aperture_stop
    }

    pub fn flare_stops(&self) -> Vec<ElementId> {
        self.surfaces()
            .filter(|(_, s)| s.role() == SurfaceRole::FlareStop)
            .map(|(id, _)| id)
            .collect()
    }

    /// Point sources, in insertion order.
    pub fn sources(&self) -> Vec<ElementId> {
        self.elements
            .iter()
            .enumerate()
            .filter(|(_, e)| matches!(e.kind, ElementKind::Source))
            .map(|(i, _)| ElementId(i))
            .collect()
    }

    /// Global position of an element's origin.
    pub fn position(&self, id: ElementId) -> Result<Vec3, SystemError> {
        Ok(self.cache.global(id)?.translation)
    }

    pub fn cache(&self) -> &TransformCache {
        &self.cache
    }

    pub fn medium(&self, id: MediumId) -> Result<&Arc<dyn Medium>, SystemError> {
        self.media.get(id.0).ok_or(SystemError::UnknownMedium(id.0))
    }

    pub fn media(&self) -> &[Arc<dyn Medium>] {
        &self.media
    }

    /// Nanometres per system length unit.
    pub fn length_unit_nm(&self) -> f64 {
        self.length_unit_nm
    }

    /// Sequence entries are surfaces by construction.
    pub(crate) fn surface_at(&self, id: ElementId) -> &Surface {
        match &self.elements[id.0].kind {
            ElementKind::Surface(s) => s,
            _ => unreachable!("sequence entry {id} is not a surface"),
        }
    }

    /// Surface media are validated by the builder.
    pub(crate) fn medium_at(&self, id: MediumId) -> &dyn Medium {
        self.media[id.0].as_ref()
    }
}
