//! Arena elements of the optical-system tree.

use std::fmt;

use lensray_geometry::Transform3;
use serde::{Deserialize, Serialize};

use super::surface::Surface;

/// Index of an element in the system arena.
///
/// Ids are assigned in insertion order, so a parent's id is always smaller
/// than its children's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub usize);

impl ElementId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index of a medium registered with a system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediumId(pub usize);

impl MediumId {
    /// The system's ambient (object-space) medium.
    pub const AMBIENT: MediumId = MediumId(0);
}

/// What an element is.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    /// A container that positions its children.
    Group,
    /// A container for the surfaces of one lens (singlet or cemented group).
    Lens,
    /// An optical surface, including stops and the image plane.
    Surface(Surface),
    /// A point source; its global origin is a finite object point.
    Source,
}

impl ElementKind {
    /// Whether elements of this kind may have children.
    pub fn is_container(&self) -> bool {
        matches!(self, ElementKind::Group | ElementKind::Lens)
    }
}

/// A node of the optical-system tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub kind: ElementKind,
    pub parent: Option<ElementId>,
    pub children: Vec<ElementId>,
    /// Transform from this element's frame into its parent's frame.
    pub local: Transform3,
}

impl Element {
    pub fn surface(&self) -> Option<&Surface> {
        match &self.kind {
            ElementKind::Surface(s) => Some(s),
            _ => None,
        }
    }
}
