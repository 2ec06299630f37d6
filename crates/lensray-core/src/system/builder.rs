//! Incremental construction of an [`OpticalSystem`].

use std::sync::Arc;

use lensray_geometry::Transform3;
use lensray_materials::constant::ConstantMedium;
use lensray_materials::Medium;

use super::element::{Element, ElementId, ElementKind, MediumId};
use super::surface::{Surface, SurfaceRole};
use super::{OpticalSystem, SystemError, TransformCache};

/// Default length unit: millimetres.
pub const MILLIMETRE_NM: f64 = 1e6;

/// Builds the element tree and media table of a system.
///
/// The builder starts with a root group (`"system"`) and air as the
/// ambient medium ([`MediumId::AMBIENT`]).
#[derive(Debug, Clone)]
pub struct SystemBuilder {
    elements: Vec<Element>,
    media: Vec<Arc<dyn Medium>>,
    length_unit_nm: f64,
}

impl Default for SystemBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemBuilder {
    pub fn new() -> Self {
        Self {
            elements: vec![Element {
                name: "system".into(),
                kind: ElementKind::Group,
                parent: None,
                children: Vec::new(),
                local: Transform3::identity(),
            }],
            media: vec![Arc::new(ConstantMedium::air())],
            length_unit_nm: MILLIMETRE_NM,
        }
    }

    pub fn root(&self) -> ElementId {
        ElementId(0)
    }

    /// Replace the ambient medium.
    pub fn ambient(mut self, medium: Arc<dyn Medium>) -> Self {
        self.media[0] = medium;
        self
    }

    /// Set how many nanometres one system length unit spans.
    pub fn length_unit_nm(mut self, nm: f64) -> Self {
        self.length_unit_nm = nm;
        self
    }

    pub fn add_medium(&mut self, medium: Arc<dyn Medium>) -> MediumId {
        self.media.push(medium);
        MediumId(self.media.len() - 1)
    }

    pub fn add_group(
        &mut self,
        parent: ElementId,
        name: impl Into<String>,
        local: Transform3,
    ) -> Result<ElementId, SystemError> {
        self.push(parent, name.into(), ElementKind::Group, local)
    }

    pub fn add_lens(
        &mut self,
        parent: ElementId,
        name: impl Into<String>,
        local: Transform3,
    ) -> Result<ElementId, SystemError> {
        self.push(parent, name.into(), ElementKind::Lens, local)
    }

    pub fn add_surface(
        &mut self,
        parent: ElementId,
        name: impl Into<String>,
        local: Transform3,
        surface: Surface,
    ) -> Result<ElementId, SystemError> {
        for medium in [surface.medium_before(), surface.medium_after()] {
            if medium.0 >= self.media.len() {
                return Err(SystemError::UnknownMedium(medium.0));
            }
        }
        self.push(parent, name.into(), ElementKind::Surface(surface), local)
    }

    pub fn add_source(
        &mut self,
        parent: ElementId,
        name: impl Into<String>,
        local: Transform3,
    ) -> Result<ElementId, SystemError> {
        self.push(parent, name.into(), ElementKind::Source, local)
    }

    fn push(
        &mut self,
        parent: ElementId,
        name: String,
        kind: ElementKind,
        local: Transform3,
    ) -> Result<ElementId, SystemError> {
        let id = ElementId(self.elements.len());
        let parent_element = self
            .elements
            .get_mut(parent.0)
            .ok_or(SystemError::UnknownElement(parent))?;
        if !parent_element.kind.is_container() {
            return Err(SystemError::InvalidParent(parent));
        }
        parent_element.children.push(id);
        self.elements.push(Element {
            name,
            kind,
            parent: Some(parent),
            children: Vec::new(),
            local,
        });
        Ok(id)
    }

    /// Compute global transforms, order the surfaces and validate the
    /// result.
    ///
    /// Surfaces are traced in ascending global z of their vertices. Ties
    /// keep insertion order, so a fold mirror and the surface after it may
    /// share a z position.
    pub fn build(self) -> Result<OpticalSystem, SystemError> {
        if !(self.length_unit_nm.is_finite() && self.length_unit_nm > 0.0) {
            return Err(SystemError::InvalidSurface(format!(
                "length unit must be positive, got {} nm",
                self.length_unit_nm
            )));
        }
        let cache = TransformCache::build(&self.elements)?;

        let mut sequence: Vec<ElementId> = self
            .elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.surface().is_some())
            .map(|(i, _)| ElementId(i))
            .collect();
        if sequence.is_empty() {
            return Err(SystemError::EmptySequence);
        }
        let z = |id: &ElementId| cache.frames(*id).0.translation.z;
        sequence.sort_by(|a, b| z(a).total_cmp(&z(b)));

        let surface = |id: ElementId| self.elements[id.0].surface();
        let mut aperture_stop: Option<ElementId> = None;
        let mut image: Option<ElementId> = None;
        for &id in &sequence {
            let Some(s) = surface(id) else { continue };
            match s.role() {
                SurfaceRole::ApertureStop => {
                    if let Some(first) = aperture_stop {
                        return Err(SystemError::MultipleApertureStops { first, second: id });
                    }
                    aperture_stop = Some(id);
                }
                SurfaceRole::Image => {
                    if let Some(first) = image {
                        return Err(SystemError::ImageNotLast { image: first });
                    }
                    image = Some(id);
                }
                _ => {}
            }
        }
        match image {
            None => return Err(SystemError::MissingImage),
            Some(id) if Some(&id) != sequence.last() => {
                return Err(SystemError::ImageNotLast { image: id })
            }
            Some(_) => {}
        }

        log::debug!(
            "built optical system: {} elements, {} surfaces, {} media",
            self.elements.len(),
            sequence.len(),
            self.media.len()
        );

        Ok(OpticalSystem {
            elements: self.elements,
            media: self.media,
            sequence,
            cache,
            aperture_stop,
            length_unit_nm: self.length_unit_nm,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::surface::SurfaceBuilder;
    use lensray_geometry::{Curve, Shape};

    fn surface() -> Surface {
        SurfaceBuilder::new(Curve::from_radius(20.0)).build().unwrap()
    }

    #[test]
    fn test_sequence_sorted_by_global_z() {
        let mut b = SystemBuilder::new();
        let root = b.root();
        let group = b
            .add_group(root, "g", Transform3::translation(0.0, 0.0, 5.0))
            .unwrap();
        let image = b
            .add_surface(
                root,
                "img",
                Transform3::translation(0.0, 0.0, 50.0),
                SurfaceBuilder::image().build().unwrap(),
            )
            .unwrap();
        let late = b
            .add_surface(group, "late", Transform3::translation(0.0, 0.0, 10.0), surface())
            .unwrap();
        let early = b
            .add_surface(root, "early", Transform3::translation(0.0, 0.0, 1.0), surface())
            .unwrap();
        let system = b.build().unwrap();
        assert_eq!(system.sequence(), &[early, late, image]);
        assert_eq!(system.position(late).unwrap().z, 15.0);
        assert_eq!(system.find("late"), Some(late));
    }

    #[test]
    fn test_children_link_to_parent() {
        let mut b = SystemBuilder::new();
        let root = b.root();
        let lens = b.add_lens(root, "L1", Transform3::identity()).unwrap();
        let front = b.add_surface(lens, "front", Transform3::identity(), surface()).unwrap();
        let back = b
            .add_surface(lens, "back", Transform3::translation(0.0, 0.0, 4.0), surface())
            .unwrap();
        b.add_surface(root, "img", Transform3::translation(0.0, 0.0, 30.0), SurfaceBuilder::image().build().unwrap())
            .unwrap();
        let system = b.build().unwrap();
        assert_eq!(lens, ElementId(1));
        assert_eq!(system.element(lens).unwrap().children, vec![front, back]);
        assert_eq!(system.element(back).unwrap().parent, Some(lens));
        assert!(system.element(root).unwrap().children.contains(&lens));
    }

    #[test]
    fn test_flare_stops_are_listed_in_sequence_order() {
        let mut b = SystemBuilder::new();
        let root = b.root();
        let flare = || {
            SurfaceBuilder::new(Curve::Flat)
                .shape(Shape::Circle { radius: 3.0 })
                .role(SurfaceRole::FlareStop)
                .build()
                .unwrap()
        };
        let late = b.add_surface(root, "f2", Transform3::translation(0.0, 0.0, 8.0), flare()).unwrap();
        let early = b.add_surface(root, "f1", Transform3::translation(0.0, 0.0, 2.0), flare()).unwrap();
        b.add_surface(root, "img", Transform3::translation(0.0, 0.0, 10.0), SurfaceBuilder::image().build().unwrap())
            .unwrap();
        let system = b.build().unwrap();
        assert_eq!(system.flare_stops(), vec![early, late]);
        assert_eq!(system.aperture_stop(), None);
    }

    #[test]
    fn test_validation_errors() {
        let b = SystemBuilder::new();
        assert_eq!(b.build().unwrap_err(), SystemError::EmptySequence);

        let mut b = SystemBuilder::new();
        let root = b.root();
        b.add_surface(root, "s", Transform3::identity(), surface())
            .unwrap();
        assert_eq!(b.build().unwrap_err(), SystemError::MissingImage);

        let mut b = SystemBuilder::new();
        let root = b.root();
        let image = b
            .add_surface(root, "img", Transform3::identity(), SurfaceBuilder::image().build().unwrap())
            .unwrap();
        b.add_surface(root, "s", Transform3::translation(0.0, 0.0, 1.0), surface())
            .unwrap();
        assert_eq!(b.build().unwrap_err(), SystemError::ImageNotLast { image });

        let mut b = SystemBuilder::new();
        let root = b.root();
        let stop = || SurfaceBuilder::aperture_stop(Shape::Circle { radius: 1.0 }).build().unwrap();
        let first = b.add_surface(root, "a", Transform3::identity(), stop()).unwrap();
        let second = b
            .add_surface(root, "b", Transform3::translation(0.0, 0.0, 1.0), stop())
            .unwrap();
        b.add_surface(root, "img", Transform3::translation(0.0, 0.0, 2.0), SurfaceBuilder::image().build().unwrap())
            .unwrap();
        assert_eq!(
            b.build().unwrap_err(),
            SystemError::MultipleApertureStops { first, second }
        );
    }

    #[test]
    fn test_surfaces_cannot_be_parents() {
        let mut b = SystemBuilder::new();
        let root = b.root();
        let s = b.add_surface(root, "s", Transform3::identity(), surface()).unwrap();
        assert_eq!(
            b.add_group(s, "g", Transform3::identity()).unwrap_err(),
            SystemError::InvalidParent(s)
        );
        assert!(b.add_group(ElementId(42), "g", Transform3::identity()).is_err());
    }

    #[test]
    fn test_unregistered_medium_rejected() {
        let mut b = SystemBuilder::new();
        let root = b.root();
        let s = SurfaceBuilder::new(Curve::Flat)
            .media(MediumId::AMBIENT, MediumId(3))
            .build()
            .unwrap();
        assert_eq!(
            b.add_surface(root, "s", Transform3::identity(), s).unwrap_err(),
            SystemError::UnknownMedium(3)
        );
    }
}
