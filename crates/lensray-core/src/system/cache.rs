//! Precomputed global transforms.
//!
//! Built once, walking the arena in id order: a parent always precedes its
//! children, so each global transform is the parent's global composed with
//! the element's local transform. Inverses are stored alongside so the
//! tracer never inverts on the hot path.

use lensray_geometry::Transform3;

use super::element::{Element, ElementId};
use super::SystemError;

#[derive(Debug, Clone)]
pub struct TransformCache {
    globals: Vec<Transform3>,
    inverses: Vec<Transform3>,
}

impl TransformCache {
    pub fn build(elements: &[Element]) -> Result<Self, SystemError> {
        let mut globals: Vec<Transform3> = Vec::with_capacity(elements.len());
        for (i, element) in elements.iter().enumerate() {
            let global = match element.parent {
                None => element.local,
                Some(parent) if parent.0 < i => globals[parent.0].compose(&element.local),
                Some(parent) => return Err(SystemError::UnknownElement(parent)),
            };
            globals.push(global);
        }
        let inverses = globals.iter().map(Transform3::inverse).collect();
        Ok(Self { globals, inverses })
    }

    /// Local-to-global transform of `id`.
    pub fn global(&self, id: ElementId) -> Result<&Transform3, SystemError> {
        self.globals
            .get(id.0)
            .ok_or(SystemError::UnknownElement(id))
    }

    /// Global-to-local transform of `id`.
    pub fn global_inverse(&self, id: ElementId) -> Result<&Transform3, SystemError> {
        self.inverses
            .get(id.0)
            .ok_or(SystemError::UnknownElement(id))
    }

    /// Transform from `to`'s frame into `from`'s frame.
    pub fn relative(&self, from: ElementId, to: ElementId) -> Result<Transform3, SystemError> {
        Ok(self.global_inverse(from)?.compose(self.global(to)?))
    }

    pub fn len(&self) -> usize {
        self.globals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.globals.is_empty()
    }

    /// `(global, inverse)` for an id known to be valid.
    pub(crate) fn frames(&self, id: ElementId) -> (&Transform3, &Transform3) {
        (&self.globals[id.0], &self.inverses[id.0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::element::ElementKind;
    use approx::assert_abs_diff_eq;
    use lensray_geometry::Vec3;

    fn node(parent: Option<usize>, local: Transform3) -> Element {
        Element {
            name: String::new(),
            kind: ElementKind::Group,
            parent: parent.map(ElementId),
            children: Vec::new(),
            local,
        }
    }

    #[test]
    fn test_global_is_composed_chain() {
        let a = Transform3::translation(0.0, 0.0, 10.0);
        let b = Transform3::from_tilt_degrees([5.0, 0.0, 0.0], Vec3::new(1.0, 0.0, 2.0));
        let c = Transform3::translation(0.0, 0.5, 3.0);
        let cache =
            TransformCache::build(&[node(None, a), node(Some(0), b), node(Some(1), c)]).unwrap();
        let p = Vec3::new(0.1, 0.2, 0.3);
        let expected = a.apply_point(&b.apply_point(&c.apply_point(&p)));
        let got = cache.global(ElementId(2)).unwrap().apply_point(&p);
        assert_abs_diff_eq!(got, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_relative_round_trip() {
        let cache = TransformCache::build(&[
            node(None, Transform3::identity()),
            node(
                Some(0),
                Transform3::from_tilt_degrees([10.0, -20.0, 5.0], Vec3::new(1.0, 2.0, 3.0)),
            ),
            node(
                Some(0),
                Transform3::from_tilt_degrees([0.0, 30.0, 0.0], Vec3::new(-1.0, 0.0, 8.0)),
            ),
        ])
        .unwrap();
        let ab = cache.relative(ElementId(1), ElementId(2)).unwrap();
        let ba = cache.relative(ElementId(2), ElementId(1)).unwrap();
        assert!(ab.compose(&ba).is_identity(1e-12));
        let global = cache.global(ElementId(1)).unwrap();
        let inverse = cache.global_inverse(ElementId(1)).unwrap();
        assert!(global.compose(inverse).is_identity(1e-12));
    }

    #[test]
    fn test_unknown_ids_are_errors() {
        let cache = TransformCache::build(&[node(None, Transform3::identity())]).unwrap();
        assert_eq!(
            cache.global(ElementId(3)).unwrap_err(),
            SystemError::UnknownElement(ElementId(3))
        );
        assert!(cache.relative(ElementId(0), ElementId(1)).is_err());
        assert!(TransformCache::build(&[node(Some(0), Transform3::identity())]).is_err());
    }
}
