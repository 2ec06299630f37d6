//! The sequential surface walk.
//!
//! A ray visits every surface of [`OpticalSystem::sequence`] exactly once,
//! in order. At each surface it is moved into the surface's local frame,
//! intersected with the curve, checked against the clear aperture,
//! attenuated over the path it just travelled and then refracted, reflected
//! or passed through. Any failure ends the ray; reaching the image surface
//! is success.

use lensray_materials::provider::transmission;

use super::interact::{reflect, refract};
use super::TraceError;
use crate::system::{Interaction, OpticalSystem};
use crate::types::{LightRay, RaySegment, TracedRay};

/// Traces rays through one system. Cheap to construct and `Sync`, so a
/// single tracer can be shared across worker threads.
#[derive(Debug, Clone, Copy)]
pub struct SequentialTracer<'a> {
    system: &'a OpticalSystem,
}

impl<'a> SequentialTracer<'a> {
    pub fn new(system: &'a OpticalSystem) -> Self {
        Self { system }
    }

    pub fn system(&self) -> &'a OpticalSystem {
        self.system
    }

    /// Trace `ray` to the image surface.
    pub fn trace(&self, ray: &LightRay) -> Result<TracedRay, TraceError> {
        let system = self.system;
        let wavelength = ray.wavelength_nm;
        let unit_nm = system.length_unit_nm();

        let mut origin = ray.origin;
        let mut direction = ray.direction;
        let mut intensity = ray.intensity;
        let mut optical_path = 0.0;
        let mut segments = Vec::with_capacity(system.sequence().len());

        for &id in system.sequence() {
            let surface = system.surface_at(id);
            let (global, inverse) = system.cache().frames(id);

            let local_origin = inverse.apply_point(&origin);
            let local_direction = inverse.apply_vector(&direction);
            let local_point = surface
                .curve()
                .intersect(&local_origin, &local_direction)
                .ok_or(TraceError::MissedSurface { surface: id })?;

            if !surface.pass_unobstructed() && !surface.shape().inside(local_point.x, local_point.y) {
                log::trace!("ray obstructed at {id}: ({:.4}, {:.4})", local_point.x, local_point.y);
                return Err(TraceError::ObstructedByAperture { surface: id });
            }

            let medium_error = |source| TraceError::Medium { surface: id, source };
            let n_in = system
                .medium_at(surface.medium_before())
                .refractive_index(wavelength)
                .map_err(medium_error)?;
            let length = (local_point - local_origin).norm();
            intensity *= transmission(n_in.im, length * unit_nm, wavelength);
            optical_path += n_in.re * length;

            let local_normal = surface
                .curve()
                .normal(local_point.x, local_point.y)
                .ok_or(TraceError::MissedSurface { surface: id })?;

            let outgoing = match surface.interaction() {
                Interaction::Transmit => local_direction,
                Interaction::Reflect => reflect(&local_direction, &local_normal),
                Interaction::Refract => {
                    let n_out = system
                        .medium_at(surface.medium_after())
                        .index(wavelength)
                        .map_err(medium_error)?;
                    refract(&local_direction, &local_normal, n_in.re, n_out).ok_or_else(|| {
                        log::trace!("total internal reflection at {id}");
                        TraceError::TotalInternalReflection {
                            surface: id,
                            incident: direction,
                            normal: global.apply_vector(&local_normal),
                            n_in: n_in.re,
                            n_out,
                        }
                    })?
                }
            };

            let point = global.apply_point(&local_point);
            direction = global.apply_vector(&outgoing).normalize();
            segments.push(RaySegment {
                surface: id,
                point,
                local_point,
                direction,
                normal: global.apply_vector(&local_normal),
                intensity,
                optical_path,
            });
            origin = point;
        }

        Ok(TracedRay {
            ray: *ray,
            segments,
        })
    }
}

/// Trace a single ray through `system`.
pub fn trace_ray(system: &OpticalSystem, ray: &LightRay) -> Result<TracedRay, TraceError> {
    SequentialTracer::new(system).trace(ray)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::{MediumId, Prescription, SurfaceBuilder, SurfaceSpec, SystemBuilder};
    use approx::assert_abs_diff_eq;
    use lensray_geometry::{Curve, Transform3, Vec3};
    use lensray_materials::constant::ConstantMedium;
    use std::sync::Arc;

    fn window() -> OpticalSystem {
        Prescription::new(vec![
            SurfaceSpec::flat(10.0).with_material("1.5").with_semi_diameter(5.0),
            SurfaceSpec::flat(20.0),
            SurfaceSpec::image(),
        ])
        .build()
        .unwrap()
    }

    #[test]
    fn test_axial_ray_through_window() {
        let system = window();
        let ray = LightRay::new(Vec3::new(0.0, 1.0, -5.0), Vec3::z(), 550.0);
        let traced = trace_ray(&system, &ray).unwrap();
        assert_eq!(traced.segments.len(), 3);
        let image = traced.image().unwrap();
        assert_abs_diff_eq!(image.point, Vec3::new(0.0, 1.0, 30.0), epsilon = 1e-12);
        // 5 in air, 10 in glass, 20 in air
        assert_abs_diff_eq!(image.optical_path, 5.0 + 15.0 + 20.0, epsilon = 1e-12);
        assert_eq!(image.intensity, 1.0);
    }

    #[test]
    fn test_tilted_ray_is_displaced_by_slab() {
        let system = window();
        let theta: f64 = 20f64.to_radians();
        let ray = LightRay::new(Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, theta.sin(), theta.cos()), 550.0);
        let traced = trace_ray(&system, &ray).unwrap();
        // Exit direction is parallel to the entrance direction.
        assert_abs_diff_eq!(traced.image().unwrap().direction, ray.direction, epsilon = 1e-14);
        let inside = traced.segments[0].direction;
        assert_abs_diff_eq!(1.5 * inside.y, theta.sin(), epsilon = 1e-14);
    }

    #[test]
    fn test_aperture_blocks_ray() {
        let system = window();
        let ray = LightRay::new(Vec3::new(0.0, 6.0, -5.0), Vec3::z(), 550.0);
        let err = trace_ray(&system, &ray).unwrap_err();
        assert_eq!(
            err,
            TraceError::ObstructedByAperture {
                surface: system.sequence()[0]
            }
        );
    }

    #[test]
    fn test_absorbing_medium_attenuates() {
        let mut b = SystemBuilder::new();
        let root = b.root();
        let ink = b.add_medium(Arc::new(ConstantMedium::absorbing("ink", 1.5, 1e-6)));
        let flat = |before, after| {
            SurfaceBuilder::new(Curve::Flat)
                .media(before, after)
                .build()
                .unwrap()
        };
        b.add_surface(root, "in", Transform3::identity(), flat(MediumId::AMBIENT, ink))
            .unwrap();
        b.add_surface(root, "out", Transform3::translation(0.0, 0.0, 10.0), flat(ink, MediumId::AMBIENT))
            .unwrap();
        b.add_surface(
            root,
            "img",
            Transform3::translation(0.0, 0.0, 11.0),
            SurfaceBuilder::image().build().unwrap(),
        )
        .unwrap();
        let system = b.build().unwrap();
        let ray = LightRay::new(Vec3::new(0.0, 0.0, -1.0), Vec3::z(), 500.0);
        let traced = trace_ray(&system, &ray).unwrap();
        // 10 mm of kappa = 1e-6 at 500 nm
        let expected = (-4.0 * std::f64::consts::PI * 1e-6 * 10.0 * 1e6 / 500.0).exp();
        assert_abs_diff_eq!(traced.final_intensity(), expected, epsilon = 1e-12);
        assert_eq!(traced.segments[0].intensity, 1.0);
    }

    #[test]
    fn test_degenerate_direction_misses_first_surface() {
        let system = Prescription::new(vec![SurfaceSpec::flat(10.0), SurfaceSpec::image()])
            .build()
            .unwrap();
        // An object point on the launch target has no direction to travel.
        let field = crate::trace::FieldPoint::Point {
            position: [1.0, 2.0, 0.0],
        };
        let ray = field.ray_through(&system, 1.0, 2.0, 550.0);
        assert!(ray.direction.iter().any(|v| v.is_nan()));
        let first = system.first_surface();
        assert_eq!(
            trace_ray(&system, &ray).unwrap_err(),
            TraceError::MissedSurface { surface: first }
        );
    }

    #[test]
    fn test_out_of_range_wavelength_is_medium_error() {
        let system = Prescription::new(vec![
            SurfaceSpec::flat(5.0).with_material("N-BK7"),
            SurfaceSpec::flat(5.0),
            SurfaceSpec::image(),
        ])
        .build()
        .unwrap();
        let ray = LightRay::new(Vec3::new(0.0, 0.0, -1.0), Vec3::z(), 5000.0);
        let err = trace_ray(&system, &ray).unwrap_err();
        assert!(matches!(err, TraceError::Medium { .. }));
        assert_eq!(err.surface(), system.sequence()[0]);
    }
}
