//! Iterative ray-curve intersection.
//!
//! The ray is first intersected with the curve's tangent plane at the vertex
//! (local z = 0). The seed is then refined by repeatedly projecting onto the
//! surface (replacing z with the sagitta), taking the tangent plane there
//! and re-intersecting the original ray with it. This is Newton's method
//! along the ray and converges quadratically for smooth curves.
//!
//! If the iteration cap is reached without the sagitta settling, the last
//! estimate is returned rather than a failure; callers tolerate residual
//! error up to that cap.

use crate::curve::Curve;
use crate::transform::Vec3;

/// Upper bound on refinement steps.
pub const MAX_ITERATIONS: usize = 32;

/// Convergence threshold on successive sagitta estimates.
pub const SAG_TOLERANCE: f64 = 1e-10;

const PARALLEL_EPS: f64 = 1e-15;

/// Intersect a ray (in the curve's local frame) with `curve`.
///
/// `direction` need not be normalised. Returns `None` (a miss) if the ray is
/// not finite or is parallel to the vertex plane, the vertex-plane hit lies
/// behind `origin`, the ray wanders outside the curve's domain, or a tangent
/// plane is parallel to the ray.
pub fn intersect(origin: &Vec3, direction: &Vec3, curve: &Curve) -> Option<Vec3> {
    intersect_with_limit(origin, direction, curve, MAX_ITERATIONS)
}

/// [`intersect`] with an explicit cap on refinement steps. When the cap is
/// reached the last estimate is returned.
pub fn intersect_with_limit(
    origin: &Vec3,
    direction: &Vec3,
    curve: &Curve,
    max_iterations: usize,
) -> Option<Vec3> {
    if !origin.iter().chain(direction.iter()).all(|v| v.is_finite()) {
        return None;
    }
    if direction.z.abs() < PARALLEL_EPS {
        return None;
    }
    let t = -origin.z / direction.z;
    if t < 0.0 {
        return None;
    }
    let seed = origin + direction * t;
    if matches!(curve, Curve::Flat) {
        return Some(Vec3::new(seed.x, seed.y, 0.0));
    }

    // The seed lies on the ray; measuring from it keeps precision when the
    // original origin is far away (objects at "infinity").
    let base = Vec3::new(seed.x, seed.y, 0.0);
    let mut point = base;
    let mut previous_sag: Option<f64> = None;

    for _ in 0..max_iterations {
        let sag = curve.sagitta(point.x, point.y)?;
        let normal = curve.normal(point.x, point.y)?;
        let denom = direction.dot(&normal);
        if denom.abs() < PARALLEL_EPS {
            return None;
        }
        let on_surface = Vec3::new(point.x, point.y, sag);
        let s = (on_surface - base).dot(&normal) / denom;
        point = base + direction * s;

        if let Some(prev) = previous_sag {
            if (sag - prev).abs() < SAG_TOLERANCE {
                return Some(point);
            }
        }
        previous_sag = Some(sag);
    }

    Some(point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Closed-form intersection of a ray with a sphere whose vertex is at
    /// the origin and centre at (0, 0, R). Takes the root nearest the vertex.
    fn sphere_hit(origin: &Vec3, direction: &Vec3, radius: f64) -> Vec3 {
        let d = direction.normalize();
        let centre = Vec3::new(0.0, 0.0, radius);
        let oc = origin - centre;
        let b = oc.dot(&d);
        let c = oc.dot(&oc) - radius * radius;
        let disc = (b * b - c).sqrt();
        let roots = [-b - disc, -b + disc];
        let hits: Vec<Vec3> = roots.iter().map(|t| origin + d * *t).collect();
        if hits[0].z.abs() < hits[1].z.abs() {
            hits[0]
        } else {
            hits[1]
        }
    }

    #[test]
    fn test_flat_plane_hit() {
        let hit = intersect(
            &Vec3::new(1.0, 2.0, -5.0),
            &Vec3::new(0.0, 0.2, 1.0),
            &Curve::Flat,
        )
        .unwrap();
        assert_abs_diff_eq!(hit, Vec3::new(1.0, 3.0, 0.0), epsilon = 1e-14);
    }

    #[test]
    fn test_convex_sphere_matches_closed_form() {
        let radius = 20.0;
        let curve = Curve::from_radius(radius);
        let origin = Vec3::new(0.5, 3.0, -10.0);
        let direction = Vec3::new(0.01, 0.05, 1.0);
        let hit = intersect(&origin, &direction, &curve).unwrap();
        let expected = sphere_hit(&origin, &direction, radius);
        assert_abs_diff_eq!(hit, expected, epsilon = 1e-10);
    }

    #[test]
    fn test_concave_sphere_matches_closed_form() {
        let radius = -15.0;
        let curve = Curve::from_radius(radius);
        let origin = Vec3::new(-2.0, 4.0, -3.0);
        let direction = Vec3::new(0.1, -0.08, 1.0);
        let hit = intersect(&origin, &direction, &curve).unwrap();
        let expected = sphere_hit(&origin, &direction, radius);
        assert_abs_diff_eq!(hit, expected, epsilon = 1e-10);
    }

    #[test]
    fn test_paraboloid_matches_closed_form() {
        // z = c r^2 / 2 with an axial ray offset in y: z = c y^2 / 2.
        let c = 0.01;
        let curve = Curve::Conic {
            curvature: c,
            conic: -1.0,
        };
        let y = 12.0;
        let hit = intersect(&Vec3::new(0.0, y, -100.0), &Vec3::new(0.0, 0.0, 1.0), &curve).unwrap();
        assert_abs_diff_eq!(hit, Vec3::new(0.0, y, c * y * y / 2.0), epsilon = 1e-10);
    }

    #[test]
    fn test_asphere_point_lies_on_surface() {
        let curve = Curve::Asphere {
            curvature: 0.03,
            conic: -0.8,
            coefficients: vec![2e-5, -1e-7],
        };
        let origin = Vec3::new(1.0, -2.0, -50.0);
        let direction = Vec3::new(0.02, 0.06, 1.0).normalize();
        let hit = intersect(&origin, &direction, &curve).unwrap();
        let sag = curve.sagitta(hit.x, hit.y).unwrap();
        assert_abs_diff_eq!(hit.z, sag, epsilon = 1e-10);
        // And on the ray.
        let along = (hit - origin).normalize();
        assert_abs_diff_eq!(along, direction, epsilon = 1e-12);
    }

    #[test]
    fn test_distant_origin_keeps_precision() {
        let radius = 30.0;
        let curve = Curve::from_radius(radius);
        let hit = intersect(&Vec3::new(0.0, 5.0, -1e10), &Vec3::new(0.0, 0.0, 1.0), &curve).unwrap();
        let expected = radius - (radius * radius - 25.0_f64).sqrt();
        assert_abs_diff_eq!(hit.z, expected, epsilon = 1e-10);
    }

    #[test]
    fn test_iteration_cap_returns_last_estimate() {
        let radius = 8.0;
        let curve = Curve::from_radius(radius);
        let origin = Vec3::new(0.0, 6.0, -5.0);
        let direction = Vec3::new(0.0, 0.1, 1.0);
        let exact = intersect(&origin, &direction, &curve).unwrap();

        // One tangent-plane step: on the ray, short of the surface.
        let rough = intersect_with_limit(&origin, &direction, &curve, 1).unwrap();
        let along = (rough - origin).normalize();
        assert_abs_diff_eq!(along, direction.normalize(), epsilon = 1e-12);
        let miss = (rough.z - curve.sagitta(rough.x, rough.y).unwrap()).abs();
        assert!(miss > 1e-6);
        assert!((rough - exact).norm() > 1e-6);

        // The seed alone (no refinement) is the vertex-plane hit.
        let seed = intersect_with_limit(&origin, &direction, &curve, 0).unwrap();
        assert_abs_diff_eq!(seed, Vec3::new(0.0, 6.5, 0.0), epsilon = 1e-14);
    }

    #[test]
    fn test_non_finite_ray_misses() {
        let nan = Vec3::new(f64::NAN, f64::NAN, f64::NAN);
        assert!(intersect(&Vec3::new(0.0, 0.0, -1.0), &nan, &Curve::Flat).is_none());
        assert!(intersect(&nan, &Vec3::z(), &Curve::from_radius(10.0)).is_none());
    }

    #[test]
    fn test_parallel_ray_misses() {
        let hit = intersect(
            &Vec3::new(0.0, 0.0, -1.0),
            &Vec3::new(1.0, 0.0, 0.0),
            &Curve::from_radius(10.0),
        );
        assert!(hit.is_none());
    }

    #[test]
    fn test_plane_behind_origin_misses() {
        let hit = intersect(
            &Vec3::new(0.0, 0.0, 1.0),
            &Vec3::new(0.0, 0.0, 1.0),
            &Curve::from_radius(10.0),
        );
        assert!(hit.is_none());
    }

    #[test]
    fn test_ray_outside_sphere_domain_misses() {
        let hit = intersect(
            &Vec3::new(0.0, 12.0, -1.0),
            &Vec3::new(0.0, 0.0, 1.0),
            &Curve::from_radius(10.0),
        );
        assert!(hit.is_none());
    }
}
