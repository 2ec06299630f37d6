//! Ray-surface interactions.
//!
//! Both functions take unit vectors and accept the normal on either side of
//! the surface.

use lensray_geometry::Vec3;

/// Mirror reflection: $\mathbf{r} = \mathbf{d} - 2(\mathbf{d}\cdot\mathbf{n})\mathbf{n}$.
pub fn reflect(direction: &Vec3, normal: &Vec3) -> Vec3 {
    direction - normal * (2.0 * direction.dot(normal))
}

/// Refraction by Snell's law from index `n_in` into `n_out`.
///
/// Returns `None` on total internal reflection.
pub fn refract(direction: &Vec3, normal: &Vec3, n_in: f64, n_out: f64) -> Option<Vec3> {
    // Orient the normal along the propagation direction.
    let n = if direction.dot(normal) < 0.0 { -normal } else { *normal };
    let cos_i = direction.dot(&n);
    let mu = n_in / n_out;
    let k = 1.0 - mu * mu * (1.0 - cos_i * cos_i);
    if k < 0.0 {
        return None;
    }
    Some(direction * mu + n * (k.sqrt() - mu * cos_i))
}
