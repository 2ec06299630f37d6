//! Ray bundles: field points, pupil sampling and parallel tracing.
//!
//! A bundle is every combination of a wavelength and a pupil sample for one
//! field point. Pupil samples are normalised to the unit disk, scaled by
//! [`RayBundleSpec::pupil_radius`] and offset by [`RayBundleSpec::aim`] on
//! the vertex plane of the first surface (the aim is normally the chief ray
//! found by [`crate::solver::chief_ray`]).

use std::f64::consts::PI;

use lensray_compute::ComputeBackend;
use lensray_geometry::Vec3;
use serde::{Deserialize, Serialize};

use super::sequential::SequentialTracer;
use super::TraceError;
use crate::system::{ElementId, ElementKind, OpticalSystem, SystemError};
use crate::types::{LightRay, RaySegment, TracedRay};

/// Distance before the first vertex plane at which collimated rays start.
const LAUNCH_STANDOFF: f64 = 1.0;

/// Where the light comes from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldPoint {
    /// A collimated field at the given angles (degrees) to the z axis.
    Angle { x_deg: f64, y_deg: f64 },
    /// A finite object point, global coordinates.
    Point { position: [f64; 3] },
}

impl Default for FieldPoint {
    fn default() -> Self {
        FieldPoint::on_axis()
    }
}

impl FieldPoint {
    pub fn on_axis() -> Self {
        FieldPoint::Angle {
            x_deg: 0.0,
            y_deg: 0.0,
        }
    }

    /// The object point of a source element.
    pub fn from_source(system: &OpticalSystem, source: ElementId) -> Result<Self, SystemError> {
        match system.element(source)?.kind {
            ElementKind::Source => {
                let p = system.position(source)?;
                Ok(FieldPoint::Point {
                    position: [p.x, p.y, p.z],
                })
            }
            _ => Err(SystemError::InvalidSurface(format!(
                "element {source} is not a source"
            ))),
        }
    }

    /// A ray from this field that crosses the first surface's vertex plane
    /// at local `(x, y)`.
    pub fn ray_through(&self, system: &OpticalSystem, x: f64, y: f64, wavelength_nm: f64) -> LightRay {
        let (global, _) = system.cache().frames(system.first_surface());
        let target = global.apply_point(&Vec3::new(x, y, 0.0));
        match *self {
            FieldPoint::Angle { x_deg, y_deg } => {
                let axis = global.apply_vector(&Vec3::z());
                let direction = Vec3::new(x_deg.to_radians().tan(), y_deg.to_radians().tan(), 1.0)
                    .normalize();
                let standoff = LAUNCH_STANDOFF / direction.dot(&axis).abs().max(f64::EPSILON);
                LightRay::new(target - direction * standoff, direction, wavelength_nm)
            }
            FieldPoint::Point { position } => {
                let origin = Vec3::from(position);
                LightRay::new(origin, target - origin, wavelength_nm)
            }
        }
    }
}

/// How the pupil is sampled. All points lie in the unit disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Distribution {
    /// The pupil centre only.
    Single,
    /// The centre plus `per_arm` evenly spaced points on each of the four
    /// half-axes.
    Cross { per_arm: usize },
    /// The centre plus `rings` concentric rings of `per_ring` points.
    Ring { rings: usize, per_ring: usize },
    /// The centre plus `rings` rings, ring k holding 6k points.
    Hexapolar { rings: usize },
    /// An `n` x `n` square grid clipped to the unit disk.
    Grid { n: usize },
}

impl Default for Distribution {
    fn default() -> Self {
        Distribution::Hexapolar { rings: 3 }
    }
}

impl Distribution {
    /// Normalised pupil coordinates.
    pub fn pupil_points(&self) -> Vec<[f64; 2]> {
        let centre = [0.0, 0.0];
        match *self {
            Distribution::Single => vec![centre],
            Distribution::Cross { per_arm } => {
                let mut points = vec![centre];
                for k in 1..=per_arm {
                    let r = k as f64 / per_arm as f64;
                    points.extend([[r, 0.0], [-r, 0.0], [0.0, r], [0.0, -r]]);
                }
                points
            }
            Distribution::Ring { rings, per_ring } => {
                let mut points = vec![centre];
                for k in 1..=rings {
                    push_ring(&mut points, k as f64 / rings as f64, per_ring);
                }
                points
            }
            Distribution::Hexapolar { rings } => {
                let mut points = vec![centre];
                for k in 1..=rings {
                    push_ring(&mut points, k as f64 / rings as f64, 6 * k);
                }
                points
            }
            Distribution::Grid { n } => match n {
                0 => Vec::new(),
                1 => vec![centre],
                _ => {
                    let step = 2.0 / (n - 1) as f64;
                    let mut points = Vec::with_capacity(n * n);
                    for i in 0..n {
                        for j in 0..n {
                            let x = -1.0 + i as f64 * step;
                            let y = -1.0 + j as f64 * step;
                            if x * x + y * y <= 1.0 + 1e-12 {
                                points.push([x, y]);
                            }
                        }
                    }
                    points
                }
            },
        }
    }
}

fn push_ring(points: &mut Vec<[f64; 2]>, radius: f64, count: usize) {
    for j in 0..count {
        let phi = 2.0 * PI * j as f64 / count as f64;
        points.push([radius * phi.cos(), radius * phi.sin()]);
    }
}

/// A bundle to trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RayBundleSpec {
    pub field: FieldPoint,
    /// Vacuum wavelengths (nm).
    pub wavelengths: Vec<f64>,
    #[serde(default)]
    pub distribution: Distribution,
    /// Pupil radius on the first vertex plane (system units).
    pub pupil_radius: f64,
    /// Pupil centre on the first vertex plane (system units).
    #[serde(default)]
    pub aim: [f64; 2],
}

impl RayBundleSpec {
    /// The rays of this bundle with their normalised pupil coordinates,
    /// ordered by wavelength then pupil point.
    pub fn rays(&self, system: &OpticalSystem) -> Vec<([f64; 2], LightRay)> {
        let pupil = self.distribution.pupil_points();
        let mut rays = Vec::with_capacity(pupil.len() * self.wavelengths.len());
        for &wavelength in &self.wavelengths {
            for &[px, py] in &pupil {
                let x = self.aim[0] + px * self.pupil_radius;
                let y = self.aim[1] + py * self.pupil_radius;
                rays.push(([px, py], self.field.ray_through(system, x, y, wavelength)));
            }
        }
        rays
    }
}

/// The fate of one ray of a bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct RayOutcome {
    /// Normalised pupil coordinates.
    pub pupil: [f64; 2],
    pub wavelength_nm: f64,
    pub result: Result<TracedRay, TraceError>,
}

/// Failure tallies by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FailureCounts {
    pub missed: usize,
    pub obstructed: usize,
    pub total_internal_reflection: usize,
    pub medium: usize,
}

impl FailureCounts {
    pub fn total(&self) -> usize {
        self.missed + self.obstructed + self.total_internal_reflection + self.medium
    }
}

/// Every outcome of a bundle trace, in launch order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceResults {
    pub outcomes: Vec<RayOutcome>,
}

impl TraceResults {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn successes(&self) -> impl Iterator<Item = &TracedRay> + '_ {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &TraceError> + '_ {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().err())
    }

    pub fn failure_counts(&self) -> FailureCounts {
        let mut counts = FailureCounts::default();
        for error in self.failures() {
            match error {
                TraceError::MissedSurface { .. } => counts.missed += 1,
                TraceError::ObstructedByAperture { .. } => counts.obstructed += 1,
                TraceError::TotalInternalReflection { .. } => counts.total_internal_reflection += 1,
                TraceError::Medium { .. } => counts.medium += 1,
            }
        }
        counts
    }

    /// Segments of successful rays at `surface`.
    pub fn intercepts(&self, surface: ElementId) -> Vec<&RaySegment> {
        self.successes()
            .filter_map(|t| t.segment_at(surface))
            .collect()
    }

    /// Mean global intercept at `surface`.
    pub fn centroid(&self, surface: ElementId) -> Option<Vec3> {
        let hits = self.intercepts(surface);
        if hits.is_empty() {
            return None;
        }
        let sum: Vec3 = hits.iter().map(|s| s.point).sum();
        Some(sum / hits.len() as f64)
    }

    /// Root-mean-square distance of the intercepts from their centroid.
    pub fn rms_radius(&self, surface: ElementId) -> Option<f64> {
        let centroid = self.centroid(surface)?;
        let hits = self.intercepts(surface);
        let sum: f64 = hits.iter().map(|s| (s.point - centroid).norm_squared()).sum();
        Some((sum / hits.len() as f64).sqrt())
    }

    pub fn max_intensity(&self, surface: ElementId) -> Option<f64> {
        self.intercepts(surface)
            .iter()
            .map(|s| s.intensity)
            .reduce(f64::max)
    }
}

/// Trace every ray of `spec` through `system` on `backend`.
///
/// Rays are independent; results come back in launch order whatever the
/// backend's scheduling.
pub fn trace_bundle<B: ComputeBackend>(system: &OpticalSystem, spec: &RayBundleSpec, backend: &B) -> TraceResults {
    let rays = spec.rays(system);
    let tracer = SequentialTracer::new(system);
    let outcomes = backend.map_indexed(rays.len(), |i| {
        let (pupil, ray) = &rays[i];
        RayOutcome {
            pupil: *pupil,
            wavelength_nm: ray.wavelength_nm,
            result: tracer.trace(ray),
        }
    });
    let results = TraceResults { outcomes };
    let failures = results.failure_counts();
    log::debug!(
        "traced {} rays on {}: {} reached the image, {} failed",
        results.len(),
        backend.device_info().name,
        results.len() - failures.total(),
        failures.total()
    );
    results
}
