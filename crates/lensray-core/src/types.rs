//! Rays and traced paths.
//!
//! A [`LightRay`] is what enters the system; a [`TracedRay`] records one
//! [`RaySegment`] per surface reached, in sequence order.

use lensray_geometry::{Transform3, Vec3};

use crate::system::ElementId;

/// A ray launched into an optical system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightRay {
    /// Start point in global coordinates (system length units).
    pub origin: Vec3,
    /// Unit propagation direction.
    pub direction: Vec3,
    /// Vacuum wavelength (nm).
    pub wavelength_nm: f64,
    /// Relative intensity, 1 at launch.
    pub intensity: f64,
}

impl LightRay {
    /// A unit-intensity ray. `direction` is normalised.
    pub fn new(origin: Vec3, direction: Vec3, wavelength_nm: f64) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
            wavelength_nm,
            intensity: 1.0,
        }
    }

    pub fn with_intensity(mut self, intensity: f64) -> Self {
        self.intensity = intensity.max(0.0);
        self
    }

    pub fn point_at(&self, t: f64) -> Vec3 {
        self.origin + self.direction * t
    }

    /// The same ray expressed through `transform`.
    pub fn transformed(&self, transform: &Transform3) -> LightRay {
        LightRay {
            origin: transform.apply_point(&self.origin),
            direction: transform.apply_vector(&self.direction),
            ..*self
        }
    }
}

/// The state of a ray just after it interacts with a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaySegment {
    pub surface: ElementId,
    /// Intersection point, global coordinates.
    pub point: Vec3,
    /// Intersection point in the surface's local frame.
    pub local_point: Vec3,
    /// Outgoing unit direction, global coordinates.
    pub direction: Vec3,
    /// Unit surface normal at the intersection, global coordinates.
    pub normal: Vec3,
    /// Intensity after absorption up to this surface.
    pub intensity: f64,
    /// Accumulated optical path length $\sum n_i L_i$ from the ray origin.
    pub optical_path: f64,
}

impl RaySegment {
    /// Direction tangent dx/dz.
    pub fn slope_x(&self) -> f64 {
        self.direction.x / self.direction.z
    }

    /// Direction tangent dy/dz.
    pub fn slope_y(&self) -> f64 {
        self.direction.y / self.direction.z
    }
}

/// A successfully traced ray.
#[derive(Debug, Clone, PartialEq)]
pub struct TracedRay {
    pub ray: LightRay,
    pub segments: Vec<RaySegment>,
}

impl TracedRay {
    pub fn segment_at(&self, surface: ElementId) -> Option<&RaySegment> {
        self.segments.iter().find(|s| s.surface == surface)
    }

    /// The segment at the image surface.
    pub fn image(&self) -> Option<&RaySegment> {
        self.segments.last()
    }

    pub fn final_intensity(&self) -> f64 {
        self.image().map_or(self.ray.intensity, |s| s.intensity)
    }
}
