//! Optical surfaces and their builder.
//!
//! A [`Surface`] is immutable once built. [`SurfaceBuilder`] collects the
//! curve, aperture, media and interaction, validates them and produces the
//! surface during system construction.

use lensray_geometry::{Curve, Shape};
use serde::{Deserialize, Serialize};

use super::element::MediumId;
use super::SystemError;

/// How a ray interacts with a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interaction {
    /// Snell's law between the media on either side.
    #[default]
    Refract,
    /// Mirror law; the ray stays in the incident medium.
    Reflect,
    /// Direction unchanged (stops, dummy surfaces, the image plane).
    Transmit,
}

/// The part a surface plays in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceRole {
    #[default]
    Plain,
    /// The system stop; the chief ray passes through its centre.
    ApertureStop,
    /// A vignetting stop.
    FlareStop,
    /// The final surface; reaching it ends a successful trace.
    Image,
}

/// An optical surface in its local frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    curve: Curve,
    shape: Shape,
    thickness: f64,
    medium_before: MediumId,
    medium_after: MediumId,
    interaction: Interaction,
    role: SurfaceRole,
    pass_unobstructed: bool,
}

impl Surface {
    pub fn curve(&self) -> &Curve {
        &self.curve
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Distance to the next surface along the local z axis.
    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    pub fn medium_before(&self) -> MediumId {
        self.medium_before
    }

    pub fn medium_after(&self) -> MediumId {
        self.medium_after
    }

    pub fn interaction(&self) -> Interaction {
        self.interaction
    }

    pub fn role(&self) -> SurfaceRole {
        self.role
    }

    /// Whether rays outside the aperture continue instead of being blocked.
    pub fn pass_unobstructed(&self) -> bool {
        self.pass_unobstructed
    }

    pub fn is_aperture_stop(&self) -> bool {
        self.role == SurfaceRole::ApertureStop
    }

    pub fn is_image(&self) -> bool {
        self.role == SurfaceRole::Image
    }
}

/// Assembles a [`Surface`].
#[derive(Debug, Clone)]
pub struct SurfaceBuilder {
    curve: Curve,
    shape: Shape,
    thickness: f64,
    medium_before: MediumId,
    medium_after: MediumId,
    interaction: Interaction,
    role: SurfaceRole,
    pass_unobstructed: bool,
}

impl SurfaceBuilder {
    /// A refracting surface in the ambient medium on both sides.
    pub fn new(curve: Curve) -> Self {
        Self {
            curve,
            shape: Shape::Unbounded,
            thickness: 0.0,
            medium_before: MediumId::AMBIENT,
            medium_after: MediumId::AMBIENT,
            interaction: Interaction::Refract,
            role: SurfaceRole::Plain,
            pass_unobstructed: false,
        }
    }

    /// A flat aperture stop.
    pub fn aperture_stop(shape: Shape) -> Self {
        Self::new(Curve::Flat)
            .shape(shape)
            .role(SurfaceRole::ApertureStop)
            .interaction(Interaction::Transmit)
    }

    /// A flat, unbounded image plane.
    pub fn image() -> Self {
        Self::new(Curve::Flat)
            .role(SurfaceRole::Image)
            .interaction(Interaction::Transmit)
    }

    /// A mirror in the given medium.
    pub fn mirror(curve: Curve, medium: MediumId) -> Self {
        Self::new(curve)
            .media(medium, medium)
            .interaction(Interaction::Reflect)
    }

    pub fn shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    pub fn thickness(mut self, thickness: f64) -> Self {
        self.thickness = thickness;
        self
    }

    pub fn media(mut self, before: MediumId, after: MediumId) -> Self {
        self.medium_before = before;
        self.medium_after = after;
        self
    }

    pub fn interaction(mut self, interaction: Interaction) -> Self {
        self.interaction = interaction;
        self
    }

    pub fn role(mut self, role: SurfaceRole) -> Self {
        self.role = role;
        self
    }

    pub fn pass_unobstructed(mut self, pass: bool) -> Self {
        self.pass_unobstructed = pass;
        self
    }

    /// Validate and build the surface.
    pub fn build(self) -> Result<Surface, SystemError> {
        if !self.thickness.is_finite() {
            return Err(SystemError::InvalidSurface(format!(
                "thickness must be finite, got {}",
                self.thickness
            )));
        }
        if !curve_is_finite(&self.curve) {
            return Err(SystemError::InvalidSurface(format!(
                "curve has non-finite parameters: {:?}",
                self.curve
            )));
        }
        let shape_ok = match self.shape {
            Shape::Unbounded => true,
            Shape::Circle { radius } => radius > 0.0,
            Shape::Annulus { inner, outer } => inner >= 0.0 && outer > inner,
            Shape::Rectangle {
                half_width,
                half_height,
            } => half_width > 0.0 && half_height > 0.0,
            Shape::Ellipse { semi_x, semi_y } => semi_x > 0.0 && semi_y > 0.0,
        };
        if !shape_ok {
            return Err(SystemError::InvalidSurface(format!(
                "aperture dimensions must be positive: {:?}",
                self.shape
            )));
        }
        if self.interaction == Interaction::Reflect && self.medium_before != self.medium_after {
            return Err(SystemError::InvalidSurface(
                "a mirror must have the same medium on both sides".into(),
            ));
        }
        Ok(Surface {
            curve: self.curve,
            shape: self.shape,
            thickness: self.thickness,
            medium_before: self.medium_before,
            medium_after: self.medium_after,
            interaction: self.interaction,
            role: self.role,
            pass_unobstructed: self.pass_unobstructed,
        })
    }
}

fn curve_is_finite(curve: &Curve) -> bool {
    match curve {
        Curve::Flat => true,
        Curve::Sphere { curvature } | Curve::Cylinder { curvature } => curvature.is_finite(),
        Curve::Conic { curvature, conic } => curvature.is_finite() && conic.is_finite(),
        Curve::Asphere {
            curvature,
            conic,
            coefficients,
        } => {
            curvature.is_finite() && conic.is_finite() && coefficients.iter().all(|a| a.is_finite())
        }
        Curve::Biconic {
            curvature_x,
            curvature_y,
        } => curvature_x.is_finite() && curvature_y.is_finite(),
    }
}
