//! Tabular lens prescriptions.
//!
//! A [`Prescription`] lists surfaces in the order light meets them, each
//! with a curve, a thickness to the next vertex and the medium that follows.
//! [`Prescription::build`] turns it into an [`OpticalSystem`]: vertices are
//! placed along the z axis by accumulated thickness, runs of surfaces
//! enclosing glass are grouped under a lens element and media are resolved
//! through the material catalog (one shared instance per identifier).
//!
//! In the built system, `system.sequence()[row]` is the surface of `row`.

use std::collections::HashMap;

use lensray_geometry::{Curve, Shape, Transform3, Vec3};
use lensray_materials::catalog;
use serde::{Deserialize, Serialize};

use super::builder::{SystemBuilder, MILLIMETRE_NM};
use super::element::{ElementId, MediumId};
use super::surface::{Interaction, SurfaceBuilder, SurfaceRole};
use super::{OpticalSystem, SystemError};

/// One row of a prescription.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Radius of curvature; omitted or infinite means flat. Ignored when
    /// `curve` is given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curve: Option<Curve>,
    /// Axial distance to the next surface.
    pub thickness: f64,
    /// Medium after this surface; omitted means the object medium.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    /// Radius of a circular clear aperture. Ignored when `aperture` is given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semi_diameter: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aperture: Option<Shape>,
    pub role: SurfaceRole,
    pub mirror: bool,
    pub pass_unobstructed: bool,
    /// Lateral (x, y) offset of the vertex.
    pub decenter: [f64; 2],
    /// Tilt about x, y and z in degrees.
    pub tilt: [f64; 3],
}

impl SurfaceSpec {
    pub fn new(curve: Curve, thickness: f64) -> Self {
        Self {
            curve: Some(curve),
            thickness,
            ..Self::default()
        }
    }

    /// A spherical surface given by its radius.
    pub fn spherical(radius: f64, thickness: f64) -> Self {
        Self {
            radius: Some(radius),
            thickness,
            ..Self::default()
        }
    }

    pub fn flat(thickness: f64) -> Self {
        Self::new(Curve::Flat, thickness)
    }

    /// A flat circular aperture stop.
    pub fn stop(semi_diameter: f64, thickness: f64) -> Self {
        Self {
            semi_diameter: Some(semi_diameter),
            role: SurfaceRole::ApertureStop,
            ..Self::flat(thickness)
        }
    }

    pub fn image() -> Self {
        Self {
            role: SurfaceRole::Image,
            ..Self::flat(0.0)
        }
    }

    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }

    pub fn with_semi_diameter(mut self, semi_diameter: f64) -> Self {
        self.semi_diameter = Some(semi_diameter);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_decenter(mut self, x: f64, y: f64) -> Self {
        self.decenter = [x, y];
        self
    }

    pub fn with_tilt(mut self, tilt: [f64; 3]) -> Self {
        self.tilt = tilt;
        self
    }

    pub fn as_mirror(mut self) -> Self {
        self.mirror = true;
        self
    }

    /// The curve this row describes.
    pub fn resolved_curve(&self) -> Curve {
        match (&self.curve, self.radius) {
            (Some(curve), _) => curve.clone(),
            (None, Some(r)) => Curve::from_radius(r),
            (None, None) => Curve::Flat,
        }
    }

    /// Replace the curve, dropping any radius.
    pub fn set_curve(&mut self, curve: Curve) {
        self.curve = Some(curve);
        self.radius = None;
    }

    pub fn resolved_aperture(&self) -> Shape {
        match (self.aperture, self.semi_diameter) {
            (Some(shape), _) => shape,
            (None, Some(radius)) => Shape::Circle { radius },
            (None, None) => Shape::Unbounded,
        }
    }

    fn display_name(&self, row: usize) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        match self.role {
            SurfaceRole::ApertureStop => "STO".into(),
            SurfaceRole::Image => "IMG".into(),
            _ => format!("S{}", row + 1),
        }
    }
}

/// A complete lens prescription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Prescription {
    /// Medium of object and image space.
    pub object_medium: String,
    /// Nanometres per length unit (1e6 for millimetres).
    pub length_unit_nm: f64,
    pub surfaces: Vec<SurfaceSpec>,
}

impl Default for Prescription {
    fn default() -> Self {
        Self {
            object_medium: "air".into(),
            length_unit_nm: MILLIMETRE_NM,
            surfaces: Vec::new(),
        }
    }
}

impl Prescription {
    pub fn new(surfaces: Vec<SurfaceSpec>) -> Self {
        Self {
            surfaces,
            ..Self::default()
        }
    }

    /// Build the optical system this prescription describes.
    pub fn build(&self) -> Result<OpticalSystem, SystemError> {
        let ambient = catalog::resolve(&self.object_medium)
            .map_err(|source| SystemError::Material { surface: 0, source })?;
        let mut builder = SystemBuilder::new()
            .ambient(ambient)
            .length_unit_nm(self.length_unit_nm);
        let root = builder.root();

        let mut media: HashMap<String, MediumId> = HashMap::new();
        media.insert(self.object_medium.trim().to_ascii_lowercase(), MediumId::AMBIENT);

        let mut z = 0.0;
        let mut current = MediumId::AMBIENT;
        let mut lens: Option<(ElementId, f64)> = None;
        let mut previous_z = 0.0;

        for (row, spec) in self.surfaces.iter().enumerate() {
            let name = spec.display_name(row);
            // The system traces by ascending z; rows must not step backwards.
            if z < previous_z {
                return Err(SystemError::SequenceOrder { surface: name });
            }
            previous_z = z;
            let passive = spec.mirror || matches!(spec.role, SurfaceRole::ApertureStop | SurfaceRole::Image);
            let after = if passive {
                current
            } else {
                match &spec.material {
                    None => MediumId::AMBIENT,
                    Some(id) => {
                        let key = id.trim().to_ascii_lowercase();
                        match media.get(&key) {
                            Some(m) => *m,
                            None => {
                                let medium = catalog::resolve(id)
                                    .map_err(|source| SystemError::Material { surface: row, source })?;
                                let m = builder.add_medium(medium);
                                media.insert(key, m);
                                m
                            }
                        }
                    }
                }
            };

            if lens.is_none() && after != MediumId::AMBIENT && !passive {
                let id = builder.add_lens(root, format!("L{}", row + 1), Transform3::translation(0.0, 0.0, z))?;
                lens = Some((id, z));
            }
            let (parent, local_z) = match lens {
                Some((id, lens_z)) => (id, z - lens_z),
                None => (root, z),
            };

            let interaction = if spec.mirror {
                Interaction::Reflect
            } else if passive {
                Interaction::Transmit
            } else {
                Interaction::Refract
            };
            let surface = SurfaceBuilder::new(spec.resolved_curve())
                .shape(spec.resolved_aperture())
                .thickness(spec.thickness)
                .media(current, after)
                .interaction(interaction)
                .role(spec.role)
                .pass_unobstructed(spec.pass_unobstructed)
                .build()?;
            let local = Transform3::from_tilt_degrees(
                spec.tilt,
                Vec3::new(spec.decenter[0], spec.decenter[1], local_z),
            );
            builder.add_surface(parent, name, local, surface)?;

            if after == MediumId::AMBIENT {
                lens = None;
            }
            current = after;
            z += spec.thickness;
        }

        builder.build()
    }
}
