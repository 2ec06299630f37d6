//! Surface curves (sagitta functions).
//!
//! Every optical surface is described in its local frame by a sagitta
//! $z = s(x, y)$ with the vertex at the origin and the optical axis along
//! $+z$. Curves are a closed set of variants dispatched by pattern match;
//! each supplies `sagitta`, a first derivative and a unit normal.
//!
//! Flat, spherical, conic and cylindrical curves have analytic derivatives.
//! Aspheres and biconics fall back to central finite differences with a
//! family-specific step (see [`Curve::finite_difference_step`]).

use serde::{Deserialize, Serialize};

use crate::intersect;
use crate::transform::Vec3;

/// Finite-difference step for even aspheres.
pub const ASPHERE_FD_STEP: f64 = 1e-6;
/// Finite-difference step for biconic surfaces.
pub const BICONIC_FD_STEP: f64 = 1e-4;

/// The shape of an optical surface in its local frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Curve {
    /// The plane z = 0.
    #[default]
    Flat,
    /// A sphere of curvature `c = 1/R`.
    Sphere { curvature: f64 },
    /// A conic of revolution. `conic = 0` is a sphere, `-1` a paraboloid.
    Conic { curvature: f64, conic: f64 },
    /// An even asphere: a conic base plus
    /// $\sum_i a_i r^{2i+4}$ (`coefficients[0]` multiplies $r^4$).
    Asphere {
        curvature: f64,
        conic: f64,
        coefficients: Vec<f64>,
    },
    /// A cylinder curved in the y-z plane only.
    Cylinder { curvature: f64 },
    /// A biconic with independent curvatures in x and y.
    Biconic { curvature_x: f64, curvature_y: f64 },
}

impl Curve {
    /// Build a spherical curve from a radius of curvature. An infinite or
    /// zero radius gives a flat surface.
    pub fn from_radius(radius: f64) -> Self {
        if radius == 0.0 || !radius.is_finite() {
            Curve::Flat
        } else {
            Curve::Sphere {
                curvature: 1.0 / radius,
            }
        }
    }

    /// Sagitta at (x, y), or `None` where the surface is undefined (outside
    /// the hemisphere of a sphere or conic).
    pub fn sagitta(&self, x: f64, y: f64) -> Option<f64> {
        match self {
            Curve::Flat => Some(0.0),
            Curve::Sphere { curvature } => conic_sag(*curvature, 0.0, x * x + y * y),
            Curve::Conic { curvature, conic } => conic_sag(*curvature, *conic, x * x + y * y),
            Curve::Asphere {
                curvature,
                conic,
                coefficients,
            } => {
                let r2 = x * x + y * y;
                let base = conic_sag(*curvature, *conic, r2)?;
                // Horner in r^2, starting from r^4.
                let poly = coefficients
                    .iter()
                    .rev()
                    .fold(0.0, |acc, a| acc * r2 + a);
                Some(base + poly * r2 * r2)
            }
            Curve::Cylinder { curvature } => conic_sag(*curvature, 0.0, y * y),
            Curve::Biconic {
                curvature_x,
                curvature_y,
            } => {
                let num = curvature_x * x * x + curvature_y * y * y;
                let arg = 1.0
                    - curvature_x * curvature_x * x * x
                    - curvature_y * curvature_y * y * y;
                if arg < 0.0 {
                    return None;
                }
                Some(num / (1.0 + arg.sqrt()))
            }
        }
    }

    /// Analytic slopes $[\partial z/\partial x, \partial z/\partial y]$, or
    /// `None` if this family has no closed form (or the point is outside the
    /// surface's domain).
    pub fn analytic_derivative(&self, x: f64, y: f64) -> Option<[f64; 2]> {
        match self {
            Curve::Flat => Some([0.0, 0.0]),
            Curve::Sphere { curvature } => conic_slope(*curvature, 0.0, x, y),
            Curve::Conic { curvature, conic } => conic_slope(*curvature, *conic, x, y),
            Curve::Cylinder { curvature } => {
                conic_slope(*curvature, 0.0, 0.0, y).map(|[_, dy]| [0.0, dy])
            }
            Curve::Asphere { .. } | Curve::Biconic { .. } => None,
        }
    }

    /// Whether [`analytic_derivative`](Self::analytic_derivative) is
    /// implemented for this family.
    pub fn has_analytic_derivative(&self) -> bool {
        !matches!(self, Curve::Asphere { .. } | Curve::Biconic { .. })
    }

    /// Step size used for the finite-difference derivative of this family.
    pub fn finite_difference_step(&self) -> f64 {
        match self {
            Curve::Biconic { .. } => BICONIC_FD_STEP,
            _ => ASPHERE_FD_STEP,
        }
    }

    /// Surface slopes, analytic where available, otherwise by central
    /// differences.
    pub fn derivative(&self, x: f64, y: f64) -> Option<[f64; 2]> {
        if self.has_analytic_derivative() {
            self.analytic_derivative(x, y)
        } else {
            self.numeric_derivative(x, y, self.finite_difference_step())
        }
    }

    /// Central-difference slopes with step `h`.
    pub fn numeric_derivative(&self, x: f64, y: f64, h: f64) -> Option<[f64; 2]> {
        let dx = (self.sagitta(x + h, y)? - self.sagitta(x - h, y)?) / (2.0 * h);
        let dy = (self.sagitta(x, y + h)? - self.sagitta(x, y - h)?) / (2.0 * h);
        Some([dx, dy])
    }

    /// Unit surface normal at (x, y), oriented towards $+z$.
    pub fn normal(&self, x: f64, y: f64) -> Option<Vec3> {
        let [dx, dy] = self.derivative(x, y)?;
        Some(Vec3::new(-dx, -dy, 1.0).normalize())
    }

    /// Intersect a ray given in this curve's local frame.
    pub fn intersect(&self, origin: &Vec3, direction: &Vec3) -> Option<Vec3> {
        intersect::intersect(origin, direction, self)
    }

    /// Vertex curvature (the y curvature for a biconic).
    pub fn curvature(&self) -> f64 {
        match self {
            Curve::Flat => 0.0,
            Curve::Sphere { curvature }
            | Curve::Conic { curvature, .. }
            | Curve::Asphere { curvature, .. }
            | Curve::Cylinder { curvature } => *curvature,
            Curve::Biconic { curvature_y, .. } => *curvature_y,
        }
    }

    /// Conic constant, zero for families without one.
    pub fn conic(&self) -> f64 {
        match self {
            Curve::Conic { conic, .. } | Curve::Asphere { conic, .. } => *conic,
            _ => 0.0,
        }
    }

    /// A copy of this curve with a new vertex curvature. A flat surface
    /// becomes a sphere.
    pub fn with_curvature(&self, c: f64) -> Curve {
        match self {
            Curve::Flat | Curve::Sphere { .. } => Curve::Sphere { curvature: c },
            Curve::Conic { conic, .. } => Curve::Conic {
                curvature: c,
                conic: *conic,
            },
            Curve::Asphere {
                conic,
                coefficients,
                ..
            } => Curve::Asphere {
                curvature: c,
                conic: *conic,
                coefficients: coefficients.clone(),
            },
            Curve::Cylinder { .. } => Curve::Cylinder { curvature: c },
            Curve::Biconic { curvature_x, .. } => Curve::Biconic {
                curvature_x: *curvature_x,
                curvature_y: c,
            },
        }
    }

    /// A copy of this curve with a new conic constant. Spheres and flats
    /// become conics.
    pub fn with_conic(&self, k: f64) -> Curve {
        match self {
            Curve::Asphere {
                curvature,
                coefficients,
                ..
            } => Curve::Asphere {
                curvature: *curvature,
                conic: k,
                coefficients: coefficients.clone(),
            },
            other => Curve::Conic {
                curvature: other.curvature(),
                conic: k,
            },
        }
    }
}

/// $z = c r^2 / (1 + \sqrt{1 - (1+k) c^2 r^2})$
fn conic_sag(c: f64, k: f64, r2: f64) -> Option<f64> {
    let arg = 1.0 - (1.0 + k) * c * c * r2;
    if arg < 0.0 {
        return None;
    }
    Some(c * r2 / (1.0 + arg.sqrt()))
}

/// $dz/dr = c r / \sqrt{1 - (1+k) c^2 r^2}$, split into x and y.
fn conic_slope(c: f64, k: f64, x: f64, y: f64) -> Option<[f64; 2]> {
    let arg = 1.0 - (1.0 + k) * c * c * (x * x + y * y);
    if arg <= 0.0 {
        return None;
    }
    let s = c / arg.sqrt();
    Some([s * x, s * y])
}
