//! Aperture shapes.
//!
//! A [`Shape`] is the clear aperture of a surface, tested against the (x, y)
//! of the intersection point in the surface's local frame.

use serde::{Deserialize, Serialize};

/// The 2D clear aperture of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    /// Accepts every point.
    #[default]
    Unbounded,
    /// A disk of the given radius.
    Circle { radius: f64 },
    /// A ring: `inner < r <= outer`. Models central obscurations.
    Annulus { inner: f64, outer: f64 },
    /// An axis-aligned rectangle.
    Rectangle { half_width: f64, half_height: f64 },
    /// An axis-aligned ellipse.
    Ellipse { semi_x: f64, semi_y: f64 },
}

impl Shape {
    /// Check whether (x, y) lies inside the aperture. Boundaries count as
    /// inside, except the inner edge of an annulus.
    pub fn inside(&self, x: f64, y: f64) -> bool {
        match self {
            Shape::Unbounded => true,
            Shape::Circle { radius } => x * x + y * y <= radius * radius,
            Shape::Annulus { inner, outer } => {
                let r2 = x * x + y * y;
                r2 > inner * inner && r2 <= outer * outer
            }
            Shape::Rectangle {
                half_width,
                half_height,
            } => x.abs() <= *half_width && y.abs() <= *half_height,
            Shape::Ellipse { semi_x, semi_y } => {
                let u = x / semi_x;
                let v = y / semi_y;
                u * u + v * v <= 1.0
            }
        }
    }

    /// Largest radial distance from the axis that can be inside the aperture,
    /// or `None` when unbounded.
    pub fn max_radius(&self) -> Option<f64> {
        match self {
            Shape::Unbounded => None,
            Shape::Circle { radius } => Some(*radius),
            Shape::Annulus { outer, .. } => Some(*outer),
            Shape::Rectangle {
                half_width,
                half_height,
            } => Some(half_width.hypot(*half_height)),
            Shape::Ellipse { semi_x, semi_y } => Some(semi_x.max(*semi_y)),
        }
    }
}
