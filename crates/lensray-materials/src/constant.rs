//! Wavelength-independent media.

use num_complex::Complex64;

use crate::provider::{MaterialError, Medium};

/// A medium with a fixed complex index at every wavelength.
#[derive(Debug, Clone)]
pub struct ConstantMedium {
    name: String,
    index: Complex64,
}

impl ConstantMedium {
    /// A lossless medium of real index `n`.
    pub fn new(name: impl Into<String>, n: f64) -> Self {
        Self {
            name: name.into(),
            index: Complex64::new(n, 0.0),
        }
    }

    /// An absorbing medium with extinction coefficient `kappa`.
    pub fn absorbing(name: impl Into<String>, n: f64, kappa: f64) -> Self {
        Self {
            name: name.into(),
            index: Complex64::new(n, kappa),
        }
    }

    /// Vacuum, n = 1 exactly.
    pub fn vacuum() -> Self {
        Self::new("vacuum", 1.0)
    }

    /// Air, treated as n = 1. Prescriptions conventionally give glass
    /// indices relative to air.
    pub fn air() -> Self {
        Self::new("air", 1.0)
    }
}

impl Medium for ConstantMedium {
    fn name(&self) -> &str {
        &self.name
    }

    fn wavelength_range(&self) -> (f64, f64) {
        (0.0, f64::INFINITY)
    }

    fn refractive_index(&self, wavelength_nm: f64) -> Result<Complex64, MaterialError> {
        if wavelength_nm.is_nan() || wavelength_nm <= 0.0 {
            return Err(MaterialError::OutOfRange {
                wavelength_nm,
                min: 0.0,
                max: f64::INFINITY,
            });
        }
        Ok(self.index)
    }
}
