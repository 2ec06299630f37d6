//! The medium capability consumed by the tracer.
//!
//! All media implement [`Medium`], which returns the complex refractive index
//! at a vacuum wavelength. Implementations must be `Send + Sync`: a built
//! optical system shares its media across ray-tracing threads.

use num_complex::Complex64;
use thiserror::Error;

/// Errors from media.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MaterialError {
    #[error("Wavelength {wavelength_nm} nm is outside the data range [{min}, {max}] nm")]
    OutOfRange {
        wavelength_nm: f64,
        min: f64,
        max: f64,
    },

    #[error("Material not found: {0}")]
    NotFound(String),

    #[error("Data error: {0}")]
    DataError(String),
}

/// An optical medium with a wavelength-dependent refractive index.
pub trait Medium: Send + Sync + std::fmt::Debug {
    /// Human-readable name of this medium.
    fn name(&self) -> &str;

    /// Wavelength range over which the index is defined (nm).
    fn wavelength_range(&self) -> (f64, f64);

    /// Complex refractive index $\tilde{n} = n + i\kappa$ at a vacuum
    /// wavelength in nanometres.
    fn refractive_index(&self, wavelength_nm: f64) -> Result<Complex64, MaterialError>;

    /// Real refractive index $n$.
    fn index(&self, wavelength_nm: f64) -> Result<f64, MaterialError> {
        Ok(self.refractive_index(wavelength_nm)?.re)
    }

    /// Reject wavelengths outside [`wavelength_range`](Self::wavelength_range).
    fn check_range(&self, wavelength_nm: f64) -> Result<(), MaterialError> {
        let (min, max) = self.wavelength_range();
        if wavelength_nm < min || wavelength_nm > max || !wavelength_nm.is_finite() {
            return Err(MaterialError::OutOfRange {
                wavelength_nm,
                min,
                max,
            });
        }
        Ok(())
    }
}

/// Intensity transmission factor for a path of `length_nm` through a medium
/// with extinction coefficient `kappa` (Beer–Lambert):
/// $T = \exp(-4\pi\kappa L / \lambda)$.
pub fn transmission(kappa: f64, length_nm: f64, wavelength_nm: f64) -> f64 {
    if kappa <= 0.0 || length_nm <= 0.0 {
        return 1.0;
    }
    (-4.0 * std::f64::consts::PI * kappa * length_nm / wavelength_nm).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_transmission_is_unity_without_absorption() {
        assert_eq!(transmission(0.0, 1e6, 550.0), 1.0);
        assert_eq!(transmission(0.1, 0.0, 550.0), 1.0);
    }

    #[test]
    fn test_transmission_decays_exponentially() {
        let t1 = transmission(1e-6, 1e6, 500.0);
        let t2 = transmission(1e-6, 2e6, 500.0);
        assert!(t1 < 1.0 && t1 > 0.0);
        assert_relative_eq!(t2, t1 * t1, max_relative = 1e-12);
    }
}
