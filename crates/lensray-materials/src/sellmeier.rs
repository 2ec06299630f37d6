//! Sellmeier dispersion for optical glasses.
//!
//! $$n^2(\lambda) = 1 + \sum_{i=1}^{3} \frac{B_i \lambda^2}{\lambda^2 - C_i}$$
//!
//! with $\lambda$ in micrometres and $C_i$ in µm². Coefficients are the
//! manufacturers' published values (Schott catalogue; Malitson 1965 for fused
//! silica). Glasses are treated as lossless.

use num_complex::Complex64;

use crate::provider::{MaterialError, Medium};

/// A glass described by a three-term Sellmeier equation.
#[derive(Debug, Clone)]
pub struct SellmeierGlass {
    name: String,
    b: [f64; 3],
    c: [f64; 3],
    range_nm: (f64, f64),
}

impl SellmeierGlass {
    /// Construct from coefficients. `c` is in µm².
    pub fn new(name: impl Into<String>, b: [f64; 3], c: [f64; 3], range_nm: (f64, f64)) -> Self {
        Self {
            name: name.into(),
            b,
            c,
            range_nm,
        }
    }

    /// Schott N-BK7 borosilicate crown ($n_d = 1.5168$).
    pub fn n_bk7() -> Self {
        Self::new(
            "N-BK7",
            [1.039_612_12, 0.231_792_344, 1.010_469_45],
            [0.006_000_698_67, 0.020_017_914_4, 103.560_653],
            (300.0, 2500.0),
        )
    }

    /// Schott F2 flint ($n_d = 1.6200$).
    pub fn f2() -> Self {
        Self::new(
            "F2",
            [1.345_333_59, 0.209_073_176, 0.937_357_162],
            [0.009_977_438_71, 0.047_045_076_7, 111.886_764],
            (320.0, 2500.0),
        )
    }

    /// Schott N-SF11 dense flint ($n_d = 1.7847$).
    pub fn n_sf11() -> Self {
        Self::new(
            "N-SF11",
            [1.737_596_95, 0.313_747_346, 1.898_781_01],
            [0.013_188_707, 0.062_306_814_2, 155.236_29],
            (370.0, 2500.0),
        )
    }

    /// Fused silica (Malitson 1965, $n_d = 1.4585$).
    pub fn fused_silica() -> Self {
        Self::new(
            "F_SILICA",
            [0.696_166_3, 0.407_942_6, 0.897_479_4],
            [0.004_679_148_26, 0.013_512_063_1, 97.934_002_5],
            (210.0, 3710.0),
        )
    }
}

impl Medium for SellmeierGlass {
    fn name(&self) -> &str {
        &self.name
    }

    fn wavelength_range(&self) -> (f64, f64) {
        self.range_nm
    }

    fn refractive_index(&self, wavelength_nm: f64) -> Result<Complex64, MaterialError> {
        self.check_range(wavelength_nm)?;
        let l2 = (wavelength_nm * 1e-3).powi(2);
        let n2 = 1.0
            + self
                .b
                .iter()
                .zip(self.c.iter())
                .map(|(b, c)| b * l2 / (l2 - c))
                .sum::<f64>();
        if n2 <= 0.0 {
            return Err(MaterialError::DataError(format!(
                "{}: Sellmeier n^2 = {} at {} nm",
                self.name, n2, wavelength_nm
            )));
        }
        Ok(Complex64::new(n2.sqrt(), 0.0))
    }
}
