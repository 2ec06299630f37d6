//! Identifier lookup for media.
//!
//! Prescriptions name their media by string. [`resolve`] maps the known
//! identifiers to shared instances; a bare number (e.g. `"1.62"`) is
//! accepted as a constant, lossless index.

use std::sync::Arc;

use crate::constant::ConstantMedium;
use crate::provider::{MaterialError, Medium};
use crate::sellmeier::SellmeierGlass;
use crate::tabulated::TabulatedMedium;

/// Identifiers accepted by [`resolve`], with a short description.
pub const AVAILABLE: &[(&str, &str)] = &[
    ("air", "Air, n = 1"),
    ("vacuum", "Vacuum, n = 1"),
    ("N-BK7", "Schott borosilicate crown, Sellmeier, 300–2500 nm"),
    ("F2", "Schott flint, Sellmeier, 320–2500 nm"),
    ("N-SF11", "Schott dense flint, Sellmeier, 370–2500 nm"),
    ("F_SILICA", "Fused silica (Malitson), Sellmeier, 210–3710 nm"),
    ("SiO2_Palik", "Fused silica (Palik), tabulated, 300–1000 nm"),
];

/// Resolve a medium identifier (case-insensitive).
pub fn resolve(id: &str) -> Result<Arc<dyn Medium>, MaterialError> {
    let key = id.trim();
    if let Ok(n) = key.parse::<f64>() {
        if n.is_finite() && n > 0.0 {
            return Ok(Arc::new(ConstantMedium::new(format!("n={n}"), n)));
        }
        return Err(MaterialError::DataError(format!("invalid constant index '{key}'")));
    }
    let medium: Arc<dyn Medium> = match key.to_ascii_uppercase().as_str() {
        "AIR" | "" => Arc::new(ConstantMedium::air()),
        "VACUUM" => Arc::new(ConstantMedium::vacuum()),
        "N-BK7" | "BK7" => Arc::new(SellmeierGlass::n_bk7()),
        "F2" => Arc::new(SellmeierGlass::f2()),
        "N-SF11" | "SF11" => Arc::new(SellmeierGlass::n_sf11()),
        "F_SILICA" | "FUSED_SILICA" => Arc::new(SellmeierGlass::fused_silica()),
        "SIO2_PALIK" => Arc::new(TabulatedMedium::silica_palik()),
        _ => return Err(MaterialError::NotFound(key.to_string())),
    };
    Ok(medium)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_ids() {
        for (id, _) in AVAILABLE {
            let medium = resolve(id).unwrap();
            assert!(medium.index(587.6).unwrap() >= 1.0, "{id}");
        }
        assert_eq!(resolve("bk7").unwrap().name(), "N-BK7");
    }

    #[test]
    fn test_resolve_numeric_index() {
        let m = resolve("1.62").unwrap();
        assert_eq!(m.index(500.0).unwrap(), 1.62);
        assert!(resolve("-1").is_err());
    }

    #[test]
    fn test_unknown_id() {
        assert!(matches!(resolve("unobtainium"), Err(MaterialError::NotFound(_))));
    }
}
