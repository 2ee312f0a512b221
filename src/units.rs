//! Millimetre / pixel conversion at a given resolution (dots per inch).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PlanError;

pub const MM_PER_INCH: f64 = 25.4;

/// Unit the caller's dimensions are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Mm,
    Px,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mm => write!(f, "mm"),
            Self::Px => write!(f, "px"),
        }
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mm" | "millimeter" | "millimetre" => Ok(Self::Mm),
            "px" | "pixel" | "pixels" => Ok(Self::Px),
            _ => Err(format!("invalid unit '{}', expected: mm or px", s)),
        }
    }
}

fn check_resolution(dpi: f64) -> Result<(), PlanError> {
    if dpi.is_finite() && dpi > 0.0 {
        Ok(())
    } else {
        Err(PlanError::InvalidInput(format!(
            "resolution must be positive, got {dpi}"
        )))
    }
}

pub fn to_mm(px: f64, dpi: f64) -> Result<f64, PlanError> {
    check_resolution(dpi)?;
    Ok(px / dpi * MM_PER_INCH)
}

pub fn to_px(mm: f64, dpi: f64) -> Result<f64, PlanError> {
    check_resolution(dpi)?;
    Ok(mm / MM_PER_INCH * dpi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_conversions() {
        assert!((to_mm(300.0, 300.0).unwrap() - 25.4).abs() < 1e-9);
        assert!((to_px(25.4, 300.0).unwrap() - 300.0).abs() < 1e-9);
        assert!((to_px(1000.0, 72.0).unwrap() - 2834.645_669).abs() < 1e-5);
    }

    #[test]
    fn test_conversions_are_inverse() {
        for &dpi in &[72.0, 150.0, 300.0, 600.0] {
            for &mm in &[0.0, 1.0, 914.0, 3000.0] {
                let back = to_mm(to_px(mm, dpi).unwrap(), dpi).unwrap();
                assert!((back - mm).abs() < 1e-9, "dpi={dpi} mm={mm} back={back}");
            }
        }
    }

    #[test]
    fn test_non_positive_resolution_rejected() {
        assert!(matches!(to_mm(10.0, 0.0), Err(PlanError::InvalidInput(_))));
        assert!(matches!(to_px(10.0, -72.0), Err(PlanError::InvalidInput(_))));
        assert!(to_px(10.0, f64::NAN).is_err());
    }

    #[test]
    fn test_unit_parsing() {
        assert_eq!("MM".parse::<Unit>().unwrap(), Unit::Mm);
        assert_eq!("pixels".parse::<Unit>().unwrap(), Unit::Px);
        assert!("inch".parse::<Unit>().is_err());
        assert_eq!(Unit::Px.to_string(), "px");
    }
}
