//! Planner configuration: seam overlap, unprintable margin and the roll catalog.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::PlanError;

pub const DEFAULT_ROLL_WIDTHS: [f64; 4] = [914.0, 1070.0, 1270.0, 1520.0];
pub const DEFAULT_OVERLAP: f64 = 20.0;
pub const DEFAULT_MARGIN: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Shared width in mm at every internal seam.
    pub overlap: f64,
    /// Unprintable width in mm deducted from each roll.
    pub margin: f64,
    /// Available roll widths in mm, in catalog order.
    pub roll_widths: Vec<f64>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            overlap: DEFAULT_OVERLAP,
            margin: DEFAULT_MARGIN,
            roll_widths: DEFAULT_ROLL_WIDTHS.to_vec(),
        }
    }
}

impl PlannerConfig {
    pub fn new(overlap: f64, margin: f64, roll_widths: Vec<f64>) -> Self {
        Self {
            overlap,
            margin,
            roll_widths,
        }
    }

    /// Reads a JSON config; missing fields fall back to the defaults.
    pub fn from_file(path: &Path) -> Result<Self, PlanError> {
        let file = File::open(path).map_err(|e| {
            PlanError::InvalidInput(format!("cannot open config {}: {e}", path.display()))
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            PlanError::InvalidInput(format!("malformed config {}: {e}", path.display()))
        })
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        if !(self.overlap.is_finite() && self.overlap >= 0.0) {
            return Err(PlanError::InvalidInput(format!(
                "overlap must be zero or positive, got {}",
                self.overlap
            )));
        }
        if !(self.margin.is_finite() && self.margin >= 0.0) {
            return Err(PlanError::InvalidInput(format!(
                "margin must be zero or positive, got {}",
                self.margin
            )));
        }
        if self.roll_widths.is_empty() {
            return Err(PlanError::InvalidInput(
                "roll width catalog is empty".to_string(),
            ));
        }
        if let Some(bad) = self
            .roll_widths
            .iter()
            .find(|r| !(r.is_finite() && **r > 0.0))
        {
            return Err(PlanError::InvalidInput(format!(
                "roll widths must be positive, got {bad}"
            )));
        }
        Ok(())
    }
}

/// Parses a comma separated catalog such as `914,1070,1270`.
pub fn parse_roll_widths(s: &str) -> Result<Vec<f64>, String> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<f64>()
                .map_err(|_| format!("invalid roll width '{}'", part))
        })
        .collect()
}
