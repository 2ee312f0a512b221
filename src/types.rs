use serde::{Deserialize, Deserializer, Serialize};

use crate::error::PlanError;
use crate::units;

/// Physical size of the source image in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Converts a pixel size at `dpi` into millimetres.
    pub fn from_pixels(width_px: f64, height_px: f64, dpi: f64) -> Result<Self, PlanError> {
        Ok(Self {
            width: units::to_mm(width_px, dpi)?,
            height: units::to_mm(height_px, dpi)?,
        })
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        if !(self.width.is_finite() && self.width > 0.0) {
            return Err(PlanError::InvalidInput(format!(
                "width must be positive, got {}",
                self.width
            )));
        }
        if !(self.height.is_finite() && self.height > 0.0) {
            return Err(PlanError::InvalidInput(format!(
                "height must be positive, got {}",
                self.height
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}x{:.1}mm", self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanMode {
    /// Equal-width strips, fewest strips that fit the roll.
    Optimize,
    /// Full-width strips with a narrower remainder.
    Fill,
}

impl std::fmt::Display for PlanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Optimize => f.pad("optimize"),
            Self::Fill => f.pad("fill"),
        }
    }
}

/// One candidate way of cutting the image into vertical strips for one roll width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub mode: PlanMode,
    pub roll_width: f64,
    /// Widest strip the roll can print once the margin is deducted.
    pub usable_width: f64,
    /// Strip widths in mm, left to right. Never empty.
    pub strip_widths: Vec<f64>,
    /// Printed material in mm².
    pub total_area: f64,
}

impl Plan {
    pub fn new(
        mode: PlanMode,
        roll_width: f64,
        usable_width: f64,
        strip_widths: Vec<f64>,
        height: f64,
    ) -> Self {
        let total_area = height * strip_widths.iter().sum::<f64>();
        Self {
            mode,
            roll_width,
            usable_width,
            strip_widths,
            total_area,
        }
    }

    pub fn piece_count(&self) -> usize {
        self.strip_widths.len()
    }

    pub fn cut_count(&self) -> usize {
        self.strip_widths.len().saturating_sub(1)
    }

    pub fn savings_percent(&self, original_area: f64) -> f64 {
        if original_area <= 0.0 {
            return 0.0;
        }
        (original_area - self.total_area) / original_area * 100.0
    }
}

/// Rows x cols division of the whole image, independent of the roll catalog.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPartition {
    pub rows: u32,
    pub cols: u32,
    pub piece_width: f64,
    pub piece_height: f64,
    pub overlap: f64,
}

impl GridPartition {
    pub fn piece_count(&self) -> u64 {
        u64::from(self.rows) * u64::from(self.cols)
    }
}

/// Axis-aligned rectangle in source pixel space, `x2`/`y2` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl PixelRect {
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }
}

impl std::fmt::Display for PixelRect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({:.1}, {:.1})-({:.1}, {:.1})",
            self.x1, self.y1, self.x2, self.y2
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    pub fn from_f64(width: f64, height: f64) -> Self {
        Self {
            width: width.round().max(0.0) as u32,
            height: height.round().max(0.0) as u32,
        }
    }
}

impl std::fmt::Display for PixelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}px", self.width, self.height)
    }
}

/// A single crop-and-save request for one output piece.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportTask {
    /// 0-based position in export order.
    pub index: usize,
    pub rect: PixelRect,
    /// Nominal canvas size of the saved piece.
    pub target: PixelSize,
    /// File name without extension, also used for the working copy.
    pub name: String,
}

/// The open document the pieces are cut from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceImage {
    pub name: String,
    pub width_px: f64,
    pub height_px: f64,
    pub dpi: f64,
}

impl SourceImage {
    pub fn new(name: impl Into<String>, width_px: f64, height_px: f64, dpi: f64) -> Self {
        Self {
            name: name.into(),
            width_px,
            height_px,
            dpi,
        }
    }

    /// Document name with its last extension removed.
    pub fn base_name(&self) -> &str {
        match self.name.rfind('.') {
            Some(pos) if pos > 0 => &self.name[..pos],
            _ => &self.name,
        }
    }

    pub fn dimensions(&self) -> Result<Dimensions, PlanError> {
        Dimensions::from_pixels(self.width_px, self.height_px, self.dpi)
    }
}

/// Accepts a count written either as an integer or as an integral float (`3.0`).
pub fn deserialize_u32_from_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value.fract() != 0.0 || value < 0.0 || value > u32::MAX as f64 {
        return Err(serde::de::Error::custom(format!(
            "expected a non-negative whole number, got {value}"
        )));
    }
    Ok(value as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_counts_and_area() {
        let plan = Plan::new(PlanMode::Fill, 1520.0, 1470.0, vec![1470.0, 1470.0, 50.0], 1000.0);
        assert_eq!(plan.piece_count(), 3);
        assert_eq!(plan.cut_count(), 2);
        assert!((plan.total_area - 2_990_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_grid_piece_count_does_not_overflow() {
        let grid = GridPartition {
            rows: 70_000,
            cols: 70_000,
            piece_width: 1.0,
            piece_height: 1.0,
            overlap: 0.0,
        };
        assert_eq!(grid.piece_count(), 4_900_000_000);
    }

    #[test]
    fn test_savings_percent() {
        let plan = Plan::new(PlanMode::Optimize, 1070.0, 1020.0, vec![500.0, 500.0], 10.0);
        // 10000 printed against 12000 original
        let saved = plan.savings_percent(12_000.0);
        assert!((saved - 16.666_666).abs() < 1e-3);
        assert_eq!(plan.savings_percent(0.0), 0.0);
    }

    #[test]
    fn test_base_name_strips_last_extension() {
        assert_eq!(SourceImage::new("poster.final.tif", 1.0, 1.0, 1.0).base_name(), "poster.final");
        assert_eq!(SourceImage::new("poster", 1.0, 1.0, 1.0).base_name(), "poster");
        assert_eq!(SourceImage::new(".hidden", 1.0, 1.0, 1.0).base_name(), ".hidden");
    }

    #[test]
    fn test_dimensions_validation() {
        assert!(Dimensions::new(100.0, 50.0).validate().is_ok());
        assert!(Dimensions::new(0.0, 50.0).validate().is_err());
        assert!(Dimensions::new(100.0, -1.0).validate().is_err());
        assert!(Dimensions::new(f64::NAN, 50.0).validate().is_err());
    }

    #[test]
    fn test_lenient_count_deserializer() {
        #[derive(Deserialize)]
        struct Counts {
            #[serde(deserialize_with = "deserialize_u32_from_number")]
            cols: u32,
        }
        let a: Counts = serde_json::from_str(r#"{"cols": 3}"#).unwrap();
        let b: Counts = serde_json::from_str(r#"{"cols": 3.0}"#).unwrap();
        assert_eq!(a.cols, 3);
        assert_eq!(b.cols, 3);
        assert!(serde_json::from_str::<Counts>(r#"{"cols": 2.5}"#).is_err());
        assert!(serde_json::from_str::<Counts>(r#"{"cols": -1}"#).is_err());
    }
}
