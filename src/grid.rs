use tracing::debug;

use crate::error::PlanError;
use crate::types::{Dimensions, GridPartition};

/// Largest number of tiles a single grid may produce.
pub const MAX_GRID_PIECES: u64 = 10_000;

/// Splits the image into `cols` x `rows` equal pieces sharing `overlap` at every seam.
pub fn partition(
    dims: Dimensions,
    cols: u32,
    rows: u32,
    overlap: f64,
) -> Result<GridPartition, PlanError> {
    dims.validate()?;
    if cols < 1 || rows < 1 {
        return Err(PlanError::InvalidInput(format!(
            "grid needs at least one column and one row, got {cols}x{rows}"
        )));
    }
    let pieces = u64::from(cols) * u64::from(rows);
    if pieces > MAX_GRID_PIECES {
        return Err(PlanError::InvalidInput(format!(
            "grid {cols}x{rows} has {pieces} pieces, at most {MAX_GRID_PIECES} allowed"
        )));
    }
    if !(overlap.is_finite() && overlap >= 0.0) {
        return Err(PlanError::InvalidInput(format!(
            "overlap must be zero or positive, got {overlap}"
        )));
    }
    // Each seam must advance across the image, otherwise tiles start before its edge.
    if cols > 1 && overlap >= dims.width {
        return Err(PlanError::InvalidInput(format!(
            "overlap {overlap} mm must be smaller than the image width {} mm",
            dims.width
        )));
    }
    if rows > 1 && overlap >= dims.height {
        return Err(PlanError::InvalidInput(format!(
            "overlap {overlap} mm must be smaller than the image height {} mm",
            dims.height
        )));
    }

    let piece_width = (dims.width + (cols - 1) as f64 * overlap) / cols as f64;
    let piece_height = (dims.height + (rows - 1) as f64 * overlap) / rows as f64;
    debug!(cols, rows, piece_width, piece_height, "grid partition");

    Ok(GridPartition {
        rows,
        cols,
        piece_width,
        piece_height,
        overlap,
    })
}
