//! Turns a chosen plan or grid into pixel rectangles and drives an image editor
//! through them, one piece at a time.
//!
//! The editor keeps a single active document. Every piece duplicates it, works on
//! the copy and must close the copy and reselect the original before the next
//! piece starts, so pieces are never exported concurrently.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{EditorError, ExportError, PlanError};
use crate::grid::MAX_GRID_PIECES;
use crate::types::{ExportTask, GridPartition, PixelRect, PixelSize, Plan, PlanMode, SourceImage};
use crate::units;

/// Crop results further than this from the nominal size get their canvas resized.
const CANVAS_TOLERANCE_PX: i64 = 1;

/// Output file format. Always written uncompressed with the color profile embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RasterFormat {
    #[default]
    Tiff,
}

impl RasterFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Tiff => "tif",
        }
    }
}

impl ExportTask {
    pub fn file_name(&self, format: RasterFormat) -> String {
        format!("{}.{}", self.name, format.extension())
    }
}

/// The host application that owns the pixels.
pub trait ImageEditor {
    /// Duplicates the active document as `name` and makes the copy active.
    fn duplicate(&mut self, name: &str) -> Result<(), EditorError>;

    /// Merges all layers of the active document.
    fn flatten(&mut self) -> Result<(), EditorError>;

    /// Crops the active document and reports its new size.
    fn crop(&mut self, rect: &PixelRect) -> Result<PixelSize, EditorError>;

    /// Resizes the canvas anchored top-left.
    fn resize_canvas(&mut self, size: PixelSize) -> Result<(), EditorError>;

    fn save(&mut self, path: &Path, format: RasterFormat) -> Result<(), EditorError>;

    /// Closes the active document without saving it.
    fn close_working_copy(&mut self) -> Result<(), EditorError>;

    /// Makes the original document active again.
    fn restore_context(&mut self) -> Result<(), EditorError>;
}

/// A duplicated document that is closed, and the original reselected, however
/// the piece ends.
pub struct WorkingCopy<'e, E: ImageEditor + ?Sized> {
    editor: &'e mut E,
    released: bool,
}

impl<'e, E: ImageEditor + ?Sized> WorkingCopy<'e, E> {
    pub fn acquire(editor: &'e mut E, name: &str) -> Result<Self, EditorError> {
        editor.duplicate(name)?;
        Ok(Self {
            editor,
            released: false,
        })
    }

    /// Closes the copy and restores the original, reporting the first failure.
    pub fn release(mut self) -> Result<(), EditorError> {
        self.released = true;
        let closed = self.editor.close_working_copy();
        let restored = self.editor.restore_context();
        closed.and(restored)
    }
}

impl<E: ImageEditor + ?Sized> Deref for WorkingCopy<'_, E> {
    type Target = E;

    fn deref(&self) -> &E {
        &*self.editor
    }
}

impl<E: ImageEditor + ?Sized> DerefMut for WorkingCopy<'_, E> {
    fn deref_mut(&mut self) -> &mut E {
        &mut *self.editor
    }
}

impl<E: ImageEditor + ?Sized> Drop for WorkingCopy<'_, E> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.editor.close_working_copy() {
            warn!(error = %e, "failed to close working copy");
        }
        if let Err(e) = self.editor.restore_context() {
            warn!(error = %e, "failed to restore original document");
        }
    }
}

/// Strip rectangles for a 1-D plan, left to right, clamped to the image's right edge.
pub fn strip_tasks(
    plan: &Plan,
    overlap: f64,
    source: &SourceImage,
) -> Result<Vec<ExportTask>, PlanError> {
    let dpi = source.dpi;
    let overlap_px = units::to_px(overlap, dpi)?;
    let base = source.base_name();
    let mut tasks = Vec::with_capacity(plan.piece_count());

    match plan.mode {
        PlanMode::Optimize => {
            let width_mm = plan.strip_widths.first().copied().unwrap_or_default();
            let strip_px = units::to_px(width_mm, dpi)?;
            for index in 0..plan.piece_count() {
                let x1 = index as f64 * (strip_px - overlap_px);
                tasks.push(strip_task(index, x1, strip_px, width_mm, base, source));
            }
        }
        PlanMode::Fill => {
            let mut x1 = 0.0;
            for (index, &width_mm) in plan.strip_widths.iter().enumerate() {
                let strip_px = units::to_px(width_mm, dpi)?;
                tasks.push(strip_task(index, x1, strip_px, width_mm, base, source));
                x1 += strip_px - overlap_px;
            }
        }
    }
    Ok(tasks)
}

fn strip_task(
    index: usize,
    x1: f64,
    strip_px: f64,
    width_mm: f64,
    base: &str,
    source: &SourceImage,
) -> ExportTask {
    ExportTask {
        index,
        rect: PixelRect {
            x1,
            y1: 0.0,
            x2: (x1 + strip_px).min(source.width_px),
            y2: source.height_px,
        },
        target: PixelSize::from_f64(strip_px, source.height_px),
        name: format!("{}_{}_{:.0}mm", base, index + 1, width_mm),
    }
}

/// Tile rectangles row by row, clamped to the image bounds.
pub fn grid_tasks(grid: &GridPartition, source: &SourceImage) -> Result<Vec<ExportTask>, PlanError> {
    if grid.piece_count() > MAX_GRID_PIECES {
        return Err(PlanError::InvalidInput(format!(
            "grid has {} pieces, at most {MAX_GRID_PIECES} allowed",
            grid.piece_count()
        )));
    }
    let dpi = source.dpi;
    let overlap_px = units::to_px(grid.overlap, dpi)?;
    let piece_w_px = units::to_px(grid.piece_width, dpi)?;
    let piece_h_px = units::to_px(grid.piece_height, dpi)?;
    let base = source.base_name();

    let mut tasks = Vec::with_capacity(grid.piece_count() as usize);
    for row in 0..grid.rows {
        let y1 = (row as f64 * (piece_h_px - overlap_px)).max(0.0);
        for col in 0..grid.cols {
            let x1 = (col as f64 * (piece_w_px - overlap_px)).max(0.0);
            tasks.push(ExportTask {
                index: tasks.len(),
                rect: PixelRect {
                    x1,
                    y1,
                    x2: (x1 + piece_w_px).min(source.width_px),
                    y2: (y1 + piece_h_px).min(source.height_px),
                },
                target: PixelSize::from_f64(piece_w_px, piece_h_px),
                name: format!(
                    "{}_R{}C{}_{:.0}x{:.0}mm",
                    base,
                    row + 1,
                    col + 1,
                    grid.piece_width,
                    grid.piece_height
                ),
            });
        }
    }
    Ok(tasks)
}

/// Runs export tasks against an editor, strictly in order.
pub struct Exporter<'e, E: ImageEditor + ?Sized> {
    editor: &'e mut E,
    format: RasterFormat,
}

impl<'e, E: ImageEditor + ?Sized> Exporter<'e, E> {
    pub fn new(editor: &'e mut E) -> Self {
        Self {
            editor,
            format: RasterFormat::default(),
        }
    }

    pub fn export_plan(
        &mut self,
        plan: &Plan,
        overlap: f64,
        source: &SourceImage,
        destination: &Path,
    ) -> Result<usize, ExportError> {
        let tasks = strip_tasks(plan, overlap, source)?;
        self.run(&tasks, destination)
    }

    pub fn export_grid(
        &mut self,
        grid: &GridPartition,
        source: &SourceImage,
        destination: &Path,
    ) -> Result<usize, ExportError> {
        let tasks = grid_tasks(grid, source)?;
        self.run(&tasks, destination)
    }

    /// Exports every task, stopping at the first failure. Files already written
    /// stay where they are.
    pub fn run(&mut self, tasks: &[ExportTask], destination: &Path) -> Result<usize, ExportError> {
        for task in tasks {
            let path = destination.join(task.file_name(self.format));
            self.export_one(task, &path)
                .map_err(|source| ExportError::Collaborator {
                    index: task.index,
                    name: task.name.clone(),
                    source,
                })?;
            info!(piece = task.index + 1, total = tasks.len(), path = %path.display(), "piece saved");
        }
        Ok(tasks.len())
    }

    fn export_one(&mut self, task: &ExportTask, path: &Path) -> Result<(), EditorError> {
        debug!(name = %task.name, rect = %task.rect, target = %task.target, "exporting piece");
        let mut copy = WorkingCopy::acquire(&mut *self.editor, &task.name)?;

        if let Err(e) = copy.flatten() {
            // Already flat documents refuse to flatten.
            debug!(error = %e, "flatten skipped");
        }

        let cropped = copy.crop(&task.rect)?;
        let off_w = (cropped.width as i64 - task.target.width as i64).abs();
        let off_h = (cropped.height as i64 - task.target.height as i64).abs();
        if off_w > CANVAS_TOLERANCE_PX || off_h > CANVAS_TOLERANCE_PX {
            debug!(from = %cropped, to = %task.target, "resizing canvas");
            copy.resize_canvas(task.target)?;
        }

        copy.save(path, self.format)?;
        copy.release()
    }
}

/// One request received by a [`DryRunEditor`].
#[derive(Debug, Clone, PartialEq)]
pub enum EditorCall {
    Duplicate(String),
    Flatten,
    Crop(PixelRect),
    ResizeCanvas(PixelSize),
    Save(PathBuf),
    Close,
    Restore,
}

/// Editor stand-in that records requests and writes nothing.
#[derive(Debug, Default)]
pub struct DryRunEditor {
    pub calls: Vec<EditorCall>,
    open_copies: usize,
}

impl DryRunEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved_paths(&self) -> Vec<&Path> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                EditorCall::Save(p) => Some(p.as_path()),
                _ => None,
            })
            .collect()
    }

    /// Working copies that were duplicated but never closed.
    pub fn open_copies(&self) -> usize {
        self.open_copies
    }
}

impl ImageEditor for DryRunEditor {
    fn duplicate(&mut self, name: &str) -> Result<(), EditorError> {
        if self.open_copies > 0 {
            return Err(EditorError::Rejected(
                "a working copy is already active".to_string(),
            ));
        }
        self.open_copies += 1;
        self.calls.push(EditorCall::Duplicate(name.to_string()));
        Ok(())
    }

    fn flatten(&mut self) -> Result<(), EditorError> {
        self.calls.push(EditorCall::Flatten);
        Ok(())
    }

    fn crop(&mut self, rect: &PixelRect) -> Result<PixelSize, EditorError> {
        self.calls.push(EditorCall::Crop(*rect));
        Ok(PixelSize::from_f64(rect.width(), rect.height()))
    }

    fn resize_canvas(&mut self, size: PixelSize) -> Result<(), EditorError> {
        self.calls.push(EditorCall::ResizeCanvas(size));
        Ok(())
    }

    fn save(&mut self, path: &Path, _format: RasterFormat) -> Result<(), EditorError> {
        info!(path = %path.display(), "dry run: would save");
        self.calls.push(EditorCall::Save(path.to_path_buf()));
        Ok(())
    }

    fn close_working_copy(&mut self) -> Result<(), EditorError> {
        self.open_copies = self.open_copies.saturating_sub(1);
        self.calls.push(EditorCall::Close);
        Ok(())
    }

    fn restore_context(&mut self) -> Result<(), EditorError> {
        self.calls.push(EditorCall::Restore);
        Ok(())
    }
}
