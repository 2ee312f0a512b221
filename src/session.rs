use std::path::Path;

use tracing::info;

use crate::config::PlannerConfig;
use crate::error::{ExportError, PlanError};
use crate::export::{Exporter, ImageEditor};
use crate::grid;
use crate::planner::{PlanOutcome, Planner};
use crate::types::{Dimensions, GridPartition, Plan, SourceImage};

/// Working state between calculating, choosing and exporting.
///
/// Any change to the document or the config drops the previous plans and grid.
#[derive(Debug, Default)]
pub struct Session {
    config: PlannerConfig,
    source: Option<SourceImage>,
    outcome: Option<PlanOutcome>,
    selected: Option<usize>,
    grid: Option<GridPartition>,
}

impl Session {
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: PlannerConfig) {
        self.config = config;
        self.invalidate();
    }

    /// Makes `source` the document to plan for and returns its size in mm.
    pub fn open(&mut self, source: SourceImage) -> Result<Dimensions, PlanError> {
        let dims = source.dimensions()?;
        dims.validate()?;
        info!(name = %source.name, dims = %dims, dpi = source.dpi, "document opened");
        self.source = Some(source);
        self.invalidate();
        Ok(dims)
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    pub fn dimensions(&self) -> Result<Dimensions, PlanError> {
        self.require_source()?.dimensions()
    }

    pub fn calculate_plans(&mut self) -> Result<&PlanOutcome, PlanError> {
        let dims = self.dimensions()?;
        let outcome = Planner::new(self.config.clone()).plan(dims)?;
        self.selected = outcome.best().map(|_| 0);
        Ok(self.outcome.insert(outcome))
    }

    pub fn plans(&self) -> &[Plan] {
        self.outcome.as_ref().map(PlanOutcome::plans).unwrap_or_default()
    }

    /// Chooses a plan by its 1-based number in the ranked list.
    pub fn select(&mut self, number: usize) -> Result<&Plan, PlanError> {
        let count = self.plans().len();
        if number < 1 || number > count {
            return Err(PlanError::InvalidInput(format!(
                "plan {number} does not exist, choose 1 to {count}"
            )));
        }
        self.selected = Some(number - 1);
        Ok(&self.plans()[number - 1])
    }

    pub fn selected_plan(&self) -> Option<&Plan> {
        self.selected.and_then(|i| self.plans().get(i))
    }

    pub fn update_grid(&mut self, cols: u32, rows: u32) -> Result<&GridPartition, PlanError> {
        let dims = self.dimensions()?;
        let partition = grid::partition(dims, cols, rows, self.config.overlap)?;
        Ok(self.grid.insert(partition))
    }

    pub fn grid(&self) -> Option<&GridPartition> {
        self.grid.as_ref()
    }

    pub fn export_selected<E: ImageEditor + ?Sized>(
        &self,
        editor: &mut E,
        destination: &Path,
    ) -> Result<usize, ExportError> {
        let source = self.require_source()?;
        let plan = self
            .selected_plan()
            .ok_or_else(|| PlanError::InvalidInput("no plan selected".to_string()))?;
        Exporter::new(editor).export_plan(plan, self.config.overlap, source, destination)
    }

    pub fn export_grid<E: ImageEditor + ?Sized>(
        &self,
        editor: &mut E,
        destination: &Path,
    ) -> Result<usize, ExportError> {
        let source = self.require_source()?;
        let grid = self
            .grid
            .as_ref()
            .ok_or_else(|| PlanError::InvalidInput("no grid calculated".to_string()))?;
        Exporter::new(editor).export_grid(grid, source, destination)
    }

    fn require_source(&self) -> Result<&SourceImage, PlanError> {
        self.source
            .as_ref()
            .ok_or_else(|| PlanError::InvalidInput("no document open".to_string()))
    }

    fn invalidate(&mut self) {
        self.outcome = None;
        self.selected = None;
        self.grid = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::DryRunEditor;
    use crate::types::PlanMode;
    use crate::units;

    fn mural() -> SourceImage {
        SourceImage::new(
            "mural.tif",
            units::to_px(3000.0, 300.0).unwrap(),
            units::to_px(1000.0, 300.0).unwrap(),
            300.0,
        )
    }

    #[test]
    fn test_calculate_and_export_best() {
        let mut session = Session::new(PlannerConfig::default());
        let dims = session.open(mural()).unwrap();
        assert!((dims.width - 3000.0).abs() < 1e-9);

        let outcome = session.calculate_plans().unwrap();
        assert_eq!(outcome.plans().len(), 8);
        let best = session.selected_plan().unwrap();
        assert_eq!(best.mode, PlanMode::Optimize);
        assert_eq!(best.roll_width, 1070.0);

        let mut editor = DryRunEditor::new();
        let written = session.export_selected(&mut editor, Path::new("out")).unwrap();
        assert_eq!(written, 3);
    }

    #[test]
    fn test_select_by_number() {
        let mut session = Session::new(PlannerConfig::default());
        session.open(mural()).unwrap();
        session.calculate_plans().unwrap();

        let plan = session.select(8).unwrap().clone();
        assert_eq!(session.selected_plan(), Some(&plan));
        assert!(session.select(0).is_err());
        assert!(session.select(9).is_err());
    }

    #[test]
    fn test_no_document() {
        let mut session = Session::new(PlannerConfig::default());
        assert!(matches!(session.calculate_plans(), Err(PlanError::InvalidInput(_))));
        assert!(session.update_grid(3, 2).is_err());
        let mut editor = DryRunEditor::new();
        assert!(session.export_selected(&mut editor, Path::new("out")).is_err());
    }

    #[test]
    fn test_config_change_drops_plans_and_grid() {
        let mut session = Session::new(PlannerConfig::default());
        session.open(mural()).unwrap();
        session.calculate_plans().unwrap();
        session.update_grid(3, 2).unwrap();

        session.set_config(PlannerConfig::new(10.0, 0.0, vec![1520.0]));
        assert!(session.plans().is_empty());
        assert!(session.selected_plan().is_none());
        assert!(session.grid().is_none());
    }

    #[test]
    fn test_no_feasible_plan_leaves_nothing_selected() {
        let mut session = Session::new(PlannerConfig::new(20.0, 2000.0, vec![914.0, 1520.0]));
        session.open(mural()).unwrap();
        assert_eq!(*session.calculate_plans().unwrap(), PlanOutcome::NoFeasiblePlan);
        assert!(session.selected_plan().is_none());
        let mut editor = DryRunEditor::new();
        assert!(session.export_selected(&mut editor, Path::new("out")).is_err());
    }

    #[test]
    fn test_grid_export() {
        let mut session = Session::new(PlannerConfig::new(10.0, 0.0, vec![1520.0]));
        session.open(mural()).unwrap();
        let grid = *session.update_grid(3, 2).unwrap();
        assert_eq!(grid.piece_count(), 6);

        let mut editor = DryRunEditor::new();
        assert_eq!(session.export_grid(&mut editor, Path::new("out")).unwrap(), 6);
        assert_eq!(editor.saved_paths()[5], Path::new("out/mural_R2C3_1007x505mm.tif"));
    }

    #[test]
    fn test_invalid_resolution_on_open() {
        let mut session = Session::new(PlannerConfig::default());
        assert!(session.open(SourceImage::new("x.tif", 100.0, 100.0, 0.0)).is_err());
        assert!(session.source().is_none());
    }
}
