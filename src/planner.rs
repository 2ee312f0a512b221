use serde::Serialize;
use tracing::info;

use crate::config::PlannerConfig;
use crate::error::PlanError;
use crate::strips;
use crate::types::{Dimensions, Plan};

/// Result of a planning run. An empty catalog match is not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "plans", rename_all = "snake_case")]
pub enum PlanOutcome {
    /// Best plan first.
    Ranked(Vec<Plan>),
    NoFeasiblePlan,
}

impl PlanOutcome {
    pub fn plans(&self) -> &[Plan] {
        match self {
            Self::Ranked(plans) => plans,
            Self::NoFeasiblePlan => &[],
        }
    }

    pub fn best(&self) -> Option<&Plan> {
        self.plans().first()
    }

    pub fn into_plans(self) -> Vec<Plan> {
        match self {
            Self::Ranked(plans) => plans,
            Self::NoFeasiblePlan => Vec::new(),
        }
    }
}

pub struct Planner {
    config: PlannerConfig,
}

impl Planner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn plan(&self, dims: Dimensions) -> Result<PlanOutcome, PlanError> {
        dims.validate()?;
        self.config.validate()?;

        let overlap = self.config.overlap;
        let margin = self.config.margin;
        let roll_widths = &self.config.roll_widths;

        let mut plans = strips::optimize(dims.width, dims.height, overlap, margin, roll_widths);
        plans.extend(strips::fill(dims.width, dims.height, overlap, margin, roll_widths));
        rank(&mut plans);

        info!(
            dims = %dims,
            overlap,
            margin,
            count = plans.len(),
            "plans computed"
        );

        if plans.is_empty() {
            Ok(PlanOutcome::NoFeasiblePlan)
        } else {
            Ok(PlanOutcome::Ranked(plans))
        }
    }
}

/// Fewest cuts first, then the narrower roll. Stable, so optimize stays ahead of
/// fill when both keys tie.
pub fn rank(plans: &mut [Plan]) {
    plans.sort_by(|a, b| {
        a.cut_count()
            .cmp(&b.cut_count())
            .then(a.roll_width.total_cmp(&b.roll_width))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlanMode;

    fn reference() -> (Planner, Dimensions) {
        (
            Planner::new(PlannerConfig::new(
                20.0,
                50.0,
                vec![914.0, 1070.0, 1270.0, 1520.0],
            )),
            Dimensions::new(3000.0, 1000.0),
        )
    }

    #[test]
    fn test_fewer_cuts_rank_first() {
        let (planner, dims) = reference();
        let outcome = planner.plan(dims).unwrap();
        let plans = outcome.plans();
        assert_eq!(plans.len(), 8);

        let pos = |mode, roll| {
            plans
                .iter()
                .position(|p| p.mode == mode && p.roll_width == roll)
                .unwrap()
        };
        assert!(pos(PlanMode::Optimize, 1520.0) < pos(PlanMode::Optimize, 914.0));

        // Cut counts never decrease down the list.
        assert!(plans.windows(2).all(|w| w[0].cut_count() <= w[1].cut_count()));
    }

    #[test]
    fn test_best_plan() {
        let (planner, dims) = reference();
        let outcome = planner.plan(dims).unwrap();
        let best = outcome.best().unwrap();
        assert_eq!(best.mode, PlanMode::Optimize);
        assert_eq!(best.roll_width, 1070.0);
        assert_eq!(best.cut_count(), 2);
    }

    #[test]
    fn test_equal_cuts_prefer_narrower_roll() {
        let (planner, dims) = reference();
        let outcome = planner.plan(dims).unwrap();
        for pair in outcome.plans().windows(2) {
            if pair[0].cut_count() == pair[1].cut_count() {
                assert!(pair[0].roll_width <= pair[1].roll_width);
            }
        }
    }

    #[test]
    fn test_full_tie_keeps_optimize_before_fill() {
        let mut plans = vec![
            Plan::new(PlanMode::Optimize, 1070.0, 1020.0, vec![500.0, 500.0], 1.0),
            Plan::new(PlanMode::Fill, 914.0, 864.0, vec![864.0, 100.0, 36.0], 1.0),
            Plan::new(PlanMode::Optimize, 914.0, 864.0, vec![500.0, 500.0], 1.0),
            Plan::new(PlanMode::Fill, 914.0, 864.0, vec![864.0, 136.0], 1.0),
        ];
        rank(&mut plans);
        assert_eq!(plans[0].roll_width, 914.0);
        assert_eq!(plans[0].mode, PlanMode::Optimize);
        assert_eq!(plans[1].mode, PlanMode::Fill);
        assert_eq!(plans[1].piece_count(), 2);
        assert_eq!(plans[2].roll_width, 1070.0);
        assert_eq!(plans[3].cut_count(), 2);
    }

    #[test]
    fn test_planning_is_idempotent() {
        let (planner, dims) = reference();
        assert_eq!(planner.plan(dims).unwrap(), planner.plan(dims).unwrap());
    }

    #[test]
    fn test_no_feasible_plan() {
        let planner = Planner::new(PlannerConfig::new(
            20.0,
            2000.0,
            vec![914.0, 1070.0, 1270.0, 1520.0],
        ));
        let outcome = planner.plan(Dimensions::new(3000.0, 1000.0)).unwrap();
        assert_eq!(outcome, PlanOutcome::NoFeasiblePlan);
        assert!(outcome.best().is_none());
        assert!(outcome.into_plans().is_empty());
    }

    #[test]
    fn test_invalid_dimensions_rejected_before_planning() {
        let planner = Planner::new(PlannerConfig::default());
        let err = planner.plan(Dimensions::new(0.0, 1000.0)).unwrap_err();
        assert!(matches!(err, PlanError::InvalidInput(_)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let planner = Planner::new(PlannerConfig::new(-5.0, 50.0, vec![914.0]));
        assert!(planner.plan(Dimensions::new(3000.0, 1000.0)).is_err());
    }

    #[test]
    fn test_custom_catalog() {
        let planner = Planner::new(PlannerConfig::new(0.0, 0.0, vec![3000.0]));
        let outcome = planner.plan(Dimensions::new(3000.0, 1000.0)).unwrap();
        let best = outcome.best().unwrap();
        assert_eq!(best.cut_count(), 0);
        assert!(best.savings_percent(3_000_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_outcome_serializes_with_status() {
        let json = serde_json::to_value(PlanOutcome::NoFeasiblePlan).unwrap();
        assert_eq!(json["status"], "no_feasible_plan");
    }
}
