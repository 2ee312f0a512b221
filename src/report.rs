use crate::types::{GridPartition, Plan};

const RULE_WIDTH: usize = 72;
const MM2_PER_M2: f64 = 1_000_000.0;

/// Ranked plan table. Rows are numbered from 1; row 1 is marked as the best plan.
pub fn render_plan_table(plans: &[Plan], original_area: f64) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Original: {:.0} mm² ({:.3} m²)\n",
        original_area,
        original_area / MM2_PER_M2
    ));
    out.push_str(&"=".repeat(RULE_WIDTH));
    out.push('\n');
    out.push_str(&format!(
        "{:>3} | {:<8} | {:>9} | {:>6} | {:>4} | {:>9} | {:>7}\n",
        "#", "Mode", "Roll", "Pieces", "Cuts", "Area m²", "Saved"
    ));
    out.push_str(&"-".repeat(RULE_WIDTH));
    out.push('\n');

    for (i, plan) in plans.iter().enumerate() {
        let best = if i == 0 { "  <- best" } else { "" };
        out.push_str(&format!(
            "{:>3} | {:<8} | {:>6.0} mm | {:>6} | {:>4} | {:>9.3} | {:>6.1}%{}\n",
            i + 1,
            plan.mode,
            plan.roll_width,
            plan.piece_count(),
            plan.cut_count(),
            plan.total_area / MM2_PER_M2,
            plan.savings_percent(original_area),
            best
        ));
    }
    out
}

/// One line per strip, e.g. `  1: 1014.0 mm`.
pub fn render_strip_list(plan: &Plan) -> String {
    let mut out = String::new();
    for (i, w) in plan.strip_widths.iter().enumerate() {
        out.push_str(&format!("  {}: {:.1} mm\n", i + 1, w));
    }
    out
}

pub fn render_grid_summary(grid: &GridPartition) -> String {
    format!(
        "Piece size: {:.1} x {:.1} mm\nColumns: {} | Rows: {}\nTotal pieces: {}\nOverlap: {} mm\n",
        grid.piece_width,
        grid.piece_height,
        grid.cols,
        grid.rows,
        grid.piece_count(),
        grid.overlap
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlanMode;

    #[test]
    fn test_table_rows() {
        let plans = vec![
            Plan::new(PlanMode::Optimize, 1070.0, 1020.0, vec![1014.0; 3], 1000.0),
            Plan::new(PlanMode::Fill, 914.0, 864.0, vec![864.0, 864.0, 864.0, 418.0], 1000.0),
        ];
        let table = render_plan_table(&plans, 3_000_000.0);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[0], "Original: 3000000 mm² (3.000 m²)");
        assert!(lines[2].contains("Mode"));
        assert!(lines[2].contains("Saved"));
        assert_eq!(
            lines[4],
            "  1 | optimize |   1070 mm |      3 |    2 |     3.042 |   -1.4%  <- best"
        );
        assert_eq!(
            lines[5],
            "  2 | fill     |    914 mm |      4 |    3 |     3.010 |   -0.3%"
        );
    }

    #[test]
    fn test_empty_table_has_header_only() {
        let table = render_plan_table(&[], 1.0);
        assert_eq!(table.lines().count(), 4);
    }

    #[test]
    fn test_strip_list() {
        let plan = Plan::new(PlanMode::Fill, 1520.0, 1470.0, vec![1470.0, 1470.0, 50.0], 1.0);
        assert_eq!(
            render_strip_list(&plan),
            "  1: 1470.0 mm\n  2: 1470.0 mm\n  3: 50.0 mm\n"
        );
    }

    #[test]
    fn test_grid_summary() {
        let grid = GridPartition {
            rows: 2,
            cols: 3,
            piece_width: 1820.0 / 3.0,
            piece_height: 455.0,
            overlap: 10.0,
        };
        let summary = render_grid_summary(&grid);
        assert!(summary.contains("606.7 x 455.0 mm"));
        assert!(summary.contains("Total pieces: 6"));
    }
}
