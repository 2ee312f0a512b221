use tracing::debug;

use crate::types::{Plan, PlanMode};

/// Largest strip count tried per roll before the roll is dropped.
pub const MAX_STRIPS: usize = 100;

/// Fill leftovers at or below this width (mm) are rounding noise, not a strip.
const FILL_EPSILON: f64 = 1e-6;

/// Equal-width strips: for each roll, the fewest strips whose rounded-up width fits.
///
/// Each candidate count `n` is evaluated on its own with
/// `s = ceil((width + (n - 1) * overlap) / n)`.
pub fn optimize(
    width: f64,
    height: f64,
    overlap: f64,
    margin: f64,
    roll_widths: &[f64],
) -> Vec<Plan> {
    let mut plans = Vec::new();
    for &roll in roll_widths {
        let usable = roll - margin;
        if usable <= 0.0 {
            debug!(roll, margin, "optimize: margin consumes roll");
            continue;
        }

        let found = (1..=MAX_STRIPS).find_map(|n| {
            let s = equal_strip_width(width, overlap, n);
            (s <= usable).then_some((n, s))
        });

        match found {
            Some((n, s)) => {
                debug!(roll, n, strip = s, "optimize: feasible");
                plans.push(Plan::new(PlanMode::Optimize, roll, usable, vec![s; n], height));
            }
            None => debug!(roll, usable, "optimize: no strip count up to the cap fits"),
        }
    }
    plans
}

fn equal_strip_width(width: f64, overlap: f64, n: usize) -> f64 {
    ((width + (n - 1) as f64 * overlap) / n as f64).ceil()
}

/// Greedy full-width strips, finishing with whatever is left.
///
/// The margin comes off the image width once here, not off every strip.
pub fn fill(
    width: f64,
    height: f64,
    overlap: f64,
    margin: f64,
    roll_widths: &[f64],
) -> Vec<Plan> {
    let total = width - margin;
    let mut plans = Vec::new();
    for &roll in roll_widths {
        let strip = roll - margin;
        if strip <= 0.0 {
            debug!(roll, margin, "fill: margin consumes roll");
            continue;
        }
        // Full strips would never shrink the remainder.
        if total >= strip && strip <= overlap {
            debug!(roll, strip, overlap, "fill: strip no wider than overlap");
            continue;
        }

        let Some(strips) = fill_strips(total, strip, overlap) else {
            debug!(roll, strip, overlap, "fill: more than {MAX_STRIPS} strips needed");
            continue;
        };
        if strips.is_empty() {
            debug!(roll, total, "fill: nothing left to print after margin");
            continue;
        }
        debug!(roll, count = strips.len(), "fill: feasible");
        plans.push(Plan::new(PlanMode::Fill, roll, strip, strips, height));
    }
    plans
}

/// `None` once the run would go past `MAX_STRIPS`.
fn fill_strips(total: f64, strip: f64, overlap: f64) -> Option<Vec<f64>> {
    let mut strips = Vec::new();
    let mut remaining = total;
    while remaining > FILL_EPSILON {
        if strips.len() == MAX_STRIPS {
            return None;
        }
        if remaining >= strip {
            strips.push(strip);
            remaining -= strip - overlap;
        } else {
            strips.push(remaining);
            break;
        }
    }
    Some(strips)
}
