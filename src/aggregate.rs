//! Read-time aggregates for dashboards and record lists.
//!
//! Nothing here is persisted; summaries are rebuilt from stored rows on every
//! read.

use serde::Serialize;

use crate::model::{Plan, Row};
use crate::quarter::sum_quarters;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowSummary {
    pub row_no: i64,
    pub total_target: f64,
    pub total_actual: f64,
    pub actual_pct: i64,
    pub target_pct: i64,
    pub has_data: bool,
}

impl RowSummary {
    pub fn of(row: &Row) -> Self {
        let total_target = sum_quarters(row.data.targets());
        let total_actual = sum_quarters(row.data.actuals());
        let (actual_pct, target_pct, has_data) = if total_target > 0.0 {
            let actual_pct = round_half_up(total_actual / total_target * 100.0);
            (actual_pct, 100i64.saturating_sub(actual_pct).max(0), true)
        } else if total_actual > 0.0 {
            (100, 0, true)
        } else {
            (0, 0, false)
        };
        Self {
            row_no: row.data.row_no,
            total_target,
            total_actual,
            actual_pct,
            target_pct,
            has_data,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub rows: Vec<RowSummary>,
    pub cost_subtotal: f64,
    pub total_target_q: f64,
    pub total_actual_q: f64,
}

impl PlanSummary {
    pub fn of(plan: &Plan) -> Self {
        Self::of_rows(&plan.rows)
    }

    pub fn of_rows(rows: &[Row]) -> Self {
        let summaries: Vec<RowSummary> = rows.iter().map(RowSummary::of).collect();
        Self {
            cost_subtotal: rows.iter().map(|row| row.data.total_est_cost).sum(),
            total_target_q: summaries.iter().map(|row| row.total_target).sum(),
            total_actual_q: summaries.iter().map(|row| row.total_actual).sum(),
            rows: summaries,
        }
    }

    /// Summary of the first row in display order, used by compact views.
    pub fn first(&self) -> Option<&RowSummary> {
        self.rows.first()
    }
}

/// Saturates at the `i64` bounds; a NaN ratio (both totals infinite) is 0.
fn round_half_up(value: f64) -> i64 {
    if value.is_nan() {
        return 0;
    }
    (value + 0.5)
        .floor()
        .clamp(i64::MIN as f64, i64::MAX as f64) as i64
}
