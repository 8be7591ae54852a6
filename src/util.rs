use chrono::{DateTime, Utc};

use crate::aggregate::{PlanSummary, RowSummary};
use crate::app::PlanDetail;
use crate::model::{Plan, Row};

fn has_text(value: &str) -> bool {
    !value.trim().is_empty()
}

fn or_dash(value: &str) -> &str {
    if has_text(value) {
        value
    } else {
        "-"
    }
}

pub fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}

/// Whole numbers without a fractional part, everything else as given.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Two decimals with thousands separators, e.g. `12,500.00`.
pub fn format_amount(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, ch) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{cents}")
}

fn format_quarters(values: [&str; 4]) -> String {
    values
        .iter()
        .map(|value| or_dash(value))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn format_achievement(summary: &RowSummary) -> String {
    if summary.has_data {
        format!(
            "actual {}% / target {}%",
            summary.actual_pct, summary.target_pct
        )
    } else {
        "no data".to_string()
    }
}

fn push_header(output: &mut String, plan: &Plan) {
    output.push_str(&format!("Plan ID: {}\n", plan.id));
    output.push_str(&format!("No.: {}\n", plan.id_no));
    output.push_str(&format!("Development Area: {}\n", plan.development_area));
    output.push_str(&format!("Outcome: {}\n", plan.outcome));
    output.push_str(&format!("Strategy: {}\n", plan.strategy));
}

fn push_row(output: &mut String, row: &Row, summary: &RowSummary) {
    let data = &row.data;
    output.push_str(&format!("- Row {}: {}\n", data.row_no, or_dash(&data.pap)));
    output.push_str(&format!(
        "  Performance Indicator: {}\n",
        or_dash(&data.perf_indicator)
    ));
    output.push_str(&format!("  Targets Q1-Q4: {}\n", format_quarters(data.targets())));
    output.push_str(&format!("  Actuals Q1-Q4: {}\n", format_quarters(data.actuals())));
    output.push_str(&format!("  Achievement: {}\n", format_achievement(summary)));
    output.push_str(&format!(
        "  Office Concerned: {}\n",
        or_dash(&data.office_concerned)
    ));
    output.push_str(&format!(
        "  Total Est. Cost: {}\n",
        format_amount(data.total_est_cost)
    ));
    output.push_str(&format!("  Fund Source: {}\n", or_dash(&data.fund_source)));
    if has_text(&data.risk) {
        output.push_str(&format!("  Risk: {}\n", data.risk));
    }
    if has_text(&data.risk_assessment) {
        output.push_str(&format!("  Risk Assessment: {}\n", data.risk_assessment));
    }
    if has_text(&data.mitigating_activities) {
        output.push_str(&format!(
            "  Mitigating Activities: {}\n",
            data.mitigating_activities
        ));
    }
    if has_text(&row.proof_file) {
        output.push_str(&format!("  Proof: {}\n", row.proof_file));
    }
}

pub fn format_plan_detail(plan: &Plan, summary: &PlanSummary) -> String {
    let mut output = String::new();
    push_header(&mut output, plan);
    output.push_str(&format!("Created: {}\n", format_datetime(plan.created_at)));
    output.push_str(&format!("Updated: {}\n", format_datetime(plan.updated_at)));
    output.push('\n');
    output.push_str("Rows:\n");
    for (row, row_summary) in plan.rows.iter().zip(&summary.rows) {
        push_row(&mut output, row, row_summary);
    }
    output.push('\n');
    output.push_str(&format!(
        "Subtotal (Sum Est. Cost): {}",
        format_amount(summary.cost_subtotal)
    ));
    output
}

/// One line per plan, as shown on the records page.
pub fn format_plan_records(details: &[PlanDetail]) -> String {
    let mut output = String::new();
    for detail in details {
        let plan = &detail.plan;
        output.push_str(&format!(
            "- No. {} | {} | {} | {} (rows {}, target {}, actual {}, plan id {}, created {})\n",
            plan.id_no,
            plan.development_area,
            plan.outcome,
            plan.strategy,
            plan.rows.len(),
            format_number(detail.summary.total_target_q),
            format_number(detail.summary.total_actual_q),
            plan.id,
            format_datetime(plan.created_at)
        ));
    }
    output.trim_end().to_string()
}

/// Achievement breakdown of one plan, per row, closing with the cost subtotal.
pub fn format_dashboard(detail: &PlanDetail) -> String {
    let plan = &detail.plan;
    let summary = &detail.summary;
    let mut output = String::new();
    output.push_str(&format!(
        "No. {}: {} / {}\n",
        plan.id_no, plan.development_area, plan.outcome
    ));
    output.push_str(&format!("Strategy: {}\n", plan.strategy));
    if let Some(first) = summary.first() {
        output.push_str(&format!("Headline: {}\n", format_achievement(first)));
    }
    for (row, row_summary) in plan.rows.iter().zip(&summary.rows) {
        output.push_str(&format!(
            "- Row {} {}: target {}, actual {}, {}, cost {}\n",
            row.data.row_no,
            or_dash(&row.data.pap),
            format_number(row_summary.total_target),
            format_number(row_summary.total_actual),
            format_achievement(row_summary),
            format_amount(row.data.total_est_cost)
        ));
    }
    output.push_str(&format!(
        "SUBTOTAL: {} (Sum Est. Cost)",
        format_amount(summary.cost_subtotal)
    ));
    output
}

/// Compact card for the all-plans dashboard: the first row only, with a hint
/// when the plan holds more.
pub fn format_dashboard_overview(detail: &PlanDetail) -> String {
    let plan = &detail.plan;
    let mut output = String::new();
    output.push_str(&format!(
        "No. {}: {} / {}\n",
        plan.id_no, plan.development_area, plan.outcome
    ));
    output.push_str(&format!("Strategy: {}\n", plan.strategy));
    if let (Some(row), Some(first)) = (plan.rows.first(), detail.summary.first()) {
        let data = &row.data;
        output.push_str(&format!(
            "Headline: {} (row {} {})\n",
            format_achievement(first),
            data.row_no,
            or_dash(&data.pap)
        ));
        output.push_str(&format!(
            "  Performance Indicator: {}\n",
            or_dash(&data.perf_indicator)
        ));
        output.push_str(&format!(
            "  Office: {} | Total Est. Cost: {} | Fund Source: {}\n",
            or_dash(&data.office_concerned),
            format_amount(data.total_est_cost),
            or_dash(&data.fund_source)
        ));
        output.push_str(&format!(
            "  Risk: {} | Mitigating Activities: {}\n",
            or_dash(&data.risk),
            or_dash(&data.mitigating_activities)
        ));
        if has_text(&row.proof_file) {
            output.push_str(&format!("  Proof: {}\n", row.proof_file));
        } else {
            output.push_str("  No proof uploaded\n");
        }
    }
    if plan.rows.len() > 1 {
        output.push_str(&format!(
            "View all {} rows: aopplan plan dashboard {}\n",
            plan.rows.len(),
            plan.id
        ));
    }
    output.trim_end().to_string()
}
