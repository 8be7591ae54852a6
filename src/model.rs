use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;

/// Header fields shared by every write of a plan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanHeader {
    pub development_area: String,
    pub outcome: String,
    pub strategy: String,
}

/// Row content as typed by the user; everything except the evidence reference.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowData {
    pub row_no: i64,
    #[serde(default)]
    pub pap: String,
    #[serde(default)]
    pub perf_indicator: String,
    #[serde(default, deserialize_with = "quarter_text")]
    pub target_q1: String,
    #[serde(default, deserialize_with = "quarter_text")]
    pub target_q2: String,
    #[serde(default, deserialize_with = "quarter_text")]
    pub target_q3: String,
    #[serde(default, deserialize_with = "quarter_text")]
    pub target_q4: String,
    #[serde(default, deserialize_with = "quarter_text")]
    pub actual_q1: String,
    #[serde(default, deserialize_with = "quarter_text")]
    pub actual_q2: String,
    #[serde(default, deserialize_with = "quarter_text")]
    pub actual_q3: String,
    #[serde(default, deserialize_with = "quarter_text")]
    pub actual_q4: String,
    #[serde(default, alias = "office")]
    pub office_concerned: String,
    #[serde(default)]
    pub total_est_cost: f64,
    #[serde(default)]
    pub fund_source: String,
    #[serde(default)]
    pub risk: String,
    #[serde(default)]
    pub risk_assessment: String,
    #[serde(default)]
    pub mitigating_activities: String,
}

impl RowData {
    pub fn new(row_no: i64) -> Self {
        Self {
            row_no,
            ..Default::default()
        }
    }

    pub fn targets(&self) -> [&str; 4] {
        [
            self.target_q1.as_str(),
            self.target_q2.as_str(),
            self.target_q3.as_str(),
            self.target_q4.as_str(),
        ]
    }

    pub fn actuals(&self) -> [&str; 4] {
        [
            self.actual_q1.as_str(),
            self.actual_q2.as_str(),
            self.actual_q3.as_str(),
            self.actual_q4.as_str(),
        ]
    }
}

/// A persisted line item of a plan.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    #[serde(flatten)]
    pub data: RowData,
    #[serde(default)]
    pub proof_file: String,
}

/// A row as submitted by a client on create or update.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowInput {
    #[serde(flatten)]
    pub data: RowData,
    /// The evidence reference the client believes is currently stored.
    #[serde(default)]
    pub existing_proof: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: String,
    pub id_no: i64,
    pub development_area: String,
    pub outcome: String,
    pub strategy: String,
    pub rows: Vec<Row>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A fully resolved plan handed to a store for creation.
#[derive(Clone, Debug)]
pub struct NewPlan {
    pub header: PlanHeader,
    pub rows: Vec<Row>,
}

/// A file supplied for one row, not yet written to evidence storage.
#[derive(Clone, Debug, PartialEq)]
pub struct EvidenceUpload {
    pub row_no: i64,
    pub source: PathBuf,
}

/// Everything a client sends to create or update a plan.
#[derive(Clone, Debug)]
pub struct PlanSubmission {
    pub header: PlanHeader,
    pub rows: Vec<RowInput>,
    pub uploads: Vec<EvidenceUpload>,
}

impl PlanSubmission {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_header(&self.header)?;
        validate_rows(self.rows.iter().map(|row| &row.data))?;

        let row_nos: HashSet<i64> = self.rows.iter().map(|row| row.data.row_no).collect();
        let mut seen = HashSet::new();
        for upload in &self.uploads {
            if !row_nos.contains(&upload.row_no) {
                return Err(AppError::InvalidInput(format!(
                    "evidence file supplied for unknown row {}",
                    upload.row_no
                )));
            }
            if !seen.insert(upload.row_no) {
                return Err(AppError::InvalidInput(format!(
                    "more than one evidence file supplied for row {}",
                    upload.row_no
                )));
            }
        }
        Ok(())
    }
}

pub fn validate_header(header: &PlanHeader) -> Result<(), AppError> {
    ensure_non_empty("development area", &header.development_area)?;
    ensure_non_empty("outcome", &header.outcome)?;
    ensure_non_empty("strategy", &header.strategy)?;
    Ok(())
}

/// Checks the row-level invariants of a plan: at least one row, positive and
/// unique row numbers, non-negative finite cost.
pub fn validate_rows<'a, I>(rows: I) -> Result<(), AppError>
where
    I: IntoIterator<Item = &'a RowData>,
{
    let mut seen = HashSet::new();
    for row in rows {
        if row.row_no <= 0 {
            return Err(AppError::InvalidInput(format!(
                "row number must be positive, got {}",
                row.row_no
            )));
        }
        if !seen.insert(row.row_no) {
            return Err(AppError::InvalidInput(format!(
                "duplicate row number {}",
                row.row_no
            )));
        }
        if !row.total_est_cost.is_finite() || row.total_est_cost < 0.0 {
            return Err(AppError::InvalidInput(format!(
                "row {} total estimated cost must be a non-negative number",
                row.row_no
            )));
        }
    }
    if seen.is_empty() {
        return Err(AppError::InvalidInput(
            "a plan requires at least one row".to_string(),
        ));
    }
    Ok(())
}

fn ensure_non_empty(label: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidInput(format!("{label} cannot be empty")));
    }
    Ok(())
}

// Older clients submit quarter figures as JSON numbers.
fn quarter_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(text)) => text,
        Some(Raw::Number(number)) => number.to_string(),
        None => String::new(),
    })
}
