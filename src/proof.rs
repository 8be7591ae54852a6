//! Decides which evidence reference each row keeps across a write.

use std::collections::HashMap;

use tracing::debug;

use crate::model::{Row, RowInput};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProofSource {
    Uploaded,
    Retained,
    Persisted,
    None,
}

impl ProofSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Retained => "retained",
            Self::Persisted => "persisted",
            Self::None => "none",
        }
    }
}

/// Picks the evidence reference for one row.
///
/// A fresh upload always wins, then a non-blank `existingProof` hint, then
/// whatever the stored row with the same `rowNo` carried.
pub fn resolve_proof(
    uploaded: Option<&str>,
    existing_hint: Option<&str>,
    persisted: Option<&str>,
) -> (String, ProofSource) {
    if let Some(reference) = uploaded {
        return (reference.to_string(), ProofSource::Uploaded);
    }
    if let Some(hint) = existing_hint.filter(|hint| !hint.trim().is_empty()) {
        return (hint.to_string(), ProofSource::Retained);
    }
    if let Some(stored) = persisted.filter(|stored| !stored.is_empty()) {
        return (stored.to_string(), ProofSource::Persisted);
    }
    (String::new(), ProofSource::None)
}

/// Resolves the final rows of a write, in submitted order.
///
/// `prior` is the stored row list (empty on create); `uploaded` maps a
/// `rowNo` to the storage reference of a file written for it during this
/// request.
pub fn reconcile(prior: &[Row], submitted: Vec<RowInput>, uploaded: &HashMap<i64, String>) -> Vec<Row> {
    let persisted: HashMap<i64, &str> = prior
        .iter()
        .map(|row| (row.data.row_no, row.proof_file.as_str()))
        .collect();

    submitted
        .into_iter()
        .map(|input| {
            let row_no = input.data.row_no;
            let (proof_file, source) = resolve_proof(
                uploaded.get(&row_no).map(String::as_str),
                input.existing_proof.as_deref(),
                persisted.get(&row_no).copied(),
            );
            debug!(row_no, source = source.as_str(), "resolved evidence reference");
            Row {
                data: input.data,
                proof_file,
            }
        })
        .collect()
}
