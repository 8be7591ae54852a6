use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::aggregate::PlanSummary;
use crate::error::AppError;
use crate::evidence::EvidenceStore;
use crate::model::{EvidenceUpload, NewPlan, Plan, PlanSubmission};
use crate::proof;
use crate::store::PlanStore;

/// Plan operations over a plan store and an evidence store.
pub struct App<S, E> {
    store: S,
    evidence: E,
}

pub struct PlanDetail {
    pub plan: Plan,
    pub summary: PlanSummary,
}

impl PlanDetail {
    fn new(plan: Plan) -> Self {
        let summary = PlanSummary::of(&plan);
        Self { plan, summary }
    }
}

impl<S: PlanStore, E: EvidenceStore> App<S, E> {
    pub fn new(store: S, evidence: E) -> Self {
        Self { store, evidence }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn evidence(&self) -> &E {
        &self.evidence
    }

    pub async fn create_plan(&self, submission: PlanSubmission) -> Result<Plan, AppError> {
        submission.validate()?;
        let PlanSubmission {
            header,
            rows,
            uploads,
        } = submission;

        let uploaded = self.upload_all(&uploads).await?;
        let rows = proof::reconcile(&[], rows, &uploaded);
        let result = self.store.create(NewPlan { header, rows }).await;
        let plan = self.keep_or_discard(result, &uploaded).await?;
        info!(id = %plan.id, id_no = plan.id_no, uploads = uploaded.len(), "plan created");
        Ok(plan)
    }

    /// Replaces header and rows of a plan. Rows keep their stored evidence
    /// unless the submission uploads a new file or names another reference.
    /// References the plan no longer holds are removed from evidence storage
    /// once no plan points at them.
    pub async fn update_plan(&self, id: &str, submission: PlanSubmission) -> Result<Plan, AppError> {
        submission.validate()?;
        let prior = self.store.get(id).await?;
        let PlanSubmission {
            header,
            rows,
            uploads,
        } = submission;

        let uploaded = self.upload_all(&uploads).await?;
        let rows = proof::reconcile(&prior.rows, rows, &uploaded);
        let result = self.store.replace(id, header, rows).await;
        let plan = self.keep_or_discard(result, &uploaded).await?;
        info!(id = %plan.id, id_no = plan.id_no, uploads = uploaded.len(), "plan updated");
        self.release_superseded(&prior).await;
        Ok(plan)
    }

    pub async fn get_plan(&self, id: &str) -> Result<Plan, AppError> {
        self.store.get(id).await
    }

    pub async fn list_plans(&self) -> Result<Vec<Plan>, AppError> {
        self.store.list_all().await
    }

    pub async fn delete_plan(&self, id: &str) -> Result<(), AppError> {
        self.store.delete(id).await?;
        info!(id, "plan deleted");
        Ok(())
    }

    pub async fn get_plan_detail(&self, id: &str) -> Result<PlanDetail, AppError> {
        Ok(PlanDetail::new(self.store.get(id).await?))
    }

    /// Every plan with its aggregates, highest `idNo` first.
    pub async fn list_plan_details(&self) -> Result<Vec<PlanDetail>, AppError> {
        let plans = self.store.list_all().await?;
        Ok(plans.into_iter().map(PlanDetail::new).collect())
    }

    async fn upload_all(
        &self,
        uploads: &[EvidenceUpload],
    ) -> Result<HashMap<i64, String>, AppError> {
        let mut uploaded = HashMap::with_capacity(uploads.len());
        for upload in uploads {
            match self.evidence.put(upload).await {
                Ok(reference) => {
                    uploaded.insert(upload.row_no, reference);
                }
                Err(err) => {
                    self.discard(&uploaded).await;
                    return Err(err);
                }
            }
        }
        Ok(uploaded)
    }

    async fn keep_or_discard<T>(
        &self,
        result: Result<T, AppError>,
        uploaded: &HashMap<i64, String>,
    ) -> Result<T, AppError> {
        if result.is_err() {
            self.discard(uploaded).await;
        }
        result
    }

    async fn release_superseded(&self, prior: &Plan) {
        let mut candidates: HashSet<&str> = prior
            .rows
            .iter()
            .map(|row| row.proof_file.as_str())
            .filter(|reference| !reference.trim().is_empty())
            .collect();
        if candidates.is_empty() {
            return;
        }
        let plans = match self.store.list_all().await {
            Ok(plans) => plans,
            Err(err) => {
                warn!(id = %prior.id, error = %err, "skipped evidence cleanup");
                return;
            }
        };
        for row in plans.iter().flat_map(|plan| &plan.rows) {
            candidates.remove(row.proof_file.as_str());
        }
        for reference in candidates {
            match self.evidence.remove(reference).await {
                Ok(()) => debug!(reference, "removed superseded evidence"),
                Err(err) => {
                    warn!(reference, error = %err, "failed to remove superseded evidence")
                }
            }
        }
    }

    async fn discard(&self, uploaded: &HashMap<i64, String>) {
        for reference in uploaded.values() {
            if let Err(err) = self.evidence.remove(reference).await {
                warn!(reference = %reference, error = %err, "failed to remove orphaned evidence");
            }
        }
    }
}
