use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{next_id_no, validate_new, PlanStore};
use crate::error::AppError;
use crate::model::{NewPlan, Plan, PlanHeader, Row};

/// Process-local plan store. The plan map and the number high-water mark sit
/// behind one lock, so allocation and insertion happen together.
#[derive(Debug, Default)]
pub struct MemoryPlanStore {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    plans: HashMap<String, Plan>,
    last_id_no: Option<i64>,
}

impl MemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlanStore for MemoryPlanStore {
    async fn create(&self, new_plan: NewPlan) -> Result<Plan, AppError> {
        validate_new(&new_plan.header, &new_plan.rows)?;

        let mut state = self.state.lock().await;
        let stored_max = state.plans.values().map(|plan| plan.id_no).max();
        let id_no = next_id_no(stored_max, state.last_id_no);
        let now = Utc::now();
        let plan = Plan {
            id: Uuid::new_v4().to_string(),
            id_no,
            development_area: new_plan.header.development_area,
            outcome: new_plan.header.outcome,
            strategy: new_plan.header.strategy,
            rows: new_plan.rows,
            created_at: now,
            updated_at: now,
        };
        state.last_id_no = Some(id_no);
        state.plans.insert(plan.id.clone(), plan.clone());
        Ok(plan)
    }

    async fn get(&self, id: &str) -> Result<Plan, AppError> {
        self.state
            .lock()
            .await
            .plans
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::plan_not_found(id))
    }

    async fn list_all(&self) -> Result<Vec<Plan>, AppError> {
        let mut plans: Vec<Plan> = self.state.lock().await.plans.values().cloned().collect();
        plans.sort_by(|a, b| b.id_no.cmp(&a.id_no));
        Ok(plans)
    }

    async fn replace(
        &self,
        id: &str,
        header: PlanHeader,
        rows: Vec<Row>,
    ) -> Result<Plan, AppError> {
        validate_new(&header, &rows)?;

        let mut state = self.state.lock().await;
        let plan = state
            .plans
            .get_mut(id)
            .ok_or_else(|| AppError::plan_not_found(id))?;
        plan.development_area = header.development_area;
        plan.outcome = header.outcome;
        plan.strategy = header.strategy;
        plan.rows = rows;
        plan.updated_at = Utc::now();
        Ok(plan.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.state
            .lock()
            .await
            .plans
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| AppError::plan_not_found(id))
    }
}
