//! Persistence of the plan aggregate.

mod memory;
mod sqlite;

use async_trait::async_trait;

use crate::error::AppError;
use crate::model::{NewPlan, Plan, PlanHeader, Row};

pub use memory::MemoryPlanStore;
pub use sqlite::SqlitePlanStore;

/// Storage backend for plans. Every write is applied as one unit: a failed
/// write leaves the stored plan exactly as it was.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Stores a new plan, assigning its id, `idNo` and timestamps.
    async fn create(&self, plan: NewPlan) -> Result<Plan, AppError>;

    async fn get(&self, id: &str) -> Result<Plan, AppError>;

    /// All plans, highest `idNo` first.
    async fn list_all(&self) -> Result<Vec<Plan>, AppError>;

    /// Overwrites the header and the whole row sequence of an existing plan.
    async fn replace(&self, id: &str, header: PlanHeader, rows: Vec<Row>)
        -> Result<Plan, AppError>;

    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

/// Next human-facing plan number: one past the larger of the highest number
/// still stored and the highest number ever handed out.
pub(crate) fn next_id_no(stored_max: Option<i64>, high_water: Option<i64>) -> i64 {
    stored_max.unwrap_or(0).max(high_water.unwrap_or(0)) + 1
}

fn validate_new(header: &PlanHeader, rows: &[Row]) -> Result<(), AppError> {
    crate::model::validate_header(header)?;
    crate::model::validate_rows(rows.iter().map(|row| &row.data))
}

#[cfg(test)]
pub(crate) mod contract {
    //! Behaviour every `PlanStore` backend must share.

    use super::*;
    use crate::model::RowData;

    pub fn header(area: &str) -> PlanHeader {
        PlanHeader {
            development_area: area.to_string(),
            outcome: "Outcome".to_string(),
            strategy: "Strategy".to_string(),
        }
    }

    pub fn row(row_no: i64, cost: f64, proof: &str) -> Row {
        Row {
            data: RowData {
                total_est_cost: cost,
                ..RowData::new(row_no)
            },
            proof_file: proof.to_string(),
        }
    }

    pub async fn create<S: PlanStore>(store: &S, area: &str) -> Plan {
        store
            .create(NewPlan {
                header: header(area),
                rows: vec![row(1, 100.0, "")],
            })
            .await
            .expect("create plan")
    }

    pub async fn id_no_never_reused<S: PlanStore>(store: &S) {
        let first = create(store, "One").await;
        let second = create(store, "Two").await;
        let third = create(store, "Three").await;
        assert_eq!(
            (first.id_no, second.id_no, third.id_no),
            (1, 2, 3)
        );

        store.delete(&second.id).await.expect("delete second");
        let fourth = create(store, "Four").await;
        assert_eq!(fourth.id_no, 4);

        store.delete(&fourth.id).await.expect("delete newest");
        let fifth = create(store, "Five").await;
        assert_eq!(fifth.id_no, 5);
    }

    pub async fn list_is_newest_first<S: PlanStore>(store: &S) {
        for area in ["A", "B", "C"] {
            create(store, area).await;
        }
        let listed: Vec<i64> = store
            .list_all()
            .await
            .expect("list")
            .iter()
            .map(|plan| plan.id_no)
            .collect();
        assert_eq!(listed, vec![3, 2, 1]);
    }

    pub async fn replace_keeps_identity<S: PlanStore>(store: &S) {
        let created = create(store, "Before").await;
        let rows = vec![row(4, 10.0, "x.png"), row(2, 20.0, "")];
        let replaced = store
            .replace(&created.id, header("After"), rows.clone())
            .await
            .expect("replace");
        assert_eq!(replaced.id, created.id);
        assert_eq!(replaced.id_no, created.id_no);
        assert_eq!(replaced.created_at, created.created_at);
        assert!(replaced.updated_at >= created.updated_at);
        assert_eq!(replaced.development_area, "After");
        assert_eq!(replaced.rows, rows);

        let fetched = store.get(&created.id).await.expect("get");
        assert_eq!(fetched, replaced);
    }

    pub async fn rejected_replace_changes_nothing<S: PlanStore>(store: &S) {
        let created = create(store, "Keep").await;
        let err = store
            .replace(&created.id, header("Changed"), Vec::new())
            .await
            .unwrap_err();
        assert!(err.is_validation());
        let fetched = store.get(&created.id).await.expect("get");
        assert_eq!(fetched, created);
    }

    pub async fn missing_ids_are_not_found<S: PlanStore>(store: &S) {
        let missing = "00000000-0000-0000-0000-000000000000";
        assert!(matches!(store.get(missing).await, Err(AppError::NotFound(_))));
        assert!(matches!(store.delete(missing).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            store
                .replace(missing, header("X"), vec![row(1, 0.0, "")])
                .await,
            Err(AppError::NotFound(_))
        ));
    }

    pub async fn delete_removes_plan<S: PlanStore>(store: &S) {
        let created = create(store, "Gone").await;
        store.delete(&created.id).await.expect("delete");
        assert!(matches!(store.get(&created.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(store.delete(&created.id).await, Err(AppError::NotFound(_))));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_id_no_uses_largest_known_number() {
        assert_eq!(next_id_no(None, None), 1);
        assert_eq!(next_id_no(Some(3), None), 4);
        assert_eq!(next_id_no(Some(2), Some(5)), 6);
        assert_eq!(next_id_no(Some(7), Some(5)), 8);
    }
}
