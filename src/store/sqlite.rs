use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use super::{next_id_no, validate_new, PlanStore};
use crate::db;
use crate::entities::plan::RowList;
use crate::entities::{plan, plan_sequence};
use crate::error::AppError;
use crate::model::{NewPlan, Plan, PlanHeader, Row};

const ID_NO_SEQUENCE: &str = "plan_id_no";

/// Plans in SQLite through sea-orm; each plan is one record with its rows
/// embedded as JSON.
pub struct SqlitePlanStore {
    db: DatabaseConnection,
}

impl SqlitePlanStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Connects to the database file, creating it and its schema if needed.
    pub async fn open(path: &Path) -> Result<Self, AppError> {
        db::ensure_parent_dir(path)?;
        let db = db::connect(path).await?;
        db::ensure_schema(&db).await?;
        Ok(Self::new(db))
    }

    /// Connects read-only to a database `open` already bootstrapped; runs no
    /// DDL.
    pub async fn open_existing(path: &Path) -> Result<Self, AppError> {
        let db = db::connect_read_only(path).await?;
        Ok(Self::new(db))
    }

    async fn allocate_id_no<C: ConnectionTrait>(&self, db: &C) -> Result<i64, AppError> {
        let stored_max: Option<i64> = plan::Entity::find()
            .select_only()
            .column_as(plan::Column::IdNo.max(), "max_id_no")
            .into_tuple::<Option<i64>>()
            .one(db)
            .await?
            .flatten();
        let sequence = plan_sequence::Entity::find_by_id(ID_NO_SEQUENCE.to_string())
            .one(db)
            .await?;
        let next = next_id_no(stored_max, sequence.as_ref().map(|row| row.last_value));

        match sequence {
            Some(model) => {
                let mut active: plan_sequence::ActiveModel = model.into();
                active.last_value = Set(next);
                active.update(db).await?;
            }
            None => {
                let active = plan_sequence::ActiveModel {
                    name: Set(ID_NO_SEQUENCE.to_string()),
                    last_value: Set(next),
                };
                plan_sequence::Entity::insert(active).exec(db).await?;
            }
        }
        Ok(next)
    }
}

#[async_trait]
impl PlanStore for SqlitePlanStore {
    async fn create(&self, new_plan: NewPlan) -> Result<Plan, AppError> {
        validate_new(&new_plan.header, &new_plan.rows)?;

        let txn = self.db.begin().await?;
        let result: Result<Plan, AppError> = async {
            let id_no = self.allocate_id_no(&txn).await?;
            let now = Utc::now();
            let active = plan::ActiveModel {
                id: Set(Uuid::new_v4().to_string()),
                id_no: Set(id_no),
                development_area: Set(new_plan.header.development_area),
                outcome: Set(new_plan.header.outcome),
                strategy: Set(new_plan.header.strategy),
                rows: Set(RowList(new_plan.rows)),
                created_at: Set(now),
                updated_at: Set(now),
            };
            let model = active
                .insert(&txn)
                .await
                .map_err(|err| id_no_conflict(err, id_no))?;
            Ok(model.into())
        }
        .await;

        let created = finalize_transaction(txn, result).await?;
        info!(id = %created.id, id_no = created.id_no, "created plan");
        Ok(created)
    }

    async fn get(&self, id: &str) -> Result<Plan, AppError> {
        plan::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .map(Plan::from)
            .ok_or_else(|| AppError::plan_not_found(id))
    }

    async fn list_all(&self) -> Result<Vec<Plan>, AppError> {
        let plans = plan::Entity::find()
            .order_by_desc(plan::Column::IdNo)
            .all(&self.db)
            .await?;
        Ok(plans.into_iter().map(Plan::from).collect())
    }

    async fn replace(
        &self,
        id: &str,
        header: PlanHeader,
        rows: Vec<Row>,
    ) -> Result<Plan, AppError> {
        validate_new(&header, &rows)?;

        let txn = self.db.begin().await?;
        let result: Result<Plan, AppError> = async {
            let existing = plan::Entity::find_by_id(id.to_string())
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::plan_not_found(id))?;
            let mut active: plan::ActiveModel = existing.into();
            active.development_area = Set(header.development_area);
            active.outcome = Set(header.outcome);
            active.strategy = Set(header.strategy);
            active.rows = Set(RowList(rows));
            active.updated_at = Set(Utc::now());

            match active.update(&txn).await {
                Ok(model) => Ok(model.into()),
                Err(DbErr::RecordNotFound(_)) | Err(DbErr::RecordNotUpdated) => {
                    Err(AppError::plan_not_found(id))
                }
                Err(err) => Err(err.into()),
            }
        }
        .await;

        let updated = finalize_transaction(txn, result).await?;
        info!(id = %updated.id, id_no = updated.id_no, rows = updated.rows.len(), "replaced plan");
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let result = plan::Entity::delete_by_id(id.to_string())
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::plan_not_found(id));
        }
        info!(id, "deleted plan");
        Ok(())
    }
}

fn id_no_conflict(err: DbErr, id_no: i64) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict(format!("plan number {id_no} was already assigned"))
        }
        _ => err.into(),
    }
}

async fn finalize_transaction<T>(
    txn: DatabaseTransaction,
    result: Result<T, AppError>,
) -> Result<T, AppError> {
    match result {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                return Err(rollback_err.into());
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::contract;
    use tempfile::TempDir;

    async fn setup_store() -> (TempDir, SqlitePlanStore) {
        let dir = TempDir::new().expect("temp dir");
        let store = SqlitePlanStore::open(&dir.path().join("aopplan.db"))
            .await
            .expect("open store");
        (dir, store)
    }

    #[tokio::test]
    async fn id_no_is_never_reused() {
        let (_dir, store) = setup_store().await;
        contract::id_no_never_reused(&store).await;
    }

    #[tokio::test]
    async fn list_orders_by_id_no_descending() {
        let (_dir, store) = setup_store().await;
        contract::list_is_newest_first(&store).await;
    }

    #[tokio::test]
    async fn replace_preserves_identity_and_swaps_rows() {
        let (_dir, store) = setup_store().await;
        contract::replace_keeps_identity(&store).await;
    }

    #[tokio::test]
    async fn invalid_replace_leaves_plan_untouched() {
        let (_dir, store) = setup_store().await;
        contract::rejected_replace_changes_nothing(&store).await;
    }

    #[tokio::test]
    async fn unknown_ids_report_not_found() {
        let (_dir, store) = setup_store().await;
        contract::missing_ids_are_not_found(&store).await;
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let (_dir, store) = setup_store().await;
        contract::delete_removes_plan(&store).await;
    }

    #[tokio::test]
    async fn id_no_sequence_survives_reopen() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("aopplan.db");
        {
            let store = SqlitePlanStore::open(&path).await.expect("open");
            let first = contract::create(&store, "One").await;
            contract::create(&store, "Two").await;
            let latest = store.list_all().await.expect("list")[0].clone();
            store.delete(&latest.id).await.expect("delete");
            assert_eq!(first.id_no, 1);
        }
        let store = SqlitePlanStore::open(&path).await.expect("reopen");
        let next = contract::create(&store, "Three").await;
        assert_eq!(next.id_no, 3);
    }

    #[tokio::test]
    async fn read_only_store_sees_existing_plans() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("aopplan.db");
        let created = {
            let store = SqlitePlanStore::open(&path).await.expect("open");
            contract::create(&store, "One").await
        };
        let reader = SqlitePlanStore::open_existing(&path).await.expect("open existing");
        assert_eq!(reader.get(&created.id).await.expect("get"), created);
        assert_eq!(reader.list_all().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn duplicate_id_no_surfaces_as_conflict() {
        let (_dir, store) = setup_store().await;
        let existing = contract::create(&store, "One").await;
        let now = Utc::now();
        let clash = plan::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            id_no: Set(existing.id_no),
            development_area: Set("Clash".to_string()),
            outcome: Set("Outcome".to_string()),
            strategy: Set("Strategy".to_string()),
            rows: Set(RowList(vec![contract::row(1, 0.0, "")])),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let err = clash.insert(&store.db).await.unwrap_err();
        assert!(matches!(id_no_conflict(err, existing.id_no), AppError::Conflict(_)));
        assert_eq!(store.list_all().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn rows_round_trip_through_json_column() {
        let (_dir, store) = setup_store().await;
        let mut row = contract::row(9, 2500.5, "evidence.png");
        row.data.target_q1 = "N/A".to_string();
        row.data.actual_q2 = "12%".to_string();
        row.data.risk_assessment = "Low".to_string();
        let created = store
            .create(NewPlan {
                header: contract::header("Health"),
                rows: vec![row.clone()],
            })
            .await
            .expect("create");
        let fetched = store.get(&created.id).await.expect("get");
        assert_eq!(fetched.rows, vec![row]);
    }
}
