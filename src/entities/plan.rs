use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

use crate::model::{Plan, Row};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "plans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub id_no: i64,
    pub development_area: String,
    pub outcome: String,
    pub strategy: String,
    #[sea_orm(column_type = "Json")]
    pub rows: RowList,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

/// The ordered row sequence of a plan, persisted as a single JSON value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct RowList(pub Vec<Row>);

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Plan {
    fn from(model: Model) -> Self {
        Plan {
            id: model.id,
            id_no: model.id_no,
            development_area: model.development_area,
            outcome: model.outcome,
            strategy: model.strategy,
            rows: model.rows.0,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
