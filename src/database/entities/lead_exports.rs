use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lead_exports")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub form_id: i32,
    pub name: String,
    /// Exporter type tag, looked up in the exporter registry
    pub exporter_type: String,
    /// `all`, `fields` or `tokens`
    pub export_mode: String,
    pub header_fields: bool,
    /// Serialized JSON list of column specs
    pub fields: Option<String>,
    /// Serialized JSON list of field references feeding the token template
    pub token_fields: Option<String>,
    pub token_template: Option<String>,
    pub filename: Option<String>,
    pub skip_last_run: bool,
    pub last_run: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::forms::Entity",
        from = "Column::FormId",
        to = "super::forms::Column::Id"
    )]
    Forms,
}

impl Related<super::forms::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Forms.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
