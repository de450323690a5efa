use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "form_fields")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub form_id: i32,
    pub name: String,
    pub label: Option<String>,
    pub field_type: String,
    /// Validation format: `date`, `time`, `datim` or empty
    pub rgxp: Option<String>,
    pub lead_store: bool,
    /// On satellite forms, the id of the master form field this field feeds
    pub lead_master_field: Option<i32>,
    pub sorting: i32,
    pub invisible: bool,
    /// JSON list of `{"value": .., "label": ..}` choices
    pub options: Option<Json>,
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
