use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "leads")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tstamp: i64,
    pub created: i64,
    pub language: String,
    pub form_id: i32,
    pub master_id: i32,
    /// 0 for anonymous submissions
    pub member_id: i32,
    pub post_data: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::lead_data::Entity")]
    LeadData,
}

impl Related<super::lead_data::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LeadData.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
