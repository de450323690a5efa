use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "forms")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub lead_enabled: bool,
    /// Master form owning the shared lead table, if this is a satellite form
    pub lead_master: Option<i32>,
    pub lead_menu_label: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::form_fields::Entity")]
    FormFields,
    #[sea_orm(has_many = "super::lead_exports::Entity")]
    LeadExports,
}

impl Related<super::form_fields::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FormFields.def()
    }
}

impl Related<super::lead_exports::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LeadExports.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Form id that leads of this form are attributed to
    pub fn master_id(&self) -> i32 {
        match self.lead_master {
            Some(master) if master > 0 => master,
            _ => self.id,
        }
    }

    pub fn menu_label(&self) -> &str {
        match self.lead_menu_label.as_deref() {
            Some(label) if !label.is_empty() => label,
            _ => &self.title,
        }
    }
}
