use std::collections::HashMap;

use sea_orm::*;
use tracing::debug;

use crate::database::entities::{form_fields, forms};
use crate::errors::{LeadsError, Result};
use crate::form::{FieldDefinition, FormDefinition, LeadField};

/// Read access to the host's form and form field tables
#[derive(Clone)]
pub struct FormService {
    db: DatabaseConnection,
}

impl FormService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_form(&self, form_id: i32) -> Result<Option<FormDefinition>> {
        let form = forms::Entity::find_by_id(form_id).one(&self.db).await?;
        Ok(form.map(FormDefinition::from))
    }

    pub async fn get_form(&self, form_id: i32) -> Result<FormDefinition> {
        self.find_form(form_id)
            .await?
            .ok_or(LeadsError::FormNotFound(form_id))
    }

    /// Visible fields of a form flagged for storage, in form order
    pub async fn stored_fields(&self, form_id: i32) -> Result<Vec<FieldDefinition>> {
        let fields = form_fields::Entity::find()
            .filter(form_fields::Column::FormId.eq(form_id))
            .filter(form_fields::Column::LeadStore.eq(true))
            .filter(form_fields::Column::Invisible.eq(false))
            .order_by_asc(form_fields::Column::Sorting)
            .order_by_asc(form_fields::Column::Id)
            .all(&self.db)
            .await?;

        Ok(fields.into_iter().map(FieldDefinition::from).collect())
    }

    /// Fields of a master form flagged for storage, visible or not
    async fn storage_targets(&self, master_id: i32) -> Result<HashMap<i32, FieldDefinition>> {
        let fields = form_fields::Entity::find()
            .filter(form_fields::Column::FormId.eq(master_id))
            .filter(form_fields::Column::LeadStore.eq(true))
            .all(&self.db)
            .await?;

        Ok(fields
            .into_iter()
            .map(|model| (model.id, FieldDefinition::from(model)))
            .collect())
    }

    /// Fields that capture lead data for a submission to `form`.
    ///
    /// A satellite form stores into its master's fields: each visible satellite
    /// field referencing a master field flagged for storage contributes one
    /// entry, ordered by the master field's sorting. Only the satellite side is
    /// checked for visibility.
    pub async fn lead_fields(&self, form: &FormDefinition) -> Result<Vec<LeadField>> {
        let Some(master_id) = form.master else {
            let fields = self.stored_fields(form.id).await?;
            return Ok(fields.into_iter().map(LeadField::own).collect());
        };

        let satellites: Vec<FieldDefinition> = form_fields::Entity::find()
            .filter(form_fields::Column::FormId.eq(form.id))
            .filter(form_fields::Column::Invisible.eq(false))
            .filter(form_fields::Column::LeadMasterField.gt(0))
            .all(&self.db)
            .await?
            .into_iter()
            .map(FieldDefinition::from)
            .collect();

        let masters = self.storage_targets(master_id).await?;

        let mut fields: Vec<LeadField> = satellites
            .iter()
            .filter_map(|satellite| {
                let reference = satellite.master_field?;
                match masters.get(&reference) {
                    Some(master) => Some(LeadField::satellite(satellite, master.clone())),
                    None => {
                        debug!(
                            "Field {} references master field {} which is not stored on form {}",
                            satellite.name, reference, master_id
                        );
                        None
                    }
                }
            })
            .collect();

        fields.sort_by_key(|field| (field.definition.sorting, field.master_id));
        Ok(fields)
    }
}
