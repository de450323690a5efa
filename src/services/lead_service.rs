use std::collections::BTreeSet;

use sea_orm::*;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::database::entities::{forms, lead_data, leads};
use crate::errors::{LeadsError, Result};
use crate::export::row::value_for_output;
use crate::export::DisplayMode;

/// One entry of the lead administration menu
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationEntry {
    pub master_id: i32,
    pub label: String,
    /// Leads exist for this id but the form is gone
    pub orphan: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeadDetails {
    pub lead: leads::Model,
    pub data: Vec<lead_data::Model>,
}

/// Administrative access to recorded leads
#[derive(Clone)]
pub struct LeadService {
    db: DatabaseConnection,
}

impl LeadService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Master forms with lead capture enabled, sorted by menu label.
    ///
    /// With `include_orphans`, master ids that still own leads but no longer
    /// have a form are listed as `ID <n>`.
    pub async fn navigation(&self, include_orphans: bool) -> Result<Vec<NavigationEntry>> {
        let forms = forms::Entity::find().all(&self.db).await?;

        let mut entries: Vec<NavigationEntry> = forms
            .iter()
            .filter(|form| form.lead_enabled && form.master_id() == form.id)
            .map(|form| NavigationEntry {
                master_id: form.id,
                label: form.menu_label().to_string(),
                orphan: false,
            })
            .collect();

        if include_orphans {
            let known: BTreeSet<i32> = forms.iter().map(|form| form.id).collect();
            let masters: Vec<i32> = leads::Entity::find()
                .select_only()
                .column(leads::Column::MasterId)
                .distinct()
                .into_tuple()
                .all(&self.db)
                .await?;

            entries.extend(
                masters
                    .into_iter()
                    .filter(|id| !known.contains(id))
                    .map(|id| NavigationEntry {
                        master_id: id,
                        label: format!("ID {}", id),
                        orphan: true,
                    }),
            );
        }

        entries.sort_by(|a, b| a.label.cmp(&b.label).then(a.master_id.cmp(&b.master_id)));
        Ok(entries)
    }

    /// Leads of a master form, newest first
    pub async fn list_leads(&self, master_id: i32) -> Result<Vec<leads::Model>> {
        let leads = leads::Entity::find()
            .filter(leads::Column::MasterId.eq(master_id))
            .order_by_desc(leads::Column::Created)
            .order_by_desc(leads::Column::Id)
            .all(&self.db)
            .await?;
        Ok(leads)
    }

    pub async fn get_lead(&self, lead_id: i32) -> Result<LeadDetails> {
        let lead = leads::Entity::find_by_id(lead_id)
            .one(&self.db)
            .await?
            .ok_or(LeadsError::LeadNotFound(lead_id))?;

        let data = lead_data::Entity::find()
            .filter(lead_data::Column::LeadId.eq(lead_id))
            .order_by_asc(lead_data::Column::Sorting)
            .order_by_asc(lead_data::Column::Id)
            .all(&self.db)
            .await?;

        Ok(LeadDetails { lead, data })
    }

    /// Delete leads together with their data rows. Returns the number of leads removed.
    pub async fn delete_leads(&self, lead_ids: &[i32]) -> Result<u64> {
        if lead_ids.is_empty() {
            return Ok(0);
        }

        let txn = self.db.begin().await?;

        let data = lead_data::Entity::delete_many()
            .filter(lead_data::Column::LeadId.is_in(lead_ids.to_vec()))
            .exec(&txn)
            .await?;
        let removed = leads::Entity::delete_many()
            .filter(leads::Column::Id.is_in(lead_ids.to_vec()))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        debug!("Removed {} lead data rows", data.rows_affected);
        info!("Deleted {} leads", removed.rows_affected);
        Ok(removed.rows_affected)
    }
}

/// Format a stored value for list views: collections are joined with `, ` and
/// a label that differs from the value is shown as `label [value]`.
pub fn format_lead_value(value: &Value, label: &Value) -> String {
    value_for_output(DisplayMode::All, value, Some(label)).unwrap_or_default()
}
