use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use crate::database::entities::{lead_data, leads};
use crate::errors::{LeadsError, Result};
use crate::form::{FormDefinition, LeadField};
use crate::normalize::{collect_references, ValueNormalizer};
use crate::services::file_service::FileResolver;
use crate::services::form_service::FormService;

/// A file received with the submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    /// Stable reference of the stored file
    pub uuid: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub uploaded: bool,
}

/// One accepted form submission, as handed over by the form processor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Submission {
    pub post: Map<String, Value>,
    #[serde(default)]
    pub files: HashMap<String, UploadedFile>,
    pub language: Option<String>,
    /// Logged in member, if any
    pub member_id: Option<i32>,
}

/// A lead data row staged for insertion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadFieldRow {
    pub lead_id: i32,
    pub sorting: i32,
    pub tstamp: i64,
    pub master_id: i32,
    pub field_id: i32,
    pub name: String,
    pub value: Value,
    pub label: Value,
}

/// What listeners get to see of the submission being recorded
pub struct SubmissionContext<'a> {
    pub submission: &'a Submission,
    pub form: &'a FormDefinition,
    pub lead_id: i32,
}

/// Called for every staged row before it is inserted; may modify the row
pub trait PreStoreListener: Send + Sync {
    fn modify(
        &self,
        context: &SubmissionContext<'_>,
        field: &LeadField,
        row: &mut LeadFieldRow,
    ) -> anyhow::Result<()>;
}

/// Called once after all rows of a submission have been committed
pub trait PostStoreListener: Send + Sync {
    fn stored(&self, context: &SubmissionContext<'_>, fields: &[LeadField]) -> anyhow::Result<()>;
}

pub struct SubmissionService {
    db: DatabaseConnection,
    normalizer: ValueNormalizer,
    files: Arc<dyn FileResolver>,
    default_language: String,
    pre_store: Vec<Arc<dyn PreStoreListener>>,
    post_store: Vec<Arc<dyn PostStoreListener>>,
}

impl SubmissionService {
    pub fn new(
        db: DatabaseConnection,
        normalizer: ValueNormalizer,
        files: Arc<dyn FileResolver>,
        default_language: impl Into<String>,
    ) -> Self {
        Self {
            db,
            normalizer,
            files,
            default_language: default_language.into(),
            pre_store: Vec::new(),
            post_store: Vec::new(),
        }
    }

    /// Listeners run in registration order
    pub fn with_pre_store_listener(mut self, listener: Arc<dyn PreStoreListener>) -> Self {
        self.pre_store.push(listener);
        self
    }

    pub fn with_post_store_listener(mut self, listener: Arc<dyn PostStoreListener>) -> Self {
        self.post_store.push(listener);
        self
    }

    /// Record a submission to `form`.
    ///
    /// Returns the new lead id, or `None` when the form does not capture leads.
    /// The lead and its data rows are written in a single transaction.
    pub async fn record_submission(
        &self,
        submission: &Submission,
        form: &FormDefinition,
    ) -> Result<Option<i32>> {
        if !form.lead_enabled {
            debug!("Lead capture disabled for form {}", form.id);
            return Ok(None);
        }

        let fields = FormService::new(self.db.clone()).lead_fields(form).await?;
        let now = Utc::now().timestamp();

        // Normalize everything up front so upload labels resolve in one lookup
        let mut staged = Vec::new();
        let mut references = Vec::new();
        for field in &fields {
            let Some(raw) = self.submitted_value(submission, field)? else {
                debug!("No value submitted for field {}, skipping", field.post_name);
                continue;
            };

            let value = self.normalizer.prepare_value(&raw, &field.definition);
            if field.definition.is_upload() {
                collect_references(&value, &mut references);
            }
            staged.push((field, value));
        }
        let paths = self.files.resolve(&references).await?;

        let txn = self.db.begin().await?;

        let lead = leads::ActiveModel {
            tstamp: Set(now),
            created: Set(now),
            language: Set(submission
                .language
                .clone()
                .unwrap_or_else(|| self.default_language.clone())),
            form_id: Set(form.id),
            master_id: Set(form.master_id()),
            member_id: Set(submission.member_id.unwrap_or(0)),
            post_data: Set(Value::Object(submission.post.clone())),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let context = SubmissionContext {
            submission,
            form,
            lead_id: lead.id,
        };

        for (field, value) in staged {
            let label = self
                .normalizer
                .prepare_label(&value, &field.definition, &paths);

            let mut row = LeadFieldRow {
                lead_id: lead.id,
                sorting: field.definition.sorting,
                tstamp: now,
                master_id: field.master_id,
                field_id: field.field_id,
                name: field.definition.name.clone(),
                value,
                label,
            };

            for listener in &self.pre_store {
                listener
                    .modify(&context, field, &mut row)
                    .map_err(|e| LeadsError::Listener(e.to_string()))?;
            }

            lead_data::ActiveModel {
                lead_id: Set(row.lead_id),
                sorting: Set(row.sorting),
                tstamp: Set(row.tstamp),
                master_id: Set(row.master_id),
                field_id: Set(row.field_id),
                name: Set(row.name),
                value: Set(row.value),
                label: Set(row.label),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;
        info!(
            "Stored lead {} for form {} (master {})",
            lead.id,
            form.id,
            form.master_id()
        );

        // The lead is committed at this point, a failing listener cannot undo it
        for listener in &self.post_store {
            if let Err(e) = listener.stored(&context, &fields) {
                error!("Post-store listener failed for lead {}: {}", lead.id, e);
            }
        }

        Ok(Some(lead.id))
    }

    /// Raw value for a field: an uploaded file takes precedence over post data
    fn submitted_value(&self, submission: &Submission, field: &LeadField) -> Result<Option<Value>> {
        if let Some(file) = submission.files.get(&field.post_name) {
            if file.uploaded {
                return Ok(Some(serde_json::to_value(file)?));
            }
        }

        Ok(submission
            .post
            .get(&field.post_name)
            .filter(|value| !value.is_null())
            .cloned())
    }
}
