use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use sea_orm::*;
use tracing::{debug, info, warn};

use crate::common::write_bytes_to_file;
use crate::config::DateFormats;
use crate::database::entities::{forms, lead_data, lead_exports, leads, members};
use crate::errors::{LeadsError, Result};
use crate::export::config::dedupe_columns;
use crate::export::row::{LeadRecord, RowCompiler};
use crate::export::system_columns::DEFAULT_SYSTEM_COLUMNS;
use crate::export::tokens::{build_tokens, TokenField};
use crate::export::{
    ColumnFormat, ColumnSpec, ExportArtifact, ExportConfiguration, ExportMode, ExportTable,
    ExporterBinding,
    ExporterRegistry, FieldRef, TokenRenderer,
};
use crate::form::FieldDefinition;
use crate::services::form_service::FormService;

pub struct ExportService {
    db: DatabaseConnection,
    registry: Arc<ExporterRegistry>,
    renderer: Arc<dyn TokenRenderer>,
    formats: DateFormats,
}

impl ExportService {
    pub fn new(
        db: DatabaseConnection,
        registry: Arc<ExporterRegistry>,
        renderer: Arc<dyn TokenRenderer>,
        formats: DateFormats,
    ) -> Self {
        Self {
            db,
            registry,
            renderer,
            formats,
        }
    }

    /// Run export configuration `config_id` over the given leads, or over all
    /// leads of its master form when `lead_ids` is `None`.
    ///
    /// Returns `None` when the configuration does not exist or its exporter
    /// type is not registered.
    pub async fn export(
        &self,
        config_id: i32,
        lead_ids: Option<&[i32]>,
    ) -> Result<Option<ExportArtifact>> {
        let Some(model) = lead_exports::Entity::find_by_id(config_id)
            .one(&self.db)
            .await?
        else {
            warn!("Export configuration {} not found", config_id);
            return Ok(None);
        };

        let Some(binding) = self.registry.get(&model.exporter_type) else {
            warn!(
                "No exporter registered for type '{}' (export {})",
                model.exporter_type, config_id
            );
            return Ok(None);
        };

        let config = ExportConfiguration::from_model(model)?;

        let form_service = FormService::new(self.db.clone());
        let master_id = match form_service.find_form(config.form_id).await? {
            Some(form) => form.master_id(),
            None => config.form_id,
        };
        let fields = form_service.stored_fields(master_id).await?;

        // Taken before loading so leads committed while this run is in
        // progress are picked up by the next `skip_last_run` run
        let started = Utc::now().timestamp();
        let records = self.load_records(master_id, lead_ids, &config).await?;
        debug!(
            "Exporting {} leads of form {} with '{}'",
            records.len(),
            master_id,
            config.exporter_type
        );

        let table = match config.mode {
            ExportMode::Tokens => self.token_table(&config, &fields, &records)?,
            _ => {
                let mut columns = columns_for(&config, &fields);
                if binding.is_legacy() {
                    columns = dedupe_columns(columns, &fields);
                }
                let compiler = RowCompiler::new(&columns, &fields, self.formats.clone());
                ExportTable {
                    headers: compiler.headers(),
                    rows: records.iter().map(|record| compiler.compile(record)).collect(),
                }
            }
        };

        let artifact = match binding {
            ExporterBinding::Legacy { factory, method } => {
                let mut exporter = factory();
                exporter.call(method, &config, &table)?
            }
            ExporterBinding::Direct(exporter) => Some(exporter.export(&config, &table)?),
        };

        if let Some(artifact) = &artifact {
            self.touch_last_run(config.id, started).await?;
            info!(
                "Exported {} rows to {} ({} bytes)",
                table.rows.len(),
                artifact.filename,
                artifact.bytes.len()
            );
        }

        Ok(artifact)
    }

    /// Run an export and write the artifact into `dir`
    pub async fn export_to_dir(
        &self,
        config_id: i32,
        lead_ids: Option<&[i32]>,
        dir: &Path,
    ) -> Result<Option<PathBuf>> {
        let Some(artifact) = self.export(config_id, lead_ids).await? else {
            return Ok(None);
        };

        let path = dir.join(&artifact.filename);
        write_bytes_to_file(&path, &artifact.bytes)?;
        info!("Wrote export to {}", path.display());
        Ok(Some(path))
    }

    fn token_table(
        &self,
        config: &ExportConfiguration,
        fields: &[FieldDefinition],
        records: &[LeadRecord],
    ) -> Result<ExportTable> {
        let template = config.token_template.as_deref().ok_or_else(|| {
            LeadsError::InvalidConfiguration(format!("export {} has no token template", config.id))
        })?;

        let token_fields: Vec<TokenField<'_>> = if config.token_fields.is_empty() {
            fields
                .iter()
                .map(|field| TokenField {
                    field,
                    format: column_format(config, field),
                })
                .collect()
        } else {
            config
                .token_fields
                .iter()
                .filter_map(|spec| {
                    let Some(field) = fields.iter().find(|field| refers_to(&spec.field, field))
                    else {
                        debug!("Token field {} does not match a stored field", spec.field);
                        return None;
                    };
                    let format = match spec.format {
                        ColumnFormat::Raw => column_format(config, field),
                        format => format,
                    };
                    Some(TokenField { field, format })
                })
                .collect()
        };

        let rows = records
            .iter()
            .map(|record| {
                let tokens = build_tokens(record, &token_fields, &self.formats);
                Ok(vec![Some(self.renderer.render(template, &tokens)?)])
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ExportTable {
            headers: vec![config.name.clone()],
            rows,
        })
    }

    /// Leads of the master form with their data, lead attributes, form title
    /// and member name. Leads without any stored data are left out.
    async fn load_records(
        &self,
        master_id: i32,
        lead_ids: Option<&[i32]>,
        config: &ExportConfiguration,
    ) -> Result<Vec<LeadRecord>> {
        let mut query = leads::Entity::find().filter(leads::Column::MasterId.eq(master_id));
        if let Some(ids) = lead_ids {
            query = query.filter(leads::Column::Id.is_in(ids.to_vec()));
        }
        if config.skip_last_run {
            if let Some(last_run) = config.last_run {
                // Inclusive: a lead created in the second the previous run
                // started may not have been committed when it loaded
                query = query.filter(leads::Column::Created.gte(last_run));
            }
        }

        let leads = query
            .order_by_desc(leads::Column::Created)
            .order_by_desc(leads::Column::Id)
            .all(&self.db)
            .await?;
        if leads.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = leads.iter().map(|lead| lead.id).collect();
        let mut data: HashMap<i32, Vec<lead_data::Model>> = HashMap::new();
        for row in lead_data::Entity::find()
            .filter(lead_data::Column::LeadId.is_in(ids))
            .order_by_asc(lead_data::Column::Sorting)
            .all(&self.db)
            .await?
        {
            data.entry(row.lead_id).or_default().push(row);
        }

        let form_ids: Vec<i32> = leads.iter().map(|lead| lead.form_id).collect();
        let form_names: HashMap<i32, String> = forms::Entity::find()
            .filter(forms::Column::Id.is_in(form_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|form| (form.id, form.title))
            .collect();

        let member_ids: Vec<i32> = leads
            .iter()
            .map(|lead| lead.member_id)
            .filter(|id| *id > 0)
            .collect();
        let member_names: HashMap<i32, String> = if member_ids.is_empty() {
            HashMap::new()
        } else {
            members::Entity::find()
                .filter(members::Column::Id.is_in(member_ids))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|member| (member.id, member.full_name()))
                .collect()
        };

        let mut records = Vec::with_capacity(leads.len());
        for lead in leads {
            let Some(rows) = data.remove(&lead.id) else {
                debug!("Lead {} has no stored data, skipping", lead.id);
                continue;
            };
            let mut record = LeadRecord::new(lead, rows);
            record.form_name = form_names.get(&record.lead.form_id).cloned();
            record.member_name = member_names.get(&record.lead.member_id).cloned();
            records.push(record);
        }

        Ok(records)
    }

    async fn touch_last_run(&self, config_id: i32, started: i64) -> Result<()> {
        lead_exports::ActiveModel {
            id: Unchanged(config_id),
            last_run: Set(Some(started)),
            ..Default::default()
        }
        .update(&self.db)
        .await?;
        Ok(())
    }
}

fn refers_to(reference: &FieldRef, field: &FieldDefinition) -> bool {
    match reference {
        FieldRef::Field(id) => field.id == *id,
        FieldRef::Name(name) => &field.name == name,
        FieldRef::System(_) => false,
    }
}

/// Format of the first configured column showing `field`, raw otherwise
fn column_format(config: &ExportConfiguration, field: &FieldDefinition) -> ColumnFormat {
    config
        .columns
        .iter()
        .find(|spec| refers_to(&spec.field, field))
        .map(|spec| spec.format)
        .unwrap_or_default()
}

/// Column specs for cell based exports
fn columns_for(config: &ExportConfiguration, fields: &[FieldDefinition]) -> Vec<ColumnSpec> {
    match config.mode {
        ExportMode::All => DEFAULT_SYSTEM_COLUMNS
            .iter()
            .map(|tag| ColumnSpec::new(FieldRef::System(tag.to_string())))
            .chain(
                fields
                    .iter()
                    .map(|field| ColumnSpec::new(FieldRef::Field(field.id))),
            )
            .collect(),
        _ => config.columns.clone(),
    }
}
