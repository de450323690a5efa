//! Turning stored lead data into output cells
//!
//! Every column runs the same display transformation: the stored value (and
//! label) is first formatted according to the column's [`ColumnFormat`], then
//! reduced to a single cell according to its [`DisplayMode`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::config::DateFormats;
use crate::database::entities::{lead_data, leads};
use crate::export::config::{ColumnFormat, ColumnSpec, DisplayMode, FieldRef};
use crate::export::system_columns::{self, LeadAttribute, SystemColumn};
use crate::export::Cell;
use crate::form::{scalar_to_string, FieldDefinition};

/// A lead with everything the export needs to know about it
#[derive(Debug, Clone)]
pub struct LeadRecord {
    pub lead: leads::Model,
    /// Title of the form the lead was submitted through
    pub form_name: Option<String>,
    pub member_name: Option<String>,
    /// Stored values keyed by master field id
    pub data: HashMap<i32, lead_data::Model>,
}

impl LeadRecord {
    pub fn new(lead: leads::Model, rows: Vec<lead_data::Model>) -> Self {
        Self {
            lead,
            form_name: None,
            member_name: None,
            data: rows.into_iter().map(|row| (row.master_id, row)).collect(),
        }
    }

    pub fn attribute(&self, attribute: LeadAttribute) -> Option<Value> {
        match attribute {
            LeadAttribute::FormId => Some(Value::from(self.lead.form_id)),
            LeadAttribute::FormName => self.form_name.clone().map(Value::String),
            LeadAttribute::Created => Some(Value::from(self.lead.created)),
            LeadAttribute::MemberId => Some(Value::from(self.lead.member_id)),
            LeadAttribute::MemberName => self.member_name.clone().map(Value::String),
        }
    }

    pub fn field(&self, master_id: i32) -> Option<&lead_data::Model> {
        self.data.get(&master_id)
    }
}

/// Apply a column format. Timestamps are rendered with the configured date
/// formats; anything that is not a timestamp is returned unchanged.
pub fn transform_value(value: &Value, format: ColumnFormat, formats: &DateFormats) -> Value {
    let pattern = match format {
        ColumnFormat::Raw => return value.clone(),
        ColumnFormat::Date => &formats.date,
        ColumnFormat::Datim => &formats.datim,
        ColumnFormat::Time => &formats.time,
    };

    if let Value::Array(items) = value {
        return Value::Array(
            items
                .iter()
                .map(|item| transform_value(item, format, formats))
                .collect(),
        );
    }

    let timestamp = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    timestamp
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
        .map(|dt| Value::String(dt.format(pattern).to_string()))
        .unwrap_or_else(|| value.clone())
}

/// Reduce a value/label pair to one cell
pub fn value_for_output(mode: DisplayMode, value: &Value, label: Option<&Value>) -> Cell {
    let value = flatten(value);
    let label = label.and_then(flatten).filter(|label| !label.is_empty());

    match mode {
        DisplayMode::Value => value,
        DisplayMode::Label => label.or(value),
        DisplayMode::All => match (value, label) {
            (Some(value), Some(label)) if !value.is_empty() && label != value => {
                Some(format!("{} [{}]", label, value))
            }
            (Some(value), label) if !value.is_empty() => Some(value).or(label),
            (value, label) => label.or(value),
        },
    }
}

fn flatten(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(flatten)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Value::Object(map) => Some(
            map.values()
                .filter_map(flatten)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        scalar => Some(scalar_to_string(scalar)),
    }
}

fn contains_choice(value: &Value, choice: &str) -> bool {
    match value {
        Value::Array(items) => items.iter().any(|item| contains_choice(item, choice)),
        Value::Null => false,
        scalar => scalar_to_string(scalar) == choice,
    }
}

#[derive(Debug, Clone)]
enum ColumnSource {
    System(&'static SystemColumn),
    Field {
        master_id: i32,
        spec: ColumnSpec,
    },
    Choice {
        master_id: i32,
        choice: String,
    },
    Empty,
}

#[derive(Debug, Clone)]
struct ResolvedColumn {
    header: String,
    source: ColumnSource,
}

/// Column specs resolved against the master form's fields
#[derive(Debug, Clone)]
pub struct RowCompiler {
    columns: Vec<ResolvedColumn>,
    formats: DateFormats,
}

impl RowCompiler {
    pub fn new(specs: &[ColumnSpec], fields: &[FieldDefinition], formats: DateFormats) -> Self {
        let mut columns = Vec::new();

        for spec in specs {
            let header_override = spec.name.clone().filter(|name| !name.is_empty());

            let field = match &spec.field {
                FieldRef::System(tag) => {
                    let source = match system_columns::find(tag) {
                        Some(system) => ColumnSource::System(system),
                        None => ColumnSource::Empty,
                    };
                    let header = header_override.unwrap_or_else(|| match &source {
                        ColumnSource::System(system) => system.name.to_string(),
                        _ => String::new(),
                    });
                    columns.push(ResolvedColumn { header, source });
                    continue;
                }
                FieldRef::Field(id) => fields.iter().find(|field| field.id == *id),
                FieldRef::Name(name) => fields.iter().find(|field| &field.name == name),
            };

            let Some(field) = field else {
                debug!("Column {} does not match a stored field", spec.field);
                let source = match spec.field {
                    // Data may outlive its field definition
                    FieldRef::Field(id) => ColumnSource::Field {
                        master_id: id,
                        spec: spec.clone(),
                    },
                    _ => ColumnSource::Empty,
                };
                columns.push(ResolvedColumn {
                    header: header_override.unwrap_or_else(|| spec.field.to_string()),
                    source,
                });
                continue;
            };

            let header = header_override.unwrap_or_else(|| field.display_name().to_string());

            if spec.expand_choices && !field.choices.is_empty() {
                for choice in &field.choices {
                    let choice_label = if choice.label.is_empty() {
                        &choice.value
                    } else {
                        &choice.label
                    };
                    columns.push(ResolvedColumn {
                        header: format!("{}: {}", header, choice_label),
                        source: ColumnSource::Choice {
                            master_id: field.id,
                            choice: choice.value.clone(),
                        },
                    });
                }
                continue;
            }

            columns.push(ResolvedColumn {
                header,
                source: ColumnSource::Field {
                    master_id: field.id,
                    spec: spec.clone(),
                },
            });
        }

        Self { columns, formats }
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.header.clone()).collect()
    }

    pub fn compile(&self, record: &LeadRecord) -> Vec<Cell> {
        self.columns
            .iter()
            .map(|column| self.cell(&column.source, record))
            .collect()
    }

    fn cell(&self, source: &ColumnSource, record: &LeadRecord) -> Cell {
        match source {
            ColumnSource::Empty => None,
            ColumnSource::System(system) => {
                let value = record.attribute(system.value_source?)?;
                let value = transform_value(&value, system.format, &self.formats);
                let label = system
                    .label_source
                    .and_then(|source| record.attribute(source))
                    .map(|label| transform_value(&label, system.format, &self.formats));
                value_for_output(system.value, &value, label.as_ref())
            }
            ColumnSource::Field { master_id, spec } => {
                let Some(data) = record.field(*master_id) else {
                    debug!("Lead {} has no data for field {}", record.lead.id, master_id);
                    return None;
                };
                let value = transform_value(&data.value, spec.format, &self.formats);
                let label = transform_value(&data.label, spec.format, &self.formats);
                value_for_output(spec.value, &value, Some(&label))
            }
            ColumnSource::Choice { master_id, choice } => record
                .field(*master_id)
                .filter(|data| contains_choice(&data.value, choice))
                .map(|_| "1".to_string()),
        }
    }
}
