//! Typed export configuration
//!
//! `lead_exports` rows keep column specs and token fields as serialized JSON.
//! They are parsed strictly here: anything malformed is an
//! [`LeadsError::InvalidConfiguration`] instead of being silently dropped.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::database::entities::lead_exports;
use crate::errors::{LeadsError, Result};
use crate::export::system_columns;
use crate::form::FieldDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    /// System columns followed by every stored master field
    All,
    /// The configured column specs
    Fields,
    /// One rendered token template per lead
    Tokens,
}

impl ExportMode {
    pub fn parse(tag: &str) -> Result<Self> {
        match tag {
            "all" | "" => Ok(ExportMode::All),
            "fields" => Ok(ExportMode::Fields),
            "tokens" => Ok(ExportMode::Tokens),
            other => Err(LeadsError::InvalidConfiguration(format!(
                "unknown export mode '{}'",
                other
            ))),
        }
    }
}

/// Which part of a stored value ends up in the cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    Value,
    Label,
    #[default]
    All,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnFormat {
    #[default]
    Raw,
    Date,
    Datim,
    Time,
}

/// Reference from a column spec to its data source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum FieldRef {
    /// Master form field id
    Field(i32),
    /// Master form field name
    Name(String),
    /// One of the system columns (`_form`, `_created`, ...)
    System(String),
}

impl FieldRef {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(LeadsError::InvalidConfiguration(
                "empty field reference".to_string(),
            ));
        }

        if raw.starts_with('_') {
            if !system_columns::is_system_tag(raw) {
                return Err(LeadsError::InvalidConfiguration(format!(
                    "unknown system column '{}'",
                    raw
                )));
            }
            return Ok(FieldRef::System(raw.to_string()));
        }

        Ok(match raw.parse::<i32>() {
            Ok(id) => FieldRef::Field(id),
            Err(_) => FieldRef::Name(raw.to_string()),
        })
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRef::Field(id) => write!(f, "{}", id),
            FieldRef::Name(name) | FieldRef::System(name) => f.write_str(name),
        }
    }
}

impl<'de> Deserialize<'de> for FieldRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Id(i32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Id(id) => Ok(FieldRef::Field(id)),
            Raw::Text(text) => FieldRef::parse(&text).map_err(serde::de::Error::custom),
        }
    }
}

/// One configured output column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnSpec {
    pub field: FieldRef,
    /// Header override
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: DisplayMode,
    #[serde(default)]
    pub format: ColumnFormat,
    /// Emit one column per choice of a multi-choice field
    #[serde(default)]
    pub expand_choices: bool,
}

impl ColumnSpec {
    pub fn new(field: FieldRef) -> Self {
        Self {
            field,
            name: None,
            value: DisplayMode::All,
            format: ColumnFormat::Raw,
            expand_choices: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportConfiguration {
    pub id: i32,
    pub form_id: i32,
    pub name: String,
    pub exporter_type: String,
    pub mode: ExportMode,
    pub header_fields: bool,
    pub columns: Vec<ColumnSpec>,
    /// Token fields, either bare references or full column specs carrying a format
    pub token_fields: Vec<ColumnSpec>,
    pub token_template: Option<String>,
    pub filename: Option<String>,
    pub skip_last_run: bool,
    pub last_run: Option<i64>,
}

impl ExportConfiguration {
    pub fn from_model(model: lead_exports::Model) -> Result<Self> {
        let mode = ExportMode::parse(model.export_mode.trim())?;

        let columns: Vec<ColumnSpec> = parse_list(model.fields.as_deref(), "fields")?;
        let token_fields: Vec<ColumnSpec> =
            parse_list::<TokenField>(model.token_fields.as_deref(), "token_fields")?
                .into_iter()
                .map(ColumnSpec::from)
                .collect();

        let token_template = model.token_template.filter(|t| !t.is_empty());
        if mode == ExportMode::Tokens && token_template.is_none() {
            return Err(LeadsError::InvalidConfiguration(format!(
                "export {} uses tokens but has no template",
                model.id
            )));
        }

        Ok(Self {
            id: model.id,
            form_id: model.form_id,
            name: model.name,
            exporter_type: model.exporter_type,
            mode,
            header_fields: model.header_fields,
            columns,
            token_fields,
            token_template,
            filename: model.filename.filter(|f| !f.trim().is_empty()),
            skip_last_run: model.skip_last_run,
            last_run: model.last_run,
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TokenField {
    Ref(FieldRef),
    Spec(ColumnSpec),
}

impl From<TokenField> for ColumnSpec {
    fn from(token: TokenField) -> Self {
        match token {
            TokenField::Ref(field) => ColumnSpec::new(field),
            TokenField::Spec(spec) => spec,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ColumnKey {
    Field(i32),
    Other(FieldRef),
}

/// Collapse column specs referencing the same field. Names are resolved to
/// master field ids first, so `"email"` and the id of `email` collide. A
/// later spec replaces the options of an earlier one but keeps the earlier
/// position.
pub fn dedupe_columns(columns: Vec<ColumnSpec>, fields: &[FieldDefinition]) -> Vec<ColumnSpec> {
    let mut keyed: IndexMap<ColumnKey, ColumnSpec> = IndexMap::new();
    for column in columns {
        let key = match &column.field {
            FieldRef::Field(id) => ColumnKey::Field(*id),
            FieldRef::Name(name) => match fields.iter().find(|field| &field.name == name) {
                Some(field) => ColumnKey::Field(field.id),
                None => ColumnKey::Other(column.field.clone()),
            },
            FieldRef::System(_) => ColumnKey::Other(column.field.clone()),
        };
        keyed.insert(key, column);
    }
    keyed.into_values().collect()
}

fn parse_list<T: for<'de> Deserialize<'de>>(raw: Option<&str>, what: &str) -> Result<Vec<T>> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(Vec::new());
    };

    serde_json::from_str(raw)
        .map_err(|e| LeadsError::InvalidConfiguration(format!("{}: {}", what, e)))
}
