//! Value normalization for lead storage
//!
//! Submitted values arrive as JSON: scalars, upload mappings (`{"uuid": ..}`),
//! or collections of either. Storage values keep the shape of the input; labels
//! keep the shape of the storage value.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use tracing::debug;

use crate::config::DateFormats;
use crate::form::{scalar_to_string, FieldDefinition, Rgxp};

/// Resolves stable file references to their current path
pub trait FileLookup {
    fn path_for(&self, uuid: &str) -> Option<String>;
}

impl FileLookup for HashMap<String, String> {
    fn path_for(&self, uuid: &str) -> Option<String> {
        self.get(uuid).cloned()
    }
}

/// Lookup that knows no files; labels of upload fields stay the raw reference
pub struct NoFiles;

impl FileLookup for NoFiles {
    fn path_for(&self, _uuid: &str) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValueNormalizer {
    formats: DateFormats,
}

impl ValueNormalizer {
    pub fn new(formats: DateFormats) -> Self {
        Self { formats }
    }

    pub fn formats(&self) -> &DateFormats {
        &self.formats
    }

    /// Prepare a submitted value for storage
    pub fn prepare_value(&self, value: &Value, field: &FieldDefinition) -> Value {
        if field.is_upload() {
            if let Some(uuid) = upload_reference(value) {
                return uuid;
            }
        }

        match value {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.prepare_value(item, field))
                    .collect(),
            ),
            Value::Object(map) if !field.is_upload() => Value::Object(
                map.iter()
                    .map(|(key, item)| (key.clone(), self.prepare_value(item, field)))
                    .collect(),
            ),
            // An upload mapping without a reference has nothing to store
            Value::Object(_) => Value::Null,
            scalar => self.convert_rgxp(scalar, field.rgxp),
        }
    }

    /// Derive the human readable label for a storage value
    pub fn prepare_label(
        &self,
        value: &Value,
        field: &FieldDefinition,
        files: &dyn FileLookup,
    ) -> Value {
        match value {
            Value::Array(items) => {
                return Value::Array(
                    items
                        .iter()
                        .map(|item| self.prepare_label(item, field, files))
                        .collect(),
                )
            }
            Value::Object(map) => {
                return Value::Object(
                    map.iter()
                        .map(|(key, item)| (key.clone(), self.prepare_label(item, field, files)))
                        .collect(),
                )
            }
            _ => {}
        }

        if field.is_upload() {
            if let Some(path) = files.path_for(&scalar_to_string(value)) {
                return Value::String(path);
            }
        }

        let converted = self.convert_rgxp(value, field.rgxp);

        if !field.choices.is_empty() {
            let needle = scalar_to_string(&converted);
            if let Some(choice) = field
                .choices
                .iter()
                .find(|choice| choice.value == needle && !choice.label.is_empty())
            {
                return Value::String(choice.label.clone());
            }
        }

        converted
    }

    /// Convert date, time and datim values into Unix timestamps. Anything that
    /// does not parse with the configured format is returned unchanged.
    pub fn convert_rgxp(&self, value: &Value, rgxp: Option<Rgxp>) -> Value {
        let (Some(rgxp), Value::String(raw)) = (rgxp, value) else {
            return value.clone();
        };

        if raw.is_empty() {
            return value.clone();
        }

        match parse_timestamp(raw, rgxp, &self.formats) {
            Some(timestamp) => Value::String(timestamp.to_string()),
            None => {
                debug!("Value '{}' is not a valid {:?}, storing unchanged", raw, rgxp);
                value.clone()
            }
        }
    }
}

/// Collect all file references contained in a storage value
pub fn collect_references(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect_references(item, out)),
        Value::Object(map) => map.values().for_each(|item| collect_references(item, out)),
        Value::Null => {}
        scalar => out.push(scalar_to_string(scalar)),
    }
}

fn upload_reference(value: &Value) -> Option<Value> {
    value.as_object()?.get("uuid").cloned()
}

fn parse_timestamp(raw: &str, rgxp: Rgxp, formats: &DateFormats) -> Option<i64> {
    let raw = raw.trim();
    let datetime = match rgxp {
        Rgxp::Date => NaiveDate::parse_from_str(raw, &formats.date)
            .ok()?
            .and_hms_opt(0, 0, 0)?,
        Rgxp::Time => {
            let time = NaiveTime::parse_from_str(raw, &formats.time).ok()?;
            NaiveDate::from_ymd_opt(1970, 1, 1)?.and_time(time)
        }
        Rgxp::Datim => NaiveDateTime::parse_from_str(raw, &formats.datim).ok()?,
    };
    Some(datetime.and_utc().timestamp())
}
