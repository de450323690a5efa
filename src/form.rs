//! Typed form and field definitions
//!
//! Database rows from `forms` and `form_fields` are converted into these value
//! types before any capture or export logic runs, so the rest of the crate never
//! inspects loosely-typed rows.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::database::entities::{form_fields, forms};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDefinition {
    pub id: i32,
    pub title: String,
    pub lead_enabled: bool,
    pub master: Option<i32>,
    pub menu_label: String,
}

impl FormDefinition {
    /// Form id that owns the lead rows of this form
    pub fn master_id(&self) -> i32 {
        self.master.unwrap_or(self.id)
    }

    pub fn is_satellite(&self) -> bool {
        self.master.is_some()
    }
}

impl From<forms::Model> for FormDefinition {
    fn from(model: forms::Model) -> Self {
        let menu_label = model.menu_label().to_string();
        let master = model.lead_master.filter(|id| *id > 0 && *id != model.id);
        Self {
            id: model.id,
            title: model.title,
            lead_enabled: model.lead_enabled,
            master,
            menu_label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Upload,
    Generic(String),
}

impl From<&str> for FieldKind {
    fn from(tag: &str) -> Self {
        match tag {
            "upload" => FieldKind::Upload,
            other => FieldKind::Generic(other.to_string()),
        }
    }
}

/// Validation format of a field whose values are converted to timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rgxp {
    Date,
    Time,
    Datim,
}

impl Rgxp {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "date" => Some(Rgxp::Date),
            "time" => Some(Rgxp::Time),
            "datim" | "datetime" => Some(Rgxp::Datim),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub id: i32,
    pub form_id: i32,
    pub name: String,
    pub label: Option<String>,
    pub kind: FieldKind,
    pub rgxp: Option<Rgxp>,
    pub store: bool,
    pub sorting: i32,
    pub invisible: bool,
    pub choices: Vec<ChoiceOption>,
    /// Master form field this satellite field feeds
    pub master_field: Option<i32>,
}

impl FieldDefinition {
    pub fn is_upload(&self) -> bool {
        self.kind == FieldKind::Upload
    }

    pub fn display_name(&self) -> &str {
        match self.label.as_deref() {
            Some(label) if !label.is_empty() => label,
            _ => &self.name,
        }
    }
}

impl From<form_fields::Model> for FieldDefinition {
    fn from(model: form_fields::Model) -> Self {
        let choices = model
            .options
            .as_ref()
            .map(parse_choices)
            .unwrap_or_default();

        Self {
            id: model.id,
            form_id: model.form_id,
            kind: FieldKind::from(model.field_type.as_str()),
            rgxp: model.rgxp.as_deref().and_then(Rgxp::parse),
            name: model.name,
            label: model.label,
            store: model.lead_store,
            sorting: model.sorting,
            invisible: model.invisible,
            choices,
            master_field: model.lead_master_field.filter(|id| *id > 0),
        }
    }
}

/// Read `[{"value": .., "label": ..}]` choice lists. Entries without a value
/// (option groups) are ignored.
pub fn parse_choices(options: &Value) -> Vec<ChoiceOption> {
    let Some(entries) = options.as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let value = entry.get("value").map(scalar_to_string)?;
            let label = entry
                .get("label")
                .map(scalar_to_string)
                .unwrap_or_default();
            Some(ChoiceOption { value, label })
        })
        .collect()
}

/// String form of a scalar JSON value; null becomes the empty string
pub fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => (if *b { "1" } else { "" }).to_string(),
        other => other.to_string(),
    }
}

/// A field as it participates in lead capture for one submitted form.
///
/// For a satellite form `definition` is the referenced master field (its name,
/// type, format, choices and sorting are what gets stored), while `post_name`
/// and `field_id` come from the satellite field that actually received input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadField {
    pub definition: FieldDefinition,
    pub field_id: i32,
    pub master_id: i32,
    pub post_name: String,
}

impl LeadField {
    pub fn own(definition: FieldDefinition) -> Self {
        Self {
            field_id: definition.id,
            master_id: definition.id,
            post_name: definition.name.clone(),
            definition,
        }
    }

    pub fn satellite(satellite: &FieldDefinition, master: FieldDefinition) -> Self {
        Self {
            field_id: satellite.id,
            master_id: master.id,
            post_name: satellite.name.clone(),
            definition: master,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_choices_skips_groups() {
        let options = json!([
            {"value": "a", "label": "Alpha"},
            {"group": true, "label": "Group"},
            {"value": 2, "label": "Two"}
        ]);
        let choices = parse_choices(&options);
        assert_eq!(choices.len(), 2);
        assert_eq!(choices[1].value, "2");
        assert_eq!(choices[1].label, "Two");
    }

    #[test]
    fn test_form_master_falls_back_to_self() {
        let form = FormDefinition::from(forms::Model {
            id: 4,
            title: "Contact".to_string(),
            lead_enabled: true,
            lead_master: Some(0),
            lead_menu_label: None,
        });
        assert_eq!(form.master_id(), 4);
        assert!(!form.is_satellite());
        assert_eq!(form.menu_label, "Contact");
    }

    #[test]
    fn test_rgxp_parse() {
        assert_eq!(Rgxp::parse("datim"), Some(Rgxp::Datim));
        assert_eq!(Rgxp::parse("email"), None);
    }
}
