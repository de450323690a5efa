use handlebars::Handlebars;
use serde_json::{Map, Value};

use crate::config::DateFormats;
use crate::errors::Result;
use crate::export::config::ColumnFormat;
use crate::export::row::{transform_value, LeadRecord};
use crate::form::{scalar_to_string, FieldDefinition};

/// Renders a token template against a name to value mapping
pub trait TokenRenderer: Send + Sync {
    fn render(&self, template: &str, tokens: &Map<String, Value>) -> Result<String>;
}

pub struct HandlebarsRenderer {
    handlebars: Handlebars<'static>,
}

impl HandlebarsRenderer {
    pub fn new() -> Self {
        Self {
            handlebars: crate::common::get_handlebars(),
        }
    }
}

impl Default for HandlebarsRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenRenderer for HandlebarsRenderer {
    fn render(&self, template: &str, tokens: &Map<String, Value>) -> Result<String> {
        Ok(self.handlebars.render_template(template, tokens)?)
    }
}

/// A master field exposed to a token template
#[derive(Debug, Clone, Copy)]
pub struct TokenField<'a> {
    pub field: &'a FieldDefinition,
    pub format: ColumnFormat,
}

/// Build the token mapping of one lead.
///
/// Each field maps its name to the stored value run through the field's
/// format (empty when the lead has no data for it). Multi-choice values
/// additionally set `<name>_<choice>` to 1 for every selected choice.
pub fn build_tokens(
    record: &LeadRecord,
    fields: &[TokenField<'_>],
    formats: &DateFormats,
) -> Map<String, Value> {
    let mut tokens = Map::new();

    for TokenField { field, format } in fields {
        let Some(data) = record.field(field.id) else {
            tokens.insert(field.name.clone(), Value::String(String::new()));
            continue;
        };

        if let Value::Array(items) = &data.value {
            for item in items {
                tokens.insert(
                    format!("{}_{}", field.name, scalar_to_string(item)),
                    Value::from(1),
                );
            }
        }
        tokens.insert(
            field.name.clone(),
            transform_value(&data.value, *format, formats),
        );
    }

    tokens
}
