//! Export pipeline building blocks
//!
//! The pipeline itself lives in [`crate::services::ExportService`]; this module
//! holds the configuration model, row compilation, token rendering and the
//! exporters that serialize an [`ExportTable`] into an [`ExportArtifact`].

pub mod config;
pub mod legacy;
pub mod registry;
pub mod row;
pub mod system_columns;
pub mod to_csv;
pub mod to_text;
#[cfg(feature = "xlsx")]
pub mod to_xlsx;
pub mod tokens;

pub use config::{ColumnFormat, ColumnSpec, DisplayMode, ExportConfiguration, ExportMode, FieldRef};
pub use registry::{ExporterBinding, ExporterRegistry, LegacyFactory};
pub use tokens::{HandlebarsRenderer, TokenRenderer};

use chrono::Utc;
use serde::Serialize;

use crate::errors::Result;

/// One output cell; `None` is an absent value
pub type Cell = Option<String>;

/// Compiled rows handed to an exporter. In token mode every row holds a
/// single cell with the rendered template.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// An exporter registered with a direct binding
pub trait Exporter: Send + Sync {
    fn extension(&self) -> &'static str;

    fn content_type(&self) -> &'static str;

    /// Serialize the table. The header row is only written when the
    /// configuration asks for it.
    fn export(&self, config: &ExportConfiguration, table: &ExportTable) -> Result<ExportArtifact>;
}

/// Exporter in the legacy shape: a fresh instance per export, addressed by
/// method name. Returning `None` means the exporter produced nothing.
pub trait LegacyExporter {
    fn call(
        &mut self,
        method: &str,
        config: &ExportConfiguration,
        table: &ExportTable,
    ) -> Result<Option<ExportArtifact>>;
}

/// Configured filename with the exporter's extension, or a generated one
pub fn artifact_filename(config: &ExportConfiguration, extension: &str) -> String {
    match config.filename.as_deref() {
        Some(name) if name.ends_with(&format!(".{}", extension)) => name.to_string(),
        Some(name) => format!("{}.{}", name, extension),
        None => format!(
            "export_{}_{}.{}",
            config.id,
            Utc::now().format("%Y%m%d%H%M%S"),
            extension
        ),
    }
}
