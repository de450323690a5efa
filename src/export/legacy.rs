//! Exporter in the legacy object/method shape

use crate::errors::{LeadsError, Result};
use crate::export::{artifact_filename, to_csv, ExportArtifact, ExportConfiguration, ExportTable, LegacyExporter};

/// Semicolon separated CSV, as spreadsheet tools in many locales expect it
#[derive(Debug, Default)]
pub struct LegacyCsvExporter;

impl LegacyCsvExporter {
    pub const EXPORT_METHOD: &'static str = "export_csv";

    pub fn boxed() -> Box<dyn LegacyExporter> {
        Box::new(Self)
    }
}

impl LegacyExporter for LegacyCsvExporter {
    fn call(
        &mut self,
        method: &str,
        config: &ExportConfiguration,
        table: &ExportTable,
    ) -> Result<Option<ExportArtifact>> {
        match method {
            Self::EXPORT_METHOD => Ok(Some(ExportArtifact {
                filename: artifact_filename(config, "csv"),
                content_type: "text/csv".to_string(),
                bytes: to_csv::render(table, config.header_fields, b';')?,
            })),
            other => Err(LeadsError::Export(format!(
                "legacy exporter has no method '{}'",
                other
            ))),
        }
    }
}
