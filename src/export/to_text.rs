use crate::errors::Result;
use crate::export::{artifact_filename, ExportArtifact, ExportConfiguration, ExportTable, Exporter};

/// Plain text output, one line per row with tab separated cells. Mostly
/// useful for token exports, where each row is a rendered template.
pub struct TextExporter;

impl Exporter for TextExporter {
    fn extension(&self) -> &'static str {
        "txt"
    }

    fn content_type(&self) -> &'static str {
        "text/plain"
    }

    fn export(&self, config: &ExportConfiguration, table: &ExportTable) -> Result<ExportArtifact> {
        let mut out = String::new();

        if config.header_fields && !table.headers.is_empty() {
            out.push_str(&table.headers.join("\t"));
            out.push('\n');
        }

        for row in &table.rows {
            let line: Vec<&str> = row.iter().map(|cell| cell.as_deref().unwrap_or("")).collect();
            out.push_str(&line.join("\t"));
            out.push('\n');
        }

        Ok(ExportArtifact {
            filename: artifact_filename(config, self.extension()),
            content_type: self.content_type().to_string(),
            bytes: out.into_bytes(),
        })
    }
}
