use csv::WriterBuilder;

use crate::errors::{LeadsError, Result};
use crate::export::{artifact_filename, ExportArtifact, ExportConfiguration, ExportTable, Exporter};

pub struct CsvExporter;

impl Exporter for CsvExporter {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn content_type(&self) -> &'static str {
        "text/csv"
    }

    fn export(&self, config: &ExportConfiguration, table: &ExportTable) -> Result<ExportArtifact> {
        Ok(ExportArtifact {
            filename: artifact_filename(config, self.extension()),
            content_type: self.content_type().to_string(),
            bytes: render(table, config.header_fields, b',')?,
        })
    }
}

pub(crate) fn render(table: &ExportTable, header: bool, delimiter: u8) -> Result<Vec<u8>> {
    let mut wtr = WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(vec![]);

    if header && !table.headers.is_empty() {
        wtr.write_record(&table.headers)?;
    }

    for row in &table.rows {
        wtr.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
    }

    wtr.into_inner()
        .map_err(|e| LeadsError::Export(e.to_string()))
}
