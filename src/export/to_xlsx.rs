use rust_xlsxwriter::*;

use crate::errors::Result;
use crate::export::{artifact_filename, ExportArtifact, ExportConfiguration, ExportTable, Exporter};

pub struct XlsxExporter;

impl Exporter for XlsxExporter {
    fn extension(&self) -> &'static str {
        "xlsx"
    }

    fn content_type(&self) -> &'static str {
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    }

    fn export(&self, config: &ExportConfiguration, table: &ExportTable) -> Result<ExportArtifact> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name(&config.name))?;

        let mut row_idx: u32 = 0;
        if config.header_fields && !table.headers.is_empty() {
            let bold = Format::new().set_bold();
            for (col_idx, header) in table.headers.iter().enumerate() {
                worksheet.write_string_with_format(row_idx, col_idx as u16, header, &bold)?;
            }
            row_idx += 1;
        }

        for row in &table.rows {
            for (col_idx, cell) in row.iter().enumerate() {
                let Some(value) = cell else {
                    continue;
                };
                if let Some(num) = numeric_cell(value) {
                    worksheet.write_number(row_idx, col_idx as u16, num)?;
                } else {
                    worksheet.write_string(row_idx, col_idx as u16, value)?;
                }
            }
            row_idx += 1;
        }

        tracing::debug!("Wrote {} rows to sheet", row_idx);

        Ok(ExportArtifact {
            filename: artifact_filename(config, self.extension()),
            content_type: self.content_type().to_string(),
            bytes: workbook.save_to_buffer()?,
        })
    }
}

/// Canonical integers become numbers. Anything else (leading zeros, signs
/// other than `-`, decimals, `NaN`) stays text so zip codes and phone numbers
/// keep their form.
fn numeric_cell(value: &str) -> Option<f64> {
    let digits = value.strip_prefix('-').unwrap_or(value);
    let canonical = match digits.as_bytes() {
        [b'0'] => !value.starts_with('-'),
        [b'1'..=b'9', rest @ ..] => rest.len() < 15 && rest.iter().all(u8::is_ascii_digit),
        _ => false,
    };
    if !canonical {
        return None;
    }
    value.parse::<i64>().ok().map(|n| n as f64)
}

/// Worksheet names are limited to 31 characters and a restricted charset
fn sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            c => c,
        })
        .take(31)
        .collect();

    let trimmed = cleaned.trim_matches('\'').trim();
    if trimmed.is_empty() {
        "Leads".to_string()
    } else {
        trimmed.to_string()
    }
}
