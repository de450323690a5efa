use handlebars::{handlebars_helper, Handlebars};
use serde_json::Value;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

pub fn write_bytes_to_file(filename: &Path, content: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = filename.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(filename)?;
    file.write_all(content)?;
    Ok(())
}

/// Handlebars instance for token templates. Output goes into CSV and text
/// files, so nothing is HTML-escaped.
pub fn get_handlebars() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars_helper!(exists: |v: Value| !v.is_null());
    handlebars.register_helper("exists", Box::new(exists));

    handlebars_helper!(isnull: |v: Value| v.is_null());
    handlebars.register_helper("isnull", Box::new(isnull));

    handlebars_helper!(stringeq: |s1: String, s2: String| s1.eq(&s2));
    handlebars.register_helper("stringeq", Box::new(stringeq));

    handlebars
}
