use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::export::legacy::LegacyCsvExporter;
use crate::export::to_csv::CsvExporter;
use crate::export::to_text::TextExporter;
use crate::export::{Exporter, LegacyExporter};

pub type LegacyFactory = fn() -> Box<dyn LegacyExporter>;

/// How an exporter type tag is dispatched
#[derive(Clone)]
pub enum ExporterBinding {
    /// Instantiate through `factory`, then call `method` on the instance
    Legacy {
        factory: LegacyFactory,
        method: String,
    },
    Direct(Arc<dyn Exporter>),
}

impl ExporterBinding {
    pub fn is_legacy(&self) -> bool {
        matches!(self, ExporterBinding::Legacy { .. })
    }
}

impl fmt::Debug for ExporterBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExporterBinding::Legacy { method, .. } => {
                f.debug_struct("Legacy").field("method", method).finish()
            }
            ExporterBinding::Direct(exporter) => f
                .debug_tuple("Direct")
                .field(&exporter.extension())
                .finish(),
        }
    }
}

/// Exporter types known to the pipeline, keyed by type tag.
///
/// Built once at startup and handed to the export service; it is not
/// modified afterwards.
#[derive(Clone, Debug, Default)]
pub struct ExporterRegistry {
    bindings: IndexMap<String, ExporterBinding>,
}

impl ExporterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in exporters
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("csv", ExporterBinding::Direct(Arc::new(CsvExporter)));
        #[cfg(feature = "xlsx")]
        registry.register(
            "xlsx",
            ExporterBinding::Direct(Arc::new(crate::export::to_xlsx::XlsxExporter)),
        );
        registry.register("text", ExporterBinding::Direct(Arc::new(TextExporter)));
        registry.register(
            "csv_legacy",
            ExporterBinding::Legacy {
                factory: LegacyCsvExporter::boxed,
                method: LegacyCsvExporter::EXPORT_METHOD.to_string(),
            },
        );
        registry
    }

    /// Register a binding, replacing any previous binding of the same tag
    pub fn register(
        &mut self,
        tag: impl Into<String>,
        binding: ExporterBinding,
    ) -> Option<ExporterBinding> {
        self.bindings.insert(tag.into(), binding)
    }

    pub fn get(&self, tag: &str) -> Option<&ExporterBinding> {
        self.bindings.get(tag)
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }
}
