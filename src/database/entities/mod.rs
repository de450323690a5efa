pub mod files;
pub mod form_fields;
pub mod forms;
pub mod lead_data;
pub mod lead_exports;
pub mod leads;
pub mod members;
