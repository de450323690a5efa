pub mod export_service;
pub mod file_service;
pub mod form_service;
pub mod lead_service;
pub mod submission_service;

pub use export_service::*;
pub use file_service::*;
pub use form_service::*;
pub use lead_service::*;
pub use submission_service::*;
