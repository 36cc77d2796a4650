pub mod actor;
pub mod catalog_entry;
pub mod error;
pub mod import_report;
pub mod search;
pub mod workflow;

// CSV record model
pub mod csv;
