pub mod catalog_import;
mod photo_ingest;
pub mod submission_workflow;
