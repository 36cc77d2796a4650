pub mod use_cases;

pub use use_cases::catalog_import::{BulkImporter, PhotoUpload};
pub use use_cases::submission_workflow::{EntryDetails, EntryEdit, SubmissionWorkflow};
