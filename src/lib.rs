//! Catalog of geotagged inscriptions and monuments: moderated publishing
//! workflow, public search and CSV bulk import with photos.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
