use serde::{Deserialize, Serialize};

use crate::domain::csv::columns;

/// Public browse/search parameters. Blank values are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free text matched against names, descriptions and inscriptions
    pub text: Option<String>,
    pub region: Option<String>,
    pub county: Option<String>,
    pub object_type: Option<String>,
    pub material: Option<String>,
}

impl SearchQuery {
    /// Build from raw query-string values, keyed by the catalog column names
    /// (`q` for the free text).
    pub fn from_params<'a>(params: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut query = SearchQuery::default();
        for (key, value) in params {
            let value = non_blank(value);
            match key {
                "q" => query.text = value,
                columns::REGION => query.region = value,
                columns::COUNTY => query.county = value,
                columns::OBJECT_TYPE => query.object_type = value,
                columns::MATERIAL => query.material = value,
                _ => {}
            }
        }
        query
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.region.is_none()
            && self.county.is_none()
            && self.object_type.is_none()
            && self.material.is_none()
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Distinct values offered by the browse filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub regions: Vec<String>,
    pub counties: Vec<String>,
    pub object_types: Vec<String>,
    pub materials: Vec<String>,
}
