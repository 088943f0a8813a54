//! Column header normalization

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::model::Dataset;

/// Rewrites column names so both datasets share one naming scheme
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderNormalizer {
    /// Trim, lowercase and replace spaces and dashes with underscores
    pub generalize: bool,
    /// Explicit renames, applied after generalization
    pub rename: IndexMap<String, String>,
}

impl HeaderNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_generalize(mut self, generalize: bool) -> Self {
        self.generalize = generalize;
        self
    }

    pub fn with_rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.rename.insert(from.into(), to.into());
        self
    }

    /// Whether applying this normalizer can change anything
    pub fn is_identity(&self) -> bool {
        !self.generalize && self.rename.is_empty()
    }

    /// Normalize one column name
    pub fn normalize_name(&self, name: &str) -> String {
        let name = if self.generalize {
            generalize_column_name(name)
        } else {
            name.to_string()
        };
        self.rename.get(&name).cloned().unwrap_or(name)
    }

    /// Rename the dataset's columns in place
    pub fn apply(&self, dataset: &mut Dataset) {
        if self.is_identity() {
            return;
        }
        for index in 0..dataset.column_count() {
            let old = dataset.columns[index].name.clone();
            let new = self.normalize_name(&old);
            if new != old {
                debug!("Renaming column '{}' to '{}'", old, new);
                dataset.rename_column(index, new);
            }
        }
    }
}

/// Trim, lowercase and replace spaces and dashes with underscores
pub fn generalize_column_name(name: &str) -> String {
    name.trim().to_lowercase().replace([' ', '-'], "_")
}
