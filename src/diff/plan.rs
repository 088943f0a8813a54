//! Validation of a comparison config against two schemas

use log::warn;

use crate::config::{ColumnPolicy, CompareConfig, MAX_DECIMAL_PLACES};
use crate::error::ConfigurationError;
use crate::model::{Dataset, Side};
use crate::normalize::Normalizer;

use super::schema_diff::{SchemaDiff, SchemaMismatch};

/// A column present on both sides, with its resolved normalizer
#[derive(Debug, Clone)]
pub struct ColumnPlan {
    pub name: String,
    pub source_index: usize,
    pub target_index: usize,
    pub normalizer: Normalizer,
}

impl ColumnPlan {
    /// Cell index of this column on the given side
    pub fn index(&self, side: Side) -> usize {
        match side {
            Side::Source => self.source_index,
            Side::Target => self.target_index,
        }
    }

    pub fn policy(&self) -> &ColumnPolicy {
        self.normalizer.policy()
    }
}

/// Everything `compare` needs once the config has been checked
#[derive(Debug, Clone)]
pub struct ComparisonPlan {
    pub key_columns: Vec<ColumnPlan>,
    pub compared_columns: Vec<ColumnPlan>,
    pub schema_mismatches: Vec<SchemaMismatch>,
}

impl ComparisonPlan {
    /// Validate the config against both schemas and resolve per-column rules
    pub fn resolve(
        source: &Dataset,
        target: &Dataset,
        config: &CompareConfig,
    ) -> Result<Self, ConfigurationError> {
        if config.primary_key.is_empty() {
            return Err(ConfigurationError::EmptyPrimaryKey);
        }

        for (i, key) in config.primary_key.iter().enumerate() {
            if config.primary_key[..i].contains(key) {
                return Err(ConfigurationError::DuplicateKeyColumn(key.clone()));
            }
            if config.is_ignored(key) {
                return Err(ConfigurationError::KeyColumnIgnored(key.clone()));
            }
        }

        validate_tolerances(config)?;

        for column in config.column_policies.keys() {
            if source.column(column).is_none() && target.column(column).is_none() {
                return Err(ConfigurationError::UnknownPolicyColumn(column.clone()));
            }
        }

        for column in &config.ignore_columns {
            if source.column(column).is_none() && target.column(column).is_none() {
                warn!("Ignored column '{}' exists in neither dataset", column);
            }
        }

        let key_columns = config
            .primary_key
            .iter()
            .map(|name| {
                resolve_column(name, source, target, config).ok_or_else(|| {
                    let side = if source.column(name).is_none() {
                        Side::Source
                    } else {
                        Side::Target
                    };
                    ConfigurationError::KeyColumnMissing {
                        column: name.clone(),
                        side,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let compared_columns: Vec<ColumnPlan> = source
            .columns
            .iter()
            .filter(|c| !config.primary_key.contains(&c.name) && !config.is_ignored(&c.name))
            .filter_map(|c| resolve_column(&c.name, source, target, config))
            .collect();

        if compared_columns.is_empty() {
            return Err(ConfigurationError::NoComparableColumns);
        }

        let schema_mismatches = SchemaDiff::compare(source, target, &config.ignore_columns);

        Ok(Self {
            key_columns,
            compared_columns,
            schema_mismatches,
        })
    }

    pub fn key_names(&self) -> Vec<String> {
        self.key_columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn compared_names(&self) -> Vec<String> {
        self.compared_columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// Resolve a column present on both sides; the effective type is the widened pair
fn resolve_column(
    name: &str,
    source: &Dataset,
    target: &Dataset,
    config: &CompareConfig,
) -> Option<ColumnPlan> {
    let src = source.column(name)?;
    let tgt = target.column(name)?;
    let column_type = src.column_type.widen(tgt.column_type);
    let policy = config.policy_for(name, column_type).clone();

    Some(ColumnPlan {
        name: name.to_string(),
        source_index: src.index,
        target_index: tgt.index,
        normalizer: Normalizer::new(column_type, policy),
    })
}

fn validate_tolerances(config: &CompareConfig) -> Result<(), ConfigurationError> {
    let scoped = std::iter::once(("default policy".to_string(), &config.default_policy))
        .chain(
            config
                .type_policies
                .iter()
                .map(|(t, p)| (format!("type {}", t), p)),
        )
        .chain(
            config
                .column_policies
                .iter()
                .map(|(c, p)| (format!("column '{}'", c), p)),
        );

    for (scope, policy) in scoped {
        if let Some(places) = policy.decimal_places.filter(|p| *p > MAX_DECIMAL_PLACES) {
            return Err(ConfigurationError::InvalidDecimalPlaces {
                scope,
                value: places,
                max: MAX_DECIMAL_PLACES,
            });
        }
        for (kind, tolerance) in [
            ("absolute", policy.absolute_tolerance),
            ("relative", policy.relative_tolerance),
        ] {
            if let Some(value) = tolerance {
                if !(value.is_finite() && value >= 0.0) {
                    return Err(ConfigurationError::InvalidTolerance {
                        scope: scope.clone(),
                        kind,
                        value,
                    });
                }
            }
        }
    }
    Ok(())
}
