//! Engine configuration and request limits.
//!
//! Loading is lenient: a missing `query_engine` section yields defaults, while
//! a present but malformed section is an error.

use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};
use crate::wire::FilterRequest;

/// Name of the configuration section read by [`QueryEngineConfig::from_figment`].
pub const CONFIG_SECTION: &str = "query_engine";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid config in section '{section}': {source}")]
    InvalidConfig {
        section: String,
        #[source]
        source: Box<figment::Error>,
    },
}

/// Safety caps applied while compiling filter requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterLimits {
    /// Maximum number of criteria in one request (default: 64)
    pub max_criteria: usize,
    /// Maximum number of operands in an `In`/`NotIn` list (default: 1000)
    pub max_in_values: usize,
}

impl Default for FilterLimits {
    fn default() -> Self {
        Self {
            max_criteria: 64,
            max_in_values: 1000,
        }
    }
}

impl FilterLimits {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_criteria(mut self, max: usize) -> Self {
        self.max_criteria = max;
        self
    }

    #[must_use]
    pub fn with_max_in_values(mut self, max: usize) -> Self {
        self.max_in_values = max;
        self
    }

    /// Validate the number of criteria in a request.
    ///
    /// # Errors
    /// Returns `QueryError::TooManyCriteria` when the request exceeds `max_criteria`.
    pub fn validate_request(&self, request: &FilterRequest) -> QueryResult<()> {
        let count = request.criterias.len();
        if count > self.max_criteria {
            return Err(QueryError::TooManyCriteria {
                count,
                max: self.max_criteria,
            });
        }
        Ok(())
    }

    /// Validate the operand count of a membership list.
    ///
    /// # Errors
    /// Returns `QueryError::TooManyValues` when the list exceeds `max_in_values`.
    pub fn validate_in_values(&self, field: &str, count: usize) -> QueryResult<()> {
        if count > self.max_in_values {
            return Err(QueryError::TooManyValues {
                field: field.to_owned(),
                count,
                max: self.max_in_values,
            });
        }
        Ok(())
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryEngineConfig {
    pub limits: FilterLimits,
}

impl QueryEngineConfig {
    /// Load the `query_engine` section, falling back to defaults when it is absent.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidConfig` if the section exists but cannot be deserialized.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        if !figment.contains(CONFIG_SECTION) {
            tracing::debug!(
                section = CONFIG_SECTION,
                "config section absent, using defaults"
            );
            return Ok(Self::default());
        }

        figment
            .extract_inner::<Self>(CONFIG_SECTION)
            .map_err(|e| ConfigError::InvalidConfig {
                section: CONFIG_SECTION.to_owned(),
                source: Box::new(e),
            })
    }
}
