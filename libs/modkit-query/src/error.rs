use crate::aggregate::{BackendVariant, ExecutionMode};
use crate::schema::FieldKind;
use crate::wire::{AggregationKind, FilterOperator};

/// Coarse classification of [`QueryError`] used by callers to pick a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed request or misconfigured schema.
    Configuration,
    /// A supplied value does not fit the resolved field.
    Conversion,
    /// No operation is registered for the requested aggregation/backend pair.
    Dispatch,
    Cancelled,
    /// Failure surfaced by the execution backend, passed through unchanged.
    Backend,
}

/// Unified error type for query compilation and aggregate dispatch.
///
/// Configuration, conversion and dispatch errors are raised before anything
/// touches storage and are never retried.
#[derive(thiserror::Error, Debug)]
pub enum QueryError {
    #[error("unknown field `{field}` on {entity}")]
    UnknownField { entity: String, field: String },

    #[error("operator {op} is not supported for field `{field}` of kind {kind}")]
    UnsupportedOperator {
        field: String,
        op: FilterOperator,
        kind: FieldKind,
    },

    #[error("operator {op} on field `{field}` requires {operand}")]
    MissingOperand {
        field: String,
        op: FilterOperator,
        operand: &'static str,
    },

    #[error("{aggregation} is not supported for field `{field}` of kind {kind}")]
    UnsupportedAggregation {
        field: String,
        aggregation: AggregationKind,
        kind: FieldKind,
    },

    #[error("too many filter criteria: {count} exceeds limit {max}")]
    TooManyCriteria { count: usize, max: usize },

    #[error("too many values for `{field}`: {count} exceeds limit {max}")]
    TooManyValues {
        field: String,
        count: usize,
        max: usize,
    },

    #[error("predicate on `{field}` cannot be translated: {reason}")]
    Untranslatable { field: String, reason: &'static str },

    #[error("cannot convert {value} for field `{field}`: expected {expected}")]
    Conversion {
        field: String,
        value: String,
        expected: FieldKind,
    },

    #[error("no {kind} operation registered for the {backend} backend in {mode} mode")]
    Dispatch {
        kind: AggregationKind,
        backend: BackendVariant,
        mode: ExecutionMode,
    },

    #[error("aggregation cancelled")]
    Cancelled,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl QueryError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            QueryError::UnknownField { .. }
            | QueryError::UnsupportedOperator { .. }
            | QueryError::MissingOperand { .. }
            | QueryError::UnsupportedAggregation { .. }
            | QueryError::TooManyCriteria { .. }
            | QueryError::TooManyValues { .. }
            | QueryError::Untranslatable { .. } => ErrorCategory::Configuration,
            QueryError::Conversion { .. } => ErrorCategory::Conversion,
            QueryError::Dispatch { .. } => ErrorCategory::Dispatch,
            QueryError::Cancelled => ErrorCategory::Cancelled,
            QueryError::Backend(_) => ErrorCategory::Backend,
        }
    }

    pub(crate) fn conversion(field: &str, value: &serde_json::Value, expected: FieldKind) -> Self {
        QueryError::Conversion {
            field: field.to_owned(),
            value: value.to_string(),
            expected,
        }
    }
}

pub type QueryResult<T> = Result<T, QueryError>;
