#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Dynamic query engine: wire-level filter, sort and aggregation requests
//! compiled against runtime entity metadata.
//!
//! - [`PredicateCompiler`] turns a [`FilterRequest`] into a backend-neutral
//!   [`predicate::Predicate`], evaluated in memory or pushed to `SeaORM`.
//! - [`compile_sort`] resolves a [`SortSpec`] to a key selector.
//! - [`AggregationDispatcher`] routes aggregates to collection, deferred or
//!   remote backends.

pub mod aggregate;
pub mod coerce;
pub mod config;
pub mod error;
pub mod predicate;
pub mod schema;
pub mod sort;
pub mod value;
pub mod wire;

#[cfg(feature = "sea-orm")]
pub mod orm;

pub use aggregate::{
    AggregationDispatcher, AsyncQueryProvider, BackendVariant, ExecutionMode, QueryHandle,
};
pub use config::{ConfigError, FilterLimits, QueryEngineConfig};
pub use error::{ErrorCategory, QueryError, QueryResult};
pub use predicate::{Filter, PredicateCompiler, compile_filter};
pub use schema::{Entity, EntityDescriptor, EntitySchema, FieldDescriptor, FieldKind};
pub use sort::{SortSelector, compile_sort, order_by, sort_rows};
pub use value::Value;
pub use wire::{
    AggregationCriterion, AggregationKind, AggregationResult, FilterCriterion, FilterOperator,
    FilterRequest, MergeMode, SortDirection, SortSpec,
};
