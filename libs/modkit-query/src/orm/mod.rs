//! `SeaORM` backend: filter, sort and aggregate pushed down to the database.
//!
//! ```ignore
//! let fmap = FieldMap::<user::Entity>::new()
//!     .insert("Name", user::Column::Name, FieldKind::String)
//!     .insert("Count", user::Column::Count, FieldKind::I64);
//!
//! let rows = user::Entity::find()
//!     .apply_filter_request(&request, &fmap, &PredicateCompiler::default())?
//!     .apply_sort_spec(&sort, &fmap)
//!     .all(&conn)
//!     .await?;
//! ```

mod condition;
mod field_map;
mod provider;

pub use condition::{predicate_to_condition, to_sea};
pub use field_map::{Field, FieldMap};
pub use provider::SeaOrmProvider;

use sea_orm::sea_query::{NullOrdering, Order};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Select};
use tokio_util::sync::CancellationToken;

use crate::aggregate::{AggregationDispatcher, AsyncQueryProvider};
use crate::error::QueryResult;
use crate::predicate::PredicateCompiler;
use crate::schema::FieldKind;
use crate::sort::compile_sort_key;
use crate::wire::{AggregationCriterion, AggregationResult, FilterRequest, SortDirection, SortSpec};

/// Apply wire-level filter and sort requests to a plain `SeaORM` `Select<E>`.
///
/// This extension does not evaluate anything in memory: the compiled
/// predicate is translated to a `sea_orm::Condition` and the sort key to an
/// `ORDER BY` term.
pub trait QuerySpecExt<E: EntityTrait>: Sized {
    /// Compile `request` against `fmap` and add it as a `WHERE` condition.
    ///
    /// A request that compiles to no predicate leaves the select unchanged.
    ///
    /// # Errors
    /// Any compile error, or `QueryError::Untranslatable` for tests with no SQL form.
    fn apply_filter_request(
        self,
        request: &FilterRequest,
        fmap: &FieldMap<E>,
        compiler: &PredicateCompiler,
    ) -> QueryResult<Self>;

    /// Unresolved or empty sort paths leave the select unchanged.
    #[must_use]
    fn apply_sort_spec(self, spec: &SortSpec, fmap: &FieldMap<E>) -> Self;
}

impl<E> QuerySpecExt<E> for Select<E>
where
    E: EntityTrait,
    E::Column: ColumnTrait + Copy,
{
    fn apply_filter_request(
        self,
        request: &FilterRequest,
        fmap: &FieldMap<E>,
        compiler: &PredicateCompiler,
    ) -> QueryResult<Self> {
        match compiler.compile(fmap, request)? {
            Some(predicate) => Ok(self.filter(predicate_to_condition(&predicate, fmap)?)),
            None => Ok(self),
        }
    }

    fn apply_sort_spec(self, spec: &SortSpec, fmap: &FieldMap<E>) -> Self {
        let Some(key) = compile_sort_key(fmap, spec) else {
            return self;
        };
        let Some(field) = fmap.get(key.field.name) else {
            return self;
        };
        // Nulls first ascending, last descending, as in memory.
        let (order, nulls) = match key.direction {
            SortDirection::Asc => (Order::Asc, NullOrdering::First),
            SortDirection::Desc => (Order::Desc, NullOrdering::Last),
        };
        match key.field.kind {
            FieldKind::Enum(variants) => self.order_by_with_nulls(
                condition::enum_rank(field.col, variants),
                order,
                nulls,
            ),
            _ => self.order_by_with_nulls(field.col, order, nulls),
        }
    }
}

/// Run an aggregate in the database through the shared dispatcher.
///
/// # Errors
/// Field resolution errors, `QueryError::Cancelled`, or `QueryError::Backend`
/// wrapping the database error.
pub async fn aggregate<E, C>(
    select: Select<E>,
    conn: &C,
    fmap: &FieldMap<E>,
    criterion: &AggregationCriterion,
    cancel: &CancellationToken,
) -> QueryResult<AggregationResult>
where
    E: EntityTrait,
    E::Model: Sync,
    E::Column: ColumnTrait + Copy,
    C: ConnectionTrait,
{
    let provider = SeaOrmProvider::new(select, conn, fmap);
    let provider: &dyn AsyncQueryProvider<E::Model> = &provider;
    AggregationDispatcher::shared()
        .dispatch_remote(fmap, provider, criterion, cancel)
        .await
}
