//! Aggregate dispatch over three execution backends.
//!
//! A [`QueryHandle`] is classified into a [`BackendVariant`]; the pair
//! `(AggregationKind, BackendVariant)` selects one operation from a closed
//! table built once and shared read-only. Remote operations are awaitable
//! only, so a synchronous dispatch against a remote handle is rejected.

mod fold;
mod table;

use std::fmt;
use std::sync::LazyLock;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{QueryError, QueryResult};
use crate::schema::{Entity, EntitySchema, FieldDescriptor};
use crate::value::Value;
use crate::wire::{AggregationCriterion, AggregationKind, AggregationResult};
use table::{DispatchTable, Operation, RemoteCall};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendVariant {
    Collection,
    Deferred,
    Remote,
}

impl fmt::Display for BackendVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendVariant::Collection => "collection",
            BackendVariant::Deferred => "deferred",
            BackendVariant::Remote => "remote",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExecutionMode {
    Sync,
    Async,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExecutionMode::Sync => "sync",
            ExecutionMode::Async => "async",
        })
    }
}

/// Remote query provider exposing only awaitable aggregates.
///
/// Implementations return `Value::Null` for empty sets; failures are passed
/// through to the caller unchanged.
#[async_trait]
pub trait AsyncQueryProvider<E>: Send + Sync {
    async fn sum(&self, field: &FieldDescriptor) -> anyhow::Result<Value>;
    async fn average(&self, field: &FieldDescriptor) -> anyhow::Result<Value>;
    async fn min(&self, field: &FieldDescriptor) -> anyhow::Result<Value>;
    async fn max(&self, field: &FieldDescriptor) -> anyhow::Result<Value>;
    async fn count(&self) -> anyhow::Result<u64>;
}

/// Handle to the rows an aggregate runs against.
pub enum QueryHandle<'a, E> {
    /// Materialized rows.
    Collection(&'a [E]),
    /// Lazy pipeline, consumed by the aggregate.
    Deferred(Box<dyn Iterator<Item = E> + Send + 'a>),
    Remote(&'a dyn AsyncQueryProvider<E>),
}

impl<'a, E> QueryHandle<'a, E> {
    #[must_use]
    pub fn deferred<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = E>,
        I::IntoIter: Send + 'a,
    {
        QueryHandle::Deferred(Box::new(rows.into_iter()))
    }

    #[must_use]
    pub fn backend(&self) -> BackendVariant {
        match self {
            QueryHandle::Collection(_) => BackendVariant::Collection,
            QueryHandle::Deferred(_) => BackendVariant::Deferred,
            QueryHandle::Remote(_) => BackendVariant::Remote,
        }
    }
}

static SHARED: LazyLock<AggregationDispatcher> = LazyLock::new(AggregationDispatcher::new);

/// Resolves and invokes aggregate operations.
pub struct AggregationDispatcher {
    table: DispatchTable,
}

impl Default for AggregationDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AggregationDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregationDispatcher")
            .field("operations", &self.table.len())
            .finish()
    }
}

impl AggregationDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: table::build(),
        }
    }

    /// Process-wide dispatcher, built on first use.
    #[must_use]
    pub fn shared() -> &'static Self {
        &SHARED
    }

    /// Whether `kind` can run on `backend` in `mode`.
    #[must_use]
    pub fn supports(
        &self,
        kind: AggregationKind,
        backend: BackendVariant,
        mode: ExecutionMode,
    ) -> bool {
        match self.table.get(&(kind, backend)) {
            Some(Operation::Remote(_)) => mode == ExecutionMode::Async,
            Some(_) => true,
            None => false,
        }
    }

    fn operation(
        &self,
        kind: AggregationKind,
        backend: BackendVariant,
        mode: ExecutionMode,
    ) -> QueryResult<Operation> {
        let op = match self.table.get(&(kind, backend)).copied() {
            Some(Operation::Remote(_)) if mode == ExecutionMode::Sync => None,
            other => other,
        };
        op.ok_or(QueryError::Dispatch {
            kind,
            backend,
            mode,
        })
    }

    /// Run an aggregate synchronously.
    ///
    /// # Errors
    /// `QueryError::Dispatch` for a remote handle, field resolution errors for
    /// unknown or unsuitable fields.
    pub fn dispatch<E: Entity>(
        &self,
        handle: QueryHandle<'_, E>,
        criterion: &AggregationCriterion,
    ) -> QueryResult<AggregationResult> {
        let backend = handle.backend();
        let mode = ExecutionMode::Sync;
        let op = self.operation(criterion.kind, backend, mode)?;
        let field = resolve_target(E::descriptor(), criterion)?;
        tracing::debug!(
            kind = %criterion.kind,
            %backend,
            %mode,
            field = field.map(|f| f.name),
            "dispatching aggregation"
        );
        let value = run_local(op, handle, field.as_ref(), (criterion.kind, mode))?;
        Ok(normalize(criterion, field.as_ref(), value))
    }

    /// Run an aggregate, awaiting the provider for remote handles.
    ///
    /// # Errors
    /// `QueryError::Cancelled` if `cancel` fires first, `QueryError::Backend`
    /// for provider failures, field resolution errors as for [`Self::dispatch`].
    pub async fn dispatch_async<E: Entity>(
        &self,
        handle: QueryHandle<'_, E>,
        criterion: &AggregationCriterion,
        cancel: &CancellationToken,
    ) -> QueryResult<AggregationResult> {
        if let QueryHandle::Remote(provider) = handle {
            return self
                .dispatch_remote(E::descriptor(), provider, criterion, cancel)
                .await;
        }
        let backend = handle.backend();
        let mode = ExecutionMode::Async;
        let op = self.operation(criterion.kind, backend, mode)?;
        let field = resolve_target(E::descriptor(), criterion)?;
        tracing::debug!(
            kind = %criterion.kind,
            %backend,
            %mode,
            field = field.map(|f| f.name),
            "dispatching aggregation"
        );
        if cancel.is_cancelled() {
            return Err(QueryError::Cancelled);
        }
        let value = run_local(op, handle, field.as_ref(), (criterion.kind, mode))?;
        Ok(normalize(criterion, field.as_ref(), value))
    }

    /// Await an aggregate from a remote provider, resolving the field against
    /// `schema` instead of a row type's descriptor.
    ///
    /// # Errors
    /// As for [`Self::dispatch_async`].
    pub async fn dispatch_remote<E, S>(
        &self,
        schema: &S,
        provider: &dyn AsyncQueryProvider<E>,
        criterion: &AggregationCriterion,
        cancel: &CancellationToken,
    ) -> QueryResult<AggregationResult>
    where
        S: EntitySchema + ?Sized,
    {
        let backend = BackendVariant::Remote;
        let mode = ExecutionMode::Async;
        let Operation::Remote(call) = self.operation(criterion.kind, backend, mode)? else {
            return Err(mismatch(criterion.kind, backend, mode));
        };
        let field = resolve_target(schema, criterion)?;
        tracing::debug!(
            kind = %criterion.kind,
            %backend,
            %mode,
            field = field.map(|f| f.name),
            "dispatching aggregation"
        );

        let value = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(kind = %criterion.kind, "aggregation cancelled");
                return Err(QueryError::Cancelled);
            }
            res = run_remote(criterion.kind, call, provider, field.as_ref()) => res?,
        };
        Ok(normalize(criterion, field.as_ref(), value))
    }
}

/// Resolve the aggregated field. `Count` needs none.
fn resolve_target<S>(
    schema: &S,
    criterion: &AggregationCriterion,
) -> QueryResult<Option<FieldDescriptor>>
where
    S: EntitySchema + ?Sized,
{
    if criterion.kind == AggregationKind::Count {
        return Ok(None);
    }
    let field = schema
        .resolve(&criterion.aggregate_by)
        .ok_or_else(|| QueryError::UnknownField {
            entity: schema.schema_name().to_owned(),
            field: criterion.aggregate_by.clone(),
        })?;
    let supported = match criterion.kind {
        AggregationKind::Sum | AggregationKind::Avg => field.kind.is_numeric(),
        _ => field.kind.is_scalar(),
    };
    if !supported {
        return Err(QueryError::UnsupportedAggregation {
            field: field.name.to_owned(),
            aggregation: criterion.kind,
            kind: field.kind,
        });
    }
    Ok(Some(field))
}

/// `route` is the `(kind, mode)` the operation was looked up under.
fn run_local<E: Entity>(
    op: Operation,
    handle: QueryHandle<'_, E>,
    field: Option<&FieldDescriptor>,
    route: (AggregationKind, ExecutionMode),
) -> QueryResult<Value> {
    let (kind, mode) = route;
    let backend = handle.backend();
    match (op, field) {
        (Operation::Len, _) => match handle {
            QueryHandle::Collection(rows) => Ok(count_value(rows.len())),
            _ => Err(mismatch(kind, backend, mode)),
        },
        (Operation::Drain, _) => match handle {
            QueryHandle::Deferred(rows) => Ok(count_value(rows.count())),
            _ => Err(mismatch(kind, backend, mode)),
        },
        (Operation::Numeric(fold), Some(field)) => {
            let mut values = field_values(handle, field.name)
                .ok_or_else(|| mismatch(kind, backend, mode))?;
            Ok(fold(&mut values))
        }
        (Operation::Ordered(fold), Some(field)) => {
            let mut values = field_values(handle, field.name)
                .ok_or_else(|| mismatch(kind, backend, mode))?;
            Ok(fold(field.kind, &mut values))
        }
        _ => Err(mismatch(kind, backend, mode)),
    }
}

/// Values of `name` across the rows of an in-process handle.
fn field_values<'a, E: Entity>(
    handle: QueryHandle<'a, E>,
    name: &'static str,
) -> Option<Box<dyn Iterator<Item = Value> + 'a>> {
    match handle {
        QueryHandle::Collection(rows) => Some(Box::new(rows.iter().map(move |r| r.value_of(name)))),
        QueryHandle::Deferred(rows) => Some(Box::new(rows.map(move |r| r.value_of(name)))),
        QueryHandle::Remote(_) => None,
    }
}

async fn run_remote<E>(
    kind: AggregationKind,
    call: RemoteCall,
    provider: &dyn AsyncQueryProvider<E>,
    field: Option<&FieldDescriptor>,
) -> QueryResult<Value> {
    Ok(match (call, field) {
        (RemoteCall::Count, _) => Value::from(provider.count().await?),
        (RemoteCall::Sum, Some(f)) => provider.sum(f).await?,
        (RemoteCall::Average, Some(f)) => provider.average(f).await?,
        (RemoteCall::Min, Some(f)) => provider.min(f).await?,
        (RemoteCall::Max, Some(f)) => provider.max(f).await?,
        (_, None) => {
            return Err(mismatch(kind, BackendVariant::Remote, ExecutionMode::Async));
        }
    })
}

fn count_value(n: usize) -> Value {
    Value::from(u64::try_from(n).unwrap_or(u64::MAX))
}

/// A table entry reached a handle it was not registered for.
fn mismatch(kind: AggregationKind, backend: BackendVariant, mode: ExecutionMode) -> QueryError {
    tracing::warn!(%kind, %backend, %mode, "operation does not fit the handle");
    QueryError::Dispatch {
        kind,
        backend,
        mode,
    }
}

fn normalize(
    criterion: &AggregationCriterion,
    field: Option<&FieldDescriptor>,
    value: Value,
) -> AggregationResult {
    let result = match (criterion.kind, value) {
        (AggregationKind::Sum, Value::Null) => Value::from(0_i64),
        (_, v) => v,
    };
    AggregationResult {
        aggregated_by: field.map_or_else(|| criterion.aggregate_by.clone(), |f| f.name.to_owned()),
        kind: criterion.kind,
        result,
    }
}
