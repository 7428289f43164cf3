#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use common::{Person, people};
use modkit_query::aggregate::AsyncQueryProvider;
use modkit_query::{
    AggregationCriterion, AggregationDispatcher, AggregationKind, BackendVariant, ErrorCategory,
    ExecutionMode, FieldDescriptor, QueryError, QueryHandle, Value,
};
use tokio_util::sync::CancellationToken;

/// In-memory stand-in for a remote provider.
struct Remote {
    rows: Vec<Person>,
    delay: Option<Duration>,
    fail: bool,
}

impl Remote {
    fn new(rows: Vec<Person>) -> Self {
        Self {
            rows,
            delay: None,
            fail: false,
        }
    }

    async fn pause(&self) -> anyhow::Result<()> {
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        if self.fail {
            anyhow::bail!("connection reset");
        }
        Ok(())
    }

    fn numbers(&self, field: &FieldDescriptor) -> Vec<i64> {
        self.rows
            .iter()
            .filter_map(|p| match field.name {
                "Count" => Some(p.count),
                "Id" => Some(p.id),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl AsyncQueryProvider<Person> for Remote {
    async fn sum(&self, field: &FieldDescriptor) -> anyhow::Result<Value> {
        self.pause().await?;
        let n = self.numbers(field);
        Ok(if n.is_empty() { Value::Null } else { Value::from(n.iter().sum::<i64>()) })
    }

    async fn average(&self, field: &FieldDescriptor) -> anyhow::Result<Value> {
        self.pause().await?;
        let n = self.numbers(field);
        let total = n.iter().sum::<i64>();
        Ok(match i64::try_from(n.len()) {
            Ok(0) | Err(_) => Value::Null,
            Ok(len) => Value::from(BigDecimal::from(total) / BigDecimal::from(len)),
        })
    }

    async fn min(&self, field: &FieldDescriptor) -> anyhow::Result<Value> {
        self.pause().await?;
        Ok(self.numbers(field).into_iter().min().into())
    }

    async fn max(&self, field: &FieldDescriptor) -> anyhow::Result<Value> {
        self.pause().await?;
        Ok(self.numbers(field).into_iter().max().into())
    }

    async fn count(&self) -> anyhow::Result<u64> {
        self.pause().await?;
        Ok(u64::try_from(self.rows.len())?)
    }
}

#[tokio::test]
async fn count_is_identical_across_backends() {
    let rows = people();
    let remote = Remote::new(people());
    let d = AggregationDispatcher::shared();
    let count = AggregationCriterion::count();
    let cancel = CancellationToken::new();

    let collection = d.dispatch(QueryHandle::Collection(&rows), &count).unwrap();
    let deferred = d.dispatch(QueryHandle::deferred(people()), &count).unwrap();
    let remote = d
        .dispatch_async(QueryHandle::<Person>::Remote(&remote), &count, &cancel)
        .await
        .unwrap();

    assert_eq!(collection.result, Value::from(5_i64));
    assert_eq!(collection, deferred);
    assert_eq!(collection, remote);
    assert_eq!(remote.kind, AggregationKind::Count);
}

#[tokio::test]
async fn numeric_folds_agree_across_backends() {
    let rows = people();
    let remote = Remote::new(people());
    let d = AggregationDispatcher::shared();
    let cancel = CancellationToken::new();

    for kind in [
        AggregationKind::Sum,
        AggregationKind::Avg,
        AggregationKind::Min,
        AggregationKind::Max,
    ] {
        let c = AggregationCriterion::new("count", kind);
        let local = d.dispatch(QueryHandle::Collection(&rows), &c).unwrap();
        let lazy = d
            .dispatch_async(QueryHandle::deferred(people()), &c, &cancel)
            .await
            .unwrap();
        let far = d
            .dispatch_async(QueryHandle::<Person>::Remote(&remote), &c, &cancel)
            .await
            .unwrap();
        assert_eq!(local, lazy, "{kind}");
        assert_eq!(local, far, "{kind}");
        assert_eq!(local.aggregated_by, "Count");
    }
}

#[test]
fn fixture_sum_and_average() {
    let rows = people();
    let d = AggregationDispatcher::shared();
    let sum = d
        .dispatch(
            QueryHandle::Collection(&rows),
            &AggregationCriterion::new("Count", AggregationKind::Sum),
        )
        .unwrap();
    assert_eq!(sum.result, Value::from(1201_i64));
    let avg = d
        .dispatch(
            QueryHandle::Collection(&rows),
            &AggregationCriterion::new("Count", AggregationKind::Avg),
        )
        .unwrap();
    assert_eq!(avg.result, Value::from(240.2_f64));
}

#[test]
fn min_max_work_on_strings_and_enums() {
    let rows = people();
    let d = AggregationDispatcher::shared();
    let min_name = d
        .dispatch(
            QueryHandle::Collection(&rows),
            &AggregationCriterion::new("Name", AggregationKind::Min),
        )
        .unwrap();
    assert_eq!(min_name.result, Value::from("Elise"));
    let max_status = d
        .dispatch(
            QueryHandle::Collection(&rows),
            &AggregationCriterion::new("Status", AggregationKind::Max),
        )
        .unwrap();
    assert_eq!(max_status.result, Value::from("Archived"));
}

#[test]
fn sync_dispatch_against_remote_names_the_backend() {
    let remote = Remote::new(people());
    let err = AggregationDispatcher::shared()
        .dispatch(QueryHandle::<Person>::Remote(&remote), &AggregationCriterion::count())
        .unwrap_err();
    assert!(matches!(
        err,
        QueryError::Dispatch {
            backend: BackendVariant::Remote,
            mode: ExecutionMode::Sync,
            ..
        }
    ));
    assert_eq!(err.category(), ErrorCategory::Dispatch);
    assert!(err.to_string().contains("remote"));
}

#[tokio::test]
async fn cancellation_aborts_remote_await() {
    let mut remote = Remote::new(people());
    remote.delay = Some(Duration::from_secs(30));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = AggregationDispatcher::shared()
        .dispatch_async(
            QueryHandle::<Person>::Remote(&remote),
            &AggregationCriterion::count(),
            &cancel,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::Cancelled));
}

#[tokio::test]
async fn backend_failures_pass_through() {
    let mut remote = Remote::new(people());
    remote.fail = true;
    let err = AggregationDispatcher::shared()
        .dispatch_async(
            QueryHandle::<Person>::Remote(&remote),
            &AggregationCriterion::new("Count", AggregationKind::Max),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Backend);
    assert_eq!(err.to_string(), "connection reset");
}

#[tokio::test]
async fn remote_empty_sum_is_normalized_to_zero() {
    let remote = Remote::new(Vec::new());
    let result = AggregationDispatcher::shared()
        .dispatch_async(
            QueryHandle::<Person>::Remote(&remote),
            &AggregationCriterion::new("Count", AggregationKind::Sum),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(result.result, Value::from(0_i64));
}

#[test]
fn sum_over_text_is_rejected_before_running() {
    let rows = people();
    let err = AggregationDispatcher::shared()
        .dispatch(
            QueryHandle::Collection(&rows),
            &AggregationCriterion::new("Name", AggregationKind::Sum),
        )
        .unwrap_err();
    assert!(matches!(err, QueryError::UnsupportedAggregation { .. }));
    assert_eq!(err.category(), ErrorCategory::Configuration);
}
