use std::collections::HashMap;

use super::BackendVariant;
use super::fold::{self, NumericFold, OrderedFold};
use crate::wire::AggregationKind;

/// Awaitable provider entry points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteCall {
    Sum,
    Average,
    Min,
    Max,
    Count,
}

/// Operation shapes registered per `(kind, backend)` pair.
#[derive(Clone, Copy)]
pub enum Operation {
    /// Length of a materialized collection.
    Len,
    /// Drain a lazy pipeline and count its items.
    Drain,
    /// Sum/Avg over numeric field values.
    Numeric(NumericFold),
    /// Min/Max over ordered field values.
    Ordered(OrderedFold),
    /// Only reachable through an await.
    Remote(RemoteCall),
}

pub type DispatchTable = HashMap<(AggregationKind, BackendVariant), Operation>;

pub fn build() -> DispatchTable {
    use AggregationKind as K;
    use BackendVariant as B;

    let mut table = DispatchTable::new();
    for backend in [B::Collection, B::Deferred] {
        table.insert((K::Sum, backend), Operation::Numeric(fold::sum));
        table.insert((K::Avg, backend), Operation::Numeric(fold::average));
        table.insert((K::Min, backend), Operation::Ordered(fold::min));
        table.insert((K::Max, backend), Operation::Ordered(fold::max));
    }
    table.insert((K::Count, B::Collection), Operation::Len);
    table.insert((K::Count, B::Deferred), Operation::Drain);

    table.insert((K::Sum, B::Remote), Operation::Remote(RemoteCall::Sum));
    table.insert((K::Avg, B::Remote), Operation::Remote(RemoteCall::Average));
    table.insert((K::Min, B::Remote), Operation::Remote(RemoteCall::Min));
    table.insert((K::Max, B::Remote), Operation::Remote(RemoteCall::Max));
    table.insert((K::Count, B::Remote), Operation::Remote(RemoteCall::Count));
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_pair_is_registered() {
        let table = build();
        for kind in AggregationKind::ALL {
            for backend in [
                BackendVariant::Collection,
                BackendVariant::Deferred,
                BackendVariant::Remote,
            ] {
                assert!(table.contains_key(&(*kind, backend)), "{kind} on {backend}");
            }
        }
        assert_eq!(table.len(), 15);
    }

    #[test]
    fn remote_entries_are_awaitable_only() {
        let table = build();
        assert!(matches!(
            table.get(&(AggregationKind::Count, BackendVariant::Remote)),
            Some(Operation::Remote(RemoteCall::Count))
        ));
    }
}
