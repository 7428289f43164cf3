//! Sort specification → key selector.
//!
//! Unlike filtering, sorting is best-effort: an empty or unresolved path
//! compiles to `None` and the sequence helpers leave their input untouched.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;

use crate::schema::{Entity, EntitySchema, FieldDescriptor};
use crate::value::Value;
use crate::wire::{SortDirection, SortSpec};

/// Resolved sort key, independent of the row type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub field: FieldDescriptor,
    pub direction: SortDirection,
}

impl SortKey {
    /// Compare two key values. Nulls sort first ascending and last descending.
    #[must_use]
    pub fn compare_values(&self, a: &Value, b: &Value) -> Ordering {
        let ord = match (a.is_null(), b.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.field.kind.order(a, b).unwrap_or(Ordering::Equal),
        };
        match self.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

/// Resolve a sort spec against any schema.
#[must_use]
pub fn compile_sort_key<S>(schema: &S, spec: &SortSpec) -> Option<SortKey>
where
    S: EntitySchema + ?Sized,
{
    if spec.sort_by.trim().is_empty() {
        return None;
    }
    let Some(field) = schema.resolve(&spec.sort_by) else {
        tracing::warn!(
            entity = schema.schema_name(),
            sort_by = %spec.sort_by,
            "unresolved sort path, leaving order unchanged"
        );
        return None;
    };
    Some(SortKey {
        field,
        direction: spec.direction,
    })
}

/// Key selector plus direction-aware comparator for rows of `E`.
pub struct SortSelector<E> {
    key: SortKey,
    _entity: PhantomData<fn(&E)>,
}

impl<E> Clone for SortSelector<E> {
    fn clone(&self) -> Self {
        Self::new(self.key)
    }
}

impl<E> fmt::Debug for SortSelector<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortSelector")
            .field("field", &self.key.field.name)
            .field("direction", &self.key.direction)
            .finish()
    }
}

impl<E> SortSelector<E> {
    #[must_use]
    pub fn new(key: SortKey) -> Self {
        Self {
            key,
            _entity: PhantomData,
        }
    }

    #[must_use]
    pub fn sort_key(&self) -> &SortKey {
        &self.key
    }

    #[must_use]
    pub fn direction(&self) -> SortDirection {
        self.key.direction
    }
}

impl<E: Entity> SortSelector<E> {
    #[must_use]
    pub fn key(&self, row: &E) -> Value {
        row.value_of(self.key.field.name)
    }

    #[must_use]
    pub fn compare(&self, a: &E, b: &E) -> Ordering {
        self.key.compare_values(&self.key(a), &self.key(b))
    }
}

/// Compile a sort spec against `E`'s descriptor.
#[must_use]
pub fn compile_sort<E: Entity>(spec: &SortSpec) -> Option<SortSelector<E>> {
    compile_sort_key(E::descriptor(), spec).map(SortSelector::new)
}

/// Stable in-place sort. Unresolved specs leave `rows` unchanged.
pub fn sort_rows<E: Entity>(rows: &mut [E], spec: &SortSpec) {
    if let Some(selector) = compile_sort::<E>(spec) {
        rows.sort_by(|a, b| selector.compare(a, b));
    }
}

/// Collect `rows` in the requested order, or in input order when unresolved.
#[must_use]
pub fn order_by<E, I>(rows: I, spec: &SortSpec) -> Vec<I::Item>
where
    E: Entity,
    I: IntoIterator,
    I::Item: Borrow<E>,
{
    let mut out: Vec<I::Item> = rows.into_iter().collect();
    if let Some(selector) = compile_sort::<E>(spec) {
        // Extract keys once per row.
        let mut keyed: Vec<(Value, I::Item)> = out
            .into_iter()
            .map(|row| (selector.key(row.borrow()), row))
            .collect();
        keyed.sort_by(|(a, _), (b, _)| selector.sort_key().compare_values(a, b));
        out = keyed.into_iter().map(|(_, row)| row).collect();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EntityDescriptor, FieldKind};

    struct Task {
        title: Option<&'static str>,
        priority: &'static str,
    }

    static TASK: EntityDescriptor = EntityDescriptor::new(
        "Task",
        &[
            FieldDescriptor::nullable("Title", FieldKind::String),
            FieldDescriptor::new("Priority", FieldKind::Enum(&["Low", "Normal", "Urgent"])),
        ],
    );

    impl Entity for Task {
        fn descriptor() -> &'static EntityDescriptor {
            &TASK
        }

        fn value_of(&self, field: &str) -> Value {
            match field {
                "Title" => self.title.into(),
                "Priority" => self.priority.into(),
                _ => Value::Null,
            }
        }
    }

    fn tasks() -> Vec<Task> {
        vec![
            Task {
                title: Some("b"),
                priority: "Urgent",
            },
            Task {
                title: None,
                priority: "Low",
            },
            Task {
                title: Some("a"),
                priority: "Normal",
            },
        ]
    }

    #[test]
    fn nulls_first_ascending() {
        let sorted = order_by::<Task, _>(tasks(), &SortSpec::new("title", SortDirection::Asc));
        let titles: Vec<_> = sorted.iter().map(|t| t.title).collect();
        assert_eq!(titles, vec![None, Some("a"), Some("b")]);
    }

    #[test]
    fn enum_sorts_by_declaration() {
        let mut rows = tasks();
        sort_rows(&mut rows, &SortSpec::new("Priority", SortDirection::Desc));
        let p: Vec<_> = rows.iter().map(|t| t.priority).collect();
        assert_eq!(p, vec!["Urgent", "Normal", "Low"]);
    }

    #[test]
    fn unresolved_path_keeps_input_order() {
        let rows = order_by::<Task, _>(tasks(), &SortSpec::new("missing", SortDirection::Asc));
        let titles: Vec<_> = rows.iter().map(|t| t.title).collect();
        assert_eq!(titles, vec![Some("b"), None, Some("a")]);
        assert!(compile_sort::<Task>(&SortSpec::default()).is_none());
    }
}
