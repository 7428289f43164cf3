//! Filter request → predicate tree compiler.
//!
//! Each criterion is resolved against an [`EntitySchema`], its operands are
//! coerced into the field's kind, and the operator is lowered to one primitive
//! [`Test`]. Tests are folded left to right with the request's single
//! connector; there is no nested grouping.
//!
//! The resulting [`Predicate`] is backend-neutral: it can be evaluated against
//! in-memory rows or translated to SQL by the `orm` module.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;

use chrono::{DateTime, Days, Utc};

use crate::coerce::{coerce, coerce_list, coerce_text};
use crate::config::FilterLimits;
use crate::error::{QueryError, QueryResult};
use crate::schema::{Entity, EntitySchema, FieldDescriptor, FieldKind};
use crate::value::Value;
use crate::wire::{FilterCriterion, FilterOperator, FilterRequest, MergeMode};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextOp {
    Contains,
    StartsWith,
    EndsWith,
}

/// Primitive test applied to one field value.
#[derive(Clone, Debug, PartialEq)]
pub enum Test {
    /// `Eq`/`Ne` use lifted equality: null equals null, null differs from any value.
    Compare(CompareOp, Value),
    /// Inclusive range.
    Between(Value, Value),
    /// `start <= v < end`.
    HalfOpen { start: Value, end: Value },
    /// Case-insensitive text match. Null never matches, negated or not.
    Text {
        op: TextOp,
        needle: String,
        negated: bool,
    },
    Null { negated: bool },
    /// Empty string or list. The negated form excludes null.
    Empty { negated: bool },
    /// Null, empty or made only of [`BLANK_CHARS`].
    Blank { negated: bool },
    In { values: Vec<Value>, negated: bool },
}

/// Characters a blank string may consist of. The SQL translation trims the
/// same set, so Unicode spaces such as U+00A0 are content on both sides.
pub const BLANK_CHARS: &[char] = &[' ', '\t', '\n', '\r', '\u{b}', '\u{c}'];

/// A test bound to a resolved field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldTest {
    pub field: FieldDescriptor,
    pub test: Test,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    Test(FieldTest),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    #[must_use]
    pub fn and(self, other: Predicate) -> Self {
        Predicate::And(Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn or(self, other: Predicate) -> Self {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    /// Evaluate against an in-memory row.
    #[must_use]
    pub fn evaluate<E: Entity>(&self, row: &E) -> bool {
        match self {
            Predicate::Test(t) => t.matches(&row.value_of(t.field.name)),
            Predicate::And(a, b) => a.evaluate(row) && b.evaluate(row),
            Predicate::Or(a, b) => a.evaluate(row) || b.evaluate(row),
        }
    }
}

impl FieldTest {
    /// Apply the test to an already extracted field value.
    #[must_use]
    pub fn matches(&self, v: &Value) -> bool {
        let kind = self.field.kind;
        match &self.test {
            Test::Compare(CompareOp::Eq, x) => lifted_eq(kind, v, x),
            Test::Compare(CompareOp::Ne, x) => !lifted_eq(kind, v, x),
            Test::Compare(op, x) => kind.order(v, x).is_some_and(|ord| match op {
                CompareOp::Gt => ord == Ordering::Greater,
                CompareOp::Ge => ord != Ordering::Less,
                CompareOp::Lt => ord == Ordering::Less,
                CompareOp::Le => ord != Ordering::Greater,
                CompareOp::Eq | CompareOp::Ne => false,
            }),
            Test::Between(lo, hi) => {
                kind.order(v, lo).is_some_and(|o| o != Ordering::Less)
                    && kind.order(v, hi).is_some_and(|o| o != Ordering::Greater)
            }
            Test::HalfOpen { start, end } => {
                kind.order(v, start).is_some_and(|o| o != Ordering::Less)
                    && kind.order(v, end) == Some(Ordering::Less)
            }
            Test::Text {
                op,
                needle,
                negated,
            } => {
                let Some(s) = v.as_str() else {
                    return false;
                };
                let hay = s.to_lowercase();
                let needle = needle.to_lowercase();
                let hit = match op {
                    TextOp::Contains => hay.contains(&needle),
                    TextOp::StartsWith => hay.starts_with(&needle),
                    TextOp::EndsWith => hay.ends_with(&needle),
                };
                hit != *negated
            }
            Test::Null { negated } => v.is_null() != *negated,
            Test::Empty { negated } => {
                let empty = match v {
                    Value::String(s) => Some(s.is_empty()),
                    Value::List(items) => Some(items.is_empty()),
                    _ => None,
                };
                empty.is_some_and(|e| e != *negated)
            }
            Test::Blank { negated } => {
                let blank = match v {
                    Value::Null => true,
                    Value::String(s) => s.trim_matches(BLANK_CHARS).is_empty(),
                    _ => false,
                };
                blank != *negated
            }
            Test::In { values, negated } => {
                values.iter().any(|x| lifted_eq(kind, v, x)) != *negated
            }
        }
    }
}

fn lifted_eq(kind: FieldKind, a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        _ => kind.order(a, b).map_or(a == b, |o| o == Ordering::Equal),
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Test(t) => write!(f, "{t}"),
            Predicate::And(a, b) => write!(f, "({a} AND {b})"),
            Predicate::Or(a, b) => write!(f, "({a} OR {b})"),
        }
    }
}

impl fmt::Display for FieldTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.field.name;
        let not = |negated: bool| if negated { "NOT " } else { "" };
        match &self.test {
            Test::Compare(op, v) => write!(f, "{name} {} {v}", op.as_str()),
            Test::Between(lo, hi) => write!(f, "{name} BETWEEN {lo} AND {hi}"),
            Test::HalfOpen { start, end } => write!(f, "{start} <= {name} < {end}"),
            Test::Text {
                op,
                needle,
                negated,
            } => {
                let op = match op {
                    TextOp::Contains => "CONTAINS",
                    TextOp::StartsWith => "STARTSWITH",
                    TextOp::EndsWith => "ENDSWITH",
                };
                write!(f, "{name} {}{op} '{needle}'", not(*negated))
            }
            Test::Null { negated } => write!(f, "{name} IS {}NULL", not(*negated)),
            Test::Empty { negated } => write!(f, "{name} IS {}EMPTY", not(*negated)),
            Test::Blank { negated } => write!(f, "{name} IS {}BLANK", not(*negated)),
            Test::In { values, negated } => {
                write!(f, "{name} {}IN {}", not(*negated), Value::List(values.clone()))
            }
        }
    }
}

/// Predicate bound to an entity type.
pub struct Filter<E> {
    predicate: Predicate,
    _entity: PhantomData<fn(&E)>,
}

impl<E> Clone for Filter<E> {
    fn clone(&self) -> Self {
        Self::new(self.predicate.clone())
    }
}

impl<E> fmt::Debug for Filter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Filter").field(&self.predicate).finish()
    }
}

impl<E> Filter<E> {
    #[must_use]
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicate,
            _entity: PhantomData,
        }
    }

    #[must_use]
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    #[must_use]
    pub fn into_predicate(self) -> Predicate {
        self.predicate
    }
}

impl<E: Entity> Filter<E> {
    #[must_use]
    pub fn matches(&self, row: &E) -> bool {
        self.predicate.evaluate(row)
    }

    /// Lazily keep the rows that satisfy the predicate.
    pub fn apply<I>(&self, rows: I) -> impl Iterator<Item = I::Item>
    where
        I: IntoIterator,
        I::Item: Borrow<E>,
    {
        rows.into_iter().filter(|row| self.matches(row.borrow()))
    }
}

/// Compiles [`FilterRequest`]s into [`Predicate`]s under configured limits.
#[derive(Clone, Debug, Default)]
pub struct PredicateCompiler {
    limits: FilterLimits,
}

impl PredicateCompiler {
    #[must_use]
    pub fn new(limits: FilterLimits) -> Self {
        Self { limits }
    }

    #[must_use]
    pub fn limits(&self) -> &FilterLimits {
        &self.limits
    }

    /// Compile a whole request.
    ///
    /// Returns `Ok(None)` when no criterion produced a test, meaning "no filtering".
    ///
    /// # Errors
    /// Fails on the first criterion with an unknown field, an unsupported
    /// operator for the field kind, a missing operand or a failed conversion.
    pub fn compile<S>(&self, schema: &S, request: &FilterRequest) -> QueryResult<Option<Predicate>>
    where
        S: EntitySchema + ?Sized,
    {
        self.limits.validate_request(request)?;

        let mut acc: Option<Predicate> = None;
        for criterion in &request.criterias {
            let Some(test) = self.compile_criterion(schema, criterion)? else {
                continue;
            };
            let next = Predicate::Test(test);
            acc = Some(match (acc, request.merge_type) {
                (None, _) => next,
                (Some(prev), MergeMode::And) => prev.and(next),
                (Some(prev), MergeMode::Or) => prev.or(next),
            });
        }

        match &acc {
            Some(predicate) => tracing::debug!(
                entity = schema.schema_name(),
                criteria = request.criterias.len(),
                merge = %request.merge_type,
                %predicate,
                "compiled filter request"
            ),
            None => tracing::debug!(
                entity = schema.schema_name(),
                "filter request produced no predicate"
            ),
        }
        Ok(acc)
    }

    /// Compile a request for an entity type using its static descriptor.
    ///
    /// # Errors
    /// See [`PredicateCompiler::compile`].
    pub fn compile_for<E: Entity>(
        &self,
        request: &FilterRequest,
    ) -> QueryResult<Option<Filter<E>>> {
        Ok(self.compile(E::descriptor(), request)?.map(Filter::new))
    }

    /// Lower one criterion. `Ok(None)` marks a documented no-op.
    ///
    /// # Errors
    /// See [`PredicateCompiler::compile`].
    pub fn compile_criterion<S>(
        &self,
        schema: &S,
        criterion: &FilterCriterion,
    ) -> QueryResult<Option<FieldTest>>
    where
        S: EntitySchema + ?Sized,
    {
        use FilterOperator as Op;

        let field = schema
            .resolve(&criterion.filter_by)
            .ok_or_else(|| QueryError::UnknownField {
                entity: schema.schema_name().to_owned(),
                field: criterion.filter_by.clone(),
            })?;
        let op = criterion.operator;
        let kind = field.kind;

        if kind == FieldKind::List && matches!(op, Op::Contains | Op::NotContains) {
            tracing::warn!(
                field = field.name,
                op = %op,
                "contains-style operator on a collection field is ignored"
            );
            return Ok(None);
        }

        let test = match op {
            Op::Equal | Op::NotEqual => equality(&field, op, &criterion.value)?,
            Op::Greater | Op::GreaterEqual | Op::Less | Op::LessEqual | Op::Between => {
                range(&field, criterion)?
            }
            Op::Contains | Op::NotContains | Op::StartsWith | Op::EndsWith => {
                text(&field, op, &criterion.value)?
            }
            Op::DateEqualTo => date_equal(&field, &criterion.value)?,
            Op::IsNull | Op::IsNotNull => Test::Null {
                negated: op == Op::IsNotNull,
            },
            Op::IsEmpty | Op::IsNotEmpty => {
                if !matches!(kind, FieldKind::String | FieldKind::List) {
                    return Err(unsupported(&field, op));
                }
                Test::Empty {
                    negated: op == Op::IsNotEmpty,
                }
            }
            Op::IsNullOrWhiteSpace | Op::IsNotNullNorWhiteSpace => {
                if kind != FieldKind::String {
                    return Err(unsupported(&field, op));
                }
                Test::Blank {
                    negated: op == Op::IsNotNullNorWhiteSpace,
                }
            }
            Op::In | Op::NotIn => self.membership(&field, op, &criterion.value)?,
        };

        Ok(Some(FieldTest { field, test }))
    }

    fn membership(
        &self,
        field: &FieldDescriptor,
        op: FilterOperator,
        raw: &serde_json::Value,
    ) -> QueryResult<Test> {
        if !field.kind.is_scalar() {
            return Err(unsupported(field, op));
        }
        if raw.is_null() {
            return Err(missing(field, op, "a list value"));
        }
        let values = coerce_list(field, raw)?;
        self.limits.validate_in_values(field.name, values.len())?;
        Ok(Test::In {
            values,
            negated: op == FilterOperator::NotIn,
        })
    }
}

/// Compile with default limits against `E`'s descriptor.
///
/// # Errors
/// See [`PredicateCompiler::compile`].
pub fn compile_filter<E: Entity>(request: &FilterRequest) -> QueryResult<Option<Filter<E>>> {
    PredicateCompiler::default().compile_for::<E>(request)
}

fn equality(
    field: &FieldDescriptor,
    op: FilterOperator,
    raw: &serde_json::Value,
) -> QueryResult<Test> {
    if !field.kind.is_scalar() {
        return Err(unsupported(field, op));
    }
    Ok(match (op, coerce(field, raw)?) {
        (FilterOperator::Equal, Value::DateTime(dt)) => day_interval(field, dt)?,
        (FilterOperator::Equal, v) => Test::Compare(CompareOp::Eq, v),
        (_, v) => Test::Compare(CompareOp::Ne, v),
    })
}

/// Ordered comparisons and `Between`. `LessEqual` on a timestamp widens to the
/// end of its calendar day.
fn range(field: &FieldDescriptor, criterion: &FilterCriterion) -> QueryResult<Test> {
    use FilterOperator as Op;

    let op = criterion.operator;
    if !field.kind.is_ordered() {
        return Err(unsupported(field, op));
    }
    let value = required(field, op, "value", &criterion.value)?;
    Ok(match (op, value) {
        (Op::Between, lo) => {
            let hi = required(field, op, "otherValue", &criterion.other_value)?;
            Test::Between(lo, hi)
        }
        (Op::LessEqual, Value::DateTime(dt)) => {
            Test::Compare(CompareOp::Lt, Value::DateTime(next_day_start(field, dt)?))
        }
        (Op::Greater, v) => Test::Compare(CompareOp::Gt, v),
        (Op::GreaterEqual, v) => Test::Compare(CompareOp::Ge, v),
        (Op::Less, v) => Test::Compare(CompareOp::Lt, v),
        (_, v) => Test::Compare(CompareOp::Le, v),
    })
}

fn text(field: &FieldDescriptor, op: FilterOperator, raw: &serde_json::Value) -> QueryResult<Test> {
    if field.kind != FieldKind::String {
        return Err(unsupported(field, op));
    }
    if raw.is_null() {
        return Err(missing(field, op, "value"));
    }
    let (text_op, negated) = match op {
        FilterOperator::NotContains => (TextOp::Contains, true),
        FilterOperator::StartsWith => (TextOp::StartsWith, false),
        FilterOperator::EndsWith => (TextOp::EndsWith, false),
        _ => (TextOp::Contains, false),
    };
    Ok(Test::Text {
        op: text_op,
        needle: coerce_text(field, raw)?,
        negated,
    })
}

/// Calendar-day equality. Any upper operand is ignored.
fn date_equal(field: &FieldDescriptor, raw: &serde_json::Value) -> QueryResult<Test> {
    let op = FilterOperator::DateEqualTo;
    match (field.kind, required(field, op, "value", raw)) {
        (FieldKind::DateTimeUtc, Ok(Value::DateTime(dt))) => day_interval(field, dt),
        (FieldKind::Date, Ok(v)) => Ok(Test::Compare(CompareOp::Eq, v)),
        (FieldKind::DateTimeUtc | FieldKind::Date, Err(e)) => Err(e),
        _ => Err(unsupported(field, op)),
    }
}

fn unsupported(field: &FieldDescriptor, op: FilterOperator) -> QueryError {
    QueryError::UnsupportedOperator {
        field: field.name.to_owned(),
        op,
        kind: field.kind,
    }
}

fn missing(field: &FieldDescriptor, op: FilterOperator, operand: &'static str) -> QueryError {
    QueryError::MissingOperand {
        field: field.name.to_owned(),
        op,
        operand,
    }
}

/// Coerce an operand that must be present and non-null.
fn required(
    field: &FieldDescriptor,
    op: FilterOperator,
    operand: &'static str,
    raw: &serde_json::Value,
) -> QueryResult<Value> {
    if raw.is_null() {
        return Err(missing(field, op, operand));
    }
    coerce(field, raw)
}

fn day_start(field: &FieldDescriptor, dt: DateTime<Utc>) -> QueryResult<DateTime<Utc>> {
    dt.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .ok_or_else(|| QueryError::conversion(field.name, &dt.to_rfc3339().into(), field.kind))
}

fn next_day_start(field: &FieldDescriptor, dt: DateTime<Utc>) -> QueryResult<DateTime<Utc>> {
    day_start(field, dt)?
        .checked_add_days(Days::new(1))
        .ok_or_else(|| QueryError::conversion(field.name, &dt.to_rfc3339().into(), field.kind))
}

/// `[day, day + 1)` of `dt`'s UTC calendar day.
fn day_interval(field: &FieldDescriptor, dt: DateTime<Utc>) -> QueryResult<Test> {
    Ok(Test::HalfOpen {
        start: Value::DateTime(day_start(field, dt)?),
        end: Value::DateTime(next_day_start(field, dt)?),
    })
}
