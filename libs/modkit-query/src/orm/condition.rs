//! Predicate tree → `sea_orm::Condition`.
//!
//! Translation mirrors in-memory evaluation: text tests lower both sides,
//! `NotEqual`/`NotIn` keep nulls on nullable columns, `IN ()` is false and
//! enum ranges compare declaration ranks instead of stored names.

use bigdecimal::{BigDecimal, ToPrimitive};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Alias, Expr, Func, LikeExpr, SimpleExpr};
use sea_orm::{ColumnTrait, Condition, EntityTrait};

use super::field_map::FieldMap;
use crate::error::{QueryError, QueryResult};
use crate::predicate::{BLANK_CHARS, CompareOp, FieldTest, Predicate, Test, TextOp};
use crate::schema::{EntitySchema, FieldDescriptor, FieldKind};
use crate::value::Value;

/// Convert a compiled predicate to a `SeaORM` condition.
///
/// # Errors
/// `QueryError::UnknownField` if a test references a field missing from `fmap`,
/// `QueryError::Untranslatable` for tests with no SQL form, and
/// `QueryError::Conversion` if an operand does not fit the column.
pub fn predicate_to_condition<E>(
    predicate: &Predicate,
    fmap: &FieldMap<E>,
) -> QueryResult<Condition>
where
    E: EntityTrait,
    E::Column: ColumnTrait + Copy,
{
    Ok(match predicate {
        Predicate::And(a, b) => Condition::all()
            .add(predicate_to_condition(a, fmap)?)
            .add(predicate_to_condition(b, fmap)?),
        Predicate::Or(a, b) => Condition::any()
            .add(predicate_to_condition(a, fmap)?)
            .add(predicate_to_condition(b, fmap)?),
        Predicate::Test(t) => test_to_condition(t, fmap)?,
    })
}

fn test_to_condition<E>(t: &FieldTest, fmap: &FieldMap<E>) -> QueryResult<Condition>
where
    E: EntityTrait,
    E::Column: ColumnTrait + Copy,
{
    let field = &t.field;
    let col = fmap
        .get(field.name)
        .ok_or_else(|| QueryError::UnknownField {
            entity: fmap.schema_name().to_owned(),
            field: field.name.to_owned(),
        })?
        .col;
    let or_null = |expr: SimpleExpr| {
        if field.nullable {
            Condition::any().add(expr).add(Expr::col(col).is_null())
        } else {
            Condition::all().add(expr)
        }
    };

    Ok(match &t.test {
        Test::Compare(CompareOp::Eq, Value::Null) => Condition::all().add(Expr::col(col).is_null()),
        Test::Compare(CompareOp::Ne, Value::Null) => {
            Condition::all().add(Expr::col(col).is_not_null())
        }
        Test::Compare(CompareOp::Eq, v) => {
            Condition::all().add(Expr::col(col).eq(to_sea(field, v)?))
        }
        Test::Compare(CompareOp::Ne, v) => or_null(Expr::col(col).ne(to_sea(field, v)?)),
        Test::Compare(op, v) => {
            let (lhs, rhs) = ordered_operands(field, col, v)?;
            Condition::all().add(match op {
                CompareOp::Gt => lhs.gt(rhs),
                CompareOp::Ge => lhs.gte(rhs),
                CompareOp::Lt => lhs.lt(rhs),
                _ => lhs.lte(rhs),
            })
        }
        Test::Between(lo, hi) => {
            let (lhs, lo) = ordered_operands(field, col, lo)?;
            let (_, hi) = ordered_operands(field, col, hi)?;
            Condition::all().add(lhs.between(lo, hi))
        }
        Test::HalfOpen { start, end } => {
            let (lhs, start) = ordered_operands(field, col, start)?;
            let (_, end) = ordered_operands(field, col, end)?;
            Condition::all()
                .add(lhs.clone().gte(start))
                .add(lhs.lt(end))
        }
        Test::Text {
            op,
            needle,
            negated,
        } => text_match(col, *op, needle, *negated),
        Test::Null { negated: false } => Condition::all().add(Expr::col(col).is_null()),
        Test::Null { negated: true } => Condition::all().add(Expr::col(col).is_not_null()),
        Test::Empty { negated } => {
            if field.kind != FieldKind::String {
                return Err(untranslatable(field, "emptiness of a collection column"));
            }
            Condition::all().add(if *negated {
                Expr::col(col).ne("")
            } else {
                Expr::col(col).eq("")
            })
        }
        Test::Blank { negated } => blank(col, *negated),
        Test::In { values, negated } => membership(field, col, values, *negated)?,
    })
}

/// Case-insensitive `LIKE`. `NOT LIKE` on NULL is NULL, so nulls stay excluded.
fn text_match<C>(col: C, op: TextOp, needle: &str, negated: bool) -> Condition
where
    C: ColumnTrait + Copy,
{
    let pattern = match op {
        TextOp::Contains => like_contains(needle),
        TextOp::StartsWith => like_starts(needle),
        TextOp::EndsWith => like_ends(needle),
    };
    let pattern = LikeExpr::new(pattern.to_lowercase()).escape('\\');
    let lowered = Expr::expr(Func::lower(Expr::col(col)));
    Condition::all().add(if negated {
        lowered.not_like(pattern)
    } else {
        lowered.like(pattern)
    })
}

/// `TRIM(x, chars)` strips a character set on both SQLite and Postgres.
fn blank<C>(col: C, negated: bool) -> Condition
where
    C: ColumnTrait + Copy,
{
    let chars: String = BLANK_CHARS.iter().collect();
    let trimmed = Expr::expr(
        Func::cust(Alias::new("TRIM"))
            .arg(Expr::col(col))
            .arg(Expr::val(chars)),
    );
    if negated {
        Condition::all()
            .add(Expr::col(col).is_not_null())
            .add(trimmed.ne(""))
    } else {
        Condition::any()
            .add(Expr::col(col).is_null())
            .add(trimmed.eq(""))
    }
}

fn membership<C>(
    field: &FieldDescriptor,
    col: C,
    values: &[Value],
    negated: bool,
) -> QueryResult<Condition>
where
    C: ColumnTrait + Copy,
{
    let has_null = values.iter().any(Value::is_null);
    let vals = values
        .iter()
        .filter(|v| !v.is_null())
        .map(|v| to_sea(field, v))
        .collect::<QueryResult<Vec<_>>>()?;

    Ok(match (negated, vals.is_empty()) {
        // IN () → always false, NOT IN () → always true
        (false, true) if !has_null => Condition::all().add(Expr::cust("1=0")),
        (false, true) => Condition::all().add(Expr::col(col).is_null()),
        (false, false) if has_null => Condition::any()
            .add(Expr::col(col).is_in(vals))
            .add(Expr::col(col).is_null()),
        (false, false) => Condition::all().add(Expr::col(col).is_in(vals)),
        (true, true) if has_null => Condition::all().add(Expr::col(col).is_not_null()),
        (true, true) => Condition::all().add(Expr::cust("1=1")),
        (true, false) if has_null => Condition::all()
            .add(Expr::col(col).is_not_in(vals))
            .add(Expr::col(col).is_not_null()),
        (true, false) if field.nullable => Condition::any()
            .add(Expr::col(col).is_not_in(vals))
            .add(Expr::col(col).is_null()),
        (true, false) => Condition::all().add(Expr::col(col).is_not_in(vals)),
    })
}

/// Left side and operand for an ordered comparison.
///
/// Enum columns are compared by declaration rank through a `CASE` expression.
fn ordered_operands<C>(
    field: &FieldDescriptor,
    col: C,
    v: &Value,
) -> QueryResult<(Expr, SimpleExpr)>
where
    C: ColumnTrait + Copy,
{
    if let FieldKind::Enum(variants) = field.kind {
        let rank = v
            .as_str()
            .and_then(|s| variants.iter().position(|name| *name == s))
            .and_then(|i| i64::try_from(i).ok())
            .ok_or_else(|| QueryError::Conversion {
                field: field.name.to_owned(),
                value: v.to_string(),
                expected: field.kind,
            })?;
        return Ok((Expr::expr(enum_rank(col, variants)), Expr::val(rank).into()));
    }
    Ok((Expr::col(col), Expr::val(to_sea(field, v)?).into()))
}

/// `CASE col WHEN v0 THEN 0 WHEN v1 THEN 1 ... END`.
#[must_use]
pub fn enum_rank<C>(col: C, variants: &[&str]) -> SimpleExpr
where
    C: ColumnTrait + Copy,
{
    let mut ranked = variants
        .iter()
        .enumerate()
        .filter_map(|(i, name)| Some((i64::try_from(i).ok()?, *name)));
    let Some((first_rank, first)) = ranked.next() else {
        return Expr::val(0_i64).into();
    };
    let case = ranked.fold(
        Expr::case(Expr::col(col).eq(first), first_rank),
        |case, (rank, name)| case.case(Expr::col(col).eq(name), rank),
    );
    case.finally(i64::try_from(variants.len()).unwrap_or(i64::MAX))
        .into()
}

fn untranslatable(field: &FieldDescriptor, reason: &'static str) -> QueryError {
    QueryError::Untranslatable {
        field: field.name.to_owned(),
        reason,
    }
}

fn bigdecimal_to_decimal(field: &FieldDescriptor, bd: &BigDecimal) -> QueryResult<Decimal> {
    // Preserve precision via string.
    let s = bd.to_string();
    Decimal::from_str_exact(&s)
        .or_else(|_| Decimal::from_scientific(&s))
        .map_err(|_| QueryError::Conversion {
            field: field.name.to_owned(),
            value: s,
            expected: FieldKind::Decimal,
        })
}

/// Bind a typed value as a `SeaORM` value for `field`'s column.
///
/// # Errors
/// `QueryError::Conversion` when the value does not fit the column kind.
pub fn to_sea(field: &FieldDescriptor, v: &Value) -> QueryResult<sea_orm::Value> {
    let mismatch = || QueryError::Conversion {
        field: field.name.to_owned(),
        value: v.to_string(),
        expected: field.kind,
    };
    Ok(match (field.kind, v) {
        (FieldKind::String | FieldKind::Enum(_), Value::String(s)) => {
            sea_orm::Value::String(Some(Box::new(s.clone())))
        }
        (FieldKind::I64, Value::Number(n)) => {
            sea_orm::Value::BigInt(Some(n.to_i64().ok_or_else(mismatch)?))
        }
        (FieldKind::F64, Value::Number(n)) => {
            sea_orm::Value::Double(Some(n.to_f64().ok_or_else(mismatch)?))
        }
        (FieldKind::Decimal, Value::Number(n)) => {
            sea_orm::Value::Decimal(Some(Box::new(bigdecimal_to_decimal(field, n)?)))
        }
        (FieldKind::Bool, Value::Bool(b)) => sea_orm::Value::Bool(Some(*b)),
        (FieldKind::Uuid, Value::Uuid(u)) => sea_orm::Value::Uuid(Some(Box::new(*u))),
        (FieldKind::DateTimeUtc, Value::DateTime(dt)) => {
            sea_orm::Value::ChronoDateTimeUtc(Some(Box::new(*dt)))
        }
        (FieldKind::Date, Value::Date(d)) => sea_orm::Value::ChronoDate(Some(Box::new(*d))),
        (FieldKind::Time, Value::Time(t)) => sea_orm::Value::ChronoTime(Some(Box::new(*t))),
        _ => return Err(mismatch()),
    })
}

/* ---------- LIKE helpers ---------- */

fn like_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '%' | '_' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            c => out.push(c),
        }
    }
    out
}

fn like_contains(s: &str) -> String {
    format!("%{}%", like_escape(s))
}

fn like_starts(s: &str) -> String {
    format!("{}%", like_escape(s))
}

fn like_ends(s: &str) -> String {
    format!("%{}", like_escape(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_patterns_escape_wildcards() {
        assert_eq!(like_contains("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_starts("a"), "a%");
        assert_eq!(like_ends("a\\b"), "%a\\\\b");
    }
}
