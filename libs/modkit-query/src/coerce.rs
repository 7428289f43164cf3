//! Wire value → typed [`Value`] coercion.
//!
//! Raw operands arrive as `serde_json::Value` and are converted into the
//! resolved field's underlying kind. UUIDs, enum names and temporal values are
//! accepted in their string forms; enums also accept declaration ordinals.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as Json;
use uuid::Uuid;

use crate::error::{QueryError, QueryResult};
use crate::schema::{FieldDescriptor, FieldKind};
use crate::value::Value;

/// Coerce a single operand into `field`'s kind.
///
/// # Errors
/// Returns `QueryError::Conversion` naming the field and the raw value when the
/// operand cannot be represented in the field's kind, including `null` for a
/// non-nullable field.
pub fn coerce(field: &FieldDescriptor, raw: &Json) -> QueryResult<Value> {
    let fail = || QueryError::conversion(field.name, raw, field.kind);

    if raw.is_null() {
        return if field.nullable {
            Ok(Value::Null)
        } else {
            Err(fail())
        };
    }

    Ok(match (field.kind, raw) {
        (FieldKind::String, Json::String(s)) => Value::String(s.clone()),
        (FieldKind::String, Json::Number(n)) => Value::String(n.to_string()),
        (FieldKind::String, Json::Bool(b)) => Value::String(b.to_string()),

        (FieldKind::I64, Json::Number(n)) => n.as_i64().map(Value::from).ok_or_else(fail)?,
        (FieldKind::I64, Json::String(s)) => {
            s.trim().parse::<i64>().map(Value::from).map_err(|_| fail())?
        }

        (FieldKind::F64, Json::Number(n)) => n
            .as_f64()
            .filter(|f| f.is_finite())
            .map(Value::from)
            .ok_or_else(fail)?,
        (FieldKind::F64, Json::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Value::from)
            .ok_or_else(fail)?,

        // Go through the textual form to keep every digit.
        (FieldKind::Decimal, Json::Number(n)) => BigDecimal::from_str(&n.to_string())
            .map(Value::Number)
            .map_err(|_| fail())?,
        (FieldKind::Decimal, Json::String(s)) => BigDecimal::from_str(s.trim())
            .map(Value::Number)
            .map_err(|_| fail())?,

        (FieldKind::Bool, Json::Bool(b)) => Value::Bool(*b),
        (FieldKind::Bool, Json::String(s)) => match s.trim() {
            t if t.eq_ignore_ascii_case("true") => Value::Bool(true),
            t if t.eq_ignore_ascii_case("false") => Value::Bool(false),
            _ => return Err(fail()),
        },

        (FieldKind::Uuid, Json::String(s)) => {
            Uuid::parse_str(s.trim()).map(Value::Uuid).map_err(|_| fail())?
        }

        (FieldKind::DateTimeUtc, Json::String(s)) => {
            parse_datetime(s).map(Value::DateTime).ok_or_else(fail)?
        }
        (FieldKind::Date, Json::String(s)) => parse_date(s).map(Value::Date).ok_or_else(fail)?,
        (FieldKind::Time, Json::String(s)) => parse_time(s).map(Value::Time).ok_or_else(fail)?,

        (FieldKind::Enum(variants), Json::String(s)) => variants
            .iter()
            .find(|v| v.eq_ignore_ascii_case(s.trim()))
            .map(|v| Value::String((*v).to_owned()))
            .ok_or_else(fail)?,
        (FieldKind::Enum(variants), Json::Number(n)) => n
            .as_u64()
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| variants.get(i))
            .map(|v| Value::String((*v).to_owned()))
            .ok_or_else(fail)?,

        _ => return Err(fail()),
    })
}

/// Coerce a list operand for `In` / `NotIn`.
///
/// Accepts a JSON array, a comma-separated string, or a single scalar.
///
/// # Errors
/// Returns `QueryError::Conversion` if any element fails to coerce.
pub fn coerce_list(field: &FieldDescriptor, raw: &Json) -> QueryResult<Vec<Value>> {
    match raw {
        Json::Array(items) => items.iter().map(|item| coerce(field, item)).collect(),
        Json::String(s) if s.trim().is_empty() => Ok(Vec::new()),
        Json::String(s) => s
            .split(',')
            .map(|part| coerce(field, &Json::String(part.trim().to_owned())))
            .collect(),
        other => Ok(vec![coerce(field, other)?]),
    }
}

/// Coerce the needle of a text operator.
///
/// # Errors
/// Returns `QueryError::Conversion` for objects, arrays and `null`.
pub fn coerce_text(field: &FieldDescriptor, raw: &Json) -> QueryResult<String> {
    match raw {
        Json::String(s) => Ok(s.clone()),
        Json::Number(n) => Ok(n.to_string()),
        Json::Bool(b) => Ok(b.to_string()),
        _ => Err(QueryError::conversion(field.name, raw, FieldKind::String)),
    }
}

/// Parse RFC 3339, a naive ISO timestamp (taken as UTC) or a bare date
/// (midnight UTC).
#[must_use]
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[must_use]
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(s).map(|dt| dt.date_naive()))
}

#[must_use]
pub fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NAME: FieldDescriptor = FieldDescriptor::nullable("Name", FieldKind::String);
    const COUNT: FieldDescriptor = FieldDescriptor::new("Count", FieldKind::I64);
    const LEVEL: FieldDescriptor =
        FieldDescriptor::new("Level", FieldKind::Enum(&["Low", "Medium", "High"]));

    #[test]
    fn integer_from_number_and_string() {
        assert_eq!(coerce(&COUNT, &json!(90)).unwrap(), Value::from(90_i64));
        assert_eq!(coerce(&COUNT, &json!(" 90 ")).unwrap(), Value::from(90_i64));
    }

    #[test]
    fn integer_rejects_fraction() {
        let err = coerce(&COUNT, &json!(1.5)).unwrap_err();
        assert!(matches!(err, QueryError::Conversion { .. }));
    }

    #[test]
    fn null_respects_nullability() {
        assert_eq!(coerce(&NAME, &Json::Null).unwrap(), Value::Null);
        assert!(coerce(&COUNT, &Json::Null).is_err());
    }

    #[test]
    fn enum_by_name_or_ordinal() {
        assert_eq!(coerce(&LEVEL, &json!("high")).unwrap(), Value::from("High"));
        assert_eq!(coerce(&LEVEL, &json!(1)).unwrap(), Value::from("Medium"));
        assert!(coerce(&LEVEL, &json!("extreme")).is_err());
    }

    #[test]
    fn uuid_from_string() {
        let id = Uuid::from_u128(0x6f1c_2b0e_4d3a_4f5e_9a1b_7c8d_2e3f_4a5b);
        let field = FieldDescriptor::new("Id", FieldKind::Uuid);
        assert_eq!(
            coerce(&field, &json!(id.to_string())).unwrap(),
            Value::Uuid(id)
        );
        assert!(coerce(&field, &json!("not-a-uuid")).is_err());
    }

    #[test]
    fn datetime_accepts_several_shapes() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|n| n.and_utc());
        assert_eq!(parse_datetime("2024-03-01"), expected);
        assert_eq!(parse_datetime("2024-03-01T00:00:00Z"), expected);
        assert_eq!(parse_datetime("2024-03-01T00:00:00"), expected);
        assert_eq!(parse_datetime("yesterday"), None);
    }

    #[test]
    fn list_from_array_or_csv() {
        assert_eq!(
            coerce_list(&COUNT, &json!([1, 2])).unwrap(),
            vec![Value::from(1_i64), Value::from(2_i64)]
        );
        assert_eq!(
            coerce_list(&COUNT, &json!("1, 2")).unwrap(),
            vec![Value::from(1_i64), Value::from(2_i64)]
        );
        assert!(coerce_list(&COUNT, &json!("")).unwrap().is_empty());
    }
}
