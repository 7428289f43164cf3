//! Wire-format request and response types.
//!
//! Field names are matched case-insensitively on input (`filterBy`,
//! `FilterBy` and `filterby` are all accepted) and emitted in camelCase.
//! Enumerations accept their name in any case or their declaration ordinal.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};

use crate::value::Value;

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),+
                }
            }

            /// Look up a variant by declaration ordinal.
            #[must_use]
            pub fn from_ordinal(ordinal: u64) -> Option<Self> {
                usize::try_from(ordinal)
                    .ok()
                    .and_then(|i| Self::ALL.get(i))
                    .copied()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| UnknownVariant {
                        enum_name: stringify!($name),
                        got: s.to_owned(),
                    })
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                match serde_json::Value::deserialize(deserializer)? {
                    serde_json::Value::String(s) => s.parse().map_err(de::Error::custom),
                    serde_json::Value::Number(n) => n
                        .as_u64()
                        .and_then(Self::from_ordinal)
                        .ok_or_else(|| {
                            de::Error::custom(format!(
                                "invalid {} ordinal: {n}",
                                stringify!($name)
                            ))
                        }),
                    other => Err(de::Error::custom(format!(
                        "expected {} name or ordinal, got {other}",
                        stringify!($name)
                    ))),
                }
            }
        }
    };
}

/// Error returned when an enumeration name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {enum_name} variant: {got}")]
pub struct UnknownVariant {
    pub enum_name: &'static str,
    pub got: String,
}

wire_enum! {
    /// Closed operator vocabulary of a [`FilterCriterion`].
    pub enum FilterOperator {
        Equal,
        NotEqual,
        Greater,
        GreaterEqual,
        Less,
        LessEqual,
        Contains,
        NotContains,
        StartsWith,
        EndsWith,
        Between,
        DateEqualTo,
        IsNull,
        IsNotNull,
        IsEmpty,
        IsNotEmpty,
        IsNullOrWhiteSpace,
        IsNotNullNorWhiteSpace,
        In,
        NotIn,
    }
}

wire_enum! {
    /// Connector applied between every pair of criteria in a request.
    pub enum MergeMode {
        And,
        Or,
    }
}

wire_enum! {
    pub enum SortDirection {
        Asc,
        Desc,
    }
}

wire_enum! {
    pub enum AggregationKind {
        Avg,
        Sum,
        Min,
        Max,
        Count,
    }
}

impl Default for MergeMode {
    fn default() -> Self {
        MergeMode::And
    }
}

impl Default for SortDirection {
    fn default() -> Self {
        SortDirection::Asc
    }
}

impl SortDirection {
    #[must_use]
    pub fn reverse(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// JSON object with lower-cased keys, drained field by field.
struct WireObject<E> {
    fields: serde_json::Map<String, serde_json::Value>,
    _error: PhantomData<fn() -> E>,
}

impl<E: de::Error> WireObject<E> {
    fn deserialize<'de, D>(deserializer: D) -> Result<Self, E>
    where
        D: Deserializer<'de, Error = E>,
    {
        let map = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
        Ok(Self {
            fields: map
                .into_iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v))
                .collect(),
            _error: PhantomData,
        })
    }

    fn raw(&mut self, key: &str) -> serde_json::Value {
        self.fields.remove(key).unwrap_or(serde_json::Value::Null)
    }

    fn optional<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>, E> {
        match self.fields.remove(key) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(v) => serde_json::from_value(v)
                .map(Some)
                .map_err(|e| E::custom(format!("field `{key}`: {e}"))),
        }
    }

    fn required<T: DeserializeOwned>(&mut self, key: &str) -> Result<T, E> {
        self.optional(key)?
            .ok_or_else(|| E::custom(format!("missing field `{key}`")))
    }
}

/// One filter test against a single property.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterCriterion {
    pub filter_by: String,
    pub operator: FilterOperator,
    pub value: serde_json::Value,
    /// Upper bound for range-like operators.
    pub other_value: serde_json::Value,
}

impl FilterCriterion {
    #[must_use]
    pub fn new(
        filter_by: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        Self {
            filter_by: filter_by.into(),
            operator,
            value: value.into(),
            other_value: serde_json::Value::Null,
        }
    }

    #[must_use]
    pub fn with_other_value(mut self, other: impl Into<serde_json::Value>) -> Self {
        self.other_value = other.into();
        self
    }
}

impl<'de> Deserialize<'de> for FilterCriterion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut obj = WireObject::deserialize(deserializer)?;
        Ok(Self {
            filter_by: obj.required("filterby")?,
            operator: obj.required("type")?,
            value: obj.raw("value"),
            other_value: obj.raw("othervalue"),
        })
    }
}

impl Serialize for FilterCriterion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("FilterCriterion", 4)?;
        st.serialize_field("filterBy", &self.filter_by)?;
        st.serialize_field("type", &self.operator)?;
        st.serialize_field("value", &self.value)?;
        st.serialize_field("otherValue", &self.other_value)?;
        st.end()
    }
}

/// Ordered criteria joined by a single connector.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterRequest {
    pub criterias: Vec<FilterCriterion>,
    pub merge_type: MergeMode,
}

impl FilterRequest {
    #[must_use]
    pub fn new(merge_type: MergeMode) -> Self {
        Self {
            criterias: Vec::new(),
            merge_type,
        }
    }

    #[must_use]
    pub fn with(mut self, criterion: FilterCriterion) -> Self {
        self.criterias.push(criterion);
        self
    }
}

impl<'de> Deserialize<'de> for FilterRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut obj = WireObject::deserialize(deserializer)?;
        Ok(Self {
            criterias: obj.optional("criterias")?.unwrap_or_default(),
            merge_type: obj.optional("mergetype")?.unwrap_or_default(),
        })
    }
}

impl Serialize for FilterRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("FilterRequest", 2)?;
        st.serialize_field("criterias", &self.criterias)?;
        st.serialize_field("mergeType", &self.merge_type)?;
        st.end()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SortSpec {
    pub sort_by: String,
    pub direction: SortDirection,
}

impl SortSpec {
    #[must_use]
    pub fn new(sort_by: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            sort_by: sort_by.into(),
            direction,
        }
    }
}

impl<'de> Deserialize<'de> for SortSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut obj = WireObject::deserialize(deserializer)?;
        Ok(Self {
            sort_by: obj.optional("sortby")?.unwrap_or_default(),
            direction: obj.optional("type")?.unwrap_or_default(),
        })
    }
}

impl Serialize for SortSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("SortSpec", 2)?;
        st.serialize_field("sortBy", &self.sort_by)?;
        st.serialize_field("type", &self.direction)?;
        st.end()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregationCriterion {
    /// Ignored for `Count`.
    pub aggregate_by: String,
    pub kind: AggregationKind,
}

impl AggregationCriterion {
    #[must_use]
    pub fn new(aggregate_by: impl Into<String>, kind: AggregationKind) -> Self {
        Self {
            aggregate_by: aggregate_by.into(),
            kind,
        }
    }

    #[must_use]
    pub fn count() -> Self {
        Self::new(String::new(), AggregationKind::Count)
    }
}

impl<'de> Deserialize<'de> for AggregationCriterion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut obj = WireObject::deserialize(deserializer)?;
        Ok(Self {
            aggregate_by: obj.optional("aggregateby")?.unwrap_or_default(),
            kind: obj.required("type")?,
        })
    }
}

impl Serialize for AggregationCriterion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("AggregationCriterion", 2)?;
        st.serialize_field("aggregateBy", &self.aggregate_by)?;
        st.serialize_field("type", &self.kind)?;
        st.end()
    }
}

/// Normalized outcome of one aggregation.
#[derive(Clone, Debug, PartialEq)]
pub struct AggregationResult {
    pub aggregated_by: String,
    pub kind: AggregationKind,
    pub result: Value,
}

impl Serialize for AggregationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("AggregationResult", 3)?;
        st.serialize_field("aggregatedBy", &self.aggregated_by)?;
        st.serialize_field("type", &self.kind)?;
        st.serialize_field("result", &self.result)?;
        st.end()
    }
}
