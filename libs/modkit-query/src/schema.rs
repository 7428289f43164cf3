//! Runtime type metadata for entities targeted by the query engine.
//!
//! Rust has no reflection facility, so every queryable type describes itself
//! through an [`EntityDescriptor`]: a static list of fields with their logical
//! [`FieldKind`] and nullability. Compilers resolve wire property paths
//! against any [`EntitySchema`] and evaluate rows through [`Entity`].
//!
//! # Example
//!
//! ```
//! use modkit_query::schema::{Entity, EntityDescriptor, EntitySchema, FieldDescriptor, FieldKind};
//! use modkit_query::Value;
//!
//! struct User {
//!     name: Option<String>,
//!     age: i64,
//! }
//!
//! static USER: EntityDescriptor = EntityDescriptor::new(
//!     "User",
//!     &[
//!         FieldDescriptor::nullable("Name", FieldKind::String),
//!         FieldDescriptor::new("Age", FieldKind::I64),
//!     ],
//! );
//!
//! impl Entity for User {
//!     fn descriptor() -> &'static EntityDescriptor {
//!         &USER
//!     }
//!
//!     fn value_of(&self, field: &str) -> Value {
//!         match field {
//!             "Name" => self.name.clone().into(),
//!             "Age" => self.age.into(),
//!             _ => Value::Null,
//!         }
//!     }
//! }
//!
//! assert_eq!(USER.resolve("age").map(|f| f.name), Some("Age"));
//! ```

use std::cmp::Ordering;
use std::fmt;

use crate::value::Value;

/// Logical field types supported by filters, sort keys and aggregates.
///
/// The kind drives value coercion, operator validation and fold selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    String,
    I64,
    F64,
    Decimal,
    Bool,
    Uuid,
    DateTimeUtc,
    Date,
    Time,
    /// Closed set of variant names, in declaration order.
    Enum(&'static [&'static str]),
    /// Collection-valued field.
    List,
}

impl FieldKind {
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, FieldKind::I64 | FieldKind::F64 | FieldKind::Decimal)
    }

    #[must_use]
    pub fn is_temporal(self) -> bool {
        matches!(
            self,
            FieldKind::DateTimeUtc | FieldKind::Date | FieldKind::Time
        )
    }

    /// Kinds with a meaningful total order for range operators and Min/Max.
    #[must_use]
    pub fn is_ordered(self) -> bool {
        self.is_numeric() || self.is_temporal() || matches!(self, FieldKind::Enum(_))
    }

    #[must_use]
    pub fn is_scalar(self) -> bool {
        !matches!(self, FieldKind::List)
    }

    /// Order two values of this kind. Enum names compare by declaration index.
    ///
    /// Returns `None` when either side is null or the values are incomparable.
    #[must_use]
    pub fn order(self, a: &Value, b: &Value) -> Option<Ordering> {
        if let FieldKind::Enum(variants) = self {
            let index = |v: &Value| {
                v.as_str()
                    .and_then(|s| variants.iter().position(|name| *name == s))
            };
            return Some(index(a)?.cmp(&index(b)?));
        }
        a.compare(b)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::String => write!(f, "String"),
            FieldKind::I64 => write!(f, "I64"),
            FieldKind::F64 => write!(f, "F64"),
            FieldKind::Decimal => write!(f, "Decimal"),
            FieldKind::Bool => write!(f, "Bool"),
            FieldKind::Uuid => write!(f, "Uuid"),
            FieldKind::DateTimeUtc => write!(f, "DateTimeUtc"),
            FieldKind::Date => write!(f, "Date"),
            FieldKind::Time => write!(f, "Time"),
            FieldKind::Enum(variants) => write!(f, "Enum({})", variants.join("|")),
            FieldKind::List => write!(f, "List"),
        }
    }
}

/// A single readable field of an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    /// Canonical field name, as passed to [`Entity::value_of`].
    pub name: &'static str,
    /// Underlying kind with the nullable wrapper removed.
    pub kind: FieldKind,
    pub nullable: bool,
}

impl FieldDescriptor {
    #[must_use]
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
        }
    }

    #[must_use]
    pub const fn nullable(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: true,
        }
    }
}

/// Anything that can resolve a wire property path to a field.
pub trait EntitySchema {
    /// Resolve `path` case-insensitively. Surrounding whitespace is ignored.
    fn resolve(&self, path: &str) -> Option<FieldDescriptor>;

    /// Name used in diagnostics.
    fn schema_name(&self) -> &str;
}

/// Static description of an entity type.
#[derive(Debug)]
pub struct EntityDescriptor {
    pub name: &'static str,
    pub fields: &'static [FieldDescriptor],
}

impl EntityDescriptor {
    #[must_use]
    pub const fn new(name: &'static str, fields: &'static [FieldDescriptor]) -> Self {
        Self { name, fields }
    }
}

impl EntitySchema for EntityDescriptor {
    fn resolve(&self, path: &str) -> Option<FieldDescriptor> {
        let path = path.trim();
        self.fields
            .iter()
            .copied()
            .find(|f| f.name.eq_ignore_ascii_case(path))
    }

    fn schema_name(&self) -> &str {
        self.name
    }
}

/// A row type the engine can evaluate against.
pub trait Entity {
    fn descriptor() -> &'static EntityDescriptor;

    /// Read a field by its canonical name. Unknown names yield `Value::Null`.
    fn value_of(&self, field: &str) -> Value;
}
