//! Static type metadata attached to projection nodes.
//!
//! Types are declared once as `static` [`TypeInfo`] values and referenced by
//! pointer, so recursive object graphs (a user owning documents owned by a
//! user) are expressible without allocation.

use std::fmt;
use std::hash::{Hash, Hasher};

/// Capabilities a type opts into. Each names the member that carries it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Capabilities {
    /// Boolean deletion flag member, e.g. `IsDeleted`.
    pub soft_delete: Option<&'static str>,
    /// Tenant identifier member, e.g. `TenantId`.
    pub tenant: Option<&'static str>,
}

impl Capabilities {
    pub const NONE: Self = Self {
        soft_delete: None,
        tenant: None,
    };

    #[must_use]
    pub const fn soft_delete(flag: &'static str) -> Self {
        Self {
            soft_delete: Some(flag),
            tenant: None,
        }
    }

    #[must_use]
    pub const fn with_tenant(mut self, member: &'static str) -> Self {
        self.tenant = Some(member);
        self
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Member {
    pub name: &'static str,
    pub ty: Ty,
}

impl Member {
    #[must_use]
    pub const fn new(name: &'static str, ty: Ty) -> Self {
        Self { name, ty }
    }
}

/// An object type that projections construct or read from.
pub struct TypeInfo {
    pub name: &'static str,
    pub members: &'static [Member],
    pub capabilities: Capabilities,
}

impl TypeInfo {
    #[must_use]
    pub const fn new(
        name: &'static str,
        members: &'static [Member],
        capabilities: Capabilities,
    ) -> Self {
        Self {
            name,
            members,
            capabilities,
        }
    }

    /// Exact, case-sensitive member lookup.
    #[must_use]
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }
}

// Identity: two declarations with the same shape are still different types.
impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::from_ref(self).hash(state);
    }
}

impl fmt::Debug for TypeInfo {
    // Members may point back at this type; print names only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field(
                "members",
                &self.members.iter().map(|m| m.name).collect::<Vec<_>>(),
            )
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// Static type of a projection node.
///
/// Object and sequence types compare by identity of their [`TypeInfo`].
#[derive(Clone, Copy)]
pub enum Ty {
    Bool,
    /// Any other leaf value, by name (`Uuid`, `String`, ...).
    Scalar(&'static str),
    Object(&'static TypeInfo),
    /// Lazily evaluated sequence of objects.
    Seq(&'static TypeInfo),
    /// Materialized list of objects.
    List(&'static TypeInfo),
    /// Lambda value.
    Func,
}

impl Ty {
    #[must_use]
    pub fn object(self) -> Option<&'static TypeInfo> {
        match self {
            Ty::Object(info) => Some(info),
            _ => None,
        }
    }

    /// Element type of a sequence or list.
    #[must_use]
    pub fn element(self) -> Option<&'static TypeInfo> {
        match self {
            Ty::Seq(info) | Ty::List(info) => Some(info),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_collection(self) -> bool {
        self.element().is_some()
    }
}

impl PartialEq for Ty {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Ty::Bool, Ty::Bool) | (Ty::Func, Ty::Func) => true,
            (Ty::Scalar(a), Ty::Scalar(b)) => a == b,
            (Ty::Object(a), Ty::Object(b))
            | (Ty::Seq(a), Ty::Seq(b))
            | (Ty::List(a), Ty::List(b)) => std::ptr::eq(*a, *b),
            _ => false,
        }
    }
}

impl Eq for Ty {}

impl Hash for Ty {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Ty::Scalar(name) => name.hash(state),
            Ty::Object(info) | Ty::Seq(info) | Ty::List(info) => {
                std::ptr::from_ref::<TypeInfo>(*info).hash(state);
            }
            Ty::Bool | Ty::Func => {}
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Bool => f.write_str("bool"),
            Ty::Scalar(name) => f.write_str(name),
            Ty::Object(info) => f.write_str(info.name),
            Ty::Seq(info) => write!(f, "Seq<{}>", info.name),
            Ty::List(info) => write!(f, "List<{}>", info.name),
            Ty::Func => f.write_str("fn"),
        }
    }
}

impl fmt::Debug for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
