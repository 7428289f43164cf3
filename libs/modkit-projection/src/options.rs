//! Rewrite options and capability detection.

use serde::{Deserialize, Serialize};

use crate::expr::{Expr, Literal, Method};
use crate::types::{Ty, TypeInfo};

/// Member name matched by [`Detection::DeclaredOrByName`] for soft deletion.
pub const SOFT_DELETE_MEMBER: &str = "IsDeleted";
/// Member name matched by [`Detection::DeclaredOrByName`] for tenancy.
pub const TENANT_MEMBER: &str = "TenantId";

/// How a type is recognized as soft-deletable or tenant-scoped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Detection {
    /// Only capabilities declared on the type's metadata count.
    #[default]
    Declared,
    /// Declared capabilities, else a member with the conventional name
    /// (`IsDeleted` of type bool, `TenantId`).
    DeclaredOrByName,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RewriteOptions {
    pub detection: Detection,
}

impl RewriteOptions {
    #[must_use]
    pub fn with_detection(mut self, detection: Detection) -> Self {
        self.detection = detection;
        self
    }

    /// Deletion flag member of `info`, if the type is soft-deletable.
    #[must_use]
    pub fn soft_delete_flag(self, info: &TypeInfo) -> Option<&'static str> {
        info.capabilities.soft_delete.or_else(|| match self.detection {
            Detection::Declared => None,
            Detection::DeclaredOrByName => info
                .member(SOFT_DELETE_MEMBER)
                .filter(|m| m.ty == Ty::Bool)
                .map(|m| m.name),
        })
    }

    /// Tenant identifier member of `info`, if the type is tenant-scoped.
    #[must_use]
    pub fn tenant_member(self, info: &TypeInfo) -> Option<&'static str> {
        info.capabilities.tenant.or_else(|| match self.detection {
            Detection::Declared => None,
            Detection::DeclaredOrByName => info.member(TENANT_MEMBER).map(|m| m.name),
        })
    }

    /// Deletion flag of an object-typed expression.
    pub(crate) fn object_flag(self, ty: Ty) -> Option<&'static str> {
        ty.object().and_then(|info| self.soft_delete_flag(info))
    }

    /// Deletion flag of a collection's element type.
    pub(crate) fn element_flag(self, ty: Ty) -> Option<&'static str> {
        ty.element().and_then(|info| self.soft_delete_flag(info))
    }

    /// `!x.flag ? x : default(T)` for a soft-deletable object expression.
    pub(crate) fn guard(self, target: Expr) -> Expr {
        let ty = target.ty();
        match self.object_flag(ty) {
            Some(flag) => {
                let test = target.clone().member(flag, Ty::Bool).not();
                Expr::conditional(test, target, Expr::Default(ty))
            }
            None => target,
        }
    }

    /// Whether `expr` is a guard produced by [`Self::guard`].
    pub(crate) fn is_guard(self, expr: &Expr) -> bool {
        let Expr::Conditional {
            test,
            then,
            otherwise,
        } = expr
        else {
            return false;
        };
        let Some(flag) = self.object_flag(then.ty()) else {
            return false;
        };
        matches!(otherwise.as_ref(), Expr::Default(ty) if *ty == then.ty())
            && negated_flag_target(test, flag) == Some(then.as_ref())
    }

    /// Whether the receiver chain of `expr` contains a `Where` that drops
    /// deleted elements.
    pub(crate) fn carries_not_deleted(self, expr: &Expr) -> bool {
        let mut cur = expr;
        while let Expr::Call { method, args, .. } = cur {
            let Some(receiver) = args.first() else {
                return false;
            };
            if *method == Method::Where
                && let (Some(flag), Some(Expr::Lambda { param, body, .. })) =
                    (self.element_flag(receiver.ty()), args.get(1))
                && let Some(Expr::Parameter { name, .. }) = negated_flag_target(body, flag)
                && name == param
            {
                return true;
            }
            cur = receiver;
        }
        false
    }
}

/// `t` in `!t.flag`, `t.flag == false` or `false == t.flag`.
fn negated_flag_target<'e>(test: &'e Expr, flag: &str) -> Option<&'e Expr> {
    let flag_target = |e: &'e Expr| match e {
        Expr::Member { target, member, .. } if *member == flag => Some(target.as_ref()),
        _ => None,
    };
    let is_false = |e: &Expr| {
        matches!(
            e,
            Expr::Constant {
                value: Literal::Bool(false),
                ..
            }
        )
    };
    match test {
        Expr::Not(inner) => flag_target(inner),
        Expr::Equal(a, b) if is_false(b) => flag_target(a),
        Expr::Equal(a, b) if is_false(a) => flag_target(b),
        _ => None,
    }
}
