use tracing::trace;

use crate::expr::{Binding, Expr, Method};
use crate::options::RewriteOptions;
use crate::rewrite::ExprRewriter;
use crate::types::Ty;

use super::IsDeletedMappingVisitor;

/// Excludes deleted rows from a projection.
///
/// - Member reads of a soft-deletable object become `!x.flag ? x : default(T)`.
/// - A collection binding over soft-deletable elements becomes
///   `source.Where(e => !e.flag)`, followed by the original `Select` and a
///   `ToList` when the original had one or the bound member is a list.
///
/// Existing guards and not-deleted filters are recognized, so applying the
/// pass to its own output changes nothing.
#[derive(Clone, Debug, Default)]
pub struct SoftDeleteFilterVisitor {
    options: RewriteOptions,
}

/// A collection pipeline split into its parts.
struct Pipeline<'a> {
    source: &'a Expr,
    select: Option<(&'a Expr, Ty)>,
    to_list: Option<Ty>,
}

impl<'a> Pipeline<'a> {
    fn split(expr: &'a Expr) -> Self {
        let (to_list, rest) = match expr {
            Expr::Call {
                method: Method::ToList,
                args,
                ty,
            } if args.len() == 1 => (Some(*ty), &args[0]),
            _ => (None, expr),
        };
        let (select, source) = match rest {
            Expr::Call {
                method: Method::Select,
                args,
                ty,
            } if args.len() == 2 => (Some((&args[1], *ty)), &args[0]),
            _ => (None, rest),
        };
        Self {
            source,
            select,
            to_list,
        }
    }
}

impl SoftDeleteFilterVisitor {
    #[must_use]
    pub fn new(options: RewriteOptions) -> Self {
        Self { options }
    }

    /// Filter, then run the deletion flag mapping over the result.
    #[must_use]
    pub fn apply(&self, expr: &Expr) -> Expr {
        IsDeletedMappingVisitor::new(self.options).rewrite(&self.rewrite(expr))
    }

    fn rewrite_collection(&self, value: &Expr, materialize: bool) -> Expr {
        let pipeline = Pipeline::split(value);
        let source_ty = pipeline.source.ty();
        let (Some(element), Some(flag)) =
            (source_ty.element(), self.options.element_flag(source_ty))
        else {
            return self.rewrite(value);
        };
        if matches!(pipeline.source, Expr::ListInit { .. }) {
            return self.rewrite(value);
        }

        let mut out = self.rewrite(pipeline.source);
        if !self.options.carries_not_deleted(&out) {
            trace!(source = %out, flag, "filtering deleted elements");
            let e = Expr::param("e", Ty::Object(element));
            let predicate =
                Expr::lambda("e", Ty::Object(element), e.member(flag, Ty::Bool).not());
            out = out.where_(predicate);
        }
        if let Some((selector, ty)) = pipeline.select {
            out = Expr::call(Method::Select, vec![out, self.rewrite(selector)], ty);
        }
        match pipeline.to_list {
            Some(ty) => Expr::call(Method::ToList, vec![out], ty),
            None if materialize => out.to_list(),
            None => out,
        }
    }

    fn guardable(expr: &Expr) -> bool {
        matches!(
            expr,
            Expr::Member { .. }
                | Expr::Call {
                    method: Method::Named(_),
                    ..
                }
        )
    }
}

impl ExprRewriter for SoftDeleteFilterVisitor {
    fn rewrite(&self, expr: &Expr) -> Expr {
        match expr {
            Expr::Conditional { then, .. } if self.options.is_guard(expr) => {
                self.options.guard(self.walk(then))
            }
            Expr::New { ty, bindings } => Expr::New {
                ty: *ty,
                bindings: bindings
                    .iter()
                    .map(|b| {
                        let value = if b.value.ty().is_collection() {
                            let materialize = ty
                                .member(b.member)
                                .is_some_and(|m| matches!(m.ty, Ty::List(_)));
                            self.rewrite_collection(&b.value, materialize)
                        } else {
                            self.rewrite(&b.value)
                        };
                        Binding::new(b.member, value)
                    })
                    .collect(),
            },
            _ if Self::guardable(expr) && self.options.object_flag(expr.ty()).is_some() => {
                trace!(%expr, "guarding soft-deletable read");
                self.options.guard(self.walk(expr))
            }
            _ => self.walk(expr),
        }
    }
}
