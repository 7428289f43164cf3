use tracing::trace;

use crate::expr::{Binding, Expr};
use crate::options::RewriteOptions;
use crate::rewrite::ExprRewriter;
use crate::types::Ty;

/// Populates the deletion flag of constructed soft-deletable objects.
///
/// For `new Dto { Name = src.Name }` where `Dto` is soft-deletable and `src`
/// is too, adds `IsDeleted = src.IsDeleted`. The origin is the first
/// soft-deletable expression reachable from the existing bindings through
/// member targets, first call arguments, conditional true-branches and
/// nested constructions. Explicit bindings are kept; objects with no origin
/// are left as they are.
#[derive(Clone, Debug, Default)]
pub struct IsDeletedMappingVisitor {
    options: RewriteOptions,
}

impl IsDeletedMappingVisitor {
    #[must_use]
    pub fn new(options: RewriteOptions) -> Self {
        Self { options }
    }

    fn candidate(&self, expr: &Expr) -> Option<(Expr, &'static str)> {
        // A guard is typed as its guarded value; read the flag from that value.
        if let Expr::Conditional { then, .. } = expr {
            return self.candidate(then);
        }
        match self.options.object_flag(expr.ty()) {
            Some(flag) => Some((expr.clone(), flag)),
            None => self.origin_of(expr),
        }
    }

    fn origin_of(&self, expr: &Expr) -> Option<(Expr, &'static str)> {
        match expr {
            Expr::Member { target, .. } => self.candidate(target),
            Expr::Call { args, .. } => args.first().and_then(|a| self.candidate(a)),
            Expr::Conditional { then, .. } => self.candidate(then),
            Expr::New { bindings, .. } => bindings.iter().find_map(|b| self.origin_of(&b.value)),
            _ => None,
        }
    }
}

impl ExprRewriter for IsDeletedMappingVisitor {
    fn rewrite(&self, expr: &Expr) -> Expr {
        let mut out = self.walk(expr);
        if let Expr::New { ty, bindings } = &mut out
            && let Some(flag) = self.options.soft_delete_flag(ty)
            && !bindings.iter().any(|b| b.member == flag)
            && let Some((origin, origin_flag)) =
                bindings.iter().find_map(|b| self.origin_of(&b.value))
        {
            trace!(target_type = ty.name, %origin, flag, "mapping deletion flag");
            bindings.push(Binding::new(flag, origin.member(origin_flag, Ty::Bool)));
        }
        out
    }
}
