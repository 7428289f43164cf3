use tracing::trace;

use crate::expr::{Expr, Method};
use crate::options::RewriteOptions;
use crate::rewrite::ExprRewriter;

/// Drops `ToList()` directly over an unfiltered soft-deletable sequence so
/// a later deletion filter can still be composed onto it.
#[derive(Clone, Debug, Default)]
pub struct ToListRemoverVisitor {
    options: RewriteOptions,
}

impl ToListRemoverVisitor {
    #[must_use]
    pub fn new(options: RewriteOptions) -> Self {
        Self { options }
    }
}

impl ExprRewriter for ToListRemoverVisitor {
    fn rewrite(&self, expr: &Expr) -> Expr {
        let out = self.walk(expr);
        match out {
            Expr::Call {
                method: Method::ToList,
                mut args,
                ty,
            } if args.len() == 1 => {
                let source = &args[0];
                if self.options.element_flag(source.ty()).is_some()
                    && !self.options.carries_not_deleted(source)
                {
                    trace!(%source, "removing ToList over soft-deletable sequence");
                    return args.swap_remove(0);
                }
                Expr::Call {
                    method: Method::ToList,
                    args,
                    ty,
                }
            }
            other => other,
        }
    }
}
