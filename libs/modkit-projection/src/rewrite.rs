//! Tree rewriting.
//!
//! A pass implements [`ExprRewriter::rewrite`] for the nodes it cares about
//! and falls back to [`ExprRewriter::walk`], which rebuilds any node from its
//! rewritten children. Input trees are borrowed and never mutated.

use crate::expr::{Binding, Expr};

pub trait ExprRewriter {
    fn rewrite(&self, expr: &Expr) -> Expr {
        self.walk(expr)
    }

    /// Rebuild `expr` with every child passed through [`Self::rewrite`].
    fn walk(&self, expr: &Expr) -> Expr {
        walk(self, expr)
    }
}

#[must_use]
pub fn walk<R: ExprRewriter + ?Sized>(r: &R, expr: &Expr) -> Expr {
    let boxed = |e: &Expr| Box::new(r.rewrite(e));
    match expr {
        Expr::Parameter { .. } | Expr::Constant { .. } | Expr::Default(_) => expr.clone(),
        Expr::Member { target, member, ty } => Expr::Member {
            target: boxed(target),
            member: *member,
            ty: *ty,
        },
        Expr::Not(inner) => Expr::Not(boxed(inner)),
        Expr::Equal(a, b) => Expr::Equal(boxed(a), boxed(b)),
        Expr::Conditional {
            test,
            then,
            otherwise,
        } => Expr::Conditional {
            test: boxed(test),
            then: boxed(then),
            otherwise: boxed(otherwise),
        },
        Expr::New { ty, bindings } => Expr::New {
            ty: *ty,
            bindings: bindings
                .iter()
                .map(|b| Binding::new(b.member, r.rewrite(&b.value)))
                .collect(),
        },
        Expr::ListInit { element, items } => Expr::ListInit {
            element: *element,
            items: items.iter().map(|i| r.rewrite(i)).collect(),
        },
        Expr::Call { method, args, ty } => Expr::Call {
            method: method.clone(),
            args: args.iter().map(|a| r.rewrite(a)).collect(),
            ty: *ty,
        },
        Expr::Lambda {
            param,
            param_ty,
            body,
        } => Expr::Lambda {
            param: param.clone(),
            param_ty: *param_ty,
            body: boxed(body),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Literal;
    use crate::types::Ty;

    struct Identity;
    impl ExprRewriter for Identity {}

    /// Replaces every `true` constant with `false`.
    struct Flip;
    impl ExprRewriter for Flip {
        fn rewrite(&self, expr: &Expr) -> Expr {
            match expr {
                Expr::Constant {
                    value: Literal::Bool(true),
                    ty,
                } => Expr::constant(Literal::Bool(false), *ty),
                _ => self.walk(expr),
            }
        }
    }

    fn sample() -> Expr {
        let t = Expr::constant(Literal::Bool(true), Ty::Bool);
        Expr::conditional(t.clone().not(), t.clone(), t)
    }

    #[test]
    fn default_walk_is_identity() {
        let e = sample();
        assert_eq!(Identity.rewrite(&e), e);
    }

    #[test]
    fn overrides_reach_nested_nodes() {
        let out = Flip.rewrite(&sample());
        assert_eq!(out.to_string(), "(!false ? false : false)");
    }
}
