use tracing::trace;

use crate::error::RewriteError;
use crate::expr::{Binding, Expr};
use crate::options::RewriteOptions;
use crate::rewrite::ExprRewriter;

/// Stamps the tenant of the current row onto every constructed
/// tenant-scoped object that does not bind one itself.
///
/// Nested constructions, including list initializer items and `Select`
/// bodies, are stamped from the same root row.
#[derive(Clone, Debug)]
pub struct TenantIdMappingVisitor {
    options: RewriteOptions,
    /// `row.TenantId`, typed from the row's metadata.
    stamp: Expr,
}

impl TenantIdMappingVisitor {
    /// # Errors
    /// `RewriteError::MissingTenantMember` when `row` is not an object with a
    /// tenant identifier.
    pub fn new(row: Expr, options: RewriteOptions) -> Result<Self, RewriteError> {
        let row_ty = row.ty();
        let stamp = row_ty
            .object()
            .and_then(|info| options.tenant_member(info))
            .and_then(|member| row.access(member))
            .ok_or_else(|| RewriteError::MissingTenantMember {
                type_name: row_ty.to_string(),
            })?;
        Ok(Self { options, stamp })
    }
}

impl ExprRewriter for TenantIdMappingVisitor {
    fn rewrite(&self, expr: &Expr) -> Expr {
        let mut out = self.walk(expr);
        if let Expr::New { ty, bindings } = &mut out
            && let Some(member) = self.options.tenant_member(ty)
            && !bindings.iter().any(|b| b.member == member)
        {
            trace!(target_type = ty.name, member, "stamping tenant");
            bindings.push(Binding::new(member, self.stamp.clone()));
        }
        out
    }
}
