use tracing::debug;

use crate::error::RewriteError;
use crate::expr::Expr;
use crate::options::RewriteOptions;
use crate::rewrite::ExprRewriter;
use crate::visitors::{SoftDeleteFilterVisitor, TenantIdMappingVisitor, ToListRemoverVisitor};

/// Runs the passes in order: `ToList` cleanup, deletion filtering with flag
/// mapping, then tenant stamping when a row is configured.
#[derive(Clone, Debug, Default)]
pub struct ProjectionRewriter {
    options: RewriteOptions,
    tenant_row: Option<Expr>,
}

impl ProjectionRewriter {
    #[must_use]
    pub fn new(options: RewriteOptions) -> Self {
        Self {
            options,
            tenant_row: None,
        }
    }

    /// Stamp tenant identifiers from `row`.
    #[must_use]
    pub fn with_tenant_row(mut self, row: Expr) -> Self {
        self.tenant_row = Some(row);
        self
    }

    #[must_use]
    pub fn options(&self) -> RewriteOptions {
        self.options
    }

    /// # Errors
    /// `RewriteError::MissingTenantMember` if the configured tenant row has
    /// no tenant identifier.
    pub fn rewrite(&self, projection: &Expr) -> Result<Expr, RewriteError> {
        let tenant = self
            .tenant_row
            .clone()
            .map(|row| TenantIdMappingVisitor::new(row, self.options))
            .transpose()?;

        let out = ToListRemoverVisitor::new(self.options).rewrite(projection);
        let out = SoftDeleteFilterVisitor::new(self.options).apply(&out);
        let out = match tenant {
            Some(visitor) => visitor.rewrite(&out),
            None => out,
        };
        debug!(
            detection = ?self.options.detection,
            tenant = self.tenant_row.is_some(),
            "projection rewritten"
        );
        Ok(out)
    }
}
