use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RewriteError {
    /// Tenant stamping needs a row whose type carries a tenant identifier.
    #[error("row type `{type_name}` exposes no tenant identifier")]
    MissingTenantMember { type_name: String },
}
