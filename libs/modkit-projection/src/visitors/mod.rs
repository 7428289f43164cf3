//! The projection rewriting passes.

mod is_deleted_mapping;
mod soft_delete_filter;
mod tenant_id_mapping;
mod to_list_remover;

pub use is_deleted_mapping::IsDeletedMappingVisitor;
pub use soft_delete_filter::SoftDeleteFilterVisitor;
pub use tenant_id_mapping::TenantIdMappingVisitor;
pub use to_list_remover::ToListRemoverVisitor;
