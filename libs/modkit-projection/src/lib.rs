#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Projection rewriting: soft-delete exclusion and tenant stamping injected
//! into caller-authored "build a destination object from a row" trees.
//!
//! ```
//! use modkit_projection::{
//!     Binding, Capabilities, Expr, Member, ProjectionRewriter, RewriteOptions, Ty, TypeInfo,
//! };
//!
//! static USER: TypeInfo = TypeInfo::new(
//!     "User",
//!     &[
//!         Member::new("Name", Ty::Scalar("String")),
//!         Member::new("IsDeleted", Ty::Bool),
//!     ],
//!     Capabilities::soft_delete("IsDeleted"),
//! );
//! static USER_DTO: TypeInfo = TypeInfo::new(
//!     "UserDto",
//!     &[
//!         Member::new("Name", Ty::Scalar("String")),
//!         Member::new("IsDeleted", Ty::Bool),
//!     ],
//!     Capabilities::soft_delete("IsDeleted"),
//! );
//!
//! let row = Expr::param("u", Ty::Object(&USER));
//! let name = row.access("Name").unwrap();
//! let projection = Expr::new_object(&USER_DTO, vec![Binding::new("Name", name)]);
//!
//! let out = ProjectionRewriter::new(RewriteOptions::default())
//!     .rewrite(&projection)
//!     .unwrap();
//! assert_eq!(out.to_string(), "new UserDto { Name = u.Name, IsDeleted = u.IsDeleted }");
//! ```

pub mod error;
pub mod expr;
pub mod options;
pub mod pipeline;
pub mod rewrite;
pub mod types;
pub mod visitors;

pub use error::RewriteError;
pub use expr::{Binding, Expr, Literal, Method};
pub use options::{Detection, RewriteOptions};
pub use pipeline::ProjectionRewriter;
pub use rewrite::ExprRewriter;
pub use types::{Capabilities, Member, Ty, TypeInfo};
pub use visitors::{
    IsDeletedMappingVisitor, SoftDeleteFilterVisitor, TenantIdMappingVisitor,
    ToListRemoverVisitor,
};
