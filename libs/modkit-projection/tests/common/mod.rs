#![allow(dead_code)]

use modkit_projection::{Capabilities, Expr, Member, Ty, TypeInfo};

const SCOPED: Capabilities = Capabilities::soft_delete("IsDeleted").with_tenant("TenantId");

pub static USER: TypeInfo = TypeInfo::new(
    "User",
    &[
        Member::new("Name", Ty::Scalar("String")),
        Member::new("IsDeleted", Ty::Bool),
        Member::new("TenantId", Ty::Scalar("Uuid")),
        Member::new("Manager", Ty::Object(&USER)),
        Member::new("Documents", Ty::Seq(&DOCUMENT)),
        Member::new("Tags", Ty::Seq(&TAG)),
    ],
    SCOPED,
);

pub static DOCUMENT: TypeInfo = TypeInfo::new(
    "Document",
    &[
        Member::new("Title", Ty::Scalar("String")),
        Member::new("IsDeleted", Ty::Bool),
        Member::new("TenantId", Ty::Scalar("Uuid")),
        Member::new("Owner", Ty::Object(&USER)),
    ],
    SCOPED,
);

pub static TAG: TypeInfo = TypeInfo::new(
    "Tag",
    &[Member::new("Label", Ty::Scalar("String"))],
    Capabilities::NONE,
);

pub static USER_DTO: TypeInfo = TypeInfo::new(
    "UserDto",
    &[
        Member::new("Name", Ty::Scalar("String")),
        Member::new("IsDeleted", Ty::Bool),
        Member::new("TenantId", Ty::Scalar("Uuid")),
        Member::new("Manager", Ty::Object(&USER_DTO)),
        Member::new("Documents", Ty::List(&DOCUMENT_DTO)),
        Member::new("RecentDocuments", Ty::Seq(&DOCUMENT_DTO)),
    ],
    SCOPED,
);

pub static DOCUMENT_DTO: TypeInfo = TypeInfo::new(
    "DocumentDto",
    &[
        Member::new("Title", Ty::Scalar("String")),
        Member::new("OwnerName", Ty::Scalar("String")),
        Member::new("IsDeleted", Ty::Bool),
        Member::new("TenantId", Ty::Scalar("Uuid")),
    ],
    SCOPED,
);

/// Same shape as `User`, but nothing declared.
pub static LEGACY_USER: TypeInfo = TypeInfo::new(
    "LegacyUser",
    &[
        Member::new("Name", Ty::Scalar("String")),
        Member::new("IsDeleted", Ty::Bool),
        Member::new("TenantId", Ty::Scalar("Uuid")),
        Member::new("Manager", Ty::Object(&LEGACY_USER)),
    ],
    Capabilities::NONE,
);

pub fn user() -> Expr {
    Expr::param("u", Ty::Object(&USER))
}

pub fn doc() -> Expr {
    Expr::param("d", Ty::Object(&DOCUMENT))
}

pub fn read(target: Expr, path: &str) -> Expr {
    path.split('.')
        .try_fold(target, Expr::access)
        .unwrap_or_else(|| panic!("no member path `{path}`"))
}
