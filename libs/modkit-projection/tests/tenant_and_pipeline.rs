#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{DOCUMENT, DOCUMENT_DTO, LEGACY_USER, TAG, USER_DTO, doc, read, user};
use modkit_projection::{
    Binding, Detection, Expr, ExprRewriter, Literal, ProjectionRewriter, RewriteError,
    RewriteOptions, SoftDeleteFilterVisitor, TenantIdMappingVisitor, Ty,
};

fn titled(title: &str) -> Expr {
    Expr::new_object(
        &DOCUMENT_DTO,
        vec![Binding::new(
            "Title",
            Expr::constant(Literal::Str(title.into()), Ty::Scalar("String")),
        )],
    )
}

#[test]
fn nested_objects_are_stamped_from_the_root_row() {
    let stamping = TenantIdMappingVisitor::new(user(), RewriteOptions::default()).unwrap();
    let manager = Expr::new_object(
        &USER_DTO,
        vec![Binding::new("Name", read(user(), "Manager.Name"))],
    );
    let projection = Expr::new_object(
        &USER_DTO,
        vec![
            Binding::new("Manager", manager),
            Binding::new(
                "Documents",
                Expr::list_init(&DOCUMENT_DTO, vec![titled("a"), titled("b")]),
            ),
        ],
    );

    let out = stamping.rewrite(&projection);
    let tenant = |e: &Expr| e.binding("TenantId").map(|b| b.value.to_string());

    assert_eq!(tenant(&out).as_deref(), Some("u.TenantId"));
    assert_eq!(
        tenant(&out.binding("Manager").unwrap().value).as_deref(),
        Some("u.TenantId")
    );
    let Expr::ListInit { items, .. } = &out.binding("Documents").unwrap().value else {
        panic!("documents are no longer a list initializer");
    };
    assert_eq!(items.len(), 2);
    for item in items {
        assert_eq!(tenant(item).as_deref(), Some("u.TenantId"));
    }
}

#[test]
fn explicit_tenant_binding_is_kept() {
    let stamping = TenantIdMappingVisitor::new(user(), RewriteOptions::default()).unwrap();
    let projection = Expr::new_object(
        &USER_DTO,
        vec![Binding::new("TenantId", read(user(), "Manager.TenantId"))],
    );
    assert_eq!(stamping.rewrite(&projection), projection);
}

#[test]
fn row_without_tenant_is_rejected() {
    let row = Expr::param("t", Ty::Object(&TAG));
    let err = TenantIdMappingVisitor::new(row, RewriteOptions::default()).unwrap_err();
    assert_eq!(
        err,
        RewriteError::MissingTenantMember {
            type_name: "Tag".into()
        }
    );

    let err = ProjectionRewriter::default()
        .with_tenant_row(Expr::param("n", Ty::Scalar("String")))
        .rewrite(&titled("a"))
        .unwrap_err();
    assert!(err.to_string().contains("`String`"));
}

#[test]
fn pipeline_runs_every_pass() {
    let projection = Expr::new_object(
        &USER_DTO,
        vec![
            Binding::new("Name", read(user(), "Name")),
            Binding::new("Documents", read(user(), "Documents").to_list()),
        ],
    );
    let rewriter = ProjectionRewriter::new(RewriteOptions::default()).with_tenant_row(user());

    let out = rewriter.rewrite(&projection).unwrap();
    assert_eq!(
        out.to_string(),
        "new UserDto { Name = u.Name, Documents = u.Documents.Where(e => !e.IsDeleted).ToList(), \
         IsDeleted = u.IsDeleted, TenantId = u.TenantId }"
    );
    assert_eq!(rewriter.rewrite(&out).unwrap(), out);
}

#[test]
fn pipeline_keeps_materialized_projections() {
    let dto = Expr::new_object(
        &DOCUMENT_DTO,
        vec![Binding::new("Title", read(doc(), "Title"))],
    );
    let documents = read(user(), "Documents")
        .select(Expr::lambda("d", Ty::Object(&DOCUMENT), dto))
        .to_list();
    let projection = Expr::new_object(&USER_DTO, vec![Binding::new("Documents", documents)]);

    let piped = ProjectionRewriter::default().rewrite(&projection).unwrap();
    let filtered = SoftDeleteFilterVisitor::new(RewriteOptions::default()).apply(&projection);
    assert_eq!(piped, filtered);

    let bound = &piped.binding("Documents").unwrap().value;
    assert_eq!(bound.ty(), Ty::List(&DOCUMENT_DTO));
    assert!(bound.to_string().ends_with(".ToList()"));
}

#[test]
fn pipeline_without_tenant_row_skips_stamping() {
    let out = ProjectionRewriter::default().rewrite(&titled("a")).unwrap();
    assert!(out.binding("TenantId").is_none());
}

#[test]
fn name_fallback_detects_undeclared_members() {
    let row = Expr::param("l", Ty::Object(&LEGACY_USER));
    let projection = Expr::new_object(
        &USER_DTO,
        vec![Binding::new("Name", read(row.clone(), "Manager.Name"))],
    );

    let declared = ProjectionRewriter::default();
    assert_eq!(
        declared.rewrite(&projection).unwrap().to_string(),
        "new UserDto { Name = l.Manager.Name }"
    );
    assert!(matches!(
        declared.clone().with_tenant_row(row.clone()).rewrite(&projection),
        Err(RewriteError::MissingTenantMember { .. })
    ));

    let by_name = ProjectionRewriter::new(
        RewriteOptions::default().with_detection(Detection::DeclaredOrByName),
    )
    .with_tenant_row(row);
    assert_eq!(
        by_name.rewrite(&projection).unwrap().to_string(),
        "new UserDto { Name = (!l.Manager.IsDeleted ? l.Manager : default(LegacyUser)).Name, \
         IsDeleted = l.Manager.IsDeleted, TenantId = l.TenantId }"
    );
}

#[test]
fn options_deserialize_with_defaults() {
    let opts: RewriteOptions = serde_json::from_str("{}").unwrap();
    assert_eq!(opts.detection, Detection::Declared);

    let opts: RewriteOptions =
        serde_json::from_str(r#"{"detection": "declared_or_by_name"}"#).unwrap();
    assert_eq!(opts.detection, Detection::DeclaredOrByName);

    assert!(serde_json::from_str::<RewriteOptions>(r#"{"detect": "declared"}"#).is_err());
}
