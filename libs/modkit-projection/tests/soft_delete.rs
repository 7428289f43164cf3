#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{DOCUMENT, DOCUMENT_DTO, USER_DTO, doc, read, user};
use modkit_projection::{
    Binding, Expr, ExprRewriter, IsDeletedMappingVisitor, Literal, Method, RewriteOptions,
    SoftDeleteFilterVisitor, ToListRemoverVisitor, Ty,
};
use tracing_test::traced_test;

fn filter() -> SoftDeleteFilterVisitor {
    SoftDeleteFilterVisitor::new(RewriteOptions::default())
}

fn document_dto(source: Expr) -> Expr {
    Expr::new_object(
        &DOCUMENT_DTO,
        vec![Binding::new("Title", read(source, "Title"))],
    )
}

/// `u.Documents.Select(d => new DocumentDto { Title = d.Title })`
fn documents_of(u: Expr) -> Expr {
    read(u, "Documents").select(Expr::lambda("d", Ty::Object(&DOCUMENT), document_dto(doc())))
}

fn user_dto(documents: Expr) -> Expr {
    user_dto_with("Documents", documents)
}

fn user_dto_with(member: &'static str, documents: Expr) -> Expr {
    Expr::new_object(
        &USER_DTO,
        vec![
            Binding::new("Name", read(user(), "Name")),
            Binding::new(member, documents),
        ],
    )
}

#[test]
#[traced_test]
fn soft_deletable_reads_are_guarded() {
    let projection = Expr::new_object(
        &DOCUMENT_DTO,
        vec![
            Binding::new("Title", read(doc(), "Title")),
            Binding::new("OwnerName", read(doc(), "Owner.Name")),
        ],
    );
    let out = filter().apply(&projection);
    assert_eq!(
        out.to_string(),
        "new DocumentDto { Title = d.Title, \
         OwnerName = (!d.Owner.IsDeleted ? d.Owner : default(User)).Name, \
         IsDeleted = d.IsDeleted }"
    );
    assert!(logs_contain("guarding soft-deletable read"));
}

#[test]
fn collections_are_filtered_before_projection() {
    let out = filter().apply(&user_dto(documents_of(user()).to_list()));
    assert_eq!(
        out.to_string(),
        "new UserDto { Name = u.Name, \
         Documents = u.Documents.Where(e => !e.IsDeleted)\
         .Select(d => new DocumentDto { Title = d.Title, IsDeleted = d.IsDeleted }).ToList(), \
         IsDeleted = u.IsDeleted }"
    );
}

#[test]
fn to_list_is_reattached_only_when_present() {
    let out = filter().apply(&user_dto_with("RecentDocuments", documents_of(user())));
    let documents = &out.binding("RecentDocuments").unwrap().value;
    assert!(documents.to_string().contains(".Where(e => !e.IsDeleted).Select("));
    assert!(!documents.to_string().contains("ToList"));
}

#[test]
fn list_members_are_materialized() {
    let out = filter().apply(&user_dto(documents_of(user())));
    let documents = &out.binding("Documents").unwrap().value;
    assert!(documents.to_string().ends_with(".ToList()"));
    assert_eq!(documents.ty(), Ty::List(&DOCUMENT_DTO));
}

#[test]
fn flag_of_guarded_read_comes_from_the_guarded_value() {
    let projection = Expr::new_object(
        &DOCUMENT_DTO,
        vec![Binding::new("OwnerName", read(doc(), "Owner.Name"))],
    );
    let out = filter().apply(&projection);
    assert_eq!(
        out.binding("IsDeleted").unwrap().value.to_string(),
        "d.Owner.IsDeleted"
    );
}

#[test]
fn rewriting_is_idempotent() {
    let projections = [
        user_dto(documents_of(user()).to_list()),
        user_dto(read(user(), "Documents")),
        Expr::new_object(
            &DOCUMENT_DTO,
            vec![
                Binding::new("Title", read(doc(), "Title")),
                Binding::new("OwnerName", read(doc(), "Owner.Manager.Name")),
            ],
        ),
    ];
    for projection in projections {
        let once = filter().apply(&projection);
        let twice = filter().apply(&once);
        assert_eq!(once, twice, "second pass changed {once}");
    }
}

#[test]
fn existing_not_deleted_filter_is_kept() {
    let e = Expr::param("x", Ty::Object(&DOCUMENT));
    let predicate = read(e, "IsDeleted").equal(Expr::constant(Literal::Bool(false), Ty::Bool));
    let filtered = read(user(), "Documents")
        .where_(Expr::lambda("x", Ty::Object(&DOCUMENT), predicate))
        .to_list();
    let out = filter().apply(&user_dto(filtered.clone()));
    assert_eq!(out.binding("Documents").unwrap().value, filtered);
}

#[test]
fn input_tree_is_not_mutated() {
    let projection = user_dto(documents_of(user()).to_list());
    let before = projection.clone();
    let _ = filter().apply(&projection);
    assert_eq!(projection, before);
}

#[test]
fn explicit_flag_binding_is_never_overwritten() {
    let explicit = Expr::constant(Literal::Bool(false), Ty::Bool);
    let projection = Expr::new_object(
        &USER_DTO,
        vec![
            Binding::new("Name", read(user(), "Name")),
            Binding::new("IsDeleted", explicit.clone()),
        ],
    );
    let out = IsDeletedMappingVisitor::new(RewriteOptions::default()).rewrite(&projection);
    assert_eq!(out, projection);
    assert_eq!(out.binding("IsDeleted").unwrap().value, explicit);
}

#[test]
fn flag_stays_unbound_without_origin() {
    let projection = Expr::new_object(
        &USER_DTO,
        vec![Binding::new(
            "Name",
            Expr::constant(Literal::Str("anonymous".into()), Ty::Scalar("String")),
        )],
    );
    let out = IsDeletedMappingVisitor::new(RewriteOptions::default()).rewrite(&projection);
    assert!(out.binding("IsDeleted").is_none());
}

#[test]
fn origin_is_found_through_calls_conditionals_and_nested_objects() {
    let mapping = IsDeletedMappingVisitor::new(RewriteOptions::default());
    let flag_of = |projection: Expr| {
        mapping
            .rewrite(&projection)
            .binding("IsDeleted")
            .map(|b| b.value.to_string())
    };

    let described = Expr::call(
        Method::Named("Describe".into()),
        vec![doc()],
        Ty::Scalar("String"),
    );
    let via_call = Expr::new_object(&DOCUMENT_DTO, vec![Binding::new("Title", described)]);
    assert_eq!(flag_of(via_call).as_deref(), Some("d.IsDeleted"));

    let fallback = Expr::constant(Literal::Str("untitled".into()), Ty::Scalar("String"));
    let title = Expr::conditional(
        Expr::constant(Literal::Bool(true), Ty::Bool),
        read(doc(), "Title"),
        fallback,
    );
    let via_conditional = Expr::new_object(&DOCUMENT_DTO, vec![Binding::new("Title", title)]);
    assert_eq!(flag_of(via_conditional).as_deref(), Some("d.IsDeleted"));

    let manager = Expr::new_object(
        &USER_DTO,
        vec![Binding::new("Name", read(user(), "Manager.Name"))],
    );
    let via_nested = Expr::new_object(&USER_DTO, vec![Binding::new("Manager", manager)]);
    let out = mapping.rewrite(&via_nested);
    assert_eq!(
        out.binding("IsDeleted").unwrap().value.to_string(),
        "u.Manager.IsDeleted"
    );
    let inner = &out.binding("Manager").unwrap().value;
    assert_eq!(
        inner.binding("IsDeleted").unwrap().value.to_string(),
        "u.Manager.IsDeleted"
    );
}

#[test]
fn to_list_over_unfiltered_soft_sequence_is_removed() {
    let remover = ToListRemoverVisitor::new(RewriteOptions::default());

    let documents = read(user(), "Documents");
    assert_eq!(remover.rewrite(&documents.clone().to_list()), documents);

    let filtered = documents
        .where_(Expr::lambda(
            "e",
            Ty::Object(&DOCUMENT),
            read(Expr::param("e", Ty::Object(&DOCUMENT)), "IsDeleted").not(),
        ))
        .to_list();
    assert_eq!(remover.rewrite(&filtered), filtered);

    let tags = read(user(), "Tags").to_list();
    assert_eq!(remover.rewrite(&tags), tags);
}
