mod common;

use common::*;
use lambdac::ast::{BinOp, CompilationUnit, Stmt};
use lambdac::diagnostics::CompileError;
use lambdac::span::{Span, Spanned};
use lambdac::typeck::classify::LambdaKind;
use lambdac::typeck::closures::Ownership;
use lambdac::typeck::serializable::Serializability;

const HOST: &str = r#"
[[class]]
name = "Widget"
supertypes = ["Object"]

[[class]]
name = "Host"
supertypes = ["Object"]
[[class.field]]
name = "label"
type = "String"
[[class.field]]
name = "CACHE"
type = "Widget"
static = true
[[class.method]]
name = "run"

[[class]]
name = "Safe"
supertypes = ["Object", "Serializable"]
[[class.field]]
name = "count"
type = "int"
[[class.field]]
name = "widget"
type = "Widget"
[[class.method]]
name = "run"
"#;

fn in_class(b: &AstBuilder, class: &str, body: Vec<Spanned<Stmt>>) -> CompilationUnit {
    let run = b.method("run", &[], None, body);
    let file = format!("{class}.java");
    b.unit(&file, vec![b.class(class, Vec::new(), vec![run])])
}

fn not_serializable(err: CompileError) -> (String, String, Span) {
    match err {
        CompileError::NotSerializable { msg, class, span } => (msg, class, span),
        other => panic!("expected NotSerializable, got {other:?}"),
    }
}

// ========== Accepted captures ==========

#[test]
fn primitive_and_string_locals_are_serializable() {
    let b = AstBuilder::new();
    let prefix = b.local("String", "prefix", b.string("#"));
    let n = b.local("int", "n", b.int(3));
    let lambda = b.lambda(Vec::new(), b.binop(BinOp::Add, b.ident("prefix"), b.ident("n")));
    let span = lambda.span;
    let unit = in_class(&b, "Host", vec![prefix, n, b.local("SerializableSupplier<String>", "s", lambda)]);

    let analysis = analyze_ok(HOST, &unit);
    let binding = analysis.lambda_at(span).unwrap();
    assert!(binding.target.is_serializable_contract);
    assert_eq!(binding.serializability, Serializability::Verified);
    assert_eq!(binding.captures.len(), 2);
}

#[test]
fn boxed_local_is_serializable() {
    let b = AstBuilder::new();
    let boxed = b.local("Integer", "boxed", b.int(3));
    let lambda = b.lambda(Vec::new(), b.ident("boxed"));
    let span = lambda.span;
    let unit = in_class(&b, "Host", vec![boxed, b.local("SerializableSupplier<Integer>", "s", lambda)]);

    let analysis = analyze_ok(HOST, &unit);
    assert_eq!(analysis.lambda_at(span).unwrap().serializability, Serializability::Verified);
}

#[test]
fn capture_free_lambda_is_always_verified() {
    let b = AstBuilder::new();
    let lambda = b.lambda(Vec::new(), b.int(1));
    let span = lambda.span;
    let unit = in_class(&b, "Host", vec![b.local("SerializableSupplier<Integer>", "s", lambda)]);

    let analysis = analyze_ok(HOST, &unit);
    let binding = analysis.lambda_at(span).unwrap();
    assert!(binding.captures.is_empty());
    assert_eq!(binding.serializability, Serializability::Verified);
}

#[test]
fn static_fields_are_not_stored() {
    let b = AstBuilder::new();
    let lambda = b.lambda(Vec::new(), b.ident("CACHE"));
    let span = lambda.span;
    let unit = in_class(&b, "Host", vec![b.local("SerializableSupplier<Widget>", "s", lambda)]);

    let analysis = analyze_ok(HOST, &unit);
    let binding = analysis.lambda_at(span).unwrap();
    assert_eq!(binding.captures.get("CACHE").unwrap().ownership, Ownership::StaticField);
    assert_eq!(binding.serializability, Serializability::Verified);
}

#[test]
fn serializable_enclosing_instance() {
    let b = AstBuilder::new();
    let lambda = b.lambda(Vec::new(), b.ident("count"));
    let span = lambda.span;
    let cast = b.cast(vec![b.ty("Supplier<Integer>"), b.ty("Serializable")], lambda);
    let unit = in_class(&b, "Safe", vec![b.expr_stmt(cast)]);

    let analysis = analyze_ok(HOST, &unit);
    let binding = analysis.lambda_at(span).unwrap();
    assert!(binding.captures.captures_this());
    assert_eq!(binding.serializability, Serializability::Verified);
}

#[test]
fn abstract_class_with_serializable_contract() {
    let b = AstBuilder::new();
    let prefix = b.local("String", "prefix", b.string("#"));
    let lambda = b.lambda(vec![b.param("n")], b.ident("prefix"));
    let span = lambda.span;
    let unit = in_class(&b, "Host", vec![prefix, b.local("SerializableTask", "t", lambda)]);

    let analysis = analyze_ok(HOST, &unit);
    let binding = analysis.lambda_at(span).unwrap();
    assert_eq!(binding.kind, LambdaKind::ClosureObject);
    assert_eq!(binding.serializability, Serializability::Verified);
}

// ========== Rejected captures ==========

#[test]
fn non_serializable_enclosing_instance() {
    let b = AstBuilder::new();
    let lambda = b.lambda(Vec::new(), b.ident("label"));
    let span = lambda.span;
    let unit = in_class(&b, "Host", vec![b.local("SerializableSupplier<String>", "s", lambda)]);

    let (msg, class, at) = not_serializable(analyze_err(HOST, &unit));
    assert_eq!(class, "Host");
    assert_eq!(at, span);
    assert!(msg.contains("enclosing instance"), "{msg}");
}

#[test]
fn same_capture_without_contract_is_not_checked() {
    let b = AstBuilder::new();
    let lambda = b.lambda(Vec::new(), b.ident("label"));
    let span = lambda.span;
    let unit = in_class(&b, "Host", vec![b.local("Supplier<String>", "s", lambda)]);

    let analysis = analyze_ok(HOST, &unit);
    assert_eq!(analysis.lambda_at(span).unwrap().serializability, Serializability::NotRequired);
}

#[test]
fn non_serializable_local_names_its_class() {
    let b = AstBuilder::new();
    let w = b.local("Widget", "w", b.null());
    let lambda = b.lambda(Vec::new(), b.ident("w"));
    let unit = in_class(&b, "Host", vec![w, b.local("SerializableSupplier<Widget>", "s", lambda)]);

    let (msg, class, _) = not_serializable(analyze_err(HOST, &unit));
    assert_eq!(class, "Widget");
    assert!(msg.contains("'w'"), "{msg}");
}

#[test]
fn non_serializable_instance_field_of_serializable_class() {
    let b = AstBuilder::new();
    let lambda = b.lambda_block(Vec::new(), vec![b.expr_stmt(b.ident("widget"))]);
    let unit = in_class(&b, "Safe", vec![b.local("SerializableRunnable", "r", lambda)]);

    let (_, class, _) = not_serializable(analyze_err(HOST, &unit));
    assert_eq!(class, "Widget");
}
