mod common;

use common::*;
use lambdac::ast::{CompilationUnit, Stmt};
use lambdac::diagnostics::CompileError;
use lambdac::span::{Span, Spanned};
use lambdac::typeck::method_ref::MethodRefKind;
use lambdac::typeck::target::TargetSource;
use lambdac::typeck::types::Type;

const HOST: &str = r#"
[[class]]
name = "Host"
supertypes = ["Object"]
[[class.method]]
name = "run"
[[class.method]]
name = "helper"
returns = "int"
[[class.method]]
name = "main"
static = true
"#;

fn host(b: &AstBuilder, body: Vec<Spanned<Stmt>>) -> CompilationUnit {
    let run = b.method("run", &[], None, body);
    let class = b.class("Host", Vec::new(), vec![run]);
    b.unit("Host.java", vec![class])
}

fn conflict(err: CompileError) -> (String, String, Span) {
    match err {
        CompileError::TypeParameterConflict { msg, param, span } => (msg, param, span),
        other => panic!("expected TypeParameterConflict, got {other:?}"),
    }
}

// ========== Candidate selection ==========

#[test]
fn lambda_arity_selects_overload() {
    let b = AstBuilder::new();
    let runnable = b.lambda_block(Vec::new(), Vec::new());
    let runnable_span = runnable.span;
    let function = b.lambda(vec![b.param("s")], b.int(1));
    let function_span = function.span;
    let unit = host(
        &b,
        vec![
            b.expr_stmt(b.call(Some(b.ident("Executor")), "schedule", vec![runnable, b.int(5)])),
            b.expr_stmt(b.call(Some(b.ident("Executor")), "schedule", vec![function, b.int(5)])),
        ],
    );

    let analysis = analyze_ok(HOST, &unit);
    assert_eq!(analysis.lambda_at(runnable_span).unwrap().target.target, Type::class("Runnable"));
    let function = analysis.lambda_at(function_span).unwrap();
    assert_eq!(function.target.target.to_string(), "Function<String, Integer>");
    assert_eq!(function.param_types, vec![Type::string()]);
}

#[test]
fn equally_specific_candidates_are_ambiguous() {
    let b = AstBuilder::new();
    let call = b.call(Some(b.ident("Executor")), "submit", vec![b.lambda(Vec::new(), b.int(42))]);
    let unit = host(&b, vec![b.expr_stmt(call)]);

    match analyze_err(HOST, &unit) {
        CompileError::AmbiguousTarget { msg, .. } => {
            assert!(msg.contains("call to 'submit' is ambiguous"), "{msg}");
            assert!(msg.contains("submit(Runnable)"), "{msg}");
        }
        other => panic!("expected AmbiguousTarget, got {other:?}"),
    }
}

#[test]
fn plain_argument_rules_out_every_overload() {
    let b = AstBuilder::new();
    let call = b.call(Some(b.ident("Integer")), "parseInt", vec![b.int(5)]);
    let unit = host(&b, vec![b.expr_stmt(call)]);
    let err = analyze_err(HOST, &unit);
    assert!(err.to_string().contains("no applicable overload of 'parseInt' for arguments (int)"), "{err}");
}

#[test]
fn instance_method_from_static_context() {
    let b = AstBuilder::new();
    let main = b.static_method("main", &[], None, vec![b.expr_stmt(b.call(None, "helper", Vec::new()))]);
    let class = b.class("Host", Vec::new(), vec![main]);
    let unit = b.unit("Host.java", vec![class]);
    let err = analyze_err(HOST, &unit);
    assert!(err.to_string().contains("cannot call instance method 'helper' from a static context"), "{err}");
}

// ========== Type parameter inference ==========

#[test]
fn element_type_flows_from_list_into_comparator() {
    let b = AstBuilder::new();
    let names = b.local("List<String>", "names", b.null());
    let lambda = b.lambda(
        vec![b.param("a"), b.param("b")],
        b.call(Some(b.ident("a")), "compareTo", vec![b.ident("b")]),
    );
    let span = lambda.span;
    let call = b.call(Some(b.ident("Collections")), "sort", vec![b.ident("names"), lambda]);
    let unit = host(&b, vec![names, b.expr_stmt(call)]);

    let analysis = analyze_ok(HOST, &unit);
    let binding = analysis.lambda_at(span).unwrap();
    assert_eq!(binding.target.source, TargetSource::Argument);
    assert_eq!(binding.target.target.to_string(), "Comparator<String>");
    assert_eq!(binding.param_types, vec![Type::string(), Type::string()]);
    assert_eq!(binding.return_type, Type::int());
}

#[test]
fn result_type_inferred_from_lambda_body() {
    let b = AstBuilder::new();
    let stream = b.local("Stream<String>", "words", b.null());
    let lambda = b.lambda(vec![b.param("w")], b.call(Some(b.ident("w")), "length", Vec::new()));
    let span = lambda.span;
    let call = b.call(Some(b.ident("words")), "map", vec![lambda]);
    let unit = host(&b, vec![stream, b.local("Stream<Integer>", "lengths", call)]);

    let analysis = analyze_ok(HOST, &unit);
    let binding = analysis.lambda_at(span).unwrap();
    assert_eq!(binding.target.target.to_string(), "Function<String, Integer>");
}

#[test]
fn plain_argument_and_lambda_infer_together() {
    let b = AstBuilder::new();
    let lambda = b.lambda(vec![b.param("s")], b.call(Some(b.ident("s")), "length", Vec::new()));
    let span = lambda.span;
    let call = b.call(Some(b.ident("Util")), "transform", vec![b.string("abc"), lambda]);
    let unit = host(&b, vec![b.local("Integer", "n", call)]);

    let analysis = analyze_ok(HOST, &unit);
    let binding = analysis.lambda_at(span).unwrap();
    assert_eq!(binding.target.target.to_string(), "Function<String, Integer>");
    assert_eq!(binding.param_types, vec![Type::string()]);
}

#[test]
fn explicit_lambda_parameter_constrains_inference() {
    let b = AstBuilder::new();
    let lambda = b.lambda(vec![b.typed_param("String", "s")], b.call(Some(b.ident("s")), "isEmpty", Vec::new()));
    let span = lambda.span;
    let call = b.call(Some(b.ident("Util")), "transform", vec![b.null(), lambda]);
    let unit = host(&b, vec![b.local("Boolean", "empty", call)]);

    let analysis = analyze_ok(HOST, &unit);
    assert_eq!(analysis.lambda_at(span).unwrap().target.target.to_string(), "Function<String, Boolean>");
}

#[test]
fn method_reference_shape_constrains_inference() {
    let b = AstBuilder::new();
    let mref = b.type_ref("String", "length");
    let span = mref.span;
    let call = b.call(Some(b.ident("Util")), "transform", vec![b.string("abc"), mref]);
    let unit = host(&b, vec![b.local("Integer", "n", call)]);

    let analysis = analyze_ok(HOST, &unit);
    let binding = analysis.method_ref_at(span).unwrap();
    assert_eq!(binding.kind, MethodRefKind::Unbound);
    assert_eq!(binding.target.target.to_string(), "Function<String, Integer>");
}

#[test]
fn sibling_lambdas_agree_on_shared_parameter() {
    let b = AstBuilder::new();
    let first = b.lambda(Vec::new(), b.int(1));
    let second = b.lambda(Vec::new(), b.int(2));
    let (first_span, second_span) = (first.span, second.span);
    let call = b.call(Some(b.ident("Util")), "combine", vec![first, second]);
    let unit = host(&b, vec![b.local("Integer", "n", call)]);

    let analysis = analyze_ok(HOST, &unit);
    for span in [first_span, second_span] {
        assert_eq!(analysis.lambda_at(span).unwrap().target.target.to_string(), "Supplier<Integer>");
    }
}

#[test]
fn sibling_lambdas_conflict_on_shared_parameter() {
    let b = AstBuilder::new();
    let first = b.lambda(Vec::new(), b.int(1));
    let second = b.lambda(Vec::new(), b.string("two"));
    let second_span = second.span;
    let call = b.call(Some(b.ident("Util")), "combine", vec![first, second]);
    let unit = host(&b, vec![b.expr_stmt(call)]);

    let (msg, param, span) = conflict(analyze_err(HOST, &unit));
    assert_eq!(param, "T");
    assert_eq!(span, second_span);
    assert!(msg.contains("Integer conflicts with String"), "{msg}");
}

#[test]
fn inferred_type_outside_bound() {
    let b = AstBuilder::new();
    let call = b.call(Some(b.ident("Util")), "largest", vec![b.lambda(Vec::new(), b.string("big"))]);
    let unit = host(&b, vec![b.expr_stmt(call)]);

    let (msg, param, _) = conflict(analyze_err(HOST, &unit));
    assert_eq!(param, "N");
    assert!(msg.contains("not within its bound Number"), "{msg}");
}

#[test]
fn inferred_type_within_bound() {
    let b = AstBuilder::new();
    let lambda = b.lambda(Vec::new(), b.int(7));
    let span = lambda.span;
    let call = b.call(Some(b.ident("Util")), "largest", vec![lambda]);
    let unit = host(&b, vec![b.local("Integer", "n", call)]);

    let analysis = analyze_ok(HOST, &unit);
    assert_eq!(analysis.lambda_at(span).unwrap().target.target.to_string(), "Supplier<Integer>");
}

#[test]
fn speculative_checks_leave_no_duplicate_bindings() {
    let b = AstBuilder::new();
    let inner = b.lambda_block(Vec::new(), Vec::new());
    let outer = b.lambda(Vec::new(), b.cast(vec![b.ty("Runnable")], inner));
    let call = b.call(Some(b.ident("Util")), "combine", vec![outer, b.lambda(Vec::new(), b.null())]);
    let unit = host(&b, vec![b.expr_stmt(call)]);

    let analysis = analyze_ok(HOST, &unit);
    assert_eq!(analysis.lambdas.len(), 3);
}
