mod common;

use common::*;
use lambdac::ast::{BinOp, CompilationUnit, Stmt};
use lambdac::diagnostics::CompileError;
use lambdac::span::Spanned;
use lambdac::typeck::method_ref::MethodRefKind;
use lambdac::typeck::target::TargetSource;
use lambdac::typeck::types::{Primitive, Type};

const HOST: &str = r#"
[[class]]
name = "Host"
supertypes = ["Object"]
[[class.method]]
name = "run"
"#;

fn host(b: &AstBuilder, body: Vec<Spanned<Stmt>>) -> CompilationUnit {
    let run = b.method("run", &[], None, body);
    let class = b.class("Host", Vec::new(), vec![run]);
    b.unit("Host.java", vec![class])
}

// ========== Parameters ==========

#[test]
fn implicit_parameters_take_target_types_in_order() {
    let b = AstBuilder::new();
    let lambda = b.lambda(
        vec![b.param("n"), b.param("s")],
        b.call(Some(b.ident("s")), "concat", vec![b.string("!")]),
    );
    let span = lambda.span;
    let unit = host(&b, vec![b.local("BiFunction<Integer, String, String>", "f", lambda)]);

    let analysis = analyze_ok(HOST, &unit);
    let binding = analysis.lambda_at(span).unwrap();
    assert_eq!(binding.param_types, vec![Type::class("Integer"), Type::string()]);
    assert_eq!(binding.return_type, Type::string());
}

#[test]
fn explicit_primitive_parameters_accept_boxed_arguments() {
    let b = AstBuilder::new();
    let lambda = b.lambda(
        vec![b.typed_param("int", "a"), b.typed_param("int", "b")],
        b.binop(BinOp::Sub, b.ident("a"), b.ident("b")),
    );
    let span = lambda.span;
    let unit = host(&b, vec![b.local("Comparator<Integer>", "c", lambda)]);

    let analysis = analyze_ok(HOST, &unit);
    let binding = analysis.lambda_at(span).unwrap();
    assert_eq!(binding.param_types, vec![Type::int(), Type::int()]);
}

#[test]
fn explicit_supertype_parameter_is_accepted() {
    let b = AstBuilder::new();
    let lambda = b.lambda(vec![b.typed_param("Object", "o")], b.boolean(true));
    let span = lambda.span;
    let unit = host(&b, vec![b.local("Predicate<String>", "p", lambda)]);

    let analysis = analyze_ok(HOST, &unit);
    assert_eq!(analysis.lambda_at(span).unwrap().param_types, vec![Type::class("Object")]);
}

#[test]
fn explicit_parameter_mismatch_names_parameter() {
    let b = AstBuilder::new();
    let lambda = b.lambda(vec![b.typed_param("Integer", "value")], b.boolean(true));
    let unit = host(&b, vec![b.local("Predicate<String>", "p", lambda)]);

    match analyze_err(HOST, &unit) {
        CompileError::ParameterTypeMismatch { expected, param, .. } => {
            assert_eq!(param, "value");
            assert_eq!(expected, "String");
        }
        other => panic!("expected ParameterTypeMismatch, got {other:?}"),
    }
}

#[test]
fn arity_mismatch() {
    let b = AstBuilder::new();
    let lambda = b.lambda(vec![b.param("a")], b.int(0));
    let unit = host(&b, vec![b.local("Comparator<Integer>", "c", lambda)]);

    match analyze_err(HOST, &unit) {
        CompileError::ArityMismatch { msg, .. } => {
            assert!(msg.contains("lambda has 1 parameters"), "{msg}");
            assert!(msg.contains("Comparator<Integer>.compare expects 2"), "{msg}");
        }
        other => panic!("expected ArityMismatch, got {other:?}"),
    }
}

// ========== Return types ==========

#[test]
fn expression_body_return_mismatch() {
    let b = AstBuilder::new();
    let unit = host(&b, vec![b.local("Supplier<Integer>", "s", b.lambda(Vec::new(), b.string("x")))]);
    assert!(matches!(analyze_err(HOST, &unit), CompileError::ReturnTypeMismatch { .. }));
}

#[test]
fn void_target_discards_expression_value() {
    let b = AstBuilder::new();
    let lambda = b.lambda(vec![b.param("s")], b.call(Some(b.ident("s")), "length", Vec::new()));
    let span = lambda.span;
    let unit = host(&b, vec![b.local("Consumer<String>", "c", lambda)]);

    let analysis = analyze_ok(HOST, &unit);
    assert_eq!(analysis.lambda_at(span).unwrap().return_type, Type::Void);
}

#[test]
fn block_body_with_several_returns() {
    let b = AstBuilder::new();
    let lambda = b.lambda_block(
        vec![b.param("s")],
        vec![
            b.if_(
                b.call(Some(b.ident("s")), "isEmpty", Vec::new()),
                vec![b.ret(Some(b.int(0)))],
                None,
            ),
            b.ret(Some(b.call(Some(b.ident("s")), "length", Vec::new()))),
        ],
    );
    let span = lambda.span;
    let unit = host(&b, vec![b.local("Function<String, Integer>", "len", lambda)]);

    let analysis = analyze_ok(HOST, &unit);
    let binding = analysis.lambda_at(span).unwrap();
    assert_eq!(binding.return_type, Type::int());
}

#[test]
fn block_body_without_return_value() {
    let b = AstBuilder::new();
    let lambda = b.lambda_block(vec![b.param("s")], vec![b.expr_stmt(b.call(Some(b.ident("s")), "length", Vec::new()))]);
    let unit = host(&b, vec![b.local("Function<String, Integer>", "len", lambda)]);

    match analyze_err(HOST, &unit) {
        CompileError::ReturnTypeMismatch { msg, .. } => assert!(msg.contains("returns no value"), "{msg}"),
        other => panic!("expected ReturnTypeMismatch, got {other:?}"),
    }
}

#[test]
fn block_body_missing_return_on_one_path() {
    let b = AstBuilder::new();
    let lambda = b.lambda_block(
        vec![b.param("n")],
        vec![b.if_(b.boolean(true), vec![b.ret(Some(b.int(1)))], None)],
    );
    let unit = host(&b, vec![b.local("Function<Integer, Integer>", "f", lambda)]);

    match analyze_err(HOST, &unit) {
        CompileError::ReturnTypeMismatch { msg, .. } => {
            assert!(msg.contains("can complete without returning a value, expected Integer"), "{msg}")
        }
        other => panic!("expected ReturnTypeMismatch, got {other:?}"),
    }
}

#[test]
fn block_body_returning_on_every_branch() {
    let b = AstBuilder::new();
    let branches = b.lambda_block(
        vec![b.param("n")],
        vec![b.if_(b.boolean(false), vec![b.ret(Some(b.int(1)))], Some(vec![b.ret(Some(b.int(2)))]))],
    );
    let branches_span = branches.span;
    let forever = b.lambda_block(vec![b.param("n")], vec![b.while_(b.boolean(true), vec![b.ret(Some(b.int(3)))])]);
    let forever_span = forever.span;
    let unit = host(
        &b,
        vec![
            b.local("Function<Integer, Integer>", "f", branches),
            b.local("Function<Integer, Integer>", "g", forever),
        ],
    );

    let analysis = analyze_ok(HOST, &unit);
    assert_eq!(analysis.lambda_at(branches_span).unwrap().return_type, Type::int());
    assert_eq!(analysis.lambda_at(forever_span).unwrap().return_type, Type::int());
}

#[test]
fn block_body_returns_wrong_type() {
    let b = AstBuilder::new();
    let lambda = b.lambda_block(vec![b.param("s")], vec![b.ret(Some(b.ident("s")))]);
    let unit = host(&b, vec![b.local("Function<String, Integer>", "len", lambda)]);

    match analyze_err(HOST, &unit) {
        CompileError::ReturnTypeMismatch { msg, .. } => assert!(msg.contains("returned String, expected Integer"), "{msg}"),
        other => panic!("expected ReturnTypeMismatch, got {other:?}"),
    }
}

#[test]
fn long_operand_promotes_result() {
    let b = AstBuilder::new();
    let lambda = b.lambda(vec![b.param("n")], b.binop(BinOp::Mul, b.ident("n"), b.long(2)));
    let span = lambda.span;
    let unit = host(&b, vec![b.local("Function<Integer, Long>", "twice", lambda)]);

    let analysis = analyze_ok(HOST, &unit);
    assert_eq!(analysis.lambda_at(span).unwrap().return_type, Type::Prim(Primitive::Long));
}

// ========== Nesting ==========

#[test]
fn nested_lambda_takes_outer_return_type_as_target() {
    let b = AstBuilder::new();
    let inner = b.lambda_block(Vec::new(), Vec::new());
    let inner_span = inner.span;
    let outer = b.lambda(Vec::new(), inner);
    let outer_span = outer.span;
    let unit = host(&b, vec![b.local("Supplier<Runnable>", "s", outer)]);

    let analysis = analyze_ok(HOST, &unit);
    assert_eq!(analysis.lambdas.len(), 2);
    let inner = analysis.lambda_at(inner_span).unwrap();
    assert_eq!(inner.target.target, Type::class("Runnable"));
    assert_eq!(inner.target.source, TargetSource::Declared);
    assert_eq!(analysis.lambda_at(outer_span).unwrap().return_type, Type::class("Runnable"));
}

#[test]
fn nested_error_aborts_outer_lambda() {
    let b = AstBuilder::new();
    let outer = b.lambda(Vec::new(), b.lambda(Vec::new(), b.string("x")));
    let unit = host(&b, vec![b.local("Supplier<Supplier<Integer>>", "s", outer)]);
    assert!(matches!(analyze_err(HOST, &unit), CompileError::ReturnTypeMismatch { .. }));
}

// ========== Method references ==========

#[test]
fn unbound_reference_takes_receiver_first() {
    let b = AstBuilder::new();
    let mref = b.type_ref("String", "length");
    let span = mref.span;
    let unit = host(&b, vec![b.local("Function<String, Integer>", "len", mref)]);

    let analysis = analyze_ok(HOST, &unit);
    let binding = analysis.method_ref_at(span).unwrap();
    assert_eq!(binding.kind, MethodRefKind::Unbound);
    assert_eq!(binding.method, "length");
    assert_eq!(binding.owner, Type::string());
}

#[test]
fn static_reference() {
    let b = AstBuilder::new();
    let mref = b.type_ref("Integer", "sum");
    let span = mref.span;
    let unit = host(&b, vec![b.local("BinaryOperator<Integer>", "add", mref)]);

    let analysis = analyze_ok(HOST, &unit);
    assert_eq!(analysis.method_ref_at(span).unwrap().kind, MethodRefKind::Static);
}

#[test]
fn bound_reference_on_local() {
    let b = AstBuilder::new();
    let prefix = b.local("String", "prefix", b.string(">"));
    let mref = b.expr_ref(b.ident("prefix"), "concat");
    let span = mref.span;
    let unit = host(&b, vec![prefix, b.local("UnaryOperator<String>", "mark", mref)]);

    let analysis = analyze_ok(HOST, &unit);
    let binding = analysis.method_ref_at(span).unwrap();
    assert_eq!(binding.kind, MethodRefKind::Bound);
    assert_eq!(binding.target.target.to_string(), "UnaryOperator<String>");
}

#[test]
fn reference_return_mismatch() {
    let b = AstBuilder::new();
    let unit = host(&b, vec![b.local("Function<String, String>", "f", b.type_ref("String", "length"))]);
    match analyze_err(HOST, &unit) {
        CompileError::ReturnTypeMismatch { msg, .. } => assert!(msg.contains("String::length returns int"), "{msg}"),
        other => panic!("expected ReturnTypeMismatch, got {other:?}"),
    }
}

#[test]
fn reference_with_no_matching_arity() {
    let b = AstBuilder::new();
    let unit = host(&b, vec![b.local("Supplier<Integer>", "s", b.type_ref("Integer", "sum"))]);
    let err = analyze_err(HOST, &unit);
    assert!(err.to_string().contains("takes 0 arguments"), "{err}");
}

// ========== Body typing ==========

#[test]
fn body_statement_errors_surface() {
    let b = AstBuilder::new();
    let lambda = b.lambda_block(Vec::new(), vec![b.local("int", "x", b.string("no"))]);
    let unit = host(&b, vec![b.local("Runnable", "r", lambda)]);
    let err = analyze_err(HOST, &unit);
    assert_eq!(err.kind(), "type");
    assert!(err.to_string().contains("cannot initialize 'x'"), "{err}");
}

#[test]
fn undefined_name_in_body() {
    let b = AstBuilder::new();
    let lambda = b.lambda(Vec::new(), b.ident("missing"));
    let unit = host(&b, vec![b.local("Supplier<String>", "s", lambda)]);
    assert!(analyze_err(HOST, &unit).to_string().contains("undefined variable 'missing'"));
}
