//! Parameter and return type inference for a lambda bound to a resolved target.

use crate::ast::{Block, Expr, LambdaBody, LambdaExpr, Stmt};
use crate::diagnostics::CompileError;
use crate::span::Span;
use super::classify::classify;
use super::closures::collect_captures;
use super::env::{LambdaFrame, ReturnFrame, TypeEnv};
use super::infer::{check_block, infer_expr};
use super::resolve::resolve_annotation;
use super::serializable;
use super::target::{resolve_target, FunctionalInterface, TargetQuery};
use super::types::Type;
use super::LambdaBinding;

/// Check a lambda in the given context, record its binding, and return the
/// type the lambda expression evaluates to.
pub(crate) fn check_lambda(
    lambda: &LambdaExpr,
    span: Span,
    query: &TargetQuery,
    env: &mut TypeEnv,
) -> Result<Type, CompileError> {
    let target = resolve_target(query, span, &env.types)?;
    let binding = analyze_lambda(lambda, span, target, env)?;
    let ty = binding.target.target.clone();
    env.recorded.lambda_bindings.insert(span.key(), binding);
    Ok(ty)
}

pub(crate) fn analyze_lambda(
    lambda: &LambdaExpr,
    span: Span,
    target: FunctionalInterface,
    env: &mut TypeEnv,
) -> Result<LambdaBinding, CompileError> {
    let param_types = infer_params(lambda, &target, span, env)?;
    let return_type = check_body(lambda, span, &param_types, Some(&target.return_type), env)?;
    let captures = collect_captures(lambda, span, env);
    let kind = classify(&target);
    let serializability = serializable::qualify(&target, &captures, span, &env.types)?;

    tracing::debug!(
        target = %target.display_target(),
        params = ?param_types.iter().map(ToString::to_string).collect::<Vec<_>>(),
        returns = %return_type,
        captures = captures.len(),
        kind = ?kind,
        serializability = ?serializability,
        "analyzed lambda"
    );

    Ok(LambdaBinding {
        span,
        target,
        param_types,
        return_type,
        captures,
        kind,
        serializability,
    })
}

/// Implicit parameters take the target's parameter types verbatim; explicit
/// ones must accept every value the target method supplies.
pub(crate) fn infer_params(
    lambda: &LambdaExpr,
    target: &FunctionalInterface,
    span: Span,
    env: &TypeEnv,
) -> Result<Vec<Type>, CompileError> {
    if lambda.params.len() != target.arity() {
        return Err(CompileError::arity(
            format!(
                "lambda has {} parameters but {}.{} expects {}",
                lambda.params.len(),
                target.display_target(),
                target.method,
                target.arity()
            ),
            span,
        ));
    }

    let mut types = Vec::with_capacity(lambda.params.len());
    for (param, expected) in lambda.params.iter().zip(&target.params) {
        match &param.ty {
            None => types.push(expected.clone()),
            Some(annotation) => {
                let declared = resolve_annotation(annotation, env)?;
                if !env.types.is_assignable(expected, &declared) {
                    return Err(CompileError::param_mismatch(
                        expected.to_string(),
                        param.name.node.clone(),
                        param.name.span,
                    ));
                }
                types.push(declared);
            }
        }
    }
    Ok(types)
}

/// Declared parameter types, if every parameter has one.
pub(crate) fn explicit_params(lambda: &LambdaExpr, env: &TypeEnv) -> Result<Option<Vec<Type>>, CompileError> {
    let mut types = Vec::with_capacity(lambda.params.len());
    for param in &lambda.params {
        let Some(annotation) = &param.ty else { return Ok(None) };
        types.push(resolve_annotation(annotation, env)?);
    }
    Ok(Some(types))
}

/// Check the body with `params` in scope and return the lambda's return type.
///
/// `expected` is the target's return type; `None` means it is still being
/// inferred, in which case returned types are only collected.
pub(crate) fn check_body(
    lambda: &LambdaExpr,
    span: Span,
    params: &[Type],
    expected: Option<&Type>,
    env: &mut TypeEnv,
) -> Result<Type, CompileError> {
    let outer_depth = env.scope_depth();
    env.push_scope();
    for (param, ty) in lambda.params.iter().zip(params) {
        env.define(param.name.node.clone(), ty.clone(), param.name.span);
    }
    env.lambda_frames.push(LambdaFrame { span, outer_depth });

    let result = body_type(lambda, expected, env);
    env.lambda_frames.pop();
    env.pop_scope();
    result
}

fn body_type(lambda: &LambdaExpr, expected: Option<&Type>, env: &mut TypeEnv) -> Result<Type, CompileError> {
    match &lambda.body {
        LambdaBody::Expr(body) => {
            let query = match expected {
                Some(ty) if *ty != Type::Void => TargetQuery::declared(ty.clone()),
                _ => TargetQuery::none(),
            };
            let found = infer_expr(body, env, &query)?;
            match expected {
                // The value of an expression body is discarded for void targets.
                Some(Type::Void) => Ok(Type::Void),
                Some(expected) if !env.types.is_return_compatible(&found, expected) => Err(CompileError::return_mismatch(
                    format!("lambda body has type {found}, expected {expected}"),
                    body.span,
                )),
                _ => Ok(found),
            }
        }
        LambdaBody::Block(block) => {
            env.return_frames.push(ReturnFrame {
                expected: expected.cloned().unwrap_or(Type::Void),
                is_lambda: true,
                collect_only: expected.is_none(),
                found: Vec::new(),
            });
            let checked = check_block(block, env);
            let found = env.return_frames.pop().map(|f| f.found).unwrap_or_default();
            checked?;
            match expected {
                Some(Type::Void) => Ok(Type::Void),
                Some(expected) if found.is_empty() => Err(CompileError::return_mismatch(
                    format!("lambda body returns no value, expected {expected}"),
                    block.span,
                )),
                Some(expected) if !all_paths_return(&block.node) => Err(CompileError::return_mismatch(
                    format!("lambda body can complete without returning a value, expected {expected}"),
                    block.span,
                )),
                Some(expected) => Ok(common_type(&found).unwrap_or_else(|| expected.clone())),
                None => Ok(common_type(&found).unwrap_or(Type::Void)),
            }
        }
    }
}

/// Whether every path through `block` ends in a `return`. There is no
/// `break`, so `while (true)` never completes normally.
fn all_paths_return(block: &Block) -> bool {
    block.stmts.iter().any(|stmt| match &stmt.node {
        Stmt::Return(_) => true,
        Stmt::If { then_block, else_block: Some(else_block), .. } => {
            all_paths_return(&then_block.node) && all_paths_return(&else_block.node)
        }
        Stmt::While { condition, .. } => matches!(condition.node, Expr::BoolLit(true)),
        _ => false,
    })
}

/// The single type returned by every `return` of a block body.
fn common_type(found: &[Type]) -> Option<Type> {
    let first = found.first()?;
    found.iter().all(|t| t == first).then(|| first.clone())
}
