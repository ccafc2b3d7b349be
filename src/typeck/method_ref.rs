//! Method references (`Type::m`, `expr::m`, `this::m`).

use serde::Serialize;

use crate::ast::{Expr, MethodRefTarget};
use crate::diagnostics::CompileError;
use crate::span::{Span, Spanned};
use super::env::TypeEnv;
use super::infer::infer_expr;
use super::resolve::resolve_annotation;
use super::target::{resolve_target, FunctionalInterface, TargetQuery};
use super::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MethodRefKind {
    /// `Type::staticMethod`
    Static,
    /// `expr::method`; the receiver is evaluated once, at creation.
    Bound,
    /// `Type::instanceMethod`; the first argument is the receiver.
    Unbound,
}

/// The function a method reference denotes for one arity.
#[derive(Debug, Clone, PartialEq)]
pub struct RefShape {
    pub owner: Type,
    pub kind: MethodRefKind,
    pub params: Vec<Type>,
    pub return_type: Type,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodRefBinding {
    pub span: Span,
    pub target: FunctionalInterface,
    pub owner: Type,
    pub method: String,
    pub kind: MethodRefKind,
}

/// Every shape `target::method` can take when called with `arity` arguments.
pub(crate) fn shapes(
    target: &MethodRefTarget,
    method: &str,
    arity: usize,
    env: &mut TypeEnv,
) -> Result<Vec<RefShape>, CompileError> {
    let mut out = Vec::new();
    match target {
        MethodRefTarget::Type(te) => {
            let receiver = resolve_annotation(te, env)?;
            if !matches!(receiver, Type::Class { .. }) {
                return Err(CompileError::type_err(format!("{receiver} has no methods"), te.span));
            }
            for candidate in env.types.methods(&receiver, method) {
                let m = &candidate.method;
                let params: Vec<Type> = m.params.iter().map(|p| env.types.erase(p, &m.type_params)).collect();
                let return_type = env.types.erase(&m.return_type, &m.type_params);
                if m.is_static && params.len() == arity {
                    out.push(RefShape { owner: candidate.owner.clone(), kind: MethodRefKind::Static, params, return_type });
                } else if !m.is_static && params.len() + 1 == arity {
                    let mut with_receiver = vec![receiver.clone()];
                    with_receiver.extend(params);
                    out.push(RefShape {
                        owner: candidate.owner.clone(),
                        kind: MethodRefKind::Unbound,
                        params: with_receiver,
                        return_type,
                    });
                }
            }
        }
        MethodRefTarget::Expr(receiver_expr) => {
            let receiver = infer_expr(receiver_expr, env, &TargetQuery::none())?.boxed();
            if !matches!(receiver, Type::Class { .. }) {
                return Err(CompileError::type_err(format!("{receiver} has no methods"), receiver_expr.span));
            }
            for candidate in env.types.methods(&receiver, method) {
                let m = &candidate.method;
                if m.is_static || m.params.len() != arity {
                    continue;
                }
                out.push(RefShape {
                    owner: candidate.owner.clone(),
                    kind: MethodRefKind::Bound,
                    params: m.params.iter().map(|p| env.types.erase(p, &m.type_params)).collect(),
                    return_type: env.types.erase(&m.return_type, &m.type_params),
                });
            }
        }
    }
    Ok(out)
}

/// Check a method reference in the given context and record its binding.
pub(crate) fn check_method_ref(
    span: Span,
    target: &MethodRefTarget,
    method: &Spanned<String>,
    query: &TargetQuery,
    env: &mut TypeEnv,
) -> Result<Type, CompileError> {
    let fi = resolve_target(query, span, &env.types)?;
    let candidates = shapes(target, &method.node, fi.arity(), env)?;
    let shown = format!("{}::{}", display_ref_target(target), method.node);
    if candidates.is_empty() {
        return Err(CompileError::type_err(
            format!("no method {shown} takes {} arguments as required by {}", fi.arity(), fi.display_target()),
            method.span,
        ));
    }

    let params_fit = |shape: &RefShape| {
        fi.params.iter().zip(&shape.params).all(|(supplied, accepted)| env.types.is_assignable(supplied, accepted))
    };
    let applicable: Vec<&RefShape> = candidates.iter().filter(|s| params_fit(s)).collect();
    if applicable.is_empty() {
        return Err(CompileError::type_err(
            format!("{shown} cannot accept the arguments of {}", fi.display_target()),
            method.span,
        ));
    }
    let chosen = most_specific(&applicable, env).ok_or_else(|| {
        CompileError::ambiguous(format!("{shown} matches more than one method for {}", fi.display_target()), span)
    })?;
    if !env.types.is_return_compatible(&chosen.return_type, &fi.return_type) {
        return Err(CompileError::return_mismatch(
            format!("{shown} returns {}, expected {}", chosen.return_type, fi.return_type),
            method.span,
        ));
    }

    tracing::debug!(reference = %shown, target = %fi.display_target(), kind = ?chosen.kind, "resolved method reference");
    let ty = fi.target.clone();
    let binding = MethodRefBinding {
        span,
        target: fi,
        owner: chosen.owner.clone(),
        method: method.node.clone(),
        kind: chosen.kind,
    };
    env.recorded.method_refs.insert(span.key(), binding);
    Ok(ty)
}

/// The shape whose parameters all other shapes accept.
fn most_specific<'s>(shapes: &[&'s RefShape], env: &TypeEnv) -> Option<&'s RefShape> {
    if let [only] = shapes {
        return Some(*only);
    }
    let winners: Vec<&RefShape> = shapes
        .iter()
        .copied()
        .filter(|a| {
            shapes.iter().all(|b| {
                a.params.iter().zip(&b.params).all(|(pa, pb)| env.types.is_assignable(pa, pb))
            })
        })
        .collect();
    match winners.as_slice() {
        [one] => Some(*one),
        _ => None,
    }
}

fn display_ref_target(target: &MethodRefTarget) -> String {
    match target {
        MethodRefTarget::Type(te) => te.node.to_string(),
        MethodRefTarget::Expr(e) => match &e.node {
            Expr::This => "this".to_string(),
            Expr::Ident(name) => name.clone(),
            _ => "<expr>".to_string(),
        },
    }
}
