//! Expression and statement typing for method bodies.
//!
//! This is the minimal typer the lambda analysis needs: enough to type
//! lambda bodies and the non-functional arguments of calls, and to record
//! what every name resolves to.

use crate::ast::{BinOp, Block, Expr, Stmt, TypeExpr};
use crate::diagnostics::CompileError;
use crate::span::{Span, Spanned};
use super::env::{Resolution, TypeEnv};
use super::lambda::check_lambda;
use super::method_ref::check_method_ref;
use super::overload::{check_call, Receiver};
use super::resolve::resolve_annotation;
use super::target::TargetQuery;
use super::types::{Primitive, Type};

pub(crate) fn infer_expr(expr: &Spanned<Expr>, env: &mut TypeEnv, query: &TargetQuery) -> Result<Type, CompileError> {
    let span = expr.span;
    match &expr.node {
        Expr::IntLit(_) => Ok(Type::int()),
        Expr::LongLit(_) => Ok(Type::Prim(Primitive::Long)),
        Expr::DoubleLit(_) => Ok(Type::Prim(Primitive::Double)),
        Expr::BoolLit(_) => Ok(Type::boolean()),
        Expr::StringLit(_) => Ok(Type::string()),
        Expr::Null => Ok(Type::Null),
        Expr::Ident(name) => infer_ident(name, span, env),
        Expr::This => match &env.this_type {
            Some(ty) => Ok(ty.clone()),
            None => Err(CompileError::type_err("cannot use 'this' in a static context", span)),
        },
        Expr::FieldAccess { object, field } => infer_field_access(object, field, span, env),
        Expr::MethodCall { object, method, type_args, args } => {
            let receiver = match object {
                None => Receiver::Implicit,
                Some(object) => receiver_of(object, env)?,
            };
            check_call(span, receiver, method, type_args, args, env)
        }
        Expr::BinOp { op, lhs, rhs } => {
            let l = infer_expr(lhs, env, &TargetQuery::none())?;
            let r = infer_expr(rhs, env, &TargetQuery::none())?;
            binop_type(*op, &l, &r, span)
        }
        Expr::Assign { target, op, value } => infer_assign(target, *op, value, env),
        Expr::Cast { target_types, expr: inner } => infer_cast(target_types, inner, query, span, env),
        Expr::Lambda(lambda) => check_lambda(lambda, span, query, env),
        Expr::MethodRef { target, method } => check_method_ref(span, target, method, query, env),
    }
}

fn infer_ident(name: &str, span: Span, env: &mut TypeEnv) -> Result<Type, CompileError> {
    if let Some((info, depth)) = env.lookup_with_depth(name) {
        let (ty, decl) = (info.ty.clone(), info.decl);
        env.note_local_use(name, decl, depth);
        env.resolve(span, Resolution::Local { name: name.to_string(), ty: ty.clone(), decl });
        return Ok(ty);
    }
    // Unqualified member access resolves against the enclosing class.
    if let Some((_, field)) = env.types.field(&env.class_type, name) {
        if !field.is_static && env.is_static_context() {
            return Err(CompileError::type_err(
                format!("cannot reference instance field '{name}' from a static context"),
                span,
            ));
        }
        env.resolve(span, Resolution::Field { name: name.to_string(), ty: field.ty.clone(), is_static: field.is_static });
        return Ok(field.ty);
    }
    Err(CompileError::type_err(format!("undefined variable '{name}'"), span))
}

/// `Name` used as a qualifier, when it is neither a local nor a field.
fn class_qualifier(expr: &Spanned<Expr>, env: &TypeEnv) -> Option<Type> {
    let Expr::Ident(name) = &expr.node else { return None };
    if env.lookup(name).is_some() || env.types.field(&env.class_type, name).is_some() {
        return None;
    }
    env.types.class(name).map(|info| Type::class(&info.name))
}

fn receiver_of(object: &Spanned<Expr>, env: &mut TypeEnv) -> Result<Receiver, CompileError> {
    if let Some(class) = class_qualifier(object, env) {
        return Ok(Receiver::Static(class));
    }
    let ty = infer_expr(object, env, &TargetQuery::none())?;
    match ty {
        Type::Class { .. } => Ok(Receiver::Instance(ty)),
        Type::TypeParam(ref name) => {
            let bound = env
                .type_params
                .iter()
                .find(|tp| &tp.name == name)
                .map(|tp| env.types.bound_of(tp))
                .unwrap_or_else(|| env.types.object());
            Ok(Receiver::Instance(bound))
        }
        Type::Array(_) => Ok(Receiver::Instance(env.types.object())),
        other => Err(CompileError::type_err(format!("cannot call a method on a value of type {other}"), object.span)),
    }
}

fn infer_field_access(
    object: &Spanned<Expr>,
    field: &Spanned<String>,
    span: Span,
    env: &mut TypeEnv,
) -> Result<Type, CompileError> {
    let name = field.node.as_str();
    if let Some(class) = class_qualifier(object, env) {
        return match env.types.field(&class, name) {
            Some((_, info)) if info.is_static => {
                env.resolve(span, Resolution::Field { name: name.to_string(), ty: info.ty.clone(), is_static: true });
                Ok(info.ty)
            }
            Some(_) => Err(CompileError::type_err(
                format!("instance field '{name}' of {class} accessed through the class name"),
                field.span,
            )),
            None => Err(CompileError::type_err(format!("no field '{name}' on {class}"), field.span)),
        };
    }

    let receiver = infer_expr(object, env, &TargetQuery::none())?;
    if let Type::Array(_) = receiver
        && name == "length"
    {
        return Ok(Type::int());
    }
    let Some((_, info)) = env.types.field(&receiver.boxed(), name) else {
        return Err(CompileError::type_err(format!("no field '{name}' on {receiver}"), field.span));
    };
    if matches!(object.node, Expr::This) {
        env.resolve(span, Resolution::Field { name: name.to_string(), ty: info.ty.clone(), is_static: info.is_static });
    }
    Ok(info.ty)
}

fn infer_assign(
    target: &Spanned<Expr>,
    op: Option<BinOp>,
    value: &Spanned<Expr>,
    env: &mut TypeEnv,
) -> Result<Type, CompileError> {
    if !matches!(target.node, Expr::Ident(_) | Expr::FieldAccess { .. }) {
        return Err(CompileError::type_err("invalid assignment target", target.span));
    }
    let target_ty = infer_expr(target, env, &TargetQuery::none())?;
    if let Expr::Ident(name) = &target.node
        && let Some(info) = env.lookup(name)
    {
        let decl = info.decl;
        env.note_local_write(decl, target.span.start);
    }

    match op {
        Some(op) => {
            let found = infer_expr(value, env, &TargetQuery::none())?;
            binop_type(op, &target_ty, &found, value.span)?;
        }
        None => {
            let found = infer_expr(value, env, &TargetQuery::declared(target_ty.clone()))?;
            if !env.types.is_assignable(&found, &target_ty) {
                return Err(CompileError::type_err(format!("cannot assign {found} to {target_ty}"), value.span));
            }
        }
    }
    Ok(target_ty)
}

fn infer_cast(
    target_types: &[Spanned<TypeExpr>],
    inner: &Spanned<Expr>,
    query: &TargetQuery,
    span: Span,
    env: &mut TypeEnv,
) -> Result<Type, CompileError> {
    let components = target_types
        .iter()
        .map(|t| resolve_annotation(t, env))
        .collect::<Result<Vec<_>, _>>()?;
    let Some(first) = components.first().cloned() else {
        return Err(CompileError::type_err("cast without a target type", span));
    };

    if matches!(inner.node, Expr::Lambda(_) | Expr::MethodRef { .. }) {
        let query = TargetQuery { cast: Some(components), declared: query.declared.clone(), argument: None };
        return infer_expr(inner, env, &query);
    }

    let found = infer_expr(inner, env, &TargetQuery::none())?;
    let castable = match (&first, &found) {
        (Type::Prim(Primitive::Boolean), _) => found.unboxed() == Some(Primitive::Boolean),
        (Type::Prim(_), _) => found.numeric().is_some(),
        (_, Type::Prim(_)) => env.types.is_assignable(&found, &first),
        _ => found.is_reference(),
    };
    if !castable {
        return Err(CompileError::type_err(format!("cannot cast {found} to {first}"), span));
    }
    Ok(first)
}

fn binop_type(op: BinOp, l: &Type, r: &Type, span: Span) -> Result<Type, CompileError> {
    let mismatch = || CompileError::type_err(format!("operator {op} cannot be applied to {l} and {r}"), span);
    match op {
        BinOp::Add if l.is_string() || r.is_string() => Ok(Type::string()),
        op if op.is_arithmetic() => match (l.numeric(), r.numeric()) {
            (Some(a), Some(b)) => Ok(Type::Prim(Primitive::promote(a, b))),
            _ => Err(mismatch()),
        },
        op if op.is_comparison() => match (l.numeric(), r.numeric()) {
            (Some(_), Some(_)) => Ok(Type::boolean()),
            _ => Err(mismatch()),
        },
        BinOp::Eq | BinOp::Neq => Ok(Type::boolean()),
        _ => {
            if l.unboxed() == Some(Primitive::Boolean) && r.unboxed() == Some(Primitive::Boolean) {
                Ok(Type::boolean())
            } else {
                Err(mismatch())
            }
        }
    }
}

// ---- statements ----

pub(crate) fn check_block(block: &Spanned<Block>, env: &mut TypeEnv) -> Result<(), CompileError> {
    env.push_scope();
    let result = block.node.stmts.iter().try_for_each(|stmt| check_stmt(stmt, env));
    env.pop_scope();
    result
}

fn check_stmt(stmt: &Spanned<Stmt>, env: &mut TypeEnv) -> Result<(), CompileError> {
    match &stmt.node {
        Stmt::Local { name, ty, value } => {
            let declared = ty.as_ref().map(|t| resolve_annotation(t, env)).transpose()?;
            let local_ty = match (declared, value) {
                (Some(Type::Void), _) => {
                    return Err(CompileError::type_err(format!("variable '{}' cannot be void", name.node), name.span));
                }
                (Some(declared), Some(value)) => {
                    let found = infer_expr(value, env, &TargetQuery::declared(declared.clone()))?;
                    if !env.types.is_assignable(&found, &declared) {
                        return Err(CompileError::type_err(
                            format!("cannot initialize '{}' of type {declared} with {found}", name.node),
                            value.span,
                        ));
                    }
                    declared
                }
                (Some(declared), None) => declared,
                (None, Some(value)) => {
                    let found = infer_expr(value, env, &TargetQuery::none())?;
                    if matches!(found, Type::Null | Type::Void) {
                        return Err(CompileError::type_err(
                            format!("cannot infer a type for '{}' from {found}", name.node),
                            value.span,
                        ));
                    }
                    found
                }
                (None, None) => {
                    return Err(CompileError::type_err(
                        format!("'var' declaration of '{}' needs an initializer", name.node),
                        name.span,
                    ));
                }
            };
            env.define(name.node.clone(), local_ty, name.span);
        }
        Stmt::Expr(expr) => {
            infer_expr(expr, env, &TargetQuery::none())?;
        }
        Stmt::Return(value) => check_return(value.as_ref(), stmt.span, env)?,
        Stmt::If { condition, then_block, else_block } => {
            check_condition(condition, env)?;
            check_block(then_block, env)?;
            if let Some(else_block) = else_block {
                check_block(else_block, env)?;
            }
        }
        Stmt::While { condition, body } => {
            env.loop_spans.push(stmt.span);
            let checked = check_condition(condition, env).and_then(|()| check_block(body, env));
            env.loop_spans.pop();
            checked?;
        }
    }
    Ok(())
}

fn check_condition(condition: &Spanned<Expr>, env: &mut TypeEnv) -> Result<(), CompileError> {
    let ty = infer_expr(condition, env, &TargetQuery::none())?;
    if ty.unboxed() != Some(Primitive::Boolean) {
        return Err(CompileError::type_err(format!("condition must be boolean, found {ty}"), condition.span));
    }
    Ok(())
}

fn check_return(value: Option<&Spanned<Expr>>, span: Span, env: &mut TypeEnv) -> Result<(), CompileError> {
    let Some(frame) = env.return_frames.last() else {
        return Err(CompileError::type_err("return outside of a method body", span));
    };
    let (expected, is_lambda, collect_only) = (frame.expected.clone(), frame.is_lambda, frame.collect_only);

    let Some(value) = value else {
        if !collect_only && expected != Type::Void {
            let msg = format!("missing return value, expected {expected}");
            return Err(if is_lambda {
                CompileError::return_mismatch(msg, span)
            } else {
                CompileError::type_err(msg, span)
            });
        }
        return Ok(());
    };

    let query = if collect_only || expected == Type::Void {
        TargetQuery::none()
    } else {
        TargetQuery::declared(expected.clone())
    };
    let found = infer_expr(value, env, &query)?;
    if !collect_only {
        if expected == Type::Void {
            // Lambdas bound to void methods discard the value.
            if !is_lambda {
                return Err(CompileError::type_err("cannot return a value from a void method", value.span));
            }
        } else if !env.types.is_return_compatible(&found, &expected) {
            let msg = format!("returned {found}, expected {expected}");
            return Err(if is_lambda {
                CompileError::return_mismatch(msg, value.span)
            } else {
                CompileError::type_err(msg, value.span)
            });
        }
    }
    if let Some(frame) = env.return_frames.last_mut() {
        frame.found.push(found);
    }
    Ok(())
}
