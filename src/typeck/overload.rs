//! Overload selection and joint inference of callee type parameters.
//!
//! Calls are resolved in three steps:
//! 1. candidates are narrowed by arity, by the types of plain (non-functional)
//!    arguments, and by the functional shape expected at lambda positions;
//! 2. the callee's type parameters are solved from constraints collected
//!    from every argument (plain arguments, method references, explicitly
//!    typed lambdas, and implicit lambdas once their parameter types are
//!    known), solving once per round until no new constraints appear;
//! 3. each functional argument is checked against its parameter type with
//!    the solution applied.

use std::collections::{BTreeSet, HashMap};

use crate::ast::{Expr, LambdaExpr, MethodRefTarget, TypeExpr};
use crate::diagnostics::CompileError;
use crate::span::{Span, Spanned};
use super::env::{Resolution, TypeEnv};
use super::hierarchy::{Hierarchy, MethodCandidate, SamLookup};
use super::infer::infer_expr;
use super::lambda::{check_body, explicit_params};
use super::method_ref::shapes;
use super::resolve::resolve_annotation;
use super::symbols::TypeParamDecl;
use super::target::{ArgumentSlot, TargetQuery};
use super::types::Type;

/// How the callee of a method call was named.
#[derive(Debug, Clone)]
pub(crate) enum Receiver {
    /// `m(..)` inside the enclosing class.
    Implicit,
    /// `ClassName.m(..)`
    Static(Type),
    /// `expr.m(..)`
    Instance(Type),
}

/// One observation about a callee type parameter.
#[derive(Debug, Clone, PartialEq)]
struct Constraint {
    var: String,
    ty: Type,
    origin: Span,
}

pub(crate) fn check_call(
    span: Span,
    receiver: Receiver,
    method: &Spanned<String>,
    type_args: &[Spanned<TypeExpr>],
    args: &[Spanned<Expr>],
    env: &mut TypeEnv,
) -> Result<Type, CompileError> {
    let name = method.node.as_str();
    let (owner, static_only) = match &receiver {
        Receiver::Implicit => (env.class_type.clone(), env.is_static_context()),
        Receiver::Static(ty) => (ty.clone(), true),
        Receiver::Instance(ty) => (ty.boxed(), false),
    };

    let mut candidates: Vec<MethodCandidate> = env.types.methods(&owner, name);
    if candidates.is_empty() {
        return Err(CompileError::type_err(format!("no method '{name}' on {owner}"), method.span));
    }
    candidates.retain(|c| c.method.params.len() == args.len());
    if candidates.is_empty() {
        return Err(CompileError::type_err(
            format!("no overload of '{name}' on {owner} takes {} arguments", args.len()),
            method.span,
        ));
    }
    if static_only {
        candidates.retain(|c| c.method.is_static);
        if candidates.is_empty() {
            return Err(CompileError::type_err(
                format!("cannot call instance method '{name}' from a static context"),
                method.span,
            ));
        }
    }

    // Plain arguments are typed up front; functional ones need a target first.
    let mut arg_types: Vec<Option<Type>> = Vec::with_capacity(args.len());
    for arg in args {
        let ty = if is_functional(&arg.node) { None } else { Some(infer_expr(arg, env, &TargetQuery::none())?) };
        arg_types.push(ty);
    }

    let types = env.types;
    candidates.retain(|c| accepts_plain_args(c, &arg_types, &types));
    if candidates.is_empty() {
        let shown: Vec<String> = arg_types
            .iter()
            .map(|t| t.as_ref().map_or_else(|| "<functional>".to_string(), ToString::to_string))
            .collect();
        return Err(CompileError::type_err(
            format!("no applicable overload of '{name}' for arguments ({})", shown.join(", ")),
            span,
        ));
    }
    let shaped: Vec<MethodCandidate> =
        candidates.iter().filter(|c| fits_functional_args(c, args, &types)).cloned().collect();
    if !shaped.is_empty() {
        candidates = shaped;
    }
    let chosen = most_specific(candidates, name, span, &types)?;
    tracing::debug!(method = name, owner = %chosen.owner, signature = %signature(name, &chosen), "selected overload");

    if matches!(receiver, Receiver::Implicit) && !chosen.method.is_static {
        env.resolve(span, Resolution::This);
    }

    let vars = chosen.method.type_params.clone();
    let witness = resolve_witness(name, type_args, &vars, env)?;
    let inferred = if vars.is_empty() || witness.is_some() {
        HashMap::new()
    } else {
        unify(&chosen, args, &arg_types, env)?
    };
    let full = complete_substitution(&vars, &inferred, witness.as_ref(), &types);

    for (i, arg) in args.iter().enumerate() {
        let param = &chosen.method.params[i];
        match &arg_types[i] {
            Some(found) => {
                let expected = param.substitute(&full);
                if !types.is_assignable(found, &expected) {
                    return Err(CompileError::type_err(
                        format!("argument {} of '{name}' expects {expected}, found {found}", i + 1),
                        arg.span,
                    ));
                }
            }
            None => {
                let slot = ArgumentSlot {
                    method: name.to_string(),
                    position: i,
                    param: param.clone(),
                    vars: vars.clone(),
                    inferred: inferred.clone(),
                    witness: witness.clone(),
                };
                infer_expr(arg, env, &TargetQuery::argument(slot))?;
            }
        }
    }

    Ok(chosen.method.return_type.substitute(&full))
}

fn is_functional(expr: &Expr) -> bool {
    matches!(expr, Expr::Lambda(_) | Expr::MethodRef { .. })
}

fn var_names(vars: &[TypeParamDecl]) -> BTreeSet<String> {
    vars.iter().map(|v| v.name.clone()).collect()
}

/// Approximate a parameter type for applicability checks: callee type
/// variables become their bounds and generic types mentioning them go raw.
fn loosen(ty: &Type, vars: &[TypeParamDecl], types: &Hierarchy) -> Type {
    match ty {
        Type::TypeParam(n) => match vars.iter().find(|v| &v.name == n) {
            Some(decl) => types.bound_of(decl),
            None => ty.clone(),
        },
        Type::Class { name, .. } if ty.mentions_any(&var_names(vars)) => Type::class(name),
        Type::Array(inner) => Type::Array(Box::new(loosen(inner, vars, types))),
        _ => ty.clone(),
    }
}

fn accepts_plain_args(candidate: &MethodCandidate, arg_types: &[Option<Type>], types: &Hierarchy) -> bool {
    let m = &candidate.method;
    m.params.iter().zip(arg_types).all(|(param, found)| match found {
        Some(found) => types.is_assignable(found, &loosen(param, &m.type_params, types)),
        None => true,
    })
}

/// Lambda positions need a single-abstract-method parameter of the
/// lambda's arity; method-reference positions need any such parameter.
fn fits_functional_args(candidate: &MethodCandidate, args: &[Spanned<Expr>], types: &Hierarchy) -> bool {
    candidate.method.params.iter().zip(args).all(|(param, arg)| match &arg.node {
        Expr::Lambda(lambda) => {
            matches!(types.find_sam(param), SamLookup::Sam(sam) if sam.params.len() == lambda.params.len())
        }
        Expr::MethodRef { .. } => matches!(types.find_sam(param), SamLookup::Sam(_)),
        _ => true,
    })
}

fn most_specific(
    mut candidates: Vec<MethodCandidate>,
    name: &str,
    span: Span,
    types: &Hierarchy,
) -> Result<MethodCandidate, CompileError> {
    if candidates.len() == 1 {
        return Ok(candidates.remove(0));
    }
    let more_specific = |a: &MethodCandidate, b: &MethodCandidate| {
        a.method.params.iter().zip(&b.method.params).all(|(pa, pb)| {
            types.is_assignable(&loosen(pa, &a.method.type_params, types), &loosen(pb, &b.method.type_params, types))
        })
    };
    let winners: Vec<usize> = (0..candidates.len())
        .filter(|&i| (0..candidates.len()).all(|j| more_specific(&candidates[i], &candidates[j])))
        .collect();
    match winners.as_slice() {
        [i] => Ok(candidates.swap_remove(*i)),
        _ => {
            let shown: Vec<String> = candidates.iter().map(|c| signature(name, c)).collect();
            Err(CompileError::ambiguous(
                format!("call to '{name}' is ambiguous; candidates: {}", shown.join(", ")),
                span,
            ))
        }
    }
}

fn signature(name: &str, candidate: &MethodCandidate) -> String {
    let params: Vec<String> = candidate.method.params.iter().map(ToString::to_string).collect();
    format!("{name}({})", params.join(", "))
}

fn resolve_witness(
    name: &str,
    type_args: &[Spanned<TypeExpr>],
    vars: &[TypeParamDecl],
    env: &TypeEnv,
) -> Result<Option<HashMap<String, Type>>, CompileError> {
    let Some(first) = type_args.first() else { return Ok(None) };
    if type_args.len() != vars.len() {
        return Err(CompileError::type_err(
            format!("'{name}' takes {} type arguments, found {}", vars.len(), type_args.len()),
            first.span,
        ));
    }
    let mut map = HashMap::new();
    for (var, arg) in vars.iter().zip(type_args) {
        let ty = resolve_annotation(arg, env)?;
        if ty.is_primitive() {
            return Err(CompileError::type_err(format!("primitive type {ty} cannot be a type argument"), arg.span));
        }
        map.insert(var.name.clone(), ty);
    }
    Ok(Some(map))
}

/// Solved variables, then the witness, then bounds for anything left.
fn complete_substitution(
    vars: &[TypeParamDecl],
    inferred: &HashMap<String, Type>,
    witness: Option<&HashMap<String, Type>>,
    types: &Hierarchy,
) -> HashMap<String, Type> {
    vars.iter()
        .map(|v| {
            let ty = witness
                .and_then(|w| w.get(&v.name))
                .or_else(|| inferred.get(&v.name))
                .cloned()
                .unwrap_or_else(|| types.bound_of(v));
            (v.name.clone(), ty)
        })
        .collect()
}

// ---- unification ----

fn unify(
    chosen: &MethodCandidate,
    args: &[Spanned<Expr>],
    arg_types: &[Option<Type>],
    env: &mut TypeEnv,
) -> Result<HashMap<String, Type>, CompileError> {
    let vars = &chosen.method.type_params;
    let names = var_names(vars);
    let types = env.types;
    let mut constraints = Vec::new();
    let mut pending: Vec<(usize, &LambdaExpr)> = Vec::new();

    for (i, arg) in args.iter().enumerate() {
        let param = &chosen.method.params[i];
        match (&arg.node, &arg_types[i]) {
            (_, Some(found)) => collect(param, found, &names, arg.span, &types, &mut constraints),
            (Expr::MethodRef { target, method }, None) => {
                method_ref_constraints(param, target, &method.node, &names, arg.span, env, &mut constraints)?;
            }
            (Expr::Lambda(lambda), None) => pending.push((i, lambda)),
            _ => {}
        }
    }

    let mut solution = solve(&constraints, vars, &types)?;
    loop {
        let mut progressed = false;
        let mut i = 0;
        while i < pending.len() {
            let (pos, lambda) = pending[i];
            let param = &chosen.method.params[pos];
            match lambda_constraints(lambda, args[pos].span, param, &solution, &names, env)? {
                Some(found) => {
                    constraints.extend(found);
                    pending.remove(i);
                    progressed = true;
                }
                None => i += 1,
            }
        }
        if !progressed {
            break;
        }
        solution = solve(&constraints, vars, &types)?;
    }

    tracing::debug!(
        constraints = constraints.len(),
        solution = ?solution.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>(),
        "solved callee type parameters"
    );
    Ok(solution)
}

/// Structurally match a parameter type against an argument type, recording
/// what each callee variable must be.
fn collect(param: &Type, actual: &Type, vars: &BTreeSet<String>, origin: Span, types: &Hierarchy, out: &mut Vec<Constraint>) {
    match param {
        Type::TypeParam(v) if vars.contains(v) => {
            if !matches!(actual, Type::Null | Type::Void) {
                out.push(Constraint { var: v.clone(), ty: actual.boxed(), origin });
            }
        }
        Type::Class { name, args } if !args.is_empty() && param.mentions_any(vars) => {
            if let Some(Type::Class { args: actual_args, .. }) = types.as_super(&actual.boxed(), name)
                && actual_args.len() == args.len()
            {
                for (p, a) in args.iter().zip(&actual_args) {
                    collect(p, a, vars, origin, types, out);
                }
            }
        }
        Type::Array(p) => {
            if let Type::Array(a) = actual {
                collect(p, a, vars, origin, types, out);
            }
        }
        _ => {}
    }
}

/// A method reference contributes its intrinsic shape: parameter types and
/// return type of the referenced method.
fn method_ref_constraints(
    param: &Type,
    target: &MethodRefTarget,
    method: &str,
    vars: &BTreeSet<String>,
    origin: Span,
    env: &mut TypeEnv,
    out: &mut Vec<Constraint>,
) -> Result<(), CompileError> {
    let SamLookup::Sam(sam) = env.types.find_sam(param) else { return Ok(()) };
    let saved = env.recorded.clone();
    let found = shapes(target, method, sam.params.len(), env);
    env.recorded = saved;
    // An overloaded reference only constrains inference when it is unambiguous.
    let found = found?;
    let [shape] = found.as_slice() else { return Ok(()) };
    let types = env.types;
    for (p, a) in sam.params.iter().zip(&shape.params) {
        collect(p, a, vars, origin, &types, out);
    }
    if sam.return_type != Type::Void {
        collect(&sam.return_type, &shape.return_type, vars, origin, &types, out);
    }
    Ok(())
}

/// Constraints from a lambda argument, or `None` if its parameter types
/// still depend on unsolved variables.
fn lambda_constraints(
    lambda: &LambdaExpr,
    span: Span,
    param: &Type,
    solution: &HashMap<String, Type>,
    vars: &BTreeSet<String>,
    env: &mut TypeEnv,
) -> Result<Option<Vec<Constraint>>, CompileError> {
    let types = env.types;
    let (SamLookup::Sam(open), SamLookup::Sam(current)) =
        (types.find_sam(param), types.find_sam(&param.substitute(solution)))
    else {
        return Ok(Some(Vec::new()));
    };
    if open.params.len() != lambda.params.len() {
        // Reported with the target when the lambda itself is checked.
        return Ok(Some(Vec::new()));
    }

    let mut out = Vec::new();
    let params = match explicit_params(lambda, env)? {
        Some(declared) => {
            for (p, d) in open.params.iter().zip(&declared) {
                collect(p, d, vars, span, &types, &mut out);
            }
            declared
        }
        None if current.params.iter().all(|p| !p.mentions_any(vars)) => current.params.clone(),
        None => return Ok(None),
    };

    if open.return_type.mentions_any(vars) {
        // Speculative: the body is checked for real once the target is final.
        let saved = env.recorded.clone();
        let body = check_body(lambda, span, &params, None, env);
        env.recorded = saved;
        let body = body?;
        if body != Type::Void {
            collect(&open.return_type, &body, vars, span, &types, &mut out);
        }
    }
    Ok(Some(out))
}

/// Pick, for each variable, the candidate every other candidate is
/// assignable to. Candidates are never widened beyond what was observed.
fn solve(constraints: &[Constraint], vars: &[TypeParamDecl], types: &Hierarchy) -> Result<HashMap<String, Type>, CompileError> {
    let mut solution = HashMap::new();
    for var in vars {
        let mut candidates: Vec<&Constraint> = Vec::new();
        for c in constraints.iter().filter(|c| c.var == var.name) {
            if !candidates.iter().any(|k| k.ty == c.ty) {
                candidates.push(c);
            }
        }
        let Some(first) = candidates.first().copied() else { continue };

        let Some(chosen) = candidates
            .iter()
            .copied()
            .find(|c| candidates.iter().all(|o| types.is_assignable(&o.ty, &c.ty)))
        else {
            let other = candidates
                .iter()
                .find(|o| !types.is_assignable(&o.ty, &first.ty))
                .copied()
                .unwrap_or(first);
            return Err(CompileError::type_param_conflict(
                format!("cannot infer type parameter {}: {} conflicts with {}", var.name, first.ty, other.ty),
                var.name.clone(),
                other.origin,
            ));
        };
        if let Some(bound) = &var.bound
            && !types.is_assignable(&chosen.ty, bound)
        {
            return Err(CompileError::type_param_conflict(
                format!("inferred type {} for {} is not within its bound {bound}", chosen.ty, var.name),
                var.name.clone(),
                chosen.origin,
            ));
        }
        solution.insert(var.name.clone(), chosen.ty.clone());
    }
    Ok(solution)
}
