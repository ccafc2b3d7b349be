use crate::ast::{TypeExpr, WildcardBound};
use crate::diagnostics::CompileError;
use crate::span::Spanned;
use super::env::TypeEnv;
use super::symbols::TypeOracle;
use super::types::{Primitive, Type};

/// Resolve a surface type against the oracle. `scope` lists the type
/// parameters visible at the annotation site.
pub fn resolve_type(te: &TypeExpr, scope: &[String], oracle: &dyn TypeOracle) -> Result<Type, String> {
    match te {
        TypeExpr::Named(name) => {
            if let Some(p) = Primitive::from_keyword(name) {
                return Ok(Type::Prim(p));
            }
            if name == "void" {
                return Ok(Type::Void);
            }
            if scope.iter().any(|tp| tp == name) {
                return Ok(Type::TypeParam(name.clone()));
            }
            if oracle.class(name).is_some() {
                return Ok(Type::class(name));
            }
            Err(format!("unknown type '{name}'"))
        }
        TypeExpr::Generic { name, args } => {
            let info = oracle.class(name).ok_or_else(|| format!("unknown type '{name}'"))?;
            if info.type_params.len() != args.len() {
                return Err(format!(
                    "type '{}' expects {} type arguments, found {}",
                    name,
                    info.type_params.len(),
                    args.len()
                ));
            }
            let mut resolved = Vec::with_capacity(args.len());
            for arg in args {
                let ty = resolve_type_arg(arg, scope, oracle)?;
                resolved.push(ty);
            }
            Ok(Type::generic(name, resolved))
        }
        TypeExpr::Array(inner) => {
            let elem = resolve_type(inner, scope, oracle)?;
            if elem == Type::Void {
                return Err("array of void".to_string());
            }
            Ok(Type::Array(Box::new(elem)))
        }
        TypeExpr::Wildcard(_) => Err(format!("wildcard '{te}' is only allowed as a type argument")),
    }
}

/// Wildcards are approximated by their bound; an unbounded `?` becomes the
/// root object type, which must be declared in the oracle.
fn resolve_type_arg(te: &TypeExpr, scope: &[String], oracle: &dyn TypeOracle) -> Result<Type, String> {
    let ty = match te {
        TypeExpr::Wildcard(Some((WildcardBound::Extends | WildcardBound::Super, bound))) => {
            resolve_type(bound, scope, oracle)?
        }
        TypeExpr::Wildcard(None) => {
            resolve_type(&TypeExpr::named("Object"), scope, oracle)?
        }
        other => resolve_type(other, scope, oracle)?,
    };
    if let Type::Prim(p) = ty {
        return Err(format!("primitive type '{}' cannot be a type argument", p.keyword()));
    }
    Ok(ty)
}

/// Resolve an annotation appearing in analyzed code, using the type
/// parameters in scope in `env`.
pub(crate) fn resolve_annotation(te: &Spanned<TypeExpr>, env: &TypeEnv) -> Result<Type, CompileError> {
    let scope: Vec<String> = env.type_params.iter().map(|tp| tp.name.clone()).collect();
    resolve_type(&te.node, &scope, env.types.oracle).map_err(|msg| CompileError::type_err(msg, te.span))
}
