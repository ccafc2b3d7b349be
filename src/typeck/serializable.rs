use serde::Serialize;

use crate::diagnostics::CompileError;
use crate::span::Span;
use super::closures::{CaptureSet, Ownership};
use super::hierarchy::Hierarchy;
use super::target::FunctionalInterface;
use super::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Serializability {
    /// The target carries no serializable contract.
    NotRequired,
    /// Every stored capture was checked.
    Verified,
}

/// Validates that a lambda bound to a serializable target only stores
/// serializable state.
///
/// Bindings are checked in capture order, so the reported class is the
/// first offender in that order:
/// - `enclosingThis`: the enclosing class must be serializable
/// - locals and instance fields: their declared type must be serializable
/// - static fields are not stored in the function value and are skipped
///
/// A lambda capturing nothing is always accepted.
pub fn qualify(
    target: &FunctionalInterface,
    captures: &CaptureSet,
    span: Span,
    types: &Hierarchy,
) -> Result<Serializability, CompileError> {
    if !target.is_serializable_contract {
        return Ok(Serializability::NotRequired);
    }

    for binding in captures.iter() {
        if binding.ownership == Ownership::StaticField {
            continue;
        }
        if let Err(class) = check_serializable(&binding.ty, types) {
            let msg = match binding.ownership {
                Ownership::EnclosingThis => format!(
                    "lambda bound to {} captures the enclosing instance of non-serializable class {class}",
                    target.display_target()
                ),
                _ => format!(
                    "lambda bound to {} captures '{}' of non-serializable type {}",
                    target.display_target(),
                    binding.name,
                    binding.ty
                ),
            };
            return Err(CompileError::not_serializable(msg, class, span));
        }
    }

    tracing::trace!(target = %target.display_target(), "serializable captures verified");
    Ok(Serializability::Verified)
}

/// Recursively checks if a type is serializable.
/// Returns Ok(()) if serializable, Err(class name) naming the offending class if not.
fn check_serializable(ty: &Type, types: &Hierarchy) -> Result<(), String> {
    match ty {
        // Primitives are always serializable
        Type::Prim(_) | Type::Void | Type::Null => Ok(()),

        // The runtime class of a type variable is unknown here
        Type::TypeParam(_) => Ok(()),

        // Arrays are serializable if the element type is
        Type::Array(elem) => check_serializable(elem, types),

        Type::Class { name, .. } => {
            if ty.is_boxed_primitive() || types.is_subclass(ty, &types.config.serializable_marker) {
                Ok(())
            } else {
                Err(name.clone())
            }
        }
    }
}
