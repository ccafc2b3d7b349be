use serde::Serialize;

use super::target::FunctionalInterface;

/// Code-generation strategy for a lambda. Capture and `this` rules are the
/// same for both kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LambdaKind {
    /// Compiled directly against a true single-abstract-method interface.
    NativeFunction,
    /// Needs an object-based implementation (abstract-class target).
    ClosureObject,
}

pub fn classify(target: &FunctionalInterface) -> LambdaKind {
    if target.is_true_interface {
        LambdaKind::NativeFunction
    } else {
        LambdaKind::ClosureObject
    }
}
