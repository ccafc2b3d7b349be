//! Target type resolution for lambdas and method references.
//!
//! The syntactic context of a functional expression is described by a
//! [`TargetQuery`]. Each [`TargetStrategy`] inspects one kind of context and
//! either proposes a target type or has no opinion; the first strategy with
//! an opinion wins, in the fixed order of [`STRATEGIES`].

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::diagnostics::CompileError;
use crate::span::Span;
use super::hierarchy::{Hierarchy, SamLookup};
use super::symbols::TypeParamDecl;
use super::types::Type;

/// Which context produced a lambda's target type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TargetSource {
    Cast,
    Declared,
    Argument,
    Witness,
    ErasedArgument,
}

/// The resolved target of a lambda or method reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionalInterface {
    /// The type carrying the single abstract method.
    pub target: Type,
    /// Remaining components of an intersection cast.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<Type>,
    pub method: String,
    /// Type parameters declared by the target type.
    pub type_params: Vec<String>,
    pub params: Vec<Type>,
    pub return_type: Type,
    pub is_true_interface: bool,
    pub is_serializable_contract: bool,
    pub source: TargetSource,
}

impl FunctionalInterface {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// `Comparator<Integer>` or `Runnable & Serializable`.
    pub fn display_target(&self) -> String {
        let mut s = self.target.to_string();
        for m in &self.markers {
            s.push_str(" & ");
            s.push_str(&m.to_string());
        }
        s
    }
}

/// A call-argument position holding a functional expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentSlot {
    pub method: String,
    pub position: usize,
    /// Declared parameter type, still mentioning the callee's type parameters.
    pub param: Type,
    pub vars: Vec<TypeParamDecl>,
    /// Type parameters solved by unification.
    pub inferred: HashMap<String, Type>,
    /// Explicit type arguments written at the call site.
    pub witness: Option<HashMap<String, Type>>,
}

impl ArgumentSlot {
    fn var_names(&self) -> BTreeSet<String> {
        self.vars.iter().map(|v| v.name.clone()).collect()
    }
}

/// Syntactic context of one functional expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetQuery {
    /// Components of a cast immediately wrapping the expression.
    pub cast: Option<Vec<Type>>,
    /// Declared type of the variable, field, assignment or return slot.
    pub declared: Option<Type>,
    pub argument: Option<ArgumentSlot>,
}

impl TargetQuery {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn declared(ty: Type) -> Self {
        Self { declared: Some(ty), ..Self::default() }
    }

    pub fn cast(components: Vec<Type>) -> Self {
        Self { cast: Some(components), ..Self::default() }
    }

    pub fn argument(slot: ArgumentSlot) -> Self {
        Self { argument: Some(slot), ..Self::default() }
    }
}

pub trait TargetStrategy {
    fn source(&self) -> TargetSource;

    /// Proposed target type (several components for an intersection), or
    /// `None` for no opinion.
    fn propose(&self, query: &TargetQuery, types: &Hierarchy) -> Option<Vec<Type>>;
}

struct CastContext;
struct DeclaredContext;
struct ArgumentContext;
struct WitnessContext;
struct ErasedArgumentContext;

impl TargetStrategy for CastContext {
    fn source(&self) -> TargetSource {
        TargetSource::Cast
    }

    fn propose(&self, query: &TargetQuery, _types: &Hierarchy) -> Option<Vec<Type>> {
        query.cast.clone().filter(|c| !c.is_empty())
    }
}

impl TargetStrategy for DeclaredContext {
    fn source(&self) -> TargetSource {
        TargetSource::Declared
    }

    fn propose(&self, query: &TargetQuery, _types: &Hierarchy) -> Option<Vec<Type>> {
        query.declared.clone().map(|t| vec![t])
    }
}

impl TargetStrategy for ArgumentContext {
    fn source(&self) -> TargetSource {
        TargetSource::Argument
    }

    fn propose(&self, query: &TargetQuery, _types: &Hierarchy) -> Option<Vec<Type>> {
        let slot = query.argument.as_ref()?;
        let ty = slot.param.substitute(&slot.inferred);
        (!ty.mentions_any(&slot.var_names())).then(|| vec![ty])
    }
}

impl TargetStrategy for WitnessContext {
    fn source(&self) -> TargetSource {
        TargetSource::Witness
    }

    fn propose(&self, query: &TargetQuery, _types: &Hierarchy) -> Option<Vec<Type>> {
        let slot = query.argument.as_ref()?;
        let witness = slot.witness.as_ref()?;
        Some(vec![slot.param.substitute(witness)])
    }
}

impl TargetStrategy for ErasedArgumentContext {
    fn source(&self) -> TargetSource {
        TargetSource::ErasedArgument
    }

    fn propose(&self, query: &TargetQuery, types: &Hierarchy) -> Option<Vec<Type>> {
        let slot = query.argument.as_ref()?;
        Some(vec![types.erase(&slot.param.substitute(&slot.inferred), &slot.vars)])
    }
}

/// Context sources in priority order.
pub const STRATEGIES: &[&dyn TargetStrategy] = &[
    &CastContext,
    &DeclaredContext,
    &ArgumentContext,
    &WitnessContext,
    &ErasedArgumentContext,
];

/// Resolve the target of a functional expression at `span`.
pub fn resolve_target(query: &TargetQuery, span: Span, types: &Hierarchy) -> Result<FunctionalInterface, CompileError> {
    for strategy in STRATEGIES {
        if let Some(components) = strategy.propose(query, types) {
            let fi = qualify(&components, strategy.source(), span, types)?;
            check_cast_against_declared(&fi, query, span, types)?;
            tracing::debug!(
                target = %fi.display_target(),
                source = ?fi.source,
                method = %fi.method,
                "resolved functional target"
            );
            return Ok(fi);
        }
    }
    Err(CompileError::not_functional(
        "no target type for this functional expression; it must appear in an assignment, cast, return or argument context",
        span,
    ))
}

/// A cast and a declared slot that are both functional must agree: the cast
/// type has to be usable where the declared type is expected.
fn check_cast_against_declared(
    fi: &FunctionalInterface,
    query: &TargetQuery,
    span: Span,
    types: &Hierarchy,
) -> Result<(), CompileError> {
    if fi.source != TargetSource::Cast {
        return Ok(());
    }
    let Some(declared) = &query.declared else { return Ok(()) };
    if !matches!(types.find_sam(declared), SamLookup::Sam(_)) {
        return Ok(());
    }
    let agrees = std::iter::once(&fi.target)
        .chain(&fi.markers)
        .any(|component| types.is_assignable(component, declared));
    if agrees {
        return Ok(());
    }
    Err(CompileError::ambiguous(
        format!("cast to {} disagrees with the declared target {declared}", fi.display_target()),
        span,
    ))
}

/// Check that `components` denote a single-abstract-method type and build
/// its descriptor.
pub fn qualify(
    components: &[Type],
    source: TargetSource,
    span: Span,
    types: &Hierarchy,
) -> Result<FunctionalInterface, CompileError> {
    let (target, markers) = match components {
        [single] => (single.clone(), Vec::new()),
        _ => split_intersection(components, span, types)?,
    };

    let sam = match types.find_sam(&target) {
        SamLookup::Sam(sam) => sam,
        SamLookup::NotSam { abstract_methods } => {
            let msg = match &target {
                Type::Class { .. } if types.class(target.class_name().unwrap_or_default()).is_some() => {
                    format!("{target} has {abstract_methods} abstract methods, expected exactly one")
                }
                _ => format!("{target} is not a class or interface type"),
            };
            return Err(CompileError::not_functional(msg, span));
        }
    };
    if !sam.type_params.is_empty() {
        return Err(CompileError::not_functional(
            format!("abstract method '{}' of {target} is generic", sam.method),
            span,
        ));
    }

    let marker = &types.config.serializable_marker;
    let is_serializable_contract = std::iter::once(&target)
        .chain(markers.iter())
        .any(|c| types.is_subclass(c, marker));
    let type_params = target
        .class_name()
        .and_then(|n| types.class(n))
        .map(|info| info.type_param_names())
        .unwrap_or_default();

    Ok(FunctionalInterface {
        target,
        markers,
        method: sam.method,
        type_params,
        params: sam.params,
        return_type: sam.return_type,
        is_true_interface: sam.is_true_interface,
        is_serializable_contract,
        source,
    })
}

/// Pick the one intersection component that contributes abstract methods;
/// every other component must be a marker without any.
fn split_intersection(components: &[Type], span: Span, types: &Hierarchy) -> Result<(Type, Vec<Type>), CompileError> {
    let mut functional = Vec::new();
    let mut markers = Vec::new();
    for c in components {
        if !matches!(c, Type::Class { .. }) {
            return Err(CompileError::not_functional(
                format!("intersection component {c} is not a class or interface type"),
                span,
            ));
        }
        if types.abstract_methods(c).is_empty() {
            markers.push(c.clone());
        } else {
            functional.push(c.clone());
        }
    }
    let shown = components.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(" & ");
    match functional.len() {
        1 => Ok((functional.remove(0), markers)),
        0 => Err(CompileError::not_functional(format!("intersection {shown} has no abstract method"), span)),
        _ => Err(CompileError::not_functional(
            format!("intersection {shown} has more than one component with abstract methods"),
            span,
        )),
    }
}
