pub mod classify;
pub mod closures;
pub mod env;
pub mod hierarchy;
pub(crate) mod infer;
pub(crate) mod lambda;
pub mod method_ref;
pub(crate) mod overload;
pub mod resolve;
pub mod serializable;
pub mod symbols;
pub mod target;
pub mod types;

use serde::Serialize;

use crate::ast::{ClassDecl, CompilationUnit, MethodDecl};
use crate::config::AnalyzerConfig;
use crate::diagnostics::CompileError;
use crate::span::{Span, Spanned};
use classify::LambdaKind;
use closures::{plan_shared_cells, CaptureSet, SharedCell};
use env::{ReturnFrame, TypeEnv};
use hierarchy::Hierarchy;
use method_ref::MethodRefBinding;
use resolve::resolve_annotation;
use serializable::Serializability;
use symbols::{ClassInfo, TypeOracle, TypeParamDecl};
use target::{FunctionalInterface, TargetQuery};
use types::Type;

/// Everything known about one lambda expression once its unit is analyzed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LambdaBinding {
    pub span: Span,
    pub target: FunctionalInterface,
    pub param_types: Vec<Type>,
    pub return_type: Type,
    pub captures: CaptureSet,
    pub kind: LambdaKind,
    pub serializability: Serializability,
}

/// Result of analyzing a compilation unit. Bindings are ordered by source
/// position.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitAnalysis {
    pub unit: String,
    pub lambdas: Vec<LambdaBinding>,
    pub method_refs: Vec<MethodRefBinding>,
    pub shared_cells: Vec<SharedCell>,
}

impl UnitAnalysis {
    pub fn lambda_at(&self, span: Span) -> Option<&LambdaBinding> {
        self.lambdas.iter().find(|l| l.span == span)
    }

    pub fn method_ref_at(&self, span: Span) -> Option<&MethodRefBinding> {
        self.method_refs.iter().find(|m| m.span == span)
    }
}

/// Analyze every lambda and method reference in `unit`.
///
/// The unit's classes must already be present in `oracle`; their members'
/// signatures come from there, only bodies come from the AST.
pub fn analyze_unit(
    unit: &CompilationUnit,
    oracle: &dyn TypeOracle,
    config: &AnalyzerConfig,
) -> Result<UnitAnalysis, CompileError> {
    let types = Hierarchy::new(oracle, config);
    let mut env = TypeEnv::new(types);
    let mut shared_cells = Vec::new();

    for class in &unit.classes {
        let Some(info) = oracle.class(&class.node.name.node) else {
            return Err(CompileError::type_err(
                format!("class '{}' is not in the symbol table", class.node.name.node),
                class.node.name.span,
            ));
        };
        let class_type = Type::generic(
            &info.name,
            info.type_params.iter().map(|tp| Type::TypeParam(tp.name.clone())).collect(),
        );
        let class_params = info.type_params.clone();
        tracing::debug!(unit = %unit.name, class = %info.name, "checking class");

        check_fields(&class.node, &class_type, &class_params, &mut env)?;
        for method in &class.node.methods {
            check_method(method, &class_type, info, &mut env)?;
            let qualified = format!("{}.{}", class.node.name.node, method.node.name.node);
            shared_cells.extend(plan_shared_cells(&qualified, method.span, &mut env));
        }
    }

    let recorded = env.recorded;
    let analysis = UnitAnalysis {
        unit: unit.name.clone(),
        lambdas: recorded.lambda_bindings.into_values().collect(),
        method_refs: recorded.method_refs.into_values().collect(),
        shared_cells,
    };
    tracing::info!(
        unit = %analysis.unit,
        lambdas = analysis.lambdas.len(),
        method_refs = analysis.method_refs.len(),
        shared_cells = analysis.shared_cells.len(),
        "analyzed unit"
    );
    Ok(analysis)
}

fn check_fields(
    class: &ClassDecl,
    class_type: &Type,
    class_params: &[TypeParamDecl],
    env: &mut TypeEnv,
) -> Result<(), CompileError> {
    for field in &class.fields {
        let params = if field.is_static { Vec::new() } else { class_params.to_vec() };
        env.enter_member(class_type.clone(), field.is_static, params);
        let Some(value) = &field.value else { continue };
        let declared = resolve_annotation(&field.ty, env)?;
        let found = infer::infer_expr(value, env, &TargetQuery::declared(declared.clone()))?;
        if !env.types.is_assignable(&found, &declared) {
            return Err(CompileError::type_err(
                format!("cannot initialize field '{}' of type {declared} with {found}", field.name.node),
                value.span,
            ));
        }
    }
    Ok(())
}

fn check_method(
    method: &Spanned<MethodDecl>,
    class_type: &Type,
    info: &ClassInfo,
    env: &mut TypeEnv,
) -> Result<(), CompileError> {
    let m = &method.node;
    let mut params = if m.is_static { Vec::new() } else { info.type_params.clone() };
    params.extend(method_type_params(m, info));
    env.enter_member(class_type.clone(), m.is_static, params);

    let return_type = match &m.return_type {
        Some(te) => resolve_annotation(te, env)?,
        None => Type::Void,
    };
    for param in &m.params {
        let ty = resolve_annotation(&param.ty, env)?;
        env.define(param.name.node.clone(), ty, param.name.span);
    }
    env.return_frames.push(ReturnFrame { expected: return_type, is_lambda: false, collect_only: false, found: Vec::new() });
    infer::check_block(&m.body, env)?;
    env.return_frames.pop();
    Ok(())
}

/// Type parameters of `m` with the bounds its symbol-table declaration gives
/// them. Unbounded when no declaration matches.
fn method_type_params(m: &MethodDecl, info: &ClassInfo) -> Vec<TypeParamDecl> {
    let declared = info.methods.iter().find(|d| {
        d.name == m.name.node
            && d.is_static == m.is_static
            && d.params.len() == m.params.len()
            && d.type_params.iter().map(|tp| &tp.name).eq(m.type_params.iter())
    });
    m.type_params
        .iter()
        .map(|name| {
            let bound = declared
                .and_then(|d| d.type_params.iter().find(|tp| &tp.name == name))
                .and_then(|tp| tp.bound.clone());
            TypeParamDecl { name: name.clone(), bound }
        })
        .collect()
}
