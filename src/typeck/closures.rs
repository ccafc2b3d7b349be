use std::collections::BTreeMap;

use serde::Serialize;

use crate::ast::{Expr, LambdaExpr};
use crate::span::{Span, Spanned};
use crate::visit::{walk_expr, walk_lambda, Visitor};
use super::env::{Resolution, TypeEnv};
use super::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Ownership {
    InstanceField,
    StaticField,
    EnclosingLocal,
    EnclosingThis,
}

/// How a captured local is stored. Locals that are written after capture
/// (or inside a capturing lambda) live in a cell shared by the enclosing
/// method and every lambda capturing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CaptureMode {
    ByValue,
    SharedCell,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub name: String,
    pub ty: Type,
    pub ownership: Ownership,
    pub mutated_in_body: bool,
    pub mode: CaptureMode,
    /// Declaration of a captured local.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_at: Option<Span>,
}

/// Captured bindings of one lambda, in order of first use.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CaptureSet {
    bindings: Vec<Binding>,
}

impl CaptureSet {
    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.name == name)
    }

    pub fn captures_this(&self) -> bool {
        self.bindings.iter().any(|b| b.ownership == Ownership::EnclosingThis)
    }

    fn add(&mut self, binding: Binding, write: bool) {
        let existing = self.bindings.iter_mut().find(|b| {
            b.ownership == binding.ownership && b.name == binding.name && b.declared_at == binding.declared_at
        });
        match existing {
            Some(b) => b.mutated_in_body |= write,
            None => self.bindings.push(Binding { mutated_in_body: write, ..binding }),
        }
    }
}

/// A local that must be allocated as a shared mutable cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedCell {
    pub method: String,
    pub name: String,
    pub declared_at: Span,
}

/// Collect the captures of a lambda whose body has already been checked.
/// The walk descends into nested lambdas, so anything they capture from
/// outside this lambda is captured here as well.
pub(crate) fn collect_captures(lambda: &LambdaExpr, span: Span, env: &TypeEnv) -> CaptureSet {
    let mut collector = FreeVarCollector {
        lambda: span,
        env,
        captures: CaptureSet::default(),
    };
    walk_lambda(&mut collector, lambda, span);
    tracing::trace!(captures = collector.captures.len(), "collected lambda captures");
    collector.captures
}

/// Collect references that resolve outside the lambda at `lambda`.
struct FreeVarCollector<'a, 'e> {
    lambda: Span,
    env: &'a TypeEnv<'e>,
    captures: CaptureSet,
}

impl FreeVarCollector<'_, '_> {
    fn capture_this(&mut self) {
        let ty = self.env.this_type.clone().unwrap_or_else(|| self.env.class_type.clone());
        self.captures.add(
            Binding {
                name: "this".to_string(),
                ty,
                ownership: Ownership::EnclosingThis,
                mutated_in_body: false,
                mode: CaptureMode::ByValue,
                declared_at: None,
            },
            false,
        );
    }

    fn capture_at(&mut self, span: Span, write: bool) {
        let Some(resolution) = self.env.recorded.resolutions.get(&span.key()) else { return };
        let (name, ty, ownership, declared_at) = match resolution {
            Resolution::Local { name, ty, decl } => {
                // Parameters and locals of this lambda (or a nested one) are not captures.
                if self.lambda.encloses(*decl) {
                    return;
                }
                (name, ty, Ownership::EnclosingLocal, Some(*decl))
            }
            Resolution::Field { name, ty, is_static: false } => {
                self.capture_this();
                (name, ty, Ownership::InstanceField, None)
            }
            Resolution::Field { name, ty, is_static: true } => (name, ty, Ownership::StaticField, None),
            Resolution::This => {
                self.capture_this();
                return;
            }
        };
        self.captures.add(
            Binding {
                name: name.clone(),
                ty: ty.clone(),
                ownership,
                mutated_in_body: false,
                mode: CaptureMode::ByValue,
                declared_at,
            },
            write,
        );
    }
}

impl Visitor for FreeVarCollector<'_, '_> {
    fn visit_expr(&mut self, expr: &Spanned<Expr>) {
        match &expr.node {
            Expr::Ident(_) => self.capture_at(expr.span, false),
            Expr::This => self.capture_this(),
            Expr::FieldAccess { .. } | Expr::MethodCall { object: None, .. } => {
                self.capture_at(expr.span, false);
                walk_expr(self, expr);
            }
            Expr::Assign { target, value, .. } => {
                match &target.node {
                    Expr::Ident(_) => self.capture_at(target.span, true),
                    Expr::FieldAccess { object, .. } => {
                        self.capture_at(target.span, true);
                        self.visit_expr(object);
                    }
                    _ => self.visit_expr(target),
                }
                self.visit_expr(value);
            }
            _ => walk_expr(self, expr),
        }
    }
}

/// Decide which locals of the method spanning `method_span` need shared
/// cells, and switch the affected lambda bindings to [`CaptureMode::SharedCell`].
///
/// A captured local needs a cell when it is written at or after the point
/// from which some capturing lambda can observe it. Writes inside a
/// capturing lambda always qualify; a local assigned only before the
/// lambda and never again does not.
pub(crate) fn plan_shared_cells(method: &str, method_span: Span, env: &mut TypeEnv) -> Vec<SharedCell> {
    let recorded = &env.recorded;
    let mut cells: BTreeMap<Span, String> = BTreeMap::new();
    for captured in recorded.captured_locals.iter().filter(|c| method_span.encloses(c.lambda)) {
        let written_later = recorded
            .local_writes
            .iter()
            .any(|(decl, at)| *decl == captured.decl && *at >= captured.effective_start);
        if written_later {
            cells.insert(captured.decl, captured.name.clone());
        }
    }
    if cells.is_empty() {
        return Vec::new();
    }

    for (key, binding) in env.recorded.lambda_bindings.iter_mut() {
        if !method_span.encloses(Span::new(key.0, key.1)) {
            continue;
        }
        for b in binding.captures.bindings.iter_mut() {
            if b.ownership == Ownership::EnclosingLocal && b.declared_at.is_some_and(|d| cells.contains_key(&d)) {
                b.mode = CaptureMode::SharedCell;
            }
        }
    }

    tracing::debug!(method, cells = cells.len(), "planned shared cells");
    cells
        .into_iter()
        .map(|(declared_at, name)| SharedCell { method: method.to_string(), name, declared_at })
        .collect()
}
