use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::span::Span;
use super::hierarchy::Hierarchy;
use super::symbols::TypeParamDecl;
use super::types::Type;
use super::LambdaBinding;
use super::method_ref::MethodRefBinding;

#[derive(Debug, Clone)]
pub struct LocalInfo {
    pub ty: Type,
    /// Span of the declaring name; identifies the local across scopes.
    pub decl: Span,
}

/// What a name or call inside a method body resolved to. The capture
/// analyzer reads these instead of re-resolving names, so implicit member
/// access inside a lambda means exactly what it means in the method.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Local { name: String, ty: Type, decl: Span },
    Field { name: String, ty: Type, is_static: bool },
    /// `this`, an implicit instance call, or `this::m`.
    This,
}

/// A local read or written from inside a lambda declared after it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CapturedLocal {
    pub decl: Span,
    pub name: String,
    pub lambda: Span,
    /// Writes at or after this offset are observable by the lambda: the
    /// lambda's start, or the start of the outermost loop around it that
    /// began after the declaration.
    pub effective_start: usize,
}

#[derive(Debug, Clone)]
pub struct ReturnFrame {
    pub expected: Type,
    pub is_lambda: bool,
    /// Only collect returned types; the expected type is not final yet.
    pub collect_only: bool,
    pub found: Vec<Type>,
}

/// An active lambda body during checking.
#[derive(Debug, Clone, Copy)]
pub struct LambdaFrame {
    pub span: Span,
    pub outer_depth: usize,
}

/// Annotations recorded while checking a unit. Kept together so speculative
/// checking (used while unifying sibling lambda arguments) can roll back.
#[derive(Debug, Clone, Default)]
pub struct Recorded {
    pub resolutions: BTreeMap<(usize, usize), Resolution>,
    pub lambda_bindings: BTreeMap<(usize, usize), LambdaBinding>,
    pub method_refs: BTreeMap<(usize, usize), MethodRefBinding>,
    pub captured_locals: BTreeSet<CapturedLocal>,
    /// `(declaration, write offset)` for every assignment to a local.
    pub local_writes: BTreeSet<(Span, usize)>,
}

pub struct TypeEnv<'a> {
    scopes: Vec<HashMap<String, LocalInfo>>,
    pub types: Hierarchy<'a>,
    /// Type of the class whose body is being checked.
    pub class_type: Type,
    /// `None` in a static context.
    pub this_type: Option<Type>,
    /// Type parameters in scope: the class's (instance context) plus the method's.
    pub type_params: Vec<TypeParamDecl>,
    pub return_frames: Vec<ReturnFrame>,
    pub lambda_frames: Vec<LambdaFrame>,
    pub loop_spans: Vec<Span>,
    pub recorded: Recorded,
}

impl<'a> TypeEnv<'a> {
    pub fn new(types: Hierarchy<'a>) -> Self {
        Self {
            scopes: vec![HashMap::new()],
            types,
            class_type: types.object(),
            this_type: None,
            type_params: Vec::new(),
            return_frames: Vec::new(),
            lambda_frames: Vec::new(),
            loop_spans: Vec::new(),
            recorded: Recorded::default(),
        }
    }

    /// Reset per-member state before checking a field initializer or method.
    pub fn enter_member(&mut self, class_type: Type, is_static: bool, type_params: Vec<TypeParamDecl>) {
        self.scopes = vec![HashMap::new()];
        self.this_type = if is_static { None } else { Some(class_type.clone()) };
        self.class_type = class_type;
        self.type_params = type_params;
        self.return_frames.clear();
        self.lambda_frames.clear();
        self.loop_spans.clear();
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    pub fn define(&mut self, name: String, ty: Type, decl: Span) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, LocalInfo { ty, decl });
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&LocalInfo> {
        self.lookup_with_depth(name).map(|(info, _)| info)
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    /// Look up a local and return it along with the scope depth it was found at (0-indexed from bottom)
    pub fn lookup_with_depth(&self, name: &str) -> Option<(&LocalInfo, usize)> {
        for (i, scope) in self.scopes.iter().enumerate().rev() {
            if let Some(info) = scope.get(name) {
                return Some((info, i));
            }
        }
        None
    }

    pub fn is_static_context(&self) -> bool {
        self.this_type.is_none()
    }

    pub fn resolve(&mut self, span: Span, resolution: Resolution) {
        self.recorded.resolutions.insert(span.key(), resolution);
    }

    /// Note that the local found at `depth` is referenced from every active
    /// lambda opened above that depth.
    pub fn note_local_use(&mut self, name: &str, decl: Span, depth: usize) {
        for frame in self.lambda_frames.iter().filter(|f| depth < f.outer_depth) {
            let effective_start = self
                .loop_spans
                .iter()
                .filter(|l| l.start > decl.start && l.start <= frame.span.start)
                .map(|l| l.start)
                .min()
                .unwrap_or(frame.span.start);
            self.recorded.captured_locals.insert(CapturedLocal {
                decl,
                name: name.to_string(),
                lambda: frame.span,
                effective_start,
            });
        }
    }

    pub fn note_local_write(&mut self, decl: Span, at: usize) {
        self.recorded.local_writes.insert((decl, at));
    }
}
