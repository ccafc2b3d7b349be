//! Queries over the class hierarchy: supertype walks with type-argument
//! substitution, member lookup, assignability, and single-abstract-method
//! discovery.

use std::collections::{HashMap, HashSet};

use crate::config::AnalyzerConfig;
use super::symbols::{ClassInfo, ClassKind, FieldInfo, MethodInfo, TypeOracle, TypeParamDecl};
use super::types::Type;

#[derive(Debug, Clone, PartialEq)]
pub struct MethodCandidate {
    /// The declaring type, instantiated as seen from the queried type.
    pub owner: Type,
    /// Signature with the owner's type arguments substituted.
    pub method: MethodInfo,
}

/// Signature of the single abstract method of a functional target.
#[derive(Debug, Clone, PartialEq)]
pub struct SamSignature {
    pub owner: Type,
    pub method: String,
    pub type_params: Vec<String>,
    pub params: Vec<Type>,
    pub return_type: Type,
    pub is_true_interface: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SamLookup {
    Sam(SamSignature),
    /// Not a class type, or a type with zero or several abstract methods.
    NotSam { abstract_methods: usize },
}

#[derive(Clone, Copy)]
pub struct Hierarchy<'a> {
    pub oracle: &'a dyn TypeOracle,
    pub config: &'a AnalyzerConfig,
}

impl<'a> Hierarchy<'a> {
    pub fn new(oracle: &'a dyn TypeOracle, config: &'a AnalyzerConfig) -> Self {
        Self { oracle, config }
    }

    pub fn class(&self, name: &str) -> Option<&'a ClassInfo> {
        self.oracle.class(name)
    }

    pub fn object(&self) -> Type {
        Type::class(&self.config.object_type)
    }

    fn is_object(&self, ty: &Type) -> bool {
        ty.class_name() == Some(self.config.object_type.as_str())
    }

    /// Map from a class's type parameters to the arguments of `ty`. Raw
    /// uses erase each parameter to its bound.
    fn instantiation(&self, info: &ClassInfo, args: &[Type]) -> HashMap<String, Type> {
        if args.len() == info.type_params.len() {
            info.type_params.iter().map(|tp| tp.name.clone()).zip(args.iter().cloned()).collect()
        } else {
            info.type_params
                .iter()
                .map(|tp| (tp.name.clone(), self.bound_of(tp)))
                .collect()
        }
    }

    pub fn bound_of(&self, tp: &TypeParamDecl) -> Type {
        tp.bound.clone().unwrap_or_else(|| self.object())
    }

    /// Replace each of `vars` with its bound.
    pub fn erase(&self, ty: &Type, vars: &[TypeParamDecl]) -> Type {
        let map: HashMap<String, Type> = vars.iter().map(|tp| (tp.name.clone(), self.bound_of(tp))).collect();
        ty.substitute(&map)
    }

    pub fn direct_supertypes(&self, ty: &Type) -> Vec<Type> {
        let Type::Class { name, args } = ty else { return Vec::new() };
        let Some(info) = self.class(name) else { return Vec::new() };
        let map = self.instantiation(info, args);
        info.supertypes.iter().map(|s| s.substitute(&map)).collect()
    }

    /// View `ty` as an instantiation of the class named `target`, if it is one.
    pub fn as_super(&self, ty: &Type, target: &str) -> Option<Type> {
        let mut stack = vec![ty.clone()];
        let mut visited = HashSet::new();
        while let Some(current) = stack.pop() {
            let Type::Class { name, .. } = &current else { continue };
            if name == target {
                return Some(current);
            }
            if !visited.insert(name.clone()) {
                continue;
            }
            let mut supers = self.direct_supertypes(&current);
            supers.reverse();
            stack.extend(supers);
        }
        None
    }

    pub fn is_subclass(&self, ty: &Type, target: &str) -> bool {
        self.as_super(ty, target).is_some()
    }

    /// Assignment compatibility, including boxing, unboxing and primitive widening.
    pub fn is_assignable(&self, from: &Type, to: &Type) -> bool {
        if from == to {
            return true;
        }
        match (from, to) {
            (Type::Void, _) | (_, Type::Void) => false,
            (Type::Null, to) => to.is_reference(),
            (Type::Prim(f), Type::Prim(t)) => f.widens_to(*t),
            (Type::Prim(_), to) => self.is_assignable(&from.boxed(), to),
            (from, Type::Prim(t)) => match from.unboxed() {
                Some(p) if from.is_boxed_primitive() => p.widens_to(*t),
                _ => false,
            },
            (_, to) if self.is_object(to) => true,
            (Type::TypeParam(_), _) => false,
            (_, Type::TypeParam(_)) => false,
            (Type::Array(f), Type::Array(t)) => {
                if f.is_primitive() || t.is_primitive() {
                    f == t
                } else {
                    self.is_assignable(f, t)
                }
            }
            (Type::Array(_), Type::Class { name, .. }) => *name == self.config.serializable_marker,
            (Type::Class { .. }, Type::Class { name, args }) => match self.as_super(from, name) {
                Some(Type::Class { args: sup_args, .. }) => {
                    args.is_empty() || sup_args.is_empty() || sup_args == *args
                }
                _ => false,
            },
            _ => false,
        }
    }

    /// Whether a value of type `found` may be returned where `expected` is
    /// declared. Void targets discard the value; numeric results may box
    /// into any wider wrapper type.
    pub fn is_return_compatible(&self, found: &Type, expected: &Type) -> bool {
        if *expected == Type::Void {
            return true;
        }
        if *found == Type::Void {
            return false;
        }
        if self.is_assignable(found, expected) {
            return true;
        }
        match (found.numeric(), expected.numeric()) {
            (Some(f), Some(e)) if expected.is_boxed_primitive() => f.widens_to(e),
            _ => false,
        }
    }

    /// Field lookup through the supertype chain.
    pub fn field(&self, ty: &Type, name: &str) -> Option<(Type, FieldInfo)> {
        let mut stack = vec![ty.clone()];
        let mut visited = HashSet::new();
        while let Some(current) = stack.pop() {
            let Type::Class { name: cname, args } = &current else { continue };
            if !visited.insert(cname.clone()) {
                continue;
            }
            let Some(info) = self.class(cname) else { continue };
            if let Some(field) = info.fields.iter().find(|f| f.name == name) {
                let map = self.instantiation(info, args);
                let mut field = field.clone();
                if !field.is_static {
                    field.ty = field.ty.substitute(&map);
                }
                return Some((current.clone(), field));
            }
            let mut supers = self.direct_supertypes(&current);
            supers.reverse();
            stack.extend(supers);
        }
        None
    }

    /// Every method called `name` visible on `ty`, most-derived first.
    /// Overridden declarations (same name and parameter types) are hidden.
    pub fn methods(&self, ty: &Type, name: &str) -> Vec<MethodCandidate> {
        self.visible_methods(ty)
            .into_iter()
            .filter(|c| c.method.name == name)
            .collect()
    }

    fn visible_methods(&self, ty: &Type) -> Vec<MethodCandidate> {
        let mut out: Vec<MethodCandidate> = Vec::new();
        let mut queue = std::collections::VecDeque::from([ty.clone()]);
        let mut visited = HashSet::new();
        let mut reached_object = false;
        while let Some(current) = queue.pop_front() {
            let Type::Class { name, args } = &current else { continue };
            if !visited.insert(name.clone()) {
                continue;
            }
            reached_object |= self.is_object(&current);
            let Some(info) = self.class(name) else { continue };
            let map = self.instantiation(info, args);
            for m in &info.methods {
                let method = if m.is_static { m.clone() } else { substitute_method(m, &map) };
                let hidden = out.iter().any(|c| {
                    c.method.name == method.name && c.method.params == method.params
                });
                if !hidden {
                    out.push(MethodCandidate { owner: current.clone(), method });
                }
            }
            queue.extend(self.direct_supertypes(&current));
        }
        // Interfaces still expose the root object's members.
        if !reached_object && !matches!(ty, Type::Class { name, .. } if name == &self.config.object_type) {
            let object = self.object();
            if let Some(info) = self.class(&self.config.object_type) {
                for m in &info.methods {
                    let hidden = out.iter().any(|c| c.method.name == m.name && c.method.params == m.params);
                    if !hidden {
                        out.push(MethodCandidate { owner: object.clone(), method: m.clone() });
                    }
                }
            }
        }
        out
    }

    /// Abstract methods of `ty` left unimplemented anywhere in its hierarchy.
    ///
    /// Types are visited most-derived first, so the first declaration seen
    /// for a signature decides whether it is abstract. A concrete method
    /// declared by a class also implements an interface's abstract method
    /// with the same signature.
    pub fn abstract_methods(&self, ty: &Type) -> Vec<MethodCandidate> {
        let mut abstracts: Vec<MethodCandidate> = Vec::new();
        let mut decided: HashSet<(String, Vec<Type>)> = HashSet::new();
        let mut class_concrete: HashSet<(String, Vec<Type>)> = HashSet::new();
        let mut queue = std::collections::VecDeque::from([ty.clone()]);
        let mut visited = HashSet::new();
        while let Some(current) = queue.pop_front() {
            let Type::Class { name, args } = &current else { continue };
            if !visited.insert(name.clone()) {
                continue;
            }
            let Some(info) = self.class(name) else { continue };
            let map = self.instantiation(info, args);
            for m in info.methods.iter().filter(|m| !m.is_static) {
                let method = substitute_method(m, &map);
                let key = (method.name.clone(), method.params.clone());
                if !method.is_abstract && info.kind != ClassKind::Interface {
                    class_concrete.insert(key.clone());
                }
                if !decided.insert(key) {
                    continue;
                }
                if !method.is_abstract {
                    continue;
                }
                if info.kind == ClassKind::Interface && self.config.is_object_method(&method.name, method.params.len()) {
                    continue;
                }
                abstracts.push(MethodCandidate { owner: current.clone(), method });
            }
            queue.extend(self.direct_supertypes(&current));
        }
        abstracts.retain(|c| {
            let from_interface = matches!(&c.owner, Type::Class { name, .. }
                if self.class(name).is_some_and(|info| info.kind == ClassKind::Interface));
            !(from_interface && class_concrete.contains(&(c.method.name.clone(), c.method.params.clone())))
        });
        abstracts
    }

    /// Single-abstract-method check. Interfaces qualify as true functional
    /// interfaces; abstract classes qualify as SAM-like targets only.
    pub fn find_sam(&self, ty: &Type) -> SamLookup {
        let Type::Class { name, .. } = ty else {
            return SamLookup::NotSam { abstract_methods: 0 };
        };
        let Some(info) = self.class(name) else {
            return SamLookup::NotSam { abstract_methods: 0 };
        };
        let mut abstracts = self.abstract_methods(ty);
        if abstracts.len() != 1 {
            return SamLookup::NotSam { abstract_methods: abstracts.len() };
        }
        let MethodCandidate { method, .. } = abstracts.remove(0);
        SamLookup::Sam(SamSignature {
            owner: ty.clone(),
            method: method.name,
            type_params: method.type_params.iter().map(|tp| tp.name.clone()).collect(),
            params: method.params,
            return_type: method.return_type,
            is_true_interface: info.kind == ClassKind::Interface,
        })
    }
}

fn substitute_method(m: &MethodInfo, map: &HashMap<String, Type>) -> MethodInfo {
    // Method-level type parameters shadow class-level ones.
    let mut map = map.clone();
    for tp in &m.type_params {
        map.remove(&tp.name);
    }
    MethodInfo {
        name: m.name.clone(),
        type_params: m
            .type_params
            .iter()
            .map(|tp| TypeParamDecl { name: tp.name.clone(), bound: tp.bound.as_ref().map(|b| b.substitute(&map)) })
            .collect(),
        params: m.params.iter().map(|p| p.substitute(&map)).collect(),
        return_type: m.return_type.substitute(&map),
        is_abstract: m.is_abstract,
        is_static: m.is_static,
    }
}
