//! The symbol/type oracle consulted by lambda analysis.
//!
//! Class metadata is produced upstream (class loading, reflection); the
//! analysis only reads it through [`TypeOracle`]. [`SymbolTable`] is the
//! in-memory implementation, loadable from TOML.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ast::TypeExpr;
use crate::diagnostics::CompileError;
use super::resolve::resolve_type;
use super::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    Interface,
    Abstract,
    #[default]
    Class,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeParamDecl {
    pub name: String,
    pub bound: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    pub name: String,
    pub type_params: Vec<TypeParamDecl>,
    pub params: Vec<Type>,
    pub return_type: Type,
    pub is_abstract: bool,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    pub ty: Type,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassInfo {
    pub name: String,
    pub kind: ClassKind,
    pub type_params: Vec<TypeParamDecl>,
    pub supertypes: Vec<Type>,
    pub methods: Vec<MethodInfo>,
    pub fields: Vec<FieldInfo>,
}

impl ClassInfo {
    pub fn type_param_names(&self) -> Vec<String> {
        self.type_params.iter().map(|tp| tp.name.clone()).collect()
    }
}

/// Read-only view of declared classes.
pub trait TypeOracle {
    fn class(&self, name: &str) -> Option<&ClassInfo>;

    /// All declared class names, in a stable order.
    fn class_names(&self) -> Vec<&str>;
}

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    classes: BTreeMap<String, ClassInfo>,
}

impl TypeOracle for SymbolTable {
    fn class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    fn class_names(&self) -> Vec<&str> {
        self.classes.keys().map(String::as_str).collect()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, class: ClassInfo) {
        self.classes.insert(class.name.clone(), class);
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn load(path: &Path) -> Result<Self, CompileError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CompileError::symbols(format!("cannot read '{}': {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse a symbol table. Loading is two-phase: every class name and
    /// type-parameter list is registered first so member signatures may
    /// refer to classes declared later in the file.
    pub fn from_toml_str(content: &str) -> Result<Self, CompileError> {
        let doc: TomlSymbols = toml::from_str(content)
            .map_err(|e| CompileError::symbols(format!("invalid symbol table: {e}")))?;

        let mut skeleton = SymbolTable::new();
        for class in &doc.classes {
            if skeleton.class(&class.name).is_some() {
                return Err(CompileError::symbols(format!("class '{}' declared twice", class.name)));
            }
            let type_params = class
                .type_params
                .iter()
                .map(|tp| TypeParamDecl { name: split_bound(tp).0.to_string(), bound: None })
                .collect();
            skeleton.insert(ClassInfo {
                name: class.name.clone(),
                kind: class.kind,
                type_params,
                supertypes: Vec::new(),
                methods: Vec::new(),
                fields: Vec::new(),
            });
        }

        let mut table = SymbolTable::new();
        for class in &doc.classes {
            table.insert(class.resolve(&skeleton)?);
        }
        tracing::debug!(classes = table.len(), "loaded symbol table");
        Ok(table)
    }
}

// ---- TOML deserialization types ----

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlSymbols {
    #[serde(default, rename = "class")]
    classes: Vec<TomlClass>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlClass {
    name: String,
    #[serde(default)]
    kind: ClassKind,
    #[serde(default)]
    type_params: Vec<String>,
    #[serde(default)]
    supertypes: Vec<String>,
    #[serde(default, rename = "method")]
    methods: Vec<TomlMethod>,
    #[serde(default, rename = "field")]
    fields: Vec<TomlField>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlMethod {
    name: String,
    #[serde(default)]
    type_params: Vec<String>,
    #[serde(default)]
    params: Vec<String>,
    #[serde(default = "void_type")]
    returns: String,
    #[serde(default, rename = "abstract")]
    is_abstract: bool,
    #[serde(default, rename = "static")]
    is_static: bool,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlField {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default, rename = "static")]
    is_static: bool,
}

fn void_type() -> String {
    "void".to_string()
}

/// `"T extends Number"` → `("T", Some("Number"))`
fn split_bound(decl: &str) -> (&str, Option<&str>) {
    match decl.split_once(" extends ") {
        Some((name, bound)) => (name.trim(), Some(bound.trim())),
        None => (decl.trim(), None),
    }
}

impl TomlClass {
    fn resolve(&self, skeleton: &SymbolTable) -> Result<ClassInfo, CompileError> {
        let ctx = format!("class '{}'", self.name);
        let class_scope: Vec<String> =
            self.type_params.iter().map(|tp| split_bound(tp).0.to_string()).collect();

        let type_params = resolve_type_params(&self.type_params, &class_scope, skeleton, &ctx)?;

        let mut supertypes = Vec::new();
        for s in &self.supertypes {
            let ty = parse_and_resolve(s, &class_scope, skeleton, &ctx)?;
            if !matches!(ty, Type::Class { .. }) {
                return Err(CompileError::symbols(format!("{ctx}: supertype '{s}' is not a class type")));
            }
            supertypes.push(ty);
        }

        let mut methods = Vec::new();
        for m in &self.methods {
            let mctx = format!("{ctx}, method '{}'", m.name);
            if m.is_abstract && m.is_static {
                return Err(CompileError::symbols(format!("{mctx}: a static method cannot be abstract")));
            }
            if m.is_abstract && self.kind == ClassKind::Class {
                return Err(CompileError::symbols(format!("{mctx}: concrete class declares an abstract method")));
            }
            let mut scope = if m.is_static { Vec::new() } else { class_scope.clone() };
            scope.extend(m.type_params.iter().map(|tp| split_bound(tp).0.to_string()));
            let type_params = resolve_type_params(&m.type_params, &scope, skeleton, &mctx)?;
            let params = m
                .params
                .iter()
                .map(|p| parse_and_resolve(p, &scope, skeleton, &mctx))
                .collect::<Result<Vec<_>, _>>()?;
            let return_type = parse_and_resolve(&m.returns, &scope, skeleton, &mctx)?;
            methods.push(MethodInfo {
                name: m.name.clone(),
                type_params,
                params,
                return_type,
                is_abstract: m.is_abstract,
                is_static: m.is_static,
            });
        }

        let mut fields = Vec::new();
        for f in &self.fields {
            let scope = if f.is_static { Vec::new() } else { class_scope.clone() };
            let ty = parse_and_resolve(&f.ty, &scope, skeleton, &format!("{ctx}, field '{}'", f.name))?;
            fields.push(FieldInfo { name: f.name.clone(), ty, is_static: f.is_static });
        }

        Ok(ClassInfo {
            name: self.name.clone(),
            kind: self.kind,
            type_params,
            supertypes,
            methods,
            fields,
        })
    }
}

fn resolve_type_params(
    decls: &[String],
    scope: &[String],
    skeleton: &SymbolTable,
    ctx: &str,
) -> Result<Vec<TypeParamDecl>, CompileError> {
    decls
        .iter()
        .map(|decl| {
            let (name, bound) = split_bound(decl);
            let bound = bound.map(|b| parse_and_resolve(b, scope, skeleton, ctx)).transpose()?;
            Ok(TypeParamDecl { name: name.to_string(), bound })
        })
        .collect()
}

fn parse_and_resolve(
    text: &str,
    scope: &[String],
    skeleton: &SymbolTable,
    ctx: &str,
) -> Result<Type, CompileError> {
    let te: TypeExpr = text
        .parse()
        .map_err(|e| CompileError::symbols(format!("{ctx}: {e}")))?;
    resolve_type(&te, scope, skeleton).map_err(|e| CompileError::symbols(format!("{ctx}: {e}")))
}
