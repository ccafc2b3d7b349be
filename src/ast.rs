//! Input AST for lambda analysis.
//!
//! Units arrive already parsed (the parser is an upstream stage); the tree
//! derives serde so pre-parsed units can be loaded from JSON. Type
//! annotations are kept in surface syntax (`Comparator<Integer>`, `int[]`)
//! and resolved against the symbol table by `typeck::resolve`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::span::Spanned;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilationUnit {
    pub name: String,
    /// Original source text, used only for diagnostic rendering.
    #[serde(default)]
    pub source: Option<String>,
    pub classes: Vec<Spanned<ClassDecl>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: Spanned<String>,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
    #[serde(default)]
    pub methods: Vec<Spanned<MethodDecl>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: Spanned<String>,
    pub ty: Spanned<TypeExpr>,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub value: Option<Spanned<Expr>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: Spanned<String>,
    #[serde(default)]
    pub type_params: Vec<String>,
    #[serde(default)]
    pub params: Vec<Param>,
    /// `None` means `void`.
    #[serde(default)]
    pub return_type: Option<Spanned<TypeExpr>>,
    #[serde(default)]
    pub is_static: bool,
    pub body: Spanned<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: Spanned<String>,
    pub ty: Spanned<TypeExpr>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Spanned<Stmt>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// `T name = value;` or `var name = value;` (when `ty` is absent).
    Local {
        name: Spanned<String>,
        ty: Option<Spanned<TypeExpr>>,
        value: Option<Spanned<Expr>>,
    },
    Expr(Spanned<Expr>),
    Return(Option<Spanned<Expr>>),
    If {
        condition: Spanned<Expr>,
        then_block: Spanned<Block>,
        else_block: Option<Spanned<Block>>,
    },
    While {
        condition: Spanned<Expr>,
        body: Spanned<Block>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    And,
    Or,
}

impl BinOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(self, BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod)
    }

    pub fn is_comparison(self) -> bool {
        matches!(self, BinOp::Lt | BinOp::Gt | BinOp::LtEq | BinOp::GtEq)
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Neq => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::LtEq => "<=",
            BinOp::GtEq => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    IntLit(i64),
    LongLit(i64),
    DoubleLit(f64),
    BoolLit(bool),
    StringLit(String),
    Null,
    Ident(String),
    This,
    FieldAccess {
        object: Box<Spanned<Expr>>,
        field: Spanned<String>,
    },
    /// `object.method(args)`; `object == None` is an unqualified call.
    /// `type_args` is an explicit generic witness (`Util.<String>make(..)`).
    MethodCall {
        object: Option<Box<Spanned<Expr>>>,
        method: Spanned<String>,
        #[serde(default)]
        type_args: Vec<Spanned<TypeExpr>>,
        args: Vec<Spanned<Expr>>,
    },
    BinOp {
        op: BinOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },
    /// `target = value`, or `target op= value` when `op` is set.
    Assign {
        target: Box<Spanned<Expr>>,
        #[serde(default)]
        op: Option<BinOp>,
        value: Box<Spanned<Expr>>,
    },
    /// `(A & B) expr`; a plain cast has a single target type.
    Cast {
        target_types: Vec<Spanned<TypeExpr>>,
        expr: Box<Spanned<Expr>>,
    },
    Lambda(LambdaExpr),
    MethodRef {
        target: MethodRefTarget,
        method: Spanned<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaExpr {
    pub params: Vec<LambdaParam>,
    pub body: LambdaBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaParam {
    pub name: Spanned<String>,
    #[serde(default)]
    pub ty: Option<Spanned<TypeExpr>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LambdaBody {
    Expr(Box<Spanned<Expr>>),
    Block(Spanned<Block>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MethodRefTarget {
    /// `Type::method`
    Type(Spanned<TypeExpr>),
    /// `expr::method`, including `this::method`
    Expr(Box<Spanned<Expr>>),
}

/// A type annotation in surface syntax.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeExpr {
    Named(String),
    Generic { name: String, args: Vec<TypeExpr> },
    Array(Box<TypeExpr>),
    /// `?`, `? extends T`, `? super T`
    Wildcard(Option<(WildcardBound, Box<TypeExpr>)>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WildcardBound {
    Extends,
    Super,
}

impl TypeExpr {
    pub fn named(name: &str) -> Self {
        TypeExpr::Named(name.to_string())
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named(name) => write!(f, "{name}"),
            TypeExpr::Generic { name, args } => {
                write!(f, "{name}<")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{a}")?;
                }
                write!(f, ">")
            }
            TypeExpr::Array(inner) => write!(f, "{inner}[]"),
            TypeExpr::Wildcard(None) => write!(f, "?"),
            TypeExpr::Wildcard(Some((WildcardBound::Extends, t))) => write!(f, "? extends {t}"),
            TypeExpr::Wildcard(Some((WildcardBound::Super, t))) => write!(f, "? super {t}"),
        }
    }
}

impl From<TypeExpr> for String {
    fn from(te: TypeExpr) -> String {
        te.to_string()
    }
}

impl TryFrom<String> for TypeExpr {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl FromStr for TypeExpr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut p = TypeSyntax { src: s, pos: 0 };
        let te = p.parse_type()?;
        p.skip_ws();
        if p.pos != s.len() {
            return Err(format!("unexpected '{}' in type '{}'", &s[p.pos..], s));
        }
        Ok(te)
    }
}

/// Recursive-descent reader for type annotations.
struct TypeSyntax<'a> {
    src: &'a str,
    pos: usize,
}

impl TypeSyntax<'_> {
    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() { break; }
            self.pos += c.len_utf8();
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Result<String, String> {
        self.skip_ws();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '$' || c == '.' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        if start == self.pos {
            return Err(format!("expected type name at offset {} in '{}'", start, self.src));
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn parse_type(&mut self) -> Result<TypeExpr, String> {
        if self.eat('?') {
            self.skip_ws();
            let rest = &self.src[self.pos..];
            let bound = if rest.starts_with("extends ") {
                self.pos += "extends ".len();
                Some(WildcardBound::Extends)
            } else if rest.starts_with("super ") {
                self.pos += "super ".len();
                Some(WildcardBound::Super)
            } else {
                None
            };
            return match bound {
                Some(kind) => Ok(TypeExpr::Wildcard(Some((kind, Box::new(self.parse_type()?))))),
                None => Ok(TypeExpr::Wildcard(None)),
            };
        }

        let name = self.ident()?;
        let mut ty = if self.eat('<') {
            let mut args = vec![self.parse_type()?];
            while self.eat(',') {
                args.push(self.parse_type()?);
            }
            if !self.eat('>') {
                return Err(format!("unclosed '<' in type '{}'", self.src));
            }
            TypeExpr::Generic { name, args }
        } else {
            TypeExpr::Named(name)
        };
        while self.eat('[') {
            if !self.eat(']') {
                return Err(format!("expected ']' in type '{}'", self.src));
            }
            ty = TypeExpr::Array(Box::new(ty));
        }
        Ok(ty)
    }
}
