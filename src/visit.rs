//! AST visitor infrastructure
//!
//! `Visitor` is a read-only traversal with default recursion. Override the
//! methods you care about and call the matching `walk_*` function to keep
//! descending; omit the walk call to prune traversal at that node.
//!
//! ```rust
//! use lambdac::visit::{Visitor, walk_expr};
//! use lambdac::ast::Expr;
//! use lambdac::span::Spanned;
//! use std::collections::HashSet;
//!
//! struct IdentCollector {
//!     names: HashSet<String>,
//! }
//!
//! impl Visitor for IdentCollector {
//!     fn visit_expr(&mut self, expr: &Spanned<Expr>) {
//!         if let Expr::Ident(name) = &expr.node {
//!             self.names.insert(name.clone());
//!         }
//!         walk_expr(self, expr);
//!     }
//! }
//! ```

use crate::ast::*;
use crate::span::{Span, Spanned};

pub trait Visitor: Sized {
    fn visit_block(&mut self, block: &Spanned<Block>) {
        walk_block(self, block);
    }

    fn visit_stmt(&mut self, stmt: &Spanned<Stmt>) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Spanned<Expr>) {
        walk_expr(self, expr);
    }

    /// Called for every lambda node; `span` is the span of the enclosing `Expr::Lambda`.
    fn visit_lambda(&mut self, lambda: &LambdaExpr, span: Span) {
        walk_lambda(self, lambda, span);
    }
}

pub fn walk_block<V: Visitor>(v: &mut V, block: &Spanned<Block>) {
    for stmt in &block.node.stmts {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt<V: Visitor>(v: &mut V, stmt: &Spanned<Stmt>) {
    match &stmt.node {
        Stmt::Local { value, .. } => {
            if let Some(value) = value {
                v.visit_expr(value);
            }
        }
        Stmt::Expr(expr) => v.visit_expr(expr),
        Stmt::Return(value) => {
            if let Some(value) = value {
                v.visit_expr(value);
            }
        }
        Stmt::If { condition, then_block, else_block } => {
            v.visit_expr(condition);
            v.visit_block(then_block);
            if let Some(else_block) = else_block {
                v.visit_block(else_block);
            }
        }
        Stmt::While { condition, body } => {
            v.visit_expr(condition);
            v.visit_block(body);
        }
    }
}

pub fn walk_expr<V: Visitor>(v: &mut V, expr: &Spanned<Expr>) {
    match &expr.node {
        Expr::IntLit(_)
        | Expr::LongLit(_)
        | Expr::DoubleLit(_)
        | Expr::BoolLit(_)
        | Expr::StringLit(_)
        | Expr::Null
        | Expr::Ident(_)
        | Expr::This => {}
        Expr::FieldAccess { object, .. } => v.visit_expr(object),
        Expr::MethodCall { object, args, .. } => {
            if let Some(object) = object {
                v.visit_expr(object);
            }
            for arg in args {
                v.visit_expr(arg);
            }
        }
        Expr::BinOp { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        Expr::Assign { target, value, .. } => {
            v.visit_expr(target);
            v.visit_expr(value);
        }
        Expr::Cast { expr: inner, .. } => v.visit_expr(inner),
        Expr::Lambda(lambda) => v.visit_lambda(lambda, expr.span),
        Expr::MethodRef { target, .. } => {
            if let MethodRefTarget::Expr(inner) = target {
                v.visit_expr(inner);
            }
        }
    }
}

pub fn walk_lambda<V: Visitor>(v: &mut V, lambda: &LambdaExpr, _span: Span) {
    match &lambda.body {
        LambdaBody::Expr(body) => v.visit_expr(body),
        LambdaBody::Block(block) => v.visit_block(block),
    }
}
