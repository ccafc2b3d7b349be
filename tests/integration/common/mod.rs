#![allow(dead_code)]


use std::process::Command;

use lambdac::config::AnalyzerConfig;
use lambdac::diagnostics::CompileError;
use lambdac::typeck::symbols::SymbolTable;
use lambdac::{analyze_unit, UnitAnalysis};

pub use builder::AstBuilder;

pub const JDK: &str = include_str!("../../fixtures/jdk.toml");

pub fn lambdac() -> Command {
    Command::new(env!("CARGO_BIN_EXE_lambdac"))
}

/// The fixture library plus `extra` class declarations (TOML).
pub fn symbols(extra: &str) -> SymbolTable {
    SymbolTable::from_toml_str(&format!("{JDK}\n{extra}")).expect("fixture symbols should load")
}

pub fn analyze(extra: &str, unit: &lambdac::ast::CompilationUnit) -> Result<UnitAnalysis, CompileError> {
    let table = symbols(extra);
    analyze_unit(unit, &table, &AnalyzerConfig::default())
}

pub fn analyze_ok(extra: &str, unit: &lambdac::ast::CompilationUnit) -> UnitAnalysis {
    match analyze(extra, unit) {
        Ok(analysis) => analysis,
        Err(err) => panic!("analysis of {} failed: {err}", unit.name),
    }
}

pub fn analyze_err(extra: &str, unit: &lambdac::ast::CompilationUnit) -> CompileError {
    match analyze(extra, unit) {
        Ok(_) => panic!("analysis of {} unexpectedly succeeded", unit.name),
        Err(err) => err,
    }
}
