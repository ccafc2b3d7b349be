//! Lambda and method-reference analysis for a Java-like language.
//!
//! Given parsed compilation units and a symbol oracle, the analysis decides
//! for every lambda which functional interface it implements, what its
//! parameter and return types are, what it captures and how, how it should
//! be lowered, and whether it satisfies the serializable contract.

pub mod ast;
pub mod batch;
pub mod config;
pub mod diagnostics;
pub mod span;
pub mod typeck;
pub mod visit;

use std::path::Path;

use ast::CompilationUnit;
use config::AnalyzerConfig;
use diagnostics::CompileError;
use typeck::symbols::SymbolTable;

pub use batch::analyze_units;
pub use typeck::{analyze_unit, LambdaBinding, UnitAnalysis};

/// Read a pre-parsed compilation unit from its JSON form.
pub fn load_unit(path: &Path) -> Result<CompilationUnit, CompileError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CompileError::config(format!("cannot read unit: {e}"), Some(path.to_path_buf())))?;
    let mut unit: CompilationUnit = serde_json::from_str(&content)
        .map_err(|e| CompileError::config(format!("invalid unit: {e}"), Some(path.to_path_buf())))?;
    if unit.source.is_none() {
        // A sibling `.java` file, when present, is used for diagnostics.
        unit.source = std::fs::read_to_string(path.with_extension("java")).ok();
    }
    Ok(unit)
}

/// Analyze the unit at `unit_path` against the symbol table at `symbols_path`.
pub fn analyze_file(
    unit_path: &Path,
    symbols_path: &Path,
    config: &AnalyzerConfig,
) -> Result<UnitAnalysis, CompileError> {
    let table = SymbolTable::load(symbols_path)?;
    let unit = load_unit(unit_path)?;
    analyze_unit(&unit, &table, config)
}
