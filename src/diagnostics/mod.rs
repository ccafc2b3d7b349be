use crate::span::Span;
use std::path::PathBuf;
use thiserror::Error;

/// Every failure the lambda analysis phase can report. All of them are hard
/// errors: the current lambda use-site (and with it the compilation unit)
/// is abandoned.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    #[error("Not a functional interface: {msg}")]
    NotAFunctionalInterface { msg: String, span: Span },

    #[error("Ambiguous target: {msg}")]
    AmbiguousTarget { msg: String, span: Span },

    #[error("Arity mismatch: {msg}")]
    ArityMismatch { msg: String, span: Span },

    #[error("Expected type {expected} for lambda parameter: {param}")]
    ParameterTypeMismatch { expected: String, param: String, span: Span },

    #[error("Return type mismatch: {msg}")]
    ReturnTypeMismatch { msg: String, span: Span },

    #[error("Type parameter conflict: {msg}")]
    TypeParameterConflict { msg: String, param: String, span: Span },

    #[error("Not serializable: {msg}")]
    NotSerializable { msg: String, class: String, span: Span },

    #[error("Type error: {msg}")]
    Type { msg: String, span: Span },

    #[error("Symbol table error: {msg}")]
    Symbols { msg: String },

    #[error("Config error: {msg}")]
    Config { msg: String, path: Option<PathBuf> },
}

impl CompileError {
    pub fn not_functional(msg: impl Into<String>, span: Span) -> Self {
        Self::NotAFunctionalInterface { msg: msg.into(), span }
    }

    pub fn ambiguous(msg: impl Into<String>, span: Span) -> Self {
        Self::AmbiguousTarget { msg: msg.into(), span }
    }

    pub fn arity(msg: impl Into<String>, span: Span) -> Self {
        Self::ArityMismatch { msg: msg.into(), span }
    }

    pub fn param_mismatch(expected: impl Into<String>, param: impl Into<String>, span: Span) -> Self {
        Self::ParameterTypeMismatch { expected: expected.into(), param: param.into(), span }
    }

    pub fn return_mismatch(msg: impl Into<String>, span: Span) -> Self {
        Self::ReturnTypeMismatch { msg: msg.into(), span }
    }

    pub fn type_param_conflict(msg: impl Into<String>, param: impl Into<String>, span: Span) -> Self {
        Self::TypeParameterConflict { msg: msg.into(), param: param.into(), span }
    }

    pub fn not_serializable(msg: impl Into<String>, class: impl Into<String>, span: Span) -> Self {
        Self::NotSerializable { msg: msg.into(), class: class.into(), span }
    }

    pub fn type_err(msg: impl Into<String>, span: Span) -> Self {
        Self::Type { msg: msg.into(), span }
    }

    pub fn symbols(msg: impl Into<String>) -> Self {
        Self::Symbols { msg: msg.into() }
    }

    pub fn config(msg: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Config { msg: msg.into(), path }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::NotAFunctionalInterface { span, .. }
            | CompileError::AmbiguousTarget { span, .. }
            | CompileError::ArityMismatch { span, .. }
            | CompileError::ParameterTypeMismatch { span, .. }
            | CompileError::ReturnTypeMismatch { span, .. }
            | CompileError::TypeParameterConflict { span, .. }
            | CompileError::NotSerializable { span, .. }
            | CompileError::Type { span, .. } => Some(*span),
            CompileError::Symbols { .. } | CompileError::Config { .. } => None,
        }
    }

    /// Short machine-readable kind, used by the CLI's JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            CompileError::NotAFunctionalInterface { .. } => "not-a-functional-interface",
            CompileError::AmbiguousTarget { .. } => "ambiguous-target",
            CompileError::ArityMismatch { .. } => "arity-mismatch",
            CompileError::ParameterTypeMismatch { .. } => "parameter-type-mismatch",
            CompileError::ReturnTypeMismatch { .. } => "return-type-mismatch",
            CompileError::TypeParameterConflict { .. } => "type-parameter-conflict",
            CompileError::NotSerializable { .. } => "not-serializable",
            CompileError::Type { .. } => "type",
            CompileError::Symbols { .. } => "symbols",
            CompileError::Config { .. } => "config",
        }
    }
}

/// Render a CompileError with ariadne for nice terminal output.
pub fn render_error(source: Option<&str>, filename: &str, err: &CompileError) {
    use ariadne::{Label, Report, ReportKind, Source};

    match (err.span(), source) {
        (Some(span), Some(source)) => {
            let result = Report::build(ReportKind::Error, (), span.start)
                .with_message(format!("{} error in {filename}", err.kind()))
                .with_label(Label::new(span.start..span.end).with_message(err.to_string()))
                .finish()
                .eprint(Source::from(source));
            if result.is_err() {
                eprintln!("error [{filename}]: {err}");
            }
        }
        (Some(span), None) => {
            eprintln!("error [{filename}:{}..{}]: {err}", span.start, span.end);
        }
        (None, _) => match err {
            CompileError::Config { path: Some(path), .. } => {
                eprintln!("error[config]: {err}");
                eprintln!("  --> {}", path.display());
            }
            _ => eprintln!("error: {err}"),
        },
    }
}
