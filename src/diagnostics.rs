use crate::language::errors::SyntaxErrors;
use crate::runtime::error::RuntimeError;
use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{message}")]
pub struct SyntaxDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("here")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
}

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
pub struct RuntimeDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("while evaluating this")]
    span: SourceSpan,
    message: String,
}

pub fn emit_syntax_errors(path: &Path, source: &str, errors: &SyntaxErrors) {
    let src = NamedSource::new(path.display().to_string(), source.to_string());
    for err in &errors.errors {
        let diagnostic = SyntaxDiagnostic {
            src: src.clone(),
            span: err.to_source_span(),
            help: err.help.clone(),
            message: err.message.clone(),
        };
        eprintln!("{:?}", Report::new(diagnostic));
    }
}

pub fn emit_runtime_error(path: &Path, source: &str, error: &RuntimeError) {
    let diagnostic = RuntimeDiagnostic {
        src: NamedSource::new(path.display().to_string(), source.to_string()),
        span: (error.span.start, error.span.len()).into(),
        message: error.to_string(),
    };
    eprintln!("{:?}", Report::new(diagnostic));
}

pub fn report_io_error(path: &Path, error: &std::io::Error) {
    eprintln!("Failed to access {}: {}", path.display(), error);
}
