use crate::language::span::Span;
use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Debug)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub span: Span,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, span: Span) -> Self {
        Self { kind, span }
    }
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}

impl std::error::Error for RuntimeError {}

#[derive(Debug, Error)]
pub enum RuntimeErrorKind {
    #[error("`{receiver}` does not understand `{selector}`")]
    DoesNotUnderstand { selector: String, receiver: String },
    #[error("`{selector}` expected {expected} arguments but received {received}")]
    ArityMismatch {
        selector: String,
        expected: usize,
        received: usize,
    },
    #[error("Type error: {message}")]
    TypeError { message: String },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("`{keyword}` used outside of {context}")]
    ControlFlowOutOfContext {
        keyword: &'static str,
        context: &'static str,
    },
    #[error("Undefined variable `{name}`")]
    UndefinedVariable { name: String },
    #[error("{message}")]
    Message { message: String },
}
