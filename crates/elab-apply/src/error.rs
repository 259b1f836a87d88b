use elab_base::{Diagnostic, Span, SuggestedEdit};
use tracing::warn;

/// How a failure should be read by whoever reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The solver's answer and the tree disagree; an upstream defect.
    SolverDesync,
    /// The source is wrong in a way the diagnostics describe.
    UserFixable,
    /// The declarations lack a conformance the library should provide.
    ConformanceMissing,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ElaborationError {
    #[error("solver desync: {message}")]
    SolverDesync { span: Span, message: String },
    #[error("{count} recorded fix(es) prevent elaboration")]
    UserFixable { count: usize },
    #[error("type '{ty}' does not conform to '{protocol}'")]
    ConformanceMissing {
        span: Span,
        ty: String,
        protocol: String,
    },
    #[error("{message}")]
    InvalidConstruction {
        span: Span,
        message: String,
        edit: Option<SuggestedEdit>,
    },
}

pub type Result<T, E = ElaborationError> = std::result::Result<T, E>;

impl ElaborationError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ElaborationError::SolverDesync { .. } => ErrorClass::SolverDesync,
            ElaborationError::UserFixable { .. } | ElaborationError::InvalidConstruction { .. } => {
                ErrorClass::UserFixable
            }
            ElaborationError::ConformanceMissing { .. } => ErrorClass::ConformanceMissing,
        }
    }

    /// The diagnostic reporting this error. `UserFixable` has none of its
    /// own: its fixes were already diagnosed one by one.
    pub fn to_diagnostic(&self) -> Option<Diagnostic> {
        match self {
            ElaborationError::SolverDesync { span, message } => Some(Diagnostic::error(
                "E4001",
                format!("internal error: elaboration out of sync with the solver: {message}"),
                *span,
            )),
            ElaborationError::UserFixable { .. } => None,
            ElaborationError::ConformanceMissing { span, ty, protocol } => Some(Diagnostic::error(
                "E4003",
                format!("internal error: type '{ty}' does not conform to '{protocol}'"),
                *span,
            )),
            ElaborationError::InvalidConstruction {
                span,
                message,
                edit,
            } => {
                let diagnostic = Diagnostic::error("E4004", message.clone(), *span);
                Some(match edit {
                    Some(edit) => diagnostic.with_edit(edit.clone()),
                    None => diagnostic,
                })
            }
        }
    }
}

pub(crate) fn desync(span: Span, message: impl Into<String>) -> ElaborationError {
    let message = message.into();
    warn!(%message, "solver desync");
    ElaborationError::SolverDesync { span, message }
}

/// A failed run: the error that stopped it and every diagnostic collected so far.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{error}")]
pub struct ElaborationFailure {
    pub error: ElaborationError,
    pub diagnostics: Vec<Diagnostic>,
}
