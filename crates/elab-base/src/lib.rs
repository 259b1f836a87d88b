mod diagnostics;
mod span;

#[cfg(test)]
mod diagnostics_tests;

use serde::{Deserialize, Serialize};

pub use diagnostics::{
    Diagnostic, DiagnosticLabel, DiagnosticSeverity, EditKind, SuggestedEdit,
    diagnostics_have_errors, render_diagnostics,
};
pub use span::{Position, Span};

/// Stable identity of one expression node. Locators anchor on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExprId(pub u32);

impl std::fmt::Display for ExprId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
