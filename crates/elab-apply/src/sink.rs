use elab_base::{Diagnostic, Span};
use rustc_hash::FxHashSet;

/// Diagnostics of one top-level run, emitted together at the end.
#[derive(Debug, Default)]
pub(crate) struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub(crate) fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Drains the sink, dropping repeats of the same code, span and message.
    pub(crate) fn finish(&mut self, dedupe: bool) -> Vec<Diagnostic> {
        let diagnostics = std::mem::take(&mut self.diagnostics);
        if !dedupe {
            return diagnostics;
        }
        let mut seen: FxHashSet<(String, Span, String)> = FxHashSet::default();
        diagnostics
            .into_iter()
            .filter(|diagnostic| {
                seen.insert((
                    diagnostic.code.clone(),
                    diagnostic.span,
                    diagnostic.message.clone(),
                ))
            })
            .collect()
    }
}
