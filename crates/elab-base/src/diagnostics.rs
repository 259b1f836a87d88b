use serde::{Deserialize, Serialize};

use crate::span::Span;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiagnosticLabel {
    pub message: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditKind {
    Insert,
    Replace,
}

/// A fix-it: insert `text` at `span.start`, or replace the text covered by `span`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SuggestedEdit {
    pub kind: EditKind,
    pub span: Span,
    pub text: String,
}

impl SuggestedEdit {
    pub fn insert(at: Span, text: impl Into<String>) -> Self {
        Self {
            kind: EditKind::Insert,
            span: at,
            text: text.into(),
        }
    }

    pub fn replace(span: Span, text: impl Into<String>) -> Self {
        Self {
            kind: EditKind::Replace,
            span,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: String,
    pub severity: DiagnosticSeverity,
    pub message: String,
    pub span: Span,
    #[serde(default)]
    pub labels: Vec<DiagnosticLabel>,
    #[serde(default)]
    pub edits: Vec<SuggestedEdit>,
}

impl Diagnostic {
    pub fn error(code: &str, message: impl Into<String>, span: Span) -> Self {
        Self::new(code, DiagnosticSeverity::Error, message.into(), span)
    }

    pub fn warning(code: &str, message: impl Into<String>, span: Span) -> Self {
        Self::new(code, DiagnosticSeverity::Warning, message.into(), span)
    }

    fn new(code: &str, severity: DiagnosticSeverity, message: String, span: Span) -> Self {
        Self {
            code: code.to_string(),
            severity,
            message,
            span,
            labels: Vec::new(),
            edits: Vec::new(),
        }
    }

    pub fn with_label(mut self, message: impl Into<String>, span: Span) -> Self {
        self.labels.push(DiagnosticLabel {
            message: message.into(),
            span,
        });
        self
    }

    pub fn with_edit(mut self, edit: SuggestedEdit) -> Self {
        self.edits.push(edit);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

// ANSI color codes
const RED: &str = "\x1b[1;31m";
const YELLOW: &str = "\x1b[1;33m";
const CYAN: &str = "\x1b[1;36m";
const GREEN: &str = "\x1b[1;32m";
const DARK_GRAY: &str = "\x1b[90m";
const WHITE: &str = "\x1b[97m";
const ORANGE: &str = "\x1b[38;5;208m";
const RESET: &str = "\x1b[0m";

pub fn diagnostics_have_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

/// Renders diagnostics the way the command-line driver prints them. `source`
/// is the text the spans point into; without it no source frames are drawn.
pub fn render_diagnostics(
    path: &str,
    source: Option<&str>,
    diagnostics: &[Diagnostic],
    use_color: bool,
) -> String {
    let mut output = String::new();
    for (index, diagnostic) in diagnostics.iter().enumerate() {
        if index > 0 {
            output.push('\n');
        }
        output.push_str(&render_diagnostic_with_source(
            path, diagnostic, source, use_color,
        ));
    }
    output
}

fn caret_color(severity: DiagnosticSeverity) -> &'static str {
    match severity {
        DiagnosticSeverity::Error => RED,
        DiagnosticSeverity::Warning => YELLOW,
    }
}

fn caret_message_color(severity: DiagnosticSeverity) -> &'static str {
    match severity {
        DiagnosticSeverity::Error => ORANGE,
        DiagnosticSeverity::Warning => YELLOW,
    }
}

fn render_diagnostic_with_source(
    path: &str,
    diagnostic: &Diagnostic,
    source: Option<&str>,
    use_color: bool,
) -> String {
    let mut output = String::new();
    let start = &diagnostic.span.start;
    let severity_label = match diagnostic.severity {
        DiagnosticSeverity::Error => "error",
        DiagnosticSeverity::Warning => "warning",
    };
    if use_color {
        output.push_str(&format!(
            "{YELLOW}{severity_label}[{}]{RESET} {DARK_GRAY}{}:{}:{}{RESET}\n  {WHITE}{}{RESET}\n",
            diagnostic.code, path, start.line, start.column, diagnostic.message
        ));
    } else {
        output.push_str(&format!(
            "{severity_label}[{}] {}:{}:{}\n  {}\n",
            diagnostic.code, path, start.line, start.column, diagnostic.message
        ));
    }
    if let Some(frame) = source.and_then(|source| {
        render_source_frame(
            source,
            &diagnostic.span,
            Some(&diagnostic.message),
            use_color,
            diagnostic.severity,
        )
    }) {
        output.push_str(&frame);
    }
    for label in &diagnostic.labels {
        let pos = &label.span.start;
        if use_color {
            output.push_str(&format!(
                "{CYAN}note{RESET}: {WHITE}{}{RESET} at {DARK_GRAY}{}:{}:{}{RESET}\n",
                label.message, path, pos.line, pos.column
            ));
        } else {
            output.push_str(&format!(
                "note: {} at {}:{}:{}\n",
                label.message, path, pos.line, pos.column
            ));
        }
    }
    for edit in &diagnostic.edits {
        let pos = &edit.span.start;
        let action = match edit.kind {
            EditKind::Insert => "insert",
            EditKind::Replace => "replace with",
        };
        if use_color {
            output.push_str(&format!(
                "{GREEN}fix{RESET}: {action} '{}' at {DARK_GRAY}{}:{}:{}{RESET}\n",
                edit.text, path, pos.line, pos.column
            ));
        } else {
            output.push_str(&format!(
                "fix: {action} '{}' at {}:{}:{}\n",
                edit.text, path, pos.line, pos.column
            ));
        }
    }
    output.trim_end().to_string()
}

fn render_source_frame(
    source: &str,
    span: &Span,
    message: Option<&str>,
    use_color: bool,
    severity: DiagnosticSeverity,
) -> Option<String> {
    let line_index = span.start.line.checked_sub(1)?;
    let line = source.lines().nth(line_index)?;
    let line_no = span.start.line;
    let width = line_no.to_string().len();

    let mut output = String::new();
    if use_color {
        output.push_str(&format!("{DARK_GRAY}{:>width$} |{RESET}\n", ""));
        output.push_str(&format!("{DARK_GRAY}{line_no:>width$} |{RESET} {line}\n"));
    } else {
        output.push_str(&format!("{:>width$} |\n", ""));
        output.push_str(&format!("{line_no:>width$} | {line}\n"));
    }

    let line_len = line.chars().count();
    let start_col = span.start.column.clamp(1, line_len + 1);
    let end_col = if span.start.line == span.end.line {
        span.end.column.clamp(start_col, line_len.max(start_col))
    } else {
        start_col
    };
    let caret_len = end_col - start_col + 1;

    let padding = " ".repeat(start_col - 1);
    let carets = "^".repeat(caret_len);
    let mut caret_line = if use_color {
        format!(
            "{DARK_GRAY}{:>width$} |{RESET} {padding}{}{carets}{RESET}",
            "",
            caret_color(severity)
        )
    } else {
        format!("{:>width$} | {padding}{carets}", "")
    };
    if let Some(message) = message {
        caret_line.push(' ');
        if use_color {
            caret_line.push_str(caret_message_color(severity));
            caret_line.push_str(message);
            caret_line.push_str(RESET);
        } else {
            caret_line.push_str(message);
        }
    }
    caret_line.push('\n');
    output.push_str(&caret_line);
    Some(output)
}
