#![deny(clippy::unwrap_used)]

pub mod cli;

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use elab_apply::{
    DeferredClosure, Elaborated, ElaborationContext, ElaborationError, ElaborationFailure, ElaborationOptions,
    ElaborationRequest, ExistentialEvent, OptionsError, elaborate,
};
use elab_base::{Diagnostic, render_diagnostics};
use elab_syntax::{Expr, dump_expr};
use elab_typing::{DeclTable, Solution};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("invalid fixture {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Options(#[from] OptionsError),
    #[error("{0}")]
    Usage(String),
    /// The diagnostics are printed before this is returned.
    #[error("elaboration failed: {0}")]
    Elaboration(ElaborationError),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Elaboration(_) => 1,
            CliError::Io(_) | CliError::Json { .. } | CliError::Options(_) | CliError::Usage(_) => 2,
        }
    }
}

/// One solved expression plus everything needed to elaborate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    pub expr: Expr,
    #[serde(default)]
    pub solution: Solution,
    /// Falls back to the core library when absent.
    #[serde(default)]
    pub declarations: Option<DeclTable>,
    /// Text the spans point into, used for source frames.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub context: ElaborationContext,
}

impl Fixture {
    pub fn parse(text: &str, path: &Path) -> Result<Self, CliError> {
        serde_json::from_str(text).map_err(|source| CliError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, path)
    }

    pub fn declarations(&self) -> Cow<'_, DeclTable> {
        match &self.declarations {
            Some(decls) => Cow::Borrowed(decls),
            None => Cow::Owned(DeclTable::with_core_library()),
        }
    }
}

/// What a run produced, in a shape that serializes for `--json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expr: Option<Expr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<ExistentialEvent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deferred: Vec<DeferredClosure>,
    #[serde(skip)]
    pub failure: Option<ElaborationError>,
}

impl From<Elaborated> for RunReport {
    fn from(elaborated: Elaborated) -> Self {
        Self {
            ok: true,
            expr: Some(elaborated.expr),
            error: None,
            diagnostics: elaborated.diagnostics,
            events: elaborated.events,
            deferred: elaborated.deferred,
            failure: None,
        }
    }
}

impl From<ElaborationFailure> for RunReport {
    fn from(failure: ElaborationFailure) -> Self {
        Self {
            ok: false,
            expr: None,
            error: Some(failure.error.to_string()),
            diagnostics: failure.diagnostics,
            events: Vec::new(),
            deferred: Vec::new(),
            failure: Some(failure.error),
        }
    }
}

pub fn run_fixture(fixture: &Fixture, options: &ElaborationOptions) -> RunReport {
    let decls = fixture.declarations();
    debug!(root = %fixture.expr.id, "running fixture");
    let outcome = elaborate(ElaborationRequest {
        expr: fixture.expr.clone(),
        decls: &decls,
        solution: &fixture.solution,
        options,
        context: fixture.context.clone(),
    });
    let report: RunReport = match outcome {
        Ok(elaborated) => elaborated.into(),
        Err(failure) => failure.into(),
    };
    info!(ok = report.ok, diagnostics = report.diagnostics.len(), "fixture finished");
    report
}

/// The tree dump followed by the rendered diagnostics, as `elab run` prints them.
pub fn render_report(fixture: &Fixture, options: &ElaborationOptions, report: &RunReport, use_color: bool) -> String {
    let mut output = String::new();
    match (&report.expr, &report.error) {
        (Some(expr), _) => {
            output.push_str(&dump_expr(expr, &fixture.declarations()));
            output.push('\n');
        }
        (None, Some(error)) => {
            output.push_str(&format!("elaboration failed: {error}\n"));
        }
        (None, None) => {}
    }
    let rendered = render_diagnostics(
        &options.source_name,
        fixture.source.as_deref(),
        &report.diagnostics,
        use_color,
    );
    if !rendered.is_empty() {
        output.push_str(&rendered);
        if !rendered.ends_with('\n') {
            output.push('\n');
        }
    }
    output
}
