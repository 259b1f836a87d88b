use std::collections::VecDeque;

use elab_base::{Diagnostic, ExprId, Span, SuggestedEdit};
use elab_syntax::{Expr, ExprKind, OpaqueId, max_id};
use elab_typing::{ConformanceRef, DeclId, DeclTable, ProtocolId, Solution, Type};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span};

use crate::closures::{ClosureBodySolver, DeferredClosure};
use crate::config::ElaborationOptions;
use crate::error::{ElaborationError, ElaborationFailure, Result, desync};
use crate::existential::{ExistentialEvent, ExistentialTracker};
use crate::fixes;
use crate::sink::DiagnosticSink;

/// Where the expression being elaborated sits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElaborationContext {
    /// The function, initializer or deinitializer whose body holds the expression.
    #[serde(default)]
    pub enclosing_decl: Option<DeclId>,
    /// Value `#function` materializes to.
    #[serde(default)]
    pub function_name: String,
}

pub struct ElaborationRequest<'a> {
    pub expr: Expr,
    pub decls: &'a DeclTable,
    pub solution: &'a Solution,
    pub options: &'a ElaborationOptions,
    pub context: ElaborationContext,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Elaborated {
    pub expr: Expr,
    /// Warnings; a successful run never carries errors.
    pub diagnostics: Vec<Diagnostic>,
    pub events: Vec<ExistentialEvent>,
    /// Multi-statement closure bodies still waiting for their second pass.
    pub deferred: Vec<DeferredClosure>,
}

/// A forced downcast whose result was injected into an optional.
#[derive(Debug, Clone)]
pub(crate) struct SuspiciousInjection {
    pub(crate) cast: ExprId,
    pub(crate) keyword: Span,
    pub(crate) cast_span: Span,
    pub(crate) target: Type,
    pub(crate) parenthesized: bool,
}

#[derive(Debug, Default)]
pub(crate) struct LookupCache {
    conformances: FxHashMap<(Type, ProtocolId), Option<ConformanceRef>>,
    witnesses: FxHashMap<(ConformanceRef, DeclId), Option<DeclId>>,
}

/// Rewrites one solved expression. Owns every piece of mutable state a run
/// needs; the declarations, the solution and the options are only read.
pub struct Elaborator<'a> {
    pub(crate) decls: &'a DeclTable,
    pub(crate) solution: &'a Solution,
    pub(crate) options: &'a ElaborationOptions,
    pub(crate) context: ElaborationContext,
    pub(crate) existentials: ExistentialTracker,
    pub(crate) deferred: VecDeque<DeferredClosure>,
    pub(crate) sink: DiagnosticSink,
    pub(crate) suspicious: Vec<SuspiciousInjection>,
    /// Casts that already carry a warning of their own.
    pub(crate) diagnosed: FxHashSet<ExprId>,
    cache: LookupCache,
    next_id: u32,
    next_opaque: u32,
}

pub fn elaborate(request: ElaborationRequest<'_>) -> Result<Elaborated, ElaborationFailure> {
    let ElaborationRequest {
        expr,
        decls,
        solution,
        options,
        context,
    } = request;
    let span = debug_span!("elaborate", anchor = %expr.id);
    let _guard = span.enter();
    let first_id = max_id(&expr).0 + 1;
    let mut elaborator = Elaborator::new(decls, solution, options, context, first_id);
    elaborator.run(expr)
}

/// Runs [`elaborate`], then elaborates every deferred closure body with the
/// solution `solver` produces for it.
pub fn elaborate_with_closures(
    request: ElaborationRequest<'_>,
    solver: &mut dyn ClosureBodySolver,
) -> Result<Elaborated, ElaborationFailure> {
    let ElaborationRequest {
        expr,
        decls,
        solution,
        options,
        context,
    } = request;
    let span = debug_span!("elaborate", anchor = %expr.id);
    let _guard = span.enter();
    let first_id = max_id(&expr).0 + 1;
    let mut elaborator = Elaborator::new(decls, solution, options, context.clone(), first_id);
    let first_pass = elaborator.run(expr)?;
    crate::closures::second_pass(
        first_pass,
        decls,
        options,
        context,
        elaborator.next_id,
        solver,
    )
}

impl<'a> Elaborator<'a> {
    pub fn new(
        decls: &'a DeclTable,
        solution: &'a Solution,
        options: &'a ElaborationOptions,
        context: ElaborationContext,
        first_id: u32,
    ) -> Self {
        Self {
            decls,
            solution,
            options,
            context,
            existentials: ExistentialTracker::default(),
            deferred: VecDeque::new(),
            sink: DiagnosticSink::default(),
            suspicious: Vec::new(),
            diagnosed: FxHashSet::default(),
            cache: LookupCache::default(),
            next_id: first_id,
            next_opaque: 0,
        }
    }

    pub(crate) fn next_id(&self) -> u32 {
        self.next_id
    }

    fn run(&mut self, expr: Expr) -> Result<Elaborated, ElaborationFailure> {
        debug!(fixes = self.solution.fixes().len(), "elaboration started");
        if !self.solution.fixes().is_empty() {
            let count = fixes::diagnose_fixes(self, &[&expr]);
            return Err(self.fail(ElaborationError::UserFixable { count }));
        }
        let expr = match self.walk(expr, 0, 0) {
            Ok(expr) => expr,
            Err(error) => return Err(self.fail(error)),
        };
        if let Err(error) = self.check_balanced(expr.span) {
            return Err(self.fail(error));
        }
        self.finalize_injections();
        debug!(next_id = self.next_id, "elaboration finished");
        Ok(Elaborated {
            expr,
            diagnostics: self.sink.finish(self.options.dedupe_diagnostics),
            events: self.existentials.take_events(),
            deferred: self.deferred.drain(..).collect(),
        })
    }

    /// Every opened existential has been closed again.
    pub(crate) fn check_balanced(&self, span: Span) -> Result<()> {
        match self.existentials.top() {
            Some(open) => Err(desync(
                span,
                format!(
                    "opened existential {} was never closed (closing depth {})",
                    open.opaque.0, open.closing_depth
                ),
            )),
            None => Ok(()),
        }
    }

    pub(crate) fn fail(&mut self, error: ElaborationError) -> ElaborationFailure {
        if let Some(diagnostic) = error.to_diagnostic() {
            self.sink.push(diagnostic);
        }
        ElaborationFailure {
            error,
            diagnostics: self.sink.finish(self.options.dedupe_diagnostics),
        }
    }

    pub(crate) fn fresh_id(&mut self) -> ExprId {
        let id = ExprId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn fresh_opaque(&mut self) -> OpaqueId {
        let opaque = OpaqueId(self.next_opaque);
        self.next_opaque += 1;
        opaque
    }

    /// A synthesized node with a fresh id.
    pub(crate) fn implicit(&mut self, span: Span, ty: Type, kind: ExprKind) -> Expr {
        let id = self.fresh_id();
        Expr::implicit(id, span, ty, kind)
    }

    /// Wraps `expr` in a single-operand conversion node of type `ty`.
    pub(crate) fn wrap(&mut self, expr: Expr, ty: Type, make: fn(Box<Expr>) -> ExprKind) -> Expr {
        let span = expr.span;
        self.implicit(span, ty, make(Box::new(expr)))
    }

    pub(crate) fn simplify(&self, ty: &Type, span: Span) -> Result<Type> {
        self.solution
            .simplify_type(ty)
            .map_err(|unbound| desync(span, unbound.to_string()))
    }

    pub(crate) fn type_name(&self, ty: &Type) -> String {
        self.decls.type_name(ty)
    }

    pub(crate) fn conformance(&mut self, ty: &Type, protocol: ProtocolId) -> Option<ConformanceRef> {
        let decls = self.decls;
        *self
            .cache
            .conformances
            .entry((ty.clone(), protocol))
            .or_insert_with(|| decls.conforms_to(ty, protocol))
    }

    pub(crate) fn witness(&mut self, conformance: ConformanceRef, requirement: DeclId) -> Option<DeclId> {
        let decls = self.decls;
        *self
            .cache
            .witnesses
            .entry((conformance, requirement))
            .or_insert_with(|| decls.witness(conformance, requirement))
    }

    pub(crate) fn require_conformance(
        &mut self,
        ty: &Type,
        protocol: ProtocolId,
        span: Span,
    ) -> Result<ConformanceRef> {
        match self.conformance(ty, protocol) {
            Some(conformance) => Ok(conformance),
            None => Err(ElaborationError::ConformanceMissing {
                span,
                ty: self.type_name(ty),
                protocol: self.decls.protocol(protocol).name.clone(),
            }),
        }
    }

    pub(crate) fn warn(&mut self, diagnostic: Diagnostic) {
        debug!(code = %diagnostic.code, message = %diagnostic.message, "warning");
        self.sink.push(diagnostic);
    }

    pub(crate) fn finalize_injections(&mut self) {
        let injections = std::mem::take(&mut self.suspicious);
        for injection in injections {
            if injection.parenthesized || self.diagnosed.contains(&injection.cast) {
                continue;
            }
            self.diagnosed.insert(injection.cast);
            let target = self.type_name(&injection.target);
            let diagnostic = Diagnostic::warning(
                "W4103",
                format!("treating a forced downcast to '{target}' as optional will never produce 'nil'"),
                injection.cast_span,
            )
            .with_label(
                "use 'as?' to perform a conditional downcast",
                injection.keyword,
            )
            .with_label(
                "add parentheses around the cast to silence this warning",
                injection.cast_span,
            )
            .with_edit(SuggestedEdit::replace(injection.keyword, "as?"));
            self.warn(diagnostic);
        }
    }
}
