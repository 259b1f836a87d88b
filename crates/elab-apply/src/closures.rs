//! Multi-statement closure bodies.
//!
//! The first pass leaves these bodies untouched and queues them. The second
//! pass asks a [`ClosureBodySolver`] for each body's solution and elaborates
//! the statements against it, oldest first; bodies nested in a body join the
//! back of the queue.

use std::collections::VecDeque;

use elab_base::{Diagnostic, ExprId, Span};
use elab_syntax::{ClosureBody, ClosureParam, Expr, ExprKind, Stmt, find_mut};
use elab_typing::{DeclTable, Locator, PathElement, Solution, Type};
use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span};

use crate::config::ElaborationOptions;
use crate::engine::{Elaborated, ElaborationContext, Elaborator};
use crate::error::{ElaborationError, ElaborationFailure, Result, desync};
use crate::fixes;

/// Produces the solution for one deferred closure body.
pub trait ClosureBodySolver {
    /// `None` when the body cannot be solved.
    fn solve_body(&mut self, closure: &DeferredClosure) -> Option<Solution>;
}

/// A closure body waiting for its own solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeferredClosure {
    pub closure: ExprId,
    pub span: Span,
    pub params: Vec<ClosureParam>,
    pub result: Type,
    pub body: Vec<Stmt>,
}

impl DeferredClosure {
    fn expressions(&self) -> Vec<&Expr> {
        self.body
            .iter()
            .filter_map(|stmt| match stmt {
                Stmt::Expression { expr } | Stmt::Binding { value: expr, .. } => Some(expr),
                Stmt::Return { value } => value.as_ref(),
            })
            .collect()
    }
}

pub(crate) fn second_pass(
    first: Elaborated,
    decls: &DeclTable,
    options: &ElaborationOptions,
    context: ElaborationContext,
    mut next_id: u32,
    solver: &mut dyn ClosureBodySolver,
) -> Result<Elaborated, ElaborationFailure> {
    let Elaborated {
        mut expr,
        mut diagnostics,
        mut events,
        deferred,
    } = first;
    let mut queue: VecDeque<DeferredClosure> = deferred.into();
    while let Some(closure) = queue.pop_front() {
        let span = debug_span!("closure_body", closure = %closure.closure);
        let _guard = span.enter();
        let Some(solution) = solver.solve_body(&closure) else {
            let error = desync(
                closure.span,
                format!("closure {} has no solution for its body", closure.closure),
            );
            return Err(failure(error, diagnostics));
        };
        let mut elaborator = Elaborator::new(decls, &solution, options, context.clone(), next_id);
        let body = elaborator.run_body(&closure);
        next_id = elaborator.next_id();
        let body = match body {
            Ok(body) => body,
            Err(mut body_failure) => {
                diagnostics.append(&mut body_failure.diagnostics);
                return Err(ElaborationFailure {
                    error: body_failure.error,
                    diagnostics,
                });
            }
        };
        diagnostics.extend(elaborator.sink.finish(options.dedupe_diagnostics));
        events.extend(elaborator.existentials.take_events());
        let nested: Vec<DeferredClosure> = elaborator.deferred.drain(..).collect();
        debug!(statements = body.len(), nested = nested.len(), "closure body elaborated");

        let Some(node) = find_mut(&mut expr, closure.closure) else {
            let error = desync(closure.span, format!("closure {} is no longer in the tree", closure.closure));
            return Err(failure(error, diagnostics));
        };
        let ExprKind::Closure { body: slot, .. } = &mut node.kind else {
            let error = desync(closure.span, format!("node {} is not a closure", closure.closure));
            return Err(failure(error, diagnostics));
        };
        *slot = ClosureBody::Statements { stmts: body };
        queue.extend(nested);
    }
    Ok(Elaborated {
        expr,
        diagnostics,
        events,
        deferred: Vec::new(),
    })
}

fn failure(error: ElaborationError, mut diagnostics: Vec<Diagnostic>) -> ElaborationFailure {
    if let Some(diagnostic) = error.to_diagnostic() {
        diagnostics.push(diagnostic);
    }
    ElaborationFailure { error, diagnostics }
}

impl Elaborator<'_> {
    fn run_body(&mut self, closure: &DeferredClosure) -> Result<Vec<Stmt>, ElaborationFailure> {
        if !self.solution.fixes().is_empty() {
            let count = fixes::diagnose_fixes(self, &closure.expressions());
            return Err(self.fail(ElaborationError::UserFixable { count }));
        }
        let body = match self.elaborate_statements(closure) {
            Ok(body) => body,
            Err(error) => return Err(self.fail(error)),
        };
        self.finalize_injections();
        Ok(body)
    }

    fn elaborate_statements(&mut self, closure: &DeferredClosure) -> Result<Vec<Stmt>> {
        let result_locator = Locator::new(closure.closure).with(PathElement::ClosureResult);
        let mut body = Vec::with_capacity(closure.body.len());
        for stmt in closure.body.iter().cloned() {
            body.push(match stmt {
                Stmt::Expression { expr } => Stmt::Expression {
                    expr: self.statement_expr(expr)?,
                },
                Stmt::Return { value: Some(value) } => {
                    let value = self.statement_expr(value)?;
                    Stmt::Return {
                        value: Some(self.coerce(value, &closure.result, &result_locator)?),
                    }
                }
                Stmt::Return { value: None } => Stmt::Return { value: None },
                Stmt::Binding { name, ty, value } => {
                    let ty = self.simplify(&ty, closure.span)?;
                    let value = self.statement_expr(value)?;
                    let locator = Locator::new(value.id);
                    Stmt::Binding {
                        value: self.coerce(value, &ty, &locator)?,
                        name,
                        ty,
                    }
                }
            });
        }
        Ok(body)
    }

    /// Each statement is a top-level walk of its own.
    fn statement_expr(&mut self, expr: Expr) -> Result<Expr> {
        let expr = self.walk(expr, 0, 0)?;
        self.check_balanced(expr.span)?;
        Ok(expr)
    }
}
