//! Diagnostics for the repairs the solver recorded.
//!
//! A solution carrying fixes is never rewritten. Each unique fix becomes one
//! E4002 error with the edit that would make the source type-check.

use elab_base::{Diagnostic, Span, SuggestedEdit};
use elab_syntax::{CastForm, Expr, ExprKind, TryForm, find_by_id};
use elab_typing::{FixKind, PathElement, SolverFix, Type};
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::arguments::{argument_elements, label_text};
use crate::engine::Elaborator;

/// Diagnoses every recorded fix once and returns how many there were.
/// `roots` are the trees the fixes' locators may anchor in.
pub(crate) fn diagnose_fixes(el: &mut Elaborator<'_>, roots: &[&Expr]) -> usize {
    let solution = el.solution;
    let mut seen: FxHashSet<&SolverFix> = FxHashSet::default();
    let mut count = 0;
    for fix in solution.fixes() {
        if !seen.insert(fix) {
            continue;
        }
        count += 1;
        debug!(fix = ?fix.kind, locator = %fix.locator, "diagnosing fix");
        let anchor = roots
            .iter()
            .find_map(|&root| find_by_id(root, fix.locator.anchor));
        let diagnostic = anchor
            .and_then(|anchor| locate(anchor, &fix.locator.path))
            .and_then(|target| diagnose(el, &fix.kind, target));
        let diagnostic = diagnostic.unwrap_or_else(|| {
            let span = anchor
                .or_else(|| roots.first().copied())
                .map_or_else(Span::default, |anchor| anchor.span);
            Diagnostic::error("E4005", "failed to produce diagnostic for expression", span)
        });
        el.sink.push(diagnostic);
    }
    count
}

/// The sub-expression a fix's locator points at.
fn locate<'e>(anchor: &'e Expr, path: &[PathElement]) -> Option<&'e Expr> {
    let mut current = anchor;
    for element in path {
        current = match element {
            PathElement::ApplyArgument => match &current.kind {
                ExprKind::Call { args, .. } => &**args,
                _ => return None,
            },
            PathElement::ApplyArgToParam { arg, .. } => {
                let args = match &current.kind {
                    ExprKind::Call { args, .. } => &**args,
                    _ => current,
                };
                argument_elements(args).get(*arg as usize).copied()?
            }
            PathElement::TupleElement(index) => match &current.kind {
                ExprKind::Tuple { elements, .. } => elements.get(*index as usize)?,
                _ => return None,
            },
            PathElement::Member | PathElement::ApplyFunction => current,
            _ => return None,
        };
    }
    Some(current)
}

fn diagnose(el: &Elaborator<'_>, kind: &FixKind, target: &Expr) -> Option<Diagnostic> {
    let ty = display_type(el, &target.ty);
    let span = target.span;
    let diagnostic = match kind {
        FixKind::ForceOptional => {
            let diagnostic = Diagnostic::error(
                "E4002",
                format!("value of optional type '{ty}' not unwrapped; did you mean to use '!'?"),
                span,
            );
            match &target.kind {
                ExprKind::Try {
                    form: TryForm::Optional,
                    ..
                } => diagnostic.with_edit(SuggestedEdit::replace(try_keyword(span), "try!")),
                _ if is_postfix_safe(target) => {
                    diagnostic.with_edit(SuggestedEdit::insert(span.end_point(), "!"))
                }
                _ => diagnostic
                    .with_edit(SuggestedEdit::insert(span.start_point(), "("))
                    .with_edit(SuggestedEdit::insert(span.end_point(), ")!")),
            }
        }
        FixKind::OptionalChaining => Diagnostic::error(
            "E4002",
            format!("value of optional type '{ty}' not unwrapped; did you mean to use '?'?"),
            span,
        )
        .with_edit(SuggestedEdit::insert(span.end_point(), "?")),
        FixKind::ForceDowncast { target: to } => {
            let to = display_type(el, to);
            let diagnostic = Diagnostic::error(
                "E4002",
                format!("'{ty}' is not convertible to '{to}'; did you mean to use 'as!' to force downcast?"),
                span,
            );
            if needs_parentheses_for_cast(target) {
                diagnostic
                    .with_edit(SuggestedEdit::insert(span.start_point(), "("))
                    .with_edit(SuggestedEdit::insert(span.end_point(), format!(") as! {to}")))
            } else {
                diagnostic.with_edit(SuggestedEdit::insert(span.end_point(), format!(" as! {to}")))
            }
        }
        FixKind::AddressOf => Diagnostic::error(
            "E4002",
            format!("passing value of type '{ty}' to an inout parameter requires explicit '&'"),
            span,
        )
        .with_edit(SuggestedEdit::insert(span.start_point(), "&")),
        FixKind::CoerceToCheckedCast => {
            let ExprKind::Cast {
                sub,
                target: to,
                form: CastForm::Coerce,
                keyword,
                ..
            } = &target.kind
            else {
                return None;
            };
            let from = display_type(el, &sub.ty);
            let to = display_type(el, to);
            Diagnostic::error(
                "E4002",
                format!("'{from}' is not convertible to '{to}'; did you mean to use 'as!' to force downcast?"),
                span,
            )
            .with_edit(SuggestedEdit::replace(*keyword, "as!"))
        }
        FixKind::RelabelArguments { labels } => relabel(target, labels),
    };
    Some(diagnostic)
}

fn relabel(target: &Expr, expected: &[Option<String>]) -> Diagnostic {
    let args = match &target.kind {
        ExprKind::Call { args, .. } => &**args,
        _ => target,
    };
    let found = args.argument_labels();
    let render = |labels: &[Option<String>]| -> String {
        labels.iter().map(|label| format!("{}:", label_text(label))).collect()
    };
    let mut diagnostic = Diagnostic::error(
        "E4002",
        format!(
            "incorrect argument labels in call (have '{}', expected '{}')",
            render(&found),
            render(expected)
        ),
        args.span,
    );
    for (element, (have, want)) in argument_elements(args).into_iter().zip(found.iter().zip(expected)) {
        if have == want {
            continue;
        }
        diagnostic = match (have, want) {
            (None, Some(want)) => {
                diagnostic.with_edit(SuggestedEdit::insert(element.span.start_point(), format!("{want}: ")))
            }
            (have, want) => diagnostic.with_label(
                format!(
                    "argument labeled '{}' should be labeled '{}'",
                    label_text(have),
                    label_text(want)
                ),
                element.span,
            ),
        };
    }
    diagnostic
}

fn display_type(el: &Elaborator<'_>, ty: &Type) -> String {
    match el.solution.simplify_type(ty) {
        Ok(ty) => el.type_name(&ty),
        Err(_) => el.type_name(ty),
    }
}

/// `try?` at the start of a `try` expression.
fn try_keyword(span: Span) -> Span {
    Span::new(span.start.line, span.start.column, span.start.line, span.start.column + 3)
}

/// A postfix operator can follow the expression without parentheses.
fn is_postfix_safe(expr: &Expr) -> bool {
    !matches!(
        expr.kind,
        ExprKind::Cast { .. }
            | ExprKind::Assign { .. }
            | ExprKind::Ternary { .. }
            | ExprKind::Try { .. }
            | ExprKind::InOut { .. }
            | ExprKind::Closure { .. }
    )
}

fn needs_parentheses_for_cast(expr: &Expr) -> bool {
    matches!(
        expr.kind,
        ExprKind::Assign { .. } | ExprKind::Ternary { .. } | ExprKind::Try { .. }
    )
}
