//! Binding a call's arguments to the callee's parameters.

mod defaults;
mod matching;

use elab_base::{Diagnostic, ExprId, Span, SuggestedEdit};
use elab_syntax::{ArgumentShuffle, Expr, ExprKind, ShuffleSource};
use elab_typing::{DeclId, DefaultArgument, FunctionType, Locator, PathElement, TupleElement, Type};
use tracing::debug;

use crate::engine::Elaborator;
use crate::error::{ElaborationError, Result, desync};

pub(crate) use matching::label_text;
pub use matching::{MatchFailure, MatchOutcome, MatchPolicy, ParamInfo, match_call_arguments};

/// How the arguments were written.
enum Shape {
    Tuple {
        id: ExprId,
        span: Span,
        implicit: bool,
        labels: Vec<Option<String>>,
    },
    Paren {
        id: ExprId,
        span: Span,
        implicit: bool,
    },
    Scalar,
}

impl Elaborator<'_> {
    /// Matches `args` against `function`'s parameters and converts each
    /// argument to its parameter type. Returns `args` itself when nothing
    /// moves, is defaulted or is collected, and an `ArgumentShuffle` otherwise.
    pub(crate) fn bind_arguments(
        &mut self,
        args: Expr,
        function: &FunctionType,
        callee: Option<DeclId>,
        trailing_closure: bool,
        locator: &Locator,
        call_span: Span,
    ) -> Result<Expr> {
        let labels = args.argument_labels();
        let params = self.param_infos(function, callee);
        let legacy = self.options.legacy_ignore_labels_for_single_any
            && function.params.len() == 1
            && !function.params[0].variadic
            && function.params[0].ty == Type::any();
        let policy = MatchPolicy {
            allow_label_mismatch: self.options.allow_label_mismatch,
            ignore_labels: legacy,
        };
        let outcome = match match_call_arguments(&labels, &params, trailing_closure, policy) {
            Ok(outcome) => outcome,
            Err(MatchFailure::LabelMismatch { .. }) => {
                return Err(self.diagnose_labels(&args, &labels, &params, callee));
            }
            Err(failure) => {
                return Err(desync(
                    args.span,
                    format!("{failure} in call to '{}'", self.call_name(callee, &params)),
                ));
            }
        };
        debug!(bindings = ?outcome.bindings, legacy, "arguments matched");

        let (elements, shape) = decompose(args);
        let spans: Vec<Span> = elements.iter().map(|element| element.span).collect();
        let mut slots: Vec<Option<Expr>> = elements.into_iter().map(Some).collect();
        let mut mapping = Vec::with_capacity(function.params.len());
        let mut variadic_args = Vec::new();
        let mut variadic_type = None;
        let mut caller_defaults = Vec::new();

        for (index, (param, binding)) in function.params.iter().zip(&outcome.bindings).enumerate() {
            if param.variadic {
                for arg in binding {
                    let converted = self.convert_argument(&mut slots, *arg, index, &param.ty, locator, call_span)?;
                    slots[*arg as usize] = Some(converted);
                    variadic_args.push(*arg);
                }
                variadic_type = Some(self.array_of(&param.ty, call_span)?);
                mapping.push(ShuffleSource::Variadic);
                continue;
            }
            match binding.first() {
                Some(arg) => {
                    let converted = self.convert_argument(&mut slots, *arg, index, &param.ty, locator, call_span)?;
                    slots[*arg as usize] = Some(converted);
                    mapping.push(ShuffleSource::Arg { index: *arg });
                }
                None => match self.default_argument(callee, index, &param.ty, call_span)? {
                    Some(value) => {
                        mapping.push(ShuffleSource::CallerDefault {
                            index: caller_defaults.len() as u32,
                        });
                        caller_defaults.push(value);
                    }
                    None => mapping.push(ShuffleSource::CalleeDefault),
                },
            }
        }

        for arg in &outcome.relabeled {
            let index = *arg as usize;
            let found = labels.get(index).cloned().flatten();
            let expected = outcome
                .bindings
                .iter()
                .position(|binding| binding.contains(arg))
                .and_then(|param| params.get(param))
                .and_then(|param| param.label.clone());
            let span = spans.get(index).copied().unwrap_or(call_span);
            let mut diagnostic = Diagnostic::warning(
                "W4105",
                format!(
                    "argument label '{}' does not match parameter label '{}'",
                    label_text(&found),
                    label_text(&expected)
                ),
                span,
            );
            if let (None, Some(wanted)) = (&found, &expected) {
                diagnostic =
                    diagnostic.with_edit(SuggestedEdit::insert(span.start_point(), format!("{wanted}: ")));
            }
            self.warn(diagnostic);
        }

        let mut elements = Vec::with_capacity(slots.len());
        for (index, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(element) => elements.push(element),
                None => return Err(desync(call_span, format!("argument #{index} was bound twice"))),
            }
        }
        let identity = variadic_args.is_empty()
            && caller_defaults.is_empty()
            && outcome.relabeled.is_empty()
            && mapping.len() == elements.len()
            && mapping
                .iter()
                .enumerate()
                .all(|(index, source)| *source == ShuffleSource::Arg { index: index as u32 })
            && function
                .params
                .iter()
                .zip(&labels)
                .all(|(param, label)| param.label == *label);

        let source_is_scalar = !matches!(shape, Shape::Tuple { .. });
        let sub = reassemble(elements, shape, call_span)?;
        if identity {
            return Ok(sub);
        }
        let span = sub.span;
        Ok(self.implicit(
            span,
            function.input_tuple(),
            ExprKind::ArgumentShuffle {
                shuffle: Box::new(ArgumentShuffle {
                    sub,
                    mapping,
                    variadic_args,
                    caller_defaults,
                    variadic_type,
                    callee,
                    source_is_scalar,
                }),
            },
        ))
    }

    fn convert_argument(
        &mut self,
        slots: &mut [Option<Expr>],
        arg: u32,
        param: usize,
        param_ty: &Type,
        locator: &Locator,
        call_span: Span,
    ) -> Result<Expr> {
        let Some(argument) = slots.get_mut(arg as usize).and_then(Option::take) else {
            return Err(desync(call_span, format!("no argument #{arg} to bind")));
        };
        let locator = locator.with(PathElement::ApplyArgToParam {
            arg,
            param: param as u32,
        });
        self.coerce(argument, param_ty, &locator)
    }

    fn param_infos(&self, function: &FunctionType, callee: Option<DeclId>) -> Vec<ParamInfo> {
        let declared = callee.map(|callee| &self.decls.value(callee).params);
        function
            .params
            .iter()
            .enumerate()
            .map(|(index, param)| ParamInfo {
                label: param.label.clone(),
                variadic: param.variadic,
                has_default: declared
                    .and_then(|params| params.get(index))
                    .is_some_and(|param| param.default != DefaultArgument::None),
            })
            .collect()
    }

    /// `name(a:b:)` for the callee, as the user would write it.
    fn call_name(&self, callee: Option<DeclId>, params: &[ParamInfo]) -> String {
        let name = callee
            .map(|callee| self.decls.value(callee).name.clone())
            .unwrap_or_else(|| "function".to_string());
        let labels: String = params
            .iter()
            .map(|param| format!("{}:", label_text(&param.label)))
            .collect();
        format!("{name}({labels})")
    }

    /// Reports labels that cannot be matched and fails the run.
    fn diagnose_labels(
        &mut self,
        args: &Expr,
        labels: &[Option<String>],
        params: &[ParamInfo],
        callee: Option<DeclId>,
    ) -> ElaborationError {
        let have: String = labels.iter().map(|label| format!("{}:", label_text(label))).collect();
        let expected: String = params
            .iter()
            .take(labels.len())
            .map(|param| format!("{}:", label_text(&param.label)))
            .collect();
        let mut diagnostic = Diagnostic::error(
            "E4002",
            format!("incorrect argument label in call (have '{have}', expected '{expected}')"),
            args.span,
        );
        for (element, (label, param)) in argument_elements(args).into_iter().zip(labels.iter().zip(params)) {
            if *label == param.label {
                continue;
            }
            match (label, &param.label) {
                (None, Some(wanted)) => {
                    diagnostic = diagnostic.with_edit(SuggestedEdit::insert(
                        element.span.start_point(),
                        format!("{wanted}: "),
                    ));
                }
                (found, wanted) => {
                    diagnostic = diagnostic.with_label(
                        format!(
                            "argument labeled '{}' should be labeled '{}'",
                            label_text(found),
                            label_text(wanted)
                        ),
                        element.span,
                    );
                }
            }
        }
        let diagnostic = diagnostic.with_label(
            format!("declared as '{}'", self.call_name(callee, params)),
            args.span,
        );
        self.sink.push(diagnostic);
        ElaborationError::UserFixable { count: 1 }
    }
}

/// The argument expressions of a call, in source order.
pub(crate) fn argument_elements(args: &Expr) -> Vec<&Expr> {
    match &args.kind {
        ExprKind::Tuple { elements, .. } => elements.iter().collect(),
        ExprKind::Paren { sub } => vec![&**sub],
        _ => vec![args],
    }
}

fn decompose(args: Expr) -> (Vec<Expr>, Shape) {
    let Expr {
        id,
        span,
        ty,
        implicit,
        kind,
    } = args;
    match kind {
        ExprKind::Tuple { elements, labels } => (
            elements,
            Shape::Tuple {
                id,
                span,
                implicit,
                labels,
            },
        ),
        ExprKind::Paren { sub } => (vec![*sub], Shape::Paren { id, span, implicit }),
        kind => (
            vec![Expr {
                id,
                span,
                ty,
                implicit,
                kind,
            }],
            Shape::Scalar,
        ),
    }
}

fn reassemble(mut elements: Vec<Expr>, shape: Shape, call_span: Span) -> Result<Expr> {
    match shape {
        Shape::Tuple {
            id,
            span,
            implicit,
            labels,
        } => {
            let ty = Type::Tuple(
                elements
                    .iter()
                    .enumerate()
                    .map(|(index, element)| TupleElement {
                        label: labels.get(index).cloned().flatten(),
                        ty: element.ty.clone(),
                        variadic: false,
                    })
                    .collect(),
            );
            Ok(Expr {
                id,
                span,
                ty,
                implicit,
                kind: ExprKind::Tuple { elements, labels },
            })
        }
        Shape::Paren { id, span, implicit } => match elements.pop() {
            Some(sub) => Ok(Expr {
                id,
                span,
                ty: sub.ty.clone(),
                implicit,
                kind: ExprKind::Paren { sub: Box::new(sub) },
            }),
            None => Err(desync(call_span, "parenthesized argument went missing")),
        },
        Shape::Scalar => elements
            .pop()
            .ok_or_else(|| desync(call_span, "scalar argument went missing")),
    }
}
