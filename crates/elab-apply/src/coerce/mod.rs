//! Converting an elaborated expression to the type its context requires.
//!
//! Rules fire in a fixed order: identity, then a conversion restriction the
//! solver recorded for the exact type pair, then lvalue adjustment, then the
//! structural rules below.

mod restrictions;

use elab_base::Span;
use elab_syntax::{ArgumentShuffle, CastForm, Expr, ExprKind, ShuffleSource};
use elab_typing::{KnownNominal, Locator, OptionalKind, PathElement, TupleElement, Type};
use tracing::trace;

use crate::engine::{Elaborator, SuspiciousInjection};
use crate::error::{Result, desync};

pub(crate) use restrictions::{handler_for, require_interop};

impl Elaborator<'_> {
    /// Converts `expr` to `to`. Never fails for a consistent solution; an
    /// error means the tree and the solver disagree.
    pub fn coerce(&mut self, expr: Expr, to: &Type, locator: &Locator) -> Result<Expr> {
        if expr.ty == *to {
            return Ok(expr);
        }
        if let Some(kind) = self.solution.conversion_restriction(&expr.ty, to) {
            trace!(restriction = kind.name(), %locator, "restriction-directed coercion");
            return handler_for(kind)(self, expr, to, locator);
        }
        if expr.ty.is_lvalue() {
            if let Type::InOut(object) = to {
                if expr.ty.rvalue() == &**object {
                    let span = expr.span;
                    return Ok(self.implicit(
                        span,
                        to.clone(),
                        ExprKind::InOut {
                            sub: Box::new(expr),
                        },
                    ));
                }
            }
            let loaded = self.load(expr);
            return self.coerce(loaded, to, locator);
        }
        self.coerce_structural(expr, to, locator)
    }

    /// Reads the value out of an lvalue; rvalues pass through.
    pub(crate) fn load(&mut self, expr: Expr) -> Expr {
        if !expr.ty.is_lvalue() {
            return expr;
        }
        let ty = expr.ty.rvalue().clone();
        self.wrap(expr, ty, |sub| ExprKind::Load { sub })
    }

    fn coerce_structural(&mut self, expr: Expr, to: &Type, locator: &Locator) -> Result<Expr> {
        if let Some([element]) = expr.ty.tuple_elements() {
            if !element.variadic && to.tuple_elements().is_none() {
                let projected = self.project_element(expr, 0)?;
                return self.coerce(projected, to, locator);
            }
        }
        if let Type::Function(function) = to {
            if function.autoclosure {
                let result = function.result.clone();
                let body = self.coerce(expr, &result, &locator.with(PathElement::FunctionResult))?;
                let span = body.span;
                return Ok(self.implicit(
                    span,
                    to.clone(),
                    ExprKind::AutoClosure {
                        body: Box::new(body),
                    },
                ));
            }
        }
        if to.tuple_elements().is_some() {
            return match expr.ty.tuple_elements() {
                Some(_) => self.tuple_to_tuple(expr, to, locator),
                None => self.scalar_to_tuple(expr, to, locator),
            };
        }
        if self.decls.is_subclass_of(&expr.ty, to) {
            return Ok(self.upcast(expr, to));
        }
        if expr.ty.as_function().is_some() && to.as_function().is_some() {
            return Ok(self.convert_function(expr, to));
        }
        if matches!(to, Type::Existential(_) | Type::ExistentialMetatype(_)) {
            return self.erase(expr, to);
        }
        if to.optional_object().is_some() {
            return match expr.ty.optional_object() {
                Some(_) => self.optional_to_optional(expr, to, locator),
                None => self.value_to_optional(expr, to, locator),
            };
        }
        if matches!((&expr.ty, to), (Type::Metatype(_), Type::Metatype(_))) {
            return Ok(self.wrap(expr, to.clone(), |sub| ExprKind::MetatypeConversion { sub }));
        }
        if expr.ty.is_unresolved() || to.is_unresolved() {
            return Ok(self.wrap(expr, to.clone(), |sub| {
                ExprKind::UnresolvedTypeConversion { sub }
            }));
        }
        Err(desync(
            expr.span,
            format!(
                "no conversion from '{}' to '{}'",
                self.type_name(&expr.ty),
                self.type_name(to)
            ),
        ))
    }

    pub(crate) fn project_element(&mut self, expr: Expr, index: u32) -> Result<Expr> {
        let element = expr
            .ty
            .rvalue()
            .tuple_elements()
            .and_then(|elements| elements.get(index as usize))
            .map(|element| element.ty.clone());
        let Some(element) = element else {
            return Err(desync(
                expr.span,
                format!("'{}' has no tuple element {index}", self.type_name(&expr.ty)),
            ));
        };
        let ty = if expr.ty.is_lvalue() {
            Type::lvalue(element)
        } else {
            element
        };
        let span = expr.span;
        Ok(self.implicit(
            span,
            ty,
            ExprKind::TupleElement {
                base: Box::new(expr),
                index,
            },
        ))
    }

    pub(crate) fn tuple_to_tuple(&mut self, expr: Expr, to: &Type, locator: &Locator) -> Result<Expr> {
        let expr = self.load(expr);
        let (Some(from), Some(target)) = (expr.ty.tuple_elements(), to.tuple_elements()) else {
            return Err(desync(expr.span, "tuple conversion between non-tuple types"));
        };
        let from = from.to_vec();
        let target = target.to_vec();
        let Some(sources) = match_tuple_labels(&from, &target) else {
            return Err(desync(
                expr.span,
                format!(
                    "tuple '{}' cannot be shuffled into '{}'",
                    self.type_name(&expr.ty),
                    self.type_name(to)
                ),
            ));
        };
        let identity = sources.iter().enumerate().all(|(index, source)| index == *source);
        let Expr {
            id,
            span,
            ty,
            implicit,
            kind,
        } = expr;

        let sub = match kind {
            ExprKind::Tuple { elements, labels } => {
                let mut destination = vec![0; elements.len()];
                for (index, source) in sources.iter().enumerate() {
                    destination[*source] = index;
                }
                let mut converted = Vec::with_capacity(elements.len());
                for (index, element) in elements.into_iter().enumerate() {
                    let element_locator = locator.with(PathElement::TupleElement(index as u32));
                    converted.push(self.coerce(
                        element,
                        &target[destination[index]].ty,
                        &element_locator,
                    )?);
                }
                let ty = Type::Tuple(
                    converted
                        .iter()
                        .enumerate()
                        .map(|(index, element)| TupleElement {
                            label: labels.get(index).cloned().flatten(),
                            ty: element.ty.clone(),
                            variadic: false,
                        })
                        .collect(),
                );
                if identity {
                    let labels = target.iter().map(|element| element.label.clone()).collect();
                    return Ok(Expr {
                        id,
                        span,
                        ty: to.clone(),
                        implicit,
                        kind: ExprKind::Tuple {
                            elements: converted,
                            labels,
                        },
                    });
                }
                Expr {
                    id,
                    span,
                    ty,
                    implicit,
                    kind: ExprKind::Tuple {
                        elements: converted,
                        labels,
                    },
                }
            }
            kind => {
                for (index, source) in sources.iter().enumerate() {
                    if from[*source].ty != target[index].ty {
                        return Err(desync(
                            span,
                            format!(
                                "element {source} of '{}' needs a conversion to '{}' inside a shuffle",
                                self.type_name(&ty),
                                self.type_name(&target[index].ty)
                            ),
                        ));
                    }
                }
                Expr {
                    id,
                    span,
                    ty,
                    implicit,
                    kind,
                }
            }
        };
        let mapping = sources
            .iter()
            .map(|source| ShuffleSource::Arg {
                index: *source as u32,
            })
            .collect();
        Ok(self.shuffle(sub, to.clone(), mapping, Vec::new(), None, false))
    }

    pub(crate) fn scalar_to_tuple(&mut self, expr: Expr, to: &Type, locator: &Locator) -> Result<Expr> {
        let element = match to.tuple_elements() {
            Some([element]) => element.clone(),
            _ => {
                return Err(desync(
                    expr.span,
                    format!(
                        "scalar '{}' cannot initialize tuple '{}'",
                        self.type_name(&expr.ty),
                        self.type_name(to)
                    ),
                ));
            }
        };
        let span = expr.span;
        let sub = self.coerce(expr, &element.ty, &locator.with(PathElement::ScalarToTuple))?;
        let (mapping, variadic_args, variadic_type) = if element.variadic {
            let array = self.array_of(&element.ty, span)?;
            (vec![ShuffleSource::Variadic], vec![0], Some(array))
        } else {
            (vec![ShuffleSource::Arg { index: 0 }], Vec::new(), None)
        };
        Ok(self.shuffle(sub, to.clone(), mapping, variadic_args, variadic_type, true))
    }

    fn shuffle(
        &mut self,
        sub: Expr,
        ty: Type,
        mapping: Vec<ShuffleSource>,
        variadic_args: Vec<u32>,
        variadic_type: Option<Type>,
        source_is_scalar: bool,
    ) -> Expr {
        let span = sub.span;
        self.implicit(
            span,
            ty,
            ExprKind::ArgumentShuffle {
                shuffle: Box::new(ArgumentShuffle {
                    sub,
                    mapping,
                    variadic_args,
                    caller_defaults: Vec::new(),
                    variadic_type,
                    callee: None,
                    source_is_scalar,
                }),
            },
        )
    }

    pub(crate) fn array_of(&self, element: &Type, span: Span) -> Result<Type> {
        self.decls
            .known_type(KnownNominal::Array, vec![element.clone()])
            .ok_or_else(|| desync(span, "no Array type is declared for variadic arguments"))
    }

    /// Class upcast along the superclass chain.
    pub(crate) fn upcast(&mut self, expr: Expr, to: &Type) -> Expr {
        let mut expr = expr;
        if let Type::Archetype(id) = expr.ty {
            if let Some(superclass) = self.decls.archetype(id).superclass.clone() {
                expr = self.wrap(expr, superclass, |sub| ExprKind::ArchetypeToSuper { sub });
            }
        }
        if expr.ty == *to {
            return expr;
        }
        self.wrap(expr, to.clone(), |sub| ExprKind::DerivedToBase { sub })
    }

    fn convert_function(&mut self, mut expr: Expr, to: &Type) -> Expr {
        if matches!(expr.kind, ExprKind::Closure { .. }) {
            if let (Type::Function(function), Type::Function(target)) = (&mut expr.ty, to) {
                function.no_escape = target.no_escape;
            }
            if expr.ty == *to {
                return expr;
            }
        }
        self.wrap(expr, to.clone(), |sub| ExprKind::FunctionConversion { sub })
    }

    /// Wraps a concrete value (or metatype) into an existential (metatype).
    pub(crate) fn erase(&mut self, expr: Expr, to: &Type) -> Result<Expr> {
        let erased = match (to, &expr.ty) {
            (Type::Existential(protocols), source) => Some((source.clone(), protocols.clone())),
            (
                Type::ExistentialMetatype(instance),
                Type::Metatype(source) | Type::ExistentialMetatype(source),
            ) => match &**instance {
                Type::Existential(protocols) => Some(((**source).clone(), protocols.clone())),
                _ => None,
            },
            _ => None,
        };
        let Some((source, protocols)) = erased else {
            return Err(desync(
                expr.span,
                format!(
                    "cannot erase '{}' to '{}'",
                    self.type_name(&expr.ty),
                    self.type_name(to)
                ),
            ));
        };
        let mut conformances = Vec::with_capacity(protocols.len());
        for protocol in protocols {
            conformances.push(self.require_conformance(&source, protocol, expr.span)?);
        }
        let span = expr.span;
        Ok(self.implicit(
            span,
            to.clone(),
            ExprKind::Erasure {
                sub: Box::new(expr),
                conformances,
            },
        ))
    }

    pub(crate) fn value_to_optional(&mut self, expr: Expr, to: &Type, locator: &Locator) -> Result<Expr> {
        let Some((_, object)) = to.optional_object() else {
            return Err(desync(expr.span, "injection into a non-optional type"));
        };
        let object = object.clone();
        let payload = self.coerce(expr, &object, &locator.with(PathElement::OptionalPayload))?;
        Ok(self.inject(payload, to))
    }

    /// `T?` to `U?`. A target that only adds optional layers around the
    /// source becomes nested injections; anything else binds, converts the
    /// payload and re-injects under an optional evaluation.
    pub(crate) fn optional_to_optional(&mut self, expr: Expr, to: &Type, locator: &Locator) -> Result<Expr> {
        let (from_depth, _) = expr.ty.look_through_optionals();
        let (to_depth, _) = to.look_through_optionals();
        if to_depth > from_depth {
            let mut layers = vec![to.clone()];
            for _ in 0..(to_depth - from_depth) {
                let next = layers
                    .last()
                    .and_then(Type::optional_object)
                    .map(|(_, object)| object.clone());
                match next {
                    Some(next) => layers.push(next),
                    None => break,
                }
            }
            if layers.last() == Some(&expr.ty) {
                layers.pop();
                let mut result = expr;
                while let Some(layer) = layers.pop() {
                    result = self.inject(result, &layer);
                }
                return Ok(result);
            }
        }
        self.rewrap_optional(expr, to, locator)
    }

    /// Binds the source optional, converts its payload and re-injects it.
    pub(crate) fn rewrap_optional(&mut self, expr: Expr, to: &Type, locator: &Locator) -> Result<Expr> {
        let objects = match (expr.ty.optional_object(), to.optional_object()) {
            (Some((_, from)), Some((_, to))) => Some((from.clone(), to.clone())),
            _ => None,
        };
        let Some((from_object, to_object)) = objects else {
            return Err(desync(expr.span, "optional conversion between non-optional types"));
        };
        let span = expr.span;
        let bound = self.implicit(
            span,
            from_object,
            ExprKind::BindOptional {
                sub: Box::new(expr),
                depth: 0,
            },
        );
        let converted = self.coerce(bound, &to_object, &locator.with(PathElement::OptionalPayload))?;
        let injected = self.inject(converted, to);
        Ok(self.wrap(injected, to.clone(), |sub| ExprKind::OptionalEvaluation { sub }))
    }

    pub(crate) fn inject(&mut self, payload: Expr, to: &Type) -> Expr {
        if matches!(to.optional_object(), Some((OptionalKind::Optional, _))) {
            self.note_forced_downcast(&payload);
        }
        self.wrap(payload, to.clone(), |sub| ExprKind::InjectIntoOptional { sub })
    }

    fn note_forced_downcast(&mut self, payload: &Expr) {
        let (cast, parenthesized) = match &payload.kind {
            ExprKind::Paren { sub } => (&**sub, true),
            _ => (payload, false),
        };
        if let ExprKind::Cast {
            form: CastForm::Forced,
            keyword,
            target,
            ..
        } = &cast.kind
        {
            self.suspicious.push(SuspiciousInjection {
                cast: cast.id,
                keyword: *keyword,
                cast_span: cast.span,
                target: target.clone(),
                parenthesized,
            });
        }
    }
}

/// For each target element, the source element feeding it. Labels match
/// first; remaining targets take unlabeled sources (or sources whose label
/// the target does not use) in order.
fn match_tuple_labels(from: &[TupleElement], to: &[TupleElement]) -> Option<Vec<usize>> {
    if from.len() != to.len() {
        return None;
    }
    let mut used = vec![false; from.len()];
    let mut sources = Vec::with_capacity(to.len());
    for target in to {
        let by_label = target.label.as_ref().and_then(|label| {
            (0..from.len()).find(|index| !used[*index] && from[*index].label.as_ref() == Some(label))
        });
        let source = by_label.or_else(|| {
            (0..from.len()).find(|index| {
                !used[*index]
                    && from[*index].label.as_ref().is_none_or(|label| {
                        !to.iter().any(|element| element.label.as_ref() == Some(label))
                    })
            })
        })?;
        used[source] = true;
        sources.push(source);
    }
    Some(sources)
}
