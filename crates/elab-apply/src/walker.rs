//! The depth-first rewrite of a solved tree.
//!
//! Children are rewritten before their parent. Every call carries the
//! node's depth and how many consecutive ancestors use it as their base;
//! existential scopes close against those two numbers on the way out.

use elab_base::{Diagnostic, Span};
use elab_syntax::{
    AccessSemantics, CastForm, ClosureBody, ClosureParam, DictionaryEntry, Expr, ExprKind, KeyPathComponent,
    contains_bind_optional,
};
use elab_typing::{
    ConformanceRef, DeclId, KnownNominal, KnownProtocol, OptionalKind, OverloadChoice, PathElement,
    TupleElement, Type, ValueKind,
};
use tracing::{debug, trace};

use crate::arguments::argument_elements;
use crate::closures::DeferredClosure;
use crate::coerce::require_interop;
use crate::engine::Elaborator;
use crate::error::{Result, desync};
use crate::reference::Site;

impl Elaborator<'_> {
    pub(crate) fn walk(&mut self, expr: Expr, depth: u32, base_chain: u32) -> Result<Expr> {
        let Expr {
            id,
            span,
            ty,
            implicit,
            kind,
        } = expr;
        let ty = self.simplify(&ty, span)?;
        trace!(%id, kind = kind.name(), depth, base_chain, "rewriting");
        let site = Site {
            id,
            span,
            ty,
            implicit,
        };
        let rewritten = self.rewrite(site, kind, depth, base_chain)?;
        self.close_existentials(rewritten, depth)
    }

    fn rewrite(&mut self, site: Site, kind: ExprKind, depth: u32, base_chain: u32) -> Result<Expr> {
        let child = depth + 1;
        match kind {
            kind @ (ExprKind::IntegerLiteral { .. }
            | ExprKind::FloatLiteral { .. }
            | ExprKind::BooleanLiteral { .. }
            | ExprKind::StringLiteral { .. }
            | ExprKind::MagicIdentifier { .. }
            | ExprKind::NilLiteral) => self.materialize_literal(site, kind),
            ExprKind::ArrayLiteral { elements, .. } => {
                let elements = elements
                    .into_iter()
                    .map(|element| self.walk(element, child, 0))
                    .collect::<Result<Vec<_>>>()?;
                self.materialize_literal(
                    site,
                    ExprKind::ArrayLiteral {
                        elements,
                        initializer: None,
                    },
                )
            }
            ExprKind::DictionaryLiteral { entries, .. } => {
                let mut walked = Vec::with_capacity(entries.len());
                for entry in entries {
                    walked.push(DictionaryEntry {
                        key: self.walk(entry.key, child, 0)?,
                        value: self.walk(entry.value, child, 0)?,
                    });
                }
                self.materialize_literal(
                    site,
                    ExprKind::DictionaryLiteral {
                        entries: walked,
                        initializer: None,
                    },
                )
            }
            ExprKind::DeclRef { name, decl, .. } => self.decl_ref(site, name, decl),
            ExprKind::OverloadedDeclRef { name, .. } => {
                if self.solution.overload_choice(&site.locator()).is_none() {
                    return Err(desync(
                        site.span,
                        format!("no overload was chosen for '{name}'"),
                    ));
                }
                self.decl_ref(site, name, None)
            }
            ExprKind::UnresolvedDot { base, name } => {
                let base = self.walk(*base, child, base_chain + 1)?;
                self.member_access(site, base, name, depth, base_chain)
            }
            ExprKind::Subscript { base, index, .. } => {
                let base = self.walk(*base, child, base_chain + 1)?;
                let index = self.walk(*index, child, 0)?;
                self.subscript(site, base, index, depth, base_chain)
            }
            ExprKind::KeyPath { root, components } => self.key_path(site, root, components, child),
            ExprKind::Call {
                callee,
                args,
                trailing_closure,
            } => {
                let callee = self.walk(*callee, child, base_chain + 1)?;
                let args = self.walk(*args, child, 0)?;
                self.call(site, callee, args, trailing_closure)
            }
            ExprKind::Paren { sub } => {
                let sub = self.walk(*sub, child, base_chain)?;
                let ty = sub.ty.clone();
                Ok(Expr {
                    ty,
                    ..site.expr(ExprKind::Paren { sub: Box::new(sub) })
                })
            }
            ExprKind::Tuple { elements, labels } => {
                let elements = elements
                    .into_iter()
                    .map(|element| self.walk(element, child, 0))
                    .collect::<Result<Vec<_>>>()?;
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
                    ty,
                    ..site.expr(ExprKind::Tuple { elements, labels })
                })
            }
            ExprKind::Closure { params, body } => self.closure(site, params, body, child),
            ExprKind::Cast {
                sub,
                target,
                form,
                keyword,
                ..
            } => {
                let sub = self.walk(*sub, child, 0)?;
                let target = self.simplify(&target, site.span)?;
                self.cast(site, sub, target, form, keyword)
            }
            ExprKind::BindOptional { sub, depth: bind_depth } => {
                let sub = self.walk(*sub, child, 0)?;
                let sub = if site.ty.is_lvalue() { sub } else { self.load(sub) };
                Ok(site.expr(ExprKind::BindOptional {
                    sub: Box::new(sub),
                    depth: bind_depth,
                }))
            }
            ExprKind::OptionalEvaluation { sub } => {
                let binds = contains_bind_optional(&sub);
                let sub = self.walk(*sub, child, 0)?;
                let locator = site.locator();
                if !binds {
                    self.warn(Diagnostic::warning(
                        "W4102",
                        "optional chain has no '?' to bind; the value is wrapped in an optional instead",
                        site.span,
                    ));
                    return self.coerce(sub, &site.ty, &locator);
                }
                let sub = self.coerce(sub, &site.ty, &locator)?;
                Ok(site.expr(ExprKind::OptionalEvaluation { sub: Box::new(sub) }))
            }
            ExprKind::ForceValue { sub } => {
                let sub = self.walk(*sub, child, base_chain + 1)?;
                let sub = if site.ty.is_lvalue() { sub } else { self.load(sub) };
                Ok(site.expr(ExprKind::ForceValue { sub: Box::new(sub) }))
            }
            ExprKind::Assign { dest, source } => {
                let dest = self.walk(*dest, child, 0)?;
                let source = self.walk(*source, child, 0)?;
                let source = if matches!(dest.kind, ExprKind::DiscardAssignment) {
                    self.load(source)
                } else {
                    let target = dest.ty.rvalue().clone();
                    self.coerce(source, &target, &site.locator())?
                };
                Ok(site.expr(ExprKind::Assign {
                    dest: Box::new(dest),
                    source: Box::new(source),
                }))
            }
            ExprKind::InOut { sub } => {
                let sub = self.walk(*sub, child, base_chain + 1)?;
                if !sub.ty.is_lvalue() {
                    return Err(desync(
                        sub.span,
                        format!("'&' applied to a value of type '{}' that is not assignable", self.type_name(&sub.ty)),
                    ));
                }
                let ty = Type::inout(sub.ty.rvalue().clone());
                Ok(Expr {
                    ty,
                    ..site.expr(ExprKind::InOut { sub: Box::new(sub) })
                })
            }
            ExprKind::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                let condition = self.walk(*condition, child, 0)?;
                let then_expr = self.walk(*then_expr, child, 0)?;
                let else_expr = self.walk(*else_expr, child, 0)?;
                let Some(boolean) = self.decls.known_type(KnownNominal::Bool, Vec::new()) else {
                    return Err(desync(site.span, "no Bool type is declared"));
                };
                let locator = site.locator();
                let condition = self.coerce(condition, &boolean, &locator)?;
                let then_expr = self.coerce(then_expr, &site.ty, &locator)?;
                let else_expr = self.coerce(else_expr, &site.ty, &locator)?;
                Ok(site.expr(ExprKind::Ternary {
                    condition: Box::new(condition),
                    then_expr: Box::new(then_expr),
                    else_expr: Box::new(else_expr),
                }))
            }
            ExprKind::Try { sub, form } => {
                let sub = self.walk(*sub, child, 0)?;
                let sub = self.coerce(sub, &site.ty, &site.locator())?;
                Ok(site.expr(ExprKind::Try {
                    sub: Box::new(sub),
                    form,
                }))
            }
            kind @ (ExprKind::TypeExpr
            | ExprKind::SuperRef
            | ExprKind::DiscardAssignment
            | ExprKind::OpaqueValue { .. }) => Ok(site.expr(kind)),
            other => Err(desync(
                site.span,
                format!("'{}' is produced by elaboration and cannot be rewritten", other.name()),
            )),
        }
    }

    /// `base.name`, resolved through the choice recorded for its member.
    fn member_access(&mut self, site: Site, base: Expr, name: String, depth: u32, base_chain: u32) -> Result<Expr> {
        let member_locator = site.locator().with(PathElement::Member);
        let Some(choice) = self.solution.overload_choice(&member_locator).cloned() else {
            return Err(desync(site.span, format!("member '{name}' has no recorded choice")));
        };
        trace!(%name, ?choice, "member access");
        match choice {
            OverloadChoice::Declaration { decl, .. } => {
                if self.decls.value(decl).kind == ValueKind::Initializer {
                    let reference = self.constructor_ref(base, decl, &member_locator, site.span)?;
                    return Ok(Expr {
                        id: site.id,
                        span: site.span,
                        implicit: site.implicit,
                        ..reference
                    });
                }
                self.member_ref(site, base, decl, &member_locator, depth, base_chain)
            }
            OverloadChoice::DeclViaDynamic { decl, .. } => {
                let base = self.load(base);
                let ty = dynamic_result(&site.ty);
                Ok(Expr {
                    ty,
                    ..site.expr(ExprKind::DynamicMemberRef {
                        base: Box::new(base),
                        decl,
                    })
                })
            }
            OverloadChoice::DeclViaBridge { decl, .. } => {
                let base = self.load(base);
                let Some(foreign) = self.decls.bridged_foreign_type(&base.ty) else {
                    return Err(desync(
                        base.span,
                        format!("'{}' does not bridge to a foreign class", self.type_name(&base.ty)),
                    ));
                };
                require_interop(self, &base, &foreign)?;
                let bridged = self.wrap(base, foreign, |sub| ExprKind::BridgeToForeign { sub });
                self.member_ref(site, bridged, decl, &member_locator, depth, base_chain)
            }
            OverloadChoice::DeclViaUnwrappedOptional { decl, .. } => {
                let forced = self.force(base)?;
                self.member_ref(site, forced, decl, &member_locator, depth, base_chain)
            }
            OverloadChoice::TupleIndex { index, .. } => {
                let element = self.project_element(base, index)?;
                Ok(Expr {
                    id: site.id,
                    span: site.span,
                    implicit: site.implicit,
                    ..element
                })
            }
            OverloadChoice::BaseType { .. } => Ok(site.expr(ExprKind::TypeExpr)),
            OverloadChoice::KeyPathApplication { .. } => Err(desync(
                site.span,
                format!("key path application chosen for member '{name}'"),
            )),
        }
    }

    fn subscript(&mut self, site: Site, base: Expr, index: Expr, depth: u32, base_chain: u32) -> Result<Expr> {
        let member_locator = site.locator().with(PathElement::SubscriptMember);
        let Some(choice) = self.solution.overload_choice(&member_locator).cloned() else {
            return Err(desync(site.span, "subscript has no recorded choice"));
        };
        let index_locator = site.locator().with(PathElement::SubscriptIndex);
        match choice {
            OverloadChoice::Declaration { decl, .. } => {
                let base = self.member_base(base, decl, &member_locator, site.ty.is_lvalue(), depth, base_chain)?;
                let substitutions =
                    self.reference_substitutions(decl, Some(&base.ty), &member_locator, site.span)?;
                let declared = self.decls.value(decl).ty.subst(&substitutions);
                let Some(function) = declared.as_function() else {
                    return Err(desync(site.span, "subscript declaration is not a function"));
                };
                let index = self.bind_arguments(index, function, Some(decl), false, &index_locator, site.span)?;
                Ok(site.expr(ExprKind::Subscript {
                    base: Box::new(base),
                    index: Box::new(index),
                    decl: Some(decl),
                    semantics: AccessSemantics::Ordinary,
                    substitutions,
                }))
            }
            OverloadChoice::DeclViaDynamic { decl, .. } => {
                let base = self.load(base);
                let declared = self.decls.value(decl).ty.clone();
                let Some(function) = declared.as_function() else {
                    return Err(desync(site.span, "subscript declaration is not a function"));
                };
                let index = self.bind_arguments(index, function, Some(decl), false, &index_locator, site.span)?;
                let ty = dynamic_result(&site.ty);
                Ok(Expr {
                    ty,
                    ..site.expr(ExprKind::DynamicSubscript {
                        base: Box::new(base),
                        index: Box::new(index),
                        decl,
                    })
                })
            }
            OverloadChoice::KeyPathApplication { .. } => {
                let base = if site.ty.is_lvalue() { base } else { self.load(base) };
                let key_path = single_argument(index, site.span)?;
                let key_path = self.load(key_path);
                Ok(site.expr(ExprKind::KeyPathApplication {
                    base: Box::new(base),
                    key_path: Box::new(key_path),
                }))
            }
            other => Err(desync(
                site.span,
                format!("subscript resolved to an unsupported choice {other:?}"),
            )),
        }
    }

    /// Key path literal. Subscript indices are captured by value and must be hashable.
    fn key_path(
        &mut self,
        site: Site,
        root: Type,
        components: Vec<KeyPathComponent>,
        depth: u32,
    ) -> Result<Expr> {
        let root = self.simplify(&root, site.span)?;
        let mut rewritten = Vec::with_capacity(components.len());
        for component in components {
            let ty = self.simplify(&component.ty, site.span)?;
            let (index, index_conformances) = match component.index {
                Some(index) => {
                    let index = self.walk(index, depth, 0)?;
                    let index = self.load(index);
                    let conformances = self.hashable_indices(&index)?;
                    (Some(index), conformances)
                }
                None => (None, Vec::new()),
            };
            rewritten.push(KeyPathComponent {
                decl: component.decl,
                index,
                index_conformances,
                ty,
            });
        }
        Ok(site.expr(ExprKind::KeyPath {
            root,
            components: rewritten,
        }))
    }

    fn hashable_indices(&mut self, index: &Expr) -> Result<Vec<ConformanceRef>> {
        let Some(hashable) = self.decls.known_protocol(KnownProtocol::Hashable) else {
            return Err(desync(index.span, "no Hashable protocol is declared"));
        };
        let types: Vec<Type> = match index.ty.tuple_elements() {
            Some(elements) => elements.iter().map(|element| element.ty.clone()).collect(),
            None => vec![index.ty.clone()],
        };
        types
            .iter()
            .map(|ty| self.require_conformance(ty, hashable, index.span))
            .collect()
    }

    fn call(&mut self, site: Site, callee: Expr, args: Expr, trailing_closure: bool) -> Result<Expr> {
        if let Some(instance) = callee.ty.rvalue().metatype_instance().cloned() {
            return self.construct(site, callee, instance, args, trailing_closure);
        }
        let (callee, covariant) = match callee.kind {
            ExprKind::CovariantFunctionConversion { sub } => (*sub, true),
            kind => (Expr { kind, ..callee }, false),
        };
        let callee = match callee.ty.rvalue().optional_object() {
            Some((OptionalKind::ImplicitlyUnwrapped, _)) => self.force(callee)?,
            _ => self.load(callee),
        };
        let Some(function) = callee.ty.as_function().cloned() else {
            return Err(desync(
                callee.span,
                format!("callee of type '{}' is not a function", self.type_name(&callee.ty)),
            ));
        };
        let referenced = referenced_decl(&callee);
        let locator = site.locator().with(PathElement::ApplyArgument);
        let args = self.bind_arguments(args, &function, referenced, trailing_closure, &locator, site.span)?;
        let kind = ExprKind::Call {
            callee: Box::new(callee),
            args: Box::new(args),
            trailing_closure,
        };
        if !covariant {
            return Ok(site.expr(kind));
        }
        let call = Expr {
            ty: function.result.clone(),
            ..site.expr(kind)
        };
        if call.ty == site.ty {
            return Ok(call);
        }
        Ok(self.wrap(call, site.ty, |sub| ExprKind::CovariantReturnConversion { sub }))
    }

    /// A call whose callee is a metatype: construction, or a coercion
    /// spelled as a call on a type.
    fn construct(
        &mut self,
        site: Site,
        callee: Expr,
        instance: Type,
        args: Expr,
        trailing_closure: bool,
    ) -> Result<Expr> {
        let constructor_locator = site.locator().with(PathElement::ConstructorMember);
        let is_type_expr = matches!(callee.semantics_provider().kind, ExprKind::TypeExpr);
        match self.solution.overload_choice(&constructor_locator).cloned() {
            Some(OverloadChoice::Declaration { decl, .. }) => {
                if !is_type_expr && !callee.semantics_provider().is_self_ref() {
                    return Err(self.implicit_init_through_value(&callee));
                }
                debug!(init = decl.0, "construction");
                let constructor = self.constructor_ref(callee, decl, &constructor_locator, site.span)?;
                let Some(function) = constructor.ty.as_function().cloned() else {
                    return Err(desync(site.span, "initializer reference is not a function"));
                };
                let locator = site.locator().with(PathElement::ApplyArgument);
                let args = self.bind_arguments(args, &function, Some(decl), trailing_closure, &locator, site.span)?;
                Ok(site.expr(ExprKind::Call {
                    callee: Box::new(constructor),
                    args: Box::new(args),
                    trailing_closure,
                }))
            }
            Some(other) => Err(desync(
                site.span,
                format!("construction resolved to a non-declaration choice {other:?}"),
            )),
            None if is_type_expr && argument_elements(&args).len() == 1 => {
                let keyword = callee.span;
                let arg = single_argument(args, site.span)?;
                let locator = site.locator().with(PathElement::ApplyArgument);
                let sub = self.coerce(arg, &instance, &locator)?;
                Ok(site.expr(ExprKind::Cast {
                    sub: Box::new(sub),
                    target: instance,
                    form: CastForm::Coerce,
                    keyword,
                    classified: None,
                }))
            }
            None => Err(desync(
                site.span,
                format!("no initializer was chosen to construct '{}'", self.type_name(&instance)),
            )),
        }
    }

    fn closure(&mut self, site: Site, params: Vec<ClosureParam>, body: ClosureBody, depth: u32) -> Result<Expr> {
        let params = params
            .into_iter()
            .map(|param| {
                Ok(ClosureParam {
                    ty: self.simplify(&param.ty, site.span)?,
                    name: param.name,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let Some(result) = site.ty.as_function().map(|function| function.result.clone()) else {
            return Err(desync(
                site.span,
                format!("closure of type '{}' is not a function", self.type_name(&site.ty)),
            ));
        };
        let body = match body {
            ClosureBody::Expression { expr } => {
                let expr = self.walk(*expr, depth, 0)?;
                let expr = self.coerce(expr, &result, &site.locator().with(PathElement::ClosureResult))?;
                ClosureBody::Expression { expr: Box::new(expr) }
            }
            ClosureBody::Statements { stmts } => {
                debug!(closure = %site.id, statements = stmts.len(), "deferring closure body");
                self.deferred.push_back(DeferredClosure {
                    closure: site.id,
                    span: site.span,
                    params: params.clone(),
                    result,
                    body: stmts.clone(),
                });
                ClosureBody::Statements { stmts }
            }
        };
        Ok(site.expr(ExprKind::Closure { params, body }))
    }

    /// Unwraps an optional value with `!`.
    fn force(&mut self, expr: Expr) -> Result<Expr> {
        let expr = self.load(expr);
        let Some((_, object)) = expr.ty.optional_object() else {
            return Err(desync(
                expr.span,
                format!("cannot force-unwrap non-optional '{}'", self.type_name(&expr.ty)),
            ));
        };
        let object = object.clone();
        Ok(self.wrap(expr, object, |sub| ExprKind::ForceValue { sub }))
    }
}

/// The declaration a callee ultimately names, looking through conversions.
pub(crate) fn referenced_decl(expr: &Expr) -> Option<DeclId> {
    match &expr.kind {
        ExprKind::DeclRef { decl, .. } => *decl,
        ExprKind::MemberRef { decl, .. }
        | ExprKind::DynamicMemberRef { decl, .. }
        | ExprKind::ConstructorRef { decl, .. } => Some(*decl),
        ExprKind::OpenExistential { body, .. } => referenced_decl(body),
        ExprKind::Paren { sub }
        | ExprKind::Load { sub }
        | ExprKind::ForceValue { sub }
        | ExprKind::FunctionConversion { sub }
        | ExprKind::CovariantFunctionConversion { sub } => referenced_decl(sub),
        _ => None,
    }
}

/// Dynamic lookup yields an implicitly unwrapped optional.
fn dynamic_result(ty: &Type) -> Type {
    if ty.rvalue().optional_object().is_some() {
        return ty.rvalue().clone();
    }
    Type::implicitly_unwrapped(ty.rvalue().clone())
}

/// The one argument of a single-argument list.
fn single_argument(args: Expr, span: Span) -> Result<Expr> {
    match args.kind {
        ExprKind::Paren { sub } => Ok(*sub),
        ExprKind::Tuple { mut elements, .. } if elements.len() == 1 => elements
            .pop()
            .ok_or_else(|| desync(span, "argument list is empty")),
        ExprKind::Tuple { elements, .. } => Err(desync(
            span,
            format!("expected a single argument, found {}", elements.len()),
        )),
        kind => Ok(Expr { kind, ..args }),
    }
}
