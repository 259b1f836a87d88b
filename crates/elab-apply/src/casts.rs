//! `as`, `as?`, `as!` and `is`.

use elab_base::{Diagnostic, Span, SuggestedEdit};
use elab_syntax::{CastForm, CheckedCastKind, Expr, ExprKind};
use elab_typing::{NominalId, Type};
use tracing::trace;

use crate::coerce::require_interop;
use crate::engine::Elaborator;
use crate::error::{Result, desync};
use crate::reference::Site;

impl Elaborator<'_> {
    pub(crate) fn cast(
        &mut self,
        site: Site,
        sub: Expr,
        target: Type,
        form: CastForm,
        keyword: Span,
    ) -> Result<Expr> {
        let locator = site.locator();
        if form == CastForm::Coerce {
            let sub = self.coerce(sub, &target, &locator)?;
            return Ok(site.expr(coercion(sub, target, keyword)));
        }
        let sub = self.load(sub);
        if form == CastForm::Conditional {
            if let Some(kind) = self.solution.conversion_restriction(&sub.ty, &target) {
                if kind.is_collection_upcast() {
                    trace!(restriction = kind.name(), "conditional cast over a collection upcast");
                    let upcast = self.coerce(sub, &target, &locator)?;
                    return Ok(site.expr(ExprKind::Cast {
                        sub: Box::new(upcast),
                        target,
                        form,
                        keyword,
                        classified: Some(CheckedCastKind::Coercion),
                    }));
                }
            }
        }

        let classified = self.classify_cast(&sub, &target)?;
        trace!(form = form.keyword(), ?classified, "cast classified");
        if classified != CheckedCastKind::Coercion {
            return Ok(site.expr(ExprKind::Cast {
                sub: Box::new(sub),
                target,
                form,
                keyword,
                classified: Some(classified),
            }));
        }

        let from = self.type_name(&sub.ty);
        let to = self.type_name(&target);
        match form {
            CastForm::Conditional => {
                self.warn(Diagnostic::warning(
                    "W4101",
                    format!("conditional cast from '{from}' to '{to}' always succeeds"),
                    keyword,
                ));
                let sub = self.coerce(sub, &target, &locator)?;
                let coerced = Expr {
                    ty: target.clone(),
                    ..site.expr(coercion(sub, target, keyword))
                };
                let span = coerced.span;
                Ok(Expr {
                    id: self.fresh_id(),
                    span,
                    ty: site.ty,
                    implicit: true,
                    kind: ExprKind::InjectIntoOptional {
                        sub: Box::new(coerced),
                    },
                })
            }
            CastForm::Forced => {
                self.warn(
                    Diagnostic::warning(
                        "W4101",
                        format!("forced cast from '{from}' to '{to}' always succeeds; did you mean to use 'as'?"),
                        keyword,
                    )
                    .with_edit(SuggestedEdit::replace(keyword, "as")),
                );
                self.diagnosed.insert(site.id);
                let sub = self.coerce(sub, &target, &locator)?;
                Ok(site.expr(coercion(sub, target, keyword)))
            }
            CastForm::Is => {
                self.warn(Diagnostic::warning("W4104", "'is' test is always true", keyword));
                Ok(site.expr(ExprKind::Cast {
                    sub: Box::new(sub),
                    target,
                    form,
                    keyword,
                    classified: Some(classified),
                }))
            }
            CastForm::Coerce => Err(desync(site.span, "coercion reached cast classification")),
        }
    }

    /// How a checked cast from `sub` to `target` is performed at run time.
    fn classify_cast(&mut self, sub: &Expr, target: &Type) -> Result<CheckedCastKind> {
        let (from_depth, from) = sub.ty.look_through_optionals();
        let (to_depth, to) = target.look_through_optionals();
        if from_depth <= to_depth && self.statically_converts(from, to) {
            return Ok(CheckedCastKind::Coercion);
        }
        let decls = self.decls;
        if let (Some(_), Some(element)) = (decls.array_element(from), decls.array_element(to)) {
            return Ok(CheckedCastKind::ArrayDowncast {
                bridged: !decls.is_bridgeable_object_type(&element),
            });
        }
        if let (Some(_), Some((key, value))) = (decls.dictionary_key_value(from), decls.dictionary_key_value(to)) {
            return Ok(CheckedCastKind::DictionaryDowncast {
                bridged: !decls.is_bridgeable_object_type(&key) || !decls.is_bridgeable_object_type(&value),
            });
        }
        if let (Some(_), Some(element)) = (decls.set_element(from), decls.set_element(to)) {
            return Ok(CheckedCastKind::SetDowncast {
                bridged: !decls.is_bridgeable_object_type(&element),
            });
        }
        let from_foreign = self.is_foreign_class(from) || from.is_existential();
        if from_foreign && !decls.is_class_type(to) && decls.bridged_foreign_type(to).is_some() {
            require_interop(self, sub, target)?;
            return Ok(CheckedCastKind::BridgeFromForeign);
        }
        if castable(decls.is_class_type(from), from) || castable(decls.is_class_type(to), to) {
            return Ok(CheckedCastKind::ValueCast);
        }
        Err(desync(
            sub.span,
            format!(
                "cast from '{}' to unrelated type '{}' always fails",
                self.type_name(&sub.ty),
                self.type_name(target)
            ),
        ))
    }

    /// `from` converts to `to` without a run-time check.
    fn statically_converts(&mut self, from: &Type, to: &Type) -> bool {
        if from == to || self.decls.is_subclass_of(from, to) {
            return true;
        }
        match to {
            Type::Existential(protocols) if !from.is_existential() => protocols
                .iter()
                .all(|protocol| self.conformance(from, *protocol).is_some()),
            Type::Existential(protocols) => protocols.iter().all(|protocol| {
                let Type::Existential(members) = from else {
                    return false;
                };
                members
                    .iter()
                    .any(|member| self.decls.protocol_implies(*member, *protocol))
            }),
            _ => false,
        }
    }

    fn is_foreign_class(&self, ty: &Type) -> bool {
        match ty {
            Type::Nominal { decl, .. } => self.nominal_is_foreign(*decl),
            _ => false,
        }
    }

    fn nominal_is_foreign(&self, nominal: NominalId) -> bool {
        let decl = self.decls.nominal(nominal);
        decl.is_class() && decl.foreign
    }
}

/// Types a value cast can inspect dynamically.
fn castable(is_class: bool, ty: &Type) -> bool {
    is_class
        || matches!(
            ty,
            Type::Existential(_) | Type::Archetype(_) | Type::ExistentialMetatype(_) | Type::Metatype(_)
        )
}

fn coercion(sub: Expr, target: Type, keyword: Span) -> ExprKind {
    ExprKind::Cast {
        sub: Box::new(sub),
        target,
        form: CastForm::Coerce,
        keyword,
        classified: None,
    }
}
