//! Turning a solver overload choice into a concrete reference node.

use elab_base::{ExprId, Span, SuggestedEdit};
use elab_syntax::{AccessSemantics, Expr, ExprKind};
use elab_typing::{
    DeclContext, DeclId, Locator, NominalKind, OverloadChoice, StorageKind, SubstitutionMap, Type,
    ValueKind,
};
use tracing::trace;

use crate::engine::Elaborator;
use crate::error::{ElaborationError, Result, desync};

/// The solved node a reference replaces.
#[derive(Debug, Clone)]
pub(crate) struct Site {
    pub(crate) id: ExprId,
    pub(crate) span: Span,
    pub(crate) ty: Type,
    pub(crate) implicit: bool,
}

impl Site {
    pub(crate) fn expr(&self, kind: ExprKind) -> Expr {
        Expr {
            id: self.id,
            span: self.span,
            ty: self.ty.clone(),
            implicit: self.implicit,
            kind,
        }
    }

    pub(crate) fn locator(&self) -> Locator {
        Locator::new(self.id)
    }
}

/// The instance type behind a (possibly lvalue) value or metatype.
pub(crate) fn base_instance(ty: &Type) -> &Type {
    let ty = ty.rvalue();
    ty.metatype_instance().unwrap_or(ty)
}

impl Elaborator<'_> {
    /// Generic arguments for a reference to `decl` through `base`.
    pub(crate) fn reference_substitutions(
        &self,
        decl: DeclId,
        base: Option<&Type>,
        locator: &Locator,
        span: Span,
    ) -> Result<SubstitutionMap> {
        let value = self.decls.value(decl);
        let mut substitutions = match base {
            Some(base) => self.decls.context_substitutions(base_instance(base)),
            None => SubstitutionMap::new(),
        };
        if let Some(opened) = self.solution.opened_types(locator) {
            for (archetype, ty) in opened.iter() {
                substitutions.insert(archetype, self.simplify(ty, span)?);
            }
        }
        if let (DeclContext::Protocol(protocol), Some(base)) = (value.context, base) {
            let self_param = self.decls.protocol(protocol).self_param;
            if !substitutions.contains(self_param) {
                substitutions.insert(self_param, base_instance(base).clone());
            }
        }
        for param in &value.generic_params {
            if !substitutions.contains(*param) {
                return Err(desync(
                    span,
                    format!(
                        "no binding for generic parameter '{}' of '{}'",
                        self.decls.archetype(*param).name,
                        value.full_name()
                    ),
                ));
            }
        }
        Ok(substitutions)
    }

    /// `DeclRef` to a named declaration or local.
    pub(crate) fn decl_ref(&mut self, site: Site, name: String, decl: Option<DeclId>) -> Result<Expr> {
        let locator = site.locator();
        let decl = match self.solution.overload_choice(&locator) {
            Some(OverloadChoice::Declaration { decl, .. }) => Some(*decl),
            Some(other) => {
                return Err(desync(
                    site.span,
                    format!("reference '{name}' resolved to a non-declaration choice {other:?}"),
                ));
            }
            None => decl,
        };
        let Some(decl) = decl else {
            return Ok(site.expr(ExprKind::DeclRef {
                name,
                decl: None,
                semantics: AccessSemantics::Ordinary,
                substitutions: SubstitutionMap::new(),
            }));
        };
        let decl = self.redirect_operator(decl, &locator);
        let substitutions = self.reference_substitutions(decl, None, &locator, site.span)?;
        trace!(decl = decl.0, %name, "declaration reference");
        Ok(site.expr(ExprKind::DeclRef {
            name,
            decl: Some(decl),
            semantics: AccessSemantics::Ordinary,
            substitutions,
        }))
    }

    /// An operator requirement applied to a concrete, non-generic conformer
    /// references that conformer's witness instead.
    fn redirect_operator(&mut self, decl: DeclId, locator: &Locator) -> DeclId {
        let value = self.decls.value(decl);
        let DeclContext::Protocol(protocol) = value.context else {
            return decl;
        };
        if !value.is_operator {
            return decl;
        }
        let self_param = self.decls.protocol(protocol).self_param;
        let Some(conformer) = self
            .solution
            .opened_types(locator)
            .and_then(|opened| opened.get(self_param))
            .cloned()
        else {
            return decl;
        };
        let Ok(conformer) = self.solution.simplify_type(&conformer) else {
            return decl;
        };
        if !matches!(&conformer, Type::Nominal { args, .. } if args.is_empty()) {
            return decl;
        }
        let Some(conformance) = self.conformance(&conformer, protocol) else {
            return decl;
        };
        match self.witness(conformance, decl) {
            Some(witness) if witness != decl => {
                trace!(requirement = decl.0, witness = witness.0, "operator redirected to witness");
                witness
            }
            _ => decl,
        }
    }

    /// `base.member` for a declaration choice.
    pub(crate) fn member_ref(
        &mut self,
        site: Site,
        base: Expr,
        member: DeclId,
        member_locator: &Locator,
        depth: u32,
        base_chain: u32,
    ) -> Result<Expr> {
        let decls = self.decls;
        let decl = decls.value(member);
        let through_self = base.semantics_provider().is_self_ref();
        let base = self.member_base(base, member, member_locator, site.ty.is_lvalue(), depth, base_chain)?;

        let substitutions =
            self.reference_substitutions(member, Some(&base.ty), member_locator, site.span)?;
        let semantics = if through_self && self.is_direct_storage_access(member) {
            AccessSemantics::DirectToStorage
        } else {
            AccessSemantics::Ordinary
        };
        trace!(member = member.0, ?semantics, "member reference");

        if !decl.ty.has_dynamic_self() {
            return Ok(site.expr(ExprKind::MemberRef {
                base: Box::new(base),
                decl: member,
                semantics,
                substitutions,
            }));
        }
        let declared = decl.ty.subst(&substitutions).strip_dynamic_self();
        let reference = Expr {
            id: site.id,
            span: site.span,
            ty: declared,
            implicit: site.implicit,
            kind: ExprKind::MemberRef {
                base: Box::new(base),
                decl: member,
                semantics,
                substitutions,
            },
        };
        if reference.ty == site.ty {
            return Ok(reference);
        }
        Ok(self.wrap(reference, site.ty, |sub| ExprKind::CovariantFunctionConversion { sub }))
    }

    /// Opens an existential base, loads it unless the access can write
    /// through it, and upcasts it to the type declaring `member`.
    pub(crate) fn member_base(
        &mut self,
        base: Expr,
        member: DeclId,
        member_locator: &Locator,
        wants_lvalue: bool,
        depth: u32,
        base_chain: u32,
    ) -> Result<Expr> {
        let decls = self.decls;
        let decl = decls.value(member);
        let base = if base.ty.rvalue().is_any_existential() && decl.is_member() {
            self.open_existential(base, member, member_locator, depth, base_chain)?
        } else {
            base
        };

        let is_metatype = base.ty.rvalue().metatype_instance().is_some();
        let is_class = decls.is_class_type(base_instance(&base.ty));
        let keeps_lvalue =
            base.ty.is_lvalue() && !is_class && !is_metatype && (decl.is_mutating || wants_lvalue);
        let base = if keeps_lvalue { base } else { self.load(base) };
        self.upcast_to_context(base, decl.context)
    }

    /// Upcasts a class (or class metatype) base to the class declaring the member.
    fn upcast_to_context(&mut self, base: Expr, context: DeclContext) -> Result<Expr> {
        let DeclContext::Nominal(nominal) = context else {
            return Ok(base);
        };
        if self.decls.nominal(nominal).kind != NominalKind::Class {
            return Ok(base);
        }
        let instance = base_instance(&base.ty).clone();
        let lookup = match &instance {
            Type::Archetype(id) => self.decls.archetype(*id).superclass.clone(),
            Type::DynamicSelf(inner) => Some((**inner).clone()),
            _ => Some(instance.clone()),
        };
        let Some(declaring) = lookup.and_then(|ty| self.decls.find_in_superclass_chain(&ty, nominal))
        else {
            return Ok(base);
        };
        if declaring == instance {
            return Ok(base);
        }
        if base.ty.rvalue().metatype_instance().is_some() {
            return Ok(self.wrap(base, Type::metatype(declaring), |sub| {
                ExprKind::MetatypeConversion { sub }
            }));
        }
        Ok(self.upcast(base, &declaring))
    }

    /// A stored property reached through `self` inside its own type's
    /// initializer or deinitializer bypasses its accessors.
    fn is_direct_storage_access(&self, member: DeclId) -> bool {
        let decl = self.decls.value(member);
        if decl.kind != ValueKind::Var || decl.storage != StorageKind::Stored {
            return false;
        }
        let Some(enclosing) = self.context.enclosing_decl else {
            return false;
        };
        let enclosing = self.decls.value(enclosing);
        matches!(enclosing.kind, ValueKind::Initializer | ValueKind::Deinitializer)
            && enclosing.context == decl.context
    }

    /// `ConstructorRef` of `init` on the metatype `base`, typed for the instance it builds.
    pub(crate) fn constructor_ref(
        &mut self,
        base: Expr,
        init: DeclId,
        locator: &Locator,
        site_span: Span,
    ) -> Result<Expr> {
        let decls = self.decls;
        let decl = decls.value(init);
        let base = self.load(base);
        let instance = base_instance(&base.ty).clone();
        if !self.is_statically_derived(&base) {
            self.check_required_init(&instance, init, site_span)?;
        }
        let substitutions = self.reference_substitutions(init, Some(&base.ty), locator, site_span)?;
        let concrete = match &instance {
            Type::DynamicSelf(_) => instance.clone(),
            _ => instance.strip_dynamic_self(),
        };
        let ty = decl.ty.subst(&substitutions).replace_dynamic_self(&concrete);
        let span = base.span;
        Ok(self.implicit(
            span,
            ty,
            ExprKind::ConstructorRef {
                base: Box::new(base),
                decl: init,
                substitutions,
            },
        ))
    }

    /// The metatype is known statically: a type expression, `super`, or
    /// `self` of a concrete type.
    fn is_statically_derived(&self, base: &Expr) -> bool {
        let base = base.semantics_provider();
        let base = match &base.kind {
            ExprKind::Load { sub } => sub.semantics_provider(),
            _ => base,
        };
        match &base.kind {
            ExprKind::TypeExpr | ExprKind::SuperRef => true,
            _ if base.is_self_ref() => !matches!(base_instance(&base.ty), Type::DynamicSelf(_)),
            _ => false,
        }
    }

    fn check_required_init(&self, instance: &Type, init: DeclId, span: Span) -> Result<()> {
        let Type::Nominal { decl: nominal, .. } = base_instance(instance).strip_dynamic_self() else {
            return Ok(());
        };
        let class = self.decls.nominal(nominal);
        if !class.is_class() || class.is_final || self.decls.value(init).is_required {
            return Ok(());
        }
        Err(ElaborationError::InvalidConstruction {
            span,
            message: format!(
                "constructing an object of class type '{}' with a metatype value must use a 'required' initializer",
                class.name
            ),
            edit: None,
        })
    }

    /// A call through a metatype value that does not name `init`.
    pub(crate) fn implicit_init_through_value(&self, callee: &Expr) -> ElaborationError {
        ElaborationError::InvalidConstruction {
            span: callee.span,
            message: "initializing from a metatype value must reference 'init' explicitly".to_string(),
            edit: Some(SuggestedEdit::insert(callee.span.end_point(), ".init")),
        }
    }
}
