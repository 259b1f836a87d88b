use elab_base::Span;
use elab_syntax::{Expr, ExprKind, OpaqueId};
use elab_typing::{ArchetypeId, DeclId, Locator, Type};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::Elaborator;
use crate::error::{Result, desync};

/// An existential whose payload is in scope as an opaque value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OpenedExistential {
    pub(crate) archetype: ArchetypeId,
    /// The expression producing the existential, evaluated once when the scope opens.
    pub(crate) existential: Expr,
    /// The existential (instance) type the archetype was opened from.
    pub(crate) existential_ty: Type,
    pub(crate) opaque: OpaqueId,
    /// Walker depth at which the scope closes.
    pub(crate) closing_depth: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExistentialEvent {
    Opened {
        archetype: ArchetypeId,
        opaque: OpaqueId,
        closing_depth: u32,
    },
    Closed {
        archetype: ArchetypeId,
        opaque: OpaqueId,
        depth: u32,
    },
}

/// Stack of open existential scopes. Scopes nest: one opened later closes
/// no earlier (no shallower) than the one below it.
#[derive(Debug, Default)]
pub(crate) struct ExistentialTracker {
    stack: Vec<OpenedExistential>,
    events: Vec<ExistentialEvent>,
}

impl ExistentialTracker {
    /// Fails with the closing depth of the current top when `opened` would
    /// outlive it.
    pub(crate) fn push(&mut self, opened: OpenedExistential) -> Result<(), u32> {
        if let Some(top) = self.stack.last() {
            if opened.closing_depth < top.closing_depth {
                return Err(top.closing_depth);
            }
        }
        self.events.push(ExistentialEvent::Opened {
            archetype: opened.archetype,
            opaque: opened.opaque,
            closing_depth: opened.closing_depth,
        });
        self.stack.push(opened);
        Ok(())
    }

    /// Pops the top scope if it closes at `depth`.
    pub(crate) fn pop_closing(&mut self, depth: u32) -> Option<OpenedExistential> {
        if self.stack.last()?.closing_depth != depth {
            return None;
        }
        let opened = self.stack.pop()?;
        self.events.push(ExistentialEvent::Closed {
            archetype: opened.archetype,
            opaque: opened.opaque,
            depth,
        });
        Some(opened)
    }

    pub(crate) fn top(&self) -> Option<&OpenedExistential> {
        self.stack.last()
    }

    pub(crate) fn take_events(&mut self) -> Vec<ExistentialEvent> {
        std::mem::take(&mut self.events)
    }
}

impl Elaborator<'_> {
    /// Opens the existential `base` of a reference to `member` and returns
    /// the opaque value standing in for its payload.
    pub(crate) fn open_existential(
        &mut self,
        base: Expr,
        member: DeclId,
        member_locator: &Locator,
        depth: u32,
        base_chain: u32,
    ) -> Result<Expr> {
        let decls = self.decls;
        let decl = decls.value(member);
        let Some(archetype) = self.solution.opened_existential(member_locator) else {
            return Err(desync(
                base.span,
                format!(
                    "existential base of '{}' was not opened by the solver",
                    decl.full_name()
                ),
            ));
        };
        let rvalue = base.ty.rvalue().clone();
        let is_metatype = matches!(rvalue, Type::ExistentialMetatype(_) | Type::Metatype(_));
        let existential_ty = match rvalue.metatype_instance() {
            Some(instance) => instance.clone(),
            None => rvalue.clone(),
        };
        let class_bound = decls.is_class_existential(&existential_ty);
        let base = if base.ty.is_lvalue() && (!decl.is_mutating || is_metatype || class_bound) {
            self.load(base)
        } else {
            base
        };

        let mut opaque_ty = Type::Archetype(archetype);
        if is_metatype {
            opaque_ty = Type::metatype(opaque_ty);
        }
        if base.ty.is_lvalue() {
            opaque_ty = Type::lvalue(opaque_ty);
        }
        let natural = decl.natural_argument_count();
        let closing_depth = (depth + 1).saturating_sub(natural.min(1 + base_chain));
        let opaque = self.fresh_opaque();
        let span = base.span;
        debug!(opaque = opaque.0, closing_depth, depth, "opening existential");
        let opened = OpenedExistential {
            archetype,
            existential: base,
            existential_ty,
            opaque,
            closing_depth,
        };
        if let Err(top) = self.existentials.push(opened) {
            return Err(desync(
                span,
                format!(
                    "existential opened with closing depth {closing_depth} outlives the enclosing one closing at {top}"
                ),
            ));
        }
        Ok(self.implicit(span, opaque_ty, ExprKind::OpaqueValue { opaque }))
    }

    /// Closes every scope whose closing depth is `depth` around `expr`,
    /// erasing opened archetypes from its type.
    pub(crate) fn close_existentials(&mut self, mut expr: Expr, depth: u32) -> Result<Expr> {
        while let Some(opened) = self.existentials.pop_closing(depth) {
            debug!(opaque = opened.opaque.0, depth, "closing existential");
            if expr.ty.mentions_archetype(opened.archetype) {
                let erased = expr
                    .ty
                    .rvalue()
                    .erase_opened(opened.archetype, &opened.existential_ty);
                let locator = Locator::new(expr.id);
                expr = self.coerce(expr, &erased, &locator)?;
            }
            let ty = expr.ty.clone();
            let span = Span {
                start: opened.existential.span.start,
                end: expr.span.end,
            };
            expr = self.implicit(
                span,
                ty,
                ExprKind::OpenExistential {
                    existential: Box::new(opened.existential),
                    opaque: opened.opaque,
                    body: Box::new(expr),
                },
            );
        }
        Ok(expr)
    }
}
