use elab_base::Span;
use elab_syntax::{Expr, ExprKind, MagicIdentifierKind};
use elab_typing::{DeclId, DefaultArgument, Type};

use crate::engine::Elaborator;
use crate::error::{Result, desync};
use crate::literal::default_literal_kind;
use crate::reference::Site;

impl Elaborator<'_> {
    /// The caller-side value of unbound parameter `index`, materialized at
    /// the start of the call. `None` when the callee supplies it.
    pub(crate) fn default_argument(
        &mut self,
        callee: Option<DeclId>,
        index: usize,
        param_ty: &Type,
        call_span: Span,
    ) -> Result<Option<Expr>> {
        let Some(mut decl) = callee else {
            return Err(desync(call_span, format!("parameter #{index} of an unknown callee has no argument")));
        };
        let default = loop {
            let value = self.decls.value(decl);
            let Some(param) = value.params.get(index) else {
                return Err(desync(
                    call_span,
                    format!("'{}' has no parameter #{index}", value.full_name()),
                ));
            };
            match (&param.default, value.overridden) {
                (DefaultArgument::Inherited, Some(overridden)) => decl = overridden,
                (default, _) => break default.clone(),
            }
        };
        let kind = match default {
            DefaultArgument::Normal => return Ok(None),
            DefaultArgument::None | DefaultArgument::Inherited => {
                return Err(desync(
                    call_span,
                    format!(
                        "parameter #{index} of '{}' has no argument and no default",
                        self.decls.value(decl).full_name()
                    ),
                ));
            }
            DefaultArgument::Line => magic(MagicIdentifierKind::Line),
            DefaultArgument::Column => magic(MagicIdentifierKind::Column),
            DefaultArgument::File => magic(MagicIdentifierKind::File),
            DefaultArgument::Function => magic(MagicIdentifierKind::Function),
            DefaultArgument::Nil => ExprKind::NilLiteral,
            DefaultArgument::EmptyArray => ExprKind::ArrayLiteral {
                elements: Vec::new(),
                initializer: None,
            },
            DefaultArgument::EmptyDictionary => ExprKind::DictionaryLiteral {
                entries: Vec::new(),
                initializer: None,
            },
            DefaultArgument::StoredLiteral(value) => default_literal_kind(&value),
        };

        let value_ty = match param_ty.as_function() {
            Some(function) if function.autoclosure => function.result.clone(),
            _ => param_ty.clone(),
        };
        let site = Site {
            id: self.fresh_id(),
            span: call_span.start_point(),
            ty: value_ty,
            implicit: true,
        };
        let locator = site.locator();
        let literal = self.materialize_literal(site, kind)?;
        self.coerce(literal, param_ty, &locator).map(Some)
    }
}

fn magic(magic: MagicIdentifierKind) -> ExprKind {
    ExprKind::MagicIdentifier {
        magic,
        value: None,
        encoding: None,
        builtin: None,
    }
}
