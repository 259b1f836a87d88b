//! Lowering literals to their type's literal-protocol initializers.

use elab_base::Span;
use elab_syntax::{BuiltinInit, DictionaryEntry, Expr, ExprKind, MagicIdentifierKind, StringEncoding};
use elab_typing::{
    BuiltinType, ConformanceRef, DeclId, KnownProtocol, LiteralValue, PathElement, ProtocolId,
    TupleElement, Type,
};
use tracing::trace;

use crate::engine::Elaborator;
use crate::error::{ElaborationError, Result, desync};
use crate::reference::Site;

#[derive(Debug, Clone, Copy)]
enum Payload {
    Integer,
    Float,
    Int1,
    RawPointer,
    Int32,
}

/// One literal kind: the general protocol any type may adopt, and the
/// builtin protocol it bottoms out in.
#[derive(Debug)]
struct LiteralRow {
    general: KnownProtocol,
    builtin: KnownProtocol,
    general_label: &'static str,
    builtin_label: &'static str,
    payload_name: &'static str,
    payload: Payload,
    /// Protocols whose default literal type gets the sugared spelling.
    sugar: &'static [KnownProtocol],
}

const INTEGER: LiteralRow = LiteralRow {
    general: KnownProtocol::ExpressibleByIntegerLiteral,
    builtin: KnownProtocol::BuiltinIntegerLiteral,
    general_label: "integerLiteral",
    builtin_label: "_builtinIntegerLiteral",
    payload_name: "IntegerLiteralType",
    payload: Payload::Integer,
    sugar: &[KnownProtocol::ExpressibleByIntegerLiteral, KnownProtocol::ExpressibleByFloatLiteral],
};

const FLOAT: LiteralRow = LiteralRow {
    general: KnownProtocol::ExpressibleByFloatLiteral,
    builtin: KnownProtocol::BuiltinFloatLiteral,
    general_label: "floatLiteral",
    builtin_label: "_builtinFloatLiteral",
    payload_name: "FloatLiteralType",
    payload: Payload::Float,
    sugar: &[KnownProtocol::ExpressibleByFloatLiteral],
};

const BOOLEAN: LiteralRow = LiteralRow {
    general: KnownProtocol::ExpressibleByBooleanLiteral,
    builtin: KnownProtocol::BuiltinBooleanLiteral,
    general_label: "booleanLiteral",
    builtin_label: "_builtinBooleanLiteral",
    payload_name: "BooleanLiteralType",
    payload: Payload::Int1,
    sugar: &[KnownProtocol::ExpressibleByBooleanLiteral],
};

const STRING: LiteralRow = LiteralRow {
    general: KnownProtocol::ExpressibleByStringLiteral,
    builtin: KnownProtocol::BuiltinStringLiteral,
    general_label: "stringLiteral",
    builtin_label: "_builtinStringLiteral",
    payload_name: "StringLiteralType",
    payload: Payload::RawPointer,
    sugar: &[KnownProtocol::ExpressibleByStringLiteral],
};

const GRAPHEME: LiteralRow = LiteralRow {
    general: KnownProtocol::ExpressibleByExtendedGraphemeClusterLiteral,
    builtin: KnownProtocol::BuiltinExtendedGraphemeClusterLiteral,
    general_label: "extendedGraphemeClusterLiteral",
    builtin_label: "_builtinExtendedGraphemeClusterLiteral",
    payload_name: "ExtendedGraphemeClusterLiteralType",
    payload: Payload::RawPointer,
    sugar: &[KnownProtocol::ExpressibleByExtendedGraphemeClusterLiteral],
};

const SCALAR: LiteralRow = LiteralRow {
    general: KnownProtocol::ExpressibleByUnicodeScalarLiteral,
    builtin: KnownProtocol::BuiltinUnicodeScalarLiteral,
    general_label: "unicodeScalarLiteral",
    builtin_label: "_builtinUnicodeScalarLiteral",
    payload_name: "UnicodeScalarLiteralType",
    payload: Payload::Int32,
    sugar: &[KnownProtocol::ExpressibleByUnicodeScalarLiteral],
};

type MakeScalar<'m> = &'m dyn Fn(Option<BuiltinInit>) -> ExprKind;
type MakeString<'m> = &'m dyn Fn(BuiltinInit, StringEncoding) -> ExprKind;

impl Elaborator<'_> {
    /// Lowers a literal node of kind `kind` to the solved type of `site`.
    /// Collection elements must already be elaborated.
    pub(crate) fn materialize_literal(&mut self, site: Site, kind: ExprKind) -> Result<Expr> {
        if site.ty.is_unresolved() || already_builtin(&site.ty, &kind) {
            return Ok(site.expr(kind));
        }
        trace!(id = %site.id, literal = kind.name(), "materializing literal");
        match kind {
            ExprKind::IntegerLiteral { text, negative, .. } => {
                let row = self.integer_row(&site.ty);
                self.scalar_literal(site, row, &|builtin| ExprKind::IntegerLiteral {
                    text: text.clone(),
                    negative,
                    builtin,
                })
            }
            ExprKind::FloatLiteral { text, negative, .. } => self.scalar_literal(
                site,
                &FLOAT,
                &|builtin| ExprKind::FloatLiteral {
                    text: text.clone(),
                    negative,
                    builtin,
                },
            ),
            ExprKind::BooleanLiteral { value, .. } => {
                self.scalar_literal(site, &BOOLEAN, &|builtin| ExprKind::BooleanLiteral { value, builtin })
            }
            ExprKind::StringLiteral { value, .. } => {
                let ascii = value.is_ascii();
                self.string_literal(site, ascii, &|builtin, encoding| ExprKind::StringLiteral {
                    value: value.clone(),
                    encoding: Some(encoding),
                    builtin: Some(builtin),
                })
            }
            ExprKind::MagicIdentifier { magic, .. } => self.magic_identifier(site, magic),
            ExprKind::NilLiteral => self.nil_literal(site),
            ExprKind::ArrayLiteral { elements, .. } => self.array_literal(site, elements),
            ExprKind::DictionaryLiteral { entries, .. } => self.dictionary_literal(site, entries),
            other => Err(desync(
                site.span,
                format!("'{}' is not a literal", other.name()),
            )),
        }
    }

    /// Integer literals of the default float-literal type take the float
    /// payload when that type adopts the builtin float protocol.
    fn integer_row(&mut self, ty: &Type) -> &'static LiteralRow {
        let default_float = self
            .decls
            .known_protocol(KnownProtocol::ExpressibleByFloatLiteral)
            .and_then(|protocol| self.decls.protocol(protocol).default_type.as_ref())
            == Some(ty);
        if default_float && self.conforms_known(ty, FLOAT.builtin) {
            &FLOAT
        } else {
            &INTEGER
        }
    }

    fn scalar_literal(&mut self, site: Site, row: &LiteralRow, make: MakeScalar<'_>) -> Result<Expr> {
        if let Some(builtin) = self.builtin_init(&site.ty, row.builtin, row.builtin_label, row, site.span)? {
            return Ok(site.expr(make(Some(builtin))));
        }
        let (general, conformance) = self.general_conformance(&site.ty, row, site.span)?;
        let payload_ty = self.payload_type(conformance, &site.ty, row, site.span)?;
        let Some(builtin) = self.builtin_init(&payload_ty, row.builtin, row.builtin_label, row, site.span)? else {
            return Err(self.missing(&payload_ty, row.builtin, site.span));
        };
        let inner = self.implicit(site.span, payload_ty, make(Some(builtin)));
        self.literal_init_call(site, general, row.general_label, conformance, inner)
    }

    fn string_literal(&mut self, site: Site, ascii: bool, make: MakeString<'_>) -> Result<Expr> {
        let row = [&STRING, &GRAPHEME, &SCALAR]
            .into_iter()
            .find(|row| self.conforms_known(&site.ty, row.builtin) || self.conforms_known(&site.ty, row.general));
        let Some(row) = row else {
            return Err(self.missing(&site.ty, STRING.general, site.span));
        };
        if let Some((builtin, encoding)) = self.string_builtin(&site.ty, row, ascii, site.span)? {
            return Ok(site.expr(make(builtin, encoding)));
        }
        let (general, conformance) = self.general_conformance(&site.ty, row, site.span)?;
        let payload_ty = self.payload_type(conformance, &site.ty, row, site.span)?;
        let Some((builtin, encoding)) = self.string_builtin(&payload_ty, row, ascii, site.span)? else {
            return Err(self.missing(&payload_ty, row.builtin, site.span));
        };
        let inner = self.implicit(site.span, payload_ty, make(builtin, encoding));
        self.literal_init_call(site, general, row.general_label, conformance, inner)
    }

    /// Builtin string initializer and encoding: UTF-16 for non-ASCII text
    /// when the type takes it, the constant form for ASCII text when the
    /// type takes that, UTF-8 otherwise.
    fn string_builtin(
        &mut self,
        ty: &Type,
        row: &LiteralRow,
        ascii: bool,
        span: Span,
    ) -> Result<Option<(BuiltinInit, StringEncoding)>> {
        if row.builtin == KnownProtocol::BuiltinStringLiteral {
            if !ascii && self.conforms_known(ty, KnownProtocol::BuiltinUtf16StringLiteral) {
                let builtin = self.builtin_init(
                    ty,
                    KnownProtocol::BuiltinUtf16StringLiteral,
                    "_builtinUTF16StringLiteral",
                    row,
                    span,
                )?;
                return Ok(builtin.map(|builtin| (builtin, StringEncoding::Utf16)));
            }
            if ascii && self.conforms_known(ty, KnownProtocol::BuiltinConstStringLiteral) {
                let builtin = self.builtin_init(
                    ty,
                    KnownProtocol::BuiltinConstStringLiteral,
                    "_builtinConstStringLiteral",
                    row,
                    span,
                )?;
                return Ok(builtin.map(|builtin| (builtin, StringEncoding::ConstantUtf8)));
            }
        }
        let builtin = self.builtin_init(ty, row.builtin, row.builtin_label, row, span)?;
        Ok(builtin.map(|builtin| (builtin, StringEncoding::Utf8 { is_ascii: ascii })))
    }

    fn magic_identifier(&mut self, site: Site, magic: MagicIdentifierKind) -> Result<Expr> {
        match magic {
            MagicIdentifierKind::File | MagicIdentifierKind::Function => {
                let text = match magic {
                    MagicIdentifierKind::File => self.options.source_name.clone(),
                    _ => self.context.function_name.clone(),
                };
                let ascii = text.is_ascii();
                self.string_literal(site, ascii, &|builtin, encoding| ExprKind::MagicIdentifier {
                    magic,
                    value: Some(LiteralValue::String(text.clone())),
                    encoding: Some(encoding),
                    builtin: Some(builtin),
                })
            }
            MagicIdentifierKind::Line | MagicIdentifierKind::Column => {
                let position = match magic {
                    MagicIdentifierKind::Line => site.span.start.line,
                    _ => site.span.start.column,
                };
                self.scalar_literal(site, &INTEGER, &|builtin| ExprKind::MagicIdentifier {
                    magic,
                    value: Some(LiteralValue::Integer(position.to_string())),
                    encoding: None,
                    builtin,
                })
            }
        }
    }

    fn nil_literal(&mut self, site: Site) -> Result<Expr> {
        if site.ty.optional_object().is_some() {
            return Ok(site.expr(ExprKind::NilLiteral));
        }
        let Some(protocol) = self.decls.known_protocol(KnownProtocol::ExpressibleByNilLiteral) else {
            return Err(desync(site.span, "no nil literal protocol is declared"));
        };
        let conformance = self.require_conformance(&site.ty, protocol, site.span)?;
        let unit = self.implicit(
            site.span,
            Type::void(),
            ExprKind::Tuple {
                elements: Vec::new(),
                labels: Vec::new(),
            },
        );
        self.literal_init_call(site, protocol, "nilLiteral", conformance, unit)
    }

    fn array_literal(&mut self, site: Site, elements: Vec<Expr>) -> Result<Expr> {
        let Some(protocol) = self.decls.known_protocol(KnownProtocol::ExpressibleByArrayLiteral) else {
            return Err(desync(site.span, "no array literal protocol is declared"));
        };
        let conformance = self.require_conformance(&site.ty, protocol, site.span)?;
        let element_ty = self.associated(conformance, &site.ty, "Element", site.span)?;
        let locator = site.locator();
        let mut converted = Vec::with_capacity(elements.len());
        for (index, element) in elements.into_iter().enumerate() {
            let element_locator = locator.with(PathElement::TupleElement(index as u32));
            converted.push(self.coerce(element, &element_ty, &element_locator)?);
        }
        let initializer = self.literal_witness(protocol, "arrayLiteral", conformance, site.span)?;
        Ok(site.expr(ExprKind::ArrayLiteral {
            elements: converted,
            initializer: Some(initializer),
        }))
    }

    fn dictionary_literal(&mut self, site: Site, entries: Vec<DictionaryEntry>) -> Result<Expr> {
        let Some(protocol) = self
            .decls
            .known_protocol(KnownProtocol::ExpressibleByDictionaryLiteral)
        else {
            return Err(desync(site.span, "no dictionary literal protocol is declared"));
        };
        let conformance = self.require_conformance(&site.ty, protocol, site.span)?;
        let key_ty = self.associated(conformance, &site.ty, "Key", site.span)?;
        let value_ty = self.associated(conformance, &site.ty, "Value", site.span)?;
        let locator = site.locator();
        let mut converted = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            let entry_locator = locator.with(PathElement::TupleElement(index as u32));
            let key = self.coerce(entry.key, &key_ty, &entry_locator.with(PathElement::TupleElement(0)))?;
            let value = self.coerce(
                entry.value,
                &value_ty,
                &entry_locator.with(PathElement::TupleElement(1)),
            )?;
            converted.push(DictionaryEntry { key, value });
        }
        let initializer = self.literal_witness(protocol, "dictionaryLiteral", conformance, site.span)?;
        Ok(site.expr(ExprKind::DictionaryLiteral {
            entries: converted,
            initializer: Some(initializer),
        }))
    }

    /// `builtin`'s initializer on `ty`, if `ty` adopts the builtin protocol.
    fn builtin_init(
        &mut self,
        ty: &Type,
        builtin: KnownProtocol,
        label: &str,
        row: &LiteralRow,
        span: Span,
    ) -> Result<Option<BuiltinInit>> {
        let Some(protocol) = self.decls.known_protocol(builtin) else {
            return Ok(None);
        };
        let Some(conformance) = self.conformance(ty, protocol) else {
            return Ok(None);
        };
        let initializer = self.literal_witness(protocol, label, conformance, span)?;
        let sugared_default = row.sugar.iter().any(|known| {
            self.decls
                .known_protocol(*known)
                .and_then(|general| self.decls.protocol(general).default_type.as_ref())
                == Some(ty)
        });
        Ok(Some(BuiltinInit {
            initializer,
            payload: self.payload(row.payload),
            sugared_default,
        }))
    }

    fn general_conformance(
        &mut self,
        ty: &Type,
        row: &LiteralRow,
        span: Span,
    ) -> Result<(ProtocolId, ConformanceRef)> {
        let Some(general) = self.decls.known_protocol(row.general) else {
            return Err(desync(span, format!("no {:?} protocol is declared", row.general)));
        };
        let conformance = self.require_conformance(ty, general, span)?;
        Ok((general, conformance))
    }

    fn payload_type(&self, conformance: ConformanceRef, ty: &Type, row: &LiteralRow, span: Span) -> Result<Type> {
        self.associated(conformance, ty, row.payload_name, span)
    }

    fn associated(&self, conformance: ConformanceRef, ty: &Type, name: &str, span: Span) -> Result<Type> {
        self.decls.type_witness(conformance, ty, name).ok_or_else(|| {
            desync(
                span,
                format!("no '{name}' binding for '{}'", self.type_name(ty)),
            )
        })
    }

    fn literal_witness(
        &mut self,
        protocol: ProtocolId,
        label: &str,
        conformance: ConformanceRef,
        span: Span,
    ) -> Result<DeclId> {
        let Some(requirement) = self.decls.requirement(protocol, "init", Some(label)) else {
            return Err(desync(
                span,
                format!(
                    "'{}' declares no 'init({label}:)'",
                    self.decls.protocol(protocol).name
                ),
            ));
        };
        self.witness(conformance, requirement).ok_or_else(|| {
            desync(
                span,
                format!(
                    "conformance to '{}' has no witness for 'init({label}:)'",
                    self.decls.protocol(protocol).name
                ),
            )
        })
    }

    /// `T(label: argument)` through the general protocol's initializer.
    fn literal_init_call(
        &mut self,
        site: Site,
        protocol: ProtocolId,
        label: &str,
        conformance: ConformanceRef,
        argument: Expr,
    ) -> Result<Expr> {
        let init = self.literal_witness(protocol, label, conformance, site.span)?;
        let substitutions = self.decls.context_substitutions(&site.ty);
        let init_ty = self
            .decls
            .value(init)
            .ty
            .subst(&substitutions)
            .replace_dynamic_self(&site.ty);
        let base = self.implicit(site.span, Type::metatype(site.ty.clone()), ExprKind::TypeExpr);
        let callee = self.implicit(
            site.span,
            init_ty,
            ExprKind::ConstructorRef {
                base: Box::new(base),
                decl: init,
                substitutions,
            },
        );
        let args_ty = Type::Tuple(vec![TupleElement::labeled(label, argument.ty.clone())]);
        let args = self.implicit(
            site.span,
            args_ty,
            ExprKind::Tuple {
                elements: vec![argument],
                labels: vec![Some(label.to_string())],
            },
        );
        Ok(site.expr(ExprKind::Call {
            callee: Box::new(callee),
            args: Box::new(args),
            trailing_closure: false,
        }))
    }

    fn conforms_known(&mut self, ty: &Type, known: KnownProtocol) -> bool {
        match self.decls.known_protocol(known) {
            Some(protocol) => self.conformance(ty, protocol).is_some(),
            None => false,
        }
    }

    fn missing(&self, ty: &Type, known: KnownProtocol, span: Span) -> ElaborationError {
        let protocol = self
            .decls
            .known_protocol(known)
            .map(|protocol| self.decls.protocol(protocol).name.clone())
            .unwrap_or_else(|| format!("{known:?}"));
        ElaborationError::ConformanceMissing {
            span,
            ty: self.type_name(ty),
            protocol,
        }
    }

    fn payload(&self, payload: Payload) -> Type {
        match payload {
            Payload::Integer => Type::builtin_integer(self.options.integer_literal_width()),
            Payload::Float => Type::builtin_float(self.options.float_literal_kind()),
            Payload::Int1 => Type::builtin_integer(1),
            Payload::RawPointer => Type::Builtin(BuiltinType::RawPointer),
            Payload::Int32 => Type::builtin_integer(32),
        }
    }
}

/// Literals the solver already typed with a builtin type stay as they are.
fn already_builtin(ty: &Type, kind: &ExprKind) -> bool {
    matches!(
        (ty, kind),
        (Type::Builtin(BuiltinType::Integer { .. }), ExprKind::IntegerLiteral { .. })
            | (Type::Builtin(BuiltinType::Float { .. }), ExprKind::FloatLiteral { .. })
    )
}

/// The literal a caller-side default stands for, typed as its parameter.
pub(crate) fn default_literal_kind(value: &LiteralValue) -> ExprKind {
    match value {
        LiteralValue::Integer(text) => ExprKind::IntegerLiteral {
            text: text.trim_start_matches('-').to_string(),
            negative: text.starts_with('-'),
            builtin: None,
        },
        LiteralValue::Float(text) => ExprKind::FloatLiteral {
            text: text.trim_start_matches('-').to_string(),
            negative: text.starts_with('-'),
            builtin: None,
        },
        LiteralValue::Boolean(value) => ExprKind::BooleanLiteral {
            value: *value,
            builtin: None,
        },
        LiteralValue::String(value) => ExprKind::StringLiteral {
            value: value.clone(),
            encoding: None,
            builtin: None,
        },
    }
}
