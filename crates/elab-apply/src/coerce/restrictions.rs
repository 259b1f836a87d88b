use elab_base::Span;
use elab_syntax::{ConversionPair, Expr, ExprKind, PointerConversionKind};
use elab_typing::{
    ConversionRestrictionKind, KnownProtocol, Locator, OptionalKind, PathElement, Type,
};

use crate::engine::Elaborator;
use crate::error::{Result, desync};

pub(crate) type Handler = fn(&mut Elaborator<'_>, Expr, &Type, &Locator) -> Result<Expr>;

pub(crate) fn handler_for(kind: ConversionRestrictionKind) -> Handler {
    use ConversionRestrictionKind as Kind;
    match kind {
        Kind::TupleToTuple => tuple_to_tuple,
        Kind::ScalarToTuple => scalar_to_tuple,
        Kind::TupleToScalar => tuple_to_scalar,
        Kind::DeepEquality => deep_equality,
        Kind::Superclass => superclass,
        Kind::LValueToRValue => lvalue_to_rvalue,
        Kind::Existential | Kind::MetatypeToExistentialMetatype => existential,
        Kind::ClassMetatypeToAnyObject => class_metatype_to_object,
        Kind::ExistentialMetatypeToAnyObject => existential_metatype_to_object,
        Kind::ProtocolMetatypeToProtocolClass => protocol_metatype_to_object,
        Kind::ValueToOptional => value_to_optional,
        Kind::OptionalToOptional
        | Kind::OptionalToImplicitlyUnwrapped
        | Kind::ImplicitlyUnwrappedToOptional => optional_to_optional,
        Kind::ForceUnchecked => force_unchecked,
        Kind::ArrayUpcast | Kind::DictionaryUpcast | Kind::SetUpcast => collection_upcast,
        Kind::HashableToAnyHashable => hashable_to_any_hashable,
        Kind::InoutToPointer => inout_to_pointer,
        Kind::ArrayToPointer => array_to_pointer,
        Kind::StringToPointer => string_to_pointer,
        Kind::PointerToPointer => pointer_to_pointer,
        Kind::BridgeToForeign => bridge_to_foreign,
        Kind::BridgeFromForeign => bridge_from_foreign,
        Kind::ForeignToNativeTollFree | Kind::NativeToForeignTollFree => toll_free,
    }
}

fn tuple_to_tuple(el: &mut Elaborator<'_>, expr: Expr, to: &Type, locator: &Locator) -> Result<Expr> {
    el.tuple_to_tuple(expr, to, locator)
}

fn scalar_to_tuple(el: &mut Elaborator<'_>, expr: Expr, to: &Type, locator: &Locator) -> Result<Expr> {
    let expr = el.load(expr);
    el.scalar_to_tuple(expr, to, locator)
}

fn tuple_to_scalar(el: &mut Elaborator<'_>, expr: Expr, to: &Type, locator: &Locator) -> Result<Expr> {
    let projected = el.project_element(expr, 0)?;
    el.coerce(projected, to, locator)
}

fn deep_equality(el: &mut Elaborator<'_>, expr: Expr, to: &Type, _: &Locator) -> Result<Expr> {
    let expr = el.load(expr);
    Ok(expr.with_type(to.clone()))
}

fn superclass(el: &mut Elaborator<'_>, expr: Expr, to: &Type, _: &Locator) -> Result<Expr> {
    let expr = el.load(expr);
    Ok(el.upcast(expr, to))
}

fn lvalue_to_rvalue(el: &mut Elaborator<'_>, expr: Expr, to: &Type, locator: &Locator) -> Result<Expr> {
    if !expr.ty.is_lvalue() {
        return Err(desync(
            expr.span,
            format!("lvalue-to-rvalue restriction on rvalue '{}'", el.type_name(&expr.ty)),
        ));
    }
    let loaded = el.load(expr);
    el.coerce(loaded, to, locator)
}

fn existential(el: &mut Elaborator<'_>, expr: Expr, to: &Type, _: &Locator) -> Result<Expr> {
    let expr = el.load(expr);
    el.erase(expr, to)
}

fn class_metatype_to_object(el: &mut Elaborator<'_>, expr: Expr, to: &Type, _: &Locator) -> Result<Expr> {
    let expr = el.load(expr);
    Ok(el.wrap(expr, to.clone(), |sub| ExprKind::ClassMetatypeToObject { sub }))
}

fn existential_metatype_to_object(
    el: &mut Elaborator<'_>,
    expr: Expr,
    to: &Type,
    _: &Locator,
) -> Result<Expr> {
    let expr = el.load(expr);
    Ok(el.wrap(expr, to.clone(), |sub| ExprKind::ExistentialMetatypeToObject { sub }))
}

fn protocol_metatype_to_object(el: &mut Elaborator<'_>, expr: Expr, to: &Type, _: &Locator) -> Result<Expr> {
    let expr = el.load(expr);
    Ok(el.wrap(expr, to.clone(), |sub| ExprKind::ProtocolMetatypeToObject { sub }))
}

fn value_to_optional(el: &mut Elaborator<'_>, expr: Expr, to: &Type, locator: &Locator) -> Result<Expr> {
    let expr = el.load(expr);
    el.value_to_optional(expr, to, locator)
}

fn optional_to_optional(el: &mut Elaborator<'_>, expr: Expr, to: &Type, locator: &Locator) -> Result<Expr> {
    let expr = el.load(expr);
    el.optional_to_optional(expr, to, locator)
}

fn force_unchecked(el: &mut Elaborator<'_>, expr: Expr, to: &Type, locator: &Locator) -> Result<Expr> {
    let expr = el.load(expr);
    let Some((_, object)) = expr.ty.optional_object() else {
        return Err(desync(
            expr.span,
            format!("cannot force non-optional '{}'", el.type_name(&expr.ty)),
        ));
    };
    let object = object.clone();
    let forced = el.wrap(expr, object, |sub| ExprKind::ForceValue { sub });
    el.coerce(forced, to, locator)
}

fn collection_upcast(el: &mut Elaborator<'_>, expr: Expr, to: &Type, locator: &Locator) -> Result<Expr> {
    let mut expr = el.load(expr);
    if let Some((OptionalKind::ImplicitlyUnwrapped, object)) = expr.ty.optional_object() {
        let object = object.clone();
        expr = el.wrap(expr, object, |sub| ExprKind::ForceValue { sub });
    }
    let decls = el.decls;
    let span = expr.span;
    let (key_conversion, value_conversion, bridged) = match (
        decls.dictionary_key_value(&expr.ty),
        decls.dictionary_key_value(to),
    ) {
        (Some((from_key, from_value)), Some((to_key, to_value))) => {
            let key = el.conversion_pair(&from_key, &to_key, &locator.with(PathElement::GenericArgument(0)), span)?;
            let value = el.conversion_pair(
                &from_value,
                &to_value,
                &locator.with(PathElement::GenericArgument(1)),
                span,
            )?;
            let bridged = !decls.is_bridgeable_object_type(&from_key)
                || !decls.is_bridgeable_object_type(&from_value);
            (Some(key), value, bridged)
        }
        _ => {
            let elements = decls
                .array_element(&expr.ty)
                .zip(decls.array_element(to))
                .or_else(|| decls.set_element(&expr.ty).zip(decls.set_element(to)));
            let Some((from, target)) = elements else {
                return Err(desync(
                    span,
                    format!(
                        "collection upcast from '{}' to '{}'",
                        el.type_name(&expr.ty),
                        el.type_name(to)
                    ),
                ));
            };
            let value = el.conversion_pair(&from, &target, &locator.with(PathElement::GenericArgument(0)), span)?;
            (None, value, !decls.is_bridgeable_object_type(&from))
        }
    };
    Ok(el.implicit(
        span,
        to.clone(),
        ExprKind::CollectionUpcast {
            sub: Box::new(expr),
            key_conversion,
            value_conversion,
            bridged,
        },
    ))
}

fn hashable_to_any_hashable(el: &mut Elaborator<'_>, expr: Expr, to: &Type, _: &Locator) -> Result<Expr> {
    let expr = el.load(expr);
    let Some(hashable) = el.decls.known_protocol(KnownProtocol::Hashable) else {
        return Err(desync(expr.span, "no Hashable protocol is declared"));
    };
    let conformance = el.require_conformance(&expr.ty, hashable, expr.span)?;
    let span = expr.span;
    Ok(el.implicit(
        span,
        to.clone(),
        ExprKind::AnyHashableErasure {
            sub: Box::new(expr),
            conformance,
        },
    ))
}

fn inout_to_pointer(el: &mut Elaborator<'_>, expr: Expr, to: &Type, _: &Locator) -> Result<Expr> {
    Ok(pointer_argument(el, expr, to, PointerConversionKind::InoutToPointer))
}

fn array_to_pointer(el: &mut Elaborator<'_>, expr: Expr, to: &Type, _: &Locator) -> Result<Expr> {
    let expr = el.load(expr);
    Ok(pointer_argument(el, expr, to, PointerConversionKind::ArrayToPointer))
}

fn string_to_pointer(el: &mut Elaborator<'_>, expr: Expr, to: &Type, _: &Locator) -> Result<Expr> {
    let expr = el.load(expr);
    Ok(pointer_argument(el, expr, to, PointerConversionKind::StringToPointer))
}

/// Converts to the pointer type, re-injecting into an optional pointer target.
fn pointer_argument(
    el: &mut Elaborator<'_>,
    expr: Expr,
    to: &Type,
    conversion: PointerConversionKind,
) -> Expr {
    let Some((_, object)) = to.optional_object() else {
        return convert_pointer(el, expr, to.clone(), conversion);
    };
    let object = object.clone();
    let converted = convert_pointer(el, expr, object, conversion);
    el.inject(converted, to)
}

fn convert_pointer(el: &mut Elaborator<'_>, expr: Expr, ty: Type, conversion: PointerConversionKind) -> Expr {
    let span = expr.span;
    el.implicit(
        span,
        ty,
        ExprKind::PointerConversion {
            sub: Box::new(expr),
            conversion,
        },
    )
}

fn pointer_to_pointer(el: &mut Elaborator<'_>, expr: Expr, to: &Type, _: &Locator) -> Result<Expr> {
    let expr = el.load(expr);
    let Some((_, source_object)) = expr.ty.optional_object() else {
        return Ok(pointer_argument(el, expr, to, PointerConversionKind::PointerToPointer));
    };
    let source_object = source_object.clone();
    let Some((_, target_object)) = to.optional_object() else {
        return Err(desync(
            expr.span,
            format!(
                "optional pointer '{}' converted to non-optional '{}'",
                el.type_name(&expr.ty),
                el.type_name(to)
            ),
        ));
    };
    let target_object = target_object.clone();
    let span = expr.span;
    let bound = el.implicit(
        span,
        source_object,
        ExprKind::BindOptional {
            sub: Box::new(expr),
            depth: 0,
        },
    );
    let converted = convert_pointer(el, bound, target_object, PointerConversionKind::PointerToPointer);
    let injected = el.inject(converted, to);
    Ok(el.wrap(injected, to.clone(), |sub| ExprKind::OptionalEvaluation { sub }))
}

fn bridge_to_foreign(el: &mut Elaborator<'_>, expr: Expr, to: &Type, locator: &Locator) -> Result<Expr> {
    require_interop(el, &expr, to)?;
    let expr = el.load(expr);
    let Some(bridgeable) = el.decls.known_protocol(KnownProtocol::ForeignBridgeable) else {
        return Err(desync(expr.span, "no foreign bridging protocol is declared"));
    };
    let conformance = el.require_conformance(&expr.ty, bridgeable, expr.span)?;
    let Some(foreign) = el.decls.type_witness(conformance, &expr.ty, "_ForeignType") else {
        return Err(desync(
            expr.span,
            format!("'{}' names no foreign type to bridge to", el.type_name(&expr.ty)),
        ));
    };
    let bridged = el.wrap(expr, foreign, |sub| ExprKind::BridgeToForeign { sub });
    el.coerce(bridged, to, locator)
}

fn bridge_from_foreign(el: &mut Elaborator<'_>, expr: Expr, to: &Type, _: &Locator) -> Result<Expr> {
    require_interop(el, &expr, to)?;
    let expr = el.load(expr);
    Ok(el.wrap(expr, to.clone(), |sub| ExprKind::BridgeFromForeign { sub }))
}

fn toll_free(el: &mut Elaborator<'_>, expr: Expr, to: &Type, _: &Locator) -> Result<Expr> {
    let expr = el.load(expr);
    Ok(el.wrap(expr, to.clone(), |sub| ExprKind::ForeignObjectConversion { sub }))
}

pub(crate) fn require_interop(el: &Elaborator<'_>, expr: &Expr, to: &Type) -> Result<()> {
    if el.options.foreign_interop {
        return Ok(());
    }
    Err(desync(
        expr.span,
        format!(
            "bridging '{}' to '{}' with foreign interop disabled",
            el.type_name(&expr.ty),
            el.type_name(to)
        ),
    ))
}

impl Elaborator<'_> {
    /// An opaque placeholder for one source element and its conversion to the target element.
    fn conversion_pair(&mut self, from: &Type, to: &Type, locator: &Locator, span: Span) -> Result<ConversionPair> {
        let placeholder = self.fresh_opaque();
        let opaque = self.implicit(span, from.clone(), ExprKind::OpaqueValue { opaque: placeholder });
        let conversion = self.coerce(opaque, to, locator)?;
        Ok(ConversionPair {
            placeholder,
            conversion: Box::new(conversion),
        })
    }
}
