use crate::decls::{
    ArchetypeDecl, Conformance, DeclContext, DeclId, DeclTable, KnownNominal,
    KnownProtocol, NominalDecl, NominalId, NominalKind, ParamDecl, ProtocolId, ValueDecl,
    ValueKind,
};
use crate::types::{FloatKind, SubstitutionMap, TupleElement, Type};

/// Widest builtin integer the library's literal initializers accept.
pub const LIBRARY_MAX_INTEGER_WIDTH: u32 = 2048;
/// Widest builtin float the library's literal initializers accept.
pub const LIBRARY_MAX_FLOAT: FloatKind = FloatKind::Fp80;

impl DeclTable {
    /// A table holding the standard library surface the elaborator relies on:
    /// numeric, string and collection types, the literal protocols in both
    /// tiers, hashing, `AnyObject` and the foreign bridging protocol.
    pub fn with_core_library() -> DeclTable {
        let mut table = DeclTable::new();
        CoreInstaller::new(&mut table).install();
        table
    }
}

struct CoreInstaller<'t> {
    table: &'t mut DeclTable,
}

impl<'t> CoreInstaller<'t> {
    fn new(table: &'t mut DeclTable) -> Self {
        Self { table }
    }

    fn install(mut self) {
        let int = self.nominal("Int", NominalKind::Struct, KnownNominal::Int, &[]);
        let double = self.nominal("Double", NominalKind::Struct, KnownNominal::Double, &[]);
        let float = self.nominal("Float", NominalKind::Struct, KnownNominal::Float, &[]);
        let bool_ = self.nominal("Bool", NominalKind::Struct, KnownNominal::Bool, &[]);
        let string = self.nominal("String", NominalKind::Struct, KnownNominal::String, &[]);
        let character =
            self.nominal("Character", NominalKind::Struct, KnownNominal::Character, &[]);
        let unicode_scalar = self.nominal(
            "UnicodeScalar",
            NominalKind::Struct,
            KnownNominal::UnicodeScalar,
            &[],
        );
        let static_string = self.nominal(
            "StaticString",
            NominalKind::Struct,
            KnownNominal::StaticString,
            &[],
        );
        let array = self.nominal("Array", NominalKind::Struct, KnownNominal::Array, &["Element"]);
        let dictionary = self.nominal(
            "Dictionary",
            NominalKind::Struct,
            KnownNominal::Dictionary,
            &["Key", "Value"],
        );
        let set = self.nominal("Set", NominalKind::Struct, KnownNominal::Set, &["Element"]);
        let any_hashable =
            self.nominal("AnyHashable", NominalKind::Struct, KnownNominal::AnyHashable, &[]);
        self.nominal(
            "UnsafePointer",
            NominalKind::Struct,
            KnownNominal::UnsafePointer,
            &["Pointee"],
        );
        self.nominal(
            "UnsafeMutablePointer",
            NominalKind::Struct,
            KnownNominal::UnsafeMutablePointer,
            &["Pointee"],
        );
        self.nominal(
            "UnsafeRawPointer",
            NominalKind::Struct,
            KnownNominal::UnsafeRawPointer,
            &[],
        );
        let ns_object = self.nominal("NSObject", NominalKind::Class, KnownNominal::NSObject, &[]);
        self.table.nominal_mut(ns_object).foreign = true;
        let ns_string = self.foreign_subclass("NSString", KnownNominal::NSString, ns_object);
        let ns_number = self.foreign_subclass("NSNumber", KnownNominal::NSNumber, ns_object);
        let ns_array = self.foreign_subclass("NSArray", KnownNominal::NSArray, ns_object);
        let ns_dictionary =
            self.foreign_subclass("NSDictionary", KnownNominal::NSDictionary, ns_object);

        let int_ty = Type::nominal(int);
        let bool_ty = Type::nominal(bool_);
        let string_ty = Type::nominal(string);
        let word = Type::Builtin(crate::types::BuiltinType::Word);
        let raw_pointer = Type::Builtin(crate::types::BuiltinType::RawPointer);
        let int1 = Type::builtin_integer(1);

        let any_object = self.protocol("AnyObject", KnownProtocol::AnyObject, &[]);
        self.table.protocol_mut(any_object).class_bound = true;

        let equatable = self.protocol("Equatable", KnownProtocol::Equatable, &[]);
        let equatable_self = self.self_type(equatable);
        let mut equals = ValueDecl::func(
            "==",
            DeclContext::Protocol(equatable),
            vec![
                ParamDecl::new(None, "lhs", equatable_self.clone()),
                ParamDecl::new(None, "rhs", equatable_self),
            ],
            bool_ty.clone(),
        );
        equals.is_static = true;
        equals.is_operator = true;
        self.table.add_value(equals);

        let hashable = self.protocol("Hashable", KnownProtocol::Hashable, &[equatable]);
        self.table.add_value(ValueDecl::var(
            "hashValue",
            DeclContext::Protocol(hashable),
            int_ty.clone(),
        ));

        // Builtin tier: fixed-width payloads only the primitive types accept.
        let builtin_integer = self.builtin_protocol(
            "_ExpressibleByBuiltinIntegerLiteral",
            KnownProtocol::BuiltinIntegerLiteral,
            &[("_builtinIntegerLiteral", Type::builtin_integer(LIBRARY_MAX_INTEGER_WIDTH))],
        );
        let builtin_float = self.builtin_protocol(
            "_ExpressibleByBuiltinFloatLiteral",
            KnownProtocol::BuiltinFloatLiteral,
            &[("_builtinFloatLiteral", Type::builtin_float(LIBRARY_MAX_FLOAT))],
        );
        let builtin_boolean = self.builtin_protocol(
            "_ExpressibleByBuiltinBooleanLiteral",
            KnownProtocol::BuiltinBooleanLiteral,
            &[("_builtinBooleanLiteral", int1.clone())],
        );
        let builtin_unicode_scalar = self.builtin_protocol(
            "_ExpressibleByBuiltinUnicodeScalarLiteral",
            KnownProtocol::BuiltinUnicodeScalarLiteral,
            &[("_builtinUnicodeScalarLiteral", Type::builtin_integer(32))],
        );
        let builtin_grapheme = self.builtin_protocol(
            "_ExpressibleByBuiltinExtendedGraphemeClusterLiteral",
            KnownProtocol::BuiltinExtendedGraphemeClusterLiteral,
            &[
                ("_builtinExtendedGraphemeClusterLiteral", raw_pointer.clone()),
                ("utf8CodeUnitCount", word.clone()),
                ("isASCII", int1.clone()),
            ],
        );
        self.table.protocol_mut(builtin_grapheme).inherits.push(builtin_unicode_scalar);
        let builtin_string = self.builtin_protocol(
            "_ExpressibleByBuiltinStringLiteral",
            KnownProtocol::BuiltinStringLiteral,
            &[
                ("_builtinStringLiteral", raw_pointer.clone()),
                ("utf8CodeUnitCount", word.clone()),
                ("isASCII", int1.clone()),
            ],
        );
        self.table.protocol_mut(builtin_string).inherits.push(builtin_grapheme);
        let builtin_utf16 = self.builtin_protocol(
            "_ExpressibleByBuiltinUTF16StringLiteral",
            KnownProtocol::BuiltinUtf16StringLiteral,
            &[
                ("_builtinUTF16StringLiteral", raw_pointer.clone()),
                ("utf16CodeUnitCount", word.clone()),
            ],
        );
        self.table.protocol_mut(builtin_utf16).inherits.push(builtin_string);
        let builtin_const = self.builtin_protocol(
            "_ExpressibleByBuiltinConstStringLiteral",
            KnownProtocol::BuiltinConstStringLiteral,
            &[("_builtinConstStringLiteral", raw_pointer)],
        );

        // General tier: any type, bottoming out through an associated payload type.
        let integer_literal = self.literal_protocol(
            "ExpressibleByIntegerLiteral",
            KnownProtocol::ExpressibleByIntegerLiteral,
            "IntegerLiteralType",
            "integerLiteral",
            builtin_integer,
            Some(int_ty.clone()),
        );
        let float_literal = self.literal_protocol(
            "ExpressibleByFloatLiteral",
            KnownProtocol::ExpressibleByFloatLiteral,
            "FloatLiteralType",
            "floatLiteral",
            builtin_float,
            Some(Type::nominal(double)),
        );
        let boolean_literal = self.literal_protocol(
            "ExpressibleByBooleanLiteral",
            KnownProtocol::ExpressibleByBooleanLiteral,
            "BooleanLiteralType",
            "booleanLiteral",
            builtin_boolean,
            Some(bool_ty.clone()),
        );
        let unicode_scalar_literal = self.literal_protocol(
            "ExpressibleByUnicodeScalarLiteral",
            KnownProtocol::ExpressibleByUnicodeScalarLiteral,
            "UnicodeScalarLiteralType",
            "unicodeScalarLiteral",
            builtin_unicode_scalar,
            Some(string_ty.clone()),
        );
        let grapheme_literal = self.literal_protocol(
            "ExpressibleByExtendedGraphemeClusterLiteral",
            KnownProtocol::ExpressibleByExtendedGraphemeClusterLiteral,
            "ExtendedGraphemeClusterLiteralType",
            "extendedGraphemeClusterLiteral",
            builtin_grapheme,
            Some(string_ty.clone()),
        );
        self.table
            .protocol_mut(grapheme_literal)
            .inherits
            .push(unicode_scalar_literal);
        let string_literal = self.literal_protocol(
            "ExpressibleByStringLiteral",
            KnownProtocol::ExpressibleByStringLiteral,
            "StringLiteralType",
            "stringLiteral",
            builtin_string,
            Some(string_ty.clone()),
        );
        self.table.protocol_mut(string_literal).inherits.push(grapheme_literal);

        let nil_literal = self.protocol(
            "ExpressibleByNilLiteral",
            KnownProtocol::ExpressibleByNilLiteral,
            &[],
        );
        let nil_self = self.self_type(nil_literal);
        self.table.add_value(ValueDecl::initializer(
            DeclContext::Protocol(nil_literal),
            vec![ParamDecl::new(Some("nilLiteral"), "nilLiteral", Type::void())],
            nil_self,
        ));

        let array_literal = self.protocol(
            "ExpressibleByArrayLiteral",
            KnownProtocol::ExpressibleByArrayLiteral,
            &[],
        );
        let array_literal_element = self.table.add_associated_type(array_literal, "Element");
        let array_literal_self = self.self_type(array_literal);
        self.table.add_value(ValueDecl::initializer(
            DeclContext::Protocol(array_literal),
            vec![
                ParamDecl::new(
                    Some("arrayLiteral"),
                    "elements",
                    Type::Archetype(array_literal_element),
                )
                .variadic(),
            ],
            array_literal_self,
        ));

        let dictionary_literal = self.protocol(
            "ExpressibleByDictionaryLiteral",
            KnownProtocol::ExpressibleByDictionaryLiteral,
            &[],
        );
        let dictionary_key = self.table.add_associated_type(dictionary_literal, "Key");
        let dictionary_value = self.table.add_associated_type(dictionary_literal, "Value");
        let dictionary_literal_self = self.self_type(dictionary_literal);
        self.table.add_value(ValueDecl::initializer(
            DeclContext::Protocol(dictionary_literal),
            vec![
                ParamDecl::new(
                    Some("dictionaryLiteral"),
                    "elements",
                    Type::Tuple(vec![
                        TupleElement::unlabeled(Type::Archetype(dictionary_key)),
                        TupleElement::unlabeled(Type::Archetype(dictionary_value)),
                    ]),
                )
                .variadic(),
            ],
            dictionary_literal_self,
        ));

        let bridgeable = self.protocol("_ForeignBridgeable", KnownProtocol::ForeignBridgeable, &[]);
        let foreign_type = self.table.add_associated_type(bridgeable, "_ForeignType");
        self.table.add_value(ValueDecl::func(
            "_bridgeToForeign",
            DeclContext::Protocol(bridgeable),
            Vec::new(),
            Type::Archetype(foreign_type),
        ));

        let ns_number_ty = Type::nominal(ns_number);
        let numeric_literals: [(NominalId, &[(ProtocolId, &str, Type)]); 3] = [
            (
                int,
                &[(integer_literal, "IntegerLiteralType", int_ty.clone())],
            ),
            (
                double,
                &[
                    (integer_literal, "IntegerLiteralType", int_ty.clone()),
                    (float_literal, "FloatLiteralType", Type::nominal(double)),
                ],
            ),
            (
                float,
                &[
                    (integer_literal, "IntegerLiteralType", int_ty.clone()),
                    (float_literal, "FloatLiteralType", Type::nominal(float)),
                ],
            ),
        ];
        for (nominal, literals) in numeric_literals {
            self.conform(nominal, equatable, &[]);
            self.conform(nominal, hashable, &[]);
            self.conform(nominal, builtin_integer, &[]);
            if nominal != int {
                self.conform(nominal, builtin_float, &[]);
            }
            for (protocol, assoc, ty) in literals {
                self.conform(nominal, *protocol, &[(*assoc, ty.clone())]);
            }
            self.conform(nominal, bridgeable, &[("_ForeignType", ns_number_ty.clone())]);
        }

        self.conform(bool_, equatable, &[]);
        self.conform(bool_, hashable, &[]);
        self.conform(bool_, builtin_boolean, &[]);
        self.conform(bool_, boolean_literal, &[("BooleanLiteralType", bool_ty.clone())]);
        self.conform(bool_, bridgeable, &[("_ForeignType", ns_number_ty)]);

        self.conform(string, equatable, &[]);
        self.conform(string, hashable, &[]);
        self.conform(string, builtin_unicode_scalar, &[]);
        self.conform(string, builtin_grapheme, &[]);
        self.conform(string, builtin_string, &[]);
        self.conform(string, builtin_utf16, &[]);
        self.conform(string, unicode_scalar_literal, &[("UnicodeScalarLiteralType", string_ty.clone())]);
        self.conform(
            string,
            grapheme_literal,
            &[("ExtendedGraphemeClusterLiteralType", string_ty.clone())],
        );
        self.conform(string, string_literal, &[("StringLiteralType", string_ty.clone())]);
        self.conform(string, bridgeable, &[("_ForeignType", Type::nominal(ns_string))]);

        let character_ty = Type::nominal(character);
        self.conform(character, equatable, &[]);
        self.conform(character, hashable, &[]);
        self.conform(character, builtin_unicode_scalar, &[]);
        self.conform(character, builtin_grapheme, &[]);
        self.conform(character, unicode_scalar_literal, &[("UnicodeScalarLiteralType", character_ty.clone())]);
        self.conform(
            character,
            grapheme_literal,
            &[("ExtendedGraphemeClusterLiteralType", character_ty)],
        );

        let unicode_scalar_ty = Type::nominal(unicode_scalar);
        self.conform(unicode_scalar, equatable, &[]);
        self.conform(unicode_scalar, hashable, &[]);
        self.conform(unicode_scalar, builtin_unicode_scalar, &[]);
        self.conform(
            unicode_scalar,
            unicode_scalar_literal,
            &[("UnicodeScalarLiteralType", unicode_scalar_ty)],
        );

        let static_string_ty = Type::nominal(static_string);
        self.conform(static_string, builtin_unicode_scalar, &[]);
        self.conform(static_string, builtin_grapheme, &[]);
        self.conform(static_string, builtin_string, &[]);
        self.conform(static_string, builtin_const, &[]);
        self.conform(static_string, string_literal, &[("StringLiteralType", static_string_ty)]);

        let array_element = Type::Archetype(self.table.nominal(array).generic_params[0]);
        self.conform(array, array_literal, &[("Element", array_element)]);
        self.conform(array, bridgeable, &[("_ForeignType", Type::nominal(ns_array))]);

        let set_element = Type::Archetype(self.table.nominal(set).generic_params[0]);
        self.conform(set, array_literal, &[("Element", set_element)]);

        let dictionary_params = self.table.nominal(dictionary).generic_params.clone();
        self.conform(
            dictionary,
            dictionary_literal,
            &[
                ("Key", Type::Archetype(dictionary_params[0])),
                ("Value", Type::Archetype(dictionary_params[1])),
            ],
        );
        self.conform(
            dictionary,
            bridgeable,
            &[("_ForeignType", Type::nominal(ns_dictionary))],
        );

        self.conform(any_hashable, equatable, &[]);
        self.conform(any_hashable, hashable, &[]);
        self.conform(ns_object, equatable, &[]);
        self.conform(ns_object, hashable, &[]);
    }

    fn nominal(
        &mut self,
        name: &str,
        kind: NominalKind,
        known: KnownNominal,
        generic_params: &[&str],
    ) -> NominalId {
        let mut decl = NominalDecl::new(name, kind);
        decl.known = Some(known);
        decl.generic_params = generic_params
            .iter()
            .map(|param| self.table.add_archetype(ArchetypeDecl::new(param)))
            .collect();
        self.table.add_nominal(decl)
    }

    fn foreign_subclass(&mut self, name: &str, known: KnownNominal, superclass: NominalId) -> NominalId {
        let id = self.nominal(name, NominalKind::Class, known, &[]);
        let decl = self.table.nominal_mut(id);
        decl.foreign = true;
        decl.superclass = Some(Type::nominal(superclass));
        id
    }

    fn protocol(&mut self, name: &str, known: KnownProtocol, inherits: &[ProtocolId]) -> ProtocolId {
        let id = self.table.declare_protocol(name, inherits.to_vec());
        self.table.protocol_mut(id).known = Some(known);
        id
    }

    fn self_type(&self, protocol: ProtocolId) -> Type {
        Type::Archetype(self.table.protocol(protocol).self_param)
    }

    fn builtin_protocol(
        &mut self,
        name: &str,
        known: KnownProtocol,
        params: &[(&str, Type)],
    ) -> ProtocolId {
        let id = self.protocol(name, known, &[]);
        let params = params
            .iter()
            .map(|(label, ty)| ParamDecl::new(Some(*label), label, ty.clone()))
            .collect();
        let self_ty = self.self_type(id);
        self.table
            .add_value(ValueDecl::initializer(DeclContext::Protocol(id), params, self_ty));
        id
    }

    fn literal_protocol(
        &mut self,
        name: &str,
        known: KnownProtocol,
        payload: &str,
        label: &str,
        builtin: ProtocolId,
        default_type: Option<Type>,
    ) -> ProtocolId {
        let id = self.protocol(name, known, &[]);
        let payload_archetype = self.table.add_associated_type(id, payload);
        self.table
            .archetype_mut(payload_archetype)
            .conforms_to
            .push(builtin);
        self.table.protocol_mut(id).default_type = default_type;
        let self_ty = self.self_type(id);
        self.table.add_value(ValueDecl::initializer(
            DeclContext::Protocol(id),
            vec![ParamDecl::new(Some(label), "value", Type::Archetype(payload_archetype))],
            self_ty,
        ));
        id
    }

    /// Records that `nominal` conforms to `protocol`, synthesizing one witness
    /// per requirement with `Self` and associated types bound.
    fn conform(&mut self, nominal: NominalId, protocol: ProtocolId, type_witnesses: &[(&str, Type)]) {
        let decl = self.table.nominal(nominal);
        let nominal_ty = Type::Nominal {
            decl: nominal,
            args: decl.generic_params.iter().map(|id| Type::Archetype(*id)).collect(),
        };
        let protocol_decl = self.table.protocol(protocol).clone();
        let mut subst = SubstitutionMap::new();
        subst.insert(protocol_decl.self_param, nominal_ty);
        for assoc in &protocol_decl.associated_types {
            if let Some((_, ty)) = type_witnesses.iter().find(|(name, _)| *name == assoc.name) {
                subst.insert(assoc.archetype, ty.clone());
            }
        }
        let mut witnesses: Vec<(DeclId, DeclId)> = Vec::new();
        for requirement in &protocol_decl.requirements {
            let mut witness = self.table.value(*requirement).clone();
            witness.context = DeclContext::Nominal(nominal);
            witness.ty = witness.ty.subst(&subst);
            for param in &mut witness.params {
                param.ty = param.ty.subst(&subst);
            }
            if witness.kind == ValueKind::Initializer {
                witness.is_required = true;
            }
            witnesses.push((*requirement, self.table.add_value(witness)));
        }
        self.table.add_conformance(Conformance {
            nominal,
            protocol,
            witnesses,
            type_witnesses: type_witnesses
                .iter()
                .map(|(name, ty)| (name.to_string(), ty.clone()))
                .collect(),
        });
    }
}
