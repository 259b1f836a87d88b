use crate::decls::{
    ArchetypeDecl, ConformanceRef, DeclContext, DeclTable, DefaultArgument, KnownNominal,
    KnownProtocol, NominalDecl, NominalKind, ParamDecl, ValueDecl,
};
use crate::types::Type;

#[test]
fn core_library_numeric_types_conform_to_both_literal_tiers() {
    let table = DeclTable::with_core_library();
    let double = table.known_type(KnownNominal::Double, Vec::new()).expect("Double");
    let float_literal = table
        .known_protocol(KnownProtocol::ExpressibleByFloatLiteral)
        .expect("float literal protocol");
    let builtin_float = table
        .known_protocol(KnownProtocol::BuiltinFloatLiteral)
        .expect("builtin float protocol");

    assert!(matches!(
        table.conforms_to(&double, float_literal),
        Some(ConformanceRef::Concrete(_))
    ));
    assert!(table.conforms_to(&double, builtin_float).is_some());
    assert_eq!(
        table.protocol(float_literal).default_type.as_ref(),
        Some(&double)
    );
}

#[test]
fn witnesses_are_synthesized_per_requirement() {
    let table = DeclTable::with_core_library();
    let int = table.known_type(KnownNominal::Int, Vec::new()).expect("Int");
    let equatable = table.known_protocol(KnownProtocol::Equatable).expect("Equatable");
    let requirement = table.requirement(equatable, "==", None).expect("==");

    let conformance = table.conforms_to(&int, equatable).expect("Int: Equatable");
    let witness = table.witness(conformance, requirement).expect("witness");

    assert_ne!(witness, requirement);
    let decl = table.value(witness);
    assert!(decl.is_operator);
    assert_eq!(table.type_name(&decl.ty), "(Int, Int) -> Bool");
}

#[test]
fn type_witness_substitutes_generic_arguments() {
    let table = DeclTable::with_core_library();
    let string = table.known_type(KnownNominal::String, Vec::new()).expect("String");
    let array = table
        .known_type(KnownNominal::Array, vec![string.clone()])
        .expect("Array");
    let array_literal = table
        .known_protocol(KnownProtocol::ExpressibleByArrayLiteral)
        .expect("array literal protocol");

    let conformance = table.conforms_to(&array, array_literal).expect("conformance");

    assert_eq!(
        table.type_witness(conformance, &array, "Element"),
        Some(string)
    );
}

#[test]
fn bridged_foreign_types_follow_the_bridging_witness() {
    let table = DeclTable::with_core_library();
    let string = table.known_type(KnownNominal::String, Vec::new()).expect("String");
    let ns_string = table.known_type(KnownNominal::NSString, Vec::new()).expect("NSString");
    let ns_object = table.known_type(KnownNominal::NSObject, Vec::new()).expect("NSObject");

    assert_eq!(table.bridged_foreign_type(&string), Some(ns_string.clone()));
    assert!(table.is_subclass_of(&ns_string, &ns_object));
    assert!(table.is_bridgeable_object_type(&ns_object));
    assert!(!table.is_bridgeable_object_type(&string));
}

#[test]
fn subclasses_inherit_conformances() {
    let mut table = DeclTable::with_core_library();
    let ns_object = table.known_nominal(KnownNominal::NSObject).expect("NSObject");
    let mut widget = NominalDecl::new("Widget", NominalKind::Class);
    widget.superclass = Some(Type::nominal(ns_object));
    let widget = table.add_nominal(widget);
    let hashable = table.known_protocol(KnownProtocol::Hashable).expect("Hashable");
    let any_object = table.known_protocol(KnownProtocol::AnyObject).expect("AnyObject");

    assert!(table.conforms_to(&Type::nominal(widget), hashable).is_some());
    assert_eq!(
        table.conforms_to(&Type::nominal(widget), any_object),
        Some(ConformanceRef::Abstract(any_object))
    );
}

#[test]
fn archetype_conformance_follows_refinement() {
    let mut table = DeclTable::with_core_library();
    let hashable = table.known_protocol(KnownProtocol::Hashable).expect("Hashable");
    let equatable = table.known_protocol(KnownProtocol::Equatable).expect("Equatable");
    let mut param = ArchetypeDecl::new("T");
    param.conforms_to.push(hashable);
    let t = table.add_archetype(param);

    assert_eq!(
        table.conforms_to(&Type::Archetype(t), equatable),
        Some(ConformanceRef::Abstract(equatable))
    );
    assert!(!table.is_class_type(&Type::Archetype(t)));
}

#[test]
fn full_names_and_argument_counts() {
    let mut table = DeclTable::with_core_library();
    let int = table.known_type(KnownNominal::Int, Vec::new()).expect("Int");
    let point = table.add_nominal(NominalDecl::new("Point", NominalKind::Struct));
    let method = ValueDecl::func(
        "move",
        DeclContext::Nominal(point),
        vec![
            ParamDecl::new(None, "dx", int.clone()),
            ParamDecl::new(Some("by"), "dy", int.clone())
                .with_default(DefaultArgument::Normal),
        ],
        Type::void(),
    );
    let global = ValueDecl::func("f", DeclContext::TopLevel, Vec::new(), Type::void());
    let property = ValueDecl::var("x", DeclContext::Nominal(point), int);

    assert_eq!(method.full_name(), "move(_:by:)");
    assert_eq!(method.natural_argument_count(), 2);
    assert_eq!(global.natural_argument_count(), 1);
    assert_eq!(property.full_name(), "x");
    assert_eq!(property.natural_argument_count(), 1);
}
