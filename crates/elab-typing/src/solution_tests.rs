use elab_base::ExprId;

use crate::decls::{DeclId, DeclTable, KnownNominal};
use crate::locator::{Locator, PathElement};
use crate::solution::{
    ConversionRestrictionKind, FixKind, OverloadChoice, Solution, SolutionBuilder,
    UnboundTypeVariable,
};
use crate::types::{Type, TypeVarId};

fn int(table: &DeclTable) -> Type {
    table.known_type(KnownNominal::Int, Vec::new()).expect("Int")
}

#[test]
fn simplify_type_follows_binding_chains() {
    let table = DeclTable::with_core_library();
    let solution = SolutionBuilder::new()
        .bind(TypeVarId(0), Type::optional(Type::Var(TypeVarId(1))))
        .bind(TypeVarId(1), int(&table))
        .build();

    let simplified = solution
        .simplify_type(&Type::lvalue(Type::Var(TypeVarId(0))))
        .expect("bound");

    assert_eq!(simplified, Type::lvalue(Type::optional(int(&table))));
    assert_eq!(solution.fixed_type(TypeVarId(1)), Some(&int(&table)));
}

#[test]
fn simplify_type_reports_unbound_variables() {
    let solution = SolutionBuilder::new()
        .bind(TypeVarId(0), Type::Var(TypeVarId(7)))
        .build();

    assert_eq!(
        solution.simplify_type(&Type::Var(TypeVarId(0))),
        Err(UnboundTypeVariable(TypeVarId(7)))
    );
}

#[test]
fn simplify_type_stops_on_cyclic_bindings() {
    let solution = SolutionBuilder::new()
        .bind(TypeVarId(0), Type::optional(Type::Var(TypeVarId(0))))
        .build();

    assert!(solution.simplify_type(&Type::Var(TypeVarId(0))).is_err());
}

#[test]
fn lookups_are_keyed_by_full_locator() {
    let table = DeclTable::with_core_library();
    let anchor = Locator::new(ExprId(4));
    let member = anchor.with(PathElement::Member);
    let solution = SolutionBuilder::new()
        .overload(
            member.clone(),
            OverloadChoice::TupleIndex {
                base: Type::void(),
                index: 1,
            },
        )
        .restriction(
            int(&table),
            Type::optional(int(&table)),
            ConversionRestrictionKind::ValueToOptional,
        )
        .build();

    assert!(solution.overload_choice(&anchor).is_none());
    assert!(matches!(
        solution.overload_choice(&member),
        Some(OverloadChoice::TupleIndex { index: 1, .. })
    ));
    assert_eq!(
        solution.conversion_restriction(&int(&table), &Type::optional(int(&table))),
        Some(ConversionRestrictionKind::ValueToOptional)
    );
    assert_eq!(
        solution.conversion_restriction(&Type::optional(int(&table)), &int(&table)),
        None
    );
}

#[test]
fn solutions_round_trip_through_json_entry_lists() {
    let table = DeclTable::with_core_library();
    let locator = Locator::new(ExprId(2)).with(PathElement::ApplyArgToParam { arg: 0, param: 1 });
    let solution = SolutionBuilder::new()
        .bind(TypeVarId(0), int(&table))
        .overload(
            Locator::new(ExprId(1)),
            OverloadChoice::Declaration {
                decl: DeclId(3),
                base: None,
                ref_kind: Default::default(),
            },
        )
        .restriction(
            int(&table),
            Type::any(),
            ConversionRestrictionKind::Existential,
        )
        .fix(FixKind::AddressOf, locator.clone())
        .build();

    let json = serde_json::to_string(&solution).expect("serialize");
    let decoded: Solution = serde_json::from_str(&json).expect("deserialize");

    assert_eq!(decoded.fixed_type(TypeVarId(0)), Some(&int(&table)));
    assert!(decoded.overload_choice(&Locator::new(ExprId(1))).is_some());
    assert_eq!(
        decoded.conversion_restriction(&int(&table), &Type::any()),
        Some(ConversionRestrictionKind::Existential)
    );
    assert_eq!(decoded.fixes().len(), 1);
    assert_eq!(decoded.fixes()[0].locator, locator);
}

#[test]
fn missing_sections_deserialize_as_empty() {
    let solution: Solution = serde_json::from_str("{}").expect("empty solution");

    assert!(solution.fixes().is_empty());
    assert!(solution.fixed_type(TypeVarId(0)).is_none());
}

#[test]
fn restriction_names_are_kebab_case() {
    assert_eq!(ConversionRestrictionKind::ArrayUpcast.name(), "array-upcast");
    assert!(ConversionRestrictionKind::SetUpcast.is_collection_upcast());
    assert!(!ConversionRestrictionKind::Superclass.is_collection_upcast());
}
