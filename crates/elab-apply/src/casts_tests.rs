use elab_base::{EditKind, Span};
use elab_syntax::test_support::ExprBuilder;
use elab_syntax::{CastForm, CheckedCastKind, ExprKind};
use elab_typing::{SolutionBuilder, Type};

use crate::error::ErrorClass;
use crate::test_fixtures::World;

#[test]
fn conditional_cast_that_always_succeeds_becomes_an_injected_coercion() {
    let world = World::new();
    let mut b = ExprBuilder::new();
    let x = b.local("x", world.int());
    b.cols(1, 3, 5);
    let cast = b.cast(x, world.int(), CastForm::Conditional, Type::optional(world.int()));

    let out = world
        .elaborate(cast, &SolutionBuilder::new().build())
        .expect("elaborate");
    insta::assert_snapshot!(world.dump(&out.expr), @r"
    (inject_into_optional implicit type='Int?'
      (cast type='Int' form=as target='Int'
        (decl_ref type='Int' name=x)))
    ");
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].code, "W4101");
    assert_eq!(
        out.diagnostics[0].message,
        "conditional cast from 'Int' to 'Int' always succeeds"
    );
}

#[test]
fn forced_cast_that_always_succeeds_suggests_a_plain_coercion() {
    let world = World::new();
    let mut b = ExprBuilder::new();
    let x = b.local("x", world.int());
    b.cols(1, 3, 5);
    let cast = b.cast(x, world.int(), CastForm::Forced, world.int());

    let out = world
        .elaborate(cast, &SolutionBuilder::new().build())
        .expect("elaborate");
    assert!(matches!(
        out.expr.kind,
        ExprKind::Cast {
            form: CastForm::Coerce,
            ..
        }
    ));
    let warning = &out.diagnostics[0];
    assert_eq!(warning.code, "W4101");
    assert_eq!(warning.edits.len(), 1);
    assert_eq!(warning.edits[0].kind, EditKind::Replace);
    assert_eq!(warning.edits[0].span, Span::new(1, 3, 1, 5));
    assert_eq!(warning.edits[0].text, "as");
}

#[test]
fn is_test_that_always_succeeds_warns() {
    let world = World::new();
    let mut b = ExprBuilder::new();
    let x = b.local("x", world.int());
    let cast = b.cast(x, world.int(), CastForm::Is, world.bool());

    let out = world
        .elaborate(cast, &SolutionBuilder::new().build())
        .expect("elaborate");
    assert!(matches!(
        out.expr.kind,
        ExprKind::Cast {
            form: CastForm::Is,
            classified: Some(CheckedCastKind::Coercion),
            ..
        }
    ));
    assert_eq!(out.diagnostics[0].code, "W4104");
}

#[test]
fn class_downcast_is_a_value_cast() {
    let mut world = World::new();
    let classes = world.add_classes();
    let mut b = ExprBuilder::new();
    let base = b.local("b", Type::lvalue(classes.base.clone()));
    let cast = b.cast(base, classes.derived.clone(), CastForm::Forced, classes.derived.clone());

    let out = world
        .elaborate(cast, &SolutionBuilder::new().build())
        .expect("elaborate");
    insta::assert_snapshot!(world.dump(&out.expr), @r"
    (cast type='Derived' form=as! target='Derived' kind=ValueCast
      (load implicit type='Base'
        (decl_ref type='@lvalue Base' name=b)))
    ");
    assert!(out.diagnostics.is_empty());
}

#[test]
fn collection_downcasts_record_whether_elements_bridge() {
    let mut world = World::new();
    let classes = world.add_classes();
    let mut b = ExprBuilder::new();
    let objects = b.local("objects", world.array_of(classes.base.clone()));
    let derived = world.array_of(classes.derived.clone());
    let object_cast = b.cast(objects, derived.clone(), CastForm::Conditional, Type::optional(derived));
    let values = b.local("values", world.array_of(Type::any()));
    let strings = world.array_of(world.string());
    let value_cast = b.cast(values, strings.clone(), CastForm::Conditional, Type::optional(strings));

    let solution = SolutionBuilder::new().build();
    let objects = world.elaborate(object_cast, &solution).expect("objects");
    let values = world.elaborate(value_cast, &solution).expect("values");
    assert!(matches!(
        objects.expr.kind,
        ExprKind::Cast {
            classified: Some(CheckedCastKind::ArrayDowncast { bridged: false }),
            ..
        }
    ));
    assert!(matches!(
        values.expr.kind,
        ExprKind::Cast {
            classified: Some(CheckedCastKind::ArrayDowncast { bridged: true }),
            ..
        }
    ));
}

#[test]
fn casting_an_existential_to_a_bridgeable_value_bridges() {
    let world = World::new();
    let mut b = ExprBuilder::new();
    let value = b.local("value", Type::any());
    let cast = b.cast(value, world.string(), CastForm::Conditional, Type::optional(world.string()));

    let out = world
        .elaborate(cast, &SolutionBuilder::new().build())
        .expect("elaborate");
    assert!(matches!(
        out.expr.kind,
        ExprKind::Cast {
            classified: Some(CheckedCastKind::BridgeFromForeign),
            ..
        }
    ));
}

#[test]
fn bridging_casts_need_foreign_interop() {
    let mut world = World::new();
    world.options.foreign_interop = false;
    let mut b = ExprBuilder::new();
    let value = b.local("value", Type::any());
    let cast = b.cast(value, world.string(), CastForm::Forced, world.string());

    let failure = world
        .elaborate(cast, &SolutionBuilder::new().build())
        .expect_err("interop disabled");
    assert_eq!(failure.error.class(), ErrorClass::SolverDesync);
    assert_eq!(failure.diagnostics[0].code, "E4001");
}

#[test]
fn cast_between_unrelated_values_is_a_desync() {
    let world = World::new();
    let mut b = ExprBuilder::new();
    let x = b.local("x", world.int());
    let cast = b.cast(x, world.string(), CastForm::Conditional, Type::optional(world.string()));

    let failure = world
        .elaborate(cast, &SolutionBuilder::new().build())
        .expect_err("always fails");
    insta::assert_snapshot!(failure.error.to_string(), @"solver desync: cast from 'Int' to unrelated type 'String' always fails");
}

#[test]
fn forced_downcast_injected_into_an_optional_is_suspicious() {
    let mut world = World::new();
    let classes = world.add_classes();
    let mut b = ExprBuilder::new();
    let dest = b.local("d", Type::lvalue(Type::optional(classes.derived.clone())));
    let base = b.local("b", classes.base.clone());
    b.cols(1, 7, 9);
    let cast = b.cast(base, classes.derived.clone(), CastForm::Forced, classes.derived.clone());
    b.cols(1, 1, 17);
    let assign = b.assign(dest, cast);

    let out = world
        .elaborate(assign, &SolutionBuilder::new().build())
        .expect("elaborate");
    assert_eq!(out.diagnostics.len(), 1);
    let warning = &out.diagnostics[0];
    assert_eq!(warning.code, "W4103");
    assert_eq!(
        warning.message,
        "treating a forced downcast to 'Derived' as optional will never produce 'nil'"
    );
    assert_eq!(warning.edits[0].text, "as?");
    assert_eq!(warning.edits[0].span, Span::new(1, 7, 1, 9));
}

#[test]
fn parenthesized_forced_downcast_is_not_suspicious() {
    let mut world = World::new();
    let classes = world.add_classes();
    let mut b = ExprBuilder::new();
    let dest = b.local("d", Type::lvalue(Type::optional(classes.derived.clone())));
    let base = b.local("b", classes.base.clone());
    let cast = b.cast(base, classes.derived.clone(), CastForm::Forced, classes.derived.clone());
    let paren = b.paren(cast);
    let assign = b.assign(dest, paren);

    let out = world
        .elaborate(assign, &SolutionBuilder::new().build())
        .expect("elaborate");
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
}
