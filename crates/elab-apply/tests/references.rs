
use elab_apply::{ElaborationContext, ElaborationError, ElaborationRequest, ErrorClass, elaborate};
use elab_base::ExprId;
use elab_syntax::test_support::ExprBuilder;
use elab_syntax::{AccessSemantics, ExprKind, KeyPathComponent, ShuffleSource};
use elab_typing::{
    Conformance, DeclContext, DefaultArgument, KnownNominal, KnownProtocol, LiteralValue, Locator,
    NominalDecl, NominalKind, OverloadChoice, ParamDecl, PathElement, SolutionBuilder, SubstitutionMap, Type,
    ValueDecl,
};

use test_support::Fixture;

#[test]
fn operator_requirement_on_a_concrete_type_calls_its_witness() {
    let mut fixture = Fixture::new();
    let boolean = fixture.ty(KnownNominal::Bool);
    let equatable = fixture.decls.known_protocol(KnownProtocol::Equatable).expect("Equatable");
    let requirement = fixture.decls.requirement(equatable, "==", None).expect("==");
    let point = fixture.decls.add_nominal(NominalDecl::new("Point", NominalKind::Struct));
    let point_ty = Type::nominal(point);
    let mut witness = ValueDecl::func(
        "==",
        DeclContext::Nominal(point),
        vec![
            ParamDecl::new(None, "lhs", point_ty.clone()),
            ParamDecl::new(None, "rhs", point_ty.clone()),
        ],
        boolean.clone(),
    );
    witness.is_static = true;
    witness.is_operator = true;
    let witness = fixture.decls.add_value(witness);
    fixture.decls.add_conformance(Conformance {
        nominal: point,
        protocol: equatable,
        witnesses: vec![(requirement, witness)],
        type_witnesses: Vec::new(),
    });
    let self_param = fixture.decls.protocol(equatable).self_param;

    let mut b = ExprBuilder::new();
    let op_ty = Type::function(
        vec![
            ParamDecl::new(None, "lhs", point_ty.clone()).function_param(),
            ParamDecl::new(None, "rhs", point_ty.clone()).function_param(),
        ],
        boolean,
    );
    let reference = b.decl_ref("==", requirement, op_ty);
    let solution = SolutionBuilder::new()
        .opened_types(
            Locator::new(ExprId(1)),
            SubstitutionMap::from_pairs([(self_param, point_ty)]),
        )
        .build();

    let out = fixture.run(reference, &solution).expect("elaborate");
    assert!(matches!(out.expr.kind, ExprKind::DeclRef { decl: Some(decl), .. } if decl == witness));
}

#[test]
fn operator_requirement_on_a_generic_argument_stays_abstract() {
    let mut fixture = Fixture::new();
    let boolean = fixture.ty(KnownNominal::Bool);
    let equatable = fixture.decls.known_protocol(KnownProtocol::Equatable).expect("Equatable");
    let requirement = fixture.decls.requirement(equatable, "==", None).expect("==");
    let self_param = fixture.decls.protocol(equatable).self_param;
    let element = fixture.array_of(fixture.int());

    let mut b = ExprBuilder::new();
    let op_ty = Type::function(Vec::new(), boolean);
    let reference = b.decl_ref("==", requirement, op_ty);
    let solution = SolutionBuilder::new()
        .opened_types(Locator::new(ExprId(1)), SubstitutionMap::from_pairs([(self_param, element)]))
        .build();

    let out = fixture.run(reference, &solution).expect("elaborate");
    assert!(matches!(out.expr.kind, ExprKind::DeclRef { decl: Some(decl), .. } if decl == requirement));
}

fn counter(fixture: &mut Fixture) -> (Type, elab_typing::DeclId, elab_typing::DeclId) {
    let int = fixture.int();
    let nominal = fixture.decls.add_nominal(NominalDecl::new("Counter", NominalKind::Struct));
    let ty = Type::nominal(nominal);
    let count = fixture
        .decls
        .add_value(ValueDecl::var("count", DeclContext::Nominal(nominal), int));
    let init = fixture.decls.add_value(ValueDecl::initializer(
        DeclContext::Nominal(nominal),
        Vec::new(),
        ty.clone(),
    ));
    (ty, count, init)
}

fn self_count(fixture: &Fixture, ty: Type, count: elab_typing::DeclId) -> (elab_syntax::Expr, SolutionBuilder) {
    let mut b = ExprBuilder::new();
    let this = b.local("self", ty.clone());
    let access = b.dot(this, "count", fixture.int());
    let solution = SolutionBuilder::new().overload(
        Locator::new(ExprId(2)).with(PathElement::Member),
        OverloadChoice::Declaration {
            decl: count,
            base: Some(ty),
            ref_kind: elab_typing::FunctionRefKind::Unapplied,
        },
    );
    (access, solution)
}

#[test]
fn stored_property_of_self_inside_its_initializer_is_direct_to_storage() {
    let mut fixture = Fixture::new();
    let (ty, count, init) = counter(&mut fixture);
    let (access, solution) = self_count(&fixture, ty, count);

    let out = elaborate(ElaborationRequest {
        expr: access,
        decls: &fixture.decls,
        solution: &solution.build(),
        options: &fixture.options,
        context: ElaborationContext {
            enclosing_decl: Some(init),
            function_name: "init()".to_string(),
        },
    })
    .expect("elaborate");
    assert!(matches!(
        out.expr.kind,
        ExprKind::MemberRef {
            semantics: AccessSemantics::DirectToStorage,
            ..
        }
    ));
}

#[test]
fn stored_property_of_self_elsewhere_goes_through_accessors() {
    let mut fixture = Fixture::new();
    let (ty, count, _) = counter(&mut fixture);
    let (access, solution) = self_count(&fixture, ty, count);

    let out = fixture.run(access, &solution.build()).expect("elaborate");
    assert!(matches!(
        out.expr.kind,
        ExprKind::MemberRef {
            semantics: AccessSemantics::Ordinary,
            ..
        }
    ));
}

#[test]
fn dynamic_lookup_yields_an_implicitly_unwrapped_result() {
    let mut fixture = Fixture::new();
    let int = fixture.int();
    let (class, _) = fixture.class_with_init("Widget");
    let Type::Nominal { decl: widget, .. } = class else {
        panic!("nominal");
    };
    let mut size = ValueDecl::var("size", DeclContext::Nominal(widget), int.clone());
    size.dynamic_lookup = true;
    let size = fixture.decls.add_value(size);
    let any_object = fixture.decls.known_protocol(KnownProtocol::AnyObject).expect("AnyObject");
    let object_ty = Type::Existential(vec![any_object]);

    let mut b = ExprBuilder::new();
    let object = b.local("object", object_ty.clone());
    let access = b.dot(object, "size", int.clone());
    let solution = SolutionBuilder::new()
        .overload(
            Locator::new(ExprId(2)).with(PathElement::Member),
            OverloadChoice::DeclViaDynamic {
                decl: size,
                base: object_ty,
            },
        )
        .build();

    let out = fixture.run(access, &solution).expect("elaborate");
    assert!(matches!(out.expr.kind, ExprKind::DynamicMemberRef { decl, .. } if decl == size));
    assert_eq!(out.expr.ty, Type::implicitly_unwrapped(int));
    insta::assert_snapshot!(fixture.dump(&out.expr), @r"
    (dynamic_member_ref type='Int!' decl=size
      (decl_ref type='AnyObject' name=object))
    ");
}

#[test]
fn key_path_subscript_indices_must_be_hashable() {
    let mut fixture = Fixture::new();
    let int = fixture.int();
    let token = fixture.decls.add_nominal(NominalDecl::new("Token", NominalKind::Struct));
    let token_ty = Type::nominal(token);
    let root = fixture.array_of(int.clone());

    let key_path = |index_ty: Type| {
        let mut b = ExprBuilder::new();
        let index = b.local("i", index_ty);
        b.node(
            Type::any(),
            ExprKind::KeyPath {
                root: root.clone(),
                components: vec![KeyPathComponent {
                    decl: None,
                    index: Some(index),
                    index_conformances: Vec::new(),
                    ty: int.clone(),
                }],
            },
        )
    };

    let out = fixture
        .run(key_path(fixture.int()), &SolutionBuilder::new().build())
        .expect("Int is hashable");
    let ExprKind::KeyPath { components, .. } = &out.expr.kind else {
        panic!("expected a key path");
    };
    assert_eq!(components[0].index_conformances.len(), 1);

    let failure = fixture
        .run(key_path(token_ty), &SolutionBuilder::new().build())
        .expect_err("Token is not hashable");
    assert_eq!(failure.error.class(), ErrorClass::ConformanceMissing);
    insta::assert_snapshot!(failure.error.to_string(), @"type 'Token' does not conform to 'Hashable'");
    assert_eq!(failure.diagnostics.last().map(|d| d.code.as_str()), Some("E4003"));
}

#[test]
fn optional_chain_without_a_bind_warns_and_injects() {
    let fixture = Fixture::new();
    let int = fixture.int();
    let mut b = ExprBuilder::new();
    b.cols(3, 1, 5);
    let x = b.local("x", int.clone());
    let chain = b.optional_eval(x, Type::optional(int));

    let out = fixture.run(chain, &SolutionBuilder::new().build()).expect("elaborate");
    assert!(matches!(out.expr.kind, ExprKind::InjectIntoOptional { .. }));
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].code, "W4102");
    assert!(!out.diagnostics[0].is_error());
}

#[test]
fn legacy_mode_ignores_labels_for_a_single_any_parameter() {
    let mut fixture = Fixture::new();
    let int = fixture.int();
    let show = fixture.function("show", vec![ParamDecl::new(None, "value", Type::any())]);
    let build = |fixture: &Fixture| {
        let mut b = ExprBuilder::new();
        let callee = b.decl_ref("show", show, fixture.fn_type(show));
        let one = b.int("1", int.clone());
        let args = b.tuple(vec![(Some("x"), one)]);
        b.call(callee, args, Type::void())
    };

    let strict = fixture
        .run(build(&fixture), &SolutionBuilder::new().build())
        .expect_err("label mismatch");
    assert_eq!(strict.error, ElaborationError::UserFixable { count: 1 });

    fixture.options.legacy_ignore_labels_for_single_any = true;
    let out = fixture
        .run(build(&fixture), &SolutionBuilder::new().build())
        .expect("legacy binding");
    let ExprKind::Call { args, .. } = &out.expr.kind else {
        panic!("expected a call");
    };
    let ExprKind::ArgumentShuffle { shuffle } = &args.kind else {
        panic!("expected relabeled arguments, got {}", args.kind.name());
    };
    assert_eq!(shuffle.mapping, vec![ShuffleSource::Arg { index: 0 }]);
    let ExprKind::Tuple { elements, .. } = &shuffle.sub.kind else {
        panic!("expected the argument tuple, got {}", shuffle.sub.kind.name());
    };
    assert!(matches!(elements[0].kind, ExprKind::Erasure { .. }));
    assert!(out.diagnostics.is_empty());
}

#[test]
fn line_default_takes_the_line_of_the_call() {
    let mut fixture = Fixture::new();
    let int = fixture.int();
    let string = fixture.string();
    let log = fixture.function(
        "log",
        vec![
            ParamDecl::new(None, "message", string.clone()),
            ParamDecl::new(Some("line"), "line", int).with_default(DefaultArgument::Line),
        ],
    );
    let mut b = ExprBuilder::new();
    b.cols(7, 3, 5);
    let callee = b.decl_ref("log", log, fixture.fn_type(log));
    b.cols(7, 7, 10);
    let message = b.string("hi", string);
    b.cols(7, 6, 11);
    let args = b.paren(message);
    b.cols(7, 3, 11);
    let call = b.call(callee, args, Type::void());

    let out = fixture.run(call, &SolutionBuilder::new().build()).expect("elaborate");
    let ExprKind::Call { args, .. } = &out.expr.kind else {
        panic!("expected a call");
    };
    let ExprKind::ArgumentShuffle { shuffle } = &args.kind else {
        panic!("expected shuffled arguments, got {}", args.kind.name());
    };
    assert_eq!(shuffle.mapping[1], ShuffleSource::CallerDefault { index: 0 });
    assert!(shuffle.source_is_scalar);
    assert!(matches!(
        &shuffle.caller_defaults[0].kind,
        ExprKind::MagicIdentifier { value: Some(LiteralValue::Integer(line)), .. } if line == "7"
    ));
}

/// `class Base { func copy() -> Self }` and `class Derived: Base`.
fn copyable(fixture: &mut Fixture) -> (Type, Type, elab_typing::DeclId) {
    let base = fixture.decls.add_nominal(NominalDecl::new("Base", NominalKind::Class));
    let mut derived = NominalDecl::new("Derived", NominalKind::Class);
    derived.superclass = Some(Type::nominal(base));
    let derived = fixture.decls.add_nominal(derived);
    let copy = fixture.decls.add_value(ValueDecl::func(
        "copy",
        DeclContext::Nominal(base),
        Vec::new(),
        Type::DynamicSelf(Box::new(Type::nominal(base))),
    ));
    (Type::nominal(base), Type::nominal(derived), copy)
}

fn member(copy: elab_typing::DeclId, id: u32) -> SolutionBuilder {
    SolutionBuilder::new().overload(
        Locator::new(ExprId(id)).with(PathElement::Member),
        OverloadChoice::Declaration {
            decl: copy,
            base: None,
            ref_kind: elab_typing::FunctionRefKind::SingleApply,
        },
    )
}

#[test]
fn self_returning_method_on_a_subclass_converts_the_reference() {
    let mut fixture = Fixture::new();
    let (base, derived, copy) = copyable(&mut fixture);
    let mut b = ExprBuilder::new();
    let d = b.local("d", derived.clone());
    let reference = b.dot(d, "copy", Type::function(Vec::new(), derived.clone()));

    let out = fixture.run(reference, &member(copy, 2).build()).expect("elaborate");
    assert_eq!(out.expr.ty, Type::function(Vec::new(), derived));
    let ExprKind::CovariantFunctionConversion { sub } = &out.expr.kind else {
        panic!("expected a covariant function conversion, got {}", out.expr.kind.name());
    };
    assert_eq!(sub.ty, Type::function(Vec::new(), base.clone()));
    let ExprKind::MemberRef { base: receiver, decl, .. } = &sub.kind else {
        panic!("expected a member reference, got {}", sub.kind.name());
    };
    assert_eq!(*decl, copy);
    assert_eq!(receiver.ty, base);
    assert!(matches!(receiver.kind, ExprKind::DerivedToBase { .. }));
}

#[test]
fn calling_a_self_returning_method_converts_the_result() {
    let mut fixture = Fixture::new();
    let (base, derived, copy) = copyable(&mut fixture);
    let mut b = ExprBuilder::new();
    let d = b.local("d", derived.clone());
    let reference = b.dot(d, "copy", Type::function(Vec::new(), derived.clone()));
    let args = b.tuple(Vec::new());
    let call = b.call(reference, args, derived.clone());

    let out = fixture.run(call, &member(copy, 2).build()).expect("elaborate");
    assert_eq!(out.expr.ty, derived);
    let ExprKind::CovariantReturnConversion { sub } = &out.expr.kind else {
        panic!("expected a covariant return conversion, got {}", out.expr.kind.name());
    };
    assert_eq!(sub.ty, base);
    let ExprKind::Call { callee, .. } = &sub.kind else {
        panic!("expected a call, got {}", sub.kind.name());
    };
    assert!(matches!(callee.kind, ExprKind::MemberRef { decl, .. } if decl == copy));
}

#[test]
fn self_returning_method_on_the_declaring_class_needs_no_conversion() {
    let mut fixture = Fixture::new();
    let (base, _, copy) = copyable(&mut fixture);
    let mut b = ExprBuilder::new();
    let value = b.local("value", base.clone());
    let reference = b.dot(value, "copy", Type::function(Vec::new(), base.clone()));
    let args = b.tuple(Vec::new());
    let call = b.call(reference, args, base.clone());

    let out = fixture.run(call, &member(copy, 2).build()).expect("elaborate");
    assert_eq!(out.expr.ty, base);
    let ExprKind::Call { callee, .. } = &out.expr.kind else {
        panic!("expected a plain call, got {}", out.expr.kind.name());
    };
    assert!(matches!(callee.kind, ExprKind::MemberRef { .. }));
}

/// `receiver.init()` with `init` recorded for the member.
fn init_through(
    fixture: &Fixture,
    receiver: elab_syntax::Expr,
    b: &mut ExprBuilder,
    widget: &Type,
    init: elab_typing::DeclId,
) -> Result<elab_apply::Elaborated, elab_apply::ElaborationFailure> {
    let receiver_id = receiver.id;
    let reference = b.dot(receiver, "init", Type::function(Vec::new(), widget.clone()));
    let args = b.tuple(Vec::new());
    let call = b.call(reference, args, widget.clone());
    let solution = SolutionBuilder::new()
        .overload(
            Locator::new(ExprId(receiver_id.0 + 1)).with(PathElement::Member),
            OverloadChoice::Declaration {
                decl: init,
                base: None,
                ref_kind: elab_typing::FunctionRefKind::SingleApply,
            },
        )
        .build();
    fixture.run(call, &solution)
}

#[test]
fn super_init_may_use_a_non_required_initializer() {
    let mut fixture = Fixture::new();
    let (widget, init) = fixture.class_with_init("Widget");
    let mut b = ExprBuilder::new();
    let receiver = b.super_ref(widget.clone());

    let out = init_through(&fixture, receiver, &mut b, &widget, init).expect("super.init");
    let ExprKind::Call { callee, .. } = &out.expr.kind else {
        panic!("expected a call, got {}", out.expr.kind.name());
    };
    assert!(matches!(callee.kind, ExprKind::ConstructorRef { decl, .. } if decl == init));
    assert!(out.diagnostics.is_empty());
}

#[test]
fn self_init_of_a_concrete_class_may_use_a_non_required_initializer() {
    let mut fixture = Fixture::new();
    let (widget, init) = fixture.class_with_init("Widget");
    let mut b = ExprBuilder::new();
    let receiver = b.local("self", widget.clone());

    let out = init_through(&fixture, receiver, &mut b, &widget, init).expect("self.init");
    assert!(matches!(out.expr.kind, ExprKind::Call { .. }));
    assert!(out.diagnostics.is_empty());
}

#[test]
fn self_init_through_dynamic_self_still_needs_a_required_initializer() {
    let mut fixture = Fixture::new();
    let (widget, init) = fixture.class_with_init("Widget");
    let mut b = ExprBuilder::new();
    let receiver = b.local("self", Type::metatype(Type::DynamicSelf(Box::new(widget.clone()))));

    let failure = init_through(&fixture, receiver, &mut b, &widget, init).expect_err("dynamic Self");
    assert_eq!(failure.error.class(), ErrorClass::UserFixable);
    assert_eq!(failure.diagnostics[0].code, "E4004");
}
