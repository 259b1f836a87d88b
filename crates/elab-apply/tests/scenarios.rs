
use elab_apply::{ClosureBodySolver, DeferredClosure, ElaborationError, ErrorClass, ExistentialEvent, elaborate_with_closures};
use elab_apply::{ElaborationContext, ElaborationRequest};
use elab_base::{EditKind, ExprId, Span};
use elab_syntax::test_support::ExprBuilder;
use elab_syntax::{
    CastForm, CheckedCastKind, ClosureBody, ExprKind, ShuffleSource, ShuffledArgument, Stmt, walk_preorder,
};
use elab_typing::{
    ArchetypeDecl, DeclContext, DefaultArgument, FloatKind, FunctionRefKind, KnownNominal, KnownProtocol,
    LiteralValue, Locator, OverloadChoice, ParamDecl, PathElement, Solution, SolutionBuilder, Type, ValueDecl,
};

use test_support::Fixture;

#[test]
fn integer_literal_of_the_default_float_type_is_a_single_node() {
    let fixture = Fixture::new();
    let double = fixture.ty(KnownNominal::Double);
    let mut b = ExprBuilder::new();
    let literal = b.int("1", double.clone());

    let out = fixture.run(literal, &SolutionBuilder::new().build()).expect("elaborate");
    insta::assert_snapshot!(fixture.dump(&out.expr), @"(integer_literal type='Double' value=1 builtin=init(_builtinFloatLiteral:) payload='Builtin.FPIEEE80' default_literal_type)");
    let mut nodes = 0;
    walk_preorder(&out.expr, &mut |_| nodes += 1);
    assert_eq!(nodes, 1);
    assert!(out.diagnostics.is_empty());
}

#[test]
fn float_literal_of_the_default_float_type_is_a_single_node() {
    let fixture = Fixture::new();
    let double = fixture.ty(KnownNominal::Double);
    let mut b = ExprBuilder::new();
    let literal = b.float("1.0", double.clone());

    let out = fixture.run(literal, &SolutionBuilder::new().build()).expect("elaborate");
    assert_eq!(out.expr.ty, double);
    let ExprKind::FloatLiteral {
        builtin: Some(builtin),
        ..
    } = &out.expr.kind
    else {
        panic!("expected a lowered float literal, got {}", out.expr.kind.name());
    };
    assert_eq!(builtin.payload, Type::builtin_float(FloatKind::Fp80));
    assert!(builtin.sugared_default);
}

#[test]
fn omitted_literal_default_is_materialized_by_the_caller() {
    let mut fixture = Fixture::new();
    let int = fixture.int();
    let string = fixture.string();
    let f = fixture.function(
        "f",
        vec![
            ParamDecl::new(None, "a", int.clone()),
            ParamDecl::new(Some("b"), "b", string.clone())
                .with_default(DefaultArgument::StoredLiteral(LiteralValue::String("x".to_string()))),
            ParamDecl::new(Some("c"), "c", int.clone()),
        ],
    );
    let mut b = ExprBuilder::new();
    let callee = b.decl_ref("f", f, fixture.fn_type(f));
    let a = b.local("a", int.clone());
    let three = b.int("3", int);
    let args = b.tuple(vec![(None, a), (Some("c"), three)]);
    let call = b.call(callee, args, Type::void());

    let out = fixture.run(call, &SolutionBuilder::new().build()).expect("elaborate");
    let ExprKind::Call { args, .. } = &out.expr.kind else {
        panic!("expected a call");
    };
    let ExprKind::ArgumentShuffle { shuffle } = &args.kind else {
        panic!("expected shuffled arguments, got {}", args.kind.name());
    };
    assert_eq!(
        shuffle.mapping,
        vec![
            ShuffleSource::Arg { index: 0 },
            ShuffleSource::CallerDefault { index: 0 },
            ShuffleSource::Arg { index: 1 },
        ]
    );
    assert_eq!(shuffle.reconstruct_bindings(), vec![vec![0], vec![], vec![1]]);
    assert_eq!(shuffle.callee, Some(f));
    let rewritten = shuffle.rewritten_arguments();
    assert_eq!(rewritten.len(), 3);
    assert!(matches!(
        rewritten[1],
        ShuffledArgument::CallerDefault(default)
            if matches!(&default.kind, ExprKind::StringLiteral { value, builtin: Some(_), .. } if value == "x")
    ));
    assert_eq!(shuffle.caller_defaults[0].ty, string);
    assert!(out.diagnostics.is_empty());
}

#[test]
fn conditional_dictionary_upcast_wraps_a_conversion_pair_per_side() {
    let fixture = Fixture::new();
    let string = fixture.string();
    let object = fixture.ty(KnownNominal::NSObject);
    let any_object = Type::Existential(vec![
        fixture
            .decls
            .known_protocol(KnownProtocol::AnyObject)
            .expect("AnyObject"),
    ]);
    let from = fixture
        .decls
        .known_type(KnownNominal::Dictionary, vec![string.clone(), object])
        .expect("Dictionary");
    let to = fixture
        .decls
        .known_type(KnownNominal::Dictionary, vec![string, any_object])
        .expect("Dictionary");
    let mut b = ExprBuilder::new();
    let dict = b.local("dict", from.clone());
    let cast = b.cast(dict, to.clone(), CastForm::Conditional, Type::optional(to.clone()));
    let solution = SolutionBuilder::new()
        .restriction(from, to.clone(), elab_typing::ConversionRestrictionKind::DictionaryUpcast)
        .build();

    let out = fixture.run(cast, &solution).expect("elaborate");
    assert_eq!(out.expr.ty, Type::optional(to.clone()));
    let ExprKind::Cast {
        sub,
        form: CastForm::Conditional,
        ..
    } = &out.expr.kind
    else {
        panic!("expected a conditional cast");
    };
    assert_eq!(sub.ty, to);
    let ExprKind::CollectionUpcast {
        key_conversion: Some(_),
        value_conversion,
        ..
    } = &sub.kind
    else {
        panic!("expected a dictionary upcast, got {}", sub.kind.name());
    };
    assert!(matches!(value_conversion.conversion.kind, ExprKind::Erasure { .. }));
}

#[test]
fn existential_member_opens_and_closes_once() {
    let mut fixture = Fixture::new();
    let int = fixture.int();
    let drawable = fixture.decls.declare_protocol("Drawable", Vec::new());
    let x = fixture
        .decls
        .add_value(ValueDecl::var("x", DeclContext::Protocol(drawable), int.clone()));
    let existential = Type::Existential(vec![drawable]);
    let archetype = fixture
        .decls
        .add_archetype(ArchetypeDecl::opened(existential.clone()));
    let mut b = ExprBuilder::new();
    let p = b.local("p", existential.clone());
    let access = b.dot(p, "x", int.clone());
    let member = Locator::new(ExprId(2)).with(PathElement::Member);
    let solution = SolutionBuilder::new()
        .overload(
            member.clone(),
            OverloadChoice::Declaration {
                decl: x,
                base: Some(existential),
                ref_kind: FunctionRefKind::Unapplied,
            },
        )
        .opened_existential(member, archetype)
        .build();

    let out = fixture.run(access, &solution).expect("elaborate");
    insta::assert_snapshot!(fixture.dump(&out.expr), @r"
    (open_existential implicit type='Int' opaque=0
      (decl_ref type='Drawable' name=p)
      (member_ref type='Int' decl=x subs=[Self := @opened Drawable]
        (opaque_value implicit type='@opened Drawable' opaque=0)))
    ");
    let mut opened = 0;
    walk_preorder(&out.expr, &mut |node| {
        if matches!(node.kind, ExprKind::OpenExistential { .. }) {
            opened += 1;
        }
    });
    assert_eq!(opened, 1);
    assert!(matches!(
        out.events.as_slice(),
        [
            ExistentialEvent::Opened { closing_depth: 0, .. },
            ExistentialEvent::Closed { depth: 0, .. }
        ]
    ));
}

#[test]
fn variadic_arguments_are_collected() {
    let mut fixture = Fixture::new();
    let int = fixture.int();
    let g = fixture.function("g", vec![ParamDecl::new(None, "xs", int.clone()).variadic()]);
    let mut b = ExprBuilder::new();
    let callee = b.decl_ref("g", g, fixture.fn_type(g));
    let one = b.int("1", int.clone());
    let two = b.int("2", int.clone());
    let three = b.int("3", int.clone());
    let args = b.tuple(vec![(None, one), (None, two), (None, three)]);
    let call = b.call(callee, args, Type::void());

    let out = fixture.run(call, &SolutionBuilder::new().build()).expect("elaborate");
    let ExprKind::Call { args, .. } = &out.expr.kind else {
        panic!("expected a call");
    };
    let ExprKind::ArgumentShuffle { shuffle } = &args.kind else {
        panic!("expected shuffled arguments");
    };
    assert_eq!(shuffle.mapping, vec![ShuffleSource::Variadic]);
    assert_eq!(shuffle.variadic_args, vec![0, 1, 2]);
    assert_eq!(shuffle.variadic_type, Some(fixture.array_of(int)));
}

#[test]
fn arguments_in_parameter_order_are_not_shuffled() {
    let mut fixture = Fixture::new();
    let int = fixture.int();
    let h = fixture.function(
        "h",
        vec![
            ParamDecl::new(None, "a", int.clone()),
            ParamDecl::new(Some("b"), "b", int.clone()),
        ],
    );
    let mut b = ExprBuilder::new();
    let callee = b.decl_ref("h", h, fixture.fn_type(h));
    let one = b.int("1", int.clone());
    let two = b.int("2", int);
    let args = b.tuple(vec![(None, one), (Some("b"), two)]);
    let call = b.call(callee, args, Type::void());

    let out = fixture.run(call, &SolutionBuilder::new().build()).expect("elaborate");
    let ExprKind::Call { args, .. } = &out.expr.kind else {
        panic!("expected a call");
    };
    assert!(matches!(args.kind, ExprKind::Tuple { .. }));
    assert_eq!(args.id, ExprId(4));
}

#[test]
fn trailing_closure_binds_the_last_parameter() {
    let mut fixture = Fixture::new();
    let int = fixture.int();
    let body_ty = Type::function(Vec::new(), Type::void());
    let repeat = fixture.function(
        "repeat",
        vec![
            ParamDecl::new(Some("count"), "count", int.clone()),
            ParamDecl::new(Some("body"), "body", body_ty.clone()),
        ],
    );
    let mut b = ExprBuilder::new();
    let callee = b.decl_ref("repeat", repeat, fixture.fn_type(repeat));
    let count = b.int("2", int);
    let empty = b.tuple(Vec::new());
    let closure = b.closure(Vec::new(), empty, body_ty);
    let args = b.tuple(vec![(Some("count"), count), (None, closure)]);
    let call = b.trailing_call(callee, args, Type::void());

    let out = fixture.run(call, &SolutionBuilder::new().build()).expect("elaborate");
    let ExprKind::Call {
        args,
        trailing_closure: true,
        ..
    } = &out.expr.kind
    else {
        panic!("expected a trailing-closure call");
    };
    let ExprKind::ArgumentShuffle { shuffle } = &args.kind else {
        panic!("expected the closure to be relabeled");
    };
    assert_eq!(shuffle.reconstruct_bindings(), vec![vec![0], vec![1]]);
}

#[test]
fn accepted_label_mismatch_warns_with_an_insertion() {
    let mut fixture = Fixture::new();
    fixture.options.allow_label_mismatch = true;
    let int = fixture.int();
    let h = fixture.function("h", vec![ParamDecl::new(Some("a"), "a", int.clone())]);
    let mut b = ExprBuilder::new();
    let callee = b.decl_ref("h", h, fixture.fn_type(h));
    b.cols(1, 3, 3);
    let one = b.int("1", int);
    b.cols(1, 2, 4);
    let args = b.paren(one);
    b.cols(1, 1, 4);
    let call = b.call(callee, args, Type::void());

    let out = fixture.run(call, &SolutionBuilder::new().build()).expect("elaborate");
    assert_eq!(out.diagnostics.len(), 1);
    let warning = &out.diagnostics[0];
    assert_eq!(warning.code, "W4105");
    assert_eq!(warning.message, "argument label '_' does not match parameter label 'a'");
    assert_eq!(warning.edits.len(), 1);
    assert_eq!(warning.edits[0].kind, EditKind::Insert);
    assert_eq!(warning.edits[0].span, Span::new(1, 3, 1, 3));
    assert_eq!(warning.edits[0].text, "a: ");
}

#[test]
fn wrong_label_fails_with_a_diagnostic() {
    let mut fixture = Fixture::new();
    let int = fixture.int();
    let h = fixture.function("h", vec![ParamDecl::new(Some("a"), "a", int.clone())]);
    let mut b = ExprBuilder::new();
    let callee = b.decl_ref("h", h, fixture.fn_type(h));
    let one = b.int("1", int);
    let args = b.tuple(vec![(Some("x"), one)]);
    let call = b.call(callee, args, Type::void());

    let failure = fixture
        .run(call, &SolutionBuilder::new().build())
        .expect_err("label mismatch");
    assert_eq!(failure.error, ElaborationError::UserFixable { count: 1 });
    assert_eq!(failure.error.class(), ErrorClass::UserFixable);
    assert_eq!(failure.diagnostics.len(), 1);
    let error = &failure.diagnostics[0];
    assert_eq!(error.code, "E4002");
    insta::assert_snapshot!(error.message, @"incorrect argument label in call (have 'x:', expected 'a:')");
    let labels: Vec<&str> = error.labels.iter().map(|label| label.message.as_str()).collect();
    assert_eq!(
        labels,
        vec!["argument labeled 'x' should be labeled 'a'", "declared as 'h(a:)'"]
    );
}

#[test]
fn missing_argument_is_a_desync() {
    let mut fixture = Fixture::new();
    let int = fixture.int();
    let h = fixture.function(
        "h",
        vec![
            ParamDecl::new(Some("a"), "a", int.clone()),
            ParamDecl::new(Some("b"), "b", int.clone()),
        ],
    );
    let mut b = ExprBuilder::new();
    let callee = b.decl_ref("h", h, fixture.fn_type(h));
    let one = b.int("1", int);
    let args = b.tuple(vec![(Some("a"), one)]);
    let call = b.call(callee, args, Type::void());

    let failure = fixture
        .run(call, &SolutionBuilder::new().build())
        .expect_err("b is missing");
    insta::assert_snapshot!(failure.error.to_string(), @"solver desync: missing argument for parameter #1 in call to 'h(a:b:)'");
    assert_eq!(failure.diagnostics[0].code, "E4001");
}

#[test]
fn calling_a_metatype_value_needs_an_explicit_init() {
    let mut fixture = Fixture::new();
    let (widget, init) = fixture.class_with_init("Widget");
    let mut b = ExprBuilder::new();
    b.cols(1, 1, 4);
    let meta = b.local("meta", Type::metatype(widget.clone()));
    b.cols(1, 1, 6);
    let args = b.tuple(Vec::new());
    let call = b.call(meta, args, widget);
    let solution = SolutionBuilder::new()
        .overload(
            Locator::new(ExprId(3)).with(PathElement::ConstructorMember),
            OverloadChoice::Declaration {
                decl: init,
                base: None,
                ref_kind: FunctionRefKind::DoubleApply,
            },
        )
        .build();

    let failure = fixture.run(call, &solution).expect_err("implicit init");
    assert_eq!(failure.error.class(), ErrorClass::UserFixable);
    let error = &failure.diagnostics[0];
    assert_eq!(error.code, "E4004");
    assert_eq!(error.message, "initializing from a metatype value must reference 'init' explicitly");
    assert_eq!(error.edits[0].text, ".init");
    assert_eq!(error.edits[0].span, Span::new(1, 1, 1, 4).end_point());
}

#[test]
fn explicit_init_through_a_metatype_value_must_be_required() {
    let mut fixture = Fixture::new();
    let (widget, init) = fixture.class_with_init("Widget");
    let mut b = ExprBuilder::new();
    let meta = b.local("meta", Type::metatype(widget.clone()));
    let reference = b.dot(meta, "init", Type::function(Vec::new(), widget.clone()));
    let args = b.tuple(Vec::new());
    let call = b.call(reference, args, widget);
    let solution = SolutionBuilder::new()
        .overload(
            Locator::new(ExprId(2)).with(PathElement::Member),
            OverloadChoice::Declaration {
                decl: init,
                base: None,
                ref_kind: FunctionRefKind::SingleApply,
            },
        )
        .build();

    let failure = fixture.run(call, &solution).expect_err("not required");
    insta::assert_snapshot!(failure.error.to_string(), @"constructing an object of class type 'Widget' with a metatype value must use a 'required' initializer");
    assert_eq!(failure.diagnostics[0].code, "E4004");
    assert!(failure.diagnostics[0].edits.is_empty());
}

#[test]
fn construction_through_a_type_name_references_the_initializer() {
    let mut fixture = Fixture::new();
    let (widget, init) = fixture.class_with_init("Widget");
    let mut b = ExprBuilder::new();
    let type_expr = b.type_expr(widget.clone());
    let args = b.tuple(Vec::new());
    let call = b.call(type_expr, args, widget.clone());
    let solution = SolutionBuilder::new()
        .overload(
            Locator::new(ExprId(3)).with(PathElement::ConstructorMember),
            OverloadChoice::Declaration {
                decl: init,
                base: None,
                ref_kind: FunctionRefKind::DoubleApply,
            },
        )
        .build();

    let out = fixture.run(call, &solution).expect("elaborate");
    assert_eq!(out.expr.ty, widget);
    let ExprKind::Call { callee, .. } = &out.expr.kind else {
        panic!("expected a call");
    };
    assert!(matches!(&callee.kind, ExprKind::ConstructorRef { decl, .. } if *decl == init));
}

struct EmptySolutions {
    asked: Vec<ExprId>,
    answer: bool,
}

impl ClosureBodySolver for EmptySolutions {
    fn solve_body(&mut self, closure: &DeferredClosure) -> Option<Solution> {
        self.asked.push(closure.closure);
        self.answer.then(|| SolutionBuilder::new().build())
    }
}

fn closure_returning_one(fixture: &Fixture) -> elab_syntax::Expr {
    let int = fixture.int();
    let mut b = ExprBuilder::new();
    let one = b.int("1", int.clone());
    b.closure_stmts(
        Vec::new(),
        vec![Stmt::Return { value: Some(one) }],
        Type::function(Vec::new(), int),
    )
}

#[test]
fn statement_closures_are_deferred_then_elaborated() {
    let fixture = Fixture::new();
    let first = fixture
        .run(closure_returning_one(&fixture), &SolutionBuilder::new().build())
        .expect("first pass");
    assert_eq!(first.deferred.len(), 1);
    assert_eq!(first.deferred[0].closure, ExprId(2));

    let mut solver = EmptySolutions {
        asked: Vec::new(),
        answer: true,
    };
    let solution = SolutionBuilder::new().build();
    let out = elaborate_with_closures(
        ElaborationRequest {
            expr: closure_returning_one(&fixture),
            decls: &fixture.decls,
            solution: &solution,
            options: &fixture.options,
            context: ElaborationContext::default(),
        },
        &mut solver,
    )
    .expect("both passes");
    assert_eq!(solver.asked, vec![ExprId(2)]);
    assert!(out.deferred.is_empty());
    let ExprKind::Closure {
        body: ClosureBody::Statements { stmts },
        ..
    } = &out.expr.kind
    else {
        panic!("expected a statement closure");
    };
    assert!(matches!(
        &stmts[0],
        Stmt::Return { value: Some(value) } if matches!(value.kind, ExprKind::IntegerLiteral { builtin: Some(_), .. })
    ));
}

#[test]
fn unsolvable_closure_body_is_a_desync() {
    let fixture = Fixture::new();
    let mut solver = EmptySolutions {
        asked: Vec::new(),
        answer: false,
    };
    let solution = SolutionBuilder::new().build();
    let failure = elaborate_with_closures(
        ElaborationRequest {
            expr: closure_returning_one(&fixture),
            decls: &fixture.decls,
            solution: &solution,
            options: &fixture.options,
            context: ElaborationContext::default(),
        },
        &mut solver,
    )
    .expect_err("no body solution");
    assert_eq!(failure.error.class(), ErrorClass::SolverDesync);
    insta::assert_snapshot!(failure.error.to_string(), @"solver desync: closure #2 has no solution for its body");
    assert_eq!(failure.diagnostics.last().map(|d| d.code.as_str()), Some("E4001"));
}

#[test]
fn is_test_against_the_same_class_is_a_coercion() {
    let fixture = Fixture::new();
    let object = fixture.ty(KnownNominal::NSObject);
    let mut b = ExprBuilder::new();
    let value = b.local("o", object.clone());
    let cast = b.cast(value, object.clone(), CastForm::Is, fixture.ty(KnownNominal::Bool));

    let out = fixture.run(cast, &SolutionBuilder::new().build()).expect("elaborate");
    assert!(matches!(
        out.expr.kind,
        ExprKind::Cast {
            classified: Some(CheckedCastKind::Coercion),
            ..
        }
    ));
}
