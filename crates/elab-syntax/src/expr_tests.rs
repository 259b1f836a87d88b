use elab_base::ExprId;
use elab_typing::{DeclTable, FunctionParam, KnownNominal, Type};

use crate::expr::{Expr, ExprKind};
use crate::test_support::ExprBuilder;
use crate::visit::{contains_bind_optional, find_by_id, find_mut, max_id};

fn int() -> Type {
    DeclTable::with_core_library()
        .known_type(KnownNominal::Int, Vec::new())
        .expect("Int")
}

#[test]
fn expressions_deserialize_from_fixture_json() {
    let json = r#"{
        "id": 3,
        "ty": {"nominal": {"decl": 0}},
        "kind": "call",
        "callee": {
            "id": 1,
            "span": {"start": {"line": 1, "column": 1}, "end": {"line": 1, "column": 1}},
            "ty": {"function": {"params": [], "result": {"nominal": {"decl": 0}}}},
            "kind": "decl_ref",
            "name": "f"
        },
        "args": {"id": 2, "ty": {"tuple": []}, "kind": "tuple", "elements": []}
    }"#;

    let expr: Expr = serde_json::from_str(json).expect("fixture expression");

    let ExprKind::Call { callee, args, trailing_closure } = &expr.kind else {
        panic!("expected a call, got {:?}", expr.kind.name());
    };
    assert!(!trailing_closure);
    assert_eq!(callee.id, ExprId(1));
    assert!(!callee.is_self_ref());
    assert_eq!(args.ty, Type::void());
    assert_eq!(expr.ty, int());
}

#[test]
fn expressions_round_trip_through_json() {
    let int = int();
    let mut b = ExprBuilder::new();
    let callee = b.local("f", Type::function(vec![FunctionParam::new(Some("x"), int.clone())], int.clone()));
    let arg = b.int("42", int.clone());
    let args = b.tuple(vec![(Some("x"), arg)]);
    let call = b.call(callee, args, int);

    let json = serde_json::to_string(&call).expect("serialize");
    let decoded: Expr = serde_json::from_str(&json).expect("deserialize");

    assert_eq!(decoded, call);
}

#[test]
fn argument_labels_cover_every_element() {
    let int = int();
    let mut b = ExprBuilder::new();
    let first = b.int("1", int.clone());
    let second = b.int("2", int.clone());
    let tuple = b.tuple(vec![(None, first), (Some("c"), second)]);
    let single = b.int("3", int);
    let paren = b.paren(single);

    assert_eq!(tuple.argument_labels(), vec![None, Some("c".to_string())]);
    assert_eq!(paren.argument_labels(), vec![None]);
}

#[test]
fn lookup_by_id_reaches_nested_nodes() {
    let int = int();
    let mut b = ExprBuilder::new();
    let x = b.local("x", Type::optional(int.clone()));
    let bound = b.bind(x, int.clone());
    let eval = b.optional_eval(bound, Type::optional(int.clone()));
    let mut paren = b.paren(eval);

    assert_eq!(max_id(&paren), ExprId(4));
    assert_eq!(find_by_id(&paren, ExprId(2)).map(|e| e.kind.name()), Some("bind_optional"));
    assert!(find_by_id(&paren, ExprId(9)).is_none());

    let node = find_mut(&mut paren, ExprId(1)).expect("x");
    node.ty = int.clone();
    assert_eq!(find_by_id(&paren, ExprId(1)).map(|e| e.ty.clone()), Some(int));
}

#[test]
fn bind_optional_search_stops_at_nested_evaluations() {
    let int = int();
    let mut b = ExprBuilder::new();
    let x = b.local("x", Type::optional(int.clone()));
    let bound = b.bind(x, int.clone());
    let inner = b.optional_eval(bound, Type::optional(int.clone()));
    let outer_sub = b.paren(inner);

    assert!(!contains_bind_optional(&outer_sub));
    let ExprKind::Paren { sub } = &outer_sub.kind else {
        unreachable!()
    };
    let ExprKind::OptionalEvaluation { sub: chain } = &sub.kind else {
        unreachable!()
    };
    assert!(contains_bind_optional(chain));
}
