use elab_base::ExprId;

use crate::expr::{Expr, ExprKind};

/// Largest node id in the tree, including nodes nested in shuffles and closures.
pub fn max_id(expr: &Expr) -> ExprId {
    let mut max = expr.id;
    expr.kind.for_each_child(&mut |child| {
        max = max.max(max_id(child));
    });
    max
}

pub fn find_by_id(expr: &Expr, id: ExprId) -> Option<&Expr> {
    if expr.id == id {
        return Some(expr);
    }
    let mut found = None;
    expr.kind.for_each_child(&mut |child| {
        if found.is_none() {
            found = find_by_id(child, id);
        }
    });
    found
}

pub fn find_mut(expr: &mut Expr, id: ExprId) -> Option<&mut Expr> {
    if expr.id == id {
        return Some(expr);
    }
    expr.children_mut()
        .into_iter()
        .find_map(|child| find_mut(child, id))
}

/// Calls `f` on every node, parents before children.
pub fn walk_preorder<'e>(expr: &'e Expr, f: &mut impl FnMut(&'e Expr)) {
    f(expr);
    expr.kind.for_each_child(&mut |child| walk_preorder(child, &mut *f));
}

/// `expr` contains a `BindOptional` that belongs to it, i.e. one not owned
/// by a nested optional evaluation or closure.
pub fn contains_bind_optional(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::BindOptional { .. } => true,
        ExprKind::OptionalEvaluation { .. } | ExprKind::Closure { .. } => false,
        kind => {
            let mut found = false;
            kind.for_each_child(&mut |child| found = found || contains_bind_optional(child));
            found
        }
    }
}
