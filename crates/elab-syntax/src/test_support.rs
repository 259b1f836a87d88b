//! Builders for hand-written expression trees in tests.

use elab_base::{ExprId, Span};
use elab_typing::{DeclId, TupleElement, Type};

use crate::expr::{
    AccessSemantics, CastForm, ClosureBody, ClosureParam, DictionaryEntry, Expr, ExprKind,
    MagicIdentifierKind, Stmt, TryForm,
};

/// Hands out increasing node ids, starting at 1, in construction order.
pub struct ExprBuilder {
    next: u32,
    span: Span,
}

impl Default for ExprBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExprBuilder {
    pub fn new() -> Self {
        Self {
            next: 1,
            span: Span::new(1, 1, 1, 1),
        }
    }

    /// Span given to the nodes built after this call.
    pub fn at(&mut self, span: Span) -> &mut Self {
        self.span = span;
        self
    }

    /// Single-line span covering columns `start..=end` of `line`.
    pub fn cols(&mut self, line: usize, start: usize, end: usize) -> &mut Self {
        self.at(Span::new(line, start, line, end))
    }

    pub fn peek_id(&self) -> ExprId {
        ExprId(self.next)
    }

    pub fn node(&mut self, ty: Type, kind: ExprKind) -> Expr {
        let id = ExprId(self.next);
        self.next += 1;
        Expr::new(id, self.span, ty, kind)
    }

    pub fn local(&mut self, name: &str, ty: Type) -> Expr {
        self.node(
            ty,
            ExprKind::DeclRef {
                name: name.to_string(),
                decl: None,
                semantics: AccessSemantics::Ordinary,
                substitutions: Default::default(),
            },
        )
    }

    pub fn decl_ref(&mut self, name: &str, decl: DeclId, ty: Type) -> Expr {
        self.node(
            ty,
            ExprKind::DeclRef {
                name: name.to_string(),
                decl: Some(decl),
                semantics: AccessSemantics::Ordinary,
                substitutions: Default::default(),
            },
        )
    }

    pub fn int(&mut self, text: &str, ty: Type) -> Expr {
        self.node(
            ty,
            ExprKind::IntegerLiteral {
                text: text.to_string(),
                negative: false,
                builtin: None,
            },
        )
    }

    pub fn float(&mut self, text: &str, ty: Type) -> Expr {
        self.node(
            ty,
            ExprKind::FloatLiteral {
                text: text.to_string(),
                negative: false,
                builtin: None,
            },
        )
    }

    pub fn boolean(&mut self, value: bool, ty: Type) -> Expr {
        self.node(ty, ExprKind::BooleanLiteral { value, builtin: None })
    }

    pub fn string(&mut self, value: &str, ty: Type) -> Expr {
        self.node(
            ty,
            ExprKind::StringLiteral {
                value: value.to_string(),
                encoding: None,
                builtin: None,
            },
        )
    }

    pub fn magic(&mut self, magic: MagicIdentifierKind, ty: Type) -> Expr {
        self.node(
            ty,
            ExprKind::MagicIdentifier {
                magic,
                value: None,
                encoding: None,
                builtin: None,
            },
        )
    }

    pub fn nil(&mut self, ty: Type) -> Expr {
        self.node(ty, ExprKind::NilLiteral)
    }

    pub fn array(&mut self, elements: Vec<Expr>, ty: Type) -> Expr {
        self.node(
            ty,
            ExprKind::ArrayLiteral {
                elements,
                initializer: None,
            },
        )
    }

    pub fn dictionary(&mut self, entries: Vec<(Expr, Expr)>, ty: Type) -> Expr {
        let entries = entries
            .into_iter()
            .map(|(key, value)| DictionaryEntry { key, value })
            .collect();
        self.node(
            ty,
            ExprKind::DictionaryLiteral {
                entries,
                initializer: None,
            },
        )
    }

    pub fn paren(&mut self, sub: Expr) -> Expr {
        let ty = sub.ty.clone();
        self.node(ty, ExprKind::Paren { sub: Box::new(sub) })
    }

    pub fn tuple(&mut self, elements: Vec<(Option<&str>, Expr)>) -> Expr {
        let ty = Type::Tuple(
            elements
                .iter()
                .map(|(label, expr)| TupleElement {
                    label: label.map(str::to_string),
                    ty: expr.ty.clone(),
                    variadic: false,
                })
                .collect(),
        );
        let labels = elements
            .iter()
            .map(|(label, _)| label.map(str::to_string))
            .collect();
        let elements = elements.into_iter().map(|(_, expr)| expr).collect();
        self.node(ty, ExprKind::Tuple { elements, labels })
    }

    pub fn call(&mut self, callee: Expr, args: Expr, ty: Type) -> Expr {
        self.node(
            ty,
            ExprKind::Call {
                callee: Box::new(callee),
                args: Box::new(args),
                trailing_closure: false,
            },
        )
    }

    pub fn trailing_call(&mut self, callee: Expr, args: Expr, ty: Type) -> Expr {
        self.node(
            ty,
            ExprKind::Call {
                callee: Box::new(callee),
                args: Box::new(args),
                trailing_closure: true,
            },
        )
    }

    pub fn dot(&mut self, base: Expr, name: &str, ty: Type) -> Expr {
        self.node(
            ty,
            ExprKind::UnresolvedDot {
                base: Box::new(base),
                name: name.to_string(),
            },
        )
    }

    pub fn subscript(&mut self, base: Expr, index: Expr, ty: Type) -> Expr {
        self.node(
            ty,
            ExprKind::Subscript {
                base: Box::new(base),
                index: Box::new(index),
                decl: None,
                semantics: AccessSemantics::Ordinary,
                substitutions: Default::default(),
            },
        )
    }

    pub fn type_expr(&mut self, instance: Type) -> Expr {
        self.node(Type::metatype(instance), ExprKind::TypeExpr)
    }

    pub fn super_ref(&mut self, ty: Type) -> Expr {
        self.node(ty, ExprKind::SuperRef)
    }

    /// The keyword span is the current span.
    pub fn cast(&mut self, sub: Expr, target: Type, form: CastForm, ty: Type) -> Expr {
        let keyword = self.span;
        self.node(
            ty,
            ExprKind::Cast {
                sub: Box::new(sub),
                target,
                form,
                keyword,
                classified: None,
            },
        )
    }

    pub fn force(&mut self, sub: Expr, ty: Type) -> Expr {
        self.node(ty, ExprKind::ForceValue { sub: Box::new(sub) })
    }

    pub fn bind(&mut self, sub: Expr, ty: Type) -> Expr {
        self.node(
            ty,
            ExprKind::BindOptional {
                sub: Box::new(sub),
                depth: 0,
            },
        )
    }

    pub fn optional_eval(&mut self, sub: Expr, ty: Type) -> Expr {
        self.node(ty, ExprKind::OptionalEvaluation { sub: Box::new(sub) })
    }

    pub fn assign(&mut self, dest: Expr, source: Expr) -> Expr {
        self.node(
            Type::void(),
            ExprKind::Assign {
                dest: Box::new(dest),
                source: Box::new(source),
            },
        )
    }

    pub fn inout(&mut self, sub: Expr, ty: Type) -> Expr {
        self.node(ty, ExprKind::InOut { sub: Box::new(sub) })
    }

    pub fn ternary(&mut self, condition: Expr, then_expr: Expr, else_expr: Expr, ty: Type) -> Expr {
        self.node(
            ty,
            ExprKind::Ternary {
                condition: Box::new(condition),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
        )
    }

    pub fn try_(&mut self, sub: Expr, form: TryForm, ty: Type) -> Expr {
        self.node(
            ty,
            ExprKind::Try {
                sub: Box::new(sub),
                form,
            },
        )
    }

    pub fn closure(&mut self, params: Vec<(&str, Type)>, body: Expr, ty: Type) -> Expr {
        self.node(
            ty,
            ExprKind::Closure {
                params: closure_params(params),
                body: ClosureBody::Expression {
                    expr: Box::new(body),
                },
            },
        )
    }

    pub fn closure_stmts(&mut self, params: Vec<(&str, Type)>, stmts: Vec<Stmt>, ty: Type) -> Expr {
        self.node(
            ty,
            ExprKind::Closure {
                params: closure_params(params),
                body: ClosureBody::Statements { stmts },
            },
        )
    }
}

fn closure_params(params: Vec<(&str, Type)>) -> Vec<ClosureParam> {
    params
        .into_iter()
        .map(|(name, ty)| ClosureParam {
            name: name.to_string(),
            ty,
        })
        .collect()
}
