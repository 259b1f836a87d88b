use elab_base::{ExprId, Span};
use elab_typing::{ConformanceRef, DeclId, LiteralValue, SubstitutionMap, Type};
use serde::{Deserialize, Serialize};

use crate::shuffle::ArgumentShuffle;

/// Handle binding an `OpaqueValue` placeholder to the expression it stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpaqueId(pub u32);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub id: ExprId,
    #[serde(default)]
    pub span: Span,
    pub ty: Type,
    /// Synthesized by elaboration rather than written in source.
    #[serde(default)]
    pub implicit: bool,
    #[serde(flatten)]
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(id: ExprId, span: Span, ty: Type, kind: ExprKind) -> Self {
        Self {
            id,
            span,
            ty,
            implicit: false,
            kind,
        }
    }

    pub fn implicit(id: ExprId, span: Span, ty: Type, kind: ExprKind) -> Self {
        Self {
            id,
            span,
            ty,
            implicit: true,
            kind,
        }
    }

    pub fn with_type(mut self, ty: Type) -> Self {
        self.ty = ty;
        self
    }

    /// Looks through parentheses.
    pub fn semantics_provider(&self) -> &Expr {
        match &self.kind {
            ExprKind::Paren { sub } => sub.semantics_provider(),
            _ => self,
        }
    }

    pub fn is_self_ref(&self) -> bool {
        matches!(&self.kind, ExprKind::DeclRef { name, .. } if name == "self")
    }

    /// Argument labels of a call's argument expression, one per argument.
    pub fn argument_labels(&self) -> Vec<Option<String>> {
        match &self.kind {
            ExprKind::Tuple { elements, labels } => (0..elements.len())
                .map(|index| labels.get(index).cloned().flatten())
                .collect(),
            _ => vec![None],
        }
    }

    pub fn children(&self) -> Vec<&Expr> {
        let mut out = Vec::new();
        self.kind.for_each_child(&mut |child| out.push(child));
        out
    }

    pub fn children_mut(&mut self) -> Vec<&mut Expr> {
        let mut out = Vec::new();
        self.kind.for_each_child_mut(&mut |child| out.push(child));
        out
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessSemantics {
    #[default]
    Ordinary,
    DirectToStorage,
    DirectToAccessor,
}

/// The builtin-tier initializer a literal was lowered through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltinInit {
    pub initializer: DeclId,
    /// Primitive payload type handed to the initializer.
    pub payload: Type,
    /// The literal's type is the protocol's default literal type.
    #[serde(default)]
    pub sugared_default: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "encoding", rename_all = "snake_case")]
pub enum StringEncoding {
    Utf8 { is_ascii: bool },
    Utf16,
    ConstantUtf8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MagicIdentifierKind {
    File,
    Function,
    Line,
    Column,
}

impl MagicIdentifierKind {
    pub fn spelling(self) -> &'static str {
        match self {
            MagicIdentifierKind::File => "#file",
            MagicIdentifierKind::Function => "#function",
            MagicIdentifierKind::Line => "#line",
            MagicIdentifierKind::Column => "#column",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastForm {
    /// `as`
    Coerce,
    /// `as?`
    Conditional,
    /// `as!`
    Forced,
    /// `is`
    Is,
}

impl CastForm {
    pub fn keyword(self) -> &'static str {
        match self {
            CastForm::Coerce => "as",
            CastForm::Conditional => "as?",
            CastForm::Forced => "as!",
            CastForm::Is => "is",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "cast", rename_all = "snake_case")]
pub enum CheckedCastKind {
    /// Statically known to succeed.
    Coercion,
    ValueCast,
    ArrayDowncast { bridged: bool },
    DictionaryDowncast { bridged: bool },
    SetDowncast { bridged: bool },
    BridgeFromForeign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TryForm {
    Plain,
    Optional,
    Forced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerConversionKind {
    InoutToPointer,
    ArrayToPointer,
    StringToPointer,
    PointerToPointer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub key: Expr,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosureParam {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "body", rename_all = "snake_case")]
pub enum ClosureBody {
    Expression { expr: Box<Expr> },
    Statements { stmts: Vec<Stmt> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stmt", rename_all = "snake_case")]
pub enum Stmt {
    Expression { expr: Expr },
    Return { value: Option<Expr> },
    Binding { name: String, ty: Type, value: Expr },
}

/// Element conversion of a collection upcast: `conversion` converts the
/// opaque value `placeholder` (one source element) to the target element type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionPair {
    pub placeholder: OpaqueId,
    pub conversion: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPathComponent {
    #[serde(default)]
    pub decl: Option<DeclId>,
    /// Subscript components carry their index expression.
    #[serde(default)]
    pub index: Option<Expr>,
    #[serde(default)]
    pub index_conformances: Vec<ConformanceRef>,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExprKind {
    IntegerLiteral {
        text: String,
        #[serde(default)]
        negative: bool,
        #[serde(default)]
        builtin: Option<BuiltinInit>,
    },
    FloatLiteral {
        text: String,
        #[serde(default)]
        negative: bool,
        #[serde(default)]
        builtin: Option<BuiltinInit>,
    },
    BooleanLiteral {
        value: bool,
        #[serde(default)]
        builtin: Option<BuiltinInit>,
    },
    StringLiteral {
        value: String,
        #[serde(default)]
        encoding: Option<StringEncoding>,
        #[serde(default)]
        builtin: Option<BuiltinInit>,
    },
    MagicIdentifier {
        magic: MagicIdentifierKind,
        /// The value the identifier stands for at its location, filled in by elaboration.
        #[serde(default)]
        value: Option<LiteralValue>,
        #[serde(default)]
        encoding: Option<StringEncoding>,
        #[serde(default)]
        builtin: Option<BuiltinInit>,
    },
    NilLiteral,
    ArrayLiteral {
        elements: Vec<Expr>,
        #[serde(default)]
        initializer: Option<DeclId>,
    },
    DictionaryLiteral {
        entries: Vec<DictionaryEntry>,
        #[serde(default)]
        initializer: Option<DeclId>,
    },
    /// A named reference. `decl` is `None` for locals, including `self`.
    DeclRef {
        name: String,
        #[serde(default)]
        decl: Option<DeclId>,
        #[serde(default)]
        semantics: AccessSemantics,
        #[serde(default)]
        substitutions: SubstitutionMap,
    },
    OverloadedDeclRef {
        name: String,
        candidates: Vec<DeclId>,
    },
    /// `base.name` before the solver's choice is applied.
    UnresolvedDot {
        base: Box<Expr>,
        name: String,
    },
    Subscript {
        base: Box<Expr>,
        index: Box<Expr>,
        #[serde(default)]
        decl: Option<DeclId>,
        #[serde(default)]
        semantics: AccessSemantics,
        #[serde(default)]
        substitutions: SubstitutionMap,
    },
    MemberRef {
        base: Box<Expr>,
        decl: DeclId,
        #[serde(default)]
        semantics: AccessSemantics,
        #[serde(default)]
        substitutions: SubstitutionMap,
    },
    DynamicMemberRef {
        base: Box<Expr>,
        decl: DeclId,
    },
    DynamicSubscript {
        base: Box<Expr>,
        index: Box<Expr>,
        decl: DeclId,
    },
    ConstructorRef {
        base: Box<Expr>,
        decl: DeclId,
        #[serde(default)]
        substitutions: SubstitutionMap,
    },
    TupleElement {
        base: Box<Expr>,
        index: u32,
    },
    KeyPath {
        root: Type,
        components: Vec<KeyPathComponent>,
    },
    KeyPathApplication {
        base: Box<Expr>,
        key_path: Box<Expr>,
    },
    TypeExpr,
    SuperRef,
    OpaqueValue {
        opaque: OpaqueId,
    },
    Call {
        callee: Box<Expr>,
        args: Box<Expr>,
        #[serde(default)]
        trailing_closure: bool,
    },
    Paren {
        sub: Box<Expr>,
    },
    Tuple {
        elements: Vec<Expr>,
        #[serde(default)]
        labels: Vec<Option<String>>,
    },
    Closure {
        params: Vec<ClosureParam>,
        body: ClosureBody,
    },
    /// `as`, `as?`, `as!` and `is`. Coercions (`as`) keep `classified` empty.
    Cast {
        sub: Box<Expr>,
        target: Type,
        form: CastForm,
        #[serde(default)]
        keyword: Span,
        #[serde(default)]
        classified: Option<CheckedCastKind>,
    },
    BindOptional {
        sub: Box<Expr>,
        #[serde(default)]
        depth: u32,
    },
    OptionalEvaluation {
        sub: Box<Expr>,
    },
    ForceValue {
        sub: Box<Expr>,
    },
    Assign {
        dest: Box<Expr>,
        source: Box<Expr>,
    },
    InOut {
        sub: Box<Expr>,
    },
    Ternary {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    DiscardAssignment,
    Try {
        sub: Box<Expr>,
        form: TryForm,
    },
    Load {
        sub: Box<Expr>,
    },
    ArgumentShuffle {
        shuffle: Box<ArgumentShuffle>,
    },
    DerivedToBase {
        sub: Box<Expr>,
    },
    ArchetypeToSuper {
        sub: Box<Expr>,
    },
    Erasure {
        sub: Box<Expr>,
        conformances: Vec<ConformanceRef>,
    },
    AnyHashableErasure {
        sub: Box<Expr>,
        conformance: ConformanceRef,
    },
    InjectIntoOptional {
        sub: Box<Expr>,
    },
    FunctionConversion {
        sub: Box<Expr>,
    },
    CovariantFunctionConversion {
        sub: Box<Expr>,
    },
    CovariantReturnConversion {
        sub: Box<Expr>,
    },
    AutoClosure {
        body: Box<Expr>,
    },
    MetatypeConversion {
        sub: Box<Expr>,
    },
    ClassMetatypeToObject {
        sub: Box<Expr>,
    },
    ExistentialMetatypeToObject {
        sub: Box<Expr>,
    },
    ProtocolMetatypeToObject {
        sub: Box<Expr>,
    },
    CollectionUpcast {
        sub: Box<Expr>,
        #[serde(default)]
        key_conversion: Option<ConversionPair>,
        value_conversion: ConversionPair,
        bridged: bool,
    },
    PointerConversion {
        sub: Box<Expr>,
        conversion: PointerConversionKind,
    },
    BridgeToForeign {
        sub: Box<Expr>,
    },
    BridgeFromForeign {
        sub: Box<Expr>,
    },
    ForeignObjectConversion {
        sub: Box<Expr>,
    },
    UnresolvedTypeConversion {
        sub: Box<Expr>,
    },
    /// Binds `opaque` to the value of `existential` while `body` is evaluated.
    OpenExistential {
        existential: Box<Expr>,
        opaque: OpaqueId,
        body: Box<Expr>,
    },
}

impl ExprKind {
    /// Snake-case tag, as used in dumps and JSON.
    pub fn name(&self) -> &'static str {
        match self {
            ExprKind::IntegerLiteral { .. } => "integer_literal",
            ExprKind::FloatLiteral { .. } => "float_literal",
            ExprKind::BooleanLiteral { .. } => "boolean_literal",
            ExprKind::StringLiteral { .. } => "string_literal",
            ExprKind::MagicIdentifier { .. } => "magic_identifier",
            ExprKind::NilLiteral => "nil_literal",
            ExprKind::ArrayLiteral { .. } => "array_literal",
            ExprKind::DictionaryLiteral { .. } => "dictionary_literal",
            ExprKind::DeclRef { .. } => "decl_ref",
            ExprKind::OverloadedDeclRef { .. } => "overloaded_decl_ref",
            ExprKind::UnresolvedDot { .. } => "unresolved_dot",
            ExprKind::Subscript { .. } => "subscript",
            ExprKind::MemberRef { .. } => "member_ref",
            ExprKind::DynamicMemberRef { .. } => "dynamic_member_ref",
            ExprKind::DynamicSubscript { .. } => "dynamic_subscript",
            ExprKind::ConstructorRef { .. } => "constructor_ref",
            ExprKind::TupleElement { .. } => "tuple_element",
            ExprKind::KeyPath { .. } => "key_path",
            ExprKind::KeyPathApplication { .. } => "key_path_application",
            ExprKind::TypeExpr => "type_expr",
            ExprKind::SuperRef => "super_ref",
            ExprKind::OpaqueValue { .. } => "opaque_value",
            ExprKind::Call { .. } => "call",
            ExprKind::Paren { .. } => "paren",
            ExprKind::Tuple { .. } => "tuple",
            ExprKind::Closure { .. } => "closure",
            ExprKind::Cast { .. } => "cast",
            ExprKind::BindOptional { .. } => "bind_optional",
            ExprKind::OptionalEvaluation { .. } => "optional_evaluation",
            ExprKind::ForceValue { .. } => "force_value",
            ExprKind::Assign { .. } => "assign",
            ExprKind::InOut { .. } => "inout",
            ExprKind::Ternary { .. } => "ternary",
            ExprKind::DiscardAssignment => "discard_assignment",
            ExprKind::Try { .. } => "try",
            ExprKind::Load { .. } => "load",
            ExprKind::ArgumentShuffle { .. } => "argument_shuffle",
            ExprKind::DerivedToBase { .. } => "derived_to_base",
            ExprKind::ArchetypeToSuper { .. } => "archetype_to_super",
            ExprKind::Erasure { .. } => "erasure",
            ExprKind::AnyHashableErasure { .. } => "any_hashable_erasure",
            ExprKind::InjectIntoOptional { .. } => "inject_into_optional",
            ExprKind::FunctionConversion { .. } => "function_conversion",
            ExprKind::CovariantFunctionConversion { .. } => "covariant_function_conversion",
            ExprKind::CovariantReturnConversion { .. } => "covariant_return_conversion",
            ExprKind::AutoClosure { .. } => "autoclosure",
            ExprKind::MetatypeConversion { .. } => "metatype_conversion",
            ExprKind::ClassMetatypeToObject { .. } => "class_metatype_to_object",
            ExprKind::ExistentialMetatypeToObject { .. } => "existential_metatype_to_object",
            ExprKind::ProtocolMetatypeToObject { .. } => "protocol_metatype_to_object",
            ExprKind::CollectionUpcast { .. } => "collection_upcast",
            ExprKind::PointerConversion { .. } => "pointer_conversion",
            ExprKind::BridgeToForeign { .. } => "bridge_to_foreign",
            ExprKind::BridgeFromForeign { .. } => "bridge_from_foreign",
            ExprKind::ForeignObjectConversion { .. } => "foreign_object_conversion",
            ExprKind::UnresolvedTypeConversion { .. } => "unresolved_type_conversion",
            ExprKind::OpenExistential { .. } => "open_existential",
        }
    }

    /// Visits direct children in evaluation order.
    pub fn for_each_child<'e>(&'e self, f: &mut impl FnMut(&'e Expr)) {
        match self {
            ExprKind::IntegerLiteral { .. }
            | ExprKind::FloatLiteral { .. }
            | ExprKind::BooleanLiteral { .. }
            | ExprKind::StringLiteral { .. }
            | ExprKind::MagicIdentifier { .. }
            | ExprKind::NilLiteral
            | ExprKind::DeclRef { .. }
            | ExprKind::OverloadedDeclRef { .. }
            | ExprKind::TypeExpr
            | ExprKind::SuperRef
            | ExprKind::OpaqueValue { .. }
            | ExprKind::DiscardAssignment => {}
            ExprKind::ArrayLiteral { elements, .. } => elements.iter().for_each(f),
            ExprKind::Tuple { elements, .. } => elements.iter().for_each(f),
            ExprKind::DictionaryLiteral { entries, .. } => {
                for entry in entries {
                    f(&entry.key);
                    f(&entry.value);
                }
            }
            ExprKind::KeyPath { components, .. } => {
                components.iter().filter_map(|c| c.index.as_ref()).for_each(f)
            }
            ExprKind::Subscript { base, index, .. }
            | ExprKind::DynamicSubscript { base, index, .. } => {
                f(base);
                f(index);
            }
            ExprKind::KeyPathApplication { base, key_path } => {
                f(base);
                f(key_path);
            }
            ExprKind::Call { callee, args, .. } => {
                f(callee);
                f(args);
            }
            ExprKind::Closure { body, .. } => match body {
                ClosureBody::Expression { expr } => f(expr),
                ClosureBody::Statements { stmts } => {
                    for stmt in stmts {
                        match stmt {
                            Stmt::Expression { expr } => f(expr),
                            Stmt::Return { value } => value.iter().for_each(&mut *f),
                            Stmt::Binding { value, .. } => f(value),
                        }
                    }
                }
            },
            ExprKind::Assign { dest, source } => {
                f(dest);
                f(source);
            }
            ExprKind::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                f(condition);
                f(then_expr);
                f(else_expr);
            }
            ExprKind::ArgumentShuffle { shuffle } => {
                f(&shuffle.sub);
                shuffle.caller_defaults.iter().for_each(f);
            }
            ExprKind::CollectionUpcast {
                sub,
                key_conversion,
                value_conversion,
                ..
            } => {
                f(sub);
                if let Some(pair) = key_conversion {
                    f(&pair.conversion);
                }
                f(&value_conversion.conversion);
            }
            ExprKind::OpenExistential {
                existential, body, ..
            } => {
                f(existential);
                f(body);
            }
            ExprKind::UnresolvedDot { base, .. }
            | ExprKind::MemberRef { base, .. }
            | ExprKind::DynamicMemberRef { base, .. }
            | ExprKind::ConstructorRef { base, .. }
            | ExprKind::TupleElement { base, .. } => f(base),
            ExprKind::AutoClosure { body } => f(body),
            ExprKind::Paren { sub }
            | ExprKind::Cast { sub, .. }
            | ExprKind::BindOptional { sub, .. }
            | ExprKind::OptionalEvaluation { sub }
            | ExprKind::ForceValue { sub }
            | ExprKind::InOut { sub }
            | ExprKind::Try { sub, .. }
            | ExprKind::Load { sub }
            | ExprKind::DerivedToBase { sub }
            | ExprKind::ArchetypeToSuper { sub }
            | ExprKind::Erasure { sub, .. }
            | ExprKind::AnyHashableErasure { sub, .. }
            | ExprKind::InjectIntoOptional { sub }
            | ExprKind::FunctionConversion { sub }
            | ExprKind::CovariantFunctionConversion { sub }
            | ExprKind::CovariantReturnConversion { sub }
            | ExprKind::MetatypeConversion { sub }
            | ExprKind::ClassMetatypeToObject { sub }
            | ExprKind::ExistentialMetatypeToObject { sub }
            | ExprKind::ProtocolMetatypeToObject { sub }
            | ExprKind::PointerConversion { sub, .. }
            | ExprKind::BridgeToForeign { sub }
            | ExprKind::BridgeFromForeign { sub }
            | ExprKind::ForeignObjectConversion { sub }
            | ExprKind::UnresolvedTypeConversion { sub } => f(sub),
        }
    }

    pub fn for_each_child_mut<'e>(&'e mut self, f: &mut impl FnMut(&'e mut Expr)) {
        match self {
            ExprKind::IntegerLiteral { .. }
            | ExprKind::FloatLiteral { .. }
            | ExprKind::BooleanLiteral { .. }
            | ExprKind::StringLiteral { .. }
            | ExprKind::MagicIdentifier { .. }
            | ExprKind::NilLiteral
            | ExprKind::DeclRef { .. }
            | ExprKind::OverloadedDeclRef { .. }
            | ExprKind::TypeExpr
            | ExprKind::SuperRef
            | ExprKind::OpaqueValue { .. }
            | ExprKind::DiscardAssignment => {}
            ExprKind::ArrayLiteral { elements, .. } => elements.iter_mut().for_each(f),
            ExprKind::Tuple { elements, .. } => elements.iter_mut().for_each(f),
            ExprKind::DictionaryLiteral { entries, .. } => {
                for entry in entries {
                    f(&mut entry.key);
                    f(&mut entry.value);
                }
            }
            ExprKind::KeyPath { components, .. } => components
                .iter_mut()
                .filter_map(|c| c.index.as_mut())
                .for_each(f),
            ExprKind::Subscript { base, index, .. }
            | ExprKind::DynamicSubscript { base, index, .. } => {
                f(base);
                f(index);
            }
            ExprKind::KeyPathApplication { base, key_path } => {
                f(base);
                f(key_path);
            }
            ExprKind::Call { callee, args, .. } => {
                f(callee);
                f(args);
            }
            ExprKind::Closure { body, .. } => match body {
                ClosureBody::Expression { expr } => f(expr),
                ClosureBody::Statements { stmts } => {
                    for stmt in stmts {
                        match stmt {
                            Stmt::Expression { expr } => f(expr),
                            Stmt::Return { value } => value.iter_mut().for_each(&mut *f),
                            Stmt::Binding { value, .. } => f(value),
                        }
                    }
                }
            },
            ExprKind::Assign { dest, source } => {
                f(dest);
                f(source);
            }
            ExprKind::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                f(condition);
                f(then_expr);
                f(else_expr);
            }
            ExprKind::ArgumentShuffle { shuffle } => {
                f(&mut shuffle.sub);
                shuffle.caller_defaults.iter_mut().for_each(f);
            }
            ExprKind::CollectionUpcast {
                sub,
                key_conversion,
                value_conversion,
                ..
            } => {
                f(sub);
                if let Some(pair) = key_conversion {
                    f(&mut pair.conversion);
                }
                f(&mut value_conversion.conversion);
            }
            ExprKind::OpenExistential {
                existential, body, ..
            } => {
                f(existential);
                f(body);
            }
            ExprKind::UnresolvedDot { base, .. }
            | ExprKind::MemberRef { base, .. }
            | ExprKind::DynamicMemberRef { base, .. }
            | ExprKind::ConstructorRef { base, .. }
            | ExprKind::TupleElement { base, .. } => f(base),
            ExprKind::AutoClosure { body } => f(body),
            ExprKind::Paren { sub }
            | ExprKind::Cast { sub, .. }
            | ExprKind::BindOptional { sub, .. }
            | ExprKind::OptionalEvaluation { sub }
            | ExprKind::ForceValue { sub }
            | ExprKind::InOut { sub }
            | ExprKind::Try { sub, .. }
            | ExprKind::Load { sub }
            | ExprKind::DerivedToBase { sub }
            | ExprKind::ArchetypeToSuper { sub }
            | ExprKind::Erasure { sub, .. }
            | ExprKind::AnyHashableErasure { sub, .. }
            | ExprKind::InjectIntoOptional { sub }
            | ExprKind::FunctionConversion { sub }
            | ExprKind::CovariantFunctionConversion { sub }
            | ExprKind::CovariantReturnConversion { sub }
            | ExprKind::MetatypeConversion { sub }
            | ExprKind::ClassMetatypeToObject { sub }
            | ExprKind::ExistentialMetatypeToObject { sub }
            | ExprKind::ProtocolMetatypeToObject { sub }
            | ExprKind::PointerConversion { sub, .. }
            | ExprKind::BridgeToForeign { sub }
            | ExprKind::BridgeFromForeign { sub }
            | ExprKind::ForeignObjectConversion { sub }
            | ExprKind::UnresolvedTypeConversion { sub } => f(sub),
        }
    }
}
