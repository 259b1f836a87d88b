use elab_typing::{ConformanceRef, DeclTable, LiteralValue, SubstitutionMap};

use crate::expr::{AccessSemantics, BuiltinInit, ClosureBody, Expr, ExprKind, StringEncoding};
use crate::shuffle::ShuffleSource;

/// Renders an expression tree as an indented S-expression, one node per line.
pub fn dump_expr(expr: &Expr, decls: &DeclTable) -> String {
    let mut out = String::new();
    Printer { decls, out: &mut out }.node(expr, 0);
    out
}

struct Printer<'a> {
    decls: &'a DeclTable,
    out: &'a mut String,
}

impl Printer<'_> {
    fn node(&mut self, expr: &Expr, indent: usize) {
        for _ in 0..indent {
            self.out.push_str("  ");
        }
        self.out.push('(');
        self.out.push_str(expr.kind.name());
        if expr.implicit {
            self.out.push_str(" implicit");
        }
        self.out.push_str(" type='");
        self.out.push_str(&self.decls.type_name(&expr.ty));
        self.out.push('\'');
        self.attributes(&expr.kind);
        for child in expr.children() {
            self.out.push('\n');
            self.node(child, indent + 1);
        }
        self.out.push(')');
    }

    fn attr(&mut self, name: &str, value: impl std::fmt::Display) {
        self.out.push_str(&format!(" {name}={value}"));
    }

    fn attributes(&mut self, kind: &ExprKind) {
        match kind {
            ExprKind::IntegerLiteral {
                text,
                negative,
                builtin,
            }
            | ExprKind::FloatLiteral {
                text,
                negative,
                builtin,
            } => {
                let sign = if *negative { "-" } else { "" };
                self.attr("value", format!("{sign}{text}"));
                self.builtin(builtin.as_ref());
            }
            ExprKind::BooleanLiteral { value, builtin } => {
                self.attr("value", value);
                self.builtin(builtin.as_ref());
            }
            ExprKind::StringLiteral {
                value,
                encoding,
                builtin,
            } => {
                self.attr("value", format!("{value:?}"));
                self.encoding(*encoding);
                self.builtin(builtin.as_ref());
            }
            ExprKind::MagicIdentifier {
                magic,
                value,
                encoding,
                builtin,
            } => {
                self.attr("magic", magic.spelling());
                if let Some(value) = value {
                    let value = match value {
                        LiteralValue::Integer(text) | LiteralValue::Float(text) => text.clone(),
                        LiteralValue::Boolean(flag) => flag.to_string(),
                        LiteralValue::String(text) => format!("{text:?}"),
                    };
                    self.attr("value", value);
                }
                self.encoding(*encoding);
                self.builtin(builtin.as_ref());
            }
            ExprKind::ArrayLiteral { initializer, .. }
            | ExprKind::DictionaryLiteral { initializer, .. } => {
                if let Some(decl) = initializer {
                    self.attr("initializer", self.decls.value(*decl).full_name());
                }
            }
            ExprKind::DeclRef {
                name,
                decl,
                semantics,
                substitutions,
            } => {
                match decl {
                    Some(decl) => self.decl_attr(*decl),
                    None => self.attr("name", name),
                }
                self.semantics(*semantics);
                self.substitutions(substitutions);
            }
            ExprKind::OverloadedDeclRef { name, candidates } => {
                self.attr("name", name);
                self.attr("candidates", candidates.len());
            }
            ExprKind::UnresolvedDot { name, .. } => self.attr("name", name),
            ExprKind::Subscript {
                decl,
                semantics,
                substitutions,
                ..
            } => {
                if let Some(decl) = decl {
                    self.decl_attr(*decl);
                }
                self.semantics(*semantics);
                self.substitutions(substitutions);
            }
            ExprKind::MemberRef {
                decl,
                semantics,
                substitutions,
                ..
            } => {
                self.decl_attr(*decl);
                self.semantics(*semantics);
                self.substitutions(substitutions);
            }
            ExprKind::DynamicMemberRef { decl, .. } | ExprKind::DynamicSubscript { decl, .. } => {
                self.decl_attr(*decl)
            }
            ExprKind::ConstructorRef {
                decl,
                substitutions,
                ..
            } => {
                self.decl_attr(*decl);
                self.substitutions(substitutions);
            }
            ExprKind::TupleElement { index, .. } => self.attr("index", index),
            ExprKind::KeyPath { root, components } => {
                self.attr("root", format!("'{}'", self.decls.type_name(root)));
                self.attr("components", components.len());
            }
            ExprKind::OpaqueValue { opaque } | ExprKind::OpenExistential { opaque, .. } => {
                self.attr("opaque", opaque.0)
            }
            ExprKind::Call {
                trailing_closure, ..
            } => {
                if *trailing_closure {
                    self.out.push_str(" trailing_closure");
                }
            }
            ExprKind::Tuple { labels, .. } => {
                if labels.iter().any(Option::is_some) {
                    let labels: String = labels
                        .iter()
                        .map(|label| format!("{}:", label.as_deref().unwrap_or("_")))
                        .collect();
                    self.attr("labels", labels);
                }
            }
            ExprKind::Closure { params, body } => {
                let params: Vec<String> = params
                    .iter()
                    .map(|param| format!("{}: {}", param.name, self.decls.type_name(&param.ty)))
                    .collect();
                self.attr("params", format!("({})", params.join(", ")));
                if matches!(body, ClosureBody::Statements { .. }) {
                    self.out.push_str(" statements");
                }
            }
            ExprKind::Cast {
                target,
                form,
                classified,
                ..
            } => {
                self.attr("form", form.keyword());
                self.attr("target", format!("'{}'", self.decls.type_name(target)));
                if let Some(kind) = classified {
                    self.attr("kind", format!("{kind:?}"));
                }
            }
            ExprKind::BindOptional { depth, .. } => self.attr("depth", depth),
            ExprKind::Try { form, .. } => self.attr("form", format!("{form:?}")),
            ExprKind::ArgumentShuffle { shuffle } => {
                let mapping: Vec<String> = shuffle
                    .mapping
                    .iter()
                    .map(|source| match source {
                        ShuffleSource::Arg { index } => index.to_string(),
                        ShuffleSource::Variadic => "variadic".to_string(),
                        ShuffleSource::CallerDefault { index } => format!("caller_default#{index}"),
                        ShuffleSource::CalleeDefault => "callee_default".to_string(),
                    })
                    .collect();
                self.attr("mapping", format!("[{}]", mapping.join(", ")));
                if !shuffle.variadic_args.is_empty() {
                    let args: Vec<String> =
                        shuffle.variadic_args.iter().map(u32::to_string).collect();
                    self.attr("variadic_args", format!("[{}]", args.join(", ")));
                }
                if let Some(ty) = &shuffle.variadic_type {
                    self.attr("variadic_type", format!("'{}'", self.decls.type_name(ty)));
                }
                if shuffle.source_is_scalar {
                    self.out.push_str(" scalar");
                }
            }
            ExprKind::Erasure { conformances, .. } => {
                let names: Vec<String> = conformances
                    .iter()
                    .map(|conformance| self.conformance_name(*conformance))
                    .collect();
                self.attr("conformances", format!("[{}]", names.join(", ")));
            }
            ExprKind::AnyHashableErasure { conformance, .. } => {
                let name = self.conformance_name(*conformance);
                self.attr("conformance", name);
            }
            ExprKind::CollectionUpcast {
                key_conversion,
                value_conversion,
                bridged,
                ..
            } => {
                if let Some(pair) = key_conversion {
                    self.attr("key_opaque", pair.placeholder.0);
                }
                self.attr("value_opaque", value_conversion.placeholder.0);
                if *bridged {
                    self.out.push_str(" bridged");
                }
            }
            ExprKind::PointerConversion { conversion, .. } => {
                self.attr("conversion", format!("{conversion:?}"))
            }
            _ => {}
        }
    }

    fn decl_attr(&mut self, decl: elab_typing::DeclId) {
        let name = self.decls.value(decl).full_name();
        self.attr("decl", name);
    }

    fn builtin(&mut self, builtin: Option<&BuiltinInit>) {
        if let Some(builtin) = builtin {
            self.attr("builtin", self.decls.value(builtin.initializer).full_name());
            self.attr("payload", format!("'{}'", self.decls.type_name(&builtin.payload)));
            if builtin.sugared_default {
                self.out.push_str(" default_literal_type");
            }
        }
    }

    fn encoding(&mut self, encoding: Option<StringEncoding>) {
        match encoding {
            Some(StringEncoding::Utf8 { is_ascii: true }) => self.attr("encoding", "utf8-ascii"),
            Some(StringEncoding::Utf8 { is_ascii: false }) => self.attr("encoding", "utf8"),
            Some(StringEncoding::Utf16) => self.attr("encoding", "utf16"),
            Some(StringEncoding::ConstantUtf8) => self.attr("encoding", "const-utf8"),
            None => {}
        }
    }

    fn semantics(&mut self, semantics: AccessSemantics) {
        match semantics {
            AccessSemantics::Ordinary => {}
            AccessSemantics::DirectToStorage => self.out.push_str(" direct_to_storage"),
            AccessSemantics::DirectToAccessor => self.out.push_str(" direct_to_accessor"),
        }
    }

    fn substitutions(&mut self, substitutions: &SubstitutionMap) {
        if substitutions.is_empty() {
            return;
        }
        let pairs: Vec<String> = substitutions
            .iter()
            .map(|(archetype, ty)| {
                format!(
                    "{} := {}",
                    self.decls.archetype(archetype).name,
                    self.decls.type_name(ty)
                )
            })
            .collect();
        self.attr("subs", format!("[{}]", pairs.join(", ")));
    }

    fn conformance_name(&self, conformance: ConformanceRef) -> String {
        let protocol = match conformance {
            ConformanceRef::Concrete(id) => self.decls.conformance(id).protocol,
            ConformanceRef::Abstract(protocol) => protocol,
        };
        self.decls.protocol(protocol).name.clone()
    }
}
