use crate::decls::{DeclTable, KnownNominal};
use crate::types::{BuiltinType, FunctionType, OptionalKind, TupleElement, Type};

impl DeclTable {
    /// Source-level spelling of `ty`, used in diagnostics and tree dumps.
    pub fn type_name(&self, ty: &Type) -> String {
        let mut out = String::new();
        self.write_type(&mut out, ty);
        out
    }

    fn write_type(&self, out: &mut String, ty: &Type) {
        match ty {
            Type::Var(var) => out.push_str(&format!("$T{}", var.0)),
            Type::Nominal { decl, args } => {
                let nominal = self.nominal(*decl);
                match (nominal.known, args.as_slice()) {
                    (Some(KnownNominal::Array), [element]) => {
                        out.push('[');
                        self.write_type(out, element);
                        out.push(']');
                    }
                    (Some(KnownNominal::Dictionary), [key, value]) => {
                        out.push('[');
                        self.write_type(out, key);
                        out.push_str(": ");
                        self.write_type(out, value);
                        out.push(']');
                    }
                    _ => {
                        out.push_str(&nominal.name);
                        if !args.is_empty() {
                            out.push('<');
                            for (index, arg) in args.iter().enumerate() {
                                if index > 0 {
                                    out.push_str(", ");
                                }
                                self.write_type(out, arg);
                            }
                            out.push('>');
                        }
                    }
                }
            }
            Type::Tuple(elements) => self.write_tuple(out, elements),
            Type::Function(function) => self.write_function(out, function),
            Type::Metatype(instance) => {
                self.write_postfix_operand(out, instance);
                out.push_str(".Type");
            }
            Type::ExistentialMetatype(instance) => {
                self.write_postfix_operand(out, instance);
                out.push_str(".Type");
            }
            Type::Existential(protocols) => {
                if protocols.is_empty() {
                    out.push_str("Any");
                }
                for (index, protocol) in protocols.iter().enumerate() {
                    if index > 0 {
                        out.push_str(" & ");
                    }
                    out.push_str(&self.protocol(*protocol).name);
                }
            }
            Type::Archetype(id) => {
                let archetype = self.archetype(*id);
                match &archetype.opened_from {
                    Some(existential) => {
                        out.push_str("@opened ");
                        self.write_type(out, existential);
                    }
                    None => out.push_str(&archetype.name),
                }
            }
            Type::Optional { kind, object } => {
                self.write_postfix_operand(out, object);
                out.push(match kind {
                    OptionalKind::Optional => '?',
                    OptionalKind::ImplicitlyUnwrapped => '!',
                });
            }
            Type::LValue(object) => {
                out.push_str("@lvalue ");
                self.write_type(out, object);
            }
            Type::InOut(object) => {
                out.push_str("inout ");
                self.write_type(out, object);
            }
            Type::DynamicSelf(_) => out.push_str("Self"),
            Type::Builtin(builtin) => match builtin {
                BuiltinType::Integer { width } => out.push_str(&format!("Builtin.Int{width}")),
                BuiltinType::Float { kind } => {
                    out.push_str("Builtin.");
                    out.push_str(kind.builtin_name());
                }
                BuiltinType::RawPointer => out.push_str("Builtin.RawPointer"),
                BuiltinType::Word => out.push_str("Builtin.Word"),
            },
            Type::Unresolved => out.push('_'),
        }
    }

    // Postfix sugar (`?`, `!`, `.Type`) binds tighter than functions and compositions.
    fn write_postfix_operand(&self, out: &mut String, ty: &Type) {
        let needs_parens = match ty {
            Type::Function(_) => true,
            Type::Existential(protocols) => protocols.len() > 1,
            _ => false,
        };
        if needs_parens {
            out.push('(');
            self.write_type(out, ty);
            out.push(')');
        } else {
            self.write_type(out, ty);
        }
    }

    fn write_tuple(&self, out: &mut String, elements: &[TupleElement]) {
        out.push('(');
        for (index, element) in elements.iter().enumerate() {
            if index > 0 {
                out.push_str(", ");
            }
            if let Some(label) = &element.label {
                out.push_str(label);
                out.push_str(": ");
            }
            self.write_type(out, &element.ty);
            if element.variadic {
                out.push_str("...");
            }
        }
        out.push(')');
    }

    fn write_function(&self, out: &mut String, function: &FunctionType) {
        if function.autoclosure {
            out.push_str("@autoclosure ");
        }
        out.push('(');
        for (index, param) in function.params.iter().enumerate() {
            if index > 0 {
                out.push_str(", ");
            }
            if let Some(label) = &param.label {
                out.push_str(label);
                out.push_str(": ");
            }
            self.write_type(out, &param.ty);
            if param.variadic {
                out.push_str("...");
            }
        }
        out.push(')');
        if function.throws {
            out.push_str(" throws");
        }
        out.push_str(" -> ");
        self.write_type(out, &function.result);
    }
}
