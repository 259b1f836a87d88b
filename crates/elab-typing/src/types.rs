use serde::{Deserialize, Serialize};

use crate::decls::{ArchetypeId, NominalId, ProtocolId};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeVarId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionalKind {
    Optional,
    ImplicitlyUnwrapped,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionRepresentation {
    #[default]
    Native,
    Block,
    CFunctionPointer,
    Thin,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FloatKind {
    Fp16,
    Fp32,
    Fp64,
    Fp80,
    Fp128,
}

impl FloatKind {
    pub fn builtin_name(self) -> &'static str {
        match self {
            FloatKind::Fp16 => "FPIEEE16",
            FloatKind::Fp32 => "FPIEEE32",
            FloatKind::Fp64 => "FPIEEE64",
            FloatKind::Fp80 => "FPIEEE80",
            FloatKind::Fp128 => "FPIEEE128",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "builtin", rename_all = "snake_case")]
pub enum BuiltinType {
    Integer { width: u32 },
    Float { kind: FloatKind },
    RawPointer,
    Word,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TupleElement {
    #[serde(default)]
    pub label: Option<String>,
    pub ty: Type,
    #[serde(default)]
    pub variadic: bool,
}

impl TupleElement {
    pub fn unlabeled(ty: Type) -> Self {
        Self {
            label: None,
            ty,
            variadic: false,
        }
    }

    pub fn labeled(label: &str, ty: Type) -> Self {
        Self {
            label: Some(label.to_string()),
            ty,
            variadic: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionParam {
    #[serde(default)]
    pub label: Option<String>,
    pub ty: Type,
    #[serde(default)]
    pub variadic: bool,
    #[serde(default)]
    pub autoclosure: bool,
}

impl FunctionParam {
    pub fn new(label: Option<&str>, ty: Type) -> Self {
        Self {
            label: label.map(str::to_string),
            ty,
            variadic: false,
            autoclosure: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionType {
    pub params: Vec<FunctionParam>,
    pub result: Type,
    #[serde(default)]
    pub representation: FunctionRepresentation,
    #[serde(default)]
    pub no_escape: bool,
    #[serde(default)]
    pub throws: bool,
    /// Set on the type of an `@autoclosure` parameter.
    #[serde(default)]
    pub autoclosure: bool,
}

impl FunctionType {
    pub fn new(params: Vec<FunctionParam>, result: Type) -> Self {
        Self {
            params,
            result,
            representation: FunctionRepresentation::Native,
            no_escape: false,
            throws: false,
            autoclosure: false,
        }
    }

    /// The parameter list seen as the tuple type an argument list must have.
    pub fn input_tuple(&self) -> Type {
        Type::Tuple(
            self.params
                .iter()
                .map(|param| TupleElement {
                    label: param.label.clone(),
                    ty: param.ty.clone(),
                    variadic: param.variadic,
                })
                .collect(),
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    Var(TypeVarId),
    Nominal {
        decl: NominalId,
        #[serde(default)]
        args: Vec<Type>,
    },
    Tuple(Vec<TupleElement>),
    Function(Box<FunctionType>),
    Metatype(Box<Type>),
    ExistentialMetatype(Box<Type>),
    /// Protocol composition. The empty composition is `Any`.
    Existential(Vec<ProtocolId>),
    Archetype(ArchetypeId),
    Optional {
        kind: OptionalKind,
        object: Box<Type>,
    },
    LValue(Box<Type>),
    InOut(Box<Type>),
    DynamicSelf(Box<Type>),
    Builtin(BuiltinType),
    Unresolved,
}

impl Type {
    pub fn nominal(decl: NominalId) -> Type {
        Type::Nominal {
            decl,
            args: Vec::new(),
        }
    }

    pub fn generic(decl: NominalId, args: Vec<Type>) -> Type {
        Type::Nominal { decl, args }
    }

    pub fn void() -> Type {
        Type::Tuple(Vec::new())
    }

    pub fn any() -> Type {
        Type::Existential(Vec::new())
    }

    pub fn optional(object: Type) -> Type {
        Type::Optional {
            kind: OptionalKind::Optional,
            object: Box::new(object),
        }
    }

    pub fn implicitly_unwrapped(object: Type) -> Type {
        Type::Optional {
            kind: OptionalKind::ImplicitlyUnwrapped,
            object: Box::new(object),
        }
    }

    pub fn optional_of_kind(kind: OptionalKind, object: Type) -> Type {
        Type::Optional {
            kind,
            object: Box::new(object),
        }
    }

    pub fn lvalue(object: Type) -> Type {
        Type::LValue(Box::new(object))
    }

    pub fn inout(object: Type) -> Type {
        Type::InOut(Box::new(object))
    }

    pub fn metatype(instance: Type) -> Type {
        Type::Metatype(Box::new(instance))
    }

    pub fn function(params: Vec<FunctionParam>, result: Type) -> Type {
        Type::Function(Box::new(FunctionType::new(params, result)))
    }

    pub fn builtin_integer(width: u32) -> Type {
        Type::Builtin(BuiltinType::Integer { width })
    }

    pub fn builtin_float(kind: FloatKind) -> Type {
        Type::Builtin(BuiltinType::Float { kind })
    }

    pub fn is_lvalue(&self) -> bool {
        matches!(self, Type::LValue(_))
    }

    /// Strips one level of `@lvalue`.
    pub fn rvalue(&self) -> &Type {
        match self {
            Type::LValue(object) => object,
            other => other,
        }
    }

    pub fn optional_object(&self) -> Option<(OptionalKind, &Type)> {
        match self {
            Type::Optional { kind, object } => Some((*kind, object)),
            _ => None,
        }
    }

    /// Number of optional layers and the innermost payload.
    pub fn look_through_optionals(&self) -> (usize, &Type) {
        let mut depth = 0;
        let mut current = self;
        while let Type::Optional { object, .. } = current {
            depth += 1;
            current = object;
        }
        (depth, current)
    }

    pub fn as_function(&self) -> Option<&FunctionType> {
        match self {
            Type::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn tuple_elements(&self) -> Option<&[TupleElement]> {
        match self {
            Type::Tuple(elements) => Some(elements),
            _ => None,
        }
    }

    pub fn metatype_instance(&self) -> Option<&Type> {
        match self {
            Type::Metatype(instance) | Type::ExistentialMetatype(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn is_existential(&self) -> bool {
        matches!(self, Type::Existential(_))
    }

    /// Existential values and existential metatypes, the things that can be opened.
    pub fn is_any_existential(&self) -> bool {
        match self {
            Type::Existential(_) | Type::ExistentialMetatype(_) => true,
            Type::Metatype(instance) => instance.is_existential(),
            _ => false,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Type::Unresolved)
    }

    /// Rebuilds the type bottom-up; `f` may replace any node before its children are visited.
    pub fn transform(&self, f: &mut impl FnMut(&Type) -> Option<Type>) -> Type {
        if let Some(replaced) = f(self) {
            return replaced;
        }
        match self {
            Type::Var(_)
            | Type::Archetype(_)
            | Type::Builtin(_)
            | Type::Existential(_)
            | Type::Unresolved => self.clone(),
            Type::Nominal { decl, args } => Type::Nominal {
                decl: *decl,
                args: args.iter().map(|arg| arg.transform(f)).collect(),
            },
            Type::Tuple(elements) => Type::Tuple(
                elements
                    .iter()
                    .map(|element| TupleElement {
                        label: element.label.clone(),
                        ty: element.ty.transform(f),
                        variadic: element.variadic,
                    })
                    .collect(),
            ),
            Type::Function(function) => Type::Function(Box::new(FunctionType {
                params: function
                    .params
                    .iter()
                    .map(|param| FunctionParam {
                        label: param.label.clone(),
                        ty: param.ty.transform(f),
                        variadic: param.variadic,
                        autoclosure: param.autoclosure,
                    })
                    .collect(),
                result: function.result.transform(f),
                representation: function.representation,
                no_escape: function.no_escape,
                throws: function.throws,
                autoclosure: function.autoclosure,
            })),
            Type::Metatype(instance) => Type::Metatype(Box::new(instance.transform(f))),
            Type::ExistentialMetatype(instance) => {
                Type::ExistentialMetatype(Box::new(instance.transform(f)))
            }
            Type::Optional { kind, object } => Type::Optional {
                kind: *kind,
                object: Box::new(object.transform(f)),
            },
            Type::LValue(object) => Type::LValue(Box::new(object.transform(f))),
            Type::InOut(object) => Type::InOut(Box::new(object.transform(f))),
            Type::DynamicSelf(inner) => Type::DynamicSelf(Box::new(inner.transform(f))),
        }
    }

    pub fn any_node(&self, pred: &mut impl FnMut(&Type) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        match self {
            Type::Var(_)
            | Type::Archetype(_)
            | Type::Builtin(_)
            | Type::Existential(_)
            | Type::Unresolved => false,
            Type::Nominal { args, .. } => args.iter().any(|arg| arg.any_node(pred)),
            Type::Tuple(elements) => elements.iter().any(|element| element.ty.any_node(pred)),
            Type::Function(function) => {
                function.params.iter().any(|param| param.ty.any_node(pred))
                    || function.result.any_node(pred)
            }
            Type::Metatype(inner)
            | Type::ExistentialMetatype(inner)
            | Type::LValue(inner)
            | Type::InOut(inner)
            | Type::DynamicSelf(inner) => inner.any_node(pred),
            Type::Optional { object, .. } => object.any_node(pred),
        }
    }

    pub fn has_type_variables(&self) -> bool {
        self.any_node(&mut |ty| matches!(ty, Type::Var(_)))
    }

    pub fn mentions_archetype(&self, archetype: ArchetypeId) -> bool {
        self.any_node(&mut |ty| matches!(ty, Type::Archetype(id) if *id == archetype))
    }

    pub fn has_dynamic_self(&self) -> bool {
        self.any_node(&mut |ty| matches!(ty, Type::DynamicSelf(_)))
    }

    pub fn subst(&self, map: &SubstitutionMap) -> Type {
        if map.is_empty() {
            return self.clone();
        }
        self.transform(&mut |ty| match ty {
            Type::Archetype(id) => map.get(*id).cloned(),
            _ => None,
        })
    }

    /// Replaces every `Self` occurrence with `replacement`.
    pub fn replace_dynamic_self(&self, replacement: &Type) -> Type {
        self.transform(&mut |ty| match ty {
            Type::DynamicSelf(_) => Some(replacement.clone()),
            _ => None,
        })
    }

    /// Replaces every `Self` occurrence with the class it was declared on.
    pub fn strip_dynamic_self(&self) -> Type {
        self.transform(&mut |ty| match ty {
            Type::DynamicSelf(inner) => Some(inner.strip_dynamic_self()),
            _ => None,
        })
    }

    /// Replaces an opened archetype with the existential it was opened from.
    /// A metatype of the archetype becomes the existential metatype.
    pub fn erase_opened(&self, archetype: ArchetypeId, existential: &Type) -> Type {
        self.transform(&mut |ty| match ty {
            Type::Archetype(id) if *id == archetype => Some(existential.clone()),
            Type::Metatype(instance) if matches!(**instance, Type::Archetype(id) if id == archetype) => {
                Some(Type::ExistentialMetatype(Box::new(existential.clone())))
            }
            _ => None,
        })
    }
}

/// Generic parameter bindings for one reference.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubstitutionMap {
    entries: Vec<(ArchetypeId, Type)>,
}

impl SubstitutionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (ArchetypeId, Type)>) -> Self {
        let mut map = Self::new();
        for (archetype, ty) in pairs {
            map.insert(archetype, ty);
        }
        map
    }

    pub fn insert(&mut self, archetype: ArchetypeId, ty: Type) {
        match self.entries.iter_mut().find(|(id, _)| *id == archetype) {
            Some(entry) => entry.1 = ty,
            None => self.entries.push((archetype, ty)),
        }
    }

    pub fn get(&self, archetype: ArchetypeId) -> Option<&Type> {
        self.entries
            .iter()
            .find(|(id, _)| *id == archetype)
            .map(|(_, ty)| ty)
    }

    pub fn contains(&self, archetype: ArchetypeId) -> bool {
        self.get(archetype).is_some()
    }

    pub fn extend(&mut self, other: &SubstitutionMap) {
        for (archetype, ty) in &other.entries {
            self.insert(*archetype, ty.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArchetypeId, &Type)> {
        self.entries.iter().map(|(id, ty)| (*id, ty))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
