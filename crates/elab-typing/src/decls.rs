use serde::{Deserialize, Serialize};

use crate::types::{FunctionParam, FunctionType, SubstitutionMap, Type};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NominalId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeclId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchetypeId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConformanceId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NominalKind {
    Struct,
    Enum,
    Class,
}

/// Library types the elaborator needs to find by role rather than by name.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnownNominal {
    Int,
    Double,
    Float,
    Bool,
    String,
    Character,
    UnicodeScalar,
    StaticString,
    Array,
    Dictionary,
    Set,
    AnyHashable,
    UnsafePointer,
    UnsafeMutablePointer,
    UnsafeRawPointer,
    NSObject,
    NSString,
    NSNumber,
    NSArray,
    NSDictionary,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnownProtocol {
    AnyObject,
    Equatable,
    Hashable,
    ExpressibleByIntegerLiteral,
    BuiltinIntegerLiteral,
    ExpressibleByFloatLiteral,
    BuiltinFloatLiteral,
    ExpressibleByBooleanLiteral,
    BuiltinBooleanLiteral,
    ExpressibleByStringLiteral,
    BuiltinStringLiteral,
    BuiltinUtf16StringLiteral,
    BuiltinConstStringLiteral,
    ExpressibleByExtendedGraphemeClusterLiteral,
    BuiltinExtendedGraphemeClusterLiteral,
    ExpressibleByUnicodeScalarLiteral,
    BuiltinUnicodeScalarLiteral,
    ExpressibleByNilLiteral,
    ExpressibleByArrayLiteral,
    ExpressibleByDictionaryLiteral,
    ForeignBridgeable,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NominalDecl {
    pub name: String,
    pub kind: NominalKind,
    #[serde(default)]
    pub generic_params: Vec<ArchetypeId>,
    #[serde(default)]
    pub superclass: Option<Type>,
    #[serde(default)]
    pub is_final: bool,
    /// Declared by the foreign runtime rather than natively.
    #[serde(default)]
    pub foreign: bool,
    #[serde(default)]
    pub known: Option<KnownNominal>,
}

impl NominalDecl {
    pub fn new(name: &str, kind: NominalKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            generic_params: Vec::new(),
            superclass: None,
            is_final: false,
            foreign: false,
            known: None,
        }
    }

    pub fn is_class(&self) -> bool {
        self.kind == NominalKind::Class
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProtocolDecl {
    pub name: String,
    /// The archetype standing for `Self` inside requirement signatures.
    pub self_param: ArchetypeId,
    #[serde(default)]
    pub inherits: Vec<ProtocolId>,
    #[serde(default)]
    pub class_bound: bool,
    #[serde(default)]
    pub associated_types: Vec<AssociatedType>,
    #[serde(default)]
    pub requirements: Vec<DeclId>,
    /// Default literal type, only set on literal protocols.
    #[serde(default)]
    pub default_type: Option<Type>,
    #[serde(default)]
    pub known: Option<KnownProtocol>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssociatedType {
    pub name: String,
    /// Placeholder used for the associated type inside requirement signatures.
    pub archetype: ArchetypeId,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeDecl {
    pub name: String,
    #[serde(default)]
    pub conforms_to: Vec<ProtocolId>,
    #[serde(default)]
    pub superclass: Option<Type>,
    /// Set for archetypes that stand in for an opened existential.
    #[serde(default)]
    pub opened_from: Option<Type>,
}

impl ArchetypeDecl {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            conforms_to: Vec::new(),
            superclass: None,
            opened_from: None,
        }
    }

    pub fn opened(existential: Type) -> Self {
        let conforms_to = match &existential {
            Type::Existential(protocols) => protocols.clone(),
            _ => Vec::new(),
        };
        Self {
            name: "@opened".to_string(),
            conforms_to,
            superclass: None,
            opened_from: Some(existential),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclContext {
    TopLevel,
    Nominal(NominalId),
    Protocol(ProtocolId),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Var,
    Func,
    Initializer,
    Deinitializer,
    Subscript,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    #[default]
    Stored,
    Computed,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "literal", content = "value", rename_all = "snake_case")]
pub enum LiteralValue {
    Integer(String),
    Float(String),
    Boolean(bool),
    String(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultArgument {
    #[default]
    None,
    /// Evaluated by the callee.
    Normal,
    /// Same default as the overridden declaration.
    Inherited,
    Line,
    Column,
    File,
    Function,
    Nil,
    EmptyArray,
    EmptyDictionary,
    /// A literal default that callers materialize themselves.
    StoredLiteral(LiteralValue),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamDecl {
    #[serde(default)]
    pub label: Option<String>,
    pub name: String,
    pub ty: Type,
    #[serde(default)]
    pub variadic: bool,
    #[serde(default)]
    pub autoclosure: bool,
    #[serde(default)]
    pub default: DefaultArgument,
}

impl ParamDecl {
    pub fn new(label: Option<&str>, name: &str, ty: Type) -> Self {
        Self {
            label: label.map(str::to_string),
            name: name.to_string(),
            ty,
            variadic: false,
            autoclosure: false,
            default: DefaultArgument::None,
        }
    }

    pub fn with_default(mut self, default: DefaultArgument) -> Self {
        self.default = default;
        self
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    pub fn function_param(&self) -> FunctionParam {
        let ty = if self.autoclosure {
            let mut closure = FunctionType::new(Vec::new(), self.ty.clone());
            closure.autoclosure = true;
            closure.no_escape = true;
            Type::Function(Box::new(closure))
        } else {
            self.ty.clone()
        };
        FunctionParam {
            label: self.label.clone(),
            ty,
            variadic: self.variadic,
            autoclosure: self.autoclosure,
        }
    }
}

/// A named value: variable, function, initializer or subscript.
///
/// `ty` is the interface type seen through an instance: a variable's value
/// type, or for functions, initializers and subscripts the function type of
/// the (single) parameter list after `self` has been applied. Initializers
/// of classes return `DynamicSelf` of the class.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValueDecl {
    pub name: String,
    pub kind: ValueKind,
    pub context: DeclContext,
    pub ty: Type,
    #[serde(default)]
    pub generic_params: Vec<ArchetypeId>,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_mutating: bool,
    #[serde(default)]
    pub is_operator: bool,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub settable: bool,
    #[serde(default)]
    pub storage: StorageKind,
    /// Visible to dynamic (`AnyObject`) lookup.
    #[serde(default)]
    pub dynamic_lookup: bool,
    #[serde(default)]
    pub overridden: Option<DeclId>,
}

impl ValueDecl {
    pub fn var(name: &str, context: DeclContext, ty: Type) -> Self {
        Self::new(name, ValueKind::Var, context, ty, Vec::new())
    }

    pub fn func(name: &str, context: DeclContext, params: Vec<ParamDecl>, result: Type) -> Self {
        let ty = Type::function(params.iter().map(ParamDecl::function_param).collect(), result);
        Self::new(name, ValueKind::Func, context, ty, params)
    }

    pub fn initializer(context: DeclContext, params: Vec<ParamDecl>, result: Type) -> Self {
        let ty = Type::function(params.iter().map(ParamDecl::function_param).collect(), result);
        Self::new("init", ValueKind::Initializer, context, ty, params)
    }

    pub fn subscript(context: DeclContext, params: Vec<ParamDecl>, element: Type) -> Self {
        let ty = Type::function(params.iter().map(ParamDecl::function_param).collect(), element);
        Self::new("subscript", ValueKind::Subscript, context, ty, params)
    }

    fn new(name: &str, kind: ValueKind, context: DeclContext, ty: Type, params: Vec<ParamDecl>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            context,
            ty,
            generic_params: Vec::new(),
            params,
            is_static: false,
            is_mutating: false,
            is_operator: false,
            is_required: false,
            settable: false,
            storage: StorageKind::Stored,
            dynamic_lookup: false,
            overridden: None,
        }
    }

    pub fn is_member(&self) -> bool {
        !matches!(self.context, DeclContext::TopLevel)
    }

    pub fn is_storage(&self) -> bool {
        matches!(self.kind, ValueKind::Var | ValueKind::Subscript)
    }

    /// Full name with argument labels, e.g. `init(integerLiteral:)`.
    pub fn full_name(&self) -> String {
        if self.kind == ValueKind::Var {
            return self.name.clone();
        }
        let labels: String = self
            .params
            .iter()
            .map(|param| format!("{}:", param.label.as_deref().unwrap_or("_")))
            .collect();
        format!("{}({labels})", self.name)
    }

    /// Applications needed before a reference through an opened existential
    /// is complete: one for `self`, one more for a member's own parameter list.
    pub fn natural_argument_count(&self) -> u32 {
        match self.kind {
            ValueKind::Var | ValueKind::Subscript => 1,
            ValueKind::Func | ValueKind::Initializer | ValueKind::Deinitializer => {
                if self.is_member() { 2 } else { 1 }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conformance {
    pub nominal: NominalId,
    pub protocol: ProtocolId,
    /// Requirement to witness.
    #[serde(default)]
    pub witnesses: Vec<(DeclId, DeclId)>,
    /// Associated type name to its binding, in terms of the nominal's generic parameters.
    #[serde(default)]
    pub type_witnesses: Vec<(String, Type)>,
}

impl Conformance {
    pub fn witness(&self, requirement: DeclId) -> Option<DeclId> {
        self.witnesses
            .iter()
            .find(|(req, _)| *req == requirement)
            .map(|(_, witness)| *witness)
    }

    pub fn type_witness(&self, name: &str) -> Option<&Type> {
        self.type_witnesses
            .iter()
            .find(|(assoc, _)| assoc == name)
            .map(|(_, ty)| ty)
    }
}

/// How a type satisfies a protocol: through a recorded conformance, or
/// abstractly (archetypes, existentials, and the implicit class conformance
/// to `AnyObject`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConformanceRef {
    Concrete(ConformanceId),
    Abstract(ProtocolId),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeclTable {
    nominals: Vec<NominalDecl>,
    protocols: Vec<ProtocolDecl>,
    values: Vec<ValueDecl>,
    archetypes: Vec<ArchetypeDecl>,
    conformances: Vec<Conformance>,
}

impl DeclTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_nominal(&mut self, decl: NominalDecl) -> NominalId {
        self.nominals.push(decl);
        NominalId(self.nominals.len() as u32 - 1)
    }

    pub fn add_protocol(&mut self, decl: ProtocolDecl) -> ProtocolId {
        self.protocols.push(decl);
        ProtocolId(self.protocols.len() as u32 - 1)
    }

    /// Declares a protocol together with its `Self` archetype.
    pub fn declare_protocol(&mut self, name: &str, inherits: Vec<ProtocolId>) -> ProtocolId {
        let id = ProtocolId(self.protocols.len() as u32);
        let mut self_archetype = ArchetypeDecl::new("Self");
        self_archetype.conforms_to.push(id);
        let self_param = self.add_archetype(self_archetype);
        self.add_protocol(ProtocolDecl {
            name: name.to_string(),
            self_param,
            inherits,
            class_bound: false,
            associated_types: Vec::new(),
            requirements: Vec::new(),
            default_type: None,
            known: None,
        })
    }

    pub fn add_value(&mut self, decl: ValueDecl) -> DeclId {
        let context = decl.context;
        self.values.push(decl);
        let id = DeclId(self.values.len() as u32 - 1);
        if let DeclContext::Protocol(protocol) = context {
            self.protocols[protocol.0 as usize].requirements.push(id);
        }
        id
    }

    pub fn add_archetype(&mut self, decl: ArchetypeDecl) -> ArchetypeId {
        self.archetypes.push(decl);
        ArchetypeId(self.archetypes.len() as u32 - 1)
    }

    pub fn add_conformance(&mut self, conformance: Conformance) -> ConformanceId {
        self.conformances.push(conformance);
        ConformanceId(self.conformances.len() as u32 - 1)
    }

    pub fn nominal(&self, id: NominalId) -> &NominalDecl {
        &self.nominals[id.0 as usize]
    }

    pub fn nominal_mut(&mut self, id: NominalId) -> &mut NominalDecl {
        &mut self.nominals[id.0 as usize]
    }

    pub fn protocol(&self, id: ProtocolId) -> &ProtocolDecl {
        &self.protocols[id.0 as usize]
    }

    pub fn protocol_mut(&mut self, id: ProtocolId) -> &mut ProtocolDecl {
        &mut self.protocols[id.0 as usize]
    }

    pub fn value(&self, id: DeclId) -> &ValueDecl {
        &self.values[id.0 as usize]
    }

    pub fn value_mut(&mut self, id: DeclId) -> &mut ValueDecl {
        &mut self.values[id.0 as usize]
    }

    pub fn archetype(&self, id: ArchetypeId) -> &ArchetypeDecl {
        &self.archetypes[id.0 as usize]
    }

    pub fn archetype_mut(&mut self, id: ArchetypeId) -> &mut ArchetypeDecl {
        &mut self.archetypes[id.0 as usize]
    }

    pub fn conformance(&self, id: ConformanceId) -> &Conformance {
        &self.conformances[id.0 as usize]
    }

    pub fn conformance_mut(&mut self, id: ConformanceId) -> &mut Conformance {
        &mut self.conformances[id.0 as usize]
    }

    pub fn find_nominal(&self, name: &str) -> Option<NominalId> {
        self.nominals
            .iter()
            .position(|decl| decl.name == name)
            .map(|index| NominalId(index as u32))
    }

    pub fn find_protocol(&self, name: &str) -> Option<ProtocolId> {
        self.protocols
            .iter()
            .position(|decl| decl.name == name)
            .map(|index| ProtocolId(index as u32))
    }

    pub fn known_nominal(&self, known: KnownNominal) -> Option<NominalId> {
        self.nominals
            .iter()
            .position(|decl| decl.known == Some(known))
            .map(|index| NominalId(index as u32))
    }

    pub fn known_protocol(&self, known: KnownProtocol) -> Option<ProtocolId> {
        self.protocols
            .iter()
            .position(|decl| decl.known == Some(known))
            .map(|index| ProtocolId(index as u32))
    }

    pub fn known_type(&self, known: KnownNominal, args: Vec<Type>) -> Option<Type> {
        self.known_nominal(known)
            .map(|decl| Type::Nominal { decl, args })
    }

    /// Requirement of `protocol` named `name` whose first parameter has `label`.
    pub fn requirement(&self, protocol: ProtocolId, name: &str, label: Option<&str>) -> Option<DeclId> {
        self.protocol(protocol).requirements.iter().copied().find(|id| {
            let decl = self.value(*id);
            decl.name == name
                && match label {
                    Some(label) => decl
                        .params
                        .first()
                        .is_some_and(|param| param.label.as_deref() == Some(label)),
                    None => true,
                }
        })
    }

    pub fn add_associated_type(&mut self, protocol: ProtocolId, name: &str) -> ArchetypeId {
        let archetype = self.add_archetype(ArchetypeDecl::new(name));
        self.protocol_mut(protocol).associated_types.push(AssociatedType {
            name: name.to_string(),
            archetype,
        });
        archetype
    }

    /// `protocol` is `target` or refines it, directly or transitively.
    pub fn protocol_implies(&self, protocol: ProtocolId, target: ProtocolId) -> bool {
        if protocol == target {
            return true;
        }
        self.protocol(protocol)
            .inherits
            .iter()
            .any(|parent| self.protocol_implies(*parent, target))
    }

    pub fn is_class_type(&self, ty: &Type) -> bool {
        match ty {
            Type::Nominal { decl, .. } => self.nominal(*decl).is_class(),
            Type::DynamicSelf(_) => true,
            Type::Archetype(id) => {
                let archetype = self.archetype(*id);
                archetype.superclass.is_some()
                    || archetype
                        .conforms_to
                        .iter()
                        .any(|protocol| self.protocol_is_class_bound(*protocol))
            }
            _ => false,
        }
    }

    pub fn protocol_is_class_bound(&self, protocol: ProtocolId) -> bool {
        let decl = self.protocol(protocol);
        decl.class_bound
            || decl.known == Some(KnownProtocol::AnyObject)
            || decl
                .inherits
                .iter()
                .any(|parent| self.protocol_is_class_bound(*parent))
    }

    pub fn is_class_existential(&self, ty: &Type) -> bool {
        match ty {
            Type::Existential(protocols) => protocols
                .iter()
                .any(|protocol| self.protocol_is_class_bound(*protocol)),
            _ => false,
        }
    }

    /// Types whose values are single object references in the foreign runtime.
    pub fn is_bridgeable_object_type(&self, ty: &Type) -> bool {
        self.is_class_type(ty) || self.is_class_existential(ty)
    }

    /// Generic arguments of `ty` keyed by its declaration's generic parameters.
    pub fn context_substitutions(&self, ty: &Type) -> SubstitutionMap {
        match ty {
            Type::Nominal { decl, args } => SubstitutionMap::from_pairs(
                self.nominal(*decl)
                    .generic_params
                    .iter()
                    .copied()
                    .zip(args.iter().cloned()),
            ),
            _ => SubstitutionMap::new(),
        }
    }

    /// The direct superclass of a class, archetype or `Self` type.
    pub fn superclass_of(&self, ty: &Type) -> Option<Type> {
        match ty {
            Type::Nominal { decl, .. } => {
                let superclass = self.nominal(*decl).superclass.as_ref()?;
                Some(superclass.subst(&self.context_substitutions(ty)))
            }
            Type::Archetype(id) => self.archetype(*id).superclass.clone(),
            Type::DynamicSelf(inner) => Some((**inner).clone()),
            _ => None,
        }
    }

    /// `from` reaches `to` by walking superclasses (at least one step).
    pub fn is_subclass_of(&self, from: &Type, to: &Type) -> bool {
        let mut current = self.superclass_of(from);
        while let Some(ty) = current {
            if &ty == to {
                return true;
            }
            current = self.superclass_of(&ty);
        }
        false
    }

    /// Walks `ty`'s superclass chain (including `ty`) to the first class declared as `nominal`.
    pub fn find_in_superclass_chain(&self, ty: &Type, nominal: NominalId) -> Option<Type> {
        let mut current = Some(ty.clone());
        while let Some(ty) = current {
            if matches!(&ty, Type::Nominal { decl, .. } if *decl == nominal) {
                return Some(ty);
            }
            current = self.superclass_of(&ty);
        }
        None
    }

    pub fn conforms_to(&self, ty: &Type, protocol: ProtocolId) -> Option<ConformanceRef> {
        let anyobject = self.protocol(protocol).known == Some(KnownProtocol::AnyObject);
        match ty {
            Type::Nominal { decl, .. } => {
                if let Some(found) = self.recorded_conformance(*decl, protocol) {
                    return Some(ConformanceRef::Concrete(found));
                }
                if anyobject && self.nominal(*decl).is_class() {
                    return Some(ConformanceRef::Abstract(protocol));
                }
                let superclass = self.superclass_of(ty)?;
                self.conforms_to(&superclass, protocol)
            }
            Type::Archetype(id) => {
                let archetype = self.archetype(*id);
                if archetype
                    .conforms_to
                    .iter()
                    .any(|bound| self.protocol_implies(*bound, protocol))
                    || (anyobject && self.is_class_type(ty))
                {
                    return Some(ConformanceRef::Abstract(protocol));
                }
                if let Some(opened) = &archetype.opened_from {
                    if self.conforms_to(opened, protocol).is_some() {
                        return Some(ConformanceRef::Abstract(protocol));
                    }
                }
                let superclass = archetype.superclass.as_ref()?;
                self.conforms_to(superclass, protocol)
            }
            Type::DynamicSelf(inner) => self.conforms_to(inner, protocol),
            Type::Existential(protocols) => protocols
                .iter()
                .any(|member| self.protocol_implies(*member, protocol))
                .then_some(ConformanceRef::Abstract(protocol)),
            _ => None,
        }
    }

    fn recorded_conformance(&self, nominal: NominalId, protocol: ProtocolId) -> Option<ConformanceId> {
        self.conformances
            .iter()
            .position(|conformance| conformance.nominal == nominal && conformance.protocol == protocol)
            .map(|index| ConformanceId(index as u32))
    }

    /// The declaration satisfying `requirement`. Abstract conformances are
    /// satisfied by the requirement itself.
    pub fn witness(&self, conformance: ConformanceRef, requirement: DeclId) -> Option<DeclId> {
        match conformance {
            ConformanceRef::Concrete(id) => self.conformance(id).witness(requirement),
            ConformanceRef::Abstract(_) => Some(requirement),
        }
    }

    /// Associated type `name` of `ty`'s conformance, with `ty`'s generic arguments substituted.
    pub fn type_witness(&self, conformance: ConformanceRef, ty: &Type, name: &str) -> Option<Type> {
        match conformance {
            ConformanceRef::Concrete(id) => {
                let conformance = self.conformance(id);
                let witness = conformance.type_witness(name)?;
                let base = self.find_in_superclass_chain(ty, conformance.nominal)?;
                Some(witness.subst(&self.context_substitutions(&base)))
            }
            ConformanceRef::Abstract(_) => None,
        }
    }

    pub fn array_element(&self, ty: &Type) -> Option<Type> {
        self.single_generic_arg(ty, KnownNominal::Array)
    }

    pub fn set_element(&self, ty: &Type) -> Option<Type> {
        self.single_generic_arg(ty, KnownNominal::Set)
    }

    pub fn dictionary_key_value(&self, ty: &Type) -> Option<(Type, Type)> {
        match ty {
            Type::Nominal { decl, args }
                if self.nominal(*decl).known == Some(KnownNominal::Dictionary) && args.len() == 2 =>
            {
                Some((args[0].clone(), args[1].clone()))
            }
            _ => None,
        }
    }

    fn single_generic_arg(&self, ty: &Type, known: KnownNominal) -> Option<Type> {
        match ty {
            Type::Nominal { decl, args }
                if self.nominal(*decl).known == Some(known) && args.len() == 1 =>
            {
                Some(args[0].clone())
            }
            _ => None,
        }
    }

    /// Foreign class a native value bridges to, if it is bridgeable.
    pub fn bridged_foreign_type(&self, ty: &Type) -> Option<Type> {
        let bridgeable = self.known_protocol(KnownProtocol::ForeignBridgeable)?;
        let conformance = self.conforms_to(ty, bridgeable)?;
        self.type_witness(conformance, ty, "_ForeignType")
    }
}
