use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::decls::{ArchetypeId, DeclId};
use crate::locator::Locator;
use crate::types::{SubstitutionMap, Type, TypeVarId};

/// How the solver decided one type converts to another.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionRestrictionKind {
    TupleToTuple,
    ScalarToTuple,
    TupleToScalar,
    DeepEquality,
    Superclass,
    LValueToRValue,
    Existential,
    MetatypeToExistentialMetatype,
    ClassMetatypeToAnyObject,
    ExistentialMetatypeToAnyObject,
    ProtocolMetatypeToProtocolClass,
    ValueToOptional,
    OptionalToOptional,
    OptionalToImplicitlyUnwrapped,
    ImplicitlyUnwrappedToOptional,
    ForceUnchecked,
    ArrayUpcast,
    DictionaryUpcast,
    SetUpcast,
    HashableToAnyHashable,
    InoutToPointer,
    ArrayToPointer,
    StringToPointer,
    PointerToPointer,
    BridgeToForeign,
    BridgeFromForeign,
    ForeignToNativeTollFree,
    NativeToForeignTollFree,
}

impl ConversionRestrictionKind {
    pub fn name(self) -> &'static str {
        match self {
            ConversionRestrictionKind::TupleToTuple => "tuple-to-tuple",
            ConversionRestrictionKind::ScalarToTuple => "scalar-to-tuple",
            ConversionRestrictionKind::TupleToScalar => "tuple-to-scalar",
            ConversionRestrictionKind::DeepEquality => "deep-equality",
            ConversionRestrictionKind::Superclass => "superclass",
            ConversionRestrictionKind::LValueToRValue => "lvalue-to-rvalue",
            ConversionRestrictionKind::Existential => "existential",
            ConversionRestrictionKind::MetatypeToExistentialMetatype => {
                "metatype-to-existential-metatype"
            }
            ConversionRestrictionKind::ClassMetatypeToAnyObject => "class-metatype-to-object",
            ConversionRestrictionKind::ExistentialMetatypeToAnyObject => {
                "existential-metatype-to-object"
            }
            ConversionRestrictionKind::ProtocolMetatypeToProtocolClass => {
                "protocol-metatype-to-object"
            }
            ConversionRestrictionKind::ValueToOptional => "value-to-optional",
            ConversionRestrictionKind::OptionalToOptional => "optional-to-optional",
            ConversionRestrictionKind::OptionalToImplicitlyUnwrapped => {
                "optional-to-implicitly-unwrapped"
            }
            ConversionRestrictionKind::ImplicitlyUnwrappedToOptional => {
                "implicitly-unwrapped-to-optional"
            }
            ConversionRestrictionKind::ForceUnchecked => "force-unchecked",
            ConversionRestrictionKind::ArrayUpcast => "array-upcast",
            ConversionRestrictionKind::DictionaryUpcast => "dictionary-upcast",
            ConversionRestrictionKind::SetUpcast => "set-upcast",
            ConversionRestrictionKind::HashableToAnyHashable => "hashable-to-anyhashable",
            ConversionRestrictionKind::InoutToPointer => "inout-to-pointer",
            ConversionRestrictionKind::ArrayToPointer => "array-to-pointer",
            ConversionRestrictionKind::StringToPointer => "string-to-pointer",
            ConversionRestrictionKind::PointerToPointer => "pointer-to-pointer",
            ConversionRestrictionKind::BridgeToForeign => "bridge-to-foreign",
            ConversionRestrictionKind::BridgeFromForeign => "bridge-from-foreign",
            ConversionRestrictionKind::ForeignToNativeTollFree => "foreign-to-native-toll-free",
            ConversionRestrictionKind::NativeToForeignTollFree => "native-to-foreign-toll-free",
        }
    }

    pub fn is_collection_upcast(self) -> bool {
        matches!(
            self,
            ConversionRestrictionKind::ArrayUpcast
                | ConversionRestrictionKind::DictionaryUpcast
                | ConversionRestrictionKind::SetUpcast
        )
    }
}

/// How many argument lists a reference to a function was applied to in source.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionRefKind {
    #[default]
    Unapplied,
    SingleApply,
    DoubleApply,
    Compound,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "choice", rename_all = "snake_case")]
pub enum OverloadChoice {
    Declaration {
        decl: DeclId,
        #[serde(default)]
        base: Option<Type>,
        #[serde(default)]
        ref_kind: FunctionRefKind,
    },
    /// Found through `AnyObject` lookup; the result is implicitly unwrapped.
    DeclViaDynamic { decl: DeclId, base: Type },
    /// Found on the foreign class the base bridges to.
    DeclViaBridge { decl: DeclId, base: Type },
    /// Found after forcing an implicitly unwrapped base.
    DeclViaUnwrappedOptional { decl: DeclId, base: Type },
    TupleIndex { base: Type, index: u32 },
    BaseType { base: Type },
    KeyPathApplication { base: Type },
}

impl OverloadChoice {
    pub fn decl(&self) -> Option<DeclId> {
        match self {
            OverloadChoice::Declaration { decl, .. }
            | OverloadChoice::DeclViaDynamic { decl, .. }
            | OverloadChoice::DeclViaBridge { decl, .. }
            | OverloadChoice::DeclViaUnwrappedOptional { decl, .. } => Some(*decl),
            OverloadChoice::TupleIndex { .. }
            | OverloadChoice::BaseType { .. }
            | OverloadChoice::KeyPathApplication { .. } => None,
        }
    }

    pub fn base(&self) -> Option<&Type> {
        match self {
            OverloadChoice::Declaration { base, .. } => base.as_ref(),
            OverloadChoice::DeclViaDynamic { base, .. }
            | OverloadChoice::DeclViaBridge { base, .. }
            | OverloadChoice::DeclViaUnwrappedOptional { base, .. }
            | OverloadChoice::TupleIndex { base, .. }
            | OverloadChoice::BaseType { base }
            | OverloadChoice::KeyPathApplication { base } => Some(base),
        }
    }
}

/// A repair the solver applied to make the system solvable. Any recorded
/// fix means the expression is ill-formed as written.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "fix", rename_all = "snake_case")]
pub enum FixKind {
    ForceOptional,
    OptionalChaining,
    ForceDowncast { target: Type },
    AddressOf,
    CoerceToCheckedCast,
    RelabelArguments { labels: Vec<Option<String>> },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SolverFix {
    pub kind: FixKind,
    pub locator: Locator,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnboundTypeVariable(pub TypeVarId);

impl std::fmt::Display for UnboundTypeVariable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "type variable $T{} has no binding in the solution", self.0.0)
    }
}

const MAX_BINDING_CHAIN: usize = 64;

/// The solver's answer for one expression. Read-only once built.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(from = "SolutionData", into = "SolutionData")]
pub struct Solution {
    type_bindings: FxHashMap<TypeVarId, Type>,
    overloads: FxHashMap<Locator, OverloadChoice>,
    restrictions: FxHashMap<(Type, Type), ConversionRestrictionKind>,
    opened_existentials: FxHashMap<Locator, ArchetypeId>,
    opened_types: FxHashMap<Locator, SubstitutionMap>,
    fixes: Vec<SolverFix>,
}

impl Solution {
    pub fn fixed_type(&self, var: TypeVarId) -> Option<&Type> {
        self.type_bindings.get(&var)
    }

    /// Replaces every type variable in `ty` with its binding.
    pub fn simplify_type(&self, ty: &Type) -> Result<Type, UnboundTypeVariable> {
        let mut current = ty.clone();
        for _ in 0..MAX_BINDING_CHAIN {
            if !current.has_type_variables() {
                return Ok(current);
            }
            let mut unbound = None;
            current = current.transform(&mut |node| match node {
                Type::Var(var) => match self.type_bindings.get(var) {
                    Some(bound) => Some(bound.clone()),
                    None => {
                        unbound.get_or_insert(*var);
                        Some(node.clone())
                    }
                },
                _ => None,
            });
            if let Some(var) = unbound {
                return Err(UnboundTypeVariable(var));
            }
        }
        match first_type_variable(&current) {
            Some(var) => Err(UnboundTypeVariable(var)),
            None => Ok(current),
        }
    }

    pub fn overload_choice(&self, locator: &Locator) -> Option<&OverloadChoice> {
        self.overloads.get(locator)
    }

    pub fn conversion_restriction(&self, from: &Type, to: &Type) -> Option<ConversionRestrictionKind> {
        self.restrictions.get(&(from.clone(), to.clone())).copied()
    }

    pub fn opened_existential(&self, locator: &Locator) -> Option<ArchetypeId> {
        self.opened_existentials.get(locator).copied()
    }

    pub fn opened_types(&self, locator: &Locator) -> Option<&SubstitutionMap> {
        self.opened_types.get(locator)
    }

    pub fn fixes(&self) -> &[SolverFix] {
        &self.fixes
    }
}

fn first_type_variable(ty: &Type) -> Option<TypeVarId> {
    let mut found = None;
    ty.any_node(&mut |node| match node {
        Type::Var(var) => {
            found = Some(*var);
            true
        }
        _ => false,
    });
    found
}

#[derive(Debug, Default)]
pub struct SolutionBuilder {
    solution: Solution,
}

impl SolutionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, var: TypeVarId, ty: Type) -> Self {
        self.solution.type_bindings.insert(var, ty);
        self
    }

    pub fn overload(mut self, locator: Locator, choice: OverloadChoice) -> Self {
        self.solution.overloads.insert(locator, choice);
        self
    }

    pub fn restriction(mut self, from: Type, to: Type, kind: ConversionRestrictionKind) -> Self {
        self.solution.restrictions.insert((from, to), kind);
        self
    }

    pub fn opened_existential(mut self, locator: Locator, archetype: ArchetypeId) -> Self {
        self.solution.opened_existentials.insert(locator, archetype);
        self
    }

    pub fn opened_types(mut self, locator: Locator, substitutions: SubstitutionMap) -> Self {
        self.solution.opened_types.insert(locator, substitutions);
        self
    }

    pub fn fix(mut self, kind: FixKind, locator: Locator) -> Self {
        self.solution.fixes.push(SolverFix { kind, locator });
        self
    }

    pub fn build(self) -> Solution {
        self.solution
    }
}

// Wire form: JSON object keys must be strings, so every map travels as an
// entry list.
#[derive(Serialize, Deserialize)]
struct SolutionData {
    #[serde(default)]
    bindings: Vec<BindingEntry>,
    #[serde(default)]
    overloads: Vec<OverloadEntry>,
    #[serde(default)]
    restrictions: Vec<RestrictionEntry>,
    #[serde(default)]
    opened_existentials: Vec<OpenedExistentialEntry>,
    #[serde(default)]
    opened_types: Vec<OpenedTypesEntry>,
    #[serde(default)]
    fixes: Vec<SolverFix>,
}

#[derive(Serialize, Deserialize)]
struct BindingEntry {
    var: TypeVarId,
    ty: Type,
}

#[derive(Serialize, Deserialize)]
struct OverloadEntry {
    locator: Locator,
    choice: OverloadChoice,
}

#[derive(Serialize, Deserialize)]
struct RestrictionEntry {
    from: Type,
    to: Type,
    kind: ConversionRestrictionKind,
}

#[derive(Serialize, Deserialize)]
struct OpenedExistentialEntry {
    locator: Locator,
    archetype: ArchetypeId,
}

#[derive(Serialize, Deserialize)]
struct OpenedTypesEntry {
    locator: Locator,
    substitutions: SubstitutionMap,
}

impl From<SolutionData> for Solution {
    fn from(data: SolutionData) -> Self {
        Solution {
            type_bindings: data
                .bindings
                .into_iter()
                .map(|entry| (entry.var, entry.ty))
                .collect(),
            overloads: data
                .overloads
                .into_iter()
                .map(|entry| (entry.locator, entry.choice))
                .collect(),
            restrictions: data
                .restrictions
                .into_iter()
                .map(|entry| ((entry.from, entry.to), entry.kind))
                .collect(),
            opened_existentials: data
                .opened_existentials
                .into_iter()
                .map(|entry| (entry.locator, entry.archetype))
                .collect(),
            opened_types: data
                .opened_types
                .into_iter()
                .map(|entry| (entry.locator, entry.substitutions))
                .collect(),
            fixes: data.fixes,
        }
    }
}

impl From<Solution> for SolutionData {
    fn from(solution: Solution) -> Self {
        let mut bindings: Vec<BindingEntry> = solution
            .type_bindings
            .into_iter()
            .map(|(var, ty)| BindingEntry { var, ty })
            .collect();
        bindings.sort_by_key(|entry| entry.var);
        let mut overloads: Vec<OverloadEntry> = solution
            .overloads
            .into_iter()
            .map(|(locator, choice)| OverloadEntry { locator, choice })
            .collect();
        overloads.sort_by_key(|entry| entry.locator.anchor);
        let mut opened_existentials: Vec<OpenedExistentialEntry> = solution
            .opened_existentials
            .into_iter()
            .map(|(locator, archetype)| OpenedExistentialEntry { locator, archetype })
            .collect();
        opened_existentials.sort_by_key(|entry| entry.locator.anchor);
        let mut opened_types: Vec<OpenedTypesEntry> = solution
            .opened_types
            .into_iter()
            .map(|(locator, substitutions)| OpenedTypesEntry {
                locator,
                substitutions,
            })
            .collect();
        opened_types.sort_by_key(|entry| entry.locator.anchor);
        SolutionData {
            bindings,
            overloads,
            restrictions: solution
                .restrictions
                .into_iter()
                .map(|((from, to), kind)| RestrictionEntry { from, to, kind })
                .collect(),
            opened_existentials,
            opened_types,
            fixes: solution.fixes,
        }
    }
}
