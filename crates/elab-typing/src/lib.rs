//! Types, declarations and the solver's recorded answer that elaboration
//! reads from.

mod core_library;
mod decls;
mod display;
mod locator;
mod solution;
mod types;

#[cfg(test)]
mod decls_tests;
#[cfg(test)]
mod solution_tests;

pub use core_library::{LIBRARY_MAX_FLOAT, LIBRARY_MAX_INTEGER_WIDTH};
pub use decls::{
    ArchetypeDecl, ArchetypeId, AssociatedType, Conformance, ConformanceId, ConformanceRef,
    DeclContext, DeclId, DeclTable, DefaultArgument, KnownNominal, KnownProtocol, LiteralValue,
    NominalDecl, NominalId, NominalKind, ParamDecl, ProtocolDecl, ProtocolId, StorageKind,
    ValueDecl, ValueKind,
};
pub use locator::{Locator, PathElement};
pub use solution::{
    ConversionRestrictionKind, FixKind, FunctionRefKind, OverloadChoice, Solution,
    SolutionBuilder, SolverFix, UnboundTypeVariable,
};
pub use types::{
    BuiltinType, FloatKind, FunctionParam, FunctionRepresentation, FunctionType, OptionalKind,
    SubstitutionMap, TupleElement, Type, TypeVarId,
};
