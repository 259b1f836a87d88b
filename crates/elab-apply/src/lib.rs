#![deny(clippy::unwrap_used)]
//! Rewrites a solved expression tree into its fully typed, explicit form.
//!
//! Every implicit conversion the solver decided on becomes a node, every
//! overloaded reference becomes a concrete declaration reference, literals
//! are lowered through their initializers and call arguments are matched
//! to parameters.

mod arguments;
mod casts;
mod closures;
mod coerce;
mod config;
mod engine;
mod error;
mod existential;
mod fixes;
mod literal;
mod reference;
mod sink;
mod walker;

#[cfg(test)]
mod casts_tests;
#[cfg(test)]
mod test_fixtures;

pub use arguments::{MatchFailure, MatchOutcome, MatchPolicy, ParamInfo, match_call_arguments};
pub use closures::{ClosureBodySolver, DeferredClosure};
pub use config::{ElaborationOptions, OptionsError, parse_options, read_options};
pub use engine::{
    Elaborated, ElaborationContext, ElaborationRequest, Elaborator, elaborate, elaborate_with_closures,
};
pub use error::{ElaborationError, ElaborationFailure, ErrorClass};
pub use existential::ExistentialEvent;
