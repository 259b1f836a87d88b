use elab_typing::{DeclId, Type};
use serde::{Deserialize, Serialize};

use crate::expr::{Expr, ExprKind};

/// Argument indices bound to one parameter: none (defaulted), one, or many (variadic).
pub type ParamBinding = Vec<u32>;

/// Where one parameter position of a shuffled argument list gets its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ShuffleSource {
    Arg { index: u32 },
    /// Collects `variadic_args` into one array.
    Variadic,
    CallerDefault { index: u32 },
    CalleeDefault,
}

/// Reorders, defaults and collects call arguments into parameter order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentShuffle {
    /// The arguments in source order.
    pub sub: Expr,
    /// One entry per parameter.
    pub mapping: Vec<ShuffleSource>,
    #[serde(default)]
    pub variadic_args: Vec<u32>,
    #[serde(default)]
    pub caller_defaults: Vec<Expr>,
    #[serde(default)]
    pub variadic_type: Option<Type>,
    #[serde(default)]
    pub callee: Option<DeclId>,
    /// `sub` is a single argument rather than a tuple of them.
    #[serde(default)]
    pub source_is_scalar: bool,
}

/// One parameter's value after shuffling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShuffledArgument<'a> {
    Argument(&'a Expr),
    Variadic(&'a [u32]),
    CallerDefault(&'a Expr),
    CalleeDefault,
}

impl ArgumentShuffle {
    /// The parameter bindings this shuffle encodes.
    pub fn reconstruct_bindings(&self) -> Vec<ParamBinding> {
        self.mapping
            .iter()
            .map(|source| match source {
                ShuffleSource::Arg { index } => vec![*index],
                ShuffleSource::Variadic => self.variadic_args.clone(),
                ShuffleSource::CallerDefault { .. } | ShuffleSource::CalleeDefault => Vec::new(),
            })
            .collect()
    }

    pub fn argument(&self, index: u32) -> Option<&Expr> {
        if self.source_is_scalar {
            return (index == 0).then_some(&self.sub);
        }
        match &self.sub.kind {
            ExprKind::Tuple { elements, .. } => elements.get(index as usize),
            ExprKind::Paren { sub } if index == 0 => Some(sub),
            _ => (index == 0).then_some(&self.sub),
        }
    }

    /// The argument list in parameter order.
    pub fn rewritten_arguments(&self) -> Vec<ShuffledArgument<'_>> {
        self.mapping
            .iter()
            .map(|source| match source {
                ShuffleSource::Arg { index } => match self.argument(*index) {
                    Some(expr) => ShuffledArgument::Argument(expr),
                    None => ShuffledArgument::CalleeDefault,
                },
                ShuffleSource::Variadic => ShuffledArgument::Variadic(&self.variadic_args),
                ShuffleSource::CallerDefault { index } => {
                    match self.caller_defaults.get(*index as usize) {
                        Some(expr) => ShuffledArgument::CallerDefault(expr),
                        None => ShuffledArgument::CalleeDefault,
                    }
                }
                ShuffleSource::CalleeDefault => ShuffledArgument::CalleeDefault,
            })
            .collect()
    }
}
