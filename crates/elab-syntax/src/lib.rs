//! The expression tree handed to elaboration and the elaborated tree it returns.

mod expr;
mod printer;
mod shuffle;
mod visit;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

#[cfg(test)]
mod expr_tests;

pub use expr::{
    AccessSemantics, BuiltinInit, CastForm, CheckedCastKind, ClosureBody, ClosureParam,
    ConversionPair, DictionaryEntry, Expr, ExprKind, KeyPathComponent, MagicIdentifierKind,
    OpaqueId, PointerConversionKind, Stmt, StringEncoding, TryForm,
};
pub use printer::dump_expr;
pub use shuffle::{ArgumentShuffle, ParamBinding, ShuffleSource, ShuffledArgument};
pub use visit::{contains_bind_optional, find_by_id, find_mut, max_id, walk_preorder};
