//! Core matching components: environment construction and the ordered
//! policy scan.

mod environment;
mod evaluator;

pub use environment::{BuiltinFn, Builtins, Environment};
pub use evaluator::{CompiledPolicy, Evaluator};

#[cfg(test)]
pub(crate) use evaluator::tests as tests_support;
