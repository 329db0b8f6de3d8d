//! Expression engine seam.
//!
//! The matching core never parses or evaluates condition text itself; it
//! asks an [`ExpressionEngine`] to compile each condition once, to prepare
//! each request's [`Environment`] once, and to evaluate programs against the
//! prepared context. [`CelEngine`] is the default engine.
//!
//! `Display` of an [`ExpressionError`] never renders attribute values: the
//! engine's own message and the offending value stay in fields.

mod cel;

pub use cel::CelEngine;

use crate::core::Environment;
use std::fmt;
use thiserror::Error;

/// A compiler and evaluator of condition expressions.
pub trait ExpressionEngine: Send + Sync {
    /// Compiled form of a condition. Immutable and reusable across requests.
    type Program: Send + Sync;

    /// An environment converted into the engine's native form.
    type Context;

    /// Result of evaluating a program.
    type Value: fmt::Debug;

    /// Compile condition source text.
    fn compile(&self, source: &str) -> Result<Self::Program, ExpressionError>;

    /// Convert a request's environment for evaluation. Called once per
    /// request, before any condition runs.
    fn prepare(&self, environment: &Environment) -> Self::Context;

    /// Evaluate a compiled program against a prepared context.
    fn evaluate(
        &self,
        program: &Self::Program,
        context: &Self::Context,
    ) -> Result<Self::Value, ExpressionError>;

    /// Interpret an evaluation result as a boolean, `None` if it is not one.
    fn as_bool(value: &Self::Value) -> Option<bool>;

    /// Name of the type of an evaluation result, e.g. `string`.
    fn type_name(value: &Self::Value) -> &'static str;
}

/// Failure reported by an expression engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    /// The condition text could not be compiled
    #[error("parse error: {message}")]
    Parse {
        /// Engine-specific description
        message: String,
    },

    /// The program failed while running, e.g. an attribute path is missing
    #[error("execution error")]
    Execution {
        /// Engine-specific description, which may quote attribute values
        message: String,
    },

    /// The program produced something other than a boolean
    #[error("expected a boolean result, got {type_name}")]
    TypeMismatch {
        /// Type of the value actually produced
        type_name: &'static str,
        /// Rendering of the value actually produced
        found: String,
    },
}

impl ExpressionError {
    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        ExpressionError::Parse {
            message: message.into(),
        }
    }

    /// Create an execution error.
    pub fn execution(message: impl Into<String>) -> Self {
        ExpressionError::Execution {
            message: message.into(),
        }
    }

    /// Create a type mismatch error from the offending value.
    pub fn type_mismatch(type_name: &'static str, found: &impl fmt::Debug) -> Self {
        ExpressionError::TypeMismatch {
            type_name,
            found: format!("{found:?}"),
        }
    }

    /// The engine's full description of the failure, attribute values
    /// included. For logs, not for callers outside the process.
    pub fn detail(&self) -> &str {
        match self {
            ExpressionError::Parse { message } | ExpressionError::Execution { message } => message,
            ExpressionError::TypeMismatch { found, .. } => found,
        }
    }
}
