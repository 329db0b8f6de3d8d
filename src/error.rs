//! Error types for the matching engine.
//!
//! Every failure the engine can produce is a variant of [`Error`]. Validation
//! variants are detected before any compilation or evaluation work happens;
//! compile errors only occur while policies are added to a store; runtime
//! errors only occur while a request is matched.
//!
//! Compile and runtime errors carry the definitions, policy and request that
//! were involved. Those fields can hold sensitive attribute values; the
//! `Display` output names only the policy.

use crate::api::{Attributes, Request};
use crate::expression::ExpressionError;
use crate::policy::Policy;

use std::sync::Arc;
use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the matching engine.
#[derive(Error, Debug)]
pub enum Error {
    /// A policy was supplied with an empty identifier.
    #[error("policy with empty id")]
    EmptyPolicyId,

    /// Two policies in the same store share an identifier.
    #[error("duplicate policies with id {id:?}")]
    DuplicatePolicyId {
        /// The offending identifier
        id: String,
    },

    /// The request carried no object attributes.
    #[error("object attributes is empty")]
    EmptyObjectAttributes,

    /// The request carried no subject attributes.
    #[error("subject attributes is empty")]
    EmptySubjectAttributes,

    /// The request carried an empty action.
    #[error("action is empty")]
    EmptyAction,

    /// A policy condition failed to compile.
    #[error("failed to compile condition of policy {:?}: {source}", .policy.id)]
    Compile {
        /// The policy whose condition was rejected
        policy: Box<Policy>,
        /// Shared definitions of the store the policy was added to
        definitions: Arc<Attributes>,
        /// The expression engine's failure
        #[source]
        source: ExpressionError,
    },

    /// A policy condition failed while being evaluated.
    #[error("failed to run condition of policy {:?}: {source}", .policy.id)]
    Runtime {
        /// Variables the condition was evaluated against
        environment: Box<Attributes>,
        /// The policy being evaluated
        policy: Arc<Policy>,
        /// The request being matched
        request: Box<Request>,
        /// The expression engine's failure
        #[source]
        source: ExpressionError,
    },

    /// Several policies of one batch were rejected.
    #[error("{} policies rejected, first: {}", .0.len(), .0.first().map(ToString::to_string).unwrap_or_default())]
    InvalidPolicies(Vec<Error>),

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Detailed error message
        message: String,
        /// Configuration key that caused the error
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Internal error (unexpected condition)
    #[error("Internal error: {message}")]
    Internal {
        /// Detailed error message
        message: String,
    },
}

impl Error {
    /// Create a duplicate policy id error.
    pub fn duplicate_policy_id(id: impl Into<String>) -> Self {
        Error::DuplicatePolicyId { id: id.into() }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: None,
        }
    }

    /// Create a configuration error naming the offending key.
    pub fn config_key(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Collapse a list of batch errors: one error stays itself, several are
    /// wrapped in [`Error::InvalidPolicies`].
    pub(crate) fn from_batch(mut errors: Vec<Error>) -> Self {
        if errors.len() == 1 {
            errors.remove(0)
        } else {
            Error::InvalidPolicies(errors)
        }
    }

    /// Whether the error was raised by input validation, before any
    /// compilation or evaluation.
    pub fn is_validation(&self) -> bool {
        match self {
            Error::EmptyPolicyId
            | Error::DuplicatePolicyId { .. }
            | Error::EmptyObjectAttributes
            | Error::EmptySubjectAttributes
            | Error::EmptyAction => true,
            Error::InvalidPolicies(errors) => errors.iter().all(Error::is_validation),
            _ => false,
        }
    }

    /// Iterate over the individual errors: every error of a batch, or this
    /// error itself.
    pub fn iter(&self) -> Box<dyn Iterator<Item = &Error> + '_> {
        match self {
            Error::InvalidPolicies(errors) => Box::new(errors.iter().flat_map(Error::iter)),
            other => Box::new(std::iter::once(other)),
        }
    }

    /// Get the error category for logs.
    pub fn category(&self) -> &'static str {
        match self {
            Error::EmptyPolicyId
            | Error::DuplicatePolicyId { .. }
            | Error::EmptyObjectAttributes
            | Error::EmptySubjectAttributes
            | Error::EmptyAction => "validation",
            Error::Compile { .. } => "compile",
            Error::Runtime { .. } => "runtime",
            Error::InvalidPolicies(_) => "batch",
            Error::Config { .. } => "config",
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialization",
            Error::Yaml(_) => "yaml",
            Error::Internal { .. } => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_display() {
        assert_eq!(Error::EmptyPolicyId.to_string(), "policy with empty id");
        assert_eq!(
            Error::duplicate_policy_id("p0").to_string(),
            r#"duplicate policies with id "p0""#
        );
        assert_eq!(Error::EmptyAction.to_string(), "action is empty");
    }

    #[test]
    fn test_validation_category() {
        assert!(Error::EmptyObjectAttributes.is_validation());
        assert!(Error::EmptySubjectAttributes.is_validation());
        assert_eq!(Error::EmptyAction.category(), "validation");
        assert!(!Error::config("bad").is_validation());
        assert_eq!(Error::internal("oops").category(), "internal");
    }

    #[test]
    fn test_batch_collapses_single_error() {
        let err = Error::from_batch(vec![Error::EmptyPolicyId]);
        assert!(matches!(err, Error::EmptyPolicyId));

        let err = Error::from_batch(vec![Error::EmptyPolicyId, Error::duplicate_policy_id("a")]);
        assert!(matches!(err, Error::InvalidPolicies(ref errors) if errors.len() == 2));
        assert!(err.is_validation());
        assert_eq!(err.iter().count(), 2);
        assert!(err.to_string().starts_with("2 policies rejected"));
    }

    #[test]
    fn test_runtime_display_hides_attributes() {
        let mut subject = Attributes::new();
        subject.insert("secret".into(), json!("hunter2"));
        let request = Request::new("READ", subject.clone(), subject);

        let err = Error::Runtime {
            environment: Box::default(),
            policy: Arc::new(Policy::new("p0", "subject.secret == 1", ["READ"])),
            request: Box::new(request),
            source: ExpressionError::execution("no such key"),
        };

        let rendered = err.to_string();
        assert!(rendered.contains("p0"));
        assert!(!rendered.contains("hunter2"));
        assert_eq!(err.category(), "runtime");
    }
}
