//! Policy data structures and representations.
//!
//! A policy binds a boolean condition over subject and object attributes to
//! the set of actions it permits.

mod document;

pub use document::PolicyDocument;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A named rule permitting a set of actions when its condition holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Identifier, unique within a store
    pub id: String,
    /// Condition source text, e.g. `subject.is_admin == true`
    pub condition: String,
    /// Actions this policy permits, e.g. `GET` and `SET`
    #[serde(default)]
    pub actions: BTreeSet<String>,
}

impl Policy {
    /// Create a new policy.
    pub fn new(
        id: impl Into<String>,
        condition: impl Into<String>,
        actions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            id: id.into(),
            condition: condition.into(),
            actions: actions.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a policy builder.
    pub fn builder(id: impl Into<String>) -> PolicyBuilder {
        PolicyBuilder::new(id)
    }

    /// Whether `action` is one of the permitted actions (exact match).
    pub fn permits(&self, action: &str) -> bool {
        self.actions.contains(action)
    }

    /// Check the policy's own invariants.
    pub fn validate(&self) -> crate::Result<()> {
        if self.id.is_empty() {
            return Err(crate::Error::EmptyPolicyId);
        }
        Ok(())
    }
}

/// Builder for creating policies.
#[derive(Debug, Default)]
pub struct PolicyBuilder {
    id: String,
    condition: String,
    actions: BTreeSet<String>,
}

impl PolicyBuilder {
    /// Create a new policy builder with the given ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Set the condition source.
    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = condition.into();
        self
    }

    /// Permit an action.
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.actions.insert(action.into());
        self
    }

    /// Permit several actions.
    pub fn actions(mut self, actions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.actions.extend(actions.into_iter().map(Into::into));
        self
    }

    /// Build the policy.
    pub fn build(self) -> Policy {
        Policy {
            id: self.id,
            condition: self.condition,
            actions: self.actions,
        }
    }
}
