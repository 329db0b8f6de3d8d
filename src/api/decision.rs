//! Match decision types.

use crate::policy::Policy;
use std::sync::Arc;
use std::time::Instant;

/// The result of matching a request against a store.
///
/// Absence of a match is not an error: it is a decision with `matched`
/// unset and no policy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchDecision {
    /// Whether some policy permits the request
    pub matched: bool,
    /// The first permitting policy, in declaration order
    pub policy: Option<Arc<Policy>>,
    /// Number of conditions evaluated before the decision was reached
    pub evaluated: usize,
    /// Time taken for evaluation in milliseconds
    pub evaluation_time_ms: f64,
}

impl MatchDecision {
    /// A decision permitting the request through `policy`.
    pub fn permit(policy: Arc<Policy>, evaluated: usize) -> Self {
        Self {
            matched: true,
            policy: Some(policy),
            evaluated,
            evaluation_time_ms: 0.0,
        }
    }

    /// A decision where no policy permits the request.
    pub fn no_match(evaluated: usize) -> Self {
        Self {
            matched: false,
            policy: None,
            evaluated,
            evaluation_time_ms: 0.0,
        }
    }

    /// Record the time elapsed since `start`.
    pub(crate) fn timed(mut self, start: Instant) -> Self {
        self.evaluation_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        self
    }

    /// ID of the matched policy, if any.
    pub fn policy_id(&self) -> Option<&str> {
        self.policy.as_deref().map(|p| p.id.as_str())
    }
}
