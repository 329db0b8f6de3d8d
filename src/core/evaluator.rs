//! Ordered, first-match-wins policy scan.

use super::Environment;
use crate::api::{MatchDecision, Request};
use crate::expression::{ExpressionEngine, ExpressionError};
use crate::policy::Policy;
use crate::{Error, Result};

use std::sync::Arc;
use std::time::Instant;

/// A policy published into a store together with its compiled condition.
pub struct CompiledPolicy<P> {
    /// The policy as declared
    pub policy: Arc<Policy>,
    /// Program compiled from `policy.condition`
    pub program: Arc<P>,
}

impl<P> CompiledPolicy<P> {
    /// Pair a policy with its compiled condition.
    pub fn new(policy: Policy, program: Arc<P>) -> Self {
        Self {
            policy: Arc::new(policy),
            program,
        }
    }
}

impl<P> Clone for CompiledPolicy<P> {
    fn clone(&self) -> Self {
        Self {
            policy: Arc::clone(&self.policy),
            program: Arc::clone(&self.program),
        }
    }
}

/// The evaluator that scans compiled policies for a request.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator;

impl Evaluator {
    /// Create a new evaluator.
    pub fn new() -> Self {
        Self
    }

    /// Scan `policies` in order and return the first one permitting `request`.
    ///
    /// Policies whose actions do not include the request's action are
    /// skipped without evaluating their condition. The environment is
    /// prepared for the engine once, when the first applicable policy is
    /// reached. The first condition that fails to evaluate, or evaluates to a
    /// non-boolean, aborts the scan.
    pub fn evaluate<E: ExpressionEngine>(
        &self,
        engine: &E,
        policies: &[CompiledPolicy<E::Program>],
        environment: &Environment,
        request: &Request,
    ) -> Result<MatchDecision> {
        let start = Instant::now();
        let mut evaluated = 0;
        let mut context = None;

        for compiled in policies {
            if !compiled.policy.permits(&request.action) {
                continue;
            }
            evaluated += 1;

            let context = context.get_or_insert_with(|| engine.prepare(environment));
            let permitted = engine
                .evaluate(&compiled.program, context)
                .and_then(|value| {
                    E::as_bool(&value)
                        .ok_or_else(|| ExpressionError::type_mismatch(E::type_name(&value), &value))
                })
                .map_err(|source| Error::Runtime {
                    environment: Box::new(environment.variables().clone()),
                    policy: Arc::clone(&compiled.policy),
                    request: Box::new(request.clone()),
                    source,
                })?;

            if permitted {
                tracing::trace!(policy_id = %compiled.policy.id, evaluated, "request matched");
                return Ok(MatchDecision::permit(Arc::clone(&compiled.policy), evaluated).timed(start));
            }
        }

        Ok(MatchDecision::no_match(evaluated).timed(start))
    }
}
