//! Policy store implementation.

use super::{Attributes, MatchDecision, Request};
use crate::cache::{CacheStats, ConditionCache};
use crate::core::{Builtins, CompiledPolicy, Environment, Evaluator};
use crate::expression::{CelEngine, ExpressionEngine};
use crate::policy::{Policy, PolicyDocument};
use crate::{Error, Result};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A validated set of policies, their compiled conditions and the shared
/// definitions they are evaluated with.
///
/// Policies are matched in declaration order; the first policy permitting a
/// request wins. Policy IDs are unique within a store and every condition
/// compiled before its policy became visible.
pub struct PolicyStore<E: ExpressionEngine = CelEngine> {
    /// Published policies in declaration order
    policies: RwLock<PolicySet<E::Program>>,
    /// Shared definitions, never written after construction
    definitions: Arc<Attributes>,
    /// Builtins merged into every environment
    builtins: Builtins,
    /// Compiled condition cache, possibly shared with other stores
    cache: Arc<ConditionCache<E::Program>>,
    /// Expression engine
    engine: E,
    /// Policy evaluator
    evaluator: Evaluator,
}

struct PolicySet<P> {
    /// Copy-on-write list; readers clone the `Arc` and scan without the lock
    entries: Arc<Vec<CompiledPolicy<P>>>,
    ids: HashSet<String>,
}

impl PolicyStore<CelEngine> {
    /// Create a policy store builder using the CEL engine.
    pub fn builder() -> PolicyStoreBuilder<CelEngine> {
        PolicyStoreBuilder::new()
    }

    /// Validate and compile `policies` into a new store.
    ///
    /// Construction is all-or-nothing: every policy is checked, and if any
    /// is invalid no store is produced.
    pub fn new(policies: impl IntoIterator<Item = Policy>, definitions: Attributes) -> Result<Self> {
        Self::builder()
            .with_policies(policies)
            .with_definitions(definitions)
            .build()
    }

    /// Build a store from a policy document.
    pub fn from_document(document: PolicyDocument) -> Result<Self> {
        Self::new(document.policies, document.definitions)
    }
}

impl<E: ExpressionEngine> PolicyStore<E> {
    /// Add a single policy.
    ///
    /// On failure the store is left unchanged. The write lock is held for
    /// validation, compilation and insertion, so concurrent adds of the same
    /// ID cannot both succeed.
    pub fn add(&self, policy: Policy) -> Result<()> {
        let mut set = self.policies.write();

        policy.validate()?;
        if set.ids.contains(&policy.id) {
            return Err(Error::duplicate_policy_id(&policy.id));
        }
        let program = compile_policy(&self.engine, &self.cache, &self.definitions, &policy)?;

        debug!(policy_id = %policy.id, "policy added");
        set.ids.insert(policy.id.clone());
        Arc::make_mut(&mut set.entries).push(CompiledPolicy::new(policy, program));
        Ok(())
    }

    /// Match a request against the policies of this store.
    ///
    /// This is the main entry point. It will:
    /// 1. Validate the request (object, subject, then action)
    /// 2. Build a fresh environment from the shared definitions
    /// 3. Scan policies in declaration order, evaluating those whose
    ///    actions include the request's action
    /// 4. Return the first permitting policy, or a no-match decision
    ///
    /// # Returns
    /// * `Ok(MatchDecision)` - Whether and by which policy the request is permitted
    /// * `Err(Error)` - On an invalid request or a failed condition evaluation
    pub fn evaluate(&self, request: &Request) -> Result<MatchDecision> {
        request.validate()?;

        let environment = Environment::build(&self.definitions, request, &self.builtins);
        let snapshot = Arc::clone(&self.policies.read().entries);

        self.evaluator
            .evaluate(&self.engine, &snapshot, &environment, request)
    }

    /// Get a policy by ID.
    pub fn get_policy(&self, policy_id: &str) -> Option<Arc<Policy>> {
        self.policies
            .read()
            .entries
            .iter()
            .find(|entry| entry.policy.id == policy_id)
            .map(|entry| Arc::clone(&entry.policy))
    }

    /// List all policy IDs in declaration order.
    pub fn policy_ids(&self) -> Vec<String> {
        self.policies
            .read()
            .entries
            .iter()
            .map(|entry| entry.policy.id.clone())
            .collect()
    }

    /// Get the number of policies.
    pub fn policy_count(&self) -> usize {
        self.policies.read().entries.len()
    }

    /// Shared definitions this store evaluates with.
    pub fn definitions(&self) -> &Attributes {
        &self.definitions
    }

    /// The compiled condition cache.
    pub fn cache(&self) -> &Arc<ConditionCache<E::Program>> {
        &self.cache
    }

    /// Get store metrics.
    pub fn metrics(&self) -> StoreMetrics {
        StoreMetrics {
            policy_count: self.policy_count(),
            cache_stats: self.cache.stats(),
        }
    }
}

impl<E: ExpressionEngine> fmt::Debug for PolicyStore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyStore")
            .field("policies", &self.policy_ids())
            .field("builtins", &self.builtins)
            .finish_non_exhaustive()
    }
}

/// Compile a policy's condition through the cache.
fn compile_policy<E: ExpressionEngine>(
    engine: &E,
    cache: &ConditionCache<E::Program>,
    definitions: &Arc<Attributes>,
    policy: &Policy,
) -> Result<Arc<E::Program>> {
    cache
        .get_or_compile(&policy.condition, |source| engine.compile(source))
        .map_err(|source| Error::Compile {
            policy: Box::new(policy.clone()),
            definitions: Arc::clone(definitions),
            source,
        })
}

/// Builder for creating a PolicyStore.
pub struct PolicyStoreBuilder<E: ExpressionEngine = CelEngine> {
    engine: E,
    cache: Option<Arc<ConditionCache<E::Program>>>,
    definitions: Attributes,
    builtins: Builtins,
    policies: Vec<Policy>,
}

impl PolicyStoreBuilder<CelEngine> {
    /// Create a new policy store builder.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for PolicyStoreBuilder<CelEngine> {
    fn default() -> Self {
        Self {
            engine: CelEngine::new(),
            cache: None,
            definitions: Attributes::new(),
            builtins: Builtins::default(),
            policies: Vec::new(),
        }
    }
}

impl<E: ExpressionEngine> PolicyStoreBuilder<E> {
    /// Use another expression engine.
    ///
    /// A cache set earlier is dropped, since it holds programs of the
    /// previous engine.
    pub fn with_engine<F: ExpressionEngine>(self, engine: F) -> PolicyStoreBuilder<F> {
        PolicyStoreBuilder {
            engine,
            cache: None,
            definitions: self.definitions,
            builtins: self.builtins,
            policies: self.policies,
        }
    }

    /// Share an existing condition cache.
    pub fn with_cache(mut self, cache: Arc<ConditionCache<E::Program>>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the shared definitions.
    pub fn with_definitions(mut self, definitions: Attributes) -> Self {
        self.definitions = definitions;
        self
    }

    /// Replace the builtin registry.
    pub fn with_builtins(mut self, builtins: Builtins) -> Self {
        self.builtins = builtins;
        self
    }

    /// Add a policy to load.
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policies.push(policy);
        self
    }

    /// Add several policies to load, in order.
    pub fn with_policies(mut self, policies: impl IntoIterator<Item = Policy>) -> Self {
        self.policies.extend(policies);
        self
    }

    /// Build the policy store.
    ///
    /// Every policy is validated and compiled before anything is published.
    /// A single failure is returned as-is; several are returned together as
    /// [`Error::InvalidPolicies`].
    pub fn build(self) -> Result<PolicyStore<E>> {
        let cache = self.cache.unwrap_or_default();
        let definitions = Arc::new(self.definitions);

        let mut errors = Vec::new();
        let mut ids = HashSet::with_capacity(self.policies.len());
        let mut entries = Vec::with_capacity(self.policies.len());

        for policy in self.policies {
            if let Err(e) = policy.validate() {
                errors.push(e);
                continue;
            }
            if !ids.insert(policy.id.clone()) {
                errors.push(Error::duplicate_policy_id(&policy.id));
                continue;
            }
            match compile_policy(&self.engine, &cache, &definitions, &policy) {
                Ok(program) => entries.push(CompiledPolicy::new(policy, program)),
                Err(e) => errors.push(e),
            }
        }

        if !errors.is_empty() {
            debug!(rejected = errors.len(), "policy store construction failed");
            return Err(Error::from_batch(errors));
        }

        debug!(policies = entries.len(), "policy store constructed");
        Ok(PolicyStore {
            policies: RwLock::new(PolicySet {
                entries: Arc::new(entries),
                ids,
            }),
            definitions,
            builtins: self.builtins,
            cache,
            engine: self.engine,
            evaluator: Evaluator::new(),
        })
    }
}

/// Store metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMetrics {
    /// Number of published policies
    pub policy_count: usize,
    /// Condition cache statistics
    pub cache_stats: CacheStats,
}
