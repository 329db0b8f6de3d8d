//! # ABAC Engine
//!
//! Attribute-based access control: requests carrying an action plus subject
//! and object attributes are matched against declarative policies. Each
//! policy has an ID, a boolean condition and the actions it permits; the
//! first policy, in declaration order, whose actions include the request's
//! action and whose condition holds permits the request.
//!
//! ## Features
//!
//! - **Fail-fast loading**: IDs are checked and every condition is compiled
//!   when a policy enters a store, never at match time
//! - **Condition caching**: identical condition text is compiled once, across
//!   policies and stores sharing a [`ConditionCache`]
//! - **Concurrent matching**: any number of concurrent matches alongside
//!   incremental [`PolicyStore::add`] calls
//! - **Pluggable expressions**: conditions are CEL by default; any
//!   [`ExpressionEngine`] can be plugged in
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use abac_engine::{Attributes, Policy, PolicyStore, Request};
//!
//! fn main() -> abac_engine::Result<()> {
//!     let store = PolicyStore::new(
//!         vec![Policy::new("owner-can-update", "object.owner_id == subject.id", ["GET", "UPDATE"])],
//!         Attributes::new(),
//!     )?;
//!
//!     let request = Request::builder()
//!         .action("UPDATE")
//!         .subject("id", "user1")
//!         .object("owner_id", "user1")
//!         .build();
//!
//!     let decision = store.evaluate(&request)?;
//!     assert_eq!(decision.policy_id(), Some("owner-can-update"));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod api;
pub mod cache;
pub mod config;
pub mod core;
pub mod error;
pub mod expression;
pub mod policy;
pub mod server;
pub mod telemetry;

// Re-export main types for convenience
pub use api::{
    Attributes, MatchDecision, PolicyStore, PolicyStoreBuilder, Request, RequestBuilder,
    StoreMetrics,
};
pub use cache::{CacheStats, ConditionCache};
pub use crate::config::Config;
pub use crate::core::{Builtins, Environment};
pub use error::{Error, Result};
pub use expression::{CelEngine, ExpressionEngine, ExpressionError};
pub use policy::{Policy, PolicyBuilder, PolicyDocument};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
