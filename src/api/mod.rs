//! Public API for the matching engine.
//!
//! This module provides the main interface: the [`PolicyStore`], the
//! [`Request`] it matches and the [`MatchDecision`] it returns.

mod decision;
mod request;
mod store;

pub use decision::MatchDecision;
pub use request::{Attributes, Request, RequestBuilder};
pub use store::{PolicyStore, PolicyStoreBuilder, StoreMetrics};
