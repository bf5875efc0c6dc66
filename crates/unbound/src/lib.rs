//! Request chain stage answering queries with a validating, recursive resolver engine.
//!
//! Queries for names under the configured zones are resolved by one of two engine contexts,
//! selected by the transport the query arrived on. Answers failing DNSSEC validation are
//! turned into SERVFAIL once a trust anchor is loaded, and DNSSEC records are stripped for
//! requesters that did not ask for them. Everything else goes to the next middleware.

pub mod config;
pub mod directive;
pub mod error;
pub mod matcher;
pub mod policy;
pub mod pool;
pub mod router;
pub mod sanitize;
pub mod setup;
pub mod telemetry;

#[cfg(test)]
mod mock;

pub use config::{Setting, UnboundConfig};
pub use error::{ConfigError, PoolError, UnboundError};
pub use matcher::DomainMatcher;
pub use policy::{FailurePolicy, Verdict};
pub use pool::{Answer, ResolutionOutcome, ResolverPool, Transport};
pub use router::Unbound;
pub use setup::{setup, setup_from_directive};
