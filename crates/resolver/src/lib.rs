//! Seam between the request chain and a validating, recursive resolution engine.
//!
//! The engine (recursion, caching, upstream transport, signature verification) lives outside
//! this workspace. It is driven through per-transport contexts that are configured once at
//! startup and then queried concurrently.

use std::{path::Path, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use dnsgate_dns::{ClassType, DomainName, RecordType};

/// Creates resolver contexts.
pub trait ResolverEngine {
    type Context: ResolverContext;

    fn create_context(&self) -> anyhow::Result<Self::Context>;
}

/// A configured resolver handle.
///
/// Configuration methods take `&mut self` and are only called before the context is shared.
/// `resolve` must be safe to call concurrently from many tasks; an engine without that
/// capability has to serialize calls internally.
#[async_trait]
pub trait ResolverContext: Send + Sync + 'static {
    /// Set an option in the engine's native syntax, e.g. `("msg-cache-size:", "0")`.
    fn set_option(&mut self, key: &str, value: &str) -> anyhow::Result<()>;

    /// Read an engine-native configuration file.
    fn load_config(&mut self, path: &Path) -> anyhow::Result<()>;

    /// Read a file of DNSSEC trust anchors.
    fn add_trust_anchor_file(&mut self, path: &Path) -> anyhow::Result<()>;

    /// Resolve `name`/`qtype`/`qclass`.
    async fn resolve(&self, name: &DomainName, qtype: RecordType, qclass: ClassType) -> anyhow::Result<Resolution>;

    /// Release the engine resources. Called once, after the last `resolve`.
    fn destroy(&self);
}

/// What the engine produced for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Answer in wire format.
    pub packet: Bytes,
    /// Round trip time of the resolution.
    pub rtt: Duration,
    /// Validation failed.
    pub bogus: bool,
    /// Why validation failed, when `bogus` is set.
    pub why_bogus: Option<String>,
}

impl Resolution {
    pub fn new(packet: Bytes, rtt: Duration) -> Self {
        Self {
            packet,
            rtt,
            bogus: false,
            why_bogus: None,
        }
    }

    /// Mark the resolution as failing validation for `reason`.
    pub fn bogus(mut self, reason: impl Into<String>) -> Self {
        self.bogus = true;
        self.why_bogus = Some(reason.into());
        self
    }
}
