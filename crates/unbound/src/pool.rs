use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

use anyhow::Context;
use bytes::Bytes;
use dnsgate_context::RequestType;
use dnsgate_dns::{DnsMessage, DnsQuestion};
use dnsgate_resolver::{ResolverContext, ResolverEngine};

use crate::error::PoolError;

/// Options applied to every new pool. They turn off the engine caches.
const DEFAULT_OPTIONS: [(&str, &str); 2] = [("msg-cache-size", "0"), ("rrset-cache-size", "0")];

/// Forces the TCP context to talk TCP to upstream servers.
const TCP_UPSTREAM: (&str, &str) = ("tcp-upstream:", "yes");

/// Transport a query arrived on, which selects the context resolving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Udp,
    Tcp,
}

impl From<RequestType> for Transport {
    /// DoH rides on a stream, so it shares the TCP context.
    fn from(request_type: RequestType) -> Self {
        if request_type.is_stream() {
            Transport::Tcp
        } else {
            Transport::Udp
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Udp => f.write_str("UDP"),
            Transport::Tcp => f.write_str("TCP"),
        }
    }
}

/// Answer produced by the engine: the wire bytes as received and their decoded form.
#[derive(Debug, Clone)]
pub struct Answer {
    pub raw: Bytes,
    pub message: DnsMessage,
}

/// Result of one resolution.
#[derive(Debug)]
pub struct ResolutionOutcome {
    pub answer: Option<Answer>,
    pub rtt: Duration,
    pub bogus: bool,
    pub why_bogus: Option<String>,
    pub error: Option<anyhow::Error>,
}

impl ResolutionOutcome {
    fn failed(error: anyhow::Error, rtt: Duration) -> Self {
        Self {
            answer: None,
            rtt,
            bogus: false,
            why_bogus: None,
            error: Some(error),
        }
    }
}

/// Two resolver contexts, one for queries received over UDP and one for queries received over
/// a stream transport, configured identically.
///
/// Configuration goes through `&mut self` and therefore only happens before the pool is shared.
/// Every operation is applied to the UDP context first and then to the TCP context; the first
/// failure aborts it, leaving the UDP context changed.
pub struct ResolverPool<C: ResolverContext> {
    udp: C,
    tcp: C,
    strict: bool,
    options: BTreeMap<String, String>,
    config_files: BTreeSet<PathBuf>,
    trust_anchors: BTreeSet<PathBuf>,
    destroyed: AtomicBool,
}

impl<C: ResolverContext> ResolverPool<C> {
    pub fn new<E>(engine: &E) -> Result<Self, PoolError>
    where
        E: ResolverEngine<Context = C>,
    {
        let udp = engine.create_context().map_err(|cause| PoolError::CreateContext {
            transport: Transport::Udp,
            cause,
        })?;
        let mut tcp = engine.create_context().map_err(|cause| PoolError::CreateContext {
            transport: Transport::Tcp,
            cause,
        })?;

        let (key, value) = TCP_UPSTREAM;
        tcp.set_option(key, value).map_err(|cause| PoolError::SetOption {
            key: key.to_string(),
            value: value.to_string(),
            transport: Transport::Tcp,
            cause,
        })?;

        let mut pool = Self {
            udp,
            tcp,
            strict: false,
            options: BTreeMap::new(),
            config_files: BTreeSet::new(),
            trust_anchors: BTreeSet::new(),
            destroyed: AtomicBool::new(false),
        };

        for (key, value) in DEFAULT_OPTIONS {
            if let Err(e) = pool.set_option(key, value) {
                tracing::warn!("Could not set default option: {}", e);
            }
        }

        Ok(pool)
    }

    /// Set an engine option on both contexts. `key` may be given with or without the trailing
    /// colon of the engine syntax.
    pub fn set_option(&mut self, key: &str, value: &str) -> Result<(), PoolError> {
        let key = engine_key(key);
        self.apply_to_both(
            |ctx| ctx.set_option(&key, value),
            |transport, cause| PoolError::SetOption {
                key: key.clone(),
                value: value.to_string(),
                transport,
                cause,
            },
        )?;

        tracing::debug!("unbound option {} {}", key, value);
        self.options.insert(key, value.to_string());
        Ok(())
    }

    /// Load an engine configuration file into both contexts.
    pub fn load_config(&mut self, path: impl AsRef<Path>) -> Result<(), PoolError> {
        let path = path.as_ref();
        self.apply_to_both(
            |ctx| ctx.load_config(path),
            |transport, cause| PoolError::LoadConfig {
                path: path.to_path_buf(),
                transport,
                cause,
            },
        )?;

        self.config_files.insert(path.to_path_buf());
        Ok(())
    }

    /// Load a trust anchor file into both contexts and switch to strict mode.
    pub fn load_trust_anchor(&mut self, path: impl AsRef<Path>) -> Result<(), PoolError> {
        let path = path.as_ref();
        self.apply_to_both(
            |ctx| ctx.add_trust_anchor_file(path),
            |transport, cause| PoolError::LoadTrustAnchor {
                path: path.to_path_buf(),
                transport,
                cause,
            },
        )?;

        self.trust_anchors.insert(path.to_path_buf());
        self.strict = true;
        Ok(())
    }

    fn apply_to_both<F, E>(&mut self, mut op: F, err: E) -> Result<(), PoolError>
    where
        F: FnMut(&mut C) -> anyhow::Result<()>,
        E: Fn(Transport, anyhow::Error) -> PoolError,
    {
        for (transport, ctx) in [(Transport::Udp, &mut self.udp), (Transport::Tcp, &mut self.tcp)] {
            op(ctx).map_err(|cause| err(transport, cause))?;
        }
        Ok(())
    }

    /// Resolve `question` on the context serving `transport`.
    pub async fn resolve(&self, transport: Transport, question: &DnsQuestion) -> ResolutionOutcome {
        let ctx = match transport {
            Transport::Udp => &self.udp,
            Transport::Tcp => &self.tcp,
        };

        let started = Instant::now();
        let resolution = match ctx.resolve(&question.qname, question.qtype, question.qclass).await {
            Ok(resolution) => resolution,
            Err(e) => return ResolutionOutcome::failed(e, started.elapsed()),
        };

        match DnsMessage::decode(&resolution.packet).context("malformed answer from resolver engine") {
            Ok(message) => ResolutionOutcome {
                answer: Some(Answer {
                    raw: resolution.packet,
                    message,
                }),
                rtt: resolution.rtt,
                bogus: resolution.bogus,
                why_bogus: resolution.why_bogus,
                error: None,
            },
            Err(e) => ResolutionOutcome::failed(e, resolution.rtt),
        }
    }

    /// Destroy both contexts. Only the first call has an effect.
    pub fn shutdown(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.udp.destroy();
        self.tcp.destroy();
        tracing::info!("unbound resolver contexts destroyed");
    }

    /// Whether a trust anchor was loaded and bogus answers are rejected.
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Options applied to both contexts, keyed in engine syntax.
    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    pub fn config_files(&self) -> &BTreeSet<PathBuf> {
        &self.config_files
    }

    pub fn trust_anchors(&self) -> &BTreeSet<PathBuf> {
        &self.trust_anchors
    }

    pub fn is_shut_down(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }
}

/// Option keys carry a trailing colon in the engine syntax, `msg-cache-size:`.
fn engine_key(key: &str) -> String {
    if key.ends_with(':') {
        key.to_string()
    } else {
        format!("{key}:")
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod pool_tests;
