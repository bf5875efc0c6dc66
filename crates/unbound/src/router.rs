use async_trait::async_trait;
use bytes::Bytes;
use dnsgate_context::{DnsMiddleware, DnsRequestCtx, MiddlewareError};
use dnsgate_dns::{DnsQuestion, DnsResponseCode};
use dnsgate_resolver::ResolverContext;

use crate::{
    error::UnboundError,
    matcher::DomainMatcher,
    policy::{FailurePolicy, Verdict},
    pool::{ResolverPool, Transport},
    sanitize::sanitize,
    telemetry,
};

/// Middleware answering in-scope queries with the resolver engine.
///
/// Queries outside of the configured zones, and messages without a question, are left to the
/// next middleware.
pub struct Unbound<C: ResolverContext> {
    matcher: DomainMatcher,
    pool: ResolverPool<C>,
    policy: FailurePolicy,
}

impl<C: ResolverContext> Unbound<C> {
    /// Strict mode is taken from the pool, so the pool has to be fully configured.
    pub fn new(matcher: DomainMatcher, pool: ResolverPool<C>) -> Self {
        let policy = FailurePolicy::new(pool.is_strict());
        Self { matcher, pool, policy }
    }

    pub fn matcher(&self) -> &DomainMatcher {
        &self.matcher
    }

    pub fn pool(&self) -> &ResolverPool<C> {
        &self.pool
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Register metric descriptions.
    pub fn on_startup(&self) {
        telemetry::describe();
    }

    /// Destroy the resolver contexts.
    pub fn on_shutdown(&self) {
        self.pool.shutdown();
    }

    async fn resolve(
        &self,
        ctx: &DnsRequestCtx,
        question: &DnsQuestion,
        query_id: u16,
        dnssec_ok: bool,
    ) -> Result<Bytes, UnboundError> {
        let transport = Transport::from(ctx.request_type());
        let outcome = self.pool.resolve(transport, question).await;
        let rtt = outcome.rtt;

        if outcome.bogus {
            telemetry::record_bogus(ctx.server());
        }

        let result = match self.policy.evaluate(outcome) {
            Verdict::Accept { answer, response_code } => sanitize(answer, question, query_id, dnssec_ok)
                .map(|bytes| (bytes, response_code))
                .map_err(UnboundError::Sanitize),
            Verdict::Reject(e) => Err(e),
        };

        let response_code = match &result {
            Ok((_, response_code)) => *response_code,
            Err(_) => DnsResponseCode::ServerFailure,
        };
        telemetry::record_request(ctx.server(), response_code, rtt);

        result.map(|(bytes, _)| bytes)
    }
}

#[async_trait]
impl<C: ResolverContext> DnsMiddleware for Unbound<C> {
    async fn on_query(&self, ctx: &DnsRequestCtx) -> Result<Option<Bytes>, MiddlewareError> {
        let message = ctx
            .message()
            .map_err(|e| MiddlewareError::new(DnsResponseCode::FormatError, e))?;

        let Some(question) = message.questions().first() else {
            return Ok(None);
        };
        if !self.matcher.in_scope(&question.qname) {
            return Ok(None);
        }

        match self.resolve(ctx, question, message.id, message.do_bit()).await {
            Ok(answer) => Ok(Some(answer)),
            Err(e) => {
                tracing::debug!(
                    "unbound failed to answer {} {:?}: {}",
                    question.qname,
                    question.qtype,
                    e
                );
                Err(MiddlewareError::new(DnsResponseCode::ServerFailure, e))
            }
        }
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod router_tests;
