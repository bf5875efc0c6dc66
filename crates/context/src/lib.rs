use std::{fmt, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use dnsgate_dns::{DnsMessage, DnsResponseCode};
use once_cell::sync::OnceCell;

/// The type of DNS request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestType {
    /// UDP
    UDP,
    /// TCP
    TCP,
    /// DNS over HTTPS
    DOH,
}

impl RequestType {
    /// Whether the request arrived over a stream transport (TCP, or TLS/HTTP on top of it).
    pub fn is_stream(self) -> bool {
        matches!(self, RequestType::TCP | RequestType::DOH)
    }
}

#[derive(Debug, Clone)]
pub struct DnsRequestCtx {
    request_type: RequestType,
    raw: Bytes,
    message: OnceCell<DnsMessage>,
    server: Arc<str>,
}

impl DnsRequestCtx {
    /// `server` identifies the listener that received the request, e.g. `dns://:53`.
    pub fn new(request_type: RequestType, raw: Bytes, server: impl Into<Arc<str>>) -> Self {
        Self {
            request_type,
            raw,
            message: OnceCell::new(),
            server: server.into(),
        }
    }

    /// Request Type
    pub fn request_type(&self) -> RequestType {
        self.request_type
    }

    /// Lazily decode and return the DNS message.
    pub fn message(&self) -> anyhow::Result<&DnsMessage> {
        self.message.get_or_try_init(|| DnsMessage::decode(&self.raw))
    }

    /// Raw request bytes
    pub fn raw(&self) -> Bytes {
        self.raw.clone()
    }

    /// Identity of the server that received the request.
    pub fn server(&self) -> &str {
        &self.server
    }
}

/// Error returned by a middleware, with the response code the server should answer with.
#[derive(Debug)]
pub struct MiddlewareError {
    response_code: DnsResponseCode,
    error: anyhow::Error,
}

impl MiddlewareError {
    pub fn new(response_code: DnsResponseCode, error: impl Into<anyhow::Error>) -> Self {
        Self {
            response_code,
            error: error.into(),
        }
    }

    /// Response code to answer the request with.
    pub fn response_code(&self) -> DnsResponseCode {
        self.response_code
    }

    pub fn error(&self) -> &anyhow::Error {
        &self.error
    }

    pub fn into_inner(self) -> anyhow::Error {
        self.error
    }
}

impl fmt::Display for MiddlewareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl std::error::Error for MiddlewareError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.error.source()
    }
}

/// Anything that is not classified explicitly is a server failure.
impl From<anyhow::Error> for MiddlewareError {
    fn from(error: anyhow::Error) -> Self {
        Self::new(DnsResponseCode::ServerFailure, error)
    }
}

/// A stage of the request chain.
///
/// `Ok(None)` hands the request to the next stage, `Ok(Some(resp))` answers it and ends the chain.
#[async_trait]
pub trait DnsMiddleware: Send + Sync {
    async fn on_query(&self, ctx: &DnsRequestCtx) -> Result<Option<Bytes>, MiddlewareError>;
}

/// Run the chain in order until a stage answers or fails.
///
/// A stage's answer or error is returned as is; `Ok(None)` means no stage answered.
pub async fn run_middlewares(
    mws: &[Arc<dyn DnsMiddleware>],
    ctx: &DnsRequestCtx,
) -> Result<Option<Bytes>, MiddlewareError> {
    for m in mws.iter() {
        if let Some(resp) = m.on_query(ctx).await? {
            return Ok(Some(resp));
        }
    }
    Ok(None)
}
