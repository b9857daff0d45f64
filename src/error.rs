//! Error taxonomy for the restructuring pipeline.
//!
//! Every failure a provider can surface is mapped onto a small set of
//! [`ErrorKind`] sentinels by the provider's classifier. Wrapper variants
//! ([`RestructureError::RetriesExhausted`], [`RestructureError::Chunk`],
//! [`RestructureError::Merge`]) keep the inner error as their source, and
//! [`RestructureError::kind`] traverses the chain, so callers can match on
//! the abstract kind while the concrete provider message stays reachable.

use thiserror::Error;

/// The sentinel kinds the pipeline surfaces to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Provider rate limit hit. Transient.
    RateLimit,
    /// Account quota or balance exhausted. Permanent.
    QuotaExceeded,
    /// Network timeout or provider-side transient failure.
    Timeout,
    /// API key rejected. Permanent.
    AuthFailed,
    /// Malformed request. Permanent.
    BadRequest,
    /// Input exceeds the model context or the configured input budget.
    TranscriptTooLong,
}

/// Errors produced by the restructuring pipeline and its components.
#[derive(Error, Debug)]
pub enum RestructureError {
    /// Provider rate limit (HTTP 429 without quota keywords).
    #[error("rate limited: {0}")]
    RateLimit(String),

    /// Quota or balance exhausted (HTTP 402, or 429 mentioning quota/billing).
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Request timed out, or the provider reported a transient server error.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// API key rejected (HTTP 401).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The provider rejected the request as malformed (HTTP 400/403/404).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The transcript does not fit the model context or input budget.
    #[error("transcript too long: {0}")]
    TranscriptTooLong(String),

    /// Non-2xx status the classifier left unmapped. The status carries the
    /// retry decision for 5xx responses.
    #[error("provider returned HTTP {status}: {message}")]
    Api {
        /// HTTP status code (e.g. 402, 422, 500).
        status: u16,
        /// Provider error message, or the raw response body.
        message: String,
    },

    /// Low-level HTTP transport failure (connection refused, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON parsing failed at the serde level.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The provider answered 2xx but returned no choices.
    #[error("provider returned no choices")]
    NoResponse,

    /// The operation was cancelled via the cancellation token.
    #[error("operation was cancelled")]
    Cancelled,

    /// Invalid configuration or identifier detected at build time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The retry driver exhausted its attempts. Wraps the last failure.
    #[error("max retries ({attempts}) exceeded: {source}")]
    RetriesExhausted {
        /// The configured retry budget that was exhausted.
        attempts: u32,
        /// The error observed on the final attempt.
        source: Box<RestructureError>,
    },

    /// A map-phase call failed. `index` is 1-based.
    #[error("failed to process chunk {index}/{total}: {source}")]
    Chunk {
        /// 1-based chunk number.
        index: usize,
        /// Total chunks in this split.
        total: usize,
        /// The underlying failure.
        source: Box<RestructureError>,
    },

    /// The reduce-phase call failed.
    #[error("failed to merge chunks: {source}")]
    Merge {
        /// The underlying failure.
        source: Box<RestructureError>,
    },
}

impl RestructureError {
    /// The sentinel kind of this error, traversing wrapper variants.
    ///
    /// Returns `None` for unclassified errors (transport failures, JSON
    /// errors, cancellation, raw API statuses).
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::RateLimit(_) => Some(ErrorKind::RateLimit),
            Self::QuotaExceeded(_) => Some(ErrorKind::QuotaExceeded),
            Self::Timeout(_) => Some(ErrorKind::Timeout),
            Self::AuthFailed(_) => Some(ErrorKind::AuthFailed),
            Self::BadRequest(_) => Some(ErrorKind::BadRequest),
            Self::TranscriptTooLong(_) => Some(ErrorKind::TranscriptTooLong),
            Self::RetriesExhausted { source, .. }
            | Self::Chunk { source, .. }
            | Self::Merge { source } => source.kind(),
            _ => None,
        }
    }

    /// Whether this error (or any error it wraps) carries the given kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind() == Some(kind)
    }
}

/// The retry predicate: a positive list, so novel permanent failures are
/// never retried.
///
/// Retryable: [`ErrorKind::RateLimit`], [`ErrorKind::Timeout`], and
/// unclassified API errors with a 5xx status. Everything else, including
/// cancellation and transport errors the classifier did not reclassify,
/// surfaces immediately.
pub fn should_retry(error: &RestructureError) -> bool {
    match error {
        RestructureError::RateLimit(_) | RestructureError::Timeout(_) => true,
        RestructureError::Api { status, .. } => (500..600).contains(status),
        _ => false,
    }
}

pub type Result<T> = std::result::Result<T, RestructureError>;
