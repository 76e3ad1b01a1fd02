//! Client-level error types shared by the request pipeline, refresh flow, and stores.
//!
//! Only transport-level problems become [`Error`]s. Any HTTP status, including `4xx`/`5xx`, is
//! returned as an [`ApiResponse`](crate::http::ApiResponse) so callers branch on the status code
//! and reserve `?` for network-level failures.

// self
use crate::{
	_prelude::*,
	auth::{DedupeKey, RequestId},
};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// The call exceeded its timeout and the underlying exchange was aborted.
	#[error("Request {request_id} timed out after {}ms.", .after.as_millis())]
	Timeout {
		/// Correlation id of the timed-out request.
		request_id: RequestId,
		/// Timeout that elapsed.
		after: Duration,
	},
	/// The call was cancelled before it produced a response.
	#[error("Request {request_id} was cancelled: {reason}.")]
	Cancelled {
		/// Correlation id of the cancelled request.
		request_id: RequestId,
		/// What triggered the cancellation.
		reason: CancelReason,
	},
	/// Transport failure (DNS, TCP, TLS, body read).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Session store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
}
impl Error {
	/// Returns the coarse error classification.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Timeout { .. } => ErrorKind::Timeout,
			Self::Cancelled { .. } => ErrorKind::Cancelled,
			Self::Transport(_) => ErrorKind::Transport,
			Self::Config(_) => ErrorKind::Config,
			Self::Storage(_) => ErrorKind::Storage,
		}
	}

	/// Returns `true` when the call ran out of time.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Timeout { .. })
	}

	/// Returns `true` when the call was superseded or cancelled by its caller.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled { .. })
	}

	/// Correlation id of the failed request, when the failure belongs to one.
	pub fn request_id(&self) -> Option<&RequestId> {
		match self {
			Self::Timeout { request_id, .. } | Self::Cancelled { request_id, .. } =>
				Some(request_id),
			_ => None,
		}
	}
}

/// Coarse classification of an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// The timeout elapsed.
	Timeout,
	/// De-duplication or caller cancellation.
	Cancelled,
	/// Network-level failure.
	Transport,
	/// Invalid configuration or request input.
	Config,
	/// Session store failure.
	Storage,
}
impl ErrorKind {
	/// Stable reason name suitable for logs and assertions.
	pub const fn reason_name(self) -> &'static str {
		match self {
			Self::Timeout => "TimeoutError",
			Self::Cancelled => "AbortError",
			Self::Transport => "TransportError",
			Self::Config => "ConfigError",
			Self::Storage => "StorageError",
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.reason_name())
	}
}

/// Why a request was cancelled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CancelReason {
	/// A newer request registered under the same de-duplication key.
	Superseded {
		/// Key shared by both requests.
		dedupe_key: DedupeKey,
	},
	/// The caller's cancellation token fired.
	Caller,
}
impl Display for CancelReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Superseded { dedupe_key } =>
				write!(f, "superseded by a newer request keyed `{dedupe_key}`"),
			Self::Caller => f.write_str("cancelled by caller"),
		}
	}
}

/// Configuration and request-construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Backend or app origin does not parse.
	#[error("Base URL `{url}` is invalid.")]
	InvalidBaseUrl {
		/// Offending URL text.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Backend or app origin parses but is not an `http(s)` base.
	#[error("Base URL `{url}` must be an http or https origin.")]
	UnsupportedBaseUrl {
		/// Offending URL text.
		url: String,
	},
	/// Resolved endpoint is not a valid URL.
	#[error("Endpoint `{endpoint}` does not resolve to a valid URL.")]
	InvalidEndpoint {
		/// Endpoint as supplied by the caller.
		endpoint: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Relative endpoints need an app origin to resolve against.
	#[error("Endpoint `{endpoint}` is relative but no app origin is configured.")]
	MissingAppOrigin {
		/// Endpoint as supplied by the caller.
		endpoint: String,
	},
	/// Header value contains characters HTTP does not allow.
	#[error("Header `{name}` has an invalid value.")]
	InvalidHeader {
		/// Header name.
		name: &'static str,
		/// Underlying validation failure.
		#[source]
		source: ::http::header::InvalidHeaderValue,
	},
	/// Request body could not be encoded as JSON.
	#[error("Request body could not be encoded as JSON.")]
	BodyEncode(#[from] serde_json::Error),
	/// Environment variable is present but unusable.
	#[error("Environment variable `{name}` is invalid: {reason}.")]
	InvalidEnv {
		/// Variable name.
		name: &'static str,
		/// Human-readable reason.
		reason: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling `{url}`.")]
	Network {
		/// Target URL of the failed exchange.
		url: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(url: impl Into<String>, src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { url: url.into(), source: Box::new(src) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn kinds_expose_stable_reason_names() {
		let request_id = RequestId::new("req-1").expect("Request id fixture should be valid.");
		let timeout =
			Error::Timeout { request_id: request_id.clone(), after: Duration::from_millis(50) };
		let cancelled = Error::Cancelled {
			request_id,
			reason: CancelReason::Superseded {
				dedupe_key: DedupeKey::new("profile-fetch").expect("Key fixture should be valid."),
			},
		};

		assert!(timeout.is_timeout());
		assert_eq!(timeout.kind().reason_name(), "TimeoutError");
		assert!(timeout.to_string().contains("50ms"));
		assert!(cancelled.is_cancelled());
		assert_eq!(cancelled.kind().to_string(), "AbortError");
		assert!(cancelled.to_string().contains("profile-fetch"));
		assert_eq!(cancelled.request_id().map(|id| id.as_ref()), Some("req-1"));
	}

	#[test]
	fn store_error_converts_with_source() {
		let store_error =
			crate::store::StoreError::Backend { message: "disk unavailable".into() };
		let err: Error = store_error.clone().into();

		assert_eq!(err.kind(), ErrorKind::Storage);

		let source = StdError::source(&err).expect("Storage errors should expose their source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
