//! Transport primitives: outbound request/response values and the [`HttpTransport`] seam.
//!
//! The client depends on an HTTP stack only through [`HttpTransport`]. Implementations
//! resolve with an [`ApiResponse`] for every HTTP status and fail only on transport problems.
//! The client enforces timeouts and cancellation by dropping the returned future, so
//! implementations must abort their in-flight work on drop (reqwest does).

pub mod body;

pub use body::{ParsedBody, error_detail, parse_body};

// crates.io
use ::http::{HeaderMap, Method, StatusCode};
use serde::de::DeserializeOwned;
// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing one exchange.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and buffers the full response body.
	fn execute(&self, request: OutboundRequest) -> TransportFuture<'_>;
}

/// Fully prepared request handed to a transport.
#[derive(Clone, Debug)]
pub struct OutboundRequest {
	/// HTTP method.
	pub method: Method,
	/// Resolved target URL.
	pub url: Url,
	/// Final headers, including correlation and authorization headers.
	pub headers: HeaderMap,
	/// Encoded body.
	pub body: Option<Vec<u8>>,
}

/// Buffered HTTP response. Non-2xx statuses are ordinary values, not errors.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// Response status.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw body bytes.
	pub body: Vec<u8>,
	/// Final URL after redirects.
	pub url: Url,
}
impl ApiResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Numeric status code.
	pub fn status_code(&self) -> u16 {
		self.status.as_u16()
	}

	/// Body decoded as UTF-8, replacing invalid sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Strictly decodes the body as `T`.
	pub fn json<T>(&self) -> Result<T, serde_json::Error>
	where
		T: DeserializeOwned,
	{
		serde_json::from_slice(&self.body)
	}

	/// Decodes the body as `T`, falling back to the raw text.
	pub fn parse_body<T>(&self) -> ParsedBody<T>
	where
		T: DeserializeOwned,
	{
		body::parse_body(&self.body)
	}

	/// Human-readable failure message carried by an error body, if any.
	pub fn detail(&self) -> Option<String> {
		body::error_detail(&self.body)
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a reqwest client honoring the configured `User-Agent`.
	///
	/// Timeouts stay with the request pipeline; the reqwest client itself has none.
	pub fn from_config(
		config: &crate::config::ClientConfig,
	) -> Result<Self, crate::error::ConfigError> {
		let mut builder = ReqwestClient::builder();

		if let Some(agent) = &config.user_agent {
			builder = builder.user_agent(agent.as_str());
		}

		builder.build().map(Self).map_err(crate::error::ConfigError::http_client_build)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: OutboundRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let target = request.url.to_string();
			let mut builder = client.request(request.method, request.url).headers(request.headers);

			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response =
				builder.send().await.map_err(|e| TransportError::network(target.as_str(), e))?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let url = response.url().clone();
			let body = response
				.bytes()
				.await
				.map_err(|e| TransportError::network(target.as_str(), e))?
				.to_vec();

			Ok(ApiResponse { status, headers, body, url })
		})
	}
}
