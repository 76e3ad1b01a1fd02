//! Per-call request options and header preparation.

// crates.io
use ::http::{
	HeaderMap, HeaderName, HeaderValue, Method,
	header::{AUTHORIZATION, CONTENT_TYPE},
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	auth::{DedupeKey, RequestId, TokenSecret},
	config::BaseUrl,
	error::ConfigError,
};

/// Header carrying the correlation id.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

const APPLICATION_JSON: HeaderValue = HeaderValue::from_static("application/json");

/// Request payload.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
	/// JSON document.
	Json(Value),
	/// Pre-encoded text, typically a serialized JSON string.
	Text(String),
	/// Opaque bytes (uploads, form data); never implies a content type.
	Bytes(Vec<u8>),
}
impl RequestBody {
	/// Returns `true` when a missing `Content-Type` should default to JSON.
	pub fn implies_json(&self) -> bool {
		!matches!(self, Self::Bytes(_))
	}

	pub(crate) fn to_bytes(&self) -> Vec<u8> {
		match self {
			Self::Json(value) => value.to_string().into_bytes(),
			Self::Text(text) => text.clone().into_bytes(),
			Self::Bytes(bytes) => bytes.clone(),
		}
	}
}

/// Options for a single [`ApiClient::request`](crate::client::ApiClient::request) call.
#[derive(Clone, Debug)]
pub struct RequestOptions {
	/// HTTP method; defaults to `GET`.
	pub method: Method,
	/// Caller-supplied headers.
	pub headers: HeaderMap,
	/// Optional payload.
	pub body: Option<RequestBody>,
	/// Attach the stored bearer token and recover from `401`; defaults to `true`.
	pub auth: bool,
	/// Slot in which only the newest request stays live.
	pub dedupe_key: Option<DedupeKey>,
	/// Correlation id; generated when absent.
	pub request_id: Option<RequestId>,
	/// Per-call timeout; the client default applies when absent.
	pub timeout: Option<Duration>,
	/// Telemetry label; the resolved URL is used when absent.
	pub metrics_label: Option<String>,
	/// Endpoint resolution mode.
	pub base_url: BaseUrl,
	/// External cancellation signal.
	pub cancel: Option<CancellationToken>,
}
impl RequestOptions {
	/// Creates default options (`GET`, authenticated, default timeout).
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the HTTP method.
	pub fn method(mut self, method: Method) -> Self {
		self.method = method;

		self
	}

	/// Adds or replaces a header.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Merges a header map, replacing existing names.
	pub fn headers(mut self, headers: HeaderMap) -> Self {
		for (name, value) in headers.iter() {
			self.headers.insert(name.clone(), value.clone());
		}

		self
	}

	/// Sets the body.
	pub fn body(mut self, body: RequestBody) -> Self {
		self.body = Some(body);

		self
	}

	/// Serializes `payload` as the JSON body.
	pub fn json<T>(self, payload: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		Ok(self.body(RequestBody::Json(serde_json::to_value(payload)?)))
	}

	/// Enables or disables bearer attachment and `401` recovery.
	pub fn auth(mut self, auth: bool) -> Self {
		self.auth = auth;

		self
	}

	/// Shorthand for `auth(false)`.
	pub fn without_auth(self) -> Self {
		self.auth(false)
	}

	/// Sets the de-duplication key.
	pub fn dedupe_key(mut self, key: DedupeKey) -> Self {
		self.dedupe_key = Some(key);

		self
	}

	/// Sets the correlation id.
	pub fn request_id(mut self, id: RequestId) -> Self {
		self.request_id = Some(id);

		self
	}

	/// Overrides the timeout.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Sets the telemetry label.
	pub fn metrics_label(mut self, label: impl Into<String>) -> Self {
		self.metrics_label = Some(label.into());

		self
	}

	/// Sets the endpoint resolution mode.
	pub fn base_url(mut self, mode: BaseUrl) -> Self {
		self.base_url = mode;

		self
	}

	/// Links the request to a caller-owned cancellation token.
	pub fn cancel_token(mut self, token: CancellationToken) -> Self {
		self.cancel = Some(token);

		self
	}
}
impl Default for RequestOptions {
	fn default() -> Self {
		Self {
			method: Method::GET,
			headers: HeaderMap::new(),
			body: None,
			auth: true,
			dedupe_key: None,
			request_id: None,
			timeout: None,
			metrics_label: None,
			base_url: BaseUrl::Backend,
			cancel: None,
		}
	}
}

/// Builds the outbound header set for one attempt.
///
/// Caller headers come first; the correlation id and bearer token always win.
pub(crate) fn prepare_headers(
	options: &RequestOptions,
	request_id: &RequestId,
	token: Option<&TokenSecret>,
) -> Result<HeaderMap, ConfigError> {
	let mut headers = options.headers.clone();

	headers.insert(
		REQUEST_ID_HEADER,
		HeaderValue::from_str(request_id)
			.map_err(|source| ConfigError::InvalidHeader { name: "x-request-id", source })?,
	);

	let bearer = if options.auth { token.filter(|token| !token.is_empty()) } else { None };

	if let Some(token) = bearer {
		let mut value = HeaderValue::from_str(&token.bearer())
			.map_err(|source| ConfigError::InvalidHeader { name: "authorization", source })?;

		value.set_sensitive(true);
		headers.insert(AUTHORIZATION, value);
	}

	let implies_json = options.body.as_ref().is_some_and(RequestBody::implies_json);

	if implies_json && !headers.contains_key(CONTENT_TYPE) {
		headers.insert(CONTENT_TYPE, APPLICATION_JSON);
	}

	Ok(headers)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn request_id() -> RequestId {
		RequestId::new("req-7").expect("Request id fixture should be valid.")
	}

	#[test]
	fn attaches_correlation_and_bearer() {
		let options = RequestOptions::new();
		let token = TokenSecret::new("access-1");
		let headers =
			prepare_headers(&options, &request_id(), Some(&token)).expect("Headers should build.");

		assert_eq!(headers[REQUEST_ID_HEADER], "req-7");
		assert_eq!(headers[AUTHORIZATION], "Bearer access-1");
		assert!(headers[AUTHORIZATION].is_sensitive());
		assert!(!headers.contains_key(CONTENT_TYPE));
	}

	#[test]
	fn auth_disabled_skips_bearer() {
		let options = RequestOptions::new().without_auth();
		let token = TokenSecret::new("access-1");
		let headers =
			prepare_headers(&options, &request_id(), Some(&token)).expect("Headers should build.");

		assert!(!headers.contains_key(AUTHORIZATION));
	}

	#[test]
	fn json_content_type_defaults_only_for_text_like_bodies() {
		let json = RequestOptions::new()
			.json(&serde_json::json!({ "value": 1 }))
			.expect("JSON body should encode.");
		let headers = prepare_headers(&json, &request_id(), None).expect("Headers should build.");

		assert_eq!(headers[CONTENT_TYPE], "application/json");

		let bytes = RequestOptions::new().body(RequestBody::Bytes(vec![1, 2, 3]));
		let headers = prepare_headers(&bytes, &request_id(), None).expect("Headers should build.");

		assert!(!headers.contains_key(CONTENT_TYPE));

		let explicit = RequestOptions::new()
			.header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
			.body(RequestBody::Text("hi".into()));
		let headers =
			prepare_headers(&explicit, &request_id(), None).expect("Headers should build.");

		assert_eq!(headers[CONTENT_TYPE], "text/plain");
	}

	#[test]
	fn caller_cannot_override_correlation_id() {
		let options = RequestOptions::new()
			.header(REQUEST_ID_HEADER, HeaderValue::from_static("spoofed"));
		let headers = prepare_headers(&options, &request_id(), None).expect("Headers should build.");

		assert_eq!(headers[REQUEST_ID_HEADER], "req-7");
		assert_eq!(RequestBody::Json(serde_json::json!({ "a": 1 })).to_bytes(), br#"{"a":1}"#);
	}
}
