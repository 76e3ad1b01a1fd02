//! The authenticated request client.
//!
//! [`ApiClient`] owns everything a call needs: the transport, the session store, the in-flight
//! registry, the pending-refresh slot, token listeners, and the telemetry store. Clones share all
//! of it, so one refresh and one de-duplication table serve every clone.

pub mod refresh;

pub(crate) mod inflight;

pub use refresh::RefreshMetrics;

// crates.io
use ::http::{Method, StatusCode};
// self
use crate::{
	_prelude::*,
	auth::{ListenerToken, RequestId, SessionTokens, TokenChange, TokenListeners, TokenSecret},
	client::{
		inflight::{CancelHandle, InflightRegistry},
		refresh::RefreshState,
	},
	config::ClientConfig,
	http::{ApiResponse, HttpTransport, OutboundRequest},
	obs::{self, MetricsStore, RequestOutcome, RequestSample, RequestSpan},
	request::{self, RequestBody, RequestOptions},
	store::SessionStore,
};
#[cfg(feature = "reqwest")] use crate::{error::ConfigError, http::ReqwestTransport};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestTransport>;

/// Authenticated HTTP client.
///
/// Every call gets a correlation id, the stored bearer token, a timeout, optional keyed
/// de-duplication, and one refresh-and-retry on `401`. HTTP error statuses are returned as
/// [`ApiResponse`]s; only timeouts, cancellation, transport, configuration, and store failures
/// become [`Error`]s.
pub struct ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Transport executing every exchange.
	pub transport: Arc<T>,
	/// Durable session storage.
	pub store: Arc<dyn SessionStore>,
	/// Shared configuration.
	pub config: Arc<ClientConfig>,
	listeners: Arc<TokenListeners>,
	metrics: Arc<MetricsStore>,
	inflight: Arc<InflightRegistry>,
	refresh: Arc<RefreshState>,
}
impl<T> ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a client around a caller-provided transport.
	pub fn with_transport(
		config: ClientConfig,
		store: Arc<dyn SessionStore>,
		transport: impl Into<Arc<T>>,
	) -> Self {
		Self {
			transport: transport.into(),
			store,
			config: Arc::new(config),
			listeners: Default::default(),
			metrics: Default::default(),
			inflight: Default::default(),
			refresh: Default::default(),
		}
	}

	/// Replaces the telemetry store, for example to share one across clients.
	pub fn with_metrics_store(mut self, metrics: Arc<MetricsStore>) -> Self {
		self.metrics = metrics;

		self
	}

	/// Token-change listeners.
	pub fn listeners(&self) -> &TokenListeners {
		&self.listeners
	}

	/// Shorthand for [`TokenListeners::subscribe`].
	pub fn on_token_change<F>(&self, handler: F) -> ListenerToken
	where
		F: 'static + Fn(&TokenChange) + Send + Sync,
	{
		self.listeners.subscribe(handler)
	}

	/// In-process telemetry recorded for every call.
	pub fn metrics(&self) -> &MetricsStore {
		&self.metrics
	}

	/// Refresh flow counters.
	pub fn refresh_metrics(&self) -> &RefreshMetrics {
		&self.refresh.metrics
	}

	/// Returns `true` while a request holds `dedupe_key`.
	pub fn is_in_flight(&self, dedupe_key: &str) -> bool {
		self.inflight.is_in_flight(dedupe_key)
	}

	/// Stores a new session (for example after sign-in) and notifies listeners.
	pub fn set_session(&self, tokens: SessionTokens) -> Result<()> {
		self.store.save(tokens)?;
		self.listeners.notify(&TokenChange::Replaced);

		Ok(())
	}

	/// Removes the stored session and notifies listeners.
	pub fn clear_session(&self) -> Result<()> {
		self.store.clear()?;
		self.listeners.notify(&TokenChange::Cleared);

		Ok(())
	}

	/// Sends a `GET` request.
	pub async fn get(&self, endpoint: &str) -> Result<ApiResponse> {
		self.request(endpoint, RequestOptions::new()).await
	}

	/// Sends a `POST` request with a JSON body.
	pub async fn post_json<B>(&self, endpoint: &str, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.request(endpoint, RequestOptions::new().method(Method::POST).json(body)?).await
	}

	/// Sends a `PUT` request with a JSON body.
	pub async fn put_json<B>(&self, endpoint: &str, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.request(endpoint, RequestOptions::new().method(Method::PUT).json(body)?).await
	}

	/// Sends a `DELETE` request.
	pub async fn delete(&self, endpoint: &str) -> Result<ApiResponse> {
		self.request(endpoint, RequestOptions::new().method(Method::DELETE)).await
	}

	/// Issues one authenticated call.
	///
	/// Resolves `endpoint`, stamps `X-Request-ID`, attaches the bearer token when `auth` is set,
	/// and races the exchange against the timeout and cancellation. A `401` on an authenticated
	/// call triggers the shared refresh and, when it yields a token, exactly one retry.
	///
	/// Dropping the returned future aborts the exchange and releases its de-duplication slot.
	pub async fn request(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
		let request_id = options.request_id.clone().unwrap_or_else(RequestId::generate);
		let resolved = self.config.resolve(endpoint, options.base_url);
		let label = match (&options.metrics_label, &resolved) {
			(Some(label), _) => label.clone(),
			(None, Ok(url)) => url_label(url),
			(None, Err(_)) => endpoint.to_owned(),
		};
		let span = RequestSpan::new(&label, options.method.as_str(), &request_id);
		let started = Instant::now();
		let result = span
			.instrument(async {
				match resolved {
					Ok(url) => self.dispatch(url, &options, &request_id).await,
					Err(e) => Err(e.into()),
				}
			})
			.await;

		self.record(&label, &options, request_id, started.elapsed(), &result);

		result
	}

	async fn dispatch(
		&self,
		url: Url,
		options: &RequestOptions,
		request_id: &RequestId,
	) -> Result<ApiResponse> {
		let handle = CancelHandle::new(options.cancel.as_ref());
		// Held until this future completes or is dropped.
		let _lease =
			options.dedupe_key.clone().map(|key| self.inflight.register(key, handle.clone()));
		let timeout = options.timeout.unwrap_or(self.config.default_timeout);

		tokio::select! {
			biased;

			_ = handle.token().cancelled() => Err(Error::Cancelled {
				request_id: request_id.clone(),
				reason: handle.reason(options.dedupe_key.as_ref()),
			}),
			result = self.exchange(&url, options, request_id) => result,
			_ = tokio::time::sleep(timeout) => Err(Error::Timeout {
				request_id: request_id.clone(),
				after: timeout,
			}),
		}
	}

	async fn exchange(
		&self,
		url: &Url,
		options: &RequestOptions,
		request_id: &RequestId,
	) -> Result<ApiResponse> {
		let token = if options.auth { self.store.access_token()? } else { None };
		let response = self.send(url, options, request_id, token.as_ref()).await?;

		if !options.auth || response.status != StatusCode::UNAUTHORIZED {
			return Ok(response);
		}

		#[cfg(feature = "tracing")]
		tracing::debug!("Received 401; refreshing the access token.");

		match self.refresh_now().await {
			Some(fresh) => self.send(url, options, request_id, Some(&fresh)).await,
			None => Ok(response),
		}
	}

	async fn send(
		&self,
		url: &Url,
		options: &RequestOptions,
		request_id: &RequestId,
		token: Option<&TokenSecret>,
	) -> Result<ApiResponse> {
		let outbound = OutboundRequest {
			method: options.method.clone(),
			url: url.clone(),
			headers: request::prepare_headers(options, request_id, token)?,
			body: options.body.as_ref().map(RequestBody::to_bytes),
		};

		Ok(self.transport.execute(outbound).await?)
	}

	fn record(
		&self,
		label: &str,
		options: &RequestOptions,
		request_id: RequestId,
		duration: Duration,
		result: &Result<ApiResponse>,
	) {
		let outcome = RequestOutcome::of(result);
		let status = result.as_ref().ok().map(ApiResponse::status_code);

		#[cfg(feature = "tracing")]
		match result {
			Ok(_) => tracing::info!(
				label,
				request_id = request_id.as_ref(),
				status,
				duration_ms = duration.as_millis() as u64,
				"Request completed."
			),
			Err(e) => tracing::warn!(
				label,
				request_id = request_id.as_ref(),
				outcome = outcome.as_str(),
				duration_ms = duration.as_millis() as u64,
				error = %e,
				"Request failed."
			),
		}

		obs::record_request_outcome(label, outcome, duration);
		self.metrics.record(
			label,
			RequestSample {
				request_id,
				status,
				duration,
				dedupe_key: options.dedupe_key.clone(),
				outcome,
				recorded_at: OffsetDateTime::now_utc(),
			},
		);
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestTransport> {
	/// Creates a client backed by a reqwest transport built from `config`.
	pub fn new(config: ClientConfig, store: Arc<dyn SessionStore>) -> Result<Self, ConfigError> {
		let transport = ReqwestTransport::from_config(&config)?;

		Ok(Self::with_transport(config, store, transport))
	}
}
impl<T> Clone for ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: Arc::clone(&self.transport),
			store: Arc::clone(&self.store),
			config: Arc::clone(&self.config),
			listeners: Arc::clone(&self.listeners),
			metrics: Arc::clone(&self.metrics),
			inflight: Arc::clone(&self.inflight),
			refresh: Arc::clone(&self.refresh),
		}
	}
}
impl<T> Debug for ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("config", &self.config)
			.field("in_flight", &self.inflight.len())
			.field("listeners", &self.listeners.len())
			.finish()
	}
}

// Query strings and fragments would give every distinct URL its own label.
fn url_label(url: &Url) -> String {
	let mut url = url.clone();

	url.set_query(None);
	url.set_fragment(None);

	url.into()
}
