//! Single-flight access-token refresh.
//!
//! At most one refresh call is in flight per client (clones included). Callers that hit a `401`
//! while a refresh is running join the pending cell and observe the same settled result. The
//! pending slot is cleared once the refresh settles, so the next `401` starts a fresh one. The
//! refresh runs on its own task and outlives the request that started it.
//! Failures never surface to request callers; they simply yield no token.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use ::http::Method;
use async_lock::OnceCell;
// self
use crate::{
	_prelude::*,
	auth::{RefreshResponse, RequestId, TokenChange, TokenSecret},
	client::ApiClient,
	error::{ConfigError, TransportError},
	http::{HttpTransport, OutboundRequest},
	request::{self, RequestBody, RequestOptions},
	store::StoreError,
};

type RefreshCell = Arc<OnceCell<Option<TokenSecret>>>;

/// Shared pending-refresh slot.
#[derive(Debug, Default)]
pub(crate) struct RefreshState {
	pending: Mutex<Option<RefreshCell>>,
	pub(crate) metrics: RefreshMetrics,
}

/// Publishes the refresh result and clears the pending slot.
///
/// If the refresh task ends without a result (panic or runtime shutdown), waiters receive `None`.
struct SettleGuard {
	state: Arc<RefreshState>,
	cell: RefreshCell,
}
impl SettleGuard {
	async fn finish(self, token: Option<TokenSecret>) {
		let _ = self.cell.set(token).await;
	}
}
impl Drop for SettleGuard {
	fn drop(&mut self) {
		if !self.cell.is_initialized() {
			let _ = self.cell.set_blocking(None);
		}

		let mut pending = self.state.pending.lock();

		if pending.as_ref().is_some_and(|current| Arc::ptr_eq(current, &self.cell)) {
			*pending = None;
		}
	}
}

#[derive(Debug, ThisError)]
pub(crate) enum RefreshError {
	#[error("No refresh token is stored.")]
	MissingRefreshToken,
	#[error("Refresh endpoint answered with status {status}: {}.", .detail.as_deref().unwrap_or("no detail"))]
	Rejected { status: u16, detail: Option<String> },
	#[error("Refresh endpoint returned malformed JSON.")]
	Parse(#[from] serde_path_to_error::Error<serde_json::Error>),
	#[error("Refresh endpoint returned an empty access token.")]
	EmptyAccessToken,
	#[error("Refresh call timed out after {}ms.", .0.as_millis())]
	TimedOut(Duration),
	#[error(transparent)]
	Transport(#[from] TransportError),
	#[error(transparent)]
	Config(#[from] ConfigError),
	#[error(transparent)]
	Storage(#[from] StoreError),
}

impl<T> ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Refreshes the access token, joining a refresh that is already in flight.
	///
	/// Returns the new access token, or `None` when no refresh token is stored or the refresh
	/// failed. The request pipeline calls this on `401`; callers may also use it directly.
	///
	/// The refresh runs on its own task, so dropping the caller (timeout, supersede, or
	/// cancellation) neither aborts it nor leaves the pending slot behind.
	pub async fn refresh_now(&self) -> Option<TokenSecret> {
		let cell = {
			let mut pending = self.refresh.pending.lock();

			match pending.as_ref() {
				Some(cell) => {
					self.refresh.metrics.record_join();

					Arc::clone(cell)
				},
				None => {
					match self.store.refresh_token() {
						Ok(Some(_)) => (),
						Ok(None) => {
							self.refresh.metrics.record_skip();

							return None;
						},
						Err(_err) => {
							#[cfg(feature = "tracing")]
							tracing::warn!(error = %_err, "Failed to read refresh token.");

							self.refresh.metrics.record_skip();

							return None;
						},
					}

					let cell = RefreshCell::default();

					*pending = Some(Arc::clone(&cell));

					self.spawn_refresh(Arc::clone(&cell));

					cell
				},
			}
		};

		cell.wait().await.clone()
	}

	fn spawn_refresh(&self, cell: RefreshCell) {
		let client = self.clone();

		tokio::spawn(async move {
			let settle = SettleGuard { state: Arc::clone(&client.refresh), cell };
			let token = client.run_refresh().await;

			settle.finish(token).await;
		});
	}

	async fn run_refresh(&self) -> Option<TokenSecret> {
		self.refresh.metrics.record_attempt();

		match self.perform_refresh().await {
			Ok(token) => {
				self.refresh.metrics.record_success();

				#[cfg(feature = "tracing")]
				tracing::info!("Access token refreshed.");

				Some(token)
			},
			Err(_err) => {
				self.refresh.metrics.record_failure();

				#[cfg(feature = "tracing")]
				tracing::warn!(error = %_err, "Token refresh failed.");

				None
			},
		}
	}

	async fn perform_refresh(&self) -> Result<TokenSecret, RefreshError> {
		let refresh_token = self.store.refresh_token()?.ok_or(RefreshError::MissingRefreshToken)?;
		let url = self.config.refresh_url()?;
		let request_id = RequestId::generate();
		let options = RequestOptions::new().method(Method::POST).without_auth().body(
			RequestBody::Json(serde_json::json!({ "refresh_token": refresh_token.expose() })),
		);
		let headers = request::prepare_headers(&options, &request_id, None)?;
		let outbound = OutboundRequest {
			method: options.method.clone(),
			url,
			headers,
			body: options.body.as_ref().map(RequestBody::to_bytes),
		};
		let timeout = self.config.default_timeout;
		let response = tokio::time::timeout(timeout, self.transport.execute(outbound))
			.await
			.map_err(|_| RefreshError::TimedOut(timeout))??;

		if !response.is_success() {
			return Err(RefreshError::Rejected {
				status: response.status_code(),
				detail: response.detail(),
			});
		}

		let mut deserializer = serde_json::Deserializer::from_slice(&response.body);
		let payload: RefreshResponse = serde_path_to_error::deserialize(&mut deserializer)?;

		if payload.access_token.is_empty() {
			return Err(RefreshError::EmptyAccessToken);
		}

		let (tokens, user) = payload.into_session(Some(refresh_token), OffsetDateTime::now_utc());
		let access_token = tokens.access_token.clone();
		let expires_at = tokens.expires_at;

		self.store.save(tokens)?;
		self.listeners.notify(&TokenChange::Refreshed { expires_at, user });

		Ok(access_token)
	}
}
