#![allow(dead_code)]

// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use http::{HeaderMap, StatusCode};
use parking_lot::Mutex;
// self
use session_fetch::{
	auth::SessionTokens,
	client::ApiClient,
	config::ClientConfig,
	http::{ApiResponse, HttpTransport, OutboundRequest, TransportFuture},
	store::{MemoryStore, SessionStore},
};

pub const ACCESS_TOKEN: &str = "access-1";
pub const REFRESH_TOKEN: &str = "refresh-1";

pub fn seeded_store() -> Arc<MemoryStore> {
	Arc::new(MemoryStore::with_session(
		SessionTokens::new(ACCESS_TOKEN).with_refresh_token(REFRESH_TOKEN),
	))
}

pub fn config_for(backend: &str) -> ClientConfig {
	ClientConfig::builder(backend).build().expect("Test config should build.")
}

/// Reqwest transport that trusts the mock server's self-signed certificate.
#[cfg(feature = "reqwest")]
pub fn insecure_transport() -> session_fetch::http::ReqwestTransport {
	let client = session_fetch::reqwest::Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Insecure reqwest client should build.");

	session_fetch::http::ReqwestTransport::with_client(client)
}

#[cfg(feature = "reqwest")]
pub fn reqwest_client(
	backend: &str,
	store: Arc<dyn SessionStore>,
) -> session_fetch::client::ReqwestApiClient {
	ApiClient::with_transport(config_for(backend), store, insecure_transport())
}

/// Transport double that counts how many calls reach the "server".
///
/// A call arrives after `connect` and answers `200` after a further `latency`. Dropped calls are
/// counted as aborted.
pub struct CountingTransport {
	pub connect: Duration,
	pub latency: Duration,
	pub arrivals: AtomicUsize,
	pub completions: AtomicUsize,
	pub aborted: AtomicUsize,
	pub seen: Mutex<Vec<OutboundRequest>>,
}
impl CountingTransport {
	pub fn new(connect: Duration, latency: Duration) -> Self {
		Self {
			connect,
			latency,
			arrivals: AtomicUsize::new(0),
			completions: AtomicUsize::new(0),
			aborted: AtomicUsize::new(0),
			seen: Mutex::new(Vec::new()),
		}
	}

	pub fn arrivals(&self) -> usize {
		self.arrivals.load(Ordering::SeqCst)
	}

	pub fn completions(&self) -> usize {
		self.completions.load(Ordering::SeqCst)
	}

	pub fn aborted(&self) -> usize {
		self.aborted.load(Ordering::SeqCst)
	}
}
impl HttpTransport for CountingTransport {
	fn execute(&self, request: OutboundRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let mut guard = AbortGuard { counter: &self.aborted, armed: true };
			let url = request.url.clone();

			self.seen.lock().push(request);
			tokio::time::sleep(self.connect).await;
			self.arrivals.fetch_add(1, Ordering::SeqCst);
			tokio::time::sleep(self.latency).await;
			self.completions.fetch_add(1, Ordering::SeqCst);

			guard.armed = false;

			Ok(ApiResponse {
				status: StatusCode::OK,
				headers: HeaderMap::new(),
				body: br#"{"id":"user-1"}"#.to_vec(),
				url,
			})
		})
	}
}

pub fn counting_client(transport: CountingTransport) -> ApiClient<CountingTransport> {
	ApiClient::with_transport(config_for("http://backend.test"), seeded_store(), transport)
}

struct AbortGuard<'a> {
	counter: &'a AtomicUsize,
	armed: bool,
}
impl Drop for AbortGuard<'_> {
	fn drop(&mut self) {
		if self.armed {
			self.counter.fetch_add(1, Ordering::SeqCst);
		}
	}
}
