//! Demonstrates an expired access token being refreshed transparently, plus keyed
//! de-duplication, against a local mock backend.

// std
use std::{sync::Arc, time::Duration};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use session_fetch::{
	auth::{DedupeKey, SessionTokens, TokenChange},
	client::ReqwestApiClient,
	config::ClientConfig,
	http::ReqwestTransport,
	request::RequestOptions,
	reqwest::Client,
	store::{MemoryStore, SessionStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let expired = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/profile")
				.header("authorization", "Bearer expired-access");
			then.status(401).body("{\"detail\":\"token expired\"}");
		})
		.await;
	let _profile = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/profile").header("authorization", "Bearer demo-access");
			then.status(200)
				.delay(Duration::from_millis(50))
				.header("content-type", "application/json")
				.body("{\"id\":\"user-1\",\"email\":\"ada@example.com\"}");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(ClientConfig::DEFAULT_REFRESH_PATH);
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"refresh_token\":\"demo-refresh-2\",\"expires_in\":900}",
			);
		})
		.await;
	let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::with_session(
		SessionTokens::new("expired-access").with_refresh_token("demo-refresh"),
	));
	let transport = ReqwestTransport::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let client = ReqwestApiClient::with_transport(
		ClientConfig::builder(server.base_url()).build()?,
		store,
		transport,
	);

	client.on_token_change(|change| {
		if let TokenChange::Refreshed { expires_at, .. } = change {
			println!("Session refreshed; new token expires at {expires_at:?}.");
		}
	});

	let response = client.get("/api/profile").await?;

	println!("Profile ({}): {}.", response.status_code(), response.text());

	let key = DedupeKey::new("profile-fetch")?;
	let options = || RequestOptions::new().dedupe_key(key.clone()).metrics_label("profile");
	let (first, second) = tokio::join!(
		client.request("/api/profile", options()),
		client.request("/api/profile", options())
	);

	match first {
		Ok(response) => println!("First profile fetch completed ({}).", response.status_code()),
		Err(e) => println!("First profile fetch: {e}"),
	}

	println!("Second profile fetch completed ({}).", second?.status_code());

	if let Some(stats) = client.metrics().stats("profile") {
		println!("Recorded {} profile calls, {} without a 2xx status.", stats.total, stats.failures);
	}

	expired.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;

	Ok(())
}
