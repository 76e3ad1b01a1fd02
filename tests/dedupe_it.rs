mod common;

// std
use std::time::{Duration, Instant};
// self
use common::*;
use session_fetch::{
	CancellationToken,
	auth::{DedupeKey, RequestId},
	error::{CancelReason, Error, ErrorKind},
	obs::RequestOutcome,
	request::{REQUEST_ID_HEADER, RequestOptions},
};

fn profile_key() -> DedupeKey {
	DedupeKey::new("profile-fetch").expect("Dedupe key fixture should be valid.")
}

#[tokio::test]
async fn back_to_back_profile_fetch_reaches_server_once() {
	let client = counting_client(CountingTransport::new(
		Duration::from_millis(20),
		Duration::from_millis(20),
	));
	let options = || {
		RequestOptions::new().dedupe_key(profile_key()).timeout(Duration::from_millis(5_000))
	};
	let (first, second) = tokio::join!(
		client.request("/api/profile", options()),
		client.request("/api/profile", options())
	);
	let err = first.expect_err("First call should be superseded.");

	assert_eq!(err.kind(), ErrorKind::Cancelled);
	assert_eq!(err.kind().reason_name(), "AbortError");
	assert!(matches!(
		err,
		Error::Cancelled { reason: CancelReason::Superseded { .. }, .. }
	));

	let response = second.expect("Second call should complete.");

	assert_eq!(response.status_code(), 200);
	assert_eq!(client.transport.arrivals(), 1);
	assert_eq!(client.transport.completions(), 1);
	assert_eq!(client.transport.aborted(), 1);
	assert!(!client.is_in_flight("profile-fetch"));

	let stats = client
		.metrics()
		.stats("http://backend.test/api/profile")
		.expect("Both calls should be recorded.");
	let outcomes: Vec<_> = stats.recent.iter().map(|sample| sample.outcome).collect();

	assert_eq!(outcomes, vec![RequestOutcome::Cancelled, RequestOutcome::Completed]);
}

#[tokio::test]
async fn superseded_cleanup_keeps_newer_holder() {
	let client = counting_client(CountingTransport::new(
		Duration::from_millis(10),
		Duration::from_millis(120),
	));
	let first = tokio::spawn({
		let client = client.clone();

		async move {
			client.request("/api/profile", RequestOptions::new().dedupe_key(profile_key())).await
		}
	});

	tokio::time::sleep(Duration::from_millis(30)).await;

	let second = tokio::spawn({
		let client = client.clone();

		async move {
			client.request("/api/profile", RequestOptions::new().dedupe_key(profile_key())).await
		}
	});
	let first = first.await.expect("First task should join.");

	assert!(first.expect_err("First call should be superseded.").is_cancelled());
	// The first call's cleanup has run; the key still belongs to the second call.
	assert!(client.is_in_flight("profile-fetch"));

	second.await.expect("Second task should join.").expect("Second call should complete.");

	assert!(!client.is_in_flight("profile-fetch"));
}

#[tokio::test]
async fn distinct_keys_do_not_interfere() {
	let client = counting_client(CountingTransport::new(
		Duration::from_millis(5),
		Duration::from_millis(5),
	));
	let left = RequestOptions::new().dedupe_key(DedupeKey::new("left").expect("Valid key."));
	let right = RequestOptions::new().dedupe_key(DedupeKey::new("right").expect("Valid key."));
	let (a, b) = tokio::join!(client.request("/a", left), client.request("/b", right));

	assert!(a.is_ok());
	assert!(b.is_ok());
	assert_eq!(client.transport.completions(), 2);
}

#[tokio::test]
async fn timeout_aborts_underlying_exchange() {
	let client = counting_client(CountingTransport::new(
		Duration::from_millis(5),
		Duration::from_secs(30),
	));
	let started = Instant::now();
	let err = client
		.request(
			"/api/slow",
			RequestOptions::new()
				.timeout(Duration::from_millis(50))
				.metrics_label("slow")
				.dedupe_key(DedupeKey::new("slow").expect("Valid key.")),
		)
		.await
		.expect_err("Call should time out.");
	let elapsed = started.elapsed();

	assert!(err.is_timeout());
	assert_eq!(err.kind().reason_name(), "TimeoutError");
	assert!(elapsed >= Duration::from_millis(50));
	assert!(elapsed < Duration::from_millis(1_000), "Timed out too late: {elapsed:?}.");
	assert_eq!(client.transport.aborted(), 1);
	assert_eq!(client.transport.completions(), 0);
	assert!(!client.is_in_flight("slow"));

	let sample = client.metrics().latest("slow").expect("Timeout should be recorded.");

	assert_eq!(sample.outcome, RequestOutcome::TimedOut);
	assert_eq!(sample.status, None);
}

#[tokio::test]
async fn caller_token_cancels_request() {
	let client = counting_client(CountingTransport::new(
		Duration::from_millis(5),
		Duration::from_secs(30),
	));
	let token = CancellationToken::new();
	let cancel = token.clone();

	tokio::spawn(async move {
		tokio::time::sleep(Duration::from_millis(30)).await;
		cancel.cancel();
	});

	let err = client
		.request("/api/slow", RequestOptions::new().cancel_token(token))
		.await
		.expect_err("Call should be cancelled.");

	assert!(matches!(err, Error::Cancelled { reason: CancelReason::Caller, .. }));
	assert_eq!(client.transport.aborted(), 1);
}

#[tokio::test]
async fn correlation_header_matches_recorded_sample() {
	let client = counting_client(CountingTransport::new(Duration::ZERO, Duration::ZERO));

	client
		.request("/api/profile", RequestOptions::new().metrics_label("profile"))
		.await
		.expect("Call should complete.");

	let sample = client.metrics().latest("profile").expect("Call should be recorded.");
	let seen = client.transport.seen.lock();
	let header = seen[0].headers[REQUEST_ID_HEADER].to_str().expect("Header should be ASCII.");

	assert_eq!(header, sample.request_id.as_ref());

	drop(seen);

	let explicit = RequestId::new("req-explicit").expect("Request id fixture should be valid.");

	client
		.request("/api/profile", RequestOptions::new().request_id(explicit.clone()))
		.await
		.expect("Call should complete.");

	assert_eq!(client.transport.seen.lock()[1].headers[REQUEST_ID_HEADER], "req-explicit");
	assert!(client.metrics().find(&explicit).is_some());
}
