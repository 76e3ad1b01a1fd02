// self
use crate::{_prelude::*, auth::RequestId};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedRequest<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedRequest<F> = F;

/// Span wrapping one call, including its refresh and retry.
#[derive(Clone, Debug)]
pub struct RequestSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl RequestSpan {
	/// Creates a span tagged with the call's label, method, and correlation id.
	pub fn new(label: &str, method: &str, request_id: &RequestId) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"session_fetch.request",
				label,
				method,
				request_id = request_id.as_ref()
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (label, method, request_id);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedRequest<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrument_wraps_future() {
		let id = RequestId::new("req-span").expect("Request id fixture should be valid.");
		let span = RequestSpan::new("profile.get", "GET", &id);
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
