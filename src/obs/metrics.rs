// self
use crate::{_prelude::*, obs::RequestOutcome};

/// Records a call outcome via the global metrics recorder (when enabled).
pub fn record_request_outcome(label: &str, outcome: RequestOutcome, duration: Duration) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"session_fetch_request_total",
			"label" => label.to_owned(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
		metrics::histogram!(
			"session_fetch_request_duration_seconds",
			"label" => label.to_owned()
		)
		.record(duration.as_secs_f64());
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (label, outcome, duration);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_request_outcome_without_recorder_is_noop() {
		record_request_outcome("profile.get", RequestOutcome::TimedOut, Duration::from_millis(5));
	}
}
