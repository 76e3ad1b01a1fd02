//! Observability helpers for the request pipeline.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to wrap every call in a `session_fetch.request` span carrying the `label`,
//!   `method`, and `request_id` fields, and to log supersedes, refreshes, and completions.
//! - Enable `metrics` to increment the `session_fetch_request_total` counter (labeled by `label` +
//!   `outcome`) and record `session_fetch_request_duration_seconds` for every completed call.
//!
//! [`MetricsStore`] is always available and keeps recent samples in-process.

mod metrics;
mod recorder;
mod tracing;

pub use metrics::*;
pub use recorder::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Terminal state of one call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestOutcome {
	/// A response arrived (any status).
	Completed,
	/// The timeout elapsed first.
	TimedOut,
	/// Superseded or cancelled by the caller.
	Cancelled,
	/// Transport, configuration, or store failure.
	Failed,
}
impl RequestOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestOutcome::Completed => "completed",
			RequestOutcome::TimedOut => "timed_out",
			RequestOutcome::Cancelled => "cancelled",
			RequestOutcome::Failed => "failed",
		}
	}

	/// Classifies the result of a call.
	pub fn of<T>(result: &Result<T>) -> Self {
		match result {
			Ok(_) => Self::Completed,
			Err(Error::Timeout { .. }) => Self::TimedOut,
			Err(Error::Cancelled { .. }) => Self::Cancelled,
			Err(_) => Self::Failed,
		}
	}
}
impl Display for RequestOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
