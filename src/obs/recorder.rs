// self
use crate::{
	_prelude::*,
	auth::{DedupeKey, RequestId},
	obs::RequestOutcome,
};

/// One recorded call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestSample {
	/// Correlation id sent in `X-Request-ID`.
	pub request_id: RequestId,
	/// Final HTTP status, when a response arrived.
	pub status: Option<u16>,
	/// Wall time from dispatch to completion, refresh and retry included.
	pub duration: Duration,
	/// De-duplication key, when one was used.
	pub dedupe_key: Option<DedupeKey>,
	/// Terminal state.
	pub outcome: RequestOutcome,
	/// When the sample was recorded.
	pub recorded_at: OffsetDateTime,
}
impl RequestSample {
	/// Returns `true` for calls that completed with a 2xx status.
	pub fn is_success(&self) -> bool {
		matches!(self.status, Some(200..=299))
	}
}

/// Aggregates and recent samples for one label.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelStats {
	/// Calls recorded under the label.
	pub total: u64,
	/// Calls that did not end with a 2xx status.
	pub failures: u64,
	/// Most recent samples, oldest first.
	pub recent: VecDeque<RequestSample>,
}
impl LabelStats {
	/// Most recent sample.
	pub fn latest(&self) -> Option<&RequestSample> {
		self.recent.back()
	}
}

/// In-process telemetry keyed by metrics label (or resolved URL).
#[derive(Debug)]
pub struct MetricsStore {
	capacity: usize,
	max_labels: usize,
	labels: RwLock<HashMap<String, LabelStats>>,
}
impl MetricsStore {
	/// Samples retained per label by [`MetricsStore::default`].
	pub const DEFAULT_CAPACITY: usize = 50;
	/// Labels retained by [`MetricsStore::default`].
	pub const DEFAULT_MAX_LABELS: usize = 256;

	/// Creates a store keeping at most `capacity` samples per label.
	pub fn with_capacity(capacity: usize) -> Self {
		Self::with_limits(capacity, Self::DEFAULT_MAX_LABELS)
	}

	/// Creates a store keeping at most `capacity` samples per label and `max_labels` labels.
	///
	/// Recording a new label at the limit evicts the label whose latest sample is oldest.
	pub fn with_limits(capacity: usize, max_labels: usize) -> Self {
		Self { capacity: capacity.max(1), max_labels: max_labels.max(1), labels: Default::default() }
	}

	/// Records one sample under `label`.
	pub fn record(&self, label: &str, sample: RequestSample) {
		let mut labels = self.labels.write();

		if !labels.contains_key(label) && labels.len() >= self.max_labels {
			let stalest = labels
				.iter()
				.min_by_key(|(_, stats)| stats.latest().map(|s| s.recorded_at))
				.map(|(label, _)| label.clone());

			if let Some(stalest) = stalest {
				labels.remove(&stalest);
			}
		}

		let stats = labels.entry(label.to_owned()).or_default();

		stats.total += 1;

		if !sample.is_success() {
			stats.failures += 1;
		}
		if stats.recent.len() == self.capacity {
			stats.recent.pop_front();
		}

		stats.recent.push_back(sample);
	}

	/// Most recent sample recorded under `label`.
	pub fn latest(&self, label: &str) -> Option<RequestSample> {
		self.labels.read().get(label).and_then(|stats| stats.latest().cloned())
	}

	/// Stats recorded under `label`.
	pub fn stats(&self, label: &str) -> Option<LabelStats> {
		self.labels.read().get(label).cloned()
	}

	/// Recent samples recorded under `label`, oldest first.
	pub fn samples(&self, label: &str) -> Vec<RequestSample> {
		self.labels
			.read()
			.get(label)
			.map(|stats| stats.recent.iter().cloned().collect())
			.unwrap_or_default()
	}

	/// Finds the sample carrying `request_id`, searching every label.
	pub fn find(&self, request_id: &RequestId) -> Option<(String, RequestSample)> {
		self.labels.read().iter().find_map(|(label, stats)| {
			stats
				.recent
				.iter()
				.find(|sample| &sample.request_id == request_id)
				.map(|sample| (label.clone(), sample.clone()))
		})
	}

	/// Copy of every label's stats.
	pub fn snapshot(&self) -> HashMap<String, LabelStats> {
		self.labels.read().clone()
	}

	/// Drops all recorded data.
	pub fn clear(&self) {
		self.labels.write().clear();
	}
}
impl Default for MetricsStore {
	fn default() -> Self {
		Self::with_capacity(Self::DEFAULT_CAPACITY)
	}
}
