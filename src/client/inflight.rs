//! Keyed registry of live requests.
//!
//! Registering under a key cancels the previous holder inside the same critical section, so at
//! most one request per key is ever live. Entries are released through [`InflightLease`] on
//! every exit path, and only while the entry still belongs to the releasing request.

// std
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
// crates.io
use tokio_util::sync::CancellationToken;
// self
use crate::{_prelude::*, auth::DedupeKey, error::CancelReason};

/// Cancellation state owned by one request.
#[derive(Clone, Debug)]
pub(crate) struct CancelHandle {
	token: CancellationToken,
	superseded: Arc<AtomicBool>,
}
impl CancelHandle {
	/// Creates a handle, chained to the caller's token when one is supplied.
	pub(crate) fn new(parent: Option<&CancellationToken>) -> Self {
		let token =
			parent.map(CancellationToken::child_token).unwrap_or_else(CancellationToken::new);

		Self { token, superseded: Default::default() }
	}

	pub(crate) fn token(&self) -> &CancellationToken {
		&self.token
	}

	/// Explains why [`CancelHandle::token`] fired.
	pub(crate) fn reason(&self, key: Option<&DedupeKey>) -> CancelReason {
		match key {
			Some(key) if self.superseded.load(Ordering::Acquire) =>
				CancelReason::Superseded { dedupe_key: key.clone() },
			_ => CancelReason::Caller,
		}
	}

	fn supersede(&self) {
		self.superseded.store(true, Ordering::Release);
		self.token.cancel();
	}
}

#[derive(Debug)]
struct InflightEntry {
	id: u64,
	handle: CancelHandle,
}

/// Map from de-duplication key to the request currently holding it.
#[derive(Debug, Default)]
pub(crate) struct InflightRegistry {
	next_id: AtomicU64,
	entries: Mutex<HashMap<DedupeKey, InflightEntry>>,
}
impl InflightRegistry {
	/// Installs `handle` as the live request for `key`, cancelling any previous holder.
	pub(crate) fn register(
		self: &Arc<Self>,
		key: DedupeKey,
		handle: CancelHandle,
	) -> InflightLease {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let mut entries = self.entries.lock();

		if let Some(previous) = entries.insert(key.clone(), InflightEntry { id, handle }) {
			previous.handle.supersede();

			#[cfg(feature = "tracing")]
			tracing::debug!(dedupe_key = key.as_ref(), "Superseded in-flight request.");
		}

		InflightLease { registry: Arc::clone(self), key, id }
	}

	/// Returns `true` while some request holds `key`.
	pub(crate) fn is_in_flight(&self, key: &str) -> bool {
		self.entries.lock().contains_key(key)
	}

	pub(crate) fn len(&self) -> usize {
		self.entries.lock().len()
	}

	fn release(&self, key: &DedupeKey, id: u64) {
		let mut entries = self.entries.lock();

		if entries.get(key).is_some_and(|entry| entry.id == id) {
			entries.remove(key);
		}
	}
}

/// Releases its registry entry on drop, unless a newer request already took the key.
#[derive(Debug)]
pub(crate) struct InflightLease {
	registry: Arc<InflightRegistry>,
	key: DedupeKey,
	id: u64,
}
impl Drop for InflightLease {
	fn drop(&mut self) {
		self.registry.release(&self.key, self.id);
	}
}
