//! Thread-safe in-memory [`SessionStore`] for tests and short-lived processes.

// self
use crate::{
	_prelude::*,
	auth::SessionTokens,
	store::{SessionStore, StoreError},
};

/// Keeps the session in-process; cloning shares the same slot.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<Option<SessionTokens>>>);
impl MemoryStore {
	/// Creates a store pre-populated with `tokens`.
	pub fn with_session(tokens: SessionTokens) -> Self {
		Self(Arc::new(RwLock::new(Some(tokens))))
	}
}
impl SessionStore for MemoryStore {
	fn load(&self) -> Result<Option<SessionTokens>, StoreError> {
		Ok(self.0.read().clone())
	}

	fn save(&self, tokens: SessionTokens) -> Result<(), StoreError> {
		*self.0.write() = Some(tokens);

		Ok(())
	}

	fn clear(&self) -> Result<(), StoreError> {
		self.0.write().take();

		Ok(())
	}
}
