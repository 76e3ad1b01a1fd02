//! Durable session storage contracts and built-in store implementations.
//!
//! The client reads the access token synchronously while building every request and writes the
//! token pair back after a refresh, so the contract is synchronous. Implementations must keep
//! each call short; nothing here is held across an `.await`.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{SessionTokens, TokenSecret},
};

/// Storage backend contract for the session token pair.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Returns the stored session, if any.
	fn load(&self) -> Result<Option<SessionTokens>, StoreError>;

	/// Persists or replaces the session.
	fn save(&self, tokens: SessionTokens) -> Result<(), StoreError>;

	/// Removes the stored session.
	fn clear(&self) -> Result<(), StoreError>;

	/// Returns the current access token.
	fn access_token(&self) -> Result<Option<TokenSecret>, StoreError> {
		Ok(self.load()?.map(|tokens| tokens.access_token).filter(|token| !token.is_empty()))
	}

	/// Returns the current refresh token.
	fn refresh_token(&self) -> Result<Option<TokenSecret>, StoreError> {
		Ok(self.load()?.and_then(|tokens| tokens.refresh_token).filter(|token| !token.is_empty()))
	}
}

/// Error type produced by [`SessionStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
