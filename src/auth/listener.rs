//! Token-change subscriptions.
//!
//! Handlers register through [`TokenListeners::subscribe`] and keep the returned
//! [`ListenerToken`] to deregister later. Notifications run synchronously on the task that
//! changed the session, so handlers should hand heavy work off elsewhere.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{_prelude::*, auth::AuthUser};

type Handler = Arc<dyn Fn(&TokenChange) + Send + Sync>;

/// Session change delivered to listeners.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenChange {
	/// A refresh minted a new access token.
	Refreshed {
		/// Expiry of the new access token.
		expires_at: Option<OffsetDateTime>,
		/// User profile returned by the refresh endpoint.
		user: Option<AuthUser>,
	},
	/// The caller replaced the session (for example after sign-in).
	Replaced,
	/// The session was cleared.
	Cleared,
}

/// Deregistration handle returned by [`TokenListeners::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerToken(u64);

/// Registry of token-change handlers.
#[derive(Default)]
pub struct TokenListeners {
	next_id: AtomicU64,
	handlers: RwLock<Vec<(ListenerToken, Handler)>>,
}
impl TokenListeners {
	/// Registers a handler and returns its deregistration token.
	pub fn subscribe<F>(&self, handler: F) -> ListenerToken
	where
		F: 'static + Fn(&TokenChange) + Send + Sync,
	{
		let token = ListenerToken(self.next_id.fetch_add(1, Ordering::Relaxed));

		self.handlers.write().push((token, Arc::new(handler)));

		token
	}

	/// Removes a handler; returns `false` when the token was already gone.
	pub fn unsubscribe(&self, token: ListenerToken) -> bool {
		let mut handlers = self.handlers.write();
		let before = handlers.len();

		handlers.retain(|(id, _)| *id != token);

		handlers.len() != before
	}

	/// Number of registered handlers.
	pub fn len(&self) -> usize {
		self.handlers.read().len()
	}

	/// Returns `true` when nobody is subscribed.
	pub fn is_empty(&self) -> bool {
		self.handlers.read().is_empty()
	}

	/// Delivers `change` to every handler.
	pub fn notify(&self, change: &TokenChange) {
		// Snapshot first so handlers may (un)subscribe without deadlocking.
		let handlers: Vec<Handler> =
			self.handlers.read().iter().map(|(_, handler)| Arc::clone(handler)).collect();

		for handler in handlers {
			handler(change);
		}
	}
}
impl Debug for TokenListeners {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenListeners").field("len", &self.len()).finish()
	}
}
