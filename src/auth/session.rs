//! Session token models and the backend's refresh payload.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Lifetime assumed when the backend omits `expires_in` or sends a non-positive value.
pub const DEFAULT_SESSION_TTL: time::Duration = time::Duration::minutes(15);

/// Access + refresh token pair persisted in a [`SessionStore`](crate::store::SessionStore).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
	/// Short-lived bearer credential attached to authenticated requests.
	pub access_token: TokenSecret,
	/// Longer-lived secret used to mint new access tokens.
	pub refresh_token: Option<TokenSecret>,
	/// Instant after which the access token is expected to be rejected.
	pub expires_at: Option<OffsetDateTime>,
}
impl SessionTokens {
	/// Creates a session from an access token alone.
	pub fn new(access_token: impl Into<TokenSecret>) -> Self {
		Self { access_token: access_token.into(), refresh_token: None, expires_at: None }
	}

	/// Attaches a refresh token.
	pub fn with_refresh_token(mut self, refresh_token: impl Into<TokenSecret>) -> Self {
		self.refresh_token = Some(refresh_token.into());

		self
	}

	/// Sets the access token expiry instant.
	pub fn with_expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Returns `true` once `instant` has reached the recorded expiry.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| instant >= expires_at)
	}
}

/// User profile returned alongside freshly minted tokens.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
	/// Backend user id.
	pub id: String,
	/// Account email.
	pub email: String,
	/// Display name.
	#[serde(default)]
	pub name: Option<String>,
	/// Avatar URL.
	#[serde(default)]
	pub image: Option<String>,
	/// Verified phone number.
	#[serde(default)]
	pub phone: Option<String>,
	/// Preferred locale.
	#[serde(default)]
	pub locale: Option<String>,
	/// Whether onboarding finished.
	#[serde(default)]
	pub onboarding_completed: Option<bool>,
	/// Last completed onboarding step.
	#[serde(default)]
	pub onboarding_step: Option<u32>,
	/// Whether the phone number was verified.
	#[serde(default)]
	pub phone_verified: Option<bool>,
}

/// Body returned by `POST /api/v1/auth/refresh`.
#[derive(Clone, Debug, Deserialize)]
pub struct RefreshResponse {
	/// Newly minted access token.
	pub access_token: TokenSecret,
	/// Rotated refresh token, when the backend rotates.
	#[serde(default)]
	pub refresh_token: Option<TokenSecret>,
	/// Access token lifetime in seconds.
	#[serde(default)]
	pub expires_in: Option<i64>,
	/// Token type, normally `bearer`.
	#[serde(default)]
	pub token_type: Option<String>,
	/// Profile of the authenticated user.
	#[serde(default)]
	pub user: Option<AuthUser>,
}
impl RefreshResponse {
	/// Converts the payload into stored tokens, keeping `previous_refresh` when the backend did
	/// not rotate the refresh token.
	pub fn into_session(
		self,
		previous_refresh: Option<TokenSecret>,
		now: OffsetDateTime,
	) -> (SessionTokens, Option<AuthUser>) {
		let ttl = match self.expires_in {
			Some(secs) if secs > 0 => time::Duration::seconds(secs),
			_ => DEFAULT_SESSION_TTL,
		};
		let refresh_token =
			self.refresh_token.filter(|token| !token.is_empty()).or(previous_refresh);
		let tokens = SessionTokens {
			access_token: self.access_token,
			refresh_token,
			expires_at: Some(now + ttl),
		};

		(tokens, self.user)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn parse(body: &str) -> RefreshResponse {
		serde_json::from_str(body).expect("Refresh fixture should deserialize.")
	}

	#[test]
	fn rotated_refresh_token_replaces_previous() {
		let now = OffsetDateTime::now_utc();
		let (tokens, user) = parse(
			r#"{"access_token":"a2","refresh_token":"r2","expires_in":900,"user":{"id":"u1","email":"ava@example.com"}}"#,
		)
		.into_session(Some(TokenSecret::new("r1")), now);

		assert_eq!(tokens.access_token.expose(), "a2");
		assert_eq!(tokens.refresh_token.as_ref().map(TokenSecret::expose), Some("r2"));
		assert_eq!(tokens.expires_at, Some(now + time::Duration::seconds(900)));
		assert_eq!(user.map(|user| user.email), Some("ava@example.com".into()));
	}

	#[test]
	fn missing_fields_fall_back_to_previous_refresh_and_default_ttl() {
		let now = OffsetDateTime::now_utc();
		let (tokens, user) = parse(r#"{"access_token":"a2","expires_in":0}"#)
			.into_session(Some(TokenSecret::new("r1")), now);

		assert_eq!(tokens.refresh_token.as_ref().map(TokenSecret::expose), Some("r1"));
		assert_eq!(tokens.expires_at, Some(now + DEFAULT_SESSION_TTL));
		assert!(user.is_none());
		assert!(!tokens.is_expired_at(now));
		assert!(tokens.is_expired_at(now + DEFAULT_SESSION_TTL));
	}
}
