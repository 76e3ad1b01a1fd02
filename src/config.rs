//! Client configuration: backend origin, same-origin app host, timeouts, refresh endpoint.

// std
use std::env;
// self
use crate::{_prelude::*, error::ConfigError};

/// Environment variable holding the backend origin.
pub const ENV_BACKEND_URL: &str = "SESSION_FETCH_BACKEND_URL";
/// Environment variable holding the app origin used for [`BaseUrl::Relative`] endpoints.
pub const ENV_APP_ORIGIN: &str = "SESSION_FETCH_APP_ORIGIN";
/// Environment variable overriding the default per-call timeout, in milliseconds.
pub const ENV_TIMEOUT_MS: &str = "SESSION_FETCH_TIMEOUT_MS";

/// How a non-absolute endpoint is turned into a URL.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BaseUrl {
	/// Prefix with the configured backend origin.
	#[default]
	Backend,
	/// Same-origin route (for example `/api/...` proxy routes) resolved against the app origin.
	Relative,
	/// The caller guarantees a complete URL.
	Absolute,
}

/// Settings shared by every request issued through a client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// Origin of the backend REST API, without a trailing slash.
	pub backend_origin: Url,
	/// Origin serving same-origin proxy routes.
	pub app_origin: Option<Url>,
	/// Timeout applied when a request does not set its own.
	pub default_timeout: Duration,
	/// Path of the token refresh endpoint on the backend.
	pub refresh_path: String,
	/// Optional `User-Agent` sent by the default transport.
	pub user_agent: Option<String>,
}
impl ClientConfig {
	/// Default backend origin used when nothing is configured.
	pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
	/// Default per-call timeout.
	pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
	/// Default refresh endpoint path.
	pub const DEFAULT_REFRESH_PATH: &str = "/api/v1/auth/refresh";

	/// Starts a builder for the given backend origin.
	pub fn builder(backend_origin: impl AsRef<str>) -> ClientConfigBuilder {
		ClientConfigBuilder::new(backend_origin.as_ref())
	}

	/// Reads configuration from `SESSION_FETCH_*` environment variables.
	pub fn from_env() -> Result<Self, ConfigError> {
		let backend = env::var(ENV_BACKEND_URL)
			.ok()
			.filter(|value| !value.trim().is_empty())
			.unwrap_or_else(|| Self::DEFAULT_BACKEND_URL.into());
		let mut builder = Self::builder(backend.trim());

		if let Some(origin) = env::var(ENV_APP_ORIGIN).ok().filter(|v| !v.trim().is_empty()) {
			builder = builder.app_origin(origin.trim());
		}
		if let Ok(raw) = env::var(ENV_TIMEOUT_MS) {
			let millis = raw.trim().parse::<u64>().map_err(|e| ConfigError::InvalidEnv {
				name: ENV_TIMEOUT_MS,
				reason: e.to_string(),
			})?;

			builder = builder.default_timeout(Duration::from_millis(millis));
		}

		builder.build()
	}

	/// Full URL of the refresh endpoint.
	pub fn refresh_url(&self) -> Result<Url, ConfigError> {
		let raw = join_origin(&self.backend_origin, &self.refresh_path);

		Url::parse(&raw).map_err(|source| ConfigError::InvalidEndpoint {
			endpoint: self.refresh_path.clone(),
			source,
		})
	}

	/// Resolves `endpoint` to a URL according to `mode`.
	///
	/// Anything starting with `http://` or `https://` is used as-is regardless of mode.
	pub fn resolve(&self, endpoint: &str, mode: BaseUrl) -> Result<Url, ConfigError> {
		let invalid =
			|source| ConfigError::InvalidEndpoint { endpoint: endpoint.to_owned(), source };

		if looks_absolute(endpoint) {
			return Url::parse(endpoint).map_err(invalid);
		}

		match mode {
			BaseUrl::Backend =>
				Url::parse(&join_origin(&self.backend_origin, endpoint)).map_err(invalid),
			BaseUrl::Relative => {
				let origin = self.app_origin.as_ref().ok_or_else(|| {
					ConfigError::MissingAppOrigin { endpoint: endpoint.to_owned() }
				})?;

				Url::parse(&join_origin(origin, endpoint)).map_err(invalid)
			},
			BaseUrl::Absolute => Url::parse(endpoint).map_err(invalid),
		}
	}
}

/// Builder for [`ClientConfig`].
#[derive(Clone, Debug)]
pub struct ClientConfigBuilder {
	backend_origin: String,
	app_origin: Option<String>,
	default_timeout: Duration,
	refresh_path: String,
	user_agent: Option<String>,
}
impl ClientConfigBuilder {
	fn new(backend_origin: &str) -> Self {
		Self {
			backend_origin: backend_origin.to_owned(),
			app_origin: None,
			default_timeout: ClientConfig::DEFAULT_TIMEOUT,
			refresh_path: ClientConfig::DEFAULT_REFRESH_PATH.into(),
			user_agent: None,
		}
	}

	/// Sets the origin used for [`BaseUrl::Relative`] endpoints.
	pub fn app_origin(mut self, origin: impl Into<String>) -> Self {
		self.app_origin = Some(origin.into());

		self
	}

	/// Overrides the default per-call timeout.
	pub fn default_timeout(mut self, timeout: Duration) -> Self {
		self.default_timeout = timeout;

		self
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Sets the `User-Agent` used by the default transport.
	pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
		self.user_agent = Some(agent.into());

		self
	}

	/// Validates origins and produces the configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let backend_origin = parse_origin(&self.backend_origin)?;
		let app_origin = self.app_origin.as_deref().map(parse_origin).transpose()?;
		let refresh_path = if self.refresh_path.starts_with('/') {
			self.refresh_path
		} else {
			format!("/{}", self.refresh_path)
		};

		Ok(ClientConfig {
			backend_origin,
			app_origin,
			default_timeout: self.default_timeout,
			refresh_path,
			user_agent: self.user_agent,
		})
	}
}

fn looks_absolute(endpoint: &str) -> bool {
	let lower = endpoint.get(..8).unwrap_or(endpoint).to_ascii_lowercase();

	lower.starts_with("http://") || lower.starts_with("https://")
}

fn parse_origin(raw: &str) -> Result<Url, ConfigError> {
	let url = Url::parse(raw)
		.map_err(|source| ConfigError::InvalidBaseUrl { url: raw.to_owned(), source })?;

	if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
		return Err(ConfigError::UnsupportedBaseUrl { url: raw.to_owned() });
	}

	Ok(url)
}

// Plain concatenation keeps any path prefix on the origin (`https://host/v2` + `/calls`).
fn join_origin(origin: &Url, endpoint: &str) -> String {
	let base = origin.as_str().trim_end_matches('/');

	if endpoint.starts_with('/') {
		format!("{base}{endpoint}")
	} else {
		format!("{base}/{endpoint}")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn config() -> ClientConfig {
		ClientConfig::builder("https://api.example.com/")
			.app_origin("https://app.example.com")
			.build()
			.expect("Config fixture should build.")
	}

	#[test]
	fn backend_mode_prefixes_origin() {
		let config = config();

		assert_eq!(
			config.resolve("/api/v1/calls", BaseUrl::Backend).expect("Should resolve.").as_str(),
			"https://api.example.com/api/v1/calls"
		);
		assert_eq!(
			config.resolve("api/v1/calls", BaseUrl::Backend).expect("Should resolve.").as_str(),
			"https://api.example.com/api/v1/calls"
		);
	}

	#[test]
	fn absolute_endpoints_bypass_every_mode() {
		let config = config();

		for mode in [BaseUrl::Backend, BaseUrl::Relative, BaseUrl::Absolute] {
			assert_eq!(
				config
					.resolve("https://other.example.com/x", mode)
					.expect("Should resolve.")
					.as_str(),
				"https://other.example.com/x"
			);
		}

		assert!(matches!(
			config.resolve("/x", BaseUrl::Absolute),
			Err(ConfigError::InvalidEndpoint { .. })
		));
	}

	#[test]
	fn relative_mode_needs_app_origin() {
		assert_eq!(
			config().resolve("/api/profile", BaseUrl::Relative).expect("Should resolve.").as_str(),
			"https://app.example.com/api/profile"
		);

		let bare = ClientConfig::builder("https://api.example.com").build().expect("Should build.");

		assert!(matches!(
			bare.resolve("/api/profile", BaseUrl::Relative),
			Err(ConfigError::MissingAppOrigin { .. })
		));
	}

	#[test]
	fn builder_validates_origins_and_normalizes_refresh_path() {
		assert!(ClientConfig::builder("not a url").build().is_err());
		assert!(ClientConfig::builder("ftp://example.com").build().is_err());

		let config = ClientConfig::builder("http://localhost:8000")
			.refresh_path("auth/refresh")
			.build()
			.expect("Should build.");

		assert_eq!(config.refresh_path, "/auth/refresh");
		assert_eq!(
			config.refresh_url().expect("Should resolve.").as_str(),
			"http://localhost:8000/auth/refresh"
		);
		assert_eq!(config.default_timeout, Duration::from_secs(20));
	}
}
