//! Authenticated HTTP client for dashboard and onboarding backends: correlation ids, bearer
//! tokens, per-call timeouts, keyed de-duplication, and single-flight token refresh in one place.
//!
//! The entry point is [`client::ApiClient`]. Every call resolves its endpoint, stamps an
//! `X-Request-ID`, attaches the stored access token, and races the exchange against its timeout
//! and cancellation token. A `401` triggers at most one shared refresh and one retry; every other
//! HTTP status is handed back as an [`http::ApiResponse`] for the caller to branch on.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod request;
pub mod store;

mod _prelude {
	pub use std::{
		collections::{HashMap, VecDeque},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::{Duration, Instant},
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::Client as ReqwestClient;
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use tokio_util::sync::CancellationToken;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
