//! Parse-or-fallback handling for response bodies.

// crates.io
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Longest raw-text fallback kept in [`ParsedBody::Unparsed`], in characters.
pub const DETAIL_MAX_CHARS: usize = 512;

/// Outcome of decoding a response body as JSON.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedBody<T> {
	/// The body was empty or whitespace.
	Empty,
	/// The body decoded into `T`.
	Parsed(T),
	/// The body was not valid JSON for `T`; the raw text (truncated) is kept for error messages.
	Unparsed {
		/// Leading part of the raw body.
		detail: String,
	},
}
impl<T> ParsedBody<T> {
	/// Returns the decoded value, if any.
	pub fn parsed(self) -> Option<T> {
		match self {
			Self::Parsed(value) => Some(value),
			_ => None,
		}
	}

	/// Returns the raw-text fallback, if decoding failed.
	pub fn unparsed_detail(&self) -> Option<&str> {
		match self {
			Self::Unparsed { detail } => Some(detail),
			_ => None,
		}
	}

	/// Returns `true` for [`ParsedBody::Empty`].
	pub fn is_empty(&self) -> bool {
		matches!(self, Self::Empty)
	}
}

/// Decodes `bytes` as `T`, falling back to truncated raw text.
pub fn parse_body<T>(bytes: &[u8]) -> ParsedBody<T>
where
	T: DeserializeOwned,
{
	let text = String::from_utf8_lossy(bytes);

	if text.trim().is_empty() {
		return ParsedBody::Empty;
	}

	match serde_json::from_str(&text) {
		Ok(value) => ParsedBody::Parsed(value),
		Err(_) => ParsedBody::Unparsed { detail: text.chars().take(DETAIL_MAX_CHARS).collect() },
	}
}

/// Extracts a human-readable failure message from an error body.
///
/// Looks at `detail` first, then `error`; non-JSON bodies yield their truncated raw text.
pub fn error_detail(bytes: &[u8]) -> Option<String> {
	match parse_body::<Value>(bytes) {
		ParsedBody::Empty => None,
		ParsedBody::Unparsed { detail } => Some(detail),
		ParsedBody::Parsed(Value::Object(map)) => ["detail", "error", "message"]
			.into_iter()
			.filter_map(|field| map.get(field))
			.find(|value| !value.is_null())
			.map(|value| match value {
				Value::String(text) => text.clone(),
				other => other.to_string(),
			}),
		ParsedBody::Parsed(_) => None,
	}
}
