//! Strongly typed identifiers for request correlation and de-duplication slots.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl TryFrom<&str> for $name {
			type Error = IdentifierError;

			fn try_from(value: &str) -> Result<Self, Self::Error> {
				Self::new(value)
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (request, dedupe).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (request, dedupe).
		kind: &'static str,
	},
	/// The identifier contains control characters.
	#[error("{kind} identifier contains control characters.")]
	ContainsControl {
		/// Kind of identifier (request, dedupe).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed byte count.
	#[error("{kind} identifier exceeds {max} bytes.")]
	TooLong {
		/// Kind of identifier (request, dedupe).
		kind: &'static str,
		/// Maximum permitted byte count.
		max: usize,
	},
}

def_id! { RequestId, "Correlation id sent as `X-Request-ID` and recorded with request telemetry.", "Request" }
def_id! { DedupeKey, "Logical request slot; only the newest request under a key stays live.", "Dedupe" }

impl RequestId {
	/// Generates a random UUID v4 correlation id.
	pub fn generate() -> Self {
		Self(uuid::Uuid::new_v4().to_string())
	}
}

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.chars().any(char::is_control) {
		return Err(IdentifierError::ContainsControl { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identifiers_reject_whitespace_and_empty_values() {
		assert!(RequestId::new(" req-123").is_err(), "Leading whitespace must be rejected.");
		assert!(DedupeKey::new("profile fetch").is_err());
		assert!(DedupeKey::new("").is_err());
		assert!(matches!(
			RequestId::new("req\u{7}"),
			Err(IdentifierError::ContainsControl { kind: "Request" })
		));

		let key = DedupeKey::new("profile-fetch").expect("Dedupe key fixture should be valid.");

		assert_eq!(key.as_ref(), "profile-fetch");
	}

	#[test]
	fn generated_request_ids_are_unique_uuids() {
		let a = RequestId::generate();
		let b = RequestId::generate();

		assert_ne!(a, b);
		assert_eq!(a.len(), 36);
		assert!(uuid::Uuid::parse_str(&a).is_ok());
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let id: RequestId =
			serde_json::from_str("\"req-42\"").expect("Request id should deserialize.");

		assert_eq!(id.as_ref(), "req-42");
		assert!(serde_json::from_str::<RequestId>("\"with space\"").is_err());

		let too_long = format!("\"{}\"", "a".repeat(IDENTIFIER_MAX_LEN + 1));

		assert!(serde_json::from_str::<DedupeKey>(&too_long).is_err());
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<DedupeKey, u8> = HashMap::from_iter([(
			DedupeKey::new("calls-list").expect("Key used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("calls-list"), Some(&7));
	}
}
