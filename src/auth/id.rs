//! Strongly typed environment identifiers.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("Environment identifier cannot be empty.")]
	Empty,
	/// The identifier contains whitespace characters.
	#[error("Environment identifier contains whitespace.")]
	ContainsWhitespace,
	/// The identifier exceeded the allowed character count.
	#[error("Environment identifier exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted character count.
		max: usize,
	},
}

/// Named deployment target (e.g. `production`, `qa`) with its own credentials and endpoint.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EnvironmentId(String);
impl EnvironmentId {
	/// Creates a new identifier after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
		let view = value.as_ref();

		validate_view(view)?;

		Ok(Self(view.to_owned()))
	}
}
impl Deref for EnvironmentId {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for EnvironmentId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl From<EnvironmentId> for String {
	fn from(value: EnvironmentId) -> Self {
		value.0
	}
}
impl TryFrom<String> for EnvironmentId {
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view(&value)?;

		Ok(Self(value))
	}
}
impl Borrow<str> for EnvironmentId {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl Debug for EnvironmentId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Environment({})", self.0)
	}
}
impl Display for EnvironmentId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for EnvironmentId {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

fn validate_view(view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty);
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace);
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identifiers_reject_whitespace_and_empty_values() {
		assert!(EnvironmentId::new(" qa").is_err(), "Leading whitespace must be rejected.");
		assert!(EnvironmentId::new("qa ").is_err(), "Trailing whitespace must be rejected.");
		assert_eq!(EnvironmentId::new(""), Err(IdentifierError::Empty));

		let env = EnvironmentId::new("production").expect("Environment fixture should be valid.");

		assert_eq!(env.as_ref(), "production");
		assert_eq!(format!("{env:?}"), "Environment(production)");
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let env: EnvironmentId =
			serde_json::from_str("\"qa\"").expect("Environment should deserialize successfully.");

		assert_eq!(env.as_ref(), "qa");
		assert!(serde_json::from_str::<EnvironmentId>("\"with space\"").is_err());
	}

	#[test]
	fn length_limit_is_inclusive() {
		EnvironmentId::new("a".repeat(IDENTIFIER_MAX_LEN)).expect("Exact length should succeed.");

		assert_eq!(
			EnvironmentId::new("a".repeat(IDENTIFIER_MAX_LEN + 1)),
			Err(IdentifierError::TooLong { max: IDENTIFIER_MAX_LEN })
		);
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<EnvironmentId, u8> = HashMap::from_iter([(
			EnvironmentId::new("staging").expect("Environment used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("staging"), Some(&7));
	}
}
