//! Secure secret wrapper that redacts sensitive material.

// crates.io
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Redacted secret wrapper keeping tokens, client secrets, and API keys out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner secret value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` when no secret material is present.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// SHA-256 digest of the secret, used to compare presented keys without
	/// short-circuiting on the plaintext.
	pub fn digest(&self) -> [u8; 32] {
		Sha256::digest(self.0.as_bytes()).into()
	}

	/// Compares `candidate` against the secret via digests.
	pub fn matches(&self, candidate: &str) -> bool {
		let expected = self.digest();
		let presented: [u8; 32] = Sha256::digest(candidate.as_bytes()).into();

		expected.iter().zip(presented.iter()).fold(0_u8, |acc, (a, b)| acc | (a ^ b)) == 0
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
