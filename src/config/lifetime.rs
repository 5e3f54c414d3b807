//! Treated token lifetimes: how long a freshly exchanged token may be served from the cache.

// self
use crate::_prelude::*;

/// Errors raised while constructing a [`TokenLifetimePolicy`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum LifetimePolicyError {
	/// The assumed validity window must be positive.
	#[error("Token validity must be positive.")]
	NonPositiveValidity,
	/// The reuse window must be positive and strictly shorter than the validity window.
	#[error("Reuse window must be positive and shorter than the token validity.")]
	ReuseWindowOutOfRange,
}

/// Maps a token's validity window onto the shorter window the cache serves it for.
///
/// When the authorization server does not report `expires_in`, the provider's typical
/// validity is assumed and the token is served for `reuse_window`. When it does, the same
/// proportion is applied to the reported lifetime, so the treated expiry always lands
/// strictly before the real one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenLifetimePolicy {
	validity: Duration,
	reuse_window: Duration,
}
impl TokenLifetimePolicy {
	/// Typical provider session lifetime assumed when none is reported.
	pub const DEFAULT_VALIDITY: Duration = Duration::seconds(7_200);
	/// Default period a token is served from the cache.
	pub const DEFAULT_REUSE_WINDOW: Duration = Duration::seconds(5_400);

	/// Creates a policy after validating `0 < reuse_window < validity`.
	pub fn new(validity: Duration, reuse_window: Duration) -> Result<Self, LifetimePolicyError> {
		if validity.whole_seconds() <= 0 {
			return Err(LifetimePolicyError::NonPositiveValidity);
		}
		if reuse_window.whole_seconds() <= 0 || reuse_window >= validity {
			return Err(LifetimePolicyError::ReuseWindowOutOfRange);
		}

		Ok(Self { validity, reuse_window })
	}

	/// Assumed validity window.
	pub fn validity(&self) -> Duration {
		self.validity
	}

	/// Window a token is served for when no lifetime is reported.
	pub fn reuse_window(&self) -> Duration {
		self.reuse_window
	}

	/// Returns how long a token may be cached, or `None` if it is too short-lived to cache.
	pub fn treated_ttl(&self, reported: Option<Duration>) -> Option<Duration> {
		let Some(reported) = reported else {
			return Some(self.reuse_window);
		};
		let reported_secs = i128::from(reported.whole_seconds());

		if reported_secs <= 0 {
			return None;
		}

		let scaled = reported_secs * i128::from(self.reuse_window.whole_seconds())
			/ i128::from(self.validity.whole_seconds());

		// `scaled < reported_secs`, so it always fits back into an `i64`.
		i64::try_from(scaled).ok().filter(|secs| *secs > 0).map(Duration::seconds)
	}
}
impl Default for TokenLifetimePolicy {
	fn default() -> Self {
		Self { validity: Self::DEFAULT_VALIDITY, reuse_window: Self::DEFAULT_REUSE_WINDOW }
	}
}
