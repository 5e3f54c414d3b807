//! Cached token records, their lifecycle helpers, and builders.

// self
use crate::{
	_prelude::*,
	auth::{EnvironmentId, token::secret::TokenSecret},
};

/// Current lifecycle status for a cached token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Token may be served from the cache.
	Fresh,
	/// Token reached its treated expiry and must be replaced.
	Expired,
}

/// Errors produced by [`CachedTokenBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CachedTokenBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no instance URL was provided.
	#[error("Instance URL is required.")]
	MissingInstanceUrl,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
	/// Issued when the expiry does not fall strictly after the issued-at instant.
	#[error("Expiry must fall after the issued-at instant.")]
	NonPositiveLifetime,
	/// Issued when `issued_at + expires_in` cannot be represented.
	#[error("Expiry is out of the representable date range.")]
	ExpiryOutOfRange,
}

/// Bearer token and the instance it was issued for, as handed to callers.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessGrant {
	/// Bearer token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Base endpoint the token is valid against.
	pub instance_url: Url,
}
impl AccessGrant {
	/// Formats the `Authorization` header value for downstream calls.
	pub fn bearer_header(&self) -> String {
		format!("Bearer {}", self.access_token.expose())
	}
}
impl Debug for AccessGrant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessGrant")
			.field("access_token", &"<redacted>")
			.field("instance_url", &self.instance_url.as_str())
			.finish()
	}
}

/// Immutable record describing a token held by the credential cache.
#[derive(Serialize, Deserialize, Clone)]
pub struct CachedToken {
	/// Environment the token was issued for.
	pub environment: EnvironmentId,
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Base endpoint paired with the token.
	pub instance_url: Url,
	/// Instant the exchange completed.
	pub issued_at: OffsetDateTime,
	/// Treated expiry; the token is never served at or after this instant.
	pub expires_at: OffsetDateTime,
}
impl CachedToken {
	/// Returns a builder for the provided environment.
	pub fn builder(environment: EnvironmentId) -> CachedTokenBuilder {
		CachedTokenBuilder::new(environment)
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		if instant < self.expires_at { TokenStatus::Fresh } else { TokenStatus::Expired }
	}

	/// Returns `true` if the token may be served at the provided instant.
	pub fn is_fresh_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Fresh)
	}

	/// Returns `true` if the token has expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		matches!(self.status_at(OffsetDateTime::now_utc()), TokenStatus::Expired)
	}

	/// Returns the `(token, instance_url)` pair handed to callers.
	pub fn grant(&self) -> AccessGrant {
		AccessGrant {
			access_token: self.access_token.clone(),
			instance_url: self.instance_url.clone(),
		}
	}
}
impl Debug for CachedToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CachedToken")
			.field("environment", &self.environment)
			.field("access_token", &"<redacted>")
			.field("instance_url", &self.instance_url.as_str())
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`CachedToken`].
#[derive(Clone, Debug)]
pub struct CachedTokenBuilder {
	environment: EnvironmentId,
	access_token: Option<TokenSecret>,
	instance_url: Option<Url>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl CachedTokenBuilder {
	fn new(environment: EnvironmentId) -> Self {
		Self {
			environment,
			access_token: None,
			instance_url: None,
			issued_at: None,
			expires_at: None,
			expires_in: None,
		}
	}

	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the instance URL paired with the token.
	pub fn instance_url(mut self, url: Url) -> Self {
		self.instance_url = Some(url);

		self
	}

	/// Consumes the builder and produces a [`CachedToken`].
	pub fn build(self) -> Result<CachedToken, CachedTokenBuilderError> {
		let access_token = self
			.access_token
			.filter(|token| !token.is_empty())
			.ok_or(CachedTokenBuilderError::MissingAccessToken)?;
		let instance_url = self.instance_url.ok_or(CachedTokenBuilderError::MissingInstanceUrl)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) =>
				issued_at.checked_add(delta).ok_or(CachedTokenBuilderError::ExpiryOutOfRange)?,
			(None, None) => return Err(CachedTokenBuilderError::MissingExpiry),
		};

		if expires_at <= issued_at {
			return Err(CachedTokenBuilderError::NonPositiveLifetime);
		}

		Ok(CachedToken {
			environment: self.environment,
			access_token,
			instance_url,
			issued_at,
			expires_at,
		})
	}
}
