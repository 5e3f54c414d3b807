//! Client-credentials exchange against the authorization server, built on the `oauth2` crate.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, Client, ClientId, ClientSecret, EndpointNotSet, EndpointSet, ExtraTokenFields,
	HttpClientError, RequestTokenError, StandardRevocableToken, StandardTokenResponse,
	TokenResponse, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRequestTokenError, BasicRevocationErrorResponse,
		BasicTokenIntrospectionResponse, BasicTokenType,
	},
};
// self
use crate::{
	_prelude::*,
	auth::{ClientCredentials, TokenSecret},
	config::{ClientAuthMethod, ExchangeSettings},
	error::{AuthenticationError, ConfigError},
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
};

/// Extra token response fields returned alongside the standard OAuth ones.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceTokenFields {
	/// Base endpoint the token is valid against.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub instance_url: Option<String>,
}
impl ExtraTokenFields for InstanceTokenFields {}

type InstanceTokenResponse = StandardTokenResponse<InstanceTokenFields, BasicTokenType>;
type ConfiguredClient = Client<
	BasicErrorResponse,
	InstanceTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;
type FacadeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Outcome of a successful exchange, before the cache applies its lifetime policy.
#[derive(Clone, Debug)]
pub struct TokenExchange {
	/// Issued bearer token.
	pub access_token: TokenSecret,
	/// Instance the token is valid against.
	pub instance_url: Url,
	/// Lifetime reported by the authorization server, if any.
	pub expires_in: Option<Duration>,
}

/// Maps HTTP transport failures into relay [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a relay error.
	fn map_transport_error(
		&self,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(*inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => AuthenticationError::network(inner).into(),
			HttpClientError::Other(message) => AuthenticationError::Rejected {
				reason: format!("HTTP client error: {message}"),
				status: meta_status(meta),
			}
			.into(),
			_ => AuthenticationError::Rejected {
				reason: "unknown HTTP client error".into(),
				status: meta_status(meta),
			}
			.into(),
		}
	}
}

pub(crate) struct ExchangeFacade<C = ReqwestHttpClient, M = ReqwestTransportErrorMapper>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredClient,
	fallback_instance: Option<Url>,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> ExchangeFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn from_credentials(
		settings: &ExchangeSettings,
		credentials: &ClientCredentials,
		http_client: Arc<C>,
		error_mapper: Arc<M>,
	) -> Result<Self> {
		let endpoint = token_endpoint(settings, credentials)?;
		let token_url = TokenUrl::new(endpoint.to_string())
			.map_err(|source| ConfigError::InvalidTokenEndpoint { source })?;
		let auth_type = match settings.client_auth_method {
			ClientAuthMethod::ClientSecretPost => AuthType::RequestBody,
			ClientAuthMethod::ClientSecretBasic => AuthType::BasicAuth,
		};
		let oauth_client = Client::new(ClientId::new(credentials.client_id.clone()))
			.set_client_secret(ClientSecret::new(credentials.client_secret.expose().to_owned()))
			.set_auth_type(auth_type)
			.set_token_uri(token_url);

		Ok(Self {
			oauth_client,
			fallback_instance: credentials.instance_url.clone(),
			http_client,
			error_mapper,
		})
	}

	pub(crate) fn exchange_client_credentials(&self) -> FacadeFuture<'_, TokenExchange> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let response = self
				.oauth_client
				.exchange_client_credentials()
				.request_async(&instrumented)
				.await
				.map_err(|err| map_request_error(meta.take(), err, self.error_mapper.as_ref()))?;

			map_token_response(response, self.fallback_instance.as_ref())
		})
	}
}

/// Token endpoint for `credentials`: their own instance URL if set, else the login URL,
/// joined with the configured token path.
pub(crate) fn token_endpoint(
	settings: &ExchangeSettings,
	credentials: &ClientCredentials,
) -> Result<Url> {
	let base = credentials.instance_url.as_ref().unwrap_or(&settings.login_url);

	base.join(&settings.token_path)
		.map_err(|source| ConfigError::InvalidTokenEndpoint { source }.into())
}

fn map_token_response(
	response: InstanceTokenResponse,
	fallback_instance: Option<&Url>,
) -> Result<TokenExchange> {
	let expires_in = match response.expires_in() {
		Some(lifetime) => {
			let secs = i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX);

			if secs <= 0 {
				return Err(AuthenticationError::NonPositiveLifetime.into());
			}

			Some(Duration::seconds(secs))
		},
		None => None,
	};
	let access_token = response.access_token().secret();

	if access_token.trim().is_empty() {
		return Err(AuthenticationError::EmptyAccessToken.into());
	}

	let instance_url = match response.extra_fields().instance_url.as_deref() {
		Some(raw) =>
			Url::parse(raw).map_err(|source| AuthenticationError::InvalidInstanceUrl { source })?,
		None => fallback_instance.cloned().ok_or(AuthenticationError::MissingInstanceUrl)?,
	};

	Ok(TokenExchange {
		access_token: TokenSecret::new(access_token.to_owned()),
		instance_url,
		expires_in,
	})
}

fn map_request_error<E, M>(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta_ref = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) => {
			let reason = match response.error_description() {
				Some(description) => format!("{}: {description}", response.error().as_ref()),
				None => response.error().as_ref().to_owned(),
			};

			AuthenticationError::Rejected { reason, status: meta_status(meta_ref) }.into()
		},
		RequestTokenError::Request(error) => mapper.map_transport_error(meta_ref, error),
		RequestTokenError::Parse(source, _body) =>
			AuthenticationError::MalformedResponse { source, status: meta_status(meta_ref) }.into(),
		RequestTokenError::Other(message) =>
			AuthenticationError::Rejected { reason: message, status: meta_status(meta_ref) }.into(),
	}
}

fn map_reqwest_error(err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return AuthenticationError::Timeout.into();
	}

	AuthenticationError::network(err).into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}
