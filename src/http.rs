//! Transport primitives for token exchanges and downstream forwarding.
//!
//! [`TokenHttpClient`] is the exchange-side seam: the `oauth2` crate drives requests through
//! handles that record the response status in a [`ResponseMetadataSlot`], so failures can be
//! classified with the status attached. [`DownstreamClient`] is the forwarding seam used by
//! the gateway. [`ReqwestHttpClient`] implements both.

// std
use std::ops::Deref;
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
use reqwest::{
	Method,
	header::{AUTHORIZATION, HeaderMap},
};
// self
use crate::{_prelude::*, auth::AccessGrant, error::UpstreamError};

/// Boxed future returned by [`DownstreamClient::forward`].
pub type DownstreamFuture<'a> = Pin<Box<dyn Future<Output = Result<ForwardResponse>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing token exchanges while publishing
/// response metadata for error mapping.
///
/// Implementations must be `Send + Sync + 'static` so they can be shared across caches, and
/// the handles they return must own whatever state their request futures need so those
/// futures stay `Send` for the lifetime of the in-flight exchange.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle tied to a [`ResponseMetadataSlot`].
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds an [`AsyncHttpClient`] handle that records outcomes in `slot`.
	///
	/// Call [`ResponseMetadataSlot::take`] before submitting the request and
	/// [`ResponseMetadataSlot::store`] once a status is known.
	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle;
}

/// Forwards caller requests to the instance a token was issued for.
pub trait DownstreamClient
where
	Self: Send + Sync,
{
	/// Sends `request` to `grant.instance_url` with `grant`'s bearer token attached.
	///
	/// Any HTTP status is a successful forward; classifying non-2xx answers is the caller's
	/// concern.
	fn forward<'a>(&'a self, grant: &'a AccessGrant, request: ForwardRequest)
	-> DownstreamFuture<'a>;
}

/// Captures metadata from the most recent exchange response.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the token endpoint, if available.
	pub status: Option<u16>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error layers.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Request relayed to the downstream API, relative to the token's instance.
#[derive(Clone, Debug)]
pub struct ForwardRequest {
	/// HTTP method to replay.
	pub method: Method,
	/// Absolute path on the instance, starting with `/`.
	pub path: String,
	/// Query parameters appended in order.
	pub query: Vec<(String, String)>,
	/// Headers to forward; authorization is added by the transport.
	pub headers: Vec<(String, String)>,
	/// Raw request body, if any.
	pub body: Option<Vec<u8>>,
}
impl ForwardRequest {
	/// Resolves the absolute target URL on `instance`.
	pub fn target(&self, instance: &Url) -> Result<Url> {
		let mut url = instance.join(&self.path).map_err(|e| Error::InvalidRequest {
			reason: format!("path `{}` cannot be joined onto the instance URL: {e}", self.path),
		})?;

		if url.origin() != instance.origin() {
			return Err(Error::InvalidRequest {
				reason: format!("path `{}` leaves the instance origin", self.path),
			});
		}
		if !self.query.is_empty() {
			url.query_pairs_mut().extend_pairs(self.query.iter());
		}

		Ok(url)
	}
}

/// Downstream answer kept verbatim for relaying.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForwardResponse {
	/// Status code returned downstream.
	pub status: u16,
	/// Response headers, lower-cased, repeated values joined with `, `.
	pub headers: BTreeMap<String, String>,
	/// Raw response body bytes.
	pub body: Vec<u8>,
}
impl ForwardResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Token endpoints answer directly, so configure any custom client to disable redirect
/// following; [`RelayConfig::http_client`](crate::config::RelayConfig::http_client) does.
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	pub(crate) fn instrumented(&self, slot: ResponseMetadataSlot) -> InstrumentedHandle {
		InstrumentedHandle::new(self.0.clone(), slot)
	}
}
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl TokenHttpClient for ReqwestHttpClient {
	type Handle = InstrumentedHandle;
	type TransportError = ReqwestError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		self.instrumented(slot)
	}
}
impl DownstreamClient for ReqwestHttpClient {
	fn forward<'a>(
		&'a self,
		grant: &'a AccessGrant,
		request: ForwardRequest,
	) -> DownstreamFuture<'a> {
		Box::pin(async move {
			let url = request.target(&grant.instance_url)?;
			let mut builder =
				self.0.request(request.method, url).header(AUTHORIZATION, grant.bearer_header());

			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await.map_err(map_send_error)?;
			let status = response.status().as_u16();
			let headers = collect_headers(response.headers());
			let body = response.bytes().await.map_err(UpstreamError::from)?.to_vec();

			Ok(ForwardResponse { status, headers, body })
		})
	}
}

/// Instrumented adapter that implements [`AsyncHttpClient`] for reqwest.
pub(crate) struct InstrumentedHttpClient {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}

/// Public handle returned by [`ReqwestHttpClient`] that satisfies [`TokenHttpClient`].
#[derive(Clone)]
pub struct InstrumentedHandle(Arc<InstrumentedHttpClient>);
impl InstrumentedHandle {
	fn new(client: ReqwestClient, slot: ResponseMetadataSlot) -> Self {
		Self(Arc::new(InstrumentedHttpClient { client, slot }))
	}
}
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = Arc::clone(&self.0);

		Box::pin(async move {
			client.slot.take();

			let response = client
				.client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			client.slot.store(ResponseMetadata { status: Some(status.as_u16()) });

			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

fn map_send_error(err: ReqwestError) -> Error {
	if err.is_builder() {
		return Error::InvalidRequest { reason: format!("request cannot be built: {err}") };
	}

	UpstreamError::from(err).into()
}

fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
	let mut collected: BTreeMap<String, String> = BTreeMap::new();

	for (name, value) in headers {
		let Ok(value) = value.to_str() else {
			continue;
		};

		collected
			.entry(name.as_str().to_owned())
			.and_modify(|existing| {
				existing.push_str(", ");
				existing.push_str(value);
			})
			.or_insert_with(|| value.to_owned());
	}

	collected
}
