//! Transport primitives for provider exchanges.
//!
//! [`TokenHttpClient`] is the broker's only dependency on an HTTP stack. Implementations
//! hand out [`AsyncHttpClient`] handles and classify their own transport failures so the
//! exchanger can tell a timeout from a refused connection without knowing the client type.

// std
use std::ops::Deref;
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
#[cfg(feature = "reqwest")] use reqwest::redirect::Policy;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
};

/// Abstraction over HTTP transports capable of executing provider exchanges.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by the
/// broker, its background refresher, and any number of caller tasks. The handles they
/// return must own whatever state the request needs so the request futures stay `Send`.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle used for a single exchange.
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds a handle for the next exchange.
	fn handle(&self) -> Self::Handle;

	/// Classifies a transport failure raised while calling `endpoint`.
	///
	/// `timeout` is the bound the exchanger applied, reported back when the transport itself
	/// gave up first. The default treats every client failure as a network error.
	fn map_transport_error(
		&self,
		endpoint: &'static str,
		timeout: Duration,
		error: HttpClientError<Self::TransportError>,
	) -> Error {
		let _ = (endpoint, timeout);

		map_common_transport_error(error, |inner| TransportError::network(inner).into())
	}
}

/// Shared classification for the [`HttpClientError`] variants every transport produces.
pub fn map_common_transport_error<E>(
	error: HttpClientError<E>,
	on_client: impl FnOnce(E) -> Error,
) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	match error {
		HttpClientError::Reqwest(inner) => on_client(*inner),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => TransportError::Network { source: message.into() }.into(),
		_ => TransportError::Network { source: "unclassified HTTP client error".into() }.into(),
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Token endpoints return results directly, so [`ReqwestHttpClient::new`] disables redirect
/// following. Configure any client passed to [`ReqwestHttpClient::with_client`] the same way.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds a client that never follows redirects.
	pub fn new() -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().redirect(Policy::none()).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	type Handle = ReqwestHandle;
	type TransportError = ReqwestError;

	fn handle(&self) -> Self::Handle {
		ReqwestHandle(Arc::new(self.0.clone()))
	}

	fn map_transport_error(
		&self,
		endpoint: &'static str,
		timeout: Duration,
		error: HttpClientError<ReqwestError>,
	) -> Error {
		map_common_transport_error(error, |inner| {
			if inner.is_timeout() {
				TransportError::Timeout { endpoint, timeout }.into()
			} else {
				TransportError::network(inner).into()
			}
		})
	}
}

/// [`AsyncHttpClient`] adapter returned by [`ReqwestHttpClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHandle(Arc<ReqwestClient>);
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for ReqwestHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = Arc::clone(&self.0);

		Box::pin(async move {
			let response =
				client.execute(request.try_into().map_err(Box::new)?).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}
