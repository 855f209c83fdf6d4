//! Remote token exchanger: the code, refresh, revoke, and connections calls.
//!
//! Each call builds its request with `oauth2::http`, runs it through the configured
//! [`TokenHttpClient`] under the configured timeout, and turns the response into a typed
//! value or a classified [`Error`]: transport failures, provider rejections, and malformed
//! bodies stay distinct so callers can decide whether a retry makes sense.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpRequest, HttpResponse,
	http::{
		HeaderMap, Method, Request,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER},
	},
};
use serde::de::DeserializeOwned;
use time::{PrimitiveDateTime, format_description::well_known::Rfc2822};
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::{ClientCredentials, TokenSecret, TokenSet, split_granted},
	config::BrokerConfig,
	error::{ConfigError, MalformedResponse, RemoteRejection, TransportError},
	http::TokenHttpClient,
};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

time::serde::format_description!(
	connection_date,
	PrimitiveDateTime,
	"[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:7]"
);

/// Validated token grant returned by the token endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenGrant {
	/// New access token.
	pub access_token: TokenSecret,
	/// New refresh token; the provider rotates it on every exchange.
	pub refresh_token: TokenSecret,
	/// Access-token lifetime reported by the provider.
	pub expires_in: Duration,
	/// Granted scopes in provider order.
	pub scopes: Vec<String>,
}
impl TokenGrant {
	/// Stamps the grant into a [`TokenSet`] issued at `issued_at`.
	pub fn into_token_set(
		self,
		issued_at: OffsetDateTime,
		refresh_token_lifetime: Duration,
	) -> TokenSet {
		TokenSet::issue(
			self.access_token,
			self.refresh_token,
			self.scopes,
			issued_at,
			self.expires_in,
			refresh_token_lifetime,
		)
	}
}

/// Tenant connection reported by the connections endpoint.
///
/// Timestamps carry no zone designator and are UTC. Identifier fields the provider omits
/// decode as empty strings; some tenant kinds report a `null` name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
	/// Connection identifier.
	#[serde(default)]
	pub id: String,
	/// Authorization event that created the connection.
	#[serde(default)]
	pub auth_event_id: String,
	/// Connected tenant identifier.
	#[serde(default)]
	pub tenant_id: String,
	/// Tenant kind, e.g. `ORGANISATION`.
	#[serde(default)]
	pub tenant_type: String,
	/// Display name of the tenant; `None` for tenants such as `PRACTICEMANAGER`.
	#[serde(default)]
	pub tenant_name: Option<String>,
	/// Creation instant.
	#[serde(with = "connection_date")]
	pub created_date_utc: PrimitiveDateTime,
	/// Last update instant.
	#[serde(with = "connection_date")]
	pub updated_date_utc: PrimitiveDateTime,
}

#[derive(Deserialize)]
struct TokenResponse {
	#[serde(default)]
	access_token: Option<String>,
	#[serde(default)]
	refresh_token: Option<String>,
	#[serde(default)]
	expires_in: Option<i64>,
	#[serde(default)]
	scope: Option<String>,
}
impl TokenResponse {
	fn into_grant(self) -> Result<TokenGrant, MalformedResponse> {
		let access_token = non_empty(self.access_token, "access_token")?;
		let refresh_token = non_empty(self.refresh_token, "refresh_token")?;
		let expires_in = match self.expires_in {
			None | Some(0) => return Err(MalformedResponse::MissingField { field: "expires_in" }),
			Some(value) if !(0..=i64::from(i32::MAX)).contains(&value) =>
				return Err(MalformedResponse::ExpiresInOutOfRange { value }),
			Some(value) => Duration::seconds(value),
		};

		Ok(TokenGrant {
			access_token: TokenSecret::new(access_token),
			refresh_token: TokenSecret::new(refresh_token),
			expires_in,
			scopes: split_granted(self.scope.as_deref()),
		})
	}
}

/// Performs provider exchanges for one broker configuration.
pub struct TokenExchanger<'a, C>
where
	C: ?Sized + TokenHttpClient,
{
	http_client: &'a C,
	config: &'a BrokerConfig,
}
impl<'a, C> TokenExchanger<'a, C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Creates an exchanger bound to a transport and configuration.
	pub fn new(http_client: &'a C, config: &'a BrokerConfig) -> Self {
		Self { http_client, config }
	}

	/// Exchanges an authorization code for a token grant.
	pub async fn exchange_code(
		&self,
		client: &ClientCredentials,
		code: &str,
	) -> Result<TokenGrant> {
		let request = form_request(
			&self.config.endpoints.token,
			&client.basic_authorization(),
			&[
				("grant_type", "authorization_code"),
				("code", code),
				("redirect_uri", self.config.redirect_uri.as_str()),
			],
		)?;

		self.token_call(request).await
	}

	/// Exchanges a refresh token for a new token grant.
	pub async fn exchange_refresh(
		&self,
		client: &ClientCredentials,
		refresh_token: &TokenSecret,
	) -> Result<TokenGrant> {
		let request = form_request(
			&self.config.endpoints.token,
			&client.basic_authorization(),
			&[("grant_type", "refresh_token"), ("refresh_token", refresh_token.expose())],
		)?;

		self.token_call(request).await
	}

	/// Revokes a refresh token together with every access token minted from it.
	pub async fn revoke(&self, client: &ClientCredentials, refresh_token: &TokenSecret) -> Result<()> {
		let request = form_request(
			&self.config.endpoints.revocation,
			&client.basic_authorization(),
			&[("token", refresh_token.expose()), ("token_type_hint", "refresh_token")],
		)?;
		let response = self.send("revocation", request).await?;

		ensure_success("revocation", &response)?;

		Ok(())
	}

	/// Lists the tenants the access token is connected to.
	pub async fn connections(&self, access_token: &TokenSecret) -> Result<Vec<Connection>> {
		let request = Request::builder()
			.method(Method::GET)
			.uri(self.config.endpoints.connections.as_str())
			.header(AUTHORIZATION, format!("Bearer {}", access_token.expose()))
			.header(ACCEPT, JSON_CONTENT_TYPE)
			.header(CONTENT_TYPE, JSON_CONTENT_TYPE)
			.body(Vec::new())
			.map_err(ConfigError::from)?;
		let response = self.send("connections", request).await?;

		ensure_success("connections", &response)?;

		Ok(decode("connections", response.body())?)
	}

	async fn token_call(&self, request: HttpRequest) -> Result<TokenGrant> {
		let response = self.send("token", request).await?;

		ensure_success("token", &response)?;

		let body = decode::<TokenResponse>("token", response.body())?;

		Ok(body.into_grant()?)
	}

	async fn send(&self, endpoint: &'static str, request: HttpRequest) -> Result<HttpResponse> {
		let timeout = self.config.http_timeout;
		let handle = self.http_client.handle();

		tracing::debug!(endpoint, uri = %request.uri(), "Calling provider.");

		match tokio::time::timeout(timeout.unsigned_abs(), handle.call(request)).await {
			Ok(Ok(response)) => {
				tracing::debug!(endpoint, status = response.status().as_u16(), "Provider responded.");

				Ok(response)
			},
			Ok(Err(e)) => Err(self.http_client.map_transport_error(endpoint, timeout, e)),
			Err(_) => Err(TransportError::Timeout { endpoint, timeout }.into()),
		}
	}
}
impl<C> Debug for TokenExchanger<'_, C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenExchanger").field("endpoints", &self.config.endpoints).finish()
	}
}

fn form_request(
	url: &Url,
	authorization: &str,
	pairs: &[(&str, &str)],
) -> Result<HttpRequest, ConfigError> {
	let body = form_urlencoded::Serializer::new(String::new()).extend_pairs(pairs).finish();

	Ok(Request::builder()
		.method(Method::POST)
		.uri(url.as_str())
		.header(AUTHORIZATION, authorization)
		.header(CONTENT_TYPE, FORM_CONTENT_TYPE)
		.header(ACCEPT, JSON_CONTENT_TYPE)
		.body(body.into_bytes())?)
}

fn ensure_success(endpoint: &'static str, response: &HttpResponse) -> Result<(), RemoteRejection> {
	let status = response.status();

	if status.is_success() {
		return Ok(());
	}

	Err(RemoteRejection {
		endpoint,
		status: status.as_u16(),
		body: String::from_utf8_lossy(response.body()).into_owned(),
		retry_after: parse_retry_after(response.headers()),
	})
}

fn decode<T>(endpoint: &'static str, body: &[u8]) -> Result<T, MalformedResponse>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| MalformedResponse::Decode { endpoint, source })
}

fn non_empty(value: Option<String>, field: &'static str) -> Result<String, MalformedResponse> {
	match value {
		Some(value) if !value.is_empty() => Ok(value),
		_ => Err(MalformedResponse::MissingField { field }),
	}
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u32>() {
		return Some(Duration::seconds(i64::from(secs)));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
