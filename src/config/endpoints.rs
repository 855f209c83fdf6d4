// self
use crate::{_prelude::*, error::ValidationError};

const XERO_AUTHORIZATION_URL: &str = "https://login.xero.com/identity/connect/authorize";
const XERO_TOKEN_URL: &str = "https://identity.xero.com/connect/token";
const XERO_CONNECTIONS_URL: &str = "https://api.xero.com/connections";
const XERO_REVOCATION_URL: &str = "https://identity.xero.com/connect/revocation";

/// Endpoint set the broker talks to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Authorization endpoint the user agent is sent to.
	pub authorization: Url,
	/// Token endpoint used for code and refresh exchanges.
	pub token: Url,
	/// Endpoint listing the tenants the access token is connected to.
	pub connections: Url,
	/// Revocation endpoint.
	pub revocation: Url,
}
impl ProviderEndpoints {
	/// Xero's production endpoints.
	pub fn xero() -> Result<Self, ValidationError> {
		Ok(Self {
			authorization: Self::parse("authorization", XERO_AUTHORIZATION_URL)?,
			token: Self::parse("token", XERO_TOKEN_URL)?,
			connections: Self::parse("connections", XERO_CONNECTIONS_URL)?,
			revocation: Self::parse("revocation", XERO_REVOCATION_URL)?,
		})
	}

	/// Parses an endpoint override, labelling failures with the endpoint name.
	pub fn parse(endpoint: &'static str, raw: &str) -> Result<Url, ValidationError> {
		Url::parse(raw).map_err(|source| ValidationError::InvalidEndpoint { endpoint, source })
	}
}
