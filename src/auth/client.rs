//! Validated client identity used to authenticate against the provider's token endpoint.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use url::form_urlencoded;
use uuid::Uuid;
// self
use crate::{_prelude::*, auth::TokenSecret, error::ValidationError};

/// Required length of a client identifier.
pub const CLIENT_ID_LEN: usize = 32;
/// Required length of a client secret.
pub const CLIENT_SECRET_LEN: usize = 48;

/// Client identifier, secret, and tenant supplied by the operator.
///
/// Construction validates every field up front so a half-valid identity never reaches the
/// credential record.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
	client_id: String,
	client_secret: TokenSecret,
	tenant_id: Uuid,
}
impl ClientCredentials {
	/// Validates and bundles the client identity.
	///
	/// The client identifier must be 32 ASCII alphanumeric characters, the secret 48
	/// characters drawn from `[A-Za-z0-9_-]`, and the tenant a UUID. Errors never echo the
	/// secret.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		tenant_id: impl AsRef<str>,
	) -> Result<Self, ValidationError> {
		let client_id = client_id.into();
		let client_secret = client_secret.into();

		validate_client_id(&client_id)?;
		validate_client_secret(&client_secret)?;

		let tenant_view = tenant_id.as_ref();
		let tenant_id = Uuid::parse_str(tenant_view).map_err(|source| {
			ValidationError::InvalidTenantId { value: tenant_view.to_owned(), source }
		})?;

		Ok(Self { client_id, client_secret: TokenSecret::new(client_secret), tenant_id })
	}

	/// Client identifier.
	pub fn client_id(&self) -> &str {
		&self.client_id
	}

	/// Client secret; callers must avoid logging the exposed value.
	pub fn client_secret(&self) -> &TokenSecret {
		&self.client_secret
	}

	/// Tenant identifier.
	pub fn tenant_id(&self) -> Uuid {
		self.tenant_id
	}

	/// `Authorization` header value for HTTP Basic authentication.
	///
	/// Both halves are form-url-encoded before joining, matching RFC 6749 §2.3.1.
	pub fn basic_authorization(&self) -> String {
		let id = form_urlencoded::byte_serialize(self.client_id.as_bytes()).collect::<String>();
		let secret = form_urlencoded::byte_serialize(self.client_secret.expose().as_bytes())
			.collect::<String>();

		format!("Basic {}", STANDARD.encode(format!("{id}:{secret}")))
	}
}
impl Debug for ClientCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentials")
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret)
			.field("tenant_id", &self.tenant_id)
			.finish()
	}
}

fn validate_client_id(value: &str) -> Result<(), ValidationError> {
	let actual = value.chars().count();

	if actual != CLIENT_ID_LEN {
		return Err(ValidationError::ClientIdLength { expected: CLIENT_ID_LEN, actual });
	}
	if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
		return Err(ValidationError::ClientIdFormat);
	}

	Ok(())
}

fn validate_client_secret(value: &str) -> Result<(), ValidationError> {
	let actual = value.chars().count();

	if actual != CLIENT_SECRET_LEN {
		return Err(ValidationError::ClientSecretLength { expected: CLIENT_SECRET_LEN, actual });
	}
	if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
		return Err(ValidationError::ClientSecretFormat);
	}

	Ok(())
}
