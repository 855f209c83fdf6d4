//! Broker-level error taxonomy shared by the record, the exchanger, and the flows.
//!
//! Every public operation returns [`Error`], whose variants separate the failure kinds a
//! caller has to react to differently: bad input ([`ValidationError`]), calls made in the
//! wrong lifecycle phase ([`PreconditionError`]), retryable network failures
//! ([`TransportError`]), provider refusals ([`RemoteRejection`]), contract mismatches
//! ([`MalformedResponse`]), and scope coverage problems ([`ScopeMismatch`]).

// self
use crate::_prelude::*;

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Malformed input to a broker method.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Method invoked before the state it depends on exists.
	#[error(transparent)]
	Precondition(#[from] PreconditionError),
	/// Network or timeout failure while reaching the provider; retryable.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Provider answered with a non-success HTTP status.
	#[error(transparent)]
	RemoteRejection(#[from] RemoteRejection),
	/// Provider answered with a success status but an unusable body.
	#[error(transparent)]
	MalformedResponse(#[from] MalformedResponse),
	/// Granted scopes do not cover the requested scopes.
	#[error(transparent)]
	ScopeMismatch(#[from] ScopeMismatch),
	/// Local HTTP plumbing could not be set up.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// A JSON view of the record could not be encoded.
	#[error("Failed to encode the credential record as JSON.")]
	Serialization(#[source] serde_json::Error),
}
impl Error {
	/// Returns `true` when retrying the same call later may succeed without new input.
	///
	/// Only transport failures qualify; provider rejections usually mean the credentials
	/// must be re-authorized.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Transport(_))
	}
}

/// Input validation failures. Never retried.
#[derive(Debug, ThisError)]
pub enum ValidationError {
	/// Client identifier has the wrong length.
	#[error("Client identifier must be {expected} characters long, got {actual}.")]
	ClientIdLength {
		/// Required length.
		expected: usize,
		/// Supplied length.
		actual: usize,
	},
	/// Client identifier contains characters outside `[A-Za-z0-9]`.
	#[error("Client identifier must be ASCII alphanumeric.")]
	ClientIdFormat,
	/// Client secret has the wrong length.
	#[error("Client secret must be {expected} characters long, got {actual}.")]
	ClientSecretLength {
		/// Required length.
		expected: usize,
		/// Supplied length.
		actual: usize,
	},
	/// Client secret contains characters outside `[A-Za-z0-9_-]`.
	#[error("Client secret contains unsupported characters.")]
	ClientSecretFormat,
	/// Tenant identifier is not a UUID.
	#[error("Tenant identifier `{value}` is not a valid UUID.")]
	InvalidTenantId {
		/// Offending input.
		value: String,
		/// Underlying parse failure.
		#[source]
		source: uuid::Error,
	},
	/// Redirect URL cannot be parsed as an absolute URL.
	#[error("Redirect URL is invalid.")]
	InvalidRedirect {
		/// Underlying parse failure.
		#[source]
		source: url::ParseError,
	},
	/// Redirect URL parsed but cannot carry an authorization code.
	#[error("Redirect URL `{url}` must be an absolute http(s) URL.")]
	UnsupportedRedirect {
		/// Offending URL.
		url: String,
	},
	/// A provider endpoint URL cannot be parsed.
	#[error("The {endpoint} endpoint URL is invalid.")]
	InvalidEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Underlying parse failure.
		#[source]
		source: url::ParseError,
	},
	/// No scopes were requested.
	#[error("Requested scopes cannot be empty.")]
	EmptyScopes,
	/// A requested scope is malformed.
	#[error(transparent)]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// A duration setting is outside its allowed range.
	#[error("The {setting} setting must be {requirement}.")]
	InvalidDuration {
		/// Setting name.
		setting: &'static str,
		/// Human-readable constraint.
		requirement: &'static str,
	},
	/// Authorization code is empty.
	#[error("Authorization code cannot be empty.")]
	EmptyCode,
	/// Supplied access token is empty.
	#[error("Access token cannot be empty.")]
	EmptyAccessToken,
	/// Supplied refresh token is empty.
	#[error("Refresh token cannot be empty.")]
	EmptyRefreshToken,
	/// Returned `state` does not match the nonce issued with the authorization URL.
	#[error("Authorization state does not match the issued nonce.")]
	StateMismatch,
}

/// Lifecycle ordering failures. Never retried; the caller sequenced calls incorrectly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
pub enum PreconditionError {
	/// Client credentials have not been supplied.
	#[error("Client has not logged in.")]
	NotLoggedIn,
	/// No access/refresh token pair has been issued yet, or it was revoked.
	#[error("Token system has not been initialised.")]
	NotInitialized,
	/// A code arrived but no authorization URL was issued since the last exchange.
	#[error("No authorization is in flight; request a new authorization URL.")]
	NoPendingAuthorization,
	/// `bootstrap` was called on a broker that was not started from a refresh token.
	#[error("Broker was not started from a bootstrap refresh token.")]
	NotBootstrapping,
}

/// Transport-level failures (network, timeout, IO). Retryable.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// The exchange did not finish within the configured timeout.
	#[error("Request to the {endpoint} endpoint timed out after {timeout}.")]
	Timeout {
		/// Endpoint label.
		endpoint: &'static str,
		/// Configured timeout.
		timeout: Duration,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the provider.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the provider.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}

/// Provider returned a non-success HTTP status.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Provider rejected the {endpoint} request with status {status}: {body}")]
pub struct RemoteRejection {
	/// Endpoint label (`token`, `revocation`, `connections`).
	pub endpoint: &'static str,
	/// HTTP status code.
	pub status: u16,
	/// Raw response body, lossily decoded as UTF-8.
	pub body: String,
	/// Retry-After hint from the provider, if supplied.
	pub retry_after: Option<Duration>,
}
impl RemoteRejection {
	/// Returns the OAuth `error` field when the body is an RFC 6749 error document.
	pub fn oauth_error(&self) -> Option<String> {
		#[derive(Deserialize)]
		struct ErrorBody {
			error: String,
		}

		serde_json::from_str::<ErrorBody>(&self.body).ok().map(|body| body.error)
	}

	/// Returns `true` when the provider signalled a temporary condition (429 or 5xx).
	pub fn is_transient(&self) -> bool {
		self.status == 429 || self.status >= 500
	}
}

/// Provider returned a success status but a body the broker cannot use.
#[derive(Debug, ThisError)]
pub enum MalformedResponse {
	/// The body is not valid JSON for the expected shape.
	#[error("The {endpoint} endpoint returned malformed JSON.")]
	Decode {
		/// Endpoint label.
		endpoint: &'static str,
		/// Structured parsing failure including the offending field path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// A required token field is missing, empty, or zero.
	#[error("Token endpoint response is missing `{field}`.")]
	MissingField {
		/// Name of the missing field.
		field: &'static str,
	},
	/// `expires_in` is negative or does not fit the supported range.
	#[error("Token endpoint returned an unusable expires_in value: {value}.")]
	ExpiresInOutOfRange {
		/// Raw value from the provider.
		value: i64,
	},
}

/// Granted scopes do not cover the requested scopes.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ScopeMismatch {
	/// No scopes were requested, so there is nothing to verify.
	#[error("No requested scopes were provided to verify.")]
	NoneRequested,
	/// At least one requested scope was not granted.
	#[error("Scopes not granted by the provider: {}.", .missing.join(", "))]
	Missing {
		/// Requested scopes absent from the grant.
		missing: Vec<String>,
	},
}

/// Local HTTP plumbing failures raised by the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn rejection(status: u16, body: &str) -> RemoteRejection {
		RemoteRejection { endpoint: "token", status, body: body.into(), retry_after: None }
	}

	#[test]
	fn rejection_display_carries_status_and_body() {
		let err = Error::from(rejection(401, "{\"error\":\"bad_grant\"}"));
		let message = err.to_string();

		assert!(message.contains("401"));
		assert!(message.contains("bad_grant"));
		assert!(!err.is_retryable());
	}

	#[test]
	fn rejection_extracts_oauth_error_field() {
		assert_eq!(
			rejection(400, "{\"error\":\"invalid_grant\"}").oauth_error().as_deref(),
			Some("invalid_grant")
		);
		assert_eq!(rejection(502, "<html>bad gateway</html>").oauth_error(), None);
		assert!(rejection(502, "").is_transient());
		assert!(rejection(429, "").is_transient());
		assert!(!rejection(401, "").is_transient());
	}

	#[test]
	fn only_transport_errors_are_retryable() {
		let timeout =
			Error::from(TransportError::Timeout { endpoint: "token", timeout: Duration::SECOND });

		assert!(timeout.is_retryable());
		assert!(!Error::from(PreconditionError::NotLoggedIn).is_retryable());
		assert!(!Error::from(MalformedResponse::MissingField { field: "access_token" }).is_retryable());
	}

	#[test]
	fn scope_mismatch_lists_missing_scopes() {
		let err = ScopeMismatch::Missing { missing: vec!["a".into(), "b".into()] };

		assert_eq!(err.to_string(), "Scopes not granted by the provider: a, b.");
	}
}
