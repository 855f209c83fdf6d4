//! Credential record state: the client identity, the issued token pair, and the in-flight
//! authorization nonce.

// self
use crate::{
	_prelude::*,
	auth::{ClientCredentials, TokenSecret},
	error::{PreconditionError, ValidationError},
};

/// Access/refresh token pair written together from one provider response.
///
/// Both expiries are derived from the same issue instant, so a set is always internally
/// consistent. The serialized form matches the broker's status document.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
	/// Bearer credential used against the provider's API.
	pub access_token: TokenSecret,
	/// Instant after which the access token is no longer accepted.
	#[serde(with = "time::serde::rfc3339")]
	pub access_token_expiry_utc: OffsetDateTime,
	/// Credential used to mint the next token set.
	pub refresh_token: TokenSecret,
	/// Assumed instant after which the refresh token lapses.
	#[serde(with = "time::serde::rfc3339")]
	pub refresh_token_expiry_utc: OffsetDateTime,
	/// Scopes the provider granted, in the order it reported them.
	#[serde(default)]
	pub scopes: Vec<String>,
}
impl TokenSet {
	/// Builds a token set issued at `issued_at`.
	///
	/// `access_lifetime` comes from the provider's `expires_in`; `refresh_lifetime` is the
	/// configured assumption since the provider does not report it.
	pub fn issue(
		access_token: TokenSecret,
		refresh_token: TokenSecret,
		scopes: Vec<String>,
		issued_at: OffsetDateTime,
		access_lifetime: Duration,
		refresh_lifetime: Duration,
	) -> Self {
		Self {
			access_token,
			access_token_expiry_utc: issued_at.saturating_add(access_lifetime),
			refresh_token,
			refresh_token_expiry_utc: issued_at.saturating_add(refresh_lifetime),
			scopes,
		}
	}

	/// Returns `true` while the access token stays valid beyond the `latitude` margin.
	pub fn is_fresh_at(&self, now: OffsetDateTime, latitude: Duration) -> bool {
		self.access_token_expiry_utc.saturating_sub(latitude) > now
	}
}
impl Debug for TokenSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenSet")
			.field("access_token", &self.access_token)
			.field("access_token_expiry_utc", &self.access_token_expiry_utc)
			.field("refresh_token", &self.refresh_token)
			.field("refresh_token_expiry_utc", &self.refresh_token_expiry_utc)
			.field("scopes", &self.scopes)
			.finish()
	}
}

/// Token portion of the credential record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TokenState {
	/// Nothing issued yet, or the last pair was revoked.
	#[default]
	Empty,
	/// Operator supplied a refresh token; the first refresh has not happened yet.
	Bootstrap {
		/// Refresh token to exchange on the first refresh.
		refresh_token: TokenSecret,
	},
	/// A complete token pair is held.
	Issued(TokenSet),
}
impl TokenState {
	/// Returns the issued token set, if any.
	pub fn issued(&self) -> Option<&TokenSet> {
		match self {
			Self::Issued(set) => Some(set),
			_ => None,
		}
	}

	/// Returns the refresh token the next refresh exchange should present.
	pub fn refresh_token(&self) -> Option<&TokenSecret> {
		match self {
			Self::Empty => None,
			Self::Bootstrap { refresh_token } => Some(refresh_token),
			Self::Issued(set) => Some(&set.refresh_token),
		}
	}
}

/// How the broker starts out.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum InitMode {
	/// Start empty and wait for an authorization-code exchange.
	#[default]
	FreshStart,
	/// Skip the authorization step and refresh from an operator-supplied refresh token.
	BootstrapFromRefreshToken(TokenSecret),
}

/// Lifecycle phase as observed by callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
	/// Client credentials have not been supplied (or were cleared by logout).
	NoCredentials,
	/// Credentials are valid but no authorization is in flight and no tokens are held.
	CredentialsSupplied,
	/// An authorization URL was issued and its code has not been exchanged yet.
	AwaitingCode,
	/// A token pair is held.
	Authorized,
}

/// Single mutable record guarded by the broker's lock.
#[derive(Clone, Debug, Default)]
pub struct CredentialRecord {
	client: Option<ClientCredentials>,
	tokens: TokenState,
	pending_state: Option<String>,
}
impl CredentialRecord {
	/// Creates the record for the given start mode.
	pub fn new(mode: InitMode) -> Result<Self, ValidationError> {
		let tokens = match mode {
			InitMode::FreshStart => TokenState::Empty,
			InitMode::BootstrapFromRefreshToken(refresh_token) => {
				if refresh_token.is_empty() {
					return Err(ValidationError::EmptyRefreshToken);
				}

				TokenState::Bootstrap { refresh_token }
			},
		};

		Ok(Self { client: None, tokens, pending_state: None })
	}

	/// Client credentials, when logged in.
	pub fn client(&self) -> Option<&ClientCredentials> {
		self.client.as_ref()
	}

	/// Token portion of the record.
	pub fn tokens(&self) -> &TokenState {
		&self.tokens
	}

	/// Returns `true` once valid client credentials were supplied.
	pub fn is_logged_in(&self) -> bool {
		self.client.is_some()
	}

	/// Current lifecycle phase.
	pub fn phase(&self) -> SessionPhase {
		match (&self.client, &self.tokens, &self.pending_state) {
			(None, _, _) => SessionPhase::NoCredentials,
			(Some(_), TokenState::Issued(_), _) => SessionPhase::Authorized,
			(Some(_), _, Some(_)) => SessionPhase::AwaitingCode,
			(Some(_), _, None) => SessionPhase::CredentialsSupplied,
		}
	}

	/// Installs validated client credentials.
	pub fn set_client(&mut self, client: ClientCredentials) {
		self.client = Some(client);
	}

	/// Stores the nonce bound to the authorization URL just handed out, replacing any
	/// earlier one.
	pub fn begin_authorization(&mut self, nonce: String) {
		self.pending_state = Some(nonce);
	}

	/// Consumes the pending nonce when `state` matches it.
	///
	/// A mismatch leaves the nonce in place so a forged callback cannot cancel the real one.
	pub fn take_state(&mut self, state: &str) -> Result<(), Error> {
		let Some(pending) = self.pending_state.as_deref() else {
			return Err(PreconditionError::NoPendingAuthorization.into());
		};

		if pending != state {
			return Err(ValidationError::StateMismatch.into());
		}

		self.pending_state = None;

		Ok(())
	}

	/// Precondition gate for operations that need a logged-in client and issued tokens.
	pub fn authorized(&self) -> Result<(&ClientCredentials, &TokenSet), PreconditionError> {
		let client = self.client.as_ref().ok_or(PreconditionError::NotLoggedIn)?;
		let tokens = self.tokens.issued().ok_or(PreconditionError::NotInitialized)?;

		Ok((client, tokens))
	}

	/// Precondition gate for refresh: a logged-in client plus a refresh token, either issued
	/// or supplied for bootstrap.
	pub fn refreshable(&self) -> Result<(&ClientCredentials, &TokenSecret), PreconditionError> {
		let client = self.client.as_ref().ok_or(PreconditionError::NotLoggedIn)?;
		let refresh_token = self.tokens.refresh_token().ok_or(PreconditionError::NotInitialized)?;

		Ok((client, refresh_token))
	}

	/// Replaces the token state wholesale with a freshly issued set.
	pub fn install(&mut self, tokens: TokenSet) {
		self.tokens = TokenState::Issued(tokens);
	}

	/// Drops the token state after a revoke.
	pub fn clear_tokens(&mut self) {
		self.tokens = TokenState::Empty;
	}

	/// Returns the record to its pristine state after a logout.
	pub fn clear(&mut self) {
		*self = Self::default();
	}
}
