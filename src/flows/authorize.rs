//! Getting from no credentials to an issued token pair: client credentials, the
//! authorization URL, the code exchange, and the two shortcuts (bootstrap and restore).

// self
use crate::{
	_prelude::*,
	auth::{ClientCredentials, TokenSet, TokenState},
	error::{PreconditionError, ValidationError},
	flows::{
		Broker,
		common::{self, STATE_LEN},
	},
	http::TokenHttpClient,
	obs::FlowKind,
};

impl<C> Broker<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Validates and stores the client identity, marking the client as logged in.
	///
	/// Validation happens before the record is touched, so a rejected call changes nothing.
	pub fn add_client_credentials(
		&self,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		tenant_id: impl AsRef<str>,
	) -> Result<()> {
		let client = ClientCredentials::new(client_id, client_secret, tenant_id)?;

		tracing::info!(tenant_id = %client.tenant_id(), "Client credentials accepted.");

		self.record.lock().set_client(client);

		Ok(())
	}

	/// Returns the provider authorization URL for a fresh `state` nonce.
	///
	/// Each call replaces the nonce, so only the most recently issued URL can complete.
	pub fn auth_url(&self) -> Result<Url> {
		let mut record = self.record.lock();
		let client_id = record.client().ok_or(PreconditionError::NotLoggedIn)?.client_id().to_owned();
		let state = common::random_string(STATE_LEN);
		let mut url = self.config.endpoints.authorization.clone();

		url.query_pairs_mut()
			.append_pair("response_type", "code")
			.append_pair("client_id", &client_id)
			.append_pair("redirect_uri", self.config.redirect_uri.as_str())
			.append_pair("scope", &self.config.scopes.normalized())
			.append_pair("state", &state);
		record.begin_authorization(state);

		Ok(url)
	}

	/// Exchanges the authorization code delivered to the redirect URL.
	///
	/// `state` must equal the nonce of the most recent [`Broker::auth_url`]; a mismatch is
	/// rejected before any network call and leaves the nonce in place. A matching nonce is
	/// consumed even if the exchange then fails. The nonce is checked under the mutation
	/// guard, so a logout that finishes first invalidates it.
	pub async fn exchange_code(&self, state: &str, code: &str) -> Result<TokenSet> {
		common::observe(FlowKind::AuthorizationCode, "exchange_code", async move {
			let code = code.trim();

			if code.is_empty() {
				return Err(ValidationError::EmptyCode.into());
			}

			let _guard = self.mutation_guard.lock().await;
			let client = {
				let mut record = self.record.lock();

				record.take_state(state)?;
				record.client().cloned().ok_or(PreconditionError::NotLoggedIn)?
			};
			let grant = self.exchanger().exchange_code(&client, code).await?;
			let tokens =
				grant.into_token_set(OffsetDateTime::now_utc(), self.config.refresh_token_lifetime);

			self.record.lock().install(tokens.clone());

			tracing::info!(
				access_expiry = %tokens.access_token_expiry_utc,
				refresh_expiry = %tokens.refresh_token_expiry_utc,
				"Authorization code exchanged."
			);

			Ok(tokens)
		})
		.await
	}

	/// Completes a broker started with
	/// [`InitMode::BootstrapFromRefreshToken`](crate::auth::InitMode::BootstrapFromRefreshToken).
	///
	/// Performs the immediate refresh, then verifies the granted scopes. A scope mismatch is
	/// returned as an error but the freshly issued tokens stay installed.
	pub async fn bootstrap(&self) -> Result<TokenSet> {
		let tokens = {
			let _guard = self.mutation_guard.lock().await;

			if !matches!(self.record.lock().tokens(), TokenState::Bootstrap { .. }) {
				return Err(PreconditionError::NotBootstrapping.into());
			}

			self.refresh_locked().await?
		};

		self.verify_scopes()?;

		Ok(tokens)
	}

	/// Installs a previously issued token set, e.g. one read back from
	/// [`Broker::status_json`].
	pub async fn restore(&self, tokens: TokenSet) -> Result<()> {
		if tokens.access_token.is_empty() {
			return Err(ValidationError::EmptyAccessToken.into());
		}
		if tokens.refresh_token.is_empty() {
			return Err(ValidationError::EmptyRefreshToken.into());
		}

		let _guard = self.mutation_guard.lock().await;
		let mut record = self.record.lock();

		if !record.is_logged_in() {
			return Err(PreconditionError::NotLoggedIn.into());
		}

		record.install(tokens);

		Ok(())
	}
}
