//! Read-side facade: scope verification, lifecycle phase, JSON views, and the connected
//! tenant listing.

// self
use crate::{
	_prelude::*,
	auth::{SessionPhase, TokenSet},
	error::ScopeMismatch,
	exchange::Connection,
	flows::{Broker, common},
	http::TokenHttpClient,
	obs::FlowKind,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AccessTokenView<'a> {
	access_token: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshTokenView<'a> {
	refresh_token: &'a str,
}

impl<C> Broker<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Checks that every requested scope was granted.
	pub fn verify_scopes(&self) -> Result<()> {
		let requested = &self.config.scopes;

		if requested.is_empty() {
			return Err(ScopeMismatch::NoneRequested.into());
		}

		let record = self.record.lock();
		let granted = record.tokens().issued().map(|tokens| tokens.scopes.as_slice()).unwrap_or(&[]);
		let missing = requested.missing_from(granted);

		if missing.is_empty() { Ok(()) } else { Err(ScopeMismatch::Missing { missing }.into()) }
	}

	/// Current lifecycle phase.
	pub fn phase(&self) -> SessionPhase {
		self.record.lock().phase()
	}

	/// Returns `true` once valid client credentials were supplied.
	pub fn is_logged_in(&self) -> bool {
		self.record.lock().is_logged_in()
	}

	/// Snapshot of the issued token set without freshness checks or refreshes.
	pub fn tokens(&self) -> Option<TokenSet> {
		self.record.lock().tokens().issued().cloned()
	}

	/// Full status document: both tokens, both expiries, and the granted scopes.
	pub fn status_json(&self) -> Result<String> {
		let tokens = self.authorized_tokens()?;

		serde_json::to_string(&tokens).map_err(Error::Serialization)
	}

	/// `{"accessToken": ...}` for the current access token.
	pub fn token_json(&self) -> Result<String> {
		let tokens = self.authorized_tokens()?;

		serde_json::to_string(&AccessTokenView { access_token: tokens.access_token.expose() })
			.map_err(Error::Serialization)
	}

	/// `{"refreshToken": ...}` for the current refresh token.
	pub fn refresh_token_json(&self) -> Result<String> {
		let tokens = self.authorized_tokens()?;

		serde_json::to_string(&RefreshTokenView { refresh_token: tokens.refresh_token.expose() })
			.map_err(Error::Serialization)
	}

	/// Lists the tenants connected to the current access token, refreshing it first when
	/// it is stale.
	pub async fn connections(&self) -> Result<Vec<Connection>> {
		let tokens = self.get().await?;

		common::observe(FlowKind::Connections, "connections", async move {
			self.exchanger().connections(&tokens.access_token).await
		})
		.await
	}

	fn authorized_tokens(&self) -> Result<TokenSet> {
		let record = self.record.lock();
		let (_, tokens) = record.authorized()?;

		Ok(tokens.clone())
	}
}
