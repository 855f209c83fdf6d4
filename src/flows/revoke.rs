//! Revocation and logout.

// self
use crate::{
	_prelude::*,
	flows::{Broker, common},
	http::TokenHttpClient,
	obs::FlowKind,
};

impl<C> Broker<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Revokes the refresh token at the provider and clears the local token pair.
	///
	/// The client stays logged in. On failure the record is left untouched.
	pub async fn revoke(&self) -> Result<()> {
		common::observe(FlowKind::Revoke, "revoke", async move {
			let _guard = self.mutation_guard.lock().await;

			self.revoke_locked().await
		})
		.await
	}

	/// Best-effort revoke followed by clearing every credential and token.
	///
	/// Never fails: revoke errors are logged and the local state is cleared regardless.
	pub async fn logout(&self) {
		let _guard = self.mutation_guard.lock().await;
		let has_tokens = self.record.lock().tokens().issued().is_some();

		if has_tokens {
			let revoked =
				common::observe(FlowKind::Revoke, "logout", async { self.revoke_locked().await })
					.await;

			if let Err(e) = revoked {
				tracing::warn!(error = %e, "Revoke during logout failed; clearing local state anyway.");
			}
		}

		self.record.lock().clear();

		tracing::info!("Logged out.");
	}

	async fn revoke_locked(&self) -> Result<()> {
		let (client, refresh_token) = {
			let record = self.record.lock();
			let (client, tokens) = record.authorized()?;

			(client.clone(), tokens.refresh_token.clone())
		};

		self.exchanger().revoke(&client, &refresh_token).await?;
		self.record.lock().clear_tokens();

		tracing::info!(revoked = %refresh_token.fingerprint(), "Refresh token revoked.");

		Ok(())
	}
}
