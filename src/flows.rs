//! Broker facade: the operations an outer application calls.
//!
//! [`Broker`] owns the configuration, the transport, and the single credential record.
//! Field access goes through a `parking_lot` mutex that is never held across an `.await`;
//! every token mutation additionally holds the async mutation guard for the whole
//! exchange, so concurrent refreshes, revokes, and code exchanges run one at a time and
//! each one observes the result of the previous.

pub mod authorize;
pub mod common;
pub mod refresh;
pub mod revoke;
pub mod status;

pub use self::refresh::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{CredentialRecord, InitMode},
	config::BrokerConfig,
	exchange::TokenExchanger,
	http::TokenHttpClient,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Broker specialized for the crate's default reqwest transport stack.
pub type ReqwestBroker = Broker<ReqwestHttpClient>;

/// Single-tenant credential broker.
///
/// Cloning is cheap and every clone shares the same record, guard, and transport, which
/// is how the background refresher and request handlers observe one state.
pub struct Broker<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Immutable configuration fixed at construction.
	pub config: Arc<BrokerConfig>,
	/// HTTP client wrapper used for every outbound provider request.
	pub http_client: Arc<C>,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	record: Arc<Mutex<CredentialRecord>>,
	mutation_guard: Arc<AsyncMutex<()>>,
}
impl<C> Broker<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Creates a broker that reuses the caller-provided transport.
	pub fn with_http_client(
		config: BrokerConfig,
		mode: InitMode,
		http_client: impl Into<Arc<C>>,
	) -> Result<Self> {
		let record = CredentialRecord::new(mode)?;

		Ok(Self {
			config: Arc::new(config),
			http_client: http_client.into(),
			refresh_metrics: Default::default(),
			record: Arc::new(Mutex::new(record)),
			mutation_guard: Default::default(),
		})
	}

	pub(crate) fn exchanger(&self) -> TokenExchanger<'_, C> {
		TokenExchanger::new(self.http_client.as_ref(), &self.config)
	}
}
#[cfg(feature = "reqwest")]
impl Broker<ReqwestHttpClient> {
	/// Creates a broker backed by a reqwest client that does not follow redirects.
	pub fn new(config: BrokerConfig, mode: InitMode) -> Result<Self> {
		let http_client = ReqwestHttpClient::new()?;

		Self::with_http_client(config, mode, http_client)
	}
}
impl<C> Clone for Broker<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			config: Arc::clone(&self.config),
			http_client: Arc::clone(&self.http_client),
			refresh_metrics: Arc::clone(&self.refresh_metrics),
			record: Arc::clone(&self.record),
			mutation_guard: Arc::clone(&self.mutation_guard),
		}
	}
}
impl<C> Debug for Broker<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Broker")
			.field("config", &self.config)
			.field("phase", &self.record.lock().phase())
			.finish()
	}
}
