//! Immutable broker configuration fixed at construction.
//!
//! [`BrokerConfig`] carries the redirect URL, requested scopes, provider endpoints, and
//! the timing knobs that drive the exchanger and the expiry scheduler. Build it through
//! [`BrokerConfig::builder`], which validates every field before handing out a value.

/// Builder API for assembling broker configuration.
pub mod builder;
/// Provider endpoint set.
pub mod endpoints;

pub use builder::*;
pub use endpoints::*;

// self
use crate::{_prelude::*, auth::ScopeSet};

/// Default bound on every provider exchange.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::seconds(3);
/// Default tick interval of the expiry scheduler.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::minutes(1);
/// Default safety margin subtracted from expiries.
pub const DEFAULT_LATITUDE: Duration = Duration::seconds(60);
/// Assumed refresh-token lifetime; the provider does not report it.
pub const DEFAULT_REFRESH_TOKEN_LIFETIME: Duration = Duration::days(50);
/// Default distance before the refresh deadline at which the scheduler starts signalling.
pub const DEFAULT_REFRESH_WINDOW: Duration = Duration::days(1);
/// Refresh-token lifetimes shorter than this are accepted but logged as inadvisable.
pub const ADVISED_MIN_REFRESH_TOKEN_LIFETIME: Duration = Duration::minutes(20);
/// Upper bound on every duration setting; keeps expiry arithmetic inside the calendar range.
pub const MAX_DURATION_SETTING: Duration = Duration::days(3650);

/// Validated broker configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrokerConfig {
	/// Redirect URL registered with the provider.
	pub redirect_uri: Url,
	/// Scopes requested in the authorization URL and verified after exchanges.
	pub scopes: ScopeSet,
	/// Provider endpoints.
	pub endpoints: ProviderEndpoints,
	/// Bound on each provider exchange.
	pub http_timeout: Duration,
	/// Scheduler tick interval.
	pub check_interval: Duration,
	/// Safety margin subtracted from both expiries.
	pub latitude: Duration,
	/// Assumed refresh-token lifetime from the moment of issue.
	pub refresh_token_lifetime: Duration,
	/// How far ahead of the refresh deadline the scheduler starts signalling.
	pub refresh_window: Duration,
}
impl BrokerConfig {
	/// Starts a builder for the given redirect URL and requested scopes.
	pub fn builder<I, S>(redirect_uri: impl Into<String>, scopes: I) -> BrokerConfigBuilder
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		BrokerConfigBuilder::new(redirect_uri, scopes)
	}
}
