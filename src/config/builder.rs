// self
use crate::{
	_prelude::*,
	auth::ScopeSet,
	config::{
		ADVISED_MIN_REFRESH_TOKEN_LIFETIME, BrokerConfig, DEFAULT_CHECK_INTERVAL,
		DEFAULT_HTTP_TIMEOUT, DEFAULT_LATITUDE, DEFAULT_REFRESH_TOKEN_LIFETIME,
		DEFAULT_REFRESH_WINDOW, MAX_DURATION_SETTING, ProviderEndpoints,
	},
	error::ValidationError,
};

/// Builder for [`BrokerConfig`] values.
#[derive(Debug)]
pub struct BrokerConfigBuilder {
	/// Raw redirect URL, parsed on build.
	pub redirect_uri: String,
	/// Raw requested scopes, normalized on build.
	pub scopes: Vec<String>,
	/// Endpoint overrides; Xero's endpoints when unset.
	pub endpoints: Option<ProviderEndpoints>,
	/// Bound on each provider exchange.
	pub http_timeout: Duration,
	/// Scheduler tick interval.
	pub check_interval: Duration,
	/// Safety margin subtracted from expiries.
	pub latitude: Duration,
	/// Assumed refresh-token lifetime.
	pub refresh_token_lifetime: Duration,
	/// Scheduler trigger window.
	pub refresh_window: Duration,
}
impl BrokerConfigBuilder {
	/// Creates a new builder seeded with the provider defaults.
	pub fn new<I, S>(redirect_uri: impl Into<String>, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			redirect_uri: redirect_uri.into(),
			scopes: scopes.into_iter().map(Into::into).collect(),
			endpoints: None,
			http_timeout: DEFAULT_HTTP_TIMEOUT,
			check_interval: DEFAULT_CHECK_INTERVAL,
			latitude: DEFAULT_LATITUDE,
			refresh_token_lifetime: DEFAULT_REFRESH_TOKEN_LIFETIME,
			refresh_window: DEFAULT_REFRESH_WINDOW,
		}
	}

	/// Overrides the provider endpoints.
	pub fn endpoints(mut self, endpoints: ProviderEndpoints) -> Self {
		self.endpoints = Some(endpoints);

		self
	}

	/// Sets the bound on each provider exchange.
	pub fn http_timeout(mut self, timeout: Duration) -> Self {
		self.http_timeout = timeout;

		self
	}

	/// Sets the scheduler tick interval.
	pub fn check_interval(mut self, interval: Duration) -> Self {
		self.check_interval = interval;

		self
	}

	/// Sets the safety margin subtracted from expiries.
	pub fn latitude(mut self, latitude: Duration) -> Self {
		self.latitude = latitude;

		self
	}

	/// Sets the assumed refresh-token lifetime.
	pub fn refresh_token_lifetime(mut self, lifetime: Duration) -> Self {
		self.refresh_token_lifetime = lifetime;

		self
	}

	/// Sets how far ahead of the refresh deadline the scheduler starts signalling.
	pub fn refresh_window(mut self, window: Duration) -> Self {
		self.refresh_window = window;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<BrokerConfig, ValidationError> {
		let redirect_uri = validate_redirect(&self.redirect_uri)?;

		if self.scopes.is_empty() {
			return Err(ValidationError::EmptyScopes);
		}

		let scopes = ScopeSet::new(self.scopes)?;
		let endpoints = match self.endpoints {
			Some(endpoints) => endpoints,
			None => ProviderEndpoints::xero()?,
		};

		require_positive("http_timeout", self.http_timeout)?;
		require_positive("check_interval", self.check_interval)?;
		require_positive("refresh_token_lifetime", self.refresh_token_lifetime)?;
		require_positive("refresh_window", self.refresh_window)?;

		if self.latitude.is_negative() {
			return Err(ValidationError::InvalidDuration {
				setting: "latitude",
				requirement: "zero or positive",
			});
		}

		require_bounded("http_timeout", self.http_timeout)?;
		require_bounded("check_interval", self.check_interval)?;
		require_bounded("latitude", self.latitude)?;
		require_bounded("refresh_token_lifetime", self.refresh_token_lifetime)?;
		require_bounded("refresh_window", self.refresh_window)?;

		if self.refresh_token_lifetime < ADVISED_MIN_REFRESH_TOKEN_LIFETIME {
			tracing::warn!(
				lifetime_secs = self.refresh_token_lifetime.whole_seconds(),
				"Refresh-token lifetimes below 20 minutes are inadvisable in production."
			);
		}

		Ok(BrokerConfig {
			redirect_uri,
			scopes,
			endpoints,
			http_timeout: self.http_timeout,
			check_interval: self.check_interval,
			latitude: self.latitude,
			refresh_token_lifetime: self.refresh_token_lifetime,
			refresh_window: self.refresh_window,
		})
	}
}

fn validate_redirect(raw: &str) -> Result<Url, ValidationError> {
	let url = Url::parse(raw).map_err(|source| ValidationError::InvalidRedirect { source })?;

	if !matches!(url.scheme(), "http" | "https") || !url.has_host() {
		return Err(ValidationError::UnsupportedRedirect { url: url.to_string() });
	}

	Ok(url)
}

fn require_positive(setting: &'static str, value: Duration) -> Result<(), ValidationError> {
	if value.is_positive() {
		Ok(())
	} else {
		Err(ValidationError::InvalidDuration { setting, requirement: "positive" })
	}
}

fn require_bounded(setting: &'static str, value: Duration) -> Result<(), ValidationError> {
	if value <= MAX_DURATION_SETTING {
		Ok(())
	} else {
		Err(ValidationError::InvalidDuration { setting, requirement: "at most ten years" })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_follow_the_provider() {
		let config = BrokerConfig::builder("http://localhost:5001/code", ["offline_access"])
			.build()
			.expect("Default configuration should validate.");

		assert_eq!(config.http_timeout, Duration::seconds(3));
		assert_eq!(config.check_interval, Duration::minutes(1));
		assert_eq!(config.latitude, Duration::seconds(60));
		assert_eq!(config.refresh_token_lifetime, Duration::days(50));
		assert_eq!(config.endpoints.token.as_str(), "https://identity.xero.com/connect/token");
	}

	#[test]
	fn redirect_must_be_absolute_http() {
		assert!(matches!(
			BrokerConfig::builder("/code", ["offline_access"]).build(),
			Err(ValidationError::InvalidRedirect { .. })
		));
		assert!(matches!(
			BrokerConfig::builder("mailto:ops@example.com", ["offline_access"]).build(),
			Err(ValidationError::UnsupportedRedirect { .. })
		));
	}

	#[test]
	fn scopes_must_be_present_and_clean() {
		assert!(matches!(
			BrokerConfig::builder("https://app.test/code", Vec::<String>::new()).build(),
			Err(ValidationError::EmptyScopes)
		));
		assert!(matches!(
			BrokerConfig::builder("https://app.test/code", ["bad scope"]).build(),
			Err(ValidationError::InvalidScope(_))
		));
	}

	#[test]
	fn durations_are_range_checked() {
		let base = || BrokerConfig::builder("https://app.test/code", ["offline_access"]);

		assert!(matches!(
			base().http_timeout(Duration::ZERO).build(),
			Err(ValidationError::InvalidDuration { setting: "http_timeout", .. })
		));
		assert!(matches!(
			base().check_interval(Duration::seconds(-1)).build(),
			Err(ValidationError::InvalidDuration { setting: "check_interval", .. })
		));
		assert!(matches!(
			base().latitude(Duration::seconds(-1)).build(),
			Err(ValidationError::InvalidDuration { setting: "latitude", .. })
		));
		assert!(base().latitude(Duration::ZERO).build().is_ok());
		assert!(matches!(
			base().refresh_token_lifetime(Duration::MAX).build(),
			Err(ValidationError::InvalidDuration { setting: "refresh_token_lifetime", .. })
		));
		assert!(matches!(
			base().latitude(Duration::days(3651)).build(),
			Err(ValidationError::InvalidDuration { setting: "latitude", .. })
		));
		assert!(base().refresh_token_lifetime(MAX_DURATION_SETTING).build().is_ok());
		assert!(
			base().refresh_token_lifetime(Duration::minutes(5)).build().is_ok(),
			"Short refresh lifetimes are only warned about."
		);
	}
}
