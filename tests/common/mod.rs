//! Shared fixtures for the broker integration tests.

#![allow(dead_code)]

// crates.io
use httpmock::prelude::*;
use time::{Duration, OffsetDateTime};
use url::Url;
// self
use token_broker::{
	auth::{InitMode, TokenSecret, TokenSet},
	config::{BrokerConfig, BrokerConfigBuilder, ProviderEndpoints},
	flows::ReqwestBroker,
};

pub const CLIENT_ID: &str = "ABCDEF0123456789ABCDEF0123456789";
pub const CLIENT_SECRET: &str = "abcdefghijklmnopqrstuvwxyz_-ABCDEFGHIJKLMNOPQRST";
pub const TENANT_ID: &str = "6f9e2b1c-3d4a-4b5c-8d7e-0f1a2b3c4d5e";
pub const REDIRECT_URI: &str = "http://localhost:5001/code";
pub const SCOPES: [&str; 2] = ["offline_access", "accounting.transactions"];

pub fn endpoints(server: &MockServer) -> ProviderEndpoints {
	let url = |path: &str| Url::parse(&server.url(path)).expect("Mock endpoint should parse.");

	ProviderEndpoints {
		authorization: url("/authorize"),
		token: url("/token"),
		connections: url("/connections"),
		revocation: url("/revoke"),
	}
}

pub fn config_builder(server: &MockServer) -> BrokerConfigBuilder {
	BrokerConfig::builder(REDIRECT_URI, SCOPES).endpoints(endpoints(server))
}

pub fn broker_with(config: BrokerConfigBuilder, mode: InitMode) -> ReqwestBroker {
	let config = config.build().expect("Test configuration should validate.");

	ReqwestBroker::new(config, mode).expect("Broker should build.")
}

/// Logged-in broker with no tokens.
pub fn logged_in_broker(server: &MockServer) -> ReqwestBroker {
	let broker = broker_with(config_builder(server), InitMode::FreshStart);

	broker
		.add_client_credentials(CLIENT_ID, CLIENT_SECRET, TENANT_ID)
		.expect("Client fixture should be accepted.");

	broker
}

pub fn token_set(access: &str, refresh: &str, access_ttl: Duration) -> TokenSet {
	let now = OffsetDateTime::now_utc();

	TokenSet {
		access_token: TokenSecret::new(access),
		access_token_expiry_utc: now + access_ttl,
		refresh_token: TokenSecret::new(refresh),
		refresh_token_expiry_utc: now + Duration::days(50),
		scopes: SCOPES.iter().map(|scope| scope.to_string()).collect(),
	}
}

/// Logged-in broker holding the given token pair.
pub async fn seeded_broker(config: BrokerConfigBuilder, tokens: TokenSet) -> ReqwestBroker {
	let broker = broker_with(config, InitMode::FreshStart);

	broker
		.add_client_credentials(CLIENT_ID, CLIENT_SECRET, TENANT_ID)
		.expect("Client fixture should be accepted.");
	broker.restore(tokens).await.expect("Token fixture should install.");

	broker
}

pub fn token_body(access: &str, refresh: &str, expires_in: i64) -> String {
	format!(
		"{{\"access_token\":\"{access}\",\"refresh_token\":\"{refresh}\",\"expires_in\":{expires_in},\"token_type\":\"Bearer\",\"scope\":\"openid offline_access accounting.transactions\"}}"
	)
}
