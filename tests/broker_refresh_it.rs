#![cfg(feature = "reqwest")]

mod common;

// std
use std::time::Duration as StdDuration;
// crates.io
use httpmock::prelude::*;
use time::Duration;
use url::Url;
// self
use common::*;
use token_broker::{
	auth::InitMode,
	config::ProviderEndpoints,
	error::{Error, PreconditionError, RemoteRejection, TransportError},
};

#[tokio::test]
async fn rejected_refresh_keeps_the_previous_tokens() {
	let server = MockServer::start_async().await;
	let seeded = token_set("abc", "def", Duration::minutes(30));
	let broker = seeded_broker(config_builder(&server), seeded.clone()).await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.form_urlencoded_tuple("grant_type", "refresh_token")
				.form_urlencoded_tuple("refresh_token", "def");
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"error\":\"bad_grant\"}");
		})
		.await;
	let err = broker.refresh().await.expect_err("Provider rejection should surface.");

	mock.assert_calls_async(1).await;

	let Error::RemoteRejection(rejection @ RemoteRejection { status: 401, .. }) = &err else {
		panic!("Expected a 401 rejection, got {err:?}.");
	};

	assert_eq!(rejection.oauth_error().as_deref(), Some("bad_grant"));
	assert!(!err.is_retryable());
	assert_eq!(broker.tokens(), Some(seeded));
	assert_eq!(broker.refresh_metrics.attempts(), 1);
	assert_eq!(broker.refresh_metrics.failures(), 1);
	assert_eq!(broker.refresh_metrics.successes(), 0);
	assert_eq!(broker.refresh_metrics.last_rotation(), None);
}

#[tokio::test]
async fn forced_refresh_rotates_the_pair() {
	let server = MockServer::start_async().await;
	let broker = seeded_broker(config_builder(&server), token_set("abc", "def", Duration::minutes(30))).await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.form_urlencoded_tuple("grant_type", "refresh_token")
				.form_urlencoded_tuple("refresh_token", "def");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("ghi", "jkl", 1800));
		})
		.await;
	let tokens = broker.refresh().await.expect("Refresh should succeed.");

	mock.assert_calls_async(1).await;

	assert_eq!(tokens.access_token.expose(), "ghi");
	assert_eq!(tokens.refresh_token.expose(), "jkl");
	assert_eq!(broker.tokens(), Some(tokens));
	assert_eq!(broker.refresh_metrics.successes(), 1);
	assert!(broker.refresh_metrics.last_rotation().is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn readers_see_the_old_or_the_new_pair_never_a_mix() {
	let server = MockServer::start_async().await;
	let seeded = token_set("abc", "def", Duration::minutes(30));
	let broker = seeded_broker(config_builder(&server), seeded.clone()).await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.delay(StdDuration::from_millis(300))
				.body(token_body("ghi", "jkl", 1800));
		})
		.await;

	let reader = tokio::spawn({
		let broker = broker.clone();

		async move {
			let mut snapshots = Vec::new();

			for _ in 0..60 {
				snapshots.push(broker.tokens());
				tokio::time::sleep(StdDuration::from_millis(10)).await;
			}

			snapshots
		}
	});
	let refreshed = broker.refresh().await.expect("Refresh should succeed.");
	let snapshots = reader.await.expect("Reader task should finish.");

	assert!(snapshots.contains(&Some(seeded.clone())), "Reader should see the seeded pair.");
	assert_eq!(snapshots.last(), Some(&Some(refreshed.clone())));

	for snapshot in snapshots {
		let snapshot = snapshot.expect("Tokens stay issued throughout a refresh.");

		assert!(snapshot == seeded || snapshot == refreshed, "Torn snapshot: {snapshot:?}.");
	}
}

#[tokio::test]
async fn get_refreshes_inside_the_latitude_margin() {
	let server = MockServer::start_async().await;
	let broker = seeded_broker(
		config_builder(&server).latitude(Duration::seconds(3)),
		token_set("abc", "def", Duration::seconds(2)),
	)
	.await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token").form_urlencoded_tuple("refresh_token", "def");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("ghi", "jkl", 1800));
		})
		.await;
	let tokens = broker.get().await.expect("Stale access token should be refreshed.");

	mock.assert_calls_async(1).await;

	assert_eq!(tokens.access_token.expose(), "ghi");
	assert_eq!(broker.token_json().expect("Token view should encode."), "{\"accessToken\":\"ghi\"}");
	assert_eq!(
		broker.refresh_token_json().expect("Refresh view should encode."),
		"{\"refreshToken\":\"jkl\"}"
	);
}

#[tokio::test]
async fn get_returns_fresh_tokens_without_a_network_call() {
	let server = MockServer::start_async().await;
	let seeded = token_set("abc", "def", Duration::minutes(30));
	let broker = seeded_broker(config_builder(&server), seeded.clone()).await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(500);
		})
		.await;
	let tokens = broker.get().await.expect("Fresh tokens should be returned as-is.");

	mock.assert_calls_async(0).await;

	assert_eq!(tokens, seeded);
}

#[tokio::test]
async fn concurrent_stale_gets_share_one_refresh() {
	let server = MockServer::start_async().await;
	let broker = seeded_broker(config_builder(&server), token_set("abc", "def", Duration::ZERO)).await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token").form_urlencoded_tuple("refresh_token", "def");
			then.status(200)
				.header("content-type", "application/json")
				.delay(StdDuration::from_millis(300))
				.body(token_body("ghi", "jkl", 1800));
		})
		.await;
	let (first, second, third) = tokio::join!(broker.get(), broker.get(), broker.get());

	mock.assert_calls_async(1).await;

	for tokens in [first, second, third] {
		let tokens = tokens.expect("Every waiter should observe the refreshed pair.");

		assert_eq!(tokens.access_token.expose(), "ghi");
		assert_eq!(tokens.refresh_token.expose(), "jkl");
	}

	assert_eq!(broker.refresh_metrics.attempts(), 1);
}

#[tokio::test]
async fn slow_provider_times_out_as_retryable() {
	let server = MockServer::start_async().await;
	let seeded = token_set("abc", "def", Duration::minutes(30));
	let broker = seeded_broker(
		config_builder(&server).http_timeout(Duration::milliseconds(200)),
		seeded.clone(),
	)
	.await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.delay(StdDuration::from_secs(1))
				.body(token_body("ghi", "jkl", 1800));
		})
		.await;

	let err = broker.refresh().await.expect_err("Refresh should time out.");

	assert!(
		matches!(err, Error::Transport(TransportError::Timeout { endpoint: "token", .. })),
		"Unexpected error: {err:?}"
	);
	assert!(err.is_retryable());
	assert_eq!(broker.tokens(), Some(seeded));
	assert_eq!(broker.refresh_metrics.failures(), 1);
}

#[tokio::test]
async fn unreachable_provider_is_a_transport_error() {
	let server = MockServer::start_async().await;
	let endpoints = ProviderEndpoints {
		token: Url::parse("http://127.0.0.1:1/token").expect("Static URL should parse."),
		..endpoints(&server)
	};
	let seeded = token_set("abc", "def", Duration::minutes(30));
	let broker = seeded_broker(config_builder(&server).endpoints(endpoints), seeded.clone()).await;
	let err = broker.refresh().await.expect_err("Closed port should fail.");

	assert!(matches!(err, Error::Transport(_)), "Unexpected error: {err:?}");
	assert!(err.is_retryable());
	assert_eq!(broker.tokens(), Some(seeded));
}

#[tokio::test]
async fn undecodable_success_body_is_malformed() {
	let server = MockServer::start_async().await;
	let seeded = token_set("abc", "def", Duration::minutes(30));
	let broker = seeded_broker(config_builder(&server), seeded.clone()).await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "text/html").body("<html>maintenance</html>");
		})
		.await;

	let err = broker.refresh().await.expect_err("HTML body should be rejected.");

	assert!(matches!(err, Error::MalformedResponse(_)), "Unexpected error: {err:?}");
	assert!(!err.is_retryable());
	assert_eq!(broker.tokens(), Some(seeded));
}

#[tokio::test]
async fn refresh_requires_a_client_and_tokens() {
	let server = MockServer::start_async().await;
	let broker = broker_with(config_builder(&server), InitMode::FreshStart);

	assert!(matches!(broker.refresh().await, Err(Error::Precondition(PreconditionError::NotLoggedIn))));
	assert!(matches!(broker.get().await, Err(Error::Precondition(PreconditionError::NotLoggedIn))));

	broker
		.add_client_credentials(CLIENT_ID, CLIENT_SECRET, TENANT_ID)
		.expect("Client fixture should be accepted.");

	assert!(matches!(
		broker.refresh().await,
		Err(Error::Precondition(PreconditionError::NotInitialized))
	));
	assert!(matches!(broker.status_json(), Err(Error::Precondition(PreconditionError::NotInitialized))));
	assert!(matches!(broker.token_json(), Err(Error::Precondition(PreconditionError::NotInitialized))));
	assert_eq!(broker.refresh_metrics.attempts(), 0);
}
