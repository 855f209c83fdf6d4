//! Shared helpers for flow implementations (instrumentation, nonce generation).

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	obs::{FlowKind, FlowOutcome, FlowSpan},
};

/// Length of the `state` nonce bound to an authorization URL.
pub const STATE_LEN: usize = 32;

/// Runs `fut` inside a flow span and records its attempt and outcome.
pub(crate) async fn observe<Fut, T>(kind: FlowKind, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = FlowSpan::new(kind, stage);

	FlowOutcome::Attempt.record(kind);

	let result = span.instrument(fut).await;

	FlowOutcome::of(&result).record(kind);

	result
}

/// Alphanumeric random string used for `state` nonces.
pub(crate) fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}
