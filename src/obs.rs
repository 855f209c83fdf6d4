//! Observability helpers shared by broker flows.
//!
//! Every flow runs inside a `token_broker.flow` span carrying the `flow` and `stage`
//! fields. With the `metrics` feature enabled, each attempt and its outcome also
//! increment the `token_broker_flow_total` counter, labeled by `flow` + `outcome`.

mod tracing;

pub use self::tracing::*;

// self
use crate::_prelude::*;

/// Provider interactions observed by the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Authorization-code exchange.
	AuthorizationCode,
	/// Refresh-token exchange.
	Refresh,
	/// Refresh-token revocation.
	Revoke,
	/// Connected-tenant listing.
	Connections,
}
impl FlowKind {
	/// Label used in span and metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::AuthorizationCode => "authorization_code",
			Self::Refresh => "refresh",
			Self::Revoke => "revoke",
			Self::Connections => "connections",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Stage of a flow reported to the metrics recorder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// The flow started.
	Attempt,
	/// The flow returned `Ok`.
	Success,
	/// The flow returned an error to its caller.
	Failure,
}
impl FlowOutcome {
	/// Classifies a finished flow.
	pub fn of<T>(result: &Result<T>) -> Self {
		if result.is_ok() { Self::Success } else { Self::Failure }
	}

	/// Label used in metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Attempt => "attempt",
			Self::Success => "success",
			Self::Failure => "failure",
		}
	}

	/// Increments `token_broker_flow_total` for `kind`; a no-op without the `metrics` feature.
	pub fn record(self, kind: FlowKind) {
		#[cfg(feature = "metrics")]
		{
			metrics::counter!(
				"token_broker_flow_total",
				"flow" => kind.as_str(),
				"outcome" => self.as_str()
			)
			.increment(1);
		}

		#[cfg(not(feature = "metrics"))]
		{
			let _ = kind;
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::PreconditionError;

	#[test]
	fn outcomes_follow_the_result() {
		let failed: Result<()> = Err(PreconditionError::NotInitialized.into());

		assert_eq!(FlowOutcome::of(&Ok::<_, Error>(1)), FlowOutcome::Success);
		assert_eq!(FlowOutcome::of(&failed), FlowOutcome::Failure);
		assert_eq!(FlowKind::Connections.to_string(), "connections");

		FlowOutcome::Failure.record(FlowKind::Revoke);
	}
}
