//! Expiry scheduler: a ticker that signals when the refresh token nears its deadline.
//!
//! The due condition is level-triggered. While the deadline (refresh expiry minus the
//! latitude) lies ahead and within the trigger window, every tick emits a
//! [`RefreshDue`] signal, so a consumer may see several signals for one window and must
//! treat refreshes as idempotent. Signals travel over a capacity-1 channel: when the
//! consumer lags, the ticker waits on delivery instead of queueing or dropping signals.

// crates.io
use tokio::{
	sync::mpsc::{self, Receiver},
	task::JoinHandle,
	time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
// self
use crate::{_prelude::*, config::BrokerConfig};

/// Timing parameters of the expiry scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExpirySchedule {
	/// Tick interval.
	pub interval: Duration,
	/// Margin subtracted from the refresh expiry to form the deadline.
	pub latitude: Duration,
	/// Distance before the deadline at which ticks start signalling.
	pub window: Duration,
}
impl ExpirySchedule {
	/// Derives the schedule from broker configuration.
	pub fn from_config(config: &BrokerConfig) -> Self {
		Self {
			interval: config.check_interval,
			latitude: config.latitude,
			window: config.refresh_window,
		}
	}

	/// Returns `true` when a refresh should be signalled at `now`.
	pub fn is_due(&self, refresh_expiry: OffsetDateTime, now: OffsetDateTime) -> bool {
		let deadline = refresh_expiry.saturating_sub(self.latitude);

		deadline > now && deadline - now <= self.window
	}
}

/// Signal emitted when a refresh is due.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshDue {
	/// Refresh-token expiry that made the tick due.
	pub refresh_token_expiry_utc: OffsetDateTime,
	/// Instant the tick evaluated the condition.
	pub observed_at: OffsetDateTime,
}

/// Spawns the scheduler task and returns it with the receiving end of its signals.
///
/// `current_expiry` reports the current refresh-token expiry, or `None` while no tokens are held.
/// `now` supplies the wall clock. The task ends when `cancel` fires or the receiver is
/// dropped.
pub fn spawn_expiry_scheduler<E, N>(
	schedule: ExpirySchedule,
	current_expiry: E,
	now: N,
	cancel: CancellationToken,
) -> (JoinHandle<()>, Receiver<RefreshDue>)
where
	E: 'static + Send + Fn() -> Option<OffsetDateTime>,
	N: 'static + Send + Fn() -> OffsetDateTime,
{
	let (tx, rx) = mpsc::channel(1);
	let period = schedule.interval.unsigned_abs();
	let task = tokio::spawn(async move {
		let mut ticker = time::interval_at(Instant::now() + period, period);

		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

		loop {
			tokio::select! {
				_ = cancel.cancelled() => break,
				_ = ticker.tick() => {},
			}

			let Some(refresh_token_expiry_utc) = current_expiry() else {
				continue;
			};
			let observed_at = now();

			if !schedule.is_due(refresh_token_expiry_utc, observed_at) {
				continue;
			}

			tracing::debug!(%refresh_token_expiry_utc, "Refresh is due.");

			let due = RefreshDue { refresh_token_expiry_utc, observed_at };
			let delivered = tokio::select! {
				_ = cancel.cancelled() => break,
				sent = tx.send(due) => sent.is_ok(),
			};

			if !delivered {
				break;
			}
		}

		tracing::debug!("Expiry scheduler stopped.");
	});

	(task, rx)
}
