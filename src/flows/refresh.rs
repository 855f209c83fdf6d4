//! Refresh orchestration: forced refreshes, the freshness-checked `get`, and the
//! background coordinator that consumes scheduler signals.
//!
//! All three paths funnel into one refresh routine that runs under the broker's mutation
//! guard. A failed exchange never touches the record; a successful one replaces the whole
//! token set at once.

// std
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
// crates.io
use tokio::{sync::mpsc::Receiver, task::JoinHandle};
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	auth::TokenSet,
	flows::{Broker, common},
	http::TokenHttpClient,
	obs::FlowKind,
	schedule::{self, ExpirySchedule, RefreshDue},
};

impl<C> Broker<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Forces a refresh exchange and installs the new token set.
	///
	/// Requires a logged-in client and a refresh token, either issued by an earlier
	/// exchange or supplied at construction for bootstrap.
	pub async fn refresh(&self) -> Result<TokenSet> {
		common::observe(FlowKind::Refresh, "refresh", async move {
			let _guard = self.mutation_guard.lock().await;

			self.refresh_locked().await
		})
		.await
	}

	/// Returns the current token set, refreshing first when the access token is within the
	/// latitude margin of expiring.
	///
	/// Concurrent stale callers queue on the mutation guard and re-check freshness once they
	/// hold it, so a single refresh serves all of them.
	pub async fn get(&self) -> Result<TokenSet> {
		if let Some(tokens) = self.fresh_tokens()? {
			return Ok(tokens);
		}

		common::observe(FlowKind::Refresh, "get", async move {
			let _guard = self.mutation_guard.lock().await;

			if let Some(tokens) = self.fresh_tokens()? {
				return Ok(tokens);
			}

			tracing::debug!("Access token is stale; refreshing before returning it.");

			self.refresh_locked().await
		})
		.await
	}

	/// Spawns the expiry scheduler and the refresh coordinator on the current runtime.
	///
	/// Both tasks stop when `cancel` fires or when [`RefresherHandle::shutdown`] is called.
	pub fn spawn_refresher(&self, cancel: CancellationToken) -> RefresherHandle {
		let schedule = ExpirySchedule::from_config(&self.config);
		let record = Arc::clone(&self.record);
		let (scheduler, signals) = schedule::spawn_expiry_scheduler(
			schedule,
			move || record.lock().tokens().issued().map(|tokens| tokens.refresh_token_expiry_utc),
			OffsetDateTime::now_utc,
			cancel.clone(),
		);
		let coordinator = self.spawn_refresh_coordinator(signals, cancel.clone());

		tracing::info!(
			check_interval = %self.config.check_interval,
			refresh_window = %self.config.refresh_window,
			"Background refresher started."
		);

		RefresherHandle { cancel, scheduler, coordinator }
	}

	/// Spawns the coordinator alone, consuming `signals` until the sender closes or `cancel`
	/// fires.
	///
	/// Every consumed signal triggers exactly one refresh. Failures are logged and left for
	/// the next signal; nothing is escalated because no caller is waiting.
	pub fn spawn_refresh_coordinator(
		&self,
		mut signals: Receiver<RefreshDue>,
		cancel: CancellationToken,
	) -> JoinHandle<()> {
		let broker = self.clone();

		tokio::spawn(async move {
			loop {
				let due = tokio::select! {
					_ = cancel.cancelled() => break,
					due = signals.recv() => match due {
						Some(due) => due,
						None => break,
					},
				};

				match broker.refresh().await {
					Ok(tokens) => tracing::info!(
						refresh_expiry = %tokens.refresh_token_expiry_utc,
						signalled_at = %due.observed_at,
						"Background refresh succeeded."
					),
					Err(e) => tracing::warn!(
						error = %e,
						retryable = e.is_retryable(),
						"Background refresh failed; waiting for the next due signal."
					),
				}
			}

			tracing::debug!("Refresh coordinator stopped.");
		})
	}

	/// Refresh body; callers must hold the mutation guard.
	pub(crate) async fn refresh_locked(&self) -> Result<TokenSet> {
		let (client, refresh_token) = {
			let record = self.record.lock();
			let (client, refresh_token) = record.refreshable()?;

			(client.clone(), refresh_token.clone())
		};
		let outcome = self
			.exchanger()
			.exchange_refresh(&client, &refresh_token)
			.await
			.map(|grant| {
				grant.into_token_set(OffsetDateTime::now_utc(), self.config.refresh_token_lifetime)
			});

		if let Ok(tokens) = &outcome {
			self.record.lock().install(tokens.clone());
		}

		self.refresh_metrics.record(&outcome);

		let tokens = outcome?;

		tracing::info!(
			previous = %refresh_token.fingerprint(),
			current = %tokens.refresh_token.fingerprint(),
			access_expiry = %tokens.access_token_expiry_utc,
			"Refresh token rotated."
		);

		Ok(tokens)
	}

	fn fresh_tokens(&self) -> Result<Option<TokenSet>> {
		let record = self.record.lock();
		let (_, tokens) = record.authorized()?;

		Ok(tokens
			.is_fresh_at(OffsetDateTime::now_utc(), self.config.latitude)
			.then(|| tokens.clone()))
	}
}

/// Handle to the background scheduler and coordinator tasks.
#[derive(Debug)]
pub struct RefresherHandle {
	cancel: CancellationToken,
	scheduler: JoinHandle<()>,
	coordinator: JoinHandle<()>,
}
impl RefresherHandle {
	/// Cancels both tasks and waits for them to finish.
	pub async fn shutdown(self) {
		self.cancel.cancel();

		for (task, handle) in [("scheduler", self.scheduler), ("coordinator", self.coordinator)] {
			if let Err(e) = handle.await {
				tracing::warn!(task, error = %e, "Background refresher task ended abnormally.");
			}
		}
	}
}

/// Counters describing the refresh exchanges sent to the provider.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	successes: AtomicU64,
	failures: AtomicU64,
	last_rotation: AtomicI64,
}
impl RefreshMetrics {
	/// Refresh exchanges sent, whatever their outcome.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Refresh exchanges that installed a new token set.
	pub fn successes(&self) -> u64 {
		self.successes.load(Ordering::Relaxed)
	}

	/// Refresh exchanges that left the record untouched.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	/// Wall-clock instant of the latest successful refresh, to the second.
	pub fn last_rotation(&self) -> Option<OffsetDateTime> {
		match self.last_rotation.load(Ordering::Relaxed) {
			0 => None,
			secs => OffsetDateTime::from_unix_timestamp(secs).ok(),
		}
	}

	fn record(&self, outcome: &Result<TokenSet>) {
		self.attempts.fetch_add(1, Ordering::Relaxed);

		match outcome {
			Ok(_) => {
				self.successes.fetch_add(1, Ordering::Relaxed);
				self.last_rotation
					.store(OffsetDateTime::now_utc().unix_timestamp(), Ordering::Relaxed);
			},
			Err(_) => {
				self.failures.fetch_add(1, Ordering::Relaxed);
			},
		}
	}
}
