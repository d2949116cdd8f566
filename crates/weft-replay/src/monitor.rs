// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background poller that detects analytics session rotation.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::pipeline::{observe_session, Pipeline};

/// Watches the analytics session identity and restarts capture on rotation.
///
/// Two logical states: tracking (recorder active, identity known) and unbound
/// (no session observed yet). The first observed session always counts as a
/// rotation, because the stored session id starts out unset.
pub(crate) struct SessionMonitor {
	task: Option<JoinHandle<()>>,
	shutdown_tx: Option<mpsc::Sender<()>>,
}

impl SessionMonitor {
	pub(crate) fn new() -> Self {
		Self {
			task: None,
			shutdown_tx: None,
		}
	}

	/// Starts the poll loop, replacing any previous one.
	pub(crate) fn start(&mut self, pipeline: Arc<Pipeline>, poll_interval: Duration) {
		self.abort();
		let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
		self.shutdown_tx = Some(shutdown_tx);
		self.task = Some(tokio::spawn(run_monitor_loop(
			pipeline,
			poll_interval,
			shutdown_rx,
		)));
	}

	/// Signals the loop to stop and waits for it to finish.
	pub(crate) async fn stop(&mut self) {
		if let Some(tx) = self.shutdown_tx.take() {
			let _ = tx.send(()).await;
		}
		if let Some(task) = self.task.take() {
			let _ = task.await;
		}
	}

	fn abort(&mut self) {
		self.shutdown_tx = None;
		if let Some(task) = self.task.take() {
			task.abort();
		}
	}
}

impl Drop for SessionMonitor {
	fn drop(&mut self) {
		if let Some(task) = self.task.take() {
			task.abort();
		}
	}
}

async fn run_monitor_loop(
	pipeline: Arc<Pipeline>,
	poll_interval: Duration,
	mut shutdown_rx: mpsc::Receiver<()>,
) {
	info!(
		poll_ms = poll_interval.as_millis() as u64,
		"session monitor started"
	);

	let mut ticker = tokio::time::interval(poll_interval);
	ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
	// The first interval tick completes immediately; skip it so polling
	// starts one full period after startup.
	ticker.tick().await;

	loop {
		tokio::select! {
			_ = ticker.tick() => observe_session(&pipeline),
			_ = shutdown_rx.recv() => {
				debug!("session monitor received shutdown signal");
				break;
			}
		}
	}
}
