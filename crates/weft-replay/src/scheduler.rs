// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Periodic flush scheduling.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::pipeline::Pipeline;

/// Requests a buffer flush on a fixed period.
///
/// The flush itself runs in a spawned task that yields once before swapping
/// the buffer, so serialization and upload work never block the timer tick
/// and coalesce with whatever other work is already pending.
pub(crate) struct FlushScheduler {
	task: Option<JoinHandle<()>>,
	shutdown_tx: Option<mpsc::Sender<()>>,
}

impl FlushScheduler {
	pub(crate) fn new() -> Self {
		Self {
			task: None,
			shutdown_tx: None,
		}
	}

	/// Starts the flush loop, replacing any previous one.
	pub(crate) fn start(&mut self, pipeline: Arc<Pipeline>, flush_interval: Duration) {
		self.abort();
		let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
		self.shutdown_tx = Some(shutdown_tx);
		self.task = Some(tokio::spawn(run_flush_loop(
			pipeline,
			flush_interval,
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

impl Drop for FlushScheduler {
	fn drop(&mut self) {
		if let Some(task) = self.task.take() {
			task.abort();
		}
	}
}

async fn run_flush_loop(
	pipeline: Arc<Pipeline>,
	flush_interval: Duration,
	mut shutdown_rx: mpsc::Receiver<()>,
) {
	info!(
		flush_ms = flush_interval.as_millis() as u64,
		"flush scheduler started"
	);

	let mut ticker = tokio::time::interval(flush_interval);
	ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
	// The first interval tick completes immediately; skip it so the first
	// flush happens one full period after startup.
	ticker.tick().await;

	loop {
		tokio::select! {
			_ = ticker.tick() => {
				tokio::spawn(flush_deferred(Arc::clone(&pipeline)));
			}
			_ = shutdown_rx.recv() => {
				debug!("flush scheduler received shutdown signal");
				break;
			}
		}
	}
}

/// Runs one flush at the next yield point rather than inside the timer tick.
async fn flush_deferred(pipeline: Arc<Pipeline>) {
	tokio::task::yield_now().await;
	pipeline.flush_now();
}
