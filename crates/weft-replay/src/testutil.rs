// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Mock collaborators shared by the pipeline and client tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use tokio::sync::Mutex;

use weft_replay_core::{CapturedEvent, SegmentEnvelope, SegmentPayload, SessionIdentity};

use crate::analytics::SessionSource;
use crate::error::{ReplayError, Result};
use crate::recorder::{EmitFn, Recorder, RecorderHandle, RecorderOptions};
use crate::transport::SegmentTransport;

pub(crate) fn event_at(ts: i64) -> CapturedEvent {
	CapturedEvent::new(serde_json::json!({"type": 3, "timestamp": ts}))
}

/// Lets detached upload tasks run to completion on the test runtime.
pub(crate) async fn drain_spawned_tasks() {
	for _ in 0..32 {
		tokio::task::yield_now().await;
	}
}

/// Transport that records every segment it is asked to deliver.
pub(crate) struct CapturingTransport {
	pub sent: Mutex<Vec<(SegmentEnvelope, SegmentPayload)>>,
}

impl CapturingTransport {
	pub(crate) fn new() -> Self {
		Self {
			sent: Mutex::new(Vec::new()),
		}
	}

	pub(crate) async fn sent_count(&self) -> usize {
		self.sent.lock().await.len()
	}
}

#[async_trait]
impl SegmentTransport for CapturingTransport {
	async fn send(&self, envelope: SegmentEnvelope, payload: SegmentPayload) -> Result<()> {
		self.sent.lock().await.push((envelope, payload));
		Ok(())
	}
}

/// Recorder that counts starts and stops and exposes the emit callback.
pub(crate) struct MockRecorder {
	pub starts: AtomicUsize,
	pub stops: Arc<AtomicUsize>,
	pub fail_stop: AtomicBool,
	emit: StdMutex<Option<EmitFn>>,
}

impl MockRecorder {
	pub(crate) fn new() -> Self {
		Self {
			starts: AtomicUsize::new(0),
			stops: Arc::new(AtomicUsize::new(0)),
			fail_stop: AtomicBool::new(false),
			emit: StdMutex::new(None),
		}
	}

	/// Emits one event through the most recently started recording.
	pub(crate) fn emit_event(&self, ts: i64) {
		let emit = self.emit.lock().unwrap();
		let emit = emit.as_ref().expect("recorder not started");
		emit(event_at(ts));
	}

	pub(crate) fn start_count(&self) -> usize {
		self.starts.load(Ordering::SeqCst)
	}

	pub(crate) fn stop_count(&self) -> usize {
		self.stops.load(Ordering::SeqCst)
	}
}

impl Recorder for MockRecorder {
	fn start(&self, _options: RecorderOptions, emit: EmitFn) -> Result<RecorderHandle> {
		self.starts.fetch_add(1, Ordering::SeqCst);
		*self.emit.lock().unwrap() = Some(emit);

		let stops = Arc::clone(&self.stops);
		let fail = self.fail_stop.load(Ordering::SeqCst);
		Ok(RecorderHandle::new(move || {
			stops.fetch_add(1, Ordering::SeqCst);
			if fail {
				Err(ReplayError::Recorder("stop failed".into()))
			} else {
				Ok(())
			}
		}))
	}
}

/// Session source whose reported identity tests can swap at will.
pub(crate) struct MockSessionSource {
	current: StdMutex<Option<SessionIdentity>>,
}

impl MockSessionSource {
	pub(crate) fn new() -> Self {
		Self {
			current: StdMutex::new(None),
		}
	}

	pub(crate) fn report(&self, identity: Option<SessionIdentity>) {
		*self.current.lock().unwrap() = identity;
	}
}

impl SessionSource for MockSessionSource {
	fn current_session(&self) -> Option<SessionIdentity> {
		self.current.lock().unwrap().clone()
	}
}
