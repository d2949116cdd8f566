// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared pipeline state driven by the identity poller, the flush scheduler,
//! and the recorder emit callback.
//!
//! Each flush performs its snapshot-and-swap while holding the buffer lock,
//! so a rotation-triggered flush and a scheduled flush landing back-to-back
//! each read a fresh snapshot and no event is lost or double-counted.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, info, warn};

use weft_replay_core::{MaskingPolicy, SessionIdentity, TabId, MASKED_ROOT_CLASS};

use crate::analytics::SessionSource;
use crate::buffer::EventBuffer;
use crate::config::ReplayConfig;
use crate::context::ContextTracker;
use crate::persist::SegmentPersister;
use crate::recorder::{EmitFn, PageHost, Recorder, RecorderOptions};

/// Recovers the guard from a poisoned lock; the guarded state stays usable.
fn relock<'a, T>(
	result: Result<MutexGuard<'a, T>, PoisonError<MutexGuard<'a, T>>>,
) -> MutexGuard<'a, T> {
	result.unwrap_or_else(PoisonError::into_inner)
}

/// State shared by the pipeline's independently ticking callbacks.
pub(crate) struct Pipeline {
	config: ReplayConfig,
	tab_id: TabId,
	masking: MaskingPolicy,
	buffer: Mutex<EventBuffer>,
	context: Mutex<ContextTracker>,
	persister: SegmentPersister,
	recorder: Arc<dyn Recorder>,
	source: Arc<dyn SessionSource>,
	page_host: Arc<dyn PageHost>,
}

impl Pipeline {
	pub(crate) fn new(
		config: ReplayConfig,
		tab_id: TabId,
		masking: MaskingPolicy,
		persister: SegmentPersister,
		recorder: Arc<dyn Recorder>,
		source: Arc<dyn SessionSource>,
		page_host: Arc<dyn PageHost>,
	) -> Self {
		Self {
			config,
			tab_id,
			masking,
			buffer: Mutex::new(EventBuffer::new()),
			context: Mutex::new(ContextTracker::new()),
			persister,
			recorder,
			source,
			page_host,
		}
	}

	/// Uploads whatever is buffered under the current identity and advances
	/// the segment index. An empty buffer produces no upload and no index
	/// change.
	pub(crate) fn flush_now(&self) {
		let identity = relock(self.context.lock()).identity().cloned();

		let mut buffer = relock(self.buffer.lock());
		let snapshot = buffer.snapshot();
		if snapshot.events.is_empty() {
			return;
		}
		self.persister.dispatch(
			snapshot.events,
			snapshot.segment_index,
			identity.as_ref(),
			&self.tab_id,
		);
		buffer.clear_and_advance();
	}

	/// Stops the active recorder, if any. Used at shutdown.
	pub(crate) fn stop_recorder(&self) {
		if let Some(handle) = relock(self.context.lock()).take_recorder() {
			if let Err(e) = handle.stop() {
				debug!(error = %e, "recorder stop failed");
			}
		}
	}

	fn apply_masking_marker(&self) {
		if !self.masking.root_marker {
			return;
		}
		// The document may not be available yet; masking falls back to the
		// recorder options alone.
		if let Err(e) = self.page_host.set_root_marker(MASKED_ROOT_CLASS) {
			debug!(error = %e, "could not apply masking marker");
		}
	}

	fn recorder_options(&self) -> RecorderOptions {
		RecorderOptions {
			masking: self.masking,
			record_canvas: self.config.record_canvas,
			checkpoint_interval: self.config.checkpoint_interval,
		}
	}

	#[cfg(test)]
	pub(crate) fn current_identity(&self) -> Option<SessionIdentity> {
		relock(self.context.lock()).identity().cloned()
	}

	#[cfg(test)]
	pub(crate) fn buffered_len(&self) -> usize {
		relock(self.buffer.lock()).len()
	}

	#[cfg(test)]
	pub(crate) fn segment_index(&self) -> u64 {
		relock(self.buffer.lock()).segment_index()
	}
}

/// Emit callback handed to the recorder.
///
/// Holds a weak reference: the recorder collaborator may keep the callback
/// alive past the pipeline, and the stored handle must not form a cycle.
fn emit_fn(pipeline: &Arc<Pipeline>) -> EmitFn {
	let pipeline: Weak<Pipeline> = Arc::downgrade(pipeline);
	Arc::new(move |event| {
		if let Some(pipeline) = pipeline.upgrade() {
			relock(pipeline.buffer.lock()).append(event);
		}
	})
}

/// One identity-poll tick.
///
/// Polls the analytics session and rotates capture when the session id
/// changes. A reported session with the same id only refreshes the
/// informational fields; no session reported means no action.
pub(crate) fn observe_session(pipeline: &Arc<Pipeline>) {
	let Some(reported) = pipeline.source.current_session() else {
		return;
	};

	let mut ctx = relock(pipeline.context.lock());
	let previous = ctx.identity().cloned();

	if let Some(prev) = &previous {
		if prev.is_same_session(&reported) {
			// Application/view ids may legitimately change within a session.
			ctx.set_identity(reported);
			return;
		}
	}

	rotate(pipeline, &mut ctx, previous, reported);
}

/// Replaces the active recording when the owning session changes.
///
/// Trailing events buffered under the old session are flushed tagged with the
/// old identity before the buffer resets; the segment index is per-session.
fn rotate(
	pipeline: &Arc<Pipeline>,
	ctx: &mut ContextTracker,
	previous: Option<SessionIdentity>,
	next: SessionIdentity,
) {
	info!(
		previous_session = ?previous.as_ref().map(|p| p.session_id.as_str()),
		next_session = %next.session_id,
		"session rotated, restarting capture"
	);

	if let Some(handle) = ctx.take_recorder() {
		// A failing stop never aborts the rotation.
		if let Err(e) = handle.stop() {
			debug!(error = %e, "recorder stop failed during rotation");
		}
	}

	{
		let mut buffer = relock(pipeline.buffer.lock());
		let snapshot = buffer.snapshot();
		if !snapshot.events.is_empty() {
			pipeline.persister.dispatch(
				snapshot.events,
				snapshot.segment_index,
				previous.as_ref(),
				&pipeline.tab_id,
			);
			buffer.clear_and_advance();
		}
		buffer.reset();
	}

	start_recorder(pipeline, ctx);
	ctx.set_identity(next);
}

/// Starts a new recording with the configured masking policy.
pub(crate) fn start_recorder(pipeline: &Arc<Pipeline>, ctx: &mut ContextTracker) {
	pipeline.apply_masking_marker();

	match pipeline
		.recorder
		.start(pipeline.recorder_options(), emit_fn(pipeline))
	{
		Ok(handle) => ctx.set_recorder(handle),
		Err(e) => warn!(error = %e, "failed to start recorder"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testutil::{drain_spawned_tasks, CapturingTransport, MockRecorder, MockSessionSource};
	use std::sync::atomic::Ordering;

	struct Harness {
		pipeline: Arc<Pipeline>,
		recorder: Arc<MockRecorder>,
		source: Arc<MockSessionSource>,
		transport: Arc<CapturingTransport>,
	}

	fn harness() -> Harness {
		let recorder = Arc::new(MockRecorder::new());
		let source = Arc::new(MockSessionSource::new());
		let transport = Arc::new(CapturingTransport::new());

		let pipeline = Arc::new(Pipeline::new(
			ReplayConfig::default(),
			TabId::new(),
			MaskingPolicy::for_level(weft_replay_core::PrivacyLevel::MaskUserInput),
			SegmentPersister::new(Arc::clone(&transport) as Arc<dyn crate::transport::SegmentTransport>),
			Arc::clone(&recorder) as Arc<dyn crate::recorder::Recorder>,
			Arc::clone(&source) as Arc<dyn crate::analytics::SessionSource>,
			Arc::new(crate::recorder::NoopPageHost),
		));

		Harness {
			pipeline,
			recorder,
			source,
			transport,
		}
	}

	#[tokio::test]
	async fn no_session_means_no_action() {
		let h = harness();

		observe_session(&h.pipeline);

		assert_eq!(h.recorder.start_count(), 0);
		assert!(h.pipeline.current_identity().is_none());
	}

	#[tokio::test]
	async fn first_session_is_a_rotation() {
		let h = harness();
		h.source
			.report(Some(SessionIdentity::new("s1").with_view("v1")));

		observe_session(&h.pipeline);
		drain_spawned_tasks().await;

		assert_eq!(h.recorder.start_count(), 1);
		assert_eq!(h.recorder.stop_count(), 0);
		// Nothing was buffered, so nothing uploads.
		assert_eq!(h.transport.sent_count().await, 0);
		assert_eq!(
			h.pipeline.current_identity().unwrap().session_id,
			"s1".to_string()
		);
		assert_eq!(h.pipeline.segment_index(), 0);
	}

	#[tokio::test]
	async fn same_session_only_refreshes_informational_fields() {
		let h = harness();
		h.source
			.report(Some(SessionIdentity::new("s1").with_view("v1")));
		observe_session(&h.pipeline);

		h.recorder.emit_event(100);
		h.source
			.report(Some(SessionIdentity::new("s1").with_view("v2")));
		observe_session(&h.pipeline);
		drain_spawned_tasks().await;

		// No restart, no flush, no buffer reset.
		assert_eq!(h.recorder.start_count(), 1);
		assert_eq!(h.recorder.stop_count(), 0);
		assert_eq!(h.transport.sent_count().await, 0);
		assert_eq!(h.pipeline.buffered_len(), 1);
		let identity = h.pipeline.current_identity().unwrap();
		assert_eq!(identity.view_id.as_deref(), Some("v2"));
	}

	#[tokio::test]
	async fn scheduled_flush_uploads_in_append_order() {
		let h = harness();
		h.source.report(Some(
			SessionIdentity::new("s1").with_application("app1").with_view("v1"),
		));
		observe_session(&h.pipeline);

		h.recorder.emit_event(100);
		h.recorder.emit_event(200);
		h.recorder.emit_event(300);

		h.pipeline.flush_now();
		drain_spawned_tasks().await;

		let sent = h.transport.sent.lock().await;
		assert_eq!(sent.len(), 1);
		let (envelope, payload) = &sent[0];
		assert_eq!(envelope.session.id.as_deref(), Some("s1"));
		assert_eq!(envelope.application.id.as_deref(), Some("app1"));
		assert_eq!(envelope.index, 0);
		assert_eq!(envelope.start, 100);
		assert_eq!(envelope.end, 300);
		let timestamps: Vec<i64> = payload.events.iter().map(|e| e.timestamp()).collect();
		assert_eq!(timestamps, vec![100, 200, 300]);
		drop(sent);

		// Buffer is now empty and the index advanced.
		assert_eq!(h.pipeline.buffered_len(), 0);
		assert_eq!(h.pipeline.segment_index(), 1);
	}

	#[tokio::test]
	async fn empty_flush_is_a_noop() {
		let h = harness();
		h.source.report(Some(SessionIdentity::new("s1")));
		observe_session(&h.pipeline);

		h.pipeline.flush_now();
		drain_spawned_tasks().await;

		assert_eq!(h.transport.sent_count().await, 0);
		assert_eq!(h.pipeline.segment_index(), 0);
	}

	#[tokio::test]
	async fn segment_index_increments_per_nonempty_flush() {
		let h = harness();
		h.source.report(Some(SessionIdentity::new("s1")));
		observe_session(&h.pipeline);

		h.recorder.emit_event(1);
		h.pipeline.flush_now();
		h.recorder.emit_event(2);
		h.pipeline.flush_now();
		drain_spawned_tasks().await;

		let sent = h.transport.sent.lock().await;
		assert_eq!(sent.len(), 2);
		assert_eq!(sent[0].0.index, 0);
		assert_eq!(sent[1].0.index, 1);
	}

	#[tokio::test]
	async fn rotation_flushes_trailing_events_under_old_identity() {
		let h = harness();
		h.source
			.report(Some(SessionIdentity::new("s1").with_view("v1")));
		observe_session(&h.pipeline);

		h.recorder.emit_event(100);
		h.recorder.emit_event(200);

		h.source
			.report(Some(SessionIdentity::new("s2").with_view("v9")));
		observe_session(&h.pipeline);
		drain_spawned_tasks().await;

		// Exactly one stop and one (re)start beyond the initial one.
		assert_eq!(h.recorder.stop_count(), 1);
		assert_eq!(h.recorder.start_count(), 2);

		// Trailing events are attributed to the session that produced them.
		let sent = h.transport.sent.lock().await;
		assert_eq!(sent.len(), 1);
		let (envelope, _) = &sent[0];
		assert_eq!(envelope.session.id.as_deref(), Some("s1"));
		assert_eq!(envelope.view.id.as_deref(), Some("v1"));
		assert_eq!(envelope.index, 0);
		drop(sent);

		// Fresh per-session state for s2.
		assert_eq!(h.pipeline.buffered_len(), 0);
		assert_eq!(h.pipeline.segment_index(), 0);
		assert_eq!(h.pipeline.current_identity().unwrap().session_id, "s2");
	}

	#[tokio::test]
	async fn index_resets_to_zero_after_rotation() {
		let h = harness();
		h.source.report(Some(SessionIdentity::new("s1")));
		observe_session(&h.pipeline);

		h.recorder.emit_event(1);
		h.pipeline.flush_now();
		assert_eq!(h.pipeline.segment_index(), 1);

		h.source.report(Some(SessionIdentity::new("s2")));
		observe_session(&h.pipeline);

		h.recorder.emit_event(2);
		h.pipeline.flush_now();
		drain_spawned_tasks().await;

		let sent = h.transport.sent.lock().await;
		// Flush under s1 at index 0, then the first flush under s2 is index 0
		// again.
		assert_eq!(sent.len(), 2);
		assert_eq!(sent[0].0.session.id.as_deref(), Some("s1"));
		assert_eq!(sent[0].0.index, 0);
		assert_eq!(sent[1].0.session.id.as_deref(), Some("s2"));
		assert_eq!(sent[1].0.index, 0);
	}

	#[tokio::test]
	async fn failing_recorder_stop_does_not_abort_rotation() {
		let h = harness();
		h.source.report(Some(SessionIdentity::new("s1")));
		observe_session(&h.pipeline);

		h.recorder.fail_stop.store(true, Ordering::SeqCst);
		h.source.report(Some(SessionIdentity::new("s2")));
		observe_session(&h.pipeline);

		assert_eq!(h.recorder.stop_count(), 1);
		assert_eq!(h.recorder.start_count(), 2);
		assert_eq!(h.pipeline.current_identity().unwrap().session_id, "s2");
	}

	#[tokio::test]
	async fn rotation_without_buffered_events_skips_upload() {
		let h = harness();
		h.source.report(Some(SessionIdentity::new("s1")));
		observe_session(&h.pipeline);

		h.source.report(Some(SessionIdentity::new("s2")));
		observe_session(&h.pipeline);
		drain_spawned_tasks().await;

		assert_eq!(h.transport.sent_count().await, 0);
	}

	#[tokio::test]
	async fn stop_recorder_is_idempotent() {
		let h = harness();
		h.source.report(Some(SessionIdentity::new("s1")));
		observe_session(&h.pipeline);

		h.pipeline.stop_recorder();
		h.pipeline.stop_recorder();

		assert_eq!(h.recorder.stop_count(), 1);
	}

	#[tokio::test]
	async fn emit_after_pipeline_drop_is_ignored() {
		let h = harness();
		h.source.report(Some(SessionIdentity::new("s1")));
		observe_session(&h.pipeline);

		let Harness {
			pipeline, recorder, ..
		} = h;
		drop(pipeline);

		// The recorder still holds the emit callback; emitting must not panic.
		recorder.emit_event(1);
	}
}
