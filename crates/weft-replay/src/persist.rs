// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Converts buffered events into wire segments and dispatches uploads.

use std::sync::Arc;

use tracing::{debug, warn};
use weft_replay_core::{CapturedEvent, SegmentEnvelope, SegmentPayload, SessionIdentity, TabId};

use crate::transport::SegmentTransport;

/// Builds segment envelopes and hands them to the transport.
///
/// Dispatch is fire-and-forget: the upload runs in a detached task, is never
/// awaited or retried, and its outcome is not fed back into the pipeline.
/// Best-effort delivery is the accepted trade-off for this stream.
pub(crate) struct SegmentPersister {
	transport: Arc<dyn SegmentTransport>,
}

impl SegmentPersister {
	pub(crate) fn new(transport: Arc<dyn SegmentTransport>) -> Self {
		Self { transport }
	}

	/// Dispatches one non-empty run of events tagged with the given identity.
	///
	/// Takes ownership of the snapshot; by the time this returns the buffer no
	/// longer owns the events being uploaded.
	pub(crate) fn dispatch(
		&self,
		events: Vec<CapturedEvent>,
		segment_index: u64,
		identity: Option<&SessionIdentity>,
		tab_id: &TabId,
	) {
		let envelope = match SegmentEnvelope::new(&events, segment_index, identity, tab_id) {
			Ok(envelope) => envelope,
			Err(e) => {
				// Callers check for emptiness before dispatching.
				debug!(error = %e, "skipping dispatch of empty segment");
				return;
			}
		};

		debug!(
			session_id = ?envelope.session.id,
			index = envelope.index,
			events = events.len(),
			"dispatching segment"
		);

		let payload = SegmentPayload { events };
		let transport = Arc::clone(&self.transport);
		tokio::spawn(async move {
			let session_id = envelope.session.id.clone();
			let index = envelope.index;
			if let Err(e) = transport.send(envelope, payload).await {
				// Failed uploads lose their segment; nothing is retried.
				warn!(error = %e, session_id = ?session_id, index, "segment upload failed");
			}
		});
	}
}
