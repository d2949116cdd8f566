// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Append-only event buffer with a per-session segment index.

use weft_replay_core::CapturedEvent;

/// Immutable copy of the buffer contents at a point in time.
#[derive(Debug, Clone)]
pub struct BufferSnapshot {
	pub events: Vec<CapturedEvent>,
	pub segment_index: u64,
}

/// Ordered run of captured events awaiting upload.
///
/// The segment index only advances after a non-empty snapshot has been handed
/// off for persistence; an empty buffer never produces an upload or an index
/// change. On session rotation the index rewinds to zero: segments are
/// numbered per session, not globally.
#[derive(Debug, Default)]
pub struct EventBuffer {
	events: Vec<CapturedEvent>,
	segment_index: u64,
}

impl EventBuffer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends one event to the ordered tail.
	pub fn append(&mut self, event: CapturedEvent) {
		self.events.push(event);
	}

	/// Copies the current contents and index without mutating state, so a
	/// flush can read-then-clear without losing events appended in between.
	pub fn snapshot(&self) -> BufferSnapshot {
		BufferSnapshot {
			events: self.events.clone(),
			segment_index: self.segment_index,
		}
	}

	/// Empties the buffer and advances the segment index.
	///
	/// Callers must only do this after a non-empty snapshot has been
	/// irrevocably handed off for persistence.
	pub fn clear_and_advance(&mut self) {
		self.events.clear();
		self.segment_index += 1;
	}

	/// Empties the buffer and rewinds the index to zero. Used on session
	/// rotation.
	pub fn reset(&mut self) {
		self.events.clear();
		self.segment_index = 0;
	}

	pub fn len(&self) -> usize {
		self.events.len()
	}

	pub fn is_empty(&self) -> bool {
		self.events.is_empty()
	}

	pub fn segment_index(&self) -> u64 {
		self.segment_index
	}
}
