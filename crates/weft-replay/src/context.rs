// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session context tracking and view start times.

use std::collections::{HashMap, VecDeque};

use weft_replay_core::SessionIdentity;

use crate::recorder::RecorderHandle;

/// Last-observed session identity and the active recorder handle.
///
/// Plain last-write-wins storage; callers serialize access through the
/// pipeline lock.
#[derive(Debug, Default)]
pub struct ContextTracker {
	identity: Option<SessionIdentity>,
	recorder: Option<RecorderHandle>,
}

impl ContextTracker {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn identity(&self) -> Option<&SessionIdentity> {
		self.identity.as_ref()
	}

	pub fn set_identity(&mut self, identity: SessionIdentity) {
		self.identity = Some(identity);
	}

	pub fn has_recorder(&self) -> bool {
		self.recorder.is_some()
	}

	pub fn set_recorder(&mut self, handle: RecorderHandle) {
		self.recorder = Some(handle);
	}

	/// Removes and returns the active recorder handle, if any.
	pub fn take_recorder(&mut self) -> Option<RecorderHandle> {
		self.recorder.take()
	}
}

/// First-seen start time per view id.
///
/// Bounded: once the cap is reached the oldest view falls out, so the table
/// cannot grow without limit over a long-lived session.
#[derive(Debug)]
pub struct ViewStartTable {
	cap: usize,
	order: VecDeque<String>,
	starts: HashMap<String, i64>,
}

impl ViewStartTable {
	pub fn new(cap: usize) -> Self {
		Self {
			cap: cap.max(1),
			order: VecDeque::new(),
			starts: HashMap::new(),
		}
	}

	/// Records the first time a view id is seen and returns its start time.
	///
	/// Subsequent observations of the same view keep the original start.
	pub fn observe(&mut self, view_id: &str, now_ms: i64) -> i64 {
		if let Some(&start) = self.starts.get(view_id) {
			return start;
		}

		self.starts.insert(view_id.to_string(), now_ms);
		self.order.push_back(view_id.to_string());

		while self.order.len() > self.cap {
			if let Some(evicted) = self.order.pop_front() {
				self.starts.remove(&evicted);
			}
		}
		now_ms
	}

	pub fn get(&self, view_id: &str) -> Option<i64> {
		self.starts.get(view_id).copied()
	}

	pub fn len(&self) -> usize {
		self.starts.len()
	}

	pub fn is_empty(&self) -> bool {
		self.starts.is_empty()
	}
}
