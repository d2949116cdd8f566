// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tunables for the capture pipeline.

use std::time::Duration;

/// Configuration for the replay capture pipeline.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
	/// Interval between analytics-session identity polls.
	pub poll_interval: Duration,
	/// Interval between scheduled buffer flushes.
	pub flush_interval: Duration,
	/// How often the recorder emits a full checkpoint snapshot.
	pub checkpoint_interval: Duration,
	/// Capture canvas contents.
	pub record_canvas: bool,
	/// Maximum number of view start times retained for context enrichment.
	pub view_table_cap: usize,
}

impl Default for ReplayConfig {
	fn default() -> Self {
		Self {
			poll_interval: Duration::from_secs(1),
			flush_interval: Duration::from_secs(5),
			checkpoint_interval: Duration::from_secs(60),
			record_canvas: true,
			view_table_cap: 128,
		}
	}
}
