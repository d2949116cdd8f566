// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session cookie state.
//!
//! The analytics session cookie holds `&`-separated `key=value` entries with
//! values restricted to `[a-z0-9-]+`. The `rum` entry gates whether replay is
//! sampled in, and the `created` entry carries the session start time in
//! epoch milliseconds. Malformed input parses to an empty state, which means
//! not sampled.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

const ENTRY_SEPARATOR: char = '&';

/// Cookie key gating replay sampling.
const SAMPLE_FLAG_KEY: &str = "rum";
/// Cookie key carrying the session start time.
const CREATED_KEY: &str = "created";
/// Cookie key the anonymous id is stored under.
const ANONYMOUS_ID_KEY: &str = "aid";

fn entry_regex() -> &'static Regex {
	static ENTRY: OnceLock<Regex> = OnceLock::new();
	ENTRY.get_or_init(|| Regex::new(r"^([a-zA-Z]+)=([a-z0-9-]+)$").expect("valid entry pattern"))
}

/// Parsed session cookie entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
	entries: HashMap<String, String>,
	anonymous_id: Option<String>,
}

impl SessionState {
	/// Parses a raw cookie value. Malformed input yields an empty state.
	pub fn parse(raw: &str) -> Self {
		if !is_valid_session_string(raw) {
			return Self::default();
		}

		let mut state = Self::default();
		for entry in raw.split(ENTRY_SEPARATOR) {
			if let Some(caps) = entry_regex().captures(entry) {
				let key = &caps[1];
				let value = &caps[2];
				if key == ANONYMOUS_ID_KEY {
					state.anonymous_id = Some(value.to_string());
				} else {
					state.entries.insert(key.to_string(), value.to_string());
				}
			}
		}
		state
	}

	/// Looks up a raw entry by key.
	pub fn get(&self, key: &str) -> Option<&str> {
		self.entries.get(key).map(String::as_str)
	}

	/// The anonymous id, when present.
	pub fn anonymous_id(&self) -> Option<&str> {
		self.anonymous_id.as_deref()
	}

	/// True when the sampling flag admits replay recording.
	pub fn is_sampled_in(&self) -> bool {
		self.get(SAMPLE_FLAG_KEY)
			.and_then(|v| v.parse::<u32>().ok())
			.map(|v| v > 0)
			.unwrap_or(false)
	}

	/// Session start time in epoch milliseconds, from the `created` entry.
	pub fn created_ms(&self) -> Option<i64> {
		self.get(CREATED_KEY)?.parse().ok()
	}

	/// True when no entries were parsed.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty() && self.anonymous_id.is_none()
	}
}

fn is_valid_session_string(raw: &str) -> bool {
	!raw.is_empty() && (raw.contains(ENTRY_SEPARATOR) || entry_regex().is_match(raw))
}
