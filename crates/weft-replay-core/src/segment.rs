// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wire format for uploaded replay segments.

use serde::{Deserialize, Serialize};

use crate::error::{ReplayCoreError, Result};
use crate::event::CapturedEvent;
use crate::identity::SessionIdentity;
use crate::tab::TabId;

/// Nested `{id}` object used throughout the envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdField {
	pub id: Option<String>,
}

impl From<Option<String>> for IdField {
	fn from(id: Option<String>) -> Self {
		Self { id }
	}
}

/// Metadata record describing one uploaded segment.
///
/// `start` and `end` are the timestamps of the first and last events in the
/// segment; events are taken in append order and never sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentEnvelope {
	pub application: IdField,
	pub session: IdField,
	pub index: u64,
	pub start: i64,
	pub end: i64,
	pub tab: IdField,
	pub view: IdField,
}

impl SegmentEnvelope {
	/// Builds the envelope for a non-empty run of events.
	pub fn new(
		events: &[CapturedEvent],
		index: u64,
		identity: Option<&SessionIdentity>,
		tab_id: &TabId,
	) -> Result<Self> {
		let (start, end) = span_of(events)?;
		Ok(Self {
			application: identity.and_then(|i| i.application_id.clone()).into(),
			session: identity.map(|i| i.session_id.clone()).into(),
			index,
			start,
			end,
			tab: Some(tab_id.to_string()).into(),
			view: identity.and_then(|i| i.view_id.clone()).into(),
		})
	}
}

/// First and last timestamps of a non-empty event run.
pub fn span_of(events: &[CapturedEvent]) -> Result<(i64, i64)> {
	let first = events.first().ok_or(ReplayCoreError::EmptySegment)?;
	let last = events.last().ok_or(ReplayCoreError::EmptySegment)?;
	Ok((first.timestamp(), last.timestamp()))
}

/// Payload part carrying the raw recorder events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentPayload {
	#[serde(rename = "rrwebEvents")]
	pub events: Vec<CapturedEvent>,
}
