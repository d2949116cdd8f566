// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Captured recorder events.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single event emitted by the recorder collaborator.
///
/// The payload is opaque to the replay pipeline; only the `timestamp` field
/// is read, when computing segment boundaries. Serializes as the raw recorder
/// event so the wire format carries exactly what the recorder produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapturedEvent(Value);

impl CapturedEvent {
	/// Wraps a raw recorder payload.
	pub fn new(payload: Value) -> Self {
		Self(payload)
	}

	/// Epoch-millisecond timestamp carried by the event.
	///
	/// Events without a numeric `timestamp` field report 0.
	pub fn timestamp(&self) -> i64 {
		self.0.get("timestamp").and_then(Value::as_i64).unwrap_or(0)
	}

	/// The raw recorder payload.
	pub fn payload(&self) -> &Value {
		&self.0
	}

	/// Consumes the event, returning the raw payload.
	pub fn into_payload(self) -> Value {
		self.0
	}
}

impl From<Value> for CapturedEvent {
	fn from(payload: Value) -> Self {
		Self(payload)
	}
}
