// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Analytics client collaborator interfaces.
//!
//! The pipeline reads the identity of the owning analytics session through a
//! [`SessionSource`] and forwards business telemetry through a
//! [`TelemetrySink`]. Both are implemented by the embedding application's
//! analytics client; the SDK never owns session lifecycle itself.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use weft_replay_core::SessionIdentity;

use crate::error::Result;

/// Read access to the identity of the currently active analytics session.
///
/// Polled on a fixed interval; implementations should be cheap and
/// non-blocking.
pub trait SessionSource: Send + Sync {
	/// Identity of the active session, or `None` when the analytics client
	/// has not started one yet.
	fn current_session(&self) -> Option<SessionIdentity>;
}

/// User identity reported through the telemetry sink.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
	pub id: Option<String>,
	pub email: Option<String>,
	pub name: Option<String>,
}

/// Write access for business telemetry events.
///
/// Implementations should be fast and non-blocking; the client swallows and
/// logs failures so telemetry can never break the host application.
pub trait TelemetrySink: Send + Sync {
	/// Reports a user action.
	fn add_action(&self, name: &str, context: Value) -> Result<()>;

	/// Reports a handled error.
	fn add_error(&self, message: &str, context: Value) -> Result<()>;

	/// Reports a custom timing.
	fn add_timing(&self, name: &str, duration_ms: i64, context: Value) -> Result<()>;

	/// Associates the current session with a user.
	fn set_user(&self, user: UserIdentity) -> Result<()>;
}

/// Sink that discards all telemetry. Used when no analytics client is wired.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetrySink;

impl TelemetrySink for NoopTelemetrySink {
	fn add_action(&self, _name: &str, _context: Value) -> Result<()> {
		Ok(())
	}

	fn add_error(&self, _message: &str, _context: Value) -> Result<()> {
		Ok(())
	}

	fn add_timing(&self, _name: &str, _duration_ms: i64, _context: Value) -> Result<()> {
		Ok(())
	}

	fn set_user(&self, _user: UserIdentity) -> Result<()> {
		Ok(())
	}
}
