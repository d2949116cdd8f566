// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity of the analytics session that owns a replay.

use serde::{Deserialize, Serialize};

/// Identity triple reported by the analytics client.
///
/// The session id is the sole rotation key. Application and view ids are
/// informational: they are attached to outgoing segments but may change
/// within a session without triggering a rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
	pub application_id: Option<String>,
	pub session_id: String,
	pub view_id: Option<String>,
}

impl SessionIdentity {
	/// Creates an identity with only the session id set.
	pub fn new(session_id: impl Into<String>) -> Self {
		Self {
			application_id: None,
			session_id: session_id.into(),
			view_id: None,
		}
	}

	/// Sets the application id.
	pub fn with_application(mut self, application_id: impl Into<String>) -> Self {
		self.application_id = Some(application_id.into());
		self
	}

	/// Sets the view id.
	pub fn with_view(mut self, view_id: impl Into<String>) -> Self {
		self.view_id = Some(view_id.into());
		self
	}

	/// True when both identities belong to the same session.
	pub fn is_same_session(&self, other: &SessionIdentity) -> bool {
		self.session_id == other.session_id
	}
}
