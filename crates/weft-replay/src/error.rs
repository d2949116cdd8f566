// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the replay SDK.

use thiserror::Error;
use weft_common_http::RetryableError;

/// Result type alias for replay operations.
pub type Result<T> = std::result::Result<T, ReplayError>;

/// Replay SDK errors.
#[derive(Debug, Error)]
pub enum ReplayError {
	/// A recorder collaborator is required to build the client.
	#[error("a recorder collaborator is required")]
	MissingRecorder,

	/// A session source collaborator is required to build the client.
	#[error("a session source collaborator is required")]
	MissingSessionSource,

	/// The ingest URL could not be parsed.
	#[error("invalid ingest URL: {0}")]
	InvalidIngestUrl(String),

	/// HTTP request failed.
	#[error("HTTP request failed: {0}")]
	RequestFailed(#[from] reqwest::Error),

	/// Server returned an error response.
	#[error("server error ({status}): {message}")]
	ServerError { status: u16, message: String },

	/// Rate limited by the server.
	#[error("rate limited, retry after {retry_after_secs:?} seconds")]
	RateLimited { retry_after_secs: Option<u64> },

	/// Client has been shut down.
	#[error("client has been shut down")]
	ClientShutdown,

	/// The recorder collaborator failed.
	#[error("recorder error: {0}")]
	Recorder(String),

	/// The telemetry sink collaborator rejected an event.
	#[error("telemetry sink error: {0}")]
	Telemetry(String),

	/// Serialization error.
	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

impl RetryableError for ReplayError {
	fn is_retryable(&self) -> bool {
		match self {
			ReplayError::RequestFailed(e) => e.is_retryable(),
			ReplayError::ServerError { status, .. } => {
				matches!(*status, 429 | 408 | 500 | 502 | 503 | 504)
			}
			ReplayError::RateLimited { .. } => true,
			_ => false,
		}
	}
}
