// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the replay core.

use thiserror::Error;

/// Result type alias for replay core operations.
pub type Result<T> = std::result::Result<T, ReplayCoreError>;

/// Errors that can occur when assembling replay wire types.
#[derive(Debug, Error)]
pub enum ReplayCoreError {
	/// A segment needs at least one captured event.
	#[error("segment requires at least one event")]
	EmptySegment,

	/// Invalid tab ID string.
	#[error("invalid tab ID: {0}")]
	InvalidTabId(#[from] uuid::Error),
}
