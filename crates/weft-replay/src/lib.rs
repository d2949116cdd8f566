// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session replay SDK for Weft.
//!
//! This crate captures on-screen interaction through an external recorder
//! collaborator and ships it in bounded segments to the Weft ingest endpoint,
//! in lock-step with the analytics session that owns the recording.
//!
//! # Features
//!
//! - **Rotation-aware capture**: the analytics session identity is polled
//!   once a second; when the session id changes, the recorder is restarted
//!   and trailing events are flushed under the identity that produced them
//! - **Bounded segment uploads**: buffered events are swapped out every five
//!   seconds and uploaded as a multipart segment with a metadata envelope
//! - **Privacy masking**: `allow`, `mask-user-input`, and `mask` levels, with
//!   lowercase text masking and a CSS marker hook
//! - **Pluggable transport**: uploads are fire-and-forget by default; bolt on
//!   retry by swapping the transport
//! - **Telemetry facade**: business events share the tab id and replay flag
//!   with the capture stream
//!
//! # Example
//!
//! ```ignore
//! use weft_replay::ReplayClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ReplayClient::builder()
//!         .proxy("https://telemetry.example.com/forward")
//!         .client_token("tok_xxx")
//!         .privacy_level("mask-user-input")
//!         .session_cookie(cookie_value)
//!         .recorder(recorder)
//!         .session_source(analytics)
//!         .build()?;
//!
//!     client.start().await;
//!
//!     // ... application runs; capture and upload happen in the background.
//!
//!     client.shutdown().await;
//!     Ok(())
//! }
//! ```

mod analytics;
mod buffer;
mod client;
mod config;
mod context;
mod error;
mod monitor;
mod persist;
mod pipeline;
mod recorder;
mod scheduler;
#[cfg(test)]
mod testutil;
mod transport;

pub use analytics::{NoopTelemetrySink, SessionSource, TelemetrySink, UserIdentity};
pub use buffer::{BufferSnapshot, EventBuffer};
pub use client::{ReplayClient, ReplayClientBuilder};
pub use config::ReplayConfig;
pub use context::ViewStartTable;
pub use error::{ReplayError, Result};
pub use recorder::{EmitFn, NoopPageHost, PageHost, Recorder, RecorderHandle, RecorderOptions};
pub use transport::{HttpTransport, SegmentTransport};

// Re-export core types for convenience
pub use weft_replay_core::{
	mask_text, CapturedEvent, MaskingPolicy, PrivacyLevel, SegmentEnvelope, SegmentPayload,
	SessionIdentity, SessionState, TabId,
};
