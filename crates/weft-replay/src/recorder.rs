// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Recorder collaborator interface.
//!
//! The DOM-observation algorithm is owned by an external recorder. The
//! pipeline starts it with masking options, collects the events it emits, and
//! stops it when the owning session rotates.

use std::sync::Arc;
use std::time::Duration;

use weft_replay_core::{CapturedEvent, MaskingPolicy};

use crate::error::Result;

/// Callback invoked once per captured event.
pub type EmitFn = Arc<dyn Fn(CapturedEvent) + Send + Sync>;

/// Options the recorder is started with.
#[derive(Debug, Clone)]
pub struct RecorderOptions {
	/// Masking applied to captured DOM content.
	pub masking: MaskingPolicy,
	/// Capture canvas contents.
	pub record_canvas: bool,
	/// Period between full snapshots in the event stream.
	pub checkpoint_interval: Duration,
}

/// Stop handle returned by a started recorder.
///
/// At most one handle is active at a time; starting a replacement implies the
/// previous handle has already been stopped.
pub struct RecorderHandle {
	stop: Option<Box<dyn FnOnce() -> Result<()> + Send>>,
}

impl RecorderHandle {
	/// Wraps the recorder's stop function.
	pub fn new(stop: impl FnOnce() -> Result<()> + Send + 'static) -> Self {
		Self {
			stop: Some(Box::new(stop)),
		}
	}

	/// Stops the recorder.
	///
	/// Callers swallow the error: a failing stop never aborts a session
	/// rotation.
	pub fn stop(mut self) -> Result<()> {
		match self.stop.take() {
			Some(stop) => stop(),
			None => Ok(()),
		}
	}
}

impl std::fmt::Debug for RecorderHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RecorderHandle")
			.field("stopped", &self.stop.is_none())
			.finish()
	}
}

/// Factory for recorder instances.
pub trait Recorder: Send + Sync {
	/// Starts a recording, delivering each captured event through `emit`.
	fn start(&self, options: RecorderOptions, emit: EmitFn) -> Result<RecorderHandle>;
}

/// Host page hook for global side effects such as the CSS masking marker.
pub trait PageHost: Send + Sync {
	/// Applies a marker class to the document root. May fail when the
	/// document is not available yet; the pipeline swallows failures.
	fn set_root_marker(&self, class: &str) -> Result<()>;
}

/// Host that ignores all page-level side effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPageHost;

impl PageHost for NoopPageHost {
	fn set_root_marker(&self, _class: &str) -> Result<()> {
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::ReplayError;
	use std::sync::atomic::{AtomicBool, Ordering};

	#[test]
	fn stop_invokes_the_stop_function() {
		let stopped = Arc::new(AtomicBool::new(false));
		let flag = Arc::clone(&stopped);
		let handle = RecorderHandle::new(move || {
			flag.store(true, Ordering::SeqCst);
			Ok(())
		});

		handle.stop().unwrap();
		assert!(stopped.load(Ordering::SeqCst));
	}

	#[test]
	fn stop_propagates_recorder_error() {
		let handle = RecorderHandle::new(|| Err(ReplayError::Recorder("observer gone".into())));
		assert!(matches!(handle.stop(), Err(ReplayError::Recorder(_))));
	}

	#[test]
	fn noop_page_host_accepts_marker() {
		assert!(NoopPageHost.set_root_marker("weft-masked").is_ok());
	}
}
