// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Example: capture a short replay session using the weft-replay SDK.
//!
//! Run with:
//!   WEFT_INGEST_URL=http://localhost:8080/replay cargo run --example replay -p weft-replay

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use weft_replay::{
	CapturedEvent, EmitFn, Recorder, RecorderHandle, RecorderOptions, ReplayClient,
	SessionIdentity, SessionSource,
};

/// Recorder that synthesizes one event every 250ms until stopped.
struct DemoRecorder;

impl Recorder for DemoRecorder {
	fn start(&self, options: RecorderOptions, emit: EmitFn) -> weft_replay::Result<RecorderHandle> {
		println!(
			"recorder started (mask inputs: {}, canvas: {})",
			options.masking.mask_all_inputs, options.record_canvas
		);

		let running = Arc::new(AtomicBool::new(true));
		let flag = Arc::clone(&running);
		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(Duration::from_millis(250));
			while flag.load(Ordering::SeqCst) {
				ticker.tick().await;
				let now = chrono::Utc::now().timestamp_millis();
				emit(CapturedEvent::new(json!({
					"type": 3,
					"timestamp": now,
					"data": {"source": "demo"},
				})));
			}
		});

		Ok(RecorderHandle::new(move || {
			running.store(false, Ordering::SeqCst);
			println!("recorder stopped");
			Ok(())
		}))
	}
}

/// Analytics stand-in reporting a session that rotates once.
struct DemoAnalytics {
	session_id: Mutex<String>,
}

impl DemoAnalytics {
	fn rotate(&self, next: &str) {
		*self.session_id.lock().unwrap() = next.to_string();
	}
}

impl SessionSource for DemoAnalytics {
	fn current_session(&self) -> Option<SessionIdentity> {
		Some(
			SessionIdentity::new(self.session_id.lock().unwrap().clone())
				.with_application("demo-app")
				.with_view("demo-view"),
		)
	}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| "info".into()),
		)
		.init();

	let ingest_url =
		std::env::var("WEFT_INGEST_URL").unwrap_or_else(|_| "http://localhost:8080/replay".into());

	println!("Initializing replay client...");
	println!("  Ingest URL: {}", ingest_url);

	let analytics = Arc::new(DemoAnalytics {
		session_id: Mutex::new("demo-session-1".to_string()),
	});

	let client = ReplayClient::builder()
		.ingest_url(&ingest_url)
		.privacy_level("mask-user-input")
		.session_cookie("rum=1&created=1700000000000")
		.recorder(Arc::new(DemoRecorder))
		.session_source(Arc::clone(&analytics) as Arc<dyn SessionSource>)
		.build()?;

	client.start().await;
	println!("Capturing (tab id {})...", client.tab_id());

	// Let a couple of flush periods elapse under the first session.
	tokio::time::sleep(Duration::from_secs(11)).await;

	println!("Rotating session...");
	analytics.rotate("demo-session-2");
	tokio::time::sleep(Duration::from_secs(6)).await;

	client.shutdown().await;
	println!("Client shutdown complete.");

	Ok(())
}
