// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Replay client: configuration, the sampling gate, and the telemetry facade.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use weft_replay_core::{MaskingPolicy, PrivacyLevel, SessionState, TabId};

use crate::analytics::{NoopTelemetrySink, SessionSource, TelemetrySink, UserIdentity};
use crate::config::ReplayConfig;
use crate::context::ViewStartTable;
use crate::error::{ReplayError, Result};
use crate::monitor::SessionMonitor;
use crate::persist::SegmentPersister;
use crate::pipeline::Pipeline;
use crate::recorder::{NoopPageHost, PageHost, Recorder};
use crate::scheduler::FlushScheduler;
use crate::transport::{HttpTransport, SegmentTransport};

/// Path the replay ingest endpoint lives under on the proxy origin.
const INGEST_PATH: &str = "/replay";

/// Context key carrying the tab correlation id.
const CTX_TAB_ID: &str = "replay_tab_id";
/// Context key flagging that replay capture is active.
const CTX_REPLAY_ACTIVE: &str = "replay_active";
/// Context key carrying the session start time.
const CTX_SESSION_START: &str = "session_start_ms";
/// Context key carrying the current view's start time.
const CTX_VIEW_START: &str = "view_start_ms";

/// Builder for constructing a [`ReplayClient`].
pub struct ReplayClientBuilder {
	ingest_url: Option<String>,
	proxy: Option<String>,
	client_token: Option<String>,
	privacy_level: Option<String>,
	session_cookie: Option<String>,
	enable_session_recording: bool,
	recorder: Option<Arc<dyn Recorder>>,
	source: Option<Arc<dyn SessionSource>>,
	telemetry: Option<Arc<dyn TelemetrySink>>,
	page_host: Option<Arc<dyn PageHost>>,
	transport: Option<Arc<dyn SegmentTransport>>,
	config: ReplayConfig,
}

impl ReplayClientBuilder {
	/// Creates a new builder with default settings.
	pub fn new() -> Self {
		Self {
			ingest_url: None,
			proxy: None,
			client_token: None,
			privacy_level: None,
			session_cookie: None,
			enable_session_recording: true,
			recorder: None,
			source: None,
			telemetry: None,
			page_host: None,
			transport: None,
			config: ReplayConfig::default(),
		}
	}

	/// Sets the replay ingest URL explicitly.
	///
	/// Takes precedence over the URL derived from the proxy setting.
	pub fn ingest_url(mut self, url: impl Into<String>) -> Self {
		self.ingest_url = Some(url.into());
		self
	}

	/// Sets the analytics proxy the ingest URL is derived from.
	pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
		self.proxy = Some(proxy.into());
		self
	}

	/// Sets the client token sent as an API-key query parameter on uploads.
	pub fn client_token(mut self, token: impl Into<String>) -> Self {
		self.client_token = Some(token.into());
		self
	}

	/// Sets the privacy level tag (`allow`, `mask-user-input`, or `mask`).
	///
	/// Unrecognized or absent tags fall back to `mask-user-input`.
	pub fn privacy_level(mut self, tag: impl Into<String>) -> Self {
		self.privacy_level = Some(tag.into());
		self
	}

	/// Sets the raw analytics session cookie used for the sampling gate and
	/// the session start time.
	pub fn session_cookie(mut self, cookie: impl Into<String>) -> Self {
		self.session_cookie = Some(cookie.into());
		self
	}

	/// Enables or disables session recording. Default: enabled; sampling and
	/// ingest configuration still apply.
	pub fn enable_session_recording(mut self, enabled: bool) -> Self {
		self.enable_session_recording = enabled;
		self
	}

	/// Sets the recorder collaborator that owns DOM observation.
	pub fn recorder(mut self, recorder: Arc<dyn Recorder>) -> Self {
		self.recorder = Some(recorder);
		self
	}

	/// Sets the analytics client collaborator the session identity is polled
	/// from.
	pub fn session_source(mut self, source: Arc<dyn SessionSource>) -> Self {
		self.source = Some(source);
		self
	}

	/// Sets the sink business telemetry is forwarded to.
	pub fn telemetry_sink(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
		self.telemetry = Some(sink);
		self
	}

	/// Sets the host page hook used for CSS-level masking.
	pub fn page_host(mut self, host: Arc<dyn PageHost>) -> Self {
		self.page_host = Some(host);
		self
	}

	/// Replaces the default HTTP transport, e.g. with one that retries.
	pub fn transport(mut self, transport: Arc<dyn SegmentTransport>) -> Self {
		self.transport = Some(transport);
		self
	}

	/// Sets the identity poll interval.
	pub fn poll_interval(mut self, interval: Duration) -> Self {
		self.config.poll_interval = interval;
		self
	}

	/// Sets the scheduled flush interval.
	pub fn flush_interval(mut self, interval: Duration) -> Self {
		self.config.flush_interval = interval;
		self
	}

	/// Replaces the whole pipeline configuration.
	pub fn config(mut self, config: ReplayConfig) -> Self {
		self.config = config;
		self
	}

	/// Builds the client.
	///
	/// When recording is disabled, the session is sampled out, or no usable
	/// ingest destination is configured, the capture pipeline never starts;
	/// the client still serves the telemetry facade. That is a no-op path,
	/// not an error.
	pub fn build(self) -> Result<ReplayClient> {
		let recorder = self.recorder.ok_or(ReplayError::MissingRecorder)?;
		let source = self.source.ok_or(ReplayError::MissingSessionSource)?;
		let telemetry = self
			.telemetry
			.unwrap_or_else(|| Arc::new(NoopTelemetrySink));
		let page_host = self.page_host.unwrap_or_else(|| Arc::new(NoopPageHost));

		let tab_id = TabId::new();
		let session_state = SessionState::parse(self.session_cookie.as_deref().unwrap_or(""));
		let privacy = self
			.privacy_level
			.as_deref()
			.map(PrivacyLevel::from_tag)
			.unwrap_or_default();
		let masking = MaskingPolicy::for_level(privacy);

		let ingest_url = self
			.ingest_url
			.or_else(|| resolve_ingest_url(self.proxy.as_deref()));

		let transport: Option<Arc<dyn SegmentTransport>> = match (self.transport, &ingest_url) {
			(Some(custom), _) => Some(custom),
			(None, Some(url)) => match HttpTransport::new(url, self.client_token.clone()) {
				Ok(transport) => Some(Arc::new(transport)),
				Err(e) => {
					warn!(error = %e, "replay ingest URL unusable, capture disabled");
					None
				}
			},
			(None, None) => None,
		};

		let sampled_in = session_state.is_sampled_in();
		let pipeline = if self.enable_session_recording && sampled_in {
			transport.map(|transport| {
				Arc::new(Pipeline::new(
					self.config.clone(),
					tab_id,
					masking,
					SegmentPersister::new(transport),
					recorder,
					Arc::clone(&source),
					page_host,
				))
			})
		} else {
			None
		};

		if pipeline.is_none() {
			debug!(
				recording_enabled = self.enable_session_recording,
				sampled_in, "replay capture will not start"
			);
		}

		Ok(ReplayClient {
			inner: Arc::new(ClientInner {
				tab_id,
				session_start_ms: session_state.created_ms(),
				pipeline,
				monitor: Mutex::new(SessionMonitor::new()),
				scheduler: Mutex::new(FlushScheduler::new()),
				source,
				telemetry,
				view_starts: StdMutex::new(ViewStartTable::new(self.config.view_table_cap)),
				replay_active: AtomicBool::new(false),
				closed: AtomicBool::new(false),
				config: self.config,
			}),
		})
	}
}

impl Default for ReplayClientBuilder {
	fn default() -> Self {
		Self::new()
	}
}

struct ClientInner {
	tab_id: TabId,
	session_start_ms: Option<i64>,
	pipeline: Option<Arc<Pipeline>>,
	monitor: Mutex<SessionMonitor>,
	scheduler: Mutex<FlushScheduler>,
	source: Arc<dyn SessionSource>,
	telemetry: Arc<dyn TelemetrySink>,
	view_starts: StdMutex<ViewStartTable>,
	replay_active: AtomicBool,
	closed: AtomicBool,
	config: ReplayConfig,
}

/// Client owning the replay capture pipeline and the telemetry facade.
///
/// # Example
///
/// ```ignore
/// use weft_replay::ReplayClient;
///
/// let client = ReplayClient::builder()
///     .proxy("https://telemetry.example.com/forward")
///     .session_cookie(cookie)
///     .recorder(recorder)
///     .session_source(analytics)
///     .build()?;
///
/// client.start().await;
///
/// // Business telemetry shares the tab id with the replay stream.
/// client.add_action("checkout", serde_json::json!({"cart_size": 3}));
///
/// client.shutdown().await;
/// ```
#[derive(Clone)]
pub struct ReplayClient {
	inner: Arc<ClientInner>,
}

impl ReplayClient {
	/// Creates a new builder for constructing a client.
	pub fn builder() -> ReplayClientBuilder {
		ReplayClientBuilder::new()
	}

	/// Starts the identity poll and flush timers.
	///
	/// No-op when capture is disabled by configuration or sampling.
	pub async fn start(&self) {
		if self.inner.closed.load(Ordering::SeqCst) {
			return;
		}
		let Some(pipeline) = &self.inner.pipeline else {
			return;
		};

		self.inner
			.monitor
			.lock()
			.await
			.start(Arc::clone(pipeline), self.inner.config.poll_interval);
		self.inner
			.scheduler
			.lock()
			.await
			.start(Arc::clone(pipeline), self.inner.config.flush_interval);
		self.inner.replay_active.store(true, Ordering::SeqCst);

		info!(tab_id = %self.inner.tab_id, "replay capture started");
	}

	/// The tab correlation id attached to all outgoing telemetry.
	pub fn tab_id(&self) -> TabId {
		self.inner.tab_id
	}

	/// True once the capture pipeline has been started.
	pub fn is_recording(&self) -> bool {
		self.inner.replay_active.load(Ordering::SeqCst)
	}

	/// Stops the timers, stops the recorder, and flushes buffered events.
	pub async fn shutdown(&self) {
		if self.inner.closed.swap(true, Ordering::SeqCst) {
			return;
		}

		self.inner.monitor.lock().await.stop().await;
		self.inner.scheduler.lock().await.stop().await;

		if let Some(pipeline) = &self.inner.pipeline {
			pipeline.stop_recorder();
			pipeline.flush_now();
		}
		self.inner.replay_active.store(false, Ordering::SeqCst);

		info!("replay client shut down");
	}

	/// Reports a user action with replay correlation context attached.
	pub fn add_action(&self, name: &str, context: Value) {
		if self.inner.closed.load(Ordering::SeqCst) {
			return;
		}
		let context = self.enrich(context);
		if let Err(e) = self.inner.telemetry.add_action(name, context) {
			warn!(error = %e, action = name, "failed to report action");
		}
	}

	/// Reports a handled error with replay correlation context attached.
	pub fn add_error(&self, message: &str, context: Value) {
		if self.inner.closed.load(Ordering::SeqCst) {
			return;
		}
		let context = self.enrich(context);
		if let Err(e) = self.inner.telemetry.add_error(message, context) {
			warn!(error = %e, "failed to report error");
		}
	}

	/// Reports a custom timing with replay correlation context attached.
	pub fn add_timing(&self, name: &str, duration_ms: i64, context: Value) {
		if self.inner.closed.load(Ordering::SeqCst) {
			return;
		}
		let context = self.enrich(context);
		if let Err(e) = self.inner.telemetry.add_timing(name, duration_ms, context) {
			warn!(error = %e, timing = name, "failed to report timing");
		}
	}

	/// Associates the current session with a user.
	pub fn set_user(&self, user: UserIdentity) {
		if self.inner.closed.load(Ordering::SeqCst) {
			return;
		}
		if let Err(e) = self.inner.telemetry.set_user(user) {
			warn!(error = %e, "failed to set user");
		}
	}

	/// Attaches the tab id, replay flag, and session/view start times to a
	/// telemetry context.
	fn enrich(&self, context: Value) -> Value {
		let mut map = match context {
			Value::Object(map) => map,
			_ => Map::new(),
		};

		map.insert(
			CTX_TAB_ID.to_string(),
			Value::String(self.inner.tab_id.to_string()),
		);
		if self.inner.replay_active.load(Ordering::SeqCst) {
			map.insert(CTX_REPLAY_ACTIVE.to_string(), Value::Bool(true));
		}
		if let Some(start) = self.inner.session_start_ms {
			map.insert(CTX_SESSION_START.to_string(), Value::from(start));
		}
		if let Some(view_id) = self
			.inner
			.source
			.current_session()
			.and_then(|identity| identity.view_id)
		{
			let now_ms = Utc::now().timestamp_millis();
			let start = self
				.inner
				.view_starts
				.lock()
				.unwrap_or_else(PoisonError::into_inner)
				.observe(&view_id, now_ms);
			map.insert(CTX_VIEW_START.to_string(), Value::from(start));
		}

		Value::Object(map)
	}
}

/// Derives the replay ingest URL from the analytics proxy setting.
///
/// Absolute proxies upload to `<origin>/replay`. Site-relative proxies yield
/// the bare ingest path, which the default transport rejects since a client
/// library has no page origin to resolve it against. Unparseable values yield
/// `None`.
fn resolve_ingest_url(proxy: Option<&str>) -> Option<String> {
	let proxy = proxy?;
	if proxy.starts_with('/') {
		return Some(INGEST_PATH.to_string());
	}
	let url = Url::parse(proxy).ok()?;
	Some(format!(
		"{}{}",
		url.origin().ascii_serialization(),
		INGEST_PATH
	))
}
