// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Segment upload transport.

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use weft_replay_core::{SegmentEnvelope, SegmentPayload};

use crate::error::{ReplayError, Result};

/// Query parameter carrying the client token on ingest requests.
const API_KEY_PARAM: &str = "api-key";

/// Pluggable delivery mechanism for serialized segments.
///
/// The default HTTP implementation is at-most-once: the pipeline dispatches
/// sends without awaiting them and nothing is retried, so a hard failure
/// loses exactly the segment it carried. Implementations wanting bounded
/// retry can wrap `weft_common_http::retry` without any pipeline changes.
#[async_trait]
pub trait SegmentTransport: Send + Sync {
	/// Delivers one segment to the collection endpoint.
	async fn send(&self, envelope: SegmentEnvelope, payload: SegmentPayload) -> Result<()>;
}

/// Uploads segments as multipart POSTs to the ingest endpoint.
pub struct HttpTransport {
	http_client: Client,
	ingest_url: Url,
	client_token: Option<String>,
}

impl HttpTransport {
	/// Creates a transport for the given ingest URL.
	///
	/// The URL must be absolute; a client library has no page origin to
	/// resolve relative paths against.
	pub fn new(ingest_url: &str, client_token: Option<String>) -> Result<Self> {
		let ingest_url = Url::parse(ingest_url)
			.map_err(|e| ReplayError::InvalidIngestUrl(format!("{ingest_url}: {e}")))?;
		Ok(Self {
			http_client: weft_common_http::new_client(),
			ingest_url,
			client_token,
		})
	}
}

#[async_trait]
impl SegmentTransport for HttpTransport {
	async fn send(&self, envelope: SegmentEnvelope, payload: SegmentPayload) -> Result<()> {
		let event = serde_json::to_string(&envelope)?;
		let segment = serde_json::to_string(&payload)?;

		let form = reqwest::multipart::Form::new()
			.text("event", event)
			.text("segment", segment);

		let mut request = self
			.http_client
			.post(self.ingest_url.clone())
			.multipart(form);
		if let Some(token) = &self.client_token {
			request = request.query(&[(API_KEY_PARAM, token.as_str())]);
		}

		let response = request.send().await?;
		if !response.status().is_success() {
			let status = response.status().as_u16();
			let message = response.text().await.unwrap_or_default();
			return Err(ReplayError::ServerError { status, message });
		}
		Ok(())
	}
}
