// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the feed bridge.
//!
//! Provides [`HttpFeed`], a [`ChannelFeed`] that forwards every call to the
//! bridge's JSON API and converts the answers into core types.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use subarchive_config::model::FeedConfig;
use subarchive_core::{
    AdapterType, ArchiveError, Channel, ChannelFeed, FeedDifference, FileLocation, FilePart,
    HealthStatus, IncomingMessage, InviteStatus, PluginAdapter, ProgressToken,
};

use crate::wire::{
    ChannelRef, DifferenceRequest, DifferenceResponse, FilePartRequest, FullChannelResponse,
    HistoryRequest, HistoryResponse, WireChannel, WireInvite,
};

/// Body the bridge sends for a file part that is not raw bytes.
#[derive(Debug, Deserialize)]
struct NonDataPart {
    #[serde(rename = "type")]
    kind: String,
}

/// Feed client backed by the HTTP bridge.
#[derive(Debug, Clone)]
pub struct HttpFeed {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFeed {
    /// Creates a client for the bridge described by `config`.
    pub fn new(config: &FeedConfig) -> Result<Self, ArchiveError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = config.api_token.as_deref() {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                ArchiveError::Config(format!("invalid feed.api_token header value: {e}"))
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| ArchiveError::Feed {
            message: format!("failed to build HTTP client: {e}"),
            source: Some(Box::new(e)),
        })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ArchiveError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(transport_error)?;
        decode(check_status(response).await?).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ArchiveError> {
        let response = self.post(path, body).await?;
        decode(response).await
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<Response, ArchiveError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await
    }
}

fn transport_error(e: reqwest::Error) -> ArchiveError {
    ArchiveError::Feed {
        message: format!("HTTP request failed: {e}"),
        source: Some(Box::new(e)),
    }
}

async fn check_status(response: Response) -> Result<Response, ArchiveError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ArchiveError::feed(format!("bridge returned {status}: {body}")))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ArchiveError> {
    let body = response.text().await.map_err(|e| ArchiveError::Feed {
        message: format!("failed to read response body: {e}"),
        source: Some(Box::new(e)),
    })?;
    serde_json::from_str(&body).map_err(|e| ArchiveError::Feed {
        message: format!("failed to parse bridge response: {e}"),
        source: Some(Box::new(e)),
    })
}

#[async_trait]
impl PluginAdapter for HttpFeed {
    fn name(&self) -> &str {
        "http-feed"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Feed
    }

    /// The bridge reports healthy only while its session is authorized.
    async fn health_check(&self) -> Result<HealthStatus, ArchiveError> {
        match self.client.get(self.url("/v1/health")).send().await {
            Ok(response) if response.status().is_success() => Ok(HealthStatus::Healthy),
            Ok(response) => Ok(HealthStatus::Unhealthy(format!(
                "feed bridge returned {}",
                response.status()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "feed bridge unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), ArchiveError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelFeed for HttpFeed {
    async fn resolve_username(&self, username: &str) -> Result<Channel, ArchiveError> {
        let response = self
            .client
            .get(self.url(&format!("/v1/resolve/{username}")))
            .send()
            .await
            .map_err(|e| ArchiveError::Resolve {
                name: username.to_string(),
                message: e.to_string(),
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ArchiveError::Resolve {
                name: username.to_string(),
                message: "no such channel".to_string(),
            });
        }

        let wire: WireChannel = decode(check_status(response).await?).await?;
        let name = wire
            .username
            .clone()
            .unwrap_or_else(|| username.to_string());
        Ok(wire.into_channel(name))
    }

    async fn check_invite(&self, hash: &str) -> Result<InviteStatus, ArchiveError> {
        let wire: WireInvite = self.get_json(&format!("/v1/invites/{hash}")).await?;
        Ok(wire.into_status(hash))
    }

    async fn full_channel(&self, channel: &Channel) -> Result<ProgressToken, ArchiveError> {
        let full: FullChannelResponse = self
            .post_json("/v1/channels/full", &ChannelRef::from(channel))
            .await
            .map_err(|e| ArchiveError::Handshake {
                channel: channel.name.clone(),
                message: e.to_string(),
            })?;
        Ok(ProgressToken(full.pts))
    }

    async fn history(
        &self,
        channel: &Channel,
        limit: u32,
    ) -> Result<Vec<IncomingMessage>, ArchiveError> {
        let request = HistoryRequest {
            channel: ChannelRef::from(channel),
            limit,
        };
        let response: HistoryResponse = self.post_json("/v1/channels/history", &request).await?;
        Ok(response
            .messages
            .into_iter()
            .map(|m| m.into_incoming(channel.channel_id))
            .collect())
    }

    async fn difference(
        &self,
        channel: &Channel,
        since: ProgressToken,
        limit: u32,
    ) -> Result<FeedDifference, ArchiveError> {
        let request = DifferenceRequest {
            channel: ChannelRef::from(channel),
            pts: since.0,
            limit,
        };
        let response: DifferenceResponse =
            self.post_json("/v1/channels/difference", &request).await?;
        Ok(match response {
            DifferenceResponse::Empty { pts } => FeedDifference::Empty {
                token: ProgressToken(pts),
            },
            DifferenceResponse::New { pts, messages } => FeedDifference::NewMessages {
                messages: messages
                    .into_iter()
                    .map(|m| m.into_incoming(channel.channel_id))
                    .collect(),
                token: ProgressToken(pts),
            },
            DifferenceResponse::TooLong { pts } => FeedDifference::TooLong {
                token: ProgressToken(pts),
            },
        })
    }

    async fn file_part(
        &self,
        location: &FileLocation,
        offset: u64,
        limit: u32,
    ) -> Result<FilePart, ArchiveError> {
        let request = FilePartRequest {
            location: location.clone(),
            offset,
            limit,
        };
        let response = self.post("/v1/files/part", &request).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if content_type.starts_with("application/octet-stream") {
            let bytes = response.bytes().await.map_err(|e| ArchiveError::Feed {
                message: format!("failed to read file part: {e}"),
                source: Some(Box::new(e)),
            })?;
            debug!(offset, len = bytes.len(), "file part received");
            return Ok(FilePart::Chunk(bytes.to_vec()));
        }

        let kind = decode::<NonDataPart>(response)
            .await
            .map(|part| part.kind)
            .unwrap_or(content_type);
        Ok(FilePart::Unexpected { kind })
    }
}
