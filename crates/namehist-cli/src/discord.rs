//! Discord REST message sink

use crate::config::DiscordConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use namehist_core::{ArtifactRef, ChannelId, EmbedField, MessageContent, MessageId};
use namehist_sync::{MessageSink, SinkError};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

/// Message payload carrying a single embed
#[derive(Debug, Serialize)]
struct MessageBody<'a> {
    embeds: [&'a MessageContent; 1],
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    id: String,
    #[serde(default)]
    embeds: Vec<WireEmbed>,
}

#[derive(Debug, Default, Deserialize)]
struct WireEmbed {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    color: Option<u32>,
    #[serde(default)]
    fields: Vec<EmbedField>,
}

#[derive(Debug, Deserialize)]
struct WireError {
    message: String,
}

impl WireMessage {
    fn message_id(&self) -> Result<MessageId, SinkError> {
        self.id
            .parse()
            .map_err(|e: namehist_core::ParseIdError| SinkError::Protocol(e.to_string()))
    }

    fn into_content(self) -> MessageContent {
        let embed = self.embeds.into_iter().next().unwrap_or_default();
        MessageContent {
            title: embed.title.unwrap_or_default(),
            color: embed.color.unwrap_or_default(),
            fields: embed.fields,
        }
    }
}

/// [`MessageSink`] backed by the Discord HTTP API
#[derive(Debug, Clone)]
pub(crate) struct DiscordHttpSink {
    client: Client,
    api_base: String,
}

impl DiscordHttpSink {
    /// Build a client authenticated as the bot owning `token`
    pub(crate) fn new(config: &DiscordConfig, token: &str) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bot {token}"))
            .context("bot token contains invalid header characters")?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .user_agent(concat!("namehist/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn channel_url(&self, channel: ChannelId) -> String {
        format!("{}/channels/{channel}/messages", self.api_base)
    }

    fn message_url(&self, artifact: ArtifactRef) -> String {
        format!(
            "{}/channels/{}/messages/{}",
            self.api_base, artifact.destination, artifact.message
        )
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, SinkError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }

    async fn read_message(response: Response) -> Result<WireMessage, SinkError> {
        response.json().await.map_err(transport_error)
    }
}

#[async_trait]
impl MessageSink for DiscordHttpSink {
    async fn create_message(
        &self,
        channel: ChannelId,
        content: &MessageContent,
    ) -> Result<MessageId, SinkError> {
        let request = self
            .client
            .post(self.channel_url(channel))
            .json(&MessageBody { embeds: [content] });
        let message = Self::read_message(self.send(request).await?).await?;
        message.message_id()
    }

    async fn fetch_message(&self, artifact: ArtifactRef) -> Result<MessageContent, SinkError> {
        let request = self.client.get(self.message_url(artifact));
        let message = Self::read_message(self.send(request).await?).await?;
        Ok(message.into_content())
    }

    async fn edit_message(
        &self,
        artifact: ArtifactRef,
        content: &MessageContent,
    ) -> Result<(), SinkError> {
        let request = self
            .client
            .patch(self.message_url(artifact))
            .json(&MessageBody { embeds: [content] });
        self.send(request).await?;
        Ok(())
    }
}

fn transport_error(err: reqwest::Error) -> SinkError {
    if err.is_decode() {
        SinkError::Protocol(err.to_string())
    } else {
        SinkError::Transport(err.to_string())
    }
}

/// Map an error response to a [`SinkError`]
fn status_error(status: StatusCode, body: &str) -> SinkError {
    if status == StatusCode::NOT_FOUND {
        return SinkError::NotFound;
    }
    let message = serde_json::from_str::<WireError>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.trim().to_string());
    SinkError::rejected(status.as_u16(), message)
}
