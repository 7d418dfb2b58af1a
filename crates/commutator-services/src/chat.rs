//! Chat-bot notifications through the Telegram Bot API.

use crate::error::{ChannelError, RenderError};
use crate::markdown::{check_chat_length, escape_markdown_v2};
use crate::template::{render, resolve_template, TemplateVars};
use async_trait::async_trait;
use commutator_core::models::TemplatePart;
use commutator_core::TenantProfile;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio_util::codec::{BytesCodec, FramedRead};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[async_trait]
pub trait ChatChannel: Send + Sync {
    /// Render the tenant's chat template for `language` and post it.
    async fn send_chat_message(
        &self,
        profile: &TenantProfile,
        language: &str,
        vars: &dyn TemplateVars,
    ) -> Result<(), ChannelError>;

    /// Upload a file with an (escaped) caption.
    async fn send_chat_document(
        &self,
        bot_token: &str,
        chat_id: &str,
        file_path: &Path,
        caption: &str,
    ) -> Result<(), ChannelError>;
}

#[derive(Debug, Deserialize)]
struct BotApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    base_url: String,
}

impl TelegramNotifier {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn method_url(&self, bot_token: &str, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, bot_token, method)
    }

    /// Chat template for `language`, falling back to the tenant's first language.
    async fn chat_template(
        profile: &TenantProfile,
        language: &str,
    ) -> Result<String, RenderError> {
        match resolve_template(profile, TemplatePart::ChatBody, language).await {
            Err(RenderError::MissingTemplate { .. }) => {
                let fallback = profile.default_language().unwrap_or(language);
                if fallback == language {
                    return Err(RenderError::MissingTemplate {
                        part: TemplatePart::ChatBody,
                        language: language.to_string(),
                    });
                }
                tracing::debug!(
                    tenant = %profile.id,
                    language,
                    fallback,
                    "No chat template for language, using fallback"
                );
                resolve_template(profile, TemplatePart::ChatBody, fallback).await
            }
            other => other,
        }
    }

    async fn check_response(response: reqwest::Response) -> Result<(), ChannelError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        let parsed: Option<BotApiResponse> = serde_json::from_str(&body).ok();
        if !status.is_success() {
            return Err(ChannelError::Api {
                status: status.as_u16(),
                description: parsed
                    .and_then(|r| r.description)
                    .unwrap_or_else(|| status.to_string()),
            });
        }

        match parsed {
            Some(r) if r.ok => Ok(()),
            Some(r) => Err(ChannelError::Api {
                status: status.as_u16(),
                description: r.description.unwrap_or_else(|| "ok: false".to_string()),
            }),
            None => Err(ChannelError::Api {
                status: status.as_u16(),
                description: "unparsable response body".to_string(),
            }),
        }
    }
}

#[async_trait]
impl ChatChannel for TelegramNotifier {
    #[tracing::instrument(skip(self, profile, vars), fields(tenant = %profile.id))]
    async fn send_chat_message(
        &self,
        profile: &TenantProfile,
        language: &str,
        vars: &dyn TemplateVars,
    ) -> Result<(), ChannelError> {
        if !profile.chat.is_configured() {
            return Err(ChannelError::NotConfigured("bot token or chat id missing"));
        }

        let template = Self::chat_template(profile, language).await?;
        let text = escape_markdown_v2(&render(&template, vars));
        check_chat_length(&text)?;

        let payload = serde_json::json!({
            "chat_id": profile.chat.chat_id,
            "text": text,
            "parse_mode": "MarkdownV2",
            "disable_web_page_preview": true,
        });

        let response = self
            .client
            .post(self.method_url(&profile.chat.bot_token, "sendMessage"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        Self::check_response(response).await?;
        tracing::info!("Chat notification sent");
        Ok(())
    }

    #[tracing::instrument(skip(self, bot_token, caption), fields(file = %file_path.display()))]
    async fn send_chat_document(
        &self,
        bot_token: &str,
        chat_id: &str,
        file_path: &Path,
        caption: &str,
    ) -> Result<(), ChannelError> {
        if bot_token.is_empty() || chat_id.is_empty() {
            return Err(ChannelError::NotConfigured("bot token or chat id missing"));
        }

        let file = tokio::fs::File::open(file_path)
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;
        let length = file
            .metadata()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?
            .len();
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());

        let body = reqwest::Body::wrap_stream(FramedRead::new(file, BytesCodec::new()));
        let document = reqwest::multipart::Part::stream_with_length(body, length)
            .file_name(file_name)
            .mime_str("application/pdf")
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        let form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", escape_markdown_v2(caption))
            .text("parse_mode", "MarkdownV2")
            .part("document", document);

        let response = self
            .client
            .post(self.method_url(bot_token, "sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        Self::check_response(response).await?;
        tracing::info!("Chat document sent");
        Ok(())
    }
}
