//! Telegram Bot API client
//!
//! Implements [`Messenger`] over `sendMessage`, `editMessageText` and
//! `sendDocument`, plus the `getUpdates` long poll used by the CLI loop.

use super::types::{ApiResponse, Message, Update};
use crate::split::split_message;
use async_trait::async_trait;
use nanobot_foundation::strings::tail_with_ellipsis;
use nanobot_foundation::{
    ChatId, Error, Markup, MessageHandle, Messenger, Result, TaskLimits, TelegramSettings,
};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Server-side wait for `getUpdates`
pub const LONG_POLL_SECS: u64 = 30;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);
/// HTTP timeout on top of the long-poll wait
const POLL_MARGIN: Duration = Duration::from_secs(5);

pub struct TelegramClient {
    http: Client,
    /// `{api_base}/bot{token}`
    base_url: String,
    message_limit: usize,
    edit_budget: usize,
}

impl TelegramClient {
    pub fn new(settings: &TelegramSettings, limits: &TaskLimits) -> Result<Self> {
        let token = settings.token.trim();
        if token.is_empty() {
            return Err(Error::Config("Telegram bot token is empty".into()));
        }
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            base_url: format!("{}/bot{}", settings.api_base.trim_end_matches('/'), token),
            message_limit: limits.message_limit,
            edit_budget: limits.edit_budget,
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    /// POST a JSON body and unwrap the `{ok, result}` envelope
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<T> {
        let response = self
            .http
            .post(self.endpoint(method))
            .json(body)
            .timeout(timeout)
            .send()
            .await?;
        unwrap_envelope(method, response.json::<ApiResponse<T>>().await?)
    }

    /// Fetch updates after `offset`, waiting up to `timeout_secs` for one
    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>> {
        let mut request = self
            .http
            .get(self.endpoint("getUpdates"))
            .query(&[("timeout", timeout_secs)])
            .timeout(Duration::from_secs(timeout_secs) + POLL_MARGIN);
        if let Some(offset) = offset {
            request = request.query(&[("offset", offset)]);
        }
        let response = request.send().await?;
        unwrap_envelope("getUpdates", response.json::<ApiResponse<Vec<Update>>>().await?)
    }

    async fn send_one(&self, chat: ChatId, text: &str, markup: Markup) -> Result<Message> {
        self.call("sendMessage", &message_body(chat, text, markup), SEND_TIMEOUT)
            .await
    }

    /// Send with markup, falling back to plain text if Telegram rejects it
    async fn send_with_fallback(&self, chat: ChatId, text: &str, markup: Markup) -> Result<Message> {
        match self.send_one(chat, text, markup).await {
            Err(Error::Api { message, .. }) if markup != Markup::Plain => {
                warn!("send_message HTML rejected ({}), retrying as plain text", message);
                self.send_one(chat, text, Markup::Plain).await
            }
            other => other,
        }
    }
}

fn message_body(chat: ChatId, text: &str, markup: Markup) -> Value {
    let mut body = json!({ "chat_id": chat.0, "text": text });
    if let Some(mode) = markup.parse_mode() {
        body["parse_mode"] = json!(mode);
    }
    body
}

fn unwrap_envelope<T>(method: &str, envelope: ApiResponse<T>) -> Result<T> {
    if !envelope.ok {
        return Err(Error::api(
            method,
            envelope
                .description
                .unwrap_or_else(|| format!("error code {}", envelope.error_code.unwrap_or_default())),
        ));
    }
    envelope
        .result
        .ok_or_else(|| Error::api(method, "response has no result"))
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send(&self, chat: ChatId, text: &str, markup: Markup) -> Result<()> {
        let mut first_error = None;
        for chunk in split_message(text, self.message_limit) {
            if let Err(e) = self.send_with_fallback(chat, chunk, markup).await {
                warn!("send_message error: {}", e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn send_with_handle(&self, chat: ChatId, text: &str) -> Result<MessageHandle> {
        let message = self.send_one(chat, text, Markup::Plain).await?;
        Ok(MessageHandle::new(chat, message.message_id))
    }

    async fn edit(&self, handle: MessageHandle, text: &str, markup: Markup) -> Result<()> {
        let text = tail_with_ellipsis(text, self.edit_budget);
        let mut body = message_body(handle.chat, &text, markup);
        body["message_id"] = json!(handle.message_id);

        match self
            .call::<Value>("editMessageText", &body, SEND_TIMEOUT)
            .await
        {
            Ok(_) => Ok(()),
            Err(Error::Api { message, .. }) if markup != Markup::Plain => {
                warn!("edit_message HTML rejected ({}), retrying as plain text", message);
                if let Some(fields) = body.as_object_mut() {
                    fields.remove("parse_mode");
                }
                self.call::<Value>("editMessageText", &body, SEND_TIMEOUT)
                    .await
                    .map(|_| ())
            }
            Err(e) => Err(e),
        }
    }

    async fn send_file(&self, chat: ChatId, content: &[u8], filename: &str) -> Result<()> {
        let document = Part::bytes(content.to_vec())
            .file_name(filename.to_string())
            .mime_str("text/plain")?;
        let form = Form::new()
            .text("chat_id", chat.0.to_string())
            .part("document", document);

        let response = self
            .http
            .post(self.endpoint("sendDocument"))
            .multipart(form)
            .timeout(UPLOAD_TIMEOUT)
            .send()
            .await?;
        let message = unwrap_envelope("sendDocument", response.json::<ApiResponse<Message>>().await?)?;
        debug!("Sent {} as message {}", filename, message.message_id);
        Ok(())
    }
}
