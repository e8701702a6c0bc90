use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use askama::Template;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{chat, AppState};

const NOT_CONFIGURED: &str =
    "The chat assistant is not configured. Set CHAT_ENDPOINT and CHAT_DEPLOYMENT_NAME to enable it.";

#[derive(Template)]
#[template(path = "chat.html")]
pub struct ChatTemplate {
    available: bool,
    notice: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub content: String,
}

fn default_role() -> String {
    "user".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Option<Vec<ChatMessage>>,
    pub user_message: Option<String>,
}

impl ChatRequest {
    /// The explicit `userMessage`, else the content of the latest user message.
    pub fn prompt(&self) -> String {
        self.user_message
            .clone()
            .or_else(|| {
                self.messages
                    .as_ref()
                    .and_then(|m| m.iter().rev().find(|m| m.role == "user"))
                    .map(|m| m.content.clone())
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_dummy_response: Option<bool>,
}

impl ChatReply {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            is_dummy_response: Some(true),
        }
    }
}

pub async fn chat_page(State(state): State<AppState>) -> ChatTemplate {
    let available = state.config.chat.is_configured();
    ChatTemplate {
        available,
        notice: (!available).then(|| NOT_CONFIGURED.to_string()),
    }
}

pub async fn chat_message(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Json<ChatReply> {
    if !state.config.chat.is_configured() {
        return Json(ChatReply::failure(NOT_CONFIGURED));
    }

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("Rejected chat payload: {}", rejection);
            return Json(ChatReply::failure("Sorry, that message could not be read."));
        }
    };

    let reply = chat::respond(&state.db, &request.prompt()).await;
    Json(ChatReply {
        success: true,
        message: reply,
        is_dummy_response: None,
    })
}
