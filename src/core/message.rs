use serde::{Deserialize, Serialize};

use crate::api::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TranscriptRole {
    User,
    Assistant,
    AppInfo,
    AppError,
}

impl TranscriptRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TranscriptRole::User => "user",
            TranscriptRole::Assistant => "assistant",
            TranscriptRole::AppInfo => "app/info",
            TranscriptRole::AppError => "app/error",
        }
    }

    /// Role name on the wire, or `None` for turns the backend never sees.
    pub fn to_api_role(self) -> Option<&'static str> {
        match self {
            TranscriptRole::User => Some("user"),
            TranscriptRole::Assistant => Some("assistant"),
            TranscriptRole::AppInfo | TranscriptRole::AppError => None,
        }
    }

    pub fn is_user(self) -> bool {
        self == TranscriptRole::User
    }

    pub fn is_assistant(self) -> bool {
        self == TranscriptRole::Assistant
    }

    pub fn is_app(self) -> bool {
        matches!(self, TranscriptRole::AppInfo | TranscriptRole::AppError)
    }
}

impl TryFrom<&str> for TranscriptRole {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(TranscriptRole::User),
            "assistant" => Ok(TranscriptRole::Assistant),
            "app/info" => Ok(TranscriptRole::AppInfo),
            "app/error" => Ok(TranscriptRole::AppError),
            _ => Err(format!("invalid transcript role: {value}")),
        }
    }
}

impl TryFrom<String> for TranscriptRole {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<TranscriptRole> for String {
    fn from(role: TranscriptRole) -> Self {
        role.as_str().to_string()
    }
}

/// One entry of the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TranscriptRole,
    pub text: String,
}

impl ChatTurn {
    pub fn new(role: TranscriptRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(TranscriptRole::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(TranscriptRole::Assistant, text)
    }

    pub fn app_info(text: impl Into<String>) -> Self {
        Self::new(TranscriptRole::AppInfo, text)
    }

    pub fn app_error(text: impl Into<String>) -> Self {
        Self::new(TranscriptRole::AppError, text)
    }

    pub fn is_error(&self) -> bool {
        self.role == TranscriptRole::AppError
    }

    pub fn to_api_message(&self) -> Option<ChatMessage> {
        self.role.to_api_role().map(|role| ChatMessage {
            role: role.to_string(),
            content: self.text.clone(),
        })
    }
}
