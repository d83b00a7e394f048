//! Chat-completion wire types

use serde::{Deserialize, Serialize};

/// Path appended to the configured base URL
pub const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

// ===== Message Types =====

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role
{   System
  , User
  , Assistant
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: Role
  , pub content: String
}

impl ChatMessage
{   pub fn system(content: impl Into<String>) -> Self
    {   ChatMessage { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self
    {   ChatMessage { role: Role::User, content: content.into() }
    }
}

// ===== Request =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest
{   pub model: String
  , pub messages: Vec<ChatMessage>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>
}

impl ChatCompletionRequest
{   /// Non-streaming request with only the core knobs set
    pub fn new(
      model: impl Into<String>
    , messages: Vec<ChatMessage>
    , max_tokens: u32
    , temperature: f32
    ) -> Self
    {   ChatCompletionRequest
        {   model: model.into()
          , messages
          , max_tokens: Some(max_tokens)
          , temperature: Some(temperature)
          , top_p: None
          , frequency_penalty: None
          , presence_penalty: None
          , stream: Some(false)
        }
    }
}

// ===== Response =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionResponse
{   #[serde(default)]
    pub id: String
  , #[serde(default)]
    pub object: String
  , #[serde(default)]
    pub created: u64
  , #[serde(default)]
    pub model: String
  , #[serde(default)]
    pub choices: Vec<Choice>
  , #[serde(default)]
    pub usage: Option<Usage>
}

impl ChatCompletionResponse
{   /// Content of the first choice, if any
    pub fn first_content(&self) -> Option<&str>
    {   self.choices.first()
          .map(|c| c.message.content.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice
{   #[serde(default)]
    pub index: u32
  , pub message: ChatMessage
  , #[serde(default)]
    pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage
{   pub prompt_tokens: u32
  , pub completion_tokens: u32
  , pub total_tokens: u32
}

// ===== Error Body =====

/// `{"error": {...}}` body returned with non-success statuses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody
{   pub error: ApiErrorDetail
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorDetail
{   #[serde(default)]
    pub message: Option<String>
  , #[serde(rename = "type", default)]
    pub error_type: Option<String>
  , #[serde(default)]
    pub code: Option<serde_json::Value>
}
