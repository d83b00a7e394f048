#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use codeassist::error::Failure;
use codeassist::notify::{NotificationSeverity, Notifier};
use codeassist::providers::Transport;
use codeassist::request::{
  ChatCompletionRequest
, ChatCompletionResponse
, ChatMessage
, Choice
, Role
, Usage
};
use codeassist::Configuration;

pub const VALID_KEY: &str = "sk-0123456789abcdefghijkl";

/// Defaults plus a well-formed key
pub fn valid_config() -> Configuration
{   Configuration
    {   api_key: VALID_KEY.to_string()
      , base_url: "http://assist.test/v1".to_string()
      , ..Configuration::default()
    }
}

pub fn response_with(content: &str) -> ChatCompletionResponse
{   ChatCompletionResponse
    {   id: "chatcmpl-1".to_string()
      , object: "chat.completion".to_string()
      , created: 1_700_000_000
      , model: "deepseek-coder".to_string()
      , choices: vec![Choice
        {   index: 0
          , message: ChatMessage
            {   role: Role::Assistant
              , content: content.to_string()
            }
          , finish_reason: Some("stop".to_string())
        }]
      , usage: Some(Usage
        {   prompt_tokens: 12
          , completion_tokens: 4
          , total_tokens: 16
        })
    }
}

pub fn empty_response() -> ChatCompletionResponse
{   ChatCompletionResponse
    {   choices: vec![]
      , ..response_with("")
    }
}

/// One recorded attempt
#[derive(Debug, Clone)]
pub struct SentRequest
{   pub endpoint: String
  , pub api_key: String
  , pub body: ChatCompletionRequest
}

/// Transport replaying a script, then repeating `fallback`
pub struct ScriptedTransport
{   script: Mutex<VecDeque<Result<ChatCompletionResponse, Failure>>>
  , fallback: Result<ChatCompletionResponse, Failure>
  , sent: Mutex<Vec<SentRequest>>
}

impl ScriptedTransport
{   pub fn new(
      script: Vec<Result<ChatCompletionResponse, Failure>>
    , fallback: Result<ChatCompletionResponse, Failure>
    ) -> Self
    {   ScriptedTransport
        {   script: Mutex::new(script.into())
          , fallback
          , sent: Mutex::new(Vec::new())
        }
    }

    pub fn always(outcome: Result<ChatCompletionResponse, Failure>) -> Self
    {   ScriptedTransport::new(vec![], outcome)
    }

    pub fn sent(&self) -> Vec<SentRequest>
    {   self.sent.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize
    {   self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport
{   async fn send(
      &self
    , endpoint: &str
    , api_key: &str
    , request: &ChatCompletionRequest
    ) -> Result<ChatCompletionResponse, Failure>
    {   self.sent.lock().unwrap().push(SentRequest
        {   endpoint: endpoint.to_string()
          , api_key: api_key.to_string()
          , body: request.clone()
        });
        self.script.lock().unwrap()
          .pop_front()
          .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Notifier remembering every call and answering with `choice`
#[derive(Default)]
pub struct RecordingNotifier
{   pub choice: Option<String>
  , seen: Mutex<Vec<(NotificationSeverity, String, Vec<String>)>>
}

impl RecordingNotifier
{   pub fn seen(&self) -> Vec<(NotificationSeverity, String, Vec<String>)>
    {   self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier
{   async fn notify(
      &self
    , severity: NotificationSeverity
    , message: &str
    , actions: &[&str]
    ) -> Option<String>
    {   self.seen.lock().unwrap().push((
          severity
        , message.to_string()
        , actions.iter().map(|a| a.to_string()).collect()
        ));
        self.choice.clone()
    }
}
