//! Prompt construction and response parsing for each operation

use serde::{Deserialize, Serialize};

use crate::request::{ChatCompletionResponse, ChatMessage};

/// Completions never ask for more than this, whatever the config says
pub const COMPLETION_MAX_TOKENS: u32 = 1024;
/// Suggestions kept from one completion response
pub const MAX_COMPLETION_SUGGESTIONS: usize = 5;

pub const NO_EXPLANATION: &str = "No explanation available.";
pub const NO_REFACTORING: &str = "No refactoring suggestions available.";

/// Input for an inline completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest
{   /// Code up to the cursor
    pub context: String
  , pub language: String
  , pub max_suggestions: u32
}

impl CompletionRequest
{   pub fn new(
      context: impl Into<String>
    , language: impl Into<String>
    , max_suggestions: u32
    ) -> Self
    {   CompletionRequest
        {   context: context.into()
          , language: language.into()
          , max_suggestions
        }
    }
}

// ===== Prompts =====

pub fn completion_messages(request: &CompletionRequest) -> Vec<ChatMessage>
{   vec![
      ChatMessage::system(format!(
        "You are an expert {} programmer. Complete the code at the \
         cursor. Reply with up to {} suggestions, one per line, code \
         only, with no explanations and no markdown."
      , request.language
      , request.max_suggestions
      ))
    , ChatMessage::user(format!(
        "Complete the following {} code:\n\n{}"
      , request.language
      , request.context
      ))
    ]
}

pub fn explanation_messages(
  code: &str
, language: &str
, include_examples: bool
) -> Vec<ChatMessage>
{   let mut system = format!(
      "You are an expert {} programmer. Explain clearly and \
       concisely what the given code does."
    , language
    );
    if include_examples
    {   system.push_str(" Include a short usage example.");
    }
    vec![
      ChatMessage::system(system)
    , ChatMessage::user(format!(
        "Explain this {} code:\n\n```{}\n{}\n```"
      , language, language, code
      ))
    ]
}

pub fn refactor_messages(
  code: &str
, language: &str
, instructions: Option<&str>
) -> Vec<ChatMessage>
{   let goal = instructions
      .filter(|i| !i.trim().is_empty())
      .unwrap_or("Improve readability, performance and maintainability.");
    vec![
      ChatMessage::system(format!(
        "You are an expert {} programmer. Suggest a refactored \
         version of the given code and briefly explain the changes."
      , language
      ))
    , ChatMessage::user(format!(
        "{}\n\n```{}\n{}\n```"
      , goal, language, code
      ))
    ]
}

pub fn probe_messages() -> Vec<ChatMessage>
{   vec![ChatMessage::user("Hello")]
}

// ===== Parsing =====

/// Non-empty trimmed lines of the first choice, at most five
pub fn parse_completion_response(response: &ChatCompletionResponse) -> Vec<String>
{   response.first_content()
      .map(|content| {
        content.lines()
          .map(str::trim)
          .filter(|line| !line.is_empty())
          .take(MAX_COMPLETION_SUGGESTIONS)
          .map(str::to_string)
          .collect()
      })
      .unwrap_or_default()
}

pub fn parse_explanation_response(response: &ChatCompletionResponse) -> String
{   response.first_content()
      .map(|c| c.trim().to_string())
      .unwrap_or_else(|| NO_EXPLANATION.to_string())
}

pub fn parse_refactor_response(response: &ChatCompletionResponse) -> String
{   response.first_content()
      .map(|c| c.trim().to_string())
      .unwrap_or_else(|| NO_REFACTORING.to_string())
}
