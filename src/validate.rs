//! Configuration validation rules

use serde::{Deserialize, Serialize};

use crate::config::Configuration;

pub const MIN_MAX_TOKENS: i64 = 100;
pub const MAX_MAX_TOKENS: i64 = 8192;
/// Above this the model gets noticeably slower
pub const SLOW_MAX_TOKENS: i64 = 4096;
pub const MIN_TEMPERATURE: f32 = 0.0;
pub const MAX_TEMPERATURE: f32 = 2.0;
const API_KEY_PREFIX: &str = "sk-";
const API_KEY_MIN_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity
{   Error
  , Warning
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationIssue
{   pub field: String
  , pub message: String
  , pub severity: Severity
}

impl ConfigurationIssue
{   fn error(field: &str, message: impl Into<String>) -> Self
    {   ConfigurationIssue
        {   field: field.to_string()
          , message: message.into()
          , severity: Severity::Error
        }
    }

    fn warning(field: &str, message: impl Into<String>) -> Self
    {   ConfigurationIssue
        {   field: field.to_string()
          , message: message.into()
          , severity: Severity::Warning
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult
{   pub is_valid: bool
  , pub errors: Vec<ConfigurationIssue>
  , pub warnings: Vec<ConfigurationIssue>
}

impl ValidationResult
{   fn from_issues(issues: Vec<ConfigurationIssue>) -> Self
    {   let (errors, warnings): (Vec<_>, Vec<_>) = issues
          .into_iter()
          .partition(|i| i.severity == Severity::Error);
        ValidationResult
        {   is_valid: errors.is_empty()
          , errors
          , warnings
        }
    }
}

/// Check a snapshot. Every rule runs; nothing short-circuits.
pub fn validate(config: &Configuration) -> ValidationResult
{   let mut issues = Vec::new();

    let key = config.api_key.trim();
    if key.is_empty()
    {   issues.push(ConfigurationIssue::error(
          "apiKey"
        , "API Key is required"
        ));
    } else if !(key.len() >= API_KEY_MIN_LEN
      && key.starts_with(API_KEY_PREFIX))
    {   issues.push(ConfigurationIssue::warning(
          "apiKey"
        , "API Key format appears invalid"
        ));
    }

    if crate::Model::from_name(&config.model).is_none()
    {   issues.push(ConfigurationIssue::error(
          "model"
        , format!(
            "Model must be one of: {}"
          , crate::Model::names().join(", ")
          )
        ));
    }

    if !(MIN_MAX_TOKENS..=MAX_MAX_TOKENS).contains(&config.max_tokens)
    {   issues.push(ConfigurationIssue::error(
          "maxTokens"
        , format!(
            "Max tokens must be between {} and {}"
          , MIN_MAX_TOKENS, MAX_MAX_TOKENS
          )
        ));
    }
    if config.max_tokens > SLOW_MAX_TOKENS
    {   issues.push(ConfigurationIssue::warning(
          "maxTokens"
        , "High max tokens may result in slower responses"
        ));
    }

    // NaN fails the range check too
    if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&config.temperature)
    {   issues.push(ConfigurationIssue::error(
          "temperature"
        , format!(
            "Temperature must be between {} and {}"
          , MIN_TEMPERATURE, MAX_TEMPERATURE
          )
        ));
    }

    ValidationResult::from_issues(issues)
}
