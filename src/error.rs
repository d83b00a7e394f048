//! Error types for codeassist operations

use std::fmt;

use crate::classify::ErrorClassification;
use crate::request::ApiErrorBody;
use crate::validate::ConfigurationIssue;

/// Message used when a failure carries nothing readable
pub const FALLBACK_MESSAGE: &str = "An unknown error occurred";

/// A raw failure from one network attempt, before classification.
///
/// Each shape has its own message extraction rule, see
/// [`Failure::message`].
#[derive(Debug, Clone, PartialEq)]
pub enum Failure
{   /// A bare string was raised
    Text(String)
  , /// No response arrived (connection refused, DNS, timeout...)
    Transport
    {   code: Option<String>
      , message: Option<String>
    }
  , /// The service answered with a non-success status
    Status
    {   status: u16
      , body: Option<ApiErrorBody>
      , message: Option<String>
    }
  , /// Anything else; no status, code or message
    Opaque
}

impl Failure
{   /// Transport failure carrying a system-style error code
    pub fn transport(
      code: impl Into<String>
    , message: impl Into<String>
    ) -> Self
    {   Failure::Transport
        {   code: Some(code.into())
          , message: Some(message.into())
        }
    }

    /// Status failure with no decoded body
    pub fn status(status: u16) -> Self
    {   Failure::Status
        {   status
          , body: None
          , message: None
        }
    }

    /// HTTP status, when a response was received
    pub fn status_code(&self) -> Option<u16>
    {   match self
        {   Failure::Status { status, .. } => Some(*status)
          , _ => None
        }
    }

    /// Transport error code, when no response was received
    pub fn code(&self) -> Option<&str>
    {   match self
        {   Failure::Transport { code, .. } => code.as_deref()
          , _ => None
        }
    }

    /// Extract a human readable message.
    ///
    /// Precedence: literal text, then the nested API error
    /// message, then the failure's own message, then
    /// [`FALLBACK_MESSAGE`].
    pub fn message(&self) -> String
    {   match self
        {   Failure::Text(text) => text.clone()
          , Failure::Status { body, message, .. } => {
              body.as_ref()
                .and_then(|b| b.error.message.clone())
                .or_else(|| message.clone())
                .unwrap_or_else(|| FALLBACK_MESSAGE.to_string())
            }
          , Failure::Transport { message, .. } => {
              message.clone()
                .unwrap_or_else(|| FALLBACK_MESSAGE.to_string())
            }
          , Failure::Opaque => FALLBACK_MESSAGE.to_string()
        }
    }
}

impl fmt::Display for Failure
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Failure::Status { status, .. } => {
              write!(f, "HTTP {}: {}", status, self.message())
            }
          , Failure::Transport { code: Some(code), .. } => {
              write!(f, "{}: {}", code, self.message())
            }
          , _ => write!(f, "{}", self.message())
        }
    }
}

impl std::error::Error for Failure {}

impl From<String> for Failure
{   fn from(s: String) -> Self
    {   Failure::Text(s)
    }
}

impl From<&str> for Failure
{   fn from(s: &str) -> Self
    {   Failure::Text(s.to_string())
    }
}

/// Custom error type for codeassist operations
#[derive(Debug, Clone, PartialEq)]
pub enum Error
{   /// Configuration failed validation; nothing was sent
    ConfigurationInvalid(Vec<ConfigurationIssue>)
  , /// The feature backing this operation is switched off
    FeatureDisabled(String)
  , /// A request failed terminally after classification
    Request
    {   classification: ErrorClassification
      , message: String
      , failure: Failure
    }
  , /// Failed to parse a response or a settings value
    ParseError(String)
  , /// A configuration update or load was rejected
    InvalidConfiguration(String)
  , /// Reading configuration from disk failed
    Io(String)
  , /// Generic error
    Other(String)
}

impl Error
{   /// Classification of a terminal request failure
    pub fn classification(&self) -> Option<ErrorClassification>
    {   match self
        {   Error::Request { classification, .. } => {
              Some(*classification)
            }
          , _ => None
        }
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::ConfigurationInvalid(issues) => {
              let fields: Vec<String> = issues
                .iter()
                .map(|i| format!("{}: {}", i.field, i.message))
                .collect();
              write!(f,
                "Configuration is invalid: {}",
                fields.join("; ")
              )
            }
          , Error::FeatureDisabled(feature) => {
              write!(f, "Feature is disabled: {}", feature)
            }
          , Error::Request { message, .. } => {
              write!(f, "{}", message)
            }
          , Error::ParseError(msg) => {
              write!(f, "Parse error: {}", msg)
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::Io(msg) => {
              write!(f, "I/O error: {}", msg)
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error
{   fn source(&self)
      -> Option<&(dyn std::error::Error + 'static)>
    {   match self
        {   Error::Request { failure, .. } => Some(failure)
          , _ => None
        }
    }
}

impl From<String> for Error
{   fn from(s: String) -> Self
    {   Error::Other(s)
    }
}

impl From<&str> for Error
{   fn from(s: &str) -> Self
    {   Error::Other(s.to_string())
    }
}

impl From<std::io::Error> for Error
{   fn from(e: std::io::Error) -> Self
    {   Error::Io(e.to_string())
    }
}

impl From<serde_json::Error> for Error
{   fn from(e: serde_json::Error) -> Self
    {   Error::ParseError(e.to_string())
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;
