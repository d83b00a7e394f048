//! Transports that carry one chat-completion attempt

pub mod http;

use async_trait::async_trait;

use crate::error::Failure;
use crate::request::{ChatCompletionRequest, ChatCompletionResponse};

// Re-export for convenience
pub use http::HttpTransport;

/// Performs exactly one network attempt. Retrying is the
/// caller's business.
#[async_trait]
pub trait Transport: Send + Sync
{   async fn send(
      &self
    , endpoint: &str
    , api_key: &str
    , request: &ChatCompletionRequest
    ) -> Result<ChatCompletionResponse, Failure>;
}
