use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, trace};

use crate::error::{Error, Failure};
use crate::request::{
  ApiErrorBody
, ChatCompletionRequest
, ChatCompletionResponse
};

/// reqwest-backed transport for OpenAI-compatible endpoints
#[derive(Debug, Clone)]
pub struct HttpTransport
{   http_client: reqwest::Client
}

impl HttpTransport
{   /// Each request is cut off after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, Error>
    {   debug!("Creating HttpTransport, timeout {:?}", timeout);
        let http_client = reqwest::Client::builder()
          .timeout(timeout)
          .build()
          .map_err(|e| {
            error!("Failed to build HTTP client: {}", e);
            Error::Other(e.to_string())
          })?;
        Ok(HttpTransport { http_client })
    }
}

#[async_trait]
impl super::Transport for HttpTransport
{   async fn send(
      &self
    , endpoint: &str
    , api_key: &str
    , request: &ChatCompletionRequest
    ) -> Result<ChatCompletionResponse, Failure>
    {   trace!("POST {} model={}", endpoint, request.model);

        let response = self.http_client
          .post(endpoint)
          .header("Authorization", format!("Bearer {}", api_key))
          .json(request)
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            transport_failure(&e)
          })?;

        let status = response.status();
        trace!("Response status: {}", status);

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_default();
            error!("API error {}: {}", status, error_text);
            let body = serde_json::from_str::<ApiErrorBody>(&error_text)
              .ok();
            let message = if error_text.trim().is_empty()
            {   status.canonical_reason().map(str::to_string)
            } else
            {   Some(error_text)
            };
            return Err(Failure::Status
            {   status: status.as_u16()
              , body
              , message
            });
        }

        response.json::<ChatCompletionResponse>().await
          .map_err(|e| {
            error!("Parse error: {}", e);
            if e.is_timeout()
            {   transport_failure(&e)
            } else
            {   Failure::Text(format!("Invalid response body: {}", e))
            }
          })
    }
}

/// Map a reqwest error that produced no response
fn transport_failure(e: &reqwest::Error) -> Failure
{   let code = if e.is_timeout()
    {   Some("ETIMEDOUT")
    } else if e.is_connect()
    {   Some("ECONNREFUSED")
    } else
    {   None
    };
    Failure::Transport
    {   code: code.map(str::to_string)
      , message: Some(e.to_string())
    }
}
