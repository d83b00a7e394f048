//! Retry policy and the engine that drives one logical call
//! through its attempts

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, error, warn};

use crate::classify::classify;
use crate::config::ConfigStore;
use crate::error::{Error, Failure, Result};
use crate::request::ChatCompletionRequest;

/// Retry ceiling for transient failures
pub const MAX_RETRIES: u32 = 3;

/// Retry policy for failed requests
#[derive(Debug, Clone)]
pub struct RetryPolicy
{   pub max_retries: u32
  , pub backoff_multiplier: f32
  , pub initial_backoff: Duration
  , /// Bound on a single attempt; elapsing counts as a network failure
    pub attempt_timeout: Duration
}

impl RetryPolicy
{   /// Create a new retry policy
    pub fn new(
      max_retries: u32
    , backoff_multiplier: f32
    , initial_backoff_ms: u64
    ) -> Self
    {   RetryPolicy
        {   max_retries
          , backoff_multiplier
          , initial_backoff: Duration::from_millis(
              initial_backoff_ms
            )
          , attempt_timeout: Duration::from_secs(30)
        }
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self
    {   self.attempt_timeout = timeout;
        self
    }

    /// Calculate backoff duration for attempt number
    pub fn backoff_for_attempt(
      &self
    , attempt: u32
    ) -> Duration
    {   let multiplier
          = self.backoff_multiplier.powi(attempt as i32);
        Duration::from_millis(
          (self.initial_backoff.as_millis() as f32
            * multiplier) as u64
        )
    }
}

impl Default for RetryPolicy
{   /// 1s, 2s, 4s between attempts, 30s per attempt
    fn default() -> Self
    {   RetryPolicy::new(MAX_RETRIES, 2.0, 1000)
    }
}

/// Identifier of one logical call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

impl RequestId
{   /// Fresh id; never repeats within the process
    pub fn next() -> Self
    {   RequestId(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RequestId
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   write!(f, "req-{}", self.0)
    }
}

/// One logical call in flight. Owned by the call; never shared.
#[derive(Debug, Clone)]
pub struct RequestDescriptor
{   pub id: RequestId
  , pub endpoint: String
  , pub payload: ChatCompletionRequest
  , attempt_count: u32
}

impl RequestDescriptor
{   pub fn new(
      endpoint: impl Into<String>
    , payload: ChatCompletionRequest
    ) -> Self
    {   RequestDescriptor
        {   id: RequestId::next()
          , endpoint: endpoint.into()
          , payload
          , attempt_count: 0
        }
    }

    /// Retries performed so far
    pub fn attempt_count(&self) -> u32
    {   self.attempt_count
    }
}

/// Bookkept state of a call that has not reached a terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState
{   Attempting(u32)
  , Retrying(u32)
}

/// Drives descriptors through attempts, backing off between
/// transient failures.
pub struct RetryEngine
{   policy: RetryPolicy
  , store: ConfigStore
  , calls: Mutex<HashMap<RequestId, CallState>>
}

impl RetryEngine
{   pub fn new(store: ConfigStore, policy: RetryPolicy) -> Self
    {   RetryEngine
        {   policy
          , store
          , calls: Mutex::new(HashMap::new())
        }
    }

    pub fn policy(&self) -> &RetryPolicy
    {   &self.policy
    }

    /// Calls currently bookkept (not yet succeeded or failed)
    pub fn in_flight(&self) -> usize
    {   self.calls().len()
    }

    pub fn state_of(&self, id: RequestId) -> Option<CallState>
    {   self.calls().get(&id).copied()
    }

    /// Run `send` until it succeeds, fails terminally, or the
    /// retry ceiling is reached.
    ///
    /// `send` performs exactly one attempt and receives the API
    /// key read from the store just before that attempt.
    pub async fn execute<T, F, Fut>(
      &self
    , descriptor: &mut RequestDescriptor
    , mut send: F
    ) -> Result<T>
    where
      F: FnMut(&RequestDescriptor, String) -> Fut
    , Fut: Future<Output = std::result::Result<T, Failure>>
    {   let id = descriptor.id;
        // Dropping this future mid-call still clears the entry
        let _guard = CallGuard { engine: self, id };

        loop
        {   let attempt = descriptor.attempt_count;
            self.set_state(id, CallState::Attempting(attempt));
            debug!(
              "{} attempt {} to {}"
            , id, attempt + 1, descriptor.endpoint
            );

            let api_key = self.store.api_key();
            let outcome = match tokio::time::timeout(
              self.policy.attempt_timeout
            , send(&*descriptor, api_key)
            ).await
            {   Ok(outcome) => outcome
              , Err(_) => Err(Failure::transport(
                  "ETIMEDOUT"
                , format!(
                    "Request timed out after {}s"
                  , self.policy.attempt_timeout.as_secs()
                  )
                ))
            };

            let failure = match outcome
            {   Ok(response) => {
                  debug!("{} succeeded after {} retries", id, attempt);
                  return Ok(response);
                }
              , Err(failure) => failure
            };

            let classification = classify(&failure);
            if classification.is_retryable()
              && attempt < self.policy.max_retries
            {   let delay = self.policy.backoff_for_attempt(attempt);
                warn!(
                  "{} failed ({:?}: {}), retrying in {:?}"
                , id, classification, failure, delay
                );
                self.set_state(id, CallState::Retrying(attempt));
                tokio::time::sleep(delay).await;
                descriptor.attempt_count += 1;
                continue;
            }

            error!(
              "{} failed terminally after {} retries ({:?}): {}"
            , id, attempt, classification, failure
            );
            return Err(Error::Request
            {   classification
              , message: classification.user_message(&failure)
              , failure
            });
        }
    }

    fn calls(&self) -> MutexGuard<'_, HashMap<RequestId, CallState>>
    {   self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, id: RequestId, state: CallState)
    {   self.calls().insert(id, state);
    }

    fn forget(&self, id: RequestId)
    {   self.calls().remove(&id);
    }
}

/// Removes a call's bookkeeping however `execute` exits
struct CallGuard<'a>
{   engine: &'a RetryEngine
  , id: RequestId
}

impl Drop for CallGuard<'_>
{   fn drop(&mut self)
    {   self.engine.forget(self.id);
    }
}
