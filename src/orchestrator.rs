//! Entry point turning editor operations into retried,
//! classified chat-completion calls

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use log::{debug, info, warn};

use crate::cache::ResponseCache;
use crate::classify::ErrorClassification;
use crate::clock::Clock;
use crate::config::{ConfigStore, Configuration};
use crate::error::{Error, Failure, Result};
use crate::notify::{
  LogNotifier
, NotificationSeverity
, Notifier
, ACTION_CONFIGURE_API_KEY
, ACTION_OPEN_SETTINGS
};
use crate::prompts::{self, CompletionRequest, COMPLETION_MAX_TOKENS};
use crate::providers::{HttpTransport, Transport};
use crate::request::{
  ChatCompletionRequest
, ChatCompletionResponse
, CHAT_COMPLETIONS_PATH
};
use crate::retry::{RequestDescriptor, RetryEngine, RetryPolicy};
use crate::throttle::NotificationThrottle;
use crate::validate::{self, ValidationResult, MAX_MAX_TOKENS, MIN_MAX_TOKENS};

const PROBE_MAX_TOKENS: u32 = 10;

/// Operation kinds; the name doubles as the throttle context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation
{   Complete
  , Explain
  , Refactor
  , Probe
}

impl Operation
{   pub fn as_str(&self) -> &'static str
    {   match self
        {   Operation::Complete => "complete"
          , Operation::Explain => "explain"
          , Operation::Refactor => "refactor"
          , Operation::Probe => "probe"
        }
    }

    fn is_enabled(&self, config: &Configuration) -> bool
    {   match self
        {   Operation::Complete => config.completion.enabled
          , Operation::Explain => config.hover.enabled || config.chat.enabled
          , Operation::Refactor => config.code_actions.enabled
          , Operation::Probe => true
        }
    }
}

/// Runs complete / explain / refactor / probe against the
/// configured endpoint.
pub struct Orchestrator
{   store: ConfigStore
  , config_rx: Mutex<watch::Receiver<Arc<Configuration>>>
  , engine: RetryEngine
  , throttle: NotificationThrottle
  , cache: ResponseCache
  , transport: Arc<dyn Transport>
  , notifier: Arc<dyn Notifier>
}

impl Orchestrator
{   /// Orchestrator talking HTTP, timeouts taken from the config
    pub fn new(store: ConfigStore) -> Result<Self>
    {   let timeout = Duration::from_secs(
          store.snapshot().request_timeout_secs
        );
        let transport = HttpTransport::new(timeout)?;
        Ok(Orchestrator::with_transport(store, Arc::new(transport)))
    }

    /// Attempts are bounded by `requestTimeoutSecs` as loaded
    pub fn with_transport(
      store: ConfigStore
    , transport: Arc<dyn Transport>
    ) -> Self
    {   debug!("Creating Orchestrator");
        let timeout = Duration::from_secs(
          store.snapshot().request_timeout_secs
        );
        let policy = RetryPolicy::default().with_attempt_timeout(timeout);
        Orchestrator
        {   config_rx: Mutex::new(store.subscribe())
          , engine: RetryEngine::new(store.clone(), policy)
          , store
          , throttle: NotificationThrottle::new()
          , cache: ResponseCache::new()
          , transport
          , notifier: Arc::new(LogNotifier)
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self
    {   self.engine = RetryEngine::new(self.store.clone(), policy);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self
    {   self.notifier = notifier;
        self
    }

    /// Time source for the throttle and cache
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self
    {   self.throttle = NotificationThrottle::with_clock(clock.clone());
        self.cache = ResponseCache::with_clock(clock);
        self
    }

    pub fn store(&self) -> &ConfigStore
    {   &self.store
    }

    pub fn engine(&self) -> &RetryEngine
    {   &self.engine
    }

    pub fn throttle(&self) -> &NotificationThrottle
    {   &self.throttle
    }

    pub fn cache(&self) -> &ResponseCache
    {   &self.cache
    }

    /// Validate the current snapshot
    pub fn validate(&self) -> ValidationResult
    {   validate::validate(&self.store.snapshot())
    }

    /// Inline completion suggestions for the code before the cursor
    pub async fn complete(
      &self
    , request: &CompletionRequest
    ) -> Result<Vec<String>>
    {   let config = self.ready(Operation::Complete).await?;
        let max_tokens = bounded_max_tokens(&config)
          .min(COMPLETION_MAX_TOKENS);
        let body = ChatCompletionRequest::new(
          config.model.clone()
        , prompts::completion_messages(request)
        , max_tokens
        , config.temperature
        );
        let response = self.run(Operation::Complete, &config, body).await?;
        Ok(prompts::parse_completion_response(&response))
    }

    /// Natural-language explanation of a snippet
    pub async fn explain(
      &self
    , code: &str
    , language: &str
    ) -> Result<String>
    {   let config = self.ready(Operation::Explain).await?;
        let body = ChatCompletionRequest::new(
          config.model.clone()
        , prompts::explanation_messages(
            code
          , language
          , config.hover.include_examples
          )
        , bounded_max_tokens(&config)
        , config.temperature
        );
        let response = self.run(Operation::Explain, &config, body).await?;
        Ok(prompts::parse_explanation_response(&response))
    }

    /// Refactoring suggestion for a snippet
    pub async fn refactor(
      &self
    , code: &str
    , language: &str
    , instructions: Option<&str>
    ) -> Result<String>
    {   let config = self.ready(Operation::Refactor).await?;
        let body = ChatCompletionRequest::new(
          config.model.clone()
        , prompts::refactor_messages(code, language, instructions)
        , bounded_max_tokens(&config)
        , config.temperature
        );
        let response = self.run(Operation::Refactor, &config, body).await?;
        Ok(prompts::parse_refactor_response(&response))
    }

    /// Minimal request to check credentials and reachability.
    /// Failures are logged and classified, never returned.
    pub async fn test_connection(&self) -> bool
    {   let config = self.current_config();
        let validation = validate::validate(&config);
        if !validation.is_valid
        {   warn!(
              "Connection test skipped, configuration invalid: {:?}"
            , validation.errors
            );
            return false;
        }
        let body = ChatCompletionRequest::new(
          config.model.clone()
        , prompts::probe_messages()
        , PROBE_MAX_TOKENS
        , 0.0
        );
        match self.send(&config, body).await
        {   Ok(_) => {
              info!("Connection test succeeded");
              true
            }
          , Err(e) => {
              warn!(
                "Connection test failed ({:?}): {}"
              , e.classification().unwrap_or(ErrorClassification::Unknown)
              , e
              );
              false
            }
        }
    }

    /// Snapshot for an operation, after validation and feature gating
    async fn ready(&self, operation: Operation)
      -> Result<Arc<Configuration>>
    {   let config = self.current_config();
        let validation = validate::validate(&config);
        if !validation.is_valid
        {   let err = Error::ConfigurationInvalid(validation.errors);
            let failure = Failure::Text(err.to_string());
            self.surface(
              operation
            , &failure
            , &err.to_string()
            , &[ACTION_OPEN_SETTINGS]
            ).await;
            return Err(err);
        }
        for warning in &validation.warnings
        {   debug!("Configuration warning: {}: {}", warning.field, warning.message);
        }
        if !operation.is_enabled(&config)
        {   debug!("{} is disabled", operation.as_str());
            return Err(Error::FeatureDisabled(
              operation.as_str().to_string()
            ));
        }
        Ok(config)
    }

    /// Cached or fresh response, surfacing terminal failures
    async fn run(
      &self
    , operation: Operation
    , config: &Configuration
    , body: ChatCompletionRequest
    ) -> Result<ChatCompletionResponse>
    {   let cache_key = serde_json::to_string(&body)?;
        if let Some(hit) = self.cache.get(&cache_key, &config.cache)
        {   debug!("{} served from cache", operation.as_str());
            return Ok(hit);
        }

        match self.send(config, body).await
        {   Ok(response) => {
              self.cache.insert(cache_key, response.clone(), &config.cache);
              Ok(response)
            }
          , Err(err) => {
              if let Error::Request { classification, message, failure } = &err
              {   let actions: &[&str] = match classification
                  {   ErrorClassification::Authentication => {
                        &[ACTION_CONFIGURE_API_KEY][..]
                      }
                    , _ => &[][..]
                  };
                  self.surface(operation, failure, message, actions).await;
              }
              Err(err)
            }
        }
    }

    /// One logical call through the retry engine
    async fn send(
      &self
    , config: &Configuration
    , body: ChatCompletionRequest
    ) -> Result<ChatCompletionResponse>
    {   let endpoint = format!(
          "{}{}"
        , config.base_url.trim_end_matches('/')
        , CHAT_COMPLETIONS_PATH
        );
        let mut descriptor = RequestDescriptor::new(endpoint, body);
        let transport = Arc::clone(&self.transport);
        let response = self.engine.execute(
          &mut descriptor
        , move |d, api_key| {
            let transport = Arc::clone(&transport);
            let endpoint = d.endpoint.clone();
            let payload = d.payload.clone();
            async move {
              transport.send(&endpoint, &api_key, &payload).await
            }
          }
        ).await?;

        if let Some(usage) = response.usage
        {   debug!(
              "Token usage: prompt={} completion={} total={}"
            , usage.prompt_tokens
            , usage.completion_tokens
            , usage.total_tokens
            );
        }
        Ok(response)
    }

    /// Tell the user about a failure unless the throttle says no
    async fn surface(
      &self
    , operation: Operation
    , failure: &Failure
    , message: &str
    , actions: &[&str]
    )
    {   if !self.throttle.observe(failure, operation.as_str())
        {   debug!("Notification suppressed for {}", operation.as_str());
            return;
        }
        if let Some(choice) = self.notifier
          .notify(NotificationSeverity::Error, message, actions)
          .await
        {   info!("User chose action: {}", choice);
        }
    }

    /// Latest snapshot; a change since the last call drops the cache
    fn current_config(&self) -> Arc<Configuration>
    {   let mut rx = self.config_rx.lock().unwrap_or_else(|e| e.into_inner());
        if rx.has_changed().unwrap_or(false)
        {   debug!("Configuration changed, clearing response cache");
            self.cache.clear();
        }
        let config = rx.borrow_and_update().clone();
        config
    }
}

/// Configured max tokens; validation has already enforced the range
fn bounded_max_tokens(config: &Configuration) -> u32
{   config.max_tokens.clamp(MIN_MAX_TOKENS, MAX_MAX_TOKENS) as u32
}
