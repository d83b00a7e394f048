//! Configuration snapshot and the store that owns it

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use log::{debug, info, warn};

use crate::error::{Error, Result};

/// Environment variable that overrides the configured API key
pub const API_KEY_ENV: &str = "CODEASSIST_API_KEY";

pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1";

/// Inline completion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompletionSettings
{   pub enabled: bool
  , /// Suggestions requested from the model per completion
    pub max_suggestions: u32
  , /// Editor-side typing debounce before a completion fires
    pub debounce_ms: u64
}

impl Default for CompletionSettings
{   fn default() -> Self
    {   CompletionSettings
        {   enabled: true
          , max_suggestions: 3
          , debounce_ms: 300
        }
    }
}

/// Hover explanation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HoverSettings
{   pub enabled: bool
  , pub include_examples: bool
}

impl Default for HoverSettings
{   fn default() -> Self
    {   HoverSettings
        {   enabled: true
          , include_examples: false
        }
    }
}

/// Chat panel settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatSettings
{   pub enabled: bool
  , /// Lines of surrounding code sent along with a question
    pub context_lines: u32
}

impl Default for ChatSettings
{   fn default() -> Self
    {   ChatSettings
        {   enabled: true
          , context_lines: 50
        }
    }
}

/// Code action (refactor) settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodeActionSettings
{   pub enabled: bool
  , pub show_in_context_menu: bool
}

impl Default for CodeActionSettings
{   fn default() -> Self
    {   CodeActionSettings
        {   enabled: true
          , show_in_context_menu: true
        }
    }
}

/// Response cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheSettings
{   pub enabled: bool
  , pub ttl_seconds: u64
  , pub max_entries: usize
}

impl Default for CacheSettings
{   fn default() -> Self
    {   CacheSettings
        {   enabled: true
          , ttl_seconds: 300
          , max_entries: 100
        }
    }
}

/// Immutable settings snapshot taken at request time.
///
/// `model` keeps the wire name so an unknown value survives
/// loading and is reported by [`crate::validate::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration
{   pub api_key: String
  , pub model: String
  , pub max_tokens: i64
  , pub temperature: f32
  , pub base_url: String
  , /// Upper bound for a single network attempt
    pub request_timeout_secs: u64
  , pub completion: CompletionSettings
  , pub hover: HoverSettings
  , pub chat: ChatSettings
  , pub code_actions: CodeActionSettings
  , pub cache: CacheSettings
}

impl Default for Configuration
{   fn default() -> Self
    {   Configuration
        {   api_key: String::new()
          , model: crate::Model::Coder.as_str().to_string()
          , max_tokens: 2048
          , temperature: 0.7
          , base_url: DEFAULT_BASE_URL.to_string()
          , request_timeout_secs: 30
          , completion: CompletionSettings::default()
          , hover: HoverSettings::default()
          , chat: ChatSettings::default()
          , code_actions: CodeActionSettings::default()
          , cache: CacheSettings::default()
        }
    }
}

impl Configuration
{   /// Parse a JSON settings document; missing fields take defaults
    pub fn from_json(text: &str) -> Result<Self>
    {   serde_json::from_str(text).map_err(|e| {
          Error::InvalidConfiguration(e.to_string())
        })
    }

    /// Replace the API key with [`API_KEY_ENV`] when it is set
    pub fn with_env_overrides(mut self) -> Self
    {   match std::env::var(API_KEY_ENV)
        {   Ok(key) if !key.trim().is_empty() => {
              debug!("API key taken from {}", API_KEY_ENV);
              self.api_key = key;
            }
          , _ => {}
        }
        self
    }
}

/// Owner of the current [`Configuration`].
///
/// Cheap to clone; clones share the same snapshot. Every change
/// publishes a fresh snapshot to subscribers.
#[derive(Clone)]
pub struct ConfigStore
{   tx: Arc<watch::Sender<Arc<Configuration>>>
}

impl ConfigStore
{   pub fn new(config: Configuration) -> Self
    {   let (tx, _rx) = watch::channel(Arc::new(config));
        ConfigStore { tx: Arc::new(tx) }
    }

    /// Load settings from a JSON file, applying env overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self>
    {   let path = path.as_ref();
        info!("Loading configuration from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        let config = Configuration::from_json(&text)?
          .with_env_overrides();
        Ok(ConfigStore::new(config))
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<Configuration>
    {   self.tx.borrow().clone()
    }

    /// Credential as of right now
    pub fn api_key(&self) -> String
    {   self.tx.borrow().api_key.clone()
    }

    /// Swap in a whole new configuration
    pub fn replace(&self, config: Configuration)
    {   debug!("Replacing configuration");
        self.tx.send_replace(Arc::new(config));
    }

    /// Set one setting by dotted camelCase path, e.g.
    /// `"apiKey"` or `"completion.enabled"`.
    ///
    /// The value must deserialize into the field's type; on
    /// failure the current snapshot is left untouched.
    pub fn update(
      &self
    , field: &str
    , value: serde_json::Value
    ) -> Result<()>
    {   debug!("Updating setting: {}", field);
        let mut outcome = Ok(());
        self.tx.send_if_modified(|current| {
          match apply_update(current, field, value)
          {   Ok(updated) => {
                *current = Arc::new(updated);
                true
              }
            , Err(e) => {
                warn!("Rejected update of {}: {}", field, e);
                outcome = Err(e);
                false
              }
          }
        });
        outcome
    }

    /// Change notification hook
    pub fn subscribe(&self) -> watch::Receiver<Arc<Configuration>>
    {   self.tx.subscribe()
    }
}

impl Default for ConfigStore
{   fn default() -> Self
    {   ConfigStore::new(Configuration::default())
    }
}

fn apply_update(
  current: &Configuration
, field: &str
, value: serde_json::Value
) -> Result<Configuration>
{   let mut root = serde_json::to_value(current)?;
    let mut slot = &mut root;
    for segment in field.split('.')
    {   slot = slot.get_mut(segment).ok_or_else(|| {
          Error::InvalidConfiguration(
            format!("Unknown setting: {}", field)
          )
        })?;
    }
    *slot = value;
    serde_json::from_value(root).map_err(|e| {
      Error::InvalidConfiguration(format!("{}: {}", field, e))
    })
}
