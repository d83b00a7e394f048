//! Response cache keyed by request body

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::trace;

use crate::clock::{Clock, SystemClock};
use crate::config::CacheSettings;
use crate::request::ChatCompletionResponse;

struct CacheEntry
{   response: ChatCompletionResponse
  , inserted_at: Instant
}

/// Fixed-TTL cache of successful responses. Capacity and TTL are
/// read from the settings passed on each call so a config change
/// applies without rebuilding the cache.
pub struct ResponseCache
{   clock: Arc<dyn Clock>
  , entries: Mutex<HashMap<String, CacheEntry>>
}

impl ResponseCache
{   pub fn new() -> Self
    {   ResponseCache::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self
    {   ResponseCache
        {   clock
          , entries: Mutex::new(HashMap::new())
        }
    }

    pub fn get(
      &self
    , key: &str
    , settings: &CacheSettings
    ) -> Option<ChatCompletionResponse>
    {   if !settings.enabled
        {   return None;
        }
        let ttl = Duration::from_secs(settings.ttl_seconds);
        let now = self.clock.now();
        let mut entries = self.lock();
        let fresh = entries.get(key)
          .map(|e| now.duration_since(e.inserted_at) < ttl);
        match fresh
        {   Some(true) => {
              trace!("Cache hit");
              entries.get(key).map(|e| e.response.clone())
            }
          , Some(false) => {
              trace!("Cache entry expired");
              entries.remove(key);
              None
            }
          , None => None
        }
    }

    pub fn insert(
      &self
    , key: String
    , response: ChatCompletionResponse
    , settings: &CacheSettings
    )
    {   if !settings.enabled || settings.max_entries == 0
        {   return;
        }
        let now = self.clock.now();
        let ttl = Duration::from_secs(settings.ttl_seconds);
        let mut entries = self.lock();
        entries.retain(|_, e| now.duration_since(e.inserted_at) < ttl);
        while entries.len() >= settings.max_entries
        {   let oldest = entries.iter()
              .min_by_key(|(_, e)| e.inserted_at)
              .map(|(k, _)| k.clone());
            match oldest
            {   Some(k) => {
                  trace!("Evicting oldest cache entry");
                  entries.remove(&k);
                }
              , None => break
            }
        }
        entries.insert(key, CacheEntry
        {   response
          , inserted_at: now
        });
    }

    pub fn len(&self) -> usize
    {   self.lock().len()
    }

    pub fn is_empty(&self) -> bool
    {   self.len() == 0
    }

    pub fn clear(&self)
    {   self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>>
    {   self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ResponseCache
{   fn default() -> Self
    {   ResponseCache::new()
    }
}
