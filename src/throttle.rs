//! Deduplication of user-facing error notifications

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::clock::{Clock, SystemClock};
use crate::error::Failure;

/// Notifications allowed per key inside one window
pub const NOTIFY_THRESHOLD: u32 = 5;
/// Lifetime of a record, counted from its creation
pub const RECORD_TTL: Duration = Duration::from_secs(5 * 60);
/// Characters of the message that take part in the key
pub const KEY_MESSAGE_CHARS: usize = 50;

/// Occurrences of one error key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord
{   pub key: String
  , pub count: u32
  , pub first_seen_at: Instant
}

/// Counts occurrences per key and decides whether the user
/// should hear about another one.
pub struct NotificationThrottle
{   clock: Arc<dyn Clock>
  , threshold: u32
  , ttl: Duration
  , records: Mutex<HashMap<String, ErrorRecord>>
}

impl NotificationThrottle
{   pub fn new() -> Self
    {   NotificationThrottle::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self
    {   NotificationThrottle
        {   clock
          , threshold: NOTIFY_THRESHOLD
          , ttl: RECORD_TTL
          , records: Mutex::new(HashMap::new())
        }
    }

    /// `context:` followed by the first 50 chars of the message
    pub fn key_for(failure: &Failure, context: &str) -> String
    {   let message: String = failure.message()
          .chars()
          .take(KEY_MESSAGE_CHARS)
          .collect();
        format!("{}:{}", context, message)
    }

    /// Whether the next occurrence may reach the user. Does not
    /// count the occurrence; see [`record`](Self::record).
    pub fn should_notify(&self, failure: &Failure, context: &str) -> bool
    {   let key = Self::key_for(failure, context);
        let count = self.live_records()
          .get(&key)
          .map_or(0, |r| r.count);
        let allowed = count < self.threshold;
        trace!("Notify {} (seen {}): {}", key, count, allowed);
        allowed
    }

    /// Count one occurrence; returns the count after incrementing
    pub fn record(&self, failure: &Failure, context: &str) -> u32
    {   let key = Self::key_for(failure, context);
        let now = self.clock.now();
        let mut records = self.live_records();
        let record = records.entry(key.clone()).or_insert_with(|| {
          debug!("New error record: {}", key);
          ErrorRecord
          {   key
            , count: 0
            , first_seen_at: now
          }
        });
        record.count += 1;
        record.count
    }

    /// [`should_notify`](Self::should_notify) then
    /// [`record`](Self::record) under one lock, so concurrent
    /// callers never admit more than `threshold` notifications
    pub fn observe(&self, failure: &Failure, context: &str) -> bool
    {   let key = Self::key_for(failure, context);
        let now = self.clock.now();
        let mut records = self.live_records();
        let record = records.entry(key.clone()).or_insert_with(|| {
          debug!("New error record: {}", key);
          ErrorRecord
          {   key: key.clone()
            , count: 0
            , first_seen_at: now
          }
        });
        let allowed = record.count < self.threshold;
        trace!("Notify {} (seen {}): {}", key, record.count, allowed);
        record.count += 1;
        allowed
    }

    /// Live record for a key, if any
    pub fn get(&self, key: &str) -> Option<ErrorRecord>
    {   self.live_records().get(key).cloned()
    }

    /// Number of live records
    pub fn len(&self) -> usize
    {   self.live_records().len()
    }

    pub fn is_empty(&self) -> bool
    {   self.len() == 0
    }

    pub fn clear(&self)
    {   self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ErrorRecord>>
    {   self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Table with expired records already dropped
    fn live_records(&self)
      -> MutexGuard<'_, HashMap<String, ErrorRecord>>
    {   let now = self.clock.now();
        let ttl = self.ttl;
        let mut records = self.lock();
        records.retain(|key, r| {
          let live = now.duration_since(r.first_seen_at) < ttl;
          if !live
          {   debug!("Error record expired: {}", key);
          }
          live
        });
        records
    }
}

impl Default for NotificationThrottle
{   fn default() -> Self
    {   NotificationThrottle::new()
    }
}
