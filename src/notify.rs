//! User-facing notification collaborator

use async_trait::async_trait;
use log::{error, info, warn};

/// Action offered alongside an authentication failure
pub const ACTION_CONFIGURE_API_KEY: &str = "Configure API Key";
/// Action offered alongside an invalid configuration
pub const ACTION_OPEN_SETTINGS: &str = "Open Settings";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationSeverity
{   Info
  , Warning
  , Error
}

/// Presents a message to the user and reports which of the
/// offered actions, if any, was picked.
#[async_trait]
pub trait Notifier: Send + Sync
{   async fn notify(
      &self
    , severity: NotificationSeverity
    , message: &str
    , actions: &[&str]
    ) -> Option<String>;
}

/// Writes notifications to the log; never picks an action
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier
{   async fn notify(
      &self
    , severity: NotificationSeverity
    , message: &str
    , actions: &[&str]
    ) -> Option<String>
    {   match severity
        {   NotificationSeverity::Info => info!("{} {:?}", message, actions)
          , NotificationSeverity::Warning => warn!("{} {:?}", message, actions)
          , NotificationSeverity::Error => error!("{} {:?}", message, actions)
        }
        None
    }
}
