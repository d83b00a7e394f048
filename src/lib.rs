pub mod error;
pub mod config;
pub mod validate;
pub mod classify;
pub mod clock;
pub mod retry;
pub mod throttle;
pub mod cache;
pub mod request;
pub mod prompts;
pub mod providers;
pub mod notify;
pub mod orchestrator;
pub mod client;
use serde::{Deserialize, Serialize};

/*

codeassist: request orchestration for an editor code assistant.
An editor front end hands us code context; we turn it into a
validated, retried, classified chat-completion call and hand back
suggestions, explanations or refactorings.

codeassist/
├── src/
│   ├── lib.rs          # Channel API and re-exports
│   ├── config.rs       # Settings snapshot + store
│   ├── validate.rs     # Settings validation
│   ├── classify.rs     # Failure taxonomy
│   ├── retry.rs        # Backoff policy and retry engine
│   ├── throttle.rs     # Notification dedup
│   ├── cache.rs        # Response cache
│   ├── orchestrator.rs # complete / explain / refactor / probe
│   ├── client.rs       # Task-owning backend over channels
│   └── providers/      # Transports (reqwest)
└── tests/

*/

pub use client::AssistBackend;
pub use classify::{classify, ErrorClassification};
pub use config::{ConfigStore, Configuration};
pub use error::{Error, Failure, Result};
pub use orchestrator::Orchestrator;
pub use prompts::CompletionRequest;
pub use validate::{validate, ValidationResult};

/// Install the env_logger backend. `RUST_LOG` overrides the
/// default `info` filter. Safe to call more than once.
pub fn init_logging()
{   let _ = env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or("info")
    ).try_init();
}

/// CODEASSIST API INTERFACE:

// ===== Complete =====

pub type CompleteReply = Result<Vec<String>>;
pub type CompleteReplySender
  = tokio::sync::mpsc::UnboundedSender<CompleteReply>;

pub struct CompleteArgs
{   pub request: CompletionRequest
  , pub reply: CompleteReplySender
}

// ===== Explain =====

pub type ExplainReply = Result<String>;
pub type ExplainReplySender
  = tokio::sync::mpsc::UnboundedSender<ExplainReply>;

pub struct ExplainArgs
{   pub code: String
  , pub language: String
  , pub reply: ExplainReplySender
}

// ===== Refactor =====

pub type RefactorReply = Result<String>;
pub type RefactorReplySender
  = tokio::sync::mpsc::UnboundedSender<RefactorReply>;

pub struct RefactorArgs
{   pub code: String
  , pub language: String
  , pub instructions: Option<String>
  , pub reply: RefactorReplySender
}

// ===== TestConnection =====

pub type TestConnectionReplySender
  = tokio::sync::mpsc::UnboundedSender<bool>;

pub struct TestConnectionArgs
{   pub reply: TestConnectionReplySender
}

// ===== UpdateSetting =====

pub type UpdateSettingReply = Result<()>;
pub type UpdateSettingReplySender
  = tokio::sync::mpsc::UnboundedSender<UpdateSettingReply>;

pub struct UpdateSettingArgs
{   pub field: String
  , pub value: serde_json::Value
  , pub reply: UpdateSettingReplySender
}

// ===== KillProcess =====

pub type KillProcessReply = Result<()>;
pub type KillProcessReplySender
  = tokio::sync::mpsc::UnboundedSender<KillProcessReply>;

pub struct KillProcessArgs
{   pub reply: KillProcessReplySender
}

// ===== AssistHand (sender side) =====

pub struct AssistHand
{   pub complete_tx
      : tokio::sync::mpsc::UnboundedSender<CompleteArgs>
  , pub explain_tx
      : tokio::sync::mpsc::UnboundedSender<ExplainArgs>
  , pub refactor_tx
      : tokio::sync::mpsc::UnboundedSender<RefactorArgs>
  , pub test_connection_tx
      : tokio::sync::mpsc::UnboundedSender<TestConnectionArgs>
  , pub update_setting_tx
      : tokio::sync::mpsc::UnboundedSender<UpdateSettingArgs>
  , pub kill_process_tx
      : tokio::sync::mpsc::UnboundedSender<KillProcessArgs>
}

// ===== AssistFoot (receiver side) =====

pub struct AssistFoot
{   pub complete_rx
      : tokio::sync::mpsc::UnboundedReceiver<CompleteArgs>
  , pub explain_rx
      : tokio::sync::mpsc::UnboundedReceiver<ExplainArgs>
  , pub refactor_rx
      : tokio::sync::mpsc::UnboundedReceiver<RefactorArgs>
  , pub test_connection_rx
      : tokio::sync::mpsc::UnboundedReceiver<TestConnectionArgs>
  , pub update_setting_rx
      : tokio::sync::mpsc::UnboundedReceiver<UpdateSettingArgs>
  , pub kill_process_rx
      : tokio::sync::mpsc::UnboundedReceiver<KillProcessArgs>
}

/// CODEASSIST STRUCTURES:

/// Models the assistant may talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Hash)]
pub enum Model
{   /// Code-tuned model
    #[serde(rename = "deepseek-coder")]
    Coder
  , /// General chat model
    #[serde(rename = "deepseek-chat")]
    Chat
}

impl Model
{   pub const ALL: [Model; 2] = [Model::Coder, Model::Chat];

    /// Wire name sent in the `model` field
    pub fn as_str(&self) -> &'static str
    {   match self
        {   Model::Coder => "deepseek-coder"
          , Model::Chat => "deepseek-chat"
        }
    }

    pub fn from_name(name: &str) -> Option<Model>
    {   Model::ALL.into_iter().find(|m| m.as_str() == name)
    }

    pub fn names() -> Vec<&'static str>
    {   Model::ALL.iter().map(|m| m.as_str()).collect()
    }
}
