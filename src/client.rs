use std::sync::Arc;

use tokio::sync::mpsc;
use log::{debug, error, info};

use crate::error::Error;
use crate::orchestrator::Orchestrator;
use crate::AssistFoot;

/// Public API for the codeassist backend - owns the task
pub struct AssistBackend
{   hand: crate::AssistHand
  , _task_handle: tokio::task::JoinHandle<()>
}

fn disconnected<T>(_: T) -> Error
{   error!("Backend channel closed");
    Error::Other("Backend disconnected".to_string())
}

impl AssistBackend
{   /// Create and spawn a new backend around `orchestrator`.
    /// Returns immediately - spawns background task
    pub fn new(orchestrator: Orchestrator) -> Self
    {   debug!("Creating AssistBackend with task ownership");

        let (complete_tx, complete_rx)
          = mpsc::unbounded_channel();
        let (explain_tx, explain_rx)
          = mpsc::unbounded_channel();
        let (refactor_tx, refactor_rx)
          = mpsc::unbounded_channel();
        let (test_connection_tx, test_connection_rx)
          = mpsc::unbounded_channel();
        let (update_setting_tx, update_setting_rx)
          = mpsc::unbounded_channel();
        let (kill_process_tx, kill_process_rx)
          = mpsc::unbounded_channel();

        let hand = crate::AssistHand
        {   complete_tx
          , explain_tx
          , refactor_tx
          , test_connection_tx
          , update_setting_tx
          , kill_process_tx
        };

        let foot = crate::AssistFoot
        {   complete_rx
          , explain_rx
          , refactor_rx
          , test_connection_rx
          , update_setting_rx
          , kill_process_rx
        };

        let orchestrator = Arc::new(orchestrator);
        let _task_handle = tokio::spawn(async move {
          run_backend_loop(foot, orchestrator).await
        });

        AssistBackend
        {   hand
          , _task_handle
        }
    }

    /// Queue a completion - returns almost immediately
    pub async fn complete(
      &self
    , request: crate::CompletionRequest
    ) -> Result<mpsc::UnboundedReceiver<crate::CompleteReply>, Error>
    {   debug!("complete queuing for language: {}", request.language);
        let (reply, reply_rx) = mpsc::unbounded_channel();
        self.hand.complete_tx
          .send(crate::CompleteArgs { request, reply })
          .map_err(disconnected)?;
        Ok(reply_rx)
    }

    /// Queue an explanation - returns almost immediately
    pub async fn explain(
      &self
    , code: String
    , language: String
    ) -> Result<mpsc::UnboundedReceiver<crate::ExplainReply>, Error>
    {   debug!("explain queuing for language: {}", language);
        let (reply, reply_rx) = mpsc::unbounded_channel();
        self.hand.explain_tx
          .send(crate::ExplainArgs { code, language, reply })
          .map_err(disconnected)?;
        Ok(reply_rx)
    }

    /// Queue a refactor - returns almost immediately
    pub async fn refactor(
      &self
    , code: String
    , language: String
    , instructions: Option<String>
    ) -> Result<mpsc::UnboundedReceiver<crate::RefactorReply>, Error>
    {   debug!("refactor queuing for language: {}", language);
        let (reply, reply_rx) = mpsc::unbounded_channel();
        self.hand.refactor_tx
          .send(crate::RefactorArgs
          {   code
            , language
            , instructions
            , reply
          })
          .map_err(disconnected)?;
        Ok(reply_rx)
    }

    /// Queue a connectivity probe - returns almost immediately
    pub async fn test_connection(
      &self
    ) -> Result<mpsc::UnboundedReceiver<bool>, Error>
    {   debug!("test_connection queuing");
        let (reply, reply_rx) = mpsc::unbounded_channel();
        self.hand.test_connection_tx
          .send(crate::TestConnectionArgs { reply })
          .map_err(disconnected)?;
        Ok(reply_rx)
    }

    /// Queue a settings change - returns almost immediately
    pub async fn update_setting(
      &self
    , field: String
    , value: serde_json::Value
    ) -> Result<
        mpsc::UnboundedReceiver<crate::UpdateSettingReply>,
        Error
      >
    {   debug!("update_setting queuing for: {}", field);
        let (reply, reply_rx) = mpsc::unbounded_channel();
        self.hand.update_setting_tx
          .send(crate::UpdateSettingArgs { field, value, reply })
          .map_err(disconnected)?;
        Ok(reply_rx)
    }

    /// Gracefully shutdown the backend
    pub async fn shutdown(self) -> Result<(), Error>
    {   debug!("Shutting down AssistBackend");
        let (reply, mut reply_rx) = mpsc::unbounded_channel();

        self.hand.kill_process_tx
          .send(crate::KillProcessArgs { reply })
          .map_err(|_| {
            error!("Backend channel already closed");
            Error::Other("Backend already shutdown".to_string())
          })?;

        // Wait for shutdown confirmation
        if let Some(result) = reply_rx.recv().await
        {   debug!("Backend shutdown confirmed");
            result
        } else
        {   error!("Backend exited without confirming shutdown");
            Err(Error::Other("Backend exited".to_string()))
        }
    }
}

/// Main backend event loop
///
/// tokio::select! only routes. Every operation runs on its own
/// task so independent logical calls are in flight together and a
/// backoff in one never stalls another.
async fn run_backend_loop(
  foot: AssistFoot
, orchestrator: Arc<Orchestrator>
)
{   debug!("Starting AssistBackend event loop");
    let AssistFoot
    {   mut complete_rx
      , mut explain_rx
      , mut refactor_rx
      , mut test_connection_rx
      , mut update_setting_rx
      , mut kill_process_rx
    } = foot;

    loop
    { tokio::select!
      { Some(cmd) = complete_rx.recv() => {
          debug!("Received Complete");
          let orchestrator = Arc::clone(&orchestrator);
          tokio::spawn(async move {
            let result = orchestrator.complete(&cmd.request).await;
            let _ = cmd.reply.send(result);
          });
        }
      , Some(cmd) = explain_rx.recv() => {
          debug!("Received Explain");
          let orchestrator = Arc::clone(&orchestrator);
          tokio::spawn(async move {
            let result = orchestrator
              .explain(&cmd.code, &cmd.language)
              .await;
            let _ = cmd.reply.send(result);
          });
        }
      , Some(cmd) = refactor_rx.recv() => {
          debug!("Received Refactor");
          let orchestrator = Arc::clone(&orchestrator);
          tokio::spawn(async move {
            let result = orchestrator
              .refactor(
                &cmd.code
              , &cmd.language
              , cmd.instructions.as_deref()
              )
              .await;
            let _ = cmd.reply.send(result);
          });
        }
      , Some(cmd) = test_connection_rx.recv() => {
          debug!("Received TestConnection");
          let orchestrator = Arc::clone(&orchestrator);
          tokio::spawn(async move {
            let ok = orchestrator.test_connection().await;
            let _ = cmd.reply.send(ok);
          });
        }
      , Some(cmd) = update_setting_rx.recv() => {
          debug!("Received UpdateSetting for: {}", cmd.field);
          let result = orchestrator.store()
            .update(&cmd.field, cmd.value);
          let _ = cmd.reply.send(result);
        }
      , Some(cmd) = kill_process_rx.recv() => {
          debug!("Received KillProcess");
          let _ = cmd.reply.send(Ok(()));
          info!("AssistBackend shutting down");
          break;
        }
      , else => {
          debug!("All command channels closed");
          break;
        }
      }
    }
}
