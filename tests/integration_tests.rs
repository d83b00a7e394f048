mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use codeassist::classify::ErrorClassification;
use codeassist::error::{Error, Failure};
use codeassist::notify::{
  NotificationSeverity
, ACTION_CONFIGURE_API_KEY
, ACTION_OPEN_SETTINGS
};
use codeassist::prompts::{NO_EXPLANATION, NO_REFACTORING};
use codeassist::request::Role;
use codeassist::{
  AssistBackend
, CompletionRequest
, ConfigStore
, Configuration
, Orchestrator
};

use common::{
  empty_response
, response_with
, valid_config
, RecordingNotifier
, ScriptedTransport
, VALID_KEY
};

fn orchestrator(
  config: Configuration
, transport: Arc<ScriptedTransport>
) -> (Orchestrator, Arc<RecordingNotifier>)
{   let notifier = Arc::new(RecordingNotifier::default());
    let orchestrator = Orchestrator::with_transport(
      ConfigStore::new(config)
    , transport
    ).with_notifier(notifier.clone());
    (orchestrator, notifier)
}

#[tokio::test]
async fn test_completion_end_to_end()
{   let transport = Arc::new(ScriptedTransport::always(
      Ok(response_with("a\nb\n\nc\n"))
    ));
    let (orchestrator, _) = orchestrator(valid_config(), transport.clone());

    let request = CompletionRequest::new(
      "def add(a, b):\n    return a +"
    , "python"
    , 3
    );
    let suggestions = assert_ok!(orchestrator.complete(&request).await);

    assert_eq!(suggestions, ["a", "b", "c"]);
    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].endpoint, "http://assist.test/v1/chat/completions");
    assert_eq!(sent[0].api_key, VALID_KEY);
    assert!(sent[0].body.max_tokens.unwrap() <= 1024);
    assert_eq!(sent[0].body.model, "deepseek-coder");
    assert_eq!(sent[0].body.messages[0].role, Role::System);
    assert!(sent[0].body.messages[1].content.contains("return a +"));
}

#[tokio::test]
async fn test_completion_keeps_smaller_configured_budget()
{   let transport = Arc::new(ScriptedTransport::always(Ok(response_with("x"))));
    let config = Configuration { max_tokens: 256, ..valid_config() };
    let (orchestrator, _) = orchestrator(config, transport.clone());

    let request = CompletionRequest::new("fn main() {", "rust", 1);
    assert_ok!(orchestrator.complete(&request).await);
    assert_eq!(transport.sent()[0].body.max_tokens, Some(256));
}

#[tokio::test]
async fn test_invalid_configuration_blocks_network()
{   let transport = Arc::new(ScriptedTransport::always(Ok(response_with("x"))));
    let config = Configuration { api_key: String::new(), ..valid_config() };
    let (orchestrator, notifier) = orchestrator(config, transport.clone());

    let err = assert_err!(orchestrator.explain("x = 1", "python").await);
    match err
    {   Error::ConfigurationInvalid(issues) => {
          assert_eq!(issues.len(), 1);
          assert_eq!(issues[0].field, "apiKey");
        }
      , other => panic!("unexpected error: {:?}", other)
    }
    assert_eq!(transport.calls(), 0);
    assert!(!orchestrator.test_connection().await);
    assert_eq!(transport.calls(), 0);

    let seen = notifier.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].2, [ACTION_OPEN_SETTINGS]);
}

#[tokio::test]
async fn test_disabled_feature_sends_nothing()
{   let transport = Arc::new(ScriptedTransport::always(Ok(response_with("x"))));
    let (orchestrator, _) = orchestrator(valid_config(), transport.clone());
    orchestrator.store().update("codeActions.enabled", json!(false)).unwrap();
    orchestrator.store().update("completion.enabled", json!(false)).unwrap();

    assert_eq!(
      orchestrator.refactor("x", "python", None).await
    , Err(Error::FeatureDisabled("refactor".to_string()))
    );
    let request = CompletionRequest::new("x", "python", 3);
    assert!(matches!(
      orchestrator.complete(&request).await
    , Err(Error::FeatureDisabled(_))
    ));
    assert_eq!(transport.calls(), 0);
    assert!(orchestrator.test_connection().await);
}

#[tokio::test]
async fn test_explain_needs_hover_or_chat()
{   let transport = Arc::new(ScriptedTransport::always(Ok(response_with("ok"))));
    let (orchestrator, _) = orchestrator(valid_config(), transport.clone());
    orchestrator.store().update("hover.enabled", json!(false)).unwrap();
    assert_ok!(orchestrator.explain("x", "python").await);

    orchestrator.store().update("chat.enabled", json!(false)).unwrap();
    assert!(matches!(
      orchestrator.explain("x", "python").await
    , Err(Error::FeatureDisabled(_))
    ));
}

#[tokio::test]
async fn test_authentication_failure_is_surfaced_once_per_call()
{   let transport = Arc::new(ScriptedTransport::always(Err(Failure::status(401))));
    let (orchestrator, notifier) = orchestrator(valid_config(), transport.clone());

    let err = assert_err!(orchestrator.explain("x", "python").await);
    assert_eq!(err.classification(), Some(ErrorClassification::Authentication));
    assert_eq!(transport.calls(), 1);

    let seen = notifier.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, NotificationSeverity::Error);
    assert_eq!(seen[0].1, "Invalid API key. Please check your configuration.");
    assert_eq!(seen[0].2, [ACTION_CONFIGURE_API_KEY]);
}

#[tokio::test]
async fn test_repeated_failures_notify_five_times()
{   let transport = Arc::new(ScriptedTransport::always(Err(Failure::status(400))));
    let (orchestrator, notifier) = orchestrator(valid_config(), transport.clone());

    for _ in 0..7
    {   assert_err!(orchestrator.refactor("x", "python", None).await);
    }
    assert_eq!(transport.calls(), 7);
    assert_eq!(notifier.seen().len(), 5);
    assert!(!orchestrator.throttle().should_notify(&Failure::status(400), "refactor"));
    assert!(orchestrator.throttle().should_notify(&Failure::status(400), "explain"));
}

#[tokio::test(start_paused = true)]
async fn test_transient_failure_recovers()
{   let transport = Arc::new(ScriptedTransport::new(
      vec![Err(Failure::status(503))]
    , Ok(response_with("  Adds two numbers.\n"))
    ));
    let (orchestrator, notifier) = orchestrator(valid_config(), transport.clone());

    let explanation = assert_ok!(orchestrator.explain("a + b", "python").await);
    assert_eq!(explanation, "Adds two numbers.");
    assert_eq!(transport.calls(), 2);
    assert!(notifier.seen().is_empty());
    assert_eq!(orchestrator.engine().in_flight(), 0);
}

#[tokio::test]
async fn test_sentinels_without_choices()
{   let transport = Arc::new(ScriptedTransport::always(Ok(empty_response())));
    let config = Configuration
    {   cache: codeassist::config::CacheSettings
        {   enabled: false
          , ..Default::default()
        }
      , ..valid_config()
    };
    let (orchestrator, _) = orchestrator(config, transport.clone());

    assert_eq!(
      assert_ok!(orchestrator.explain("x", "python").await)
    , NO_EXPLANATION
    );
    assert_eq!(
      assert_ok!(orchestrator.refactor("x", "python", Some("inline it")).await)
    , NO_REFACTORING
    );
    let request = CompletionRequest::new("x", "python", 3);
    assert!(assert_ok!(orchestrator.complete(&request).await).is_empty());
}

#[tokio::test]
async fn test_connection_probe()
{   let transport = Arc::new(ScriptedTransport::always(Ok(response_with("hi"))));
    let (orchestrator, _) = orchestrator(valid_config(), transport.clone());

    assert!(orchestrator.test_connection().await);
    let body = &transport.sent()[0].body;
    assert_eq!(body.max_tokens, Some(10));
    assert_eq!(body.temperature, Some(0.0));
}

#[tokio::test]
async fn test_connection_probe_swallows_failures()
{   let transport = Arc::new(ScriptedTransport::always(Err(Failure::status(401))));
    let (orchestrator, notifier) = orchestrator(valid_config(), transport.clone());

    assert!(!orchestrator.test_connection().await);
    assert_eq!(transport.calls(), 1);
    assert!(notifier.seen().is_empty());
}

#[tokio::test]
async fn test_cache_serves_repeats_until_config_changes()
{   let transport = Arc::new(ScriptedTransport::always(Ok(response_with("cached"))));
    let (orchestrator, _) = orchestrator(valid_config(), transport.clone());

    assert_ok!(orchestrator.explain("x", "python").await);
    assert_ok!(orchestrator.explain("x", "python").await);
    assert_eq!(transport.calls(), 1);

    assert_ok!(orchestrator.explain("y", "python").await);
    assert_eq!(transport.calls(), 2);

    orchestrator.store().update("hover.includeExamples", json!(true)).unwrap();
    orchestrator.store().update("hover.includeExamples", json!(false)).unwrap();
    assert_ok!(orchestrator.explain("x", "python").await);
    assert_eq!(transport.calls(), 3);
}

#[tokio::test]
async fn test_backend_routes_commands()
{   let transport = Arc::new(ScriptedTransport::always(Ok(response_with("one\ntwo"))));
    let (orchestrator, _) = orchestrator(valid_config(), transport.clone());
    let backend = AssistBackend::new(orchestrator);

    let mut rx = backend
      .complete(CompletionRequest::new("let x =", "rust", 2))
      .await
      .unwrap();
    let suggestions = rx.recv().await.unwrap().unwrap();
    assert_eq!(suggestions, ["one", "two"]);

    let mut rx = backend
      .update_setting("apiKey".to_string(), json!(""))
      .await
      .unwrap();
    assert_ok!(rx.recv().await.unwrap());

    let mut rx = backend.test_connection().await.unwrap();
    assert_eq!(rx.recv().await, Some(false));

    let mut rx = backend
      .explain("x".to_string(), "python".to_string())
      .await
      .unwrap();
    assert!(matches!(
      rx.recv().await
    , Some(Err(Error::ConfigurationInvalid(_)))
    ));

    assert_ok!(backend.shutdown().await);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_attempt_timeout_follows_configuration()
{   let transport = Arc::new(ScriptedTransport::always(Ok(response_with("x"))));
    let config = Configuration { request_timeout_secs: 5, ..valid_config() };
    let (configured, _) = orchestrator(config, transport);
    assert_eq!(
      configured.engine().policy().attempt_timeout
    , Duration::from_secs(5)
    );

    let transport = Arc::new(ScriptedTransport::always(Ok(response_with("x"))));
    let (defaulted, _) = orchestrator(valid_config(), transport);
    assert_eq!(
      defaulted.engine().policy().attempt_timeout
    , Duration::from_secs(30)
    );
}
