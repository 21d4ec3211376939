use std::sync::Arc;
use std::time::Instant;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use turnstile_keys::CredentialPool;
use turnstile_models::{Mode, ModeTable};

use crate::error::DispatchError;
use crate::provider::{ChatMessage, CompletionProvider};

/// A completed dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub text: String,
    /// The chain entry that actually produced the answer
    pub model_id: String,
}

/// Walks a mode's fallback chain until an attempt succeeds
pub struct Dispatcher {
    provider: Arc<dyn CompletionProvider>,
    models: Arc<ModeTable>,
    keys: Arc<CredentialPool>,
}

impl Dispatcher {
    pub fn new(provider: Arc<dyn CompletionProvider>, models: Arc<ModeTable>, keys: Arc<CredentialPool>) -> Self {
        Self {
            provider,
            models,
            keys,
        }
    }

    /// Dispatch a completion along the mode's chain
    ///
    /// Each attempt runs under the mode's timeout with a freshly rotated
    /// credential; the chain as a whole runs under the global budget.
    /// `cancel` aborts an in-flight attempt immediately, discarding any
    /// partially streamed output.
    pub async fn dispatch(
        &self,
        mode: Mode,
        messages: &[ChatMessage],
        cancel: &CancellationToken,
    ) -> Result<DispatchOutcome, DispatchError> {
        let chain = self.models.chain_for(mode);
        let attempt_timeout = self.models.timeout_for(mode);
        let budget = self.models.global_budget();
        let started = Instant::now();

        let mut last_error = None;

        for model_id in chain {
            let elapsed = started.elapsed();
            if elapsed >= budget {
                tracing::warn!(
                    %mode,
                    model_id,
                    ?elapsed,
                    "global budget exhausted before attempting next chain entry"
                );
                return Err(DispatchError::BudgetExhausted { budget });
            }

            let credential = self.keys.pick()?;
            // An attempt may not outlive what is left of the budget
            let this_timeout = attempt_timeout.min(budget - elapsed);

            tracing::debug!(%mode, model_id, slot = credential.slot(), "attempting chain entry");

            let attempt = async {
                let mut stream = self
                    .provider
                    .complete_stream(model_id, messages, credential)
                    .await?;

                let mut text = String::new();
                while let Some(chunk) = stream.next().await {
                    text.push_str(&chunk?);
                }
                Ok::<_, DispatchError>(text)
            };

            let outcome = tokio::select! {
                () = cancel.cancelled() => Err(DispatchError::Cancelled),
                bounded = tokio::time::timeout(this_timeout, attempt) => match bounded {
                    Ok(result) => result,
                    Err(_) => Err(DispatchError::AttemptTimeout {
                        model_id: model_id.clone(),
                        after: this_timeout,
                    }),
                },
            };

            match outcome {
                Ok(text) => {
                    tracing::info!(%mode, model_id, "dispatch succeeded");
                    return Ok(DispatchOutcome {
                        text,
                        model_id: model_id.clone(),
                    });
                }
                Err(e) if e.is_retryable() => {
                    tracing::warn!(%mode, model_id, error = %e, "attempt failed, falling through chain");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        // The chain is never empty, so at least one attempt recorded an error
        Err(last_error.unwrap_or_else(|| DispatchError::BudgetExhausted { budget }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use secrecy::SecretString;
    use turnstile_config::{CredentialsConfig, ModeConfig, ModelsConfig};

    use crate::provider::ChunkStream;

    #[derive(Clone, Copy)]
    enum Script {
        Succeed,
        FailUpstream,
        Stall,
    }

    struct ScriptedProvider {
        scripts: HashMap<String, Script>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(scripts: &[(&str, Script)]) -> Self {
            Self {
                scripts: scripts.iter().map(|(m, s)| ((*m).to_owned(), *s)).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        async fn complete_stream(
            &self,
            model_id: &str,
            _messages: &[ChatMessage],
            _credential: &turnstile_keys::Credential,
        ) -> Result<ChunkStream, DispatchError> {
            self.calls.lock().unwrap().push(model_id.to_owned());

            match self.scripts.get(model_id).copied().unwrap_or(Script::Succeed) {
                Script::Succeed => {
                    let chunks: Vec<Result<String, DispatchError>> = vec![Ok(format!("answer from {model_id}"))];
                    Ok(Box::pin(futures::stream::iter(chunks)))
                }
                Script::FailUpstream => Err(DispatchError::Upstream {
                    model_id: model_id.to_owned(),
                    message: "503 service unavailable".to_owned(),
                }),
                Script::Stall => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    unreachable!("stalled attempt must be cut off by timeout or cancellation")
                }
            }
        }
    }

    fn models(chain: &[&str], timeout: &str, budget: &str) -> Arc<ModeTable> {
        let mode = ModeConfig {
            chain: chain.iter().map(|m| (*m).to_owned()).collect(),
            timeout: timeout.to_owned(),
        };
        let config = ModelsConfig {
            global_budget: budget.to_owned(),
            quick: mode.clone(),
            normal: mode.clone(),
            thinking: mode.clone(),
            vision: mode,
        };
        Arc::new(ModeTable::from_config(&config).unwrap())
    }

    fn keys() -> Arc<CredentialPool> {
        Arc::new(CredentialPool::from_config(&CredentialsConfig {
            keys: vec![SecretString::from("sk-test".to_owned())],
            prefix: "sk-".to_owned(),
        }))
    }

    fn dispatcher(provider: Arc<ScriptedProvider>, models: Arc<ModeTable>) -> Dispatcher {
        Dispatcher::new(provider, models, keys())
    }

    #[tokio::test]
    async fn primary_success_uses_no_fallback() {
        let provider = Arc::new(ScriptedProvider::new(&[("a", Script::Succeed)]));
        let d = dispatcher(Arc::clone(&provider), models(&["a", "b"], "1s", "5s"));

        let outcome = d
            .dispatch(Mode::Quick, &[ChatMessage::user("hi")], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.model_id, "a");
        assert_eq!(outcome.text, "answer from a");
        assert_eq!(provider.calls(), vec!["a"]);
    }

    #[tokio::test]
    async fn upstream_failure_falls_through_chain() {
        let provider = Arc::new(ScriptedProvider::new(&[
            ("a", Script::FailUpstream),
            ("b", Script::Succeed),
        ]));
        let d = dispatcher(Arc::clone(&provider), models(&["a", "b"], "1s", "5s"));

        let outcome = d
            .dispatch(Mode::Normal, &[ChatMessage::user("hi")], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.model_id, "b");
        assert_eq!(provider.calls(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn stalled_attempt_times_out_then_falls_through() {
        let provider = Arc::new(ScriptedProvider::new(&[
            ("a", Script::Stall),
            ("b", Script::Succeed),
        ]));
        let d = dispatcher(Arc::clone(&provider), models(&["a", "b"], "50ms", "5s"));

        let outcome = d
            .dispatch(Mode::Quick, &[ChatMessage::user("hi")], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.model_id, "b");
    }

    #[tokio::test]
    async fn exhausted_chain_surfaces_last_error() {
        let provider = Arc::new(ScriptedProvider::new(&[
            ("a", Script::FailUpstream),
            ("b", Script::FailUpstream),
        ]));
        let d = dispatcher(provider, models(&["a", "b"], "1s", "5s"));

        let err = d
            .dispatch(Mode::Quick, &[ChatMessage::user("hi")], &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Upstream { model_id, .. } if model_id == "b"));
    }

    #[tokio::test]
    async fn budget_cuts_off_remaining_chain() {
        let provider = Arc::new(ScriptedProvider::new(&[
            ("a", Script::Stall),
            ("b", Script::Stall),
            ("c", Script::Succeed),
        ]));
        // The stalled attempts drain the whole 100ms budget between them,
        // so the chain must be cut off before the entry that would succeed
        let d = dispatcher(Arc::clone(&provider), models(&["a", "b", "c"], "80ms", "100ms"));

        let err = d
            .dispatch(Mode::Quick, &[ChatMessage::user("hi")], &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::BudgetExhausted { .. }));
        assert!(!provider.calls().contains(&"c".to_owned()), "chain entry past the budget must not run");
    }

    #[tokio::test]
    async fn cancellation_aborts_in_flight_attempt() {
        let provider = Arc::new(ScriptedProvider::new(&[("a", Script::Stall)]));
        let d = dispatcher(provider, models(&["a"], "10s", "30s"));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = d
            .dispatch(Mode::Thinking, &[ChatMessage::user("hi")], &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Cancelled));
    }

    #[tokio::test]
    async fn no_credentials_is_not_retried() {
        let provider = Arc::new(ScriptedProvider::new(&[("a", Script::Succeed)]));
        let empty_keys = Arc::new(CredentialPool::from_config(&CredentialsConfig {
            keys: Vec::new(),
            prefix: "sk-".to_owned(),
        }));
        let d = Dispatcher::new(Arc::clone(&provider) as _, models(&["a", "b"], "1s", "5s"), empty_keys);

        let err = d
            .dispatch(Mode::Quick, &[ChatMessage::user("hi")], &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Credentials(_)));
        assert!(provider.calls().is_empty());
    }
}
