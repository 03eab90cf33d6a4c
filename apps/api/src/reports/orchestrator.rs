//! Report generation orchestration.
//!
//! Flow: readiness check → overwrite confirmation → aggregate images →
//! compose prompt → invoke generation → reconcile into the report store.
//!
//! The run state machine is `Idle → AwaitingConfirmation → Generating →
//! Idle`. The UI's loading flag is advisory only; the orchestrator itself
//! refuses a second `Generating` entry. There is no retry and no
//! cancellation once a run has started — the user waits for settlement.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{info, warn};

use crate::errors::AppError;
use crate::gemini::{GenerationBackend, GenerationRequest};
use crate::images::aggregator::{aggregate, PickedImageFetcher, RemoteImageFetcher};
use crate::images::{LocalImage, PickedMedia};
use crate::prompt::compose;
use crate::reports::Report;
use crate::session::{Context, RunState, Session, SharedSession};

/// What a submission produced: either a finished report, or a request for
/// the user to confirm overwriting the model's existing report.
#[derive(Debug)]
pub enum SubmitOutcome {
    Completed(Report),
    ConfirmationRequired { model: String },
}

/// Everything one run needs, copied out of the session under the lock.
/// The pipeline never touches session state while running.
struct RunInputs {
    api_key: String,
    model: String,
    base_prompt: String,
    context: Context,
    local_images: Vec<LocalImage>,
    image_urls: Vec<String>,
    picked_media: Vec<PickedMedia>,
}

impl RunInputs {
    fn snapshot(session: &Session, model: String) -> Self {
        RunInputs {
            api_key: session.api_key.clone(),
            model,
            base_prompt: session.base_prompt.clone(),
            context: session.context.clone(),
            local_images: session.local_images.clone(),
            image_urls: session.image_urls.clone(),
            picked_media: session.picked_media.clone(),
        }
    }
}

pub struct Orchestrator {
    session: SharedSession,
    generator: Arc<dyn GenerationBackend>,
    remote_images: Arc<dyn RemoteImageFetcher>,
    picked_images: Arc<dyn PickedImageFetcher>,
}

impl Orchestrator {
    pub fn new(
        session: SharedSession,
        generator: Arc<dyn GenerationBackend>,
        remote_images: Arc<dyn RemoteImageFetcher>,
        picked_images: Arc<dyn PickedImageFetcher>,
    ) -> Self {
        Orchestrator {
            session,
            generator,
            remote_images,
            picked_images,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().expect("session mutex poisoned")
    }

    /// `Idle --submit-->` either `Generating` (fresh model) or
    /// `AwaitingConfirmation` (the model already has a report).
    ///
    /// Readiness: a validated API credential AND at least one of address,
    /// coordinates, images, or field memo. Anything else is a validation
    /// error and the state stays `Idle`.
    pub async fn submit(&self) -> Result<SubmitOutcome, AppError> {
        let inputs = {
            let mut session = self.lock();

            match &session.run {
                RunState::Generating => return Err(AppError::GenerationInFlight),
                RunState::AwaitingConfirmation { model } => {
                    return Err(AppError::Validation(format!(
                        "an overwrite confirmation is pending for model '{model}'; confirm or cancel it first"
                    )))
                }
                RunState::Idle => {}
            }

            if !session.key_validated {
                return Err(AppError::Validation(
                    "validate the API key before requesting a report".to_string(),
                ));
            }
            if !session.has_any_input() {
                return Err(AppError::Validation(
                    "provide at least one of address, coordinates, images, or field memo"
                        .to_string(),
                ));
            }

            let model = session.selected_model.clone();
            if session.reports.contains_model(&model) {
                session.run = RunState::AwaitingConfirmation {
                    model: model.clone(),
                };
                info!("report for model {model} already exists; awaiting overwrite confirmation");
                return Ok(SubmitOutcome::ConfirmationRequired { model });
            }

            session.run = RunState::Generating;
            RunInputs::snapshot(&session, model)
        };

        self.run_to_completion(inputs)
            .await
            .map(SubmitOutcome::Completed)
    }

    /// `AwaitingConfirmation --confirm--> Generating`.
    ///
    /// Clears the existing report for the confirmed model first, so that a
    /// failed re-generation leaves the slot empty rather than stale.
    pub async fn confirm(&self) -> Result<Report, AppError> {
        let inputs = {
            let mut session = self.lock();

            let model = match &session.run {
                RunState::AwaitingConfirmation { model } => model.clone(),
                RunState::Generating => return Err(AppError::GenerationInFlight),
                RunState::Idle => {
                    return Err(AppError::Validation(
                        "no overwrite confirmation is pending".to_string(),
                    ))
                }
            };

            session.reports.clear_for_model(&model);
            session.run = RunState::Generating;
            RunInputs::snapshot(&session, model)
        };

        self.run_to_completion(inputs).await
    }

    /// `AwaitingConfirmation --cancel--> Idle`. No other state change.
    pub fn cancel(&self) -> Result<(), AppError> {
        let mut session = self.lock();
        match &session.run {
            RunState::AwaitingConfirmation { .. } => {
                session.run = RunState::Idle;
                Ok(())
            }
            _ => Err(AppError::Validation(
                "no overwrite confirmation is pending".to_string(),
            )),
        }
    }

    /// Runs the pipeline, then reconciles: every exit path returns the run
    /// state to `Idle`, and only a successful run touches the report store.
    async fn run_to_completion(&self, inputs: RunInputs) -> Result<Report, AppError> {
        let result = self.run_pipeline(inputs).await;

        let mut session = self.lock();
        session.run = RunState::Idle;
        match result {
            Ok(report) => {
                session.reports.upsert(report.clone());
                info!("report stored for model {}", report.model);
                Ok(report)
            }
            Err(e) => {
                warn!("generation run failed: {e}");
                Err(e)
            }
        }
    }

    async fn run_pipeline(&self, inputs: RunInputs) -> Result<Report, AppError> {
        let images = aggregate(
            &inputs.local_images,
            &inputs.image_urls,
            &inputs.picked_media,
            self.remote_images.as_ref(),
            self.picked_images.as_ref(),
        )
        .await?;

        let prompt = compose(&inputs.base_prompt, &inputs.context);
        info!(
            "invoking generation: model={} images={} prompt_chars={}",
            inputs.model,
            images.len(),
            prompt.len()
        );

        let request = GenerationRequest {
            model: inputs.model.clone(),
            prompt,
            images,
        };
        let text = self.generator.generate(&inputs.api_key, &request).await?;

        Ok(Report {
            model: inputs.model,
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;

    struct StubGenerator {
        fail: bool,
        calls: AtomicUsize,
    }

    impl StubGenerator {
        fn ok() -> Self {
            StubGenerator {
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            StubGenerator {
                fail: true,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl GenerationBackend for StubGenerator {
        async fn list_models(&self, _api_key: &str) -> Result<Vec<String>, AppError> {
            Ok(vec!["gemini-1.5-flash".to_string()])
        }

        async fn generate(
            &self,
            _api_key: &str,
            request: &GenerationRequest,
        ) -> Result<String, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(AppError::Transport("HTTP 500".to_string()))
            } else {
                Ok(format!("report for {}", request.model))
            }
        }
    }

    struct StubRemote;

    #[async_trait]
    impl RemoteImageFetcher for StubRemote {
        async fn fetch_url(&self, url: &str) -> anyhow::Result<(Bytes, String)> {
            Ok((Bytes::from(url.to_string()), "image/jpeg".to_string()))
        }
    }

    struct StubPicker;

    #[async_trait]
    impl PickedImageFetcher for StubPicker {
        async fn fetch_item(&self, item: &PickedMedia) -> anyhow::Result<(Bytes, String)> {
            Ok((Bytes::from(item.id.clone()), "image/png".to_string()))
        }
    }

    fn validated_session() -> SharedSession {
        let mut session = Session::new();
        session.api_key = "test-key".to_string();
        session.key_validated = true;
        session.available_models = vec!["model-a".to_string(), "model-b".to_string()];
        session.selected_model = "model-a".to_string();
        session.context.field_memo = "pooling water near the curve".to_string();
        Arc::new(Mutex::new(session))
    }

    fn orchestrator_with(
        session: SharedSession,
        generator: Arc<StubGenerator>,
    ) -> Orchestrator {
        Orchestrator::new(session, generator, Arc::new(StubRemote), Arc::new(StubPicker))
    }

    fn run_state(session: &SharedSession) -> RunState {
        session.lock().unwrap().run.clone()
    }

    #[tokio::test]
    async fn test_unvalidated_key_is_rejected_without_state_change() {
        let session = validated_session();
        session.lock().unwrap().key_validated = false;
        let orch = orchestrator_with(session.clone(), Arc::new(StubGenerator::ok()));

        let result = orch.submit().await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(run_state(&session), RunState::Idle);
        assert!(session.lock().unwrap().reports.all().is_empty());
    }

    #[tokio::test]
    async fn test_empty_inputs_are_rejected() {
        let session = validated_session();
        session.lock().unwrap().context = Context::default();
        let orch = orchestrator_with(session.clone(), Arc::new(StubGenerator::ok()));

        let result = orch.submit().await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(run_state(&session), RunState::Idle);
    }

    #[tokio::test]
    async fn test_memo_only_submission_produces_report() {
        let session = validated_session();
        let orch = orchestrator_with(session.clone(), Arc::new(StubGenerator::ok()));

        let outcome = orch.submit().await.unwrap();

        match outcome {
            SubmitOutcome::Completed(report) => {
                assert_eq!(report.model, "model-a");
                assert_eq!(report.text, "report for model-a");
            }
            other => panic!("expected completed run, got {other:?}"),
        }
        let session = session.lock().unwrap();
        assert_eq!(session.run, RunState::Idle);
        assert!(session.reports.contains_model("model-a"));
    }

    #[tokio::test]
    async fn test_existing_report_requires_confirmation() {
        let session = validated_session();
        session.lock().unwrap().reports.upsert(Report {
            model: "model-a".to_string(),
            text: "old".to_string(),
        });
        let generator = Arc::new(StubGenerator::ok());
        let orch = orchestrator_with(session.clone(), generator.clone());

        let outcome = orch.submit().await.unwrap();

        match outcome {
            SubmitOutcome::ConfirmationRequired { model } => assert_eq!(model, "model-a"),
            other => panic!("expected confirmation request, got {other:?}"),
        }
        assert_eq!(
            run_state(&session),
            RunState::AwaitingConfirmation {
                model: "model-a".to_string()
            }
        );
        // No generation happened yet.
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.lock().unwrap().reports.get("model-a").unwrap().text, "old");
    }

    #[tokio::test]
    async fn test_confirm_replaces_previous_report() {
        let session = validated_session();
        session.lock().unwrap().reports.upsert(Report {
            model: "model-a".to_string(),
            text: "old".to_string(),
        });
        let orch = orchestrator_with(session.clone(), Arc::new(StubGenerator::ok()));

        orch.submit().await.unwrap();
        let report = orch.confirm().await.unwrap();

        assert_eq!(report.text, "report for model-a");
        let session = session.lock().unwrap();
        assert_eq!(session.reports.all().len(), 1);
        assert_eq!(session.reports.get("model-a").unwrap().text, "report for model-a");
        assert_eq!(session.run, RunState::Idle);
    }

    #[tokio::test]
    async fn test_failed_confirmed_rerun_leaves_no_report_for_model() {
        let session = validated_session();
        session.lock().unwrap().reports.upsert(Report {
            model: "model-a".to_string(),
            text: "old".to_string(),
        });
        let orch = orchestrator_with(session.clone(), Arc::new(StubGenerator::failing()));

        orch.submit().await.unwrap();
        let result = orch.confirm().await;

        assert!(matches!(result, Err(AppError::Transport(_))));
        let session = session.lock().unwrap();
        // The old report was cleared before the run; the slot is empty, not stale.
        assert!(!session.reports.contains_model("model-a"));
        assert_eq!(session.run, RunState::Idle);
    }

    #[tokio::test]
    async fn test_cancel_dismisses_confirmation_and_keeps_report() {
        let session = validated_session();
        session.lock().unwrap().reports.upsert(Report {
            model: "model-a".to_string(),
            text: "old".to_string(),
        });
        let orch = orchestrator_with(session.clone(), Arc::new(StubGenerator::ok()));

        orch.submit().await.unwrap();
        orch.cancel().unwrap();

        let session = session.lock().unwrap();
        assert_eq!(session.run, RunState::Idle);
        assert_eq!(session.reports.get("model-a").unwrap().text, "old");
    }

    #[tokio::test]
    async fn test_concurrent_generating_entry_is_refused() {
        let session = validated_session();
        session.lock().unwrap().run = RunState::Generating;
        let orch = orchestrator_with(session.clone(), Arc::new(StubGenerator::ok()));

        let result = orch.submit().await;

        assert!(matches!(result, Err(AppError::GenerationInFlight)));
    }

    #[tokio::test]
    async fn test_confirm_without_pending_confirmation_is_rejected() {
        let session = validated_session();
        let orch = orchestrator_with(session.clone(), Arc::new(StubGenerator::ok()));

        assert!(matches!(
            orch.confirm().await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(orch.cancel(), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_failed_fresh_run_resets_to_idle_with_no_report() {
        let session = validated_session();
        let orch = orchestrator_with(session.clone(), Arc::new(StubGenerator::failing()));

        let result = orch.submit().await;

        assert!(matches!(result, Err(AppError::Transport(_))));
        let session = session.lock().unwrap();
        assert!(session.reports.all().is_empty());
        assert_eq!(session.run, RunState::Idle);
    }

    #[tokio::test]
    async fn test_unreadable_upload_aborts_before_generation() {
        let session = validated_session();
        session.lock().unwrap().local_images.push(LocalImage {
            file_name: "gone.jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
            path: std::path::PathBuf::from("/nonexistent/gone.jpg"),
        });
        let generator = Arc::new(StubGenerator::ok());
        let orch = orchestrator_with(session.clone(), generator.clone());

        let result = orch.submit().await;

        assert!(matches!(result, Err(AppError::Aggregation(_))));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(run_state(&session), RunState::Idle);
    }

    #[tokio::test]
    async fn test_resubmit_after_success_requires_fresh_confirmation() {
        let session = validated_session();
        let orch = orchestrator_with(session.clone(), Arc::new(StubGenerator::ok()));

        orch.submit().await.unwrap();
        let outcome = orch.submit().await.unwrap();

        assert!(matches!(
            outcome,
            SubmitOutcome::ConfirmationRequired { .. }
        ));
    }
}
