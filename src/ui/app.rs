//! Event loop tying startup, user events and inference workers together

use crate::error::BootstrapError;
use crate::models::{Classifier, ModelSource, RuntimeBootstrap};
use crate::types::SelectedImage;
use crate::ui::controller::{Controller, InferenceJob, InferenceOutcome};
use crate::ui::{UiEvent, View};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Messages produced by background work
enum Internal {
    LoadingStarted,
    Inference(InferenceOutcome),
}

enum Startup {
    BootstrapFailed(BootstrapError),
    Loaded(anyhow::Result<Arc<dyn Classifier>>),
}

/// The classifier application: one controller plus its startup collaborators
pub struct App<V: View, B: RuntimeBootstrap, S: ModelSource> {
    controller: Controller<V>,
    bootstrap: B,
    source: S,
}

impl<V: View, B: RuntimeBootstrap, S: ModelSource> App<V, B, S> {
    pub fn new(controller: Controller<V>, bootstrap: B, source: S) -> Self {
        Self {
            controller,
            bootstrap,
            source,
        }
    }

    pub fn controller(&self) -> &Controller<V> {
        &self.controller
    }

    /// Run until `Quit` (or the end of `events`) and no inference is in flight.
    ///
    /// Startup (runtime bootstrap, then model load) runs concurrently with event
    /// handling, so commands are accepted before the model is ready.
    pub async fn run(self, mut events: mpsc::Receiver<UiEvent>) -> Controller<V> {
        let App {
            mut controller,
            bootstrap,
            source,
        } = self;
        let (internal_tx, mut internal_rx) = mpsc::unbounded_channel();

        let loading_tx = internal_tx.clone();
        let startup = async {
            match bootstrap.ensure().await {
                Err(e) => Startup::BootstrapFailed(e),
                Ok(handle) => {
                    info!(library = %handle.library_path().display(), "ONNX Runtime ready");
                    let _ = loading_tx.send(Internal::LoadingStarted);
                    Startup::Loaded(source.load().await)
                }
            }
        };
        tokio::pin!(startup);

        let mut startup_done = false;
        let mut quitting = false;

        loop {
            if quitting && controller.in_flight() == 0 {
                break;
            }

            tokio::select! {
                biased;

                Some(message) = internal_rx.recv() => handle_internal(&mut controller, message),

                outcome = &mut startup, if !startup_done => {
                    startup_done = true;
                    match outcome {
                        Startup::BootstrapFailed(e) => controller.on_bootstrap_failed(&e),
                        Startup::Loaded(result) => {
                            // The loading notice may still be queued
                            while let Ok(message) = internal_rx.try_recv() {
                                handle_internal(&mut controller, message);
                            }
                            controller.on_model_loaded(result);
                        }
                    }
                },

                event = events.recv(), if !quitting => match event {
                    None | Some(UiEvent::Quit) => {
                        debug!(in_flight = controller.in_flight(), "Quit requested");
                        quitting = true;
                    }
                    Some(UiEvent::SelectImage(path)) => match tokio::fs::read(&path).await {
                        Ok(bytes) => controller.on_image_selected(SelectedImage::new(path, bytes)),
                        Err(e) => controller.on_image_read_failed(&path, &e),
                    },
                    Some(UiEvent::Predict) => {
                        if let Some(job) = controller.on_predict() {
                            spawn_inference(job, internal_tx.clone());
                        }
                    }
                    Some(UiEvent::ShowStatus) => controller.on_status_requested(),
                },
            }
        }

        controller
    }
}

fn handle_internal<V: View>(controller: &mut Controller<V>, message: Internal) {
    match message {
        Internal::LoadingStarted => controller.on_loading_started(),
        Internal::Inference(outcome) => controller.on_inference_done(outcome),
    }
}

fn spawn_inference(job: InferenceJob, tx: mpsc::UnboundedSender<Internal>) {
    let (ticket, epoch) = (job.ticket, job.epoch);
    tokio::spawn(async move {
        let outcome = match tokio::task::spawn_blocking(move || job.run()).await {
            Ok(outcome) => outcome,
            Err(e) => InferenceOutcome::worker_failed(ticket, epoch, e),
        };
        let _ = tx.send(Internal::Inference(outcome));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::InferenceMetrics;
    use crate::types::PredictionList;
    use crate::ui::testing::{png_bytes, FakeBootstrap, FakeClassifier, FakeSource, RecordingView};
    use crate::ui::{ControllerSettings, ModelPhase, MODEL_NOT_READY};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Harness {
        bootstrap_calls: Arc<AtomicUsize>,
        load_calls: Arc<AtomicUsize>,
    }

    fn app(
        bootstrap_fails: bool,
        model: Option<Arc<FakeClassifier>>,
    ) -> (App<RecordingView, FakeBootstrap, FakeSource>, Harness) {
        let harness = Harness {
            bootstrap_calls: Arc::new(AtomicUsize::new(0)),
            load_calls: Arc::new(AtomicUsize::new(0)),
        };
        let controller = Controller::new(
            RecordingView::default(),
            ControllerSettings::default(),
            Arc::new(InferenceMetrics::new()),
        );
        let app = App::new(
            controller,
            FakeBootstrap {
                fail: bootstrap_fails,
                calls: harness.bootstrap_calls.clone(),
            },
            FakeSource {
                model,
                calls: harness.load_calls.clone(),
            },
        );
        (app, harness)
    }

    /// Events delivered only after the model phase settles, like the scripted mode
    async fn run_after_startup(
        app: App<RecordingView, FakeBootstrap, FakeSource>,
        events: Vec<UiEvent>,
    ) -> Controller<RecordingView> {
        let (tx, rx) = mpsc::channel(16);
        crate::ui::events::spawn_script(events, app.controller().subscribe(), tx);
        app.run(rx).await
    }

    #[tokio::test]
    async fn test_end_to_end_flow() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("gato.png");
        std::fs::write(&image, png_bytes(16, 12)).unwrap();

        let model = FakeClassifier::new(vec![0.05, 0.6, 0.1, 0.02, 0.2, 0.03]);
        let (app, harness) = app(false, Some(model.clone()));

        let controller = run_after_startup(
            app,
            vec![UiEvent::SelectImage(image), UiEvent::Predict],
        )
        .await;

        assert_eq!(harness.bootstrap_calls.load(Ordering::SeqCst), 1);
        assert_eq!(harness.load_calls.load(Ordering::SeqCst), 1);
        assert_eq!(model.calls(), 1);
        assert_eq!(controller.phase(), ModelPhase::Ready);

        let view = controller.view();
        assert_eq!(
            view.statuses.last().unwrap().text,
            "Modelo cargado. ¡Listo para hacer predicciones!"
        );
        assert_eq!(view.previews, vec!["gato.png".to_string()]);
        assert_eq!(view.lists[0], PredictionList::Empty);
        assert_eq!(
            view.last_entries(),
            vec![
                "clase_1: 0.600000",
                "clase_4: 0.200000",
                "clase_2: 0.100000",
                "clase_0: 0.050000",
                "clase_5: 0.030000",
            ]
        );
        assert!(view.alerts.is_empty());
    }

    #[tokio::test]
    async fn test_bootstrap_failure_skips_model_load() {
        let (app, harness) = app(true, Some(FakeClassifier::new(vec![1.0])));

        let controller = run_after_startup(app, vec![UiEvent::Predict]).await;

        assert_eq!(harness.load_calls.load(Ordering::SeqCst), 0);
        assert_eq!(controller.phase(), ModelPhase::Failed);
        let view = controller.view();
        assert_eq!(view.alerts.len(), 2);
        assert!(view.alerts[0].starts_with("Error al cargar ONNX Runtime"));
        assert_eq!(view.alerts[1], MODEL_NOT_READY);
    }

    #[tokio::test]
    async fn test_model_load_failure_is_shown_in_status() {
        let (app, harness) = app(false, None);

        let controller = run_after_startup(app, vec![UiEvent::Predict]).await;

        assert_eq!(harness.load_calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.phase(), ModelPhase::Failed);
        let view = controller.view();
        let status = view.statuses.last().unwrap();
        assert!(status.text.contains("model file not found"));
        assert_eq!(view.alerts, vec![MODEL_NOT_READY.to_string()]);
        assert!(view.lists.is_empty());
    }

    #[tokio::test]
    async fn test_missing_image_file_alerts() {
        let (app, _) = app(false, Some(FakeClassifier::new(vec![1.0])));

        let controller = run_after_startup(
            app,
            vec![UiEvent::SelectImage("no/existe.png".into())],
        )
        .await;

        let view = controller.view();
        assert_eq!(view.alerts.len(), 1);
        assert!(view.alerts[0].contains("no/existe.png"));
        assert!(view.previews.is_empty());
    }

    #[tokio::test]
    async fn test_closed_event_stream_stops_the_loop() {
        let (app, _) = app(false, Some(FakeClassifier::new(vec![1.0])));
        let (tx, rx) = mpsc::channel(1);
        drop(tx);

        let controller = app.run(rx).await;
        assert_eq!(controller.in_flight(), 0);
    }
}
