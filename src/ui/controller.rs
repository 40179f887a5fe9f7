//! Inference UI controller
//!
//! Owns the model state and reacts to user events. Handlers are registered
//! unconditionally; each one checks the current [`ModelState`] before acting.
//!
//! Several inferences may be in flight at once. A finished inference is shown
//! only if no image was selected since it started and no later-started
//! inference has been shown already. Ordering by start rather than by
//! completion keeps a slow early job from replacing the answer to a newer
//! request, and a result for a replaced image never lands under the new preview.

use crate::error::{BootstrapError, PredictionError};
use crate::metrics::InferenceMetrics;
use crate::models::ranking::{rank_top_k, top1_probability};
use crate::models::Classifier;
use crate::types::{Prediction, PredictionList, SelectedImage, StatusMessage};
use crate::ui::{View, MODEL_NOT_READY};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Lifecycle of the model handle
#[derive(Clone, Default)]
pub enum ModelState {
    #[default]
    Uninitialized,
    Loading,
    Ready(Arc<dyn Classifier>),
    Failed(String),
}

impl ModelState {
    pub fn phase(&self) -> ModelPhase {
        match self {
            ModelState::Uninitialized => ModelPhase::Uninitialized,
            ModelState::Loading => ModelPhase::Loading,
            ModelState::Ready(_) => ModelPhase::Ready,
            ModelState::Failed(_) => ModelPhase::Failed,
        }
    }
}

impl fmt::Debug for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelState::Ready(model) => f.debug_tuple("Ready").field(&model.name()).finish(),
            ModelState::Failed(reason) => f.debug_tuple("Failed").field(reason).finish(),
            other => write!(f, "{:?}", other.phase()),
        }
    }
}

/// Data-free view of [`ModelState`], published to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelPhase {
    Uninitialized,
    Loading,
    Ready,
    Failed,
}

impl ModelPhase {
    /// No further transitions will happen
    pub fn is_settled(self) -> bool {
        matches!(self, ModelPhase::Ready | ModelPhase::Failed)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ControllerSettings {
    /// Number of ranked entries to display
    pub top_k: usize,
    /// Disable predict while an inference is in flight
    pub single_flight: bool,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            single_flight: false,
        }
    }
}

/// One scheduled forward pass; run on a blocking worker
pub struct InferenceJob {
    pub ticket: u64,
    pub epoch: u64,
    model: Arc<dyn Classifier>,
    image: Option<SelectedImage>,
    top_k: usize,
}

impl InferenceJob {
    /// Preprocess, run the model and rank its output
    pub fn run(self) -> InferenceOutcome {
        let started = Instant::now();
        let result = self.predict();
        InferenceOutcome {
            ticket: self.ticket,
            epoch: self.epoch,
            elapsed: started.elapsed(),
            result,
        }
    }

    fn predict(&self) -> Result<RankedOutput, PredictionError> {
        let image = self.image.as_ref().ok_or(PredictionError::NoImage)?;
        let input = self.model.preprocessor().tensor_from_bytes(&image.bytes)?;
        let probabilities = self.model.classify(&input)?;
        debug!(model = %self.model.name(), ticket = self.ticket, "Predictions: {:?}", probabilities);

        if probabilities.is_empty() {
            return Err(PredictionError::Shape {
                expected: format!("{} outputs", self.model.labels().len()),
                actual: "0 outputs".to_string(),
            });
        }

        Ok(RankedOutput {
            top1: top1_probability(&probabilities),
            predictions: rank_top_k(&probabilities, self.model.labels(), self.top_k),
        })
    }
}

#[derive(Debug)]
pub struct RankedOutput {
    pub predictions: Vec<Prediction>,
    pub top1: Option<f32>,
}

/// Result of an [`InferenceJob`], delivered back to the controller
#[derive(Debug)]
pub struct InferenceOutcome {
    pub ticket: u64,
    pub epoch: u64,
    pub elapsed: Duration,
    pub result: Result<RankedOutput, PredictionError>,
}

impl InferenceOutcome {
    /// Outcome for a job whose worker died before producing a result
    pub fn worker_failed(ticket: u64, epoch: u64, reason: impl fmt::Display) -> Self {
        Self {
            ticket,
            epoch,
            elapsed: Duration::ZERO,
            result: Err(PredictionError::Worker(reason.to_string())),
        }
    }
}

/// Single owner of the application state
pub struct Controller<V: View> {
    view: V,
    state: ModelState,
    status: StatusMessage,
    image: Option<SelectedImage>,
    settings: ControllerSettings,
    /// Bumped on every image selection
    epoch: u64,
    /// Last ticket handed out
    ticket: u64,
    /// Ticket of the inference currently on display
    rendered_ticket: u64,
    in_flight: usize,
    metrics: Arc<InferenceMetrics>,
    phase_tx: watch::Sender<ModelPhase>,
}

impl<V: View> Controller<V> {
    pub fn new(view: V, settings: ControllerSettings, metrics: Arc<InferenceMetrics>) -> Self {
        let (phase_tx, _) = watch::channel(ModelPhase::Uninitialized);
        Self {
            view,
            state: ModelState::Uninitialized,
            status: StatusMessage::hidden(),
            image: None,
            settings,
            epoch: 0,
            ticket: 0,
            rendered_ticket: 0,
            in_flight: 0,
            metrics,
            phase_tx,
        }
    }

    /// Observe model phase transitions
    pub fn subscribe(&self) -> watch::Receiver<ModelPhase> {
        self.phase_tx.subscribe()
    }

    pub fn state(&self) -> &ModelState {
        &self.state
    }

    pub fn phase(&self) -> ModelPhase {
        self.state.phase()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn into_view(self) -> V {
        self.view
    }

    fn set_state(&mut self, state: ModelState) {
        debug!(from = ?self.state.phase(), to = ?state.phase(), "Model state transition");
        self.state = state;
        self.phase_tx.send_replace(self.state.phase());
    }

    fn set_status(&mut self, status: StatusMessage) {
        self.view.show_status(&status);
        self.status = status;
    }

    /// Runtime is available and the model load begins
    pub fn on_loading_started(&mut self) {
        if !matches!(self.state, ModelState::Uninitialized) {
            return;
        }
        info!("Cargando modelo...");
        self.set_state(ModelState::Loading);
        self.set_status(StatusMessage::loading());
    }

    /// The runtime could not be made available; no model load will follow
    pub fn on_bootstrap_failed(&mut self, err: &BootstrapError) {
        error!(error = %err, "Failed to bootstrap ONNX Runtime");
        self.view
            .alert(&format!("Error al cargar ONNX Runtime: {}. Intenta nuevamente.", err));
        self.set_state(ModelState::Failed(err.to_string()));
    }

    pub fn on_model_loaded(&mut self, result: anyhow::Result<Arc<dyn Classifier>>) {
        match result {
            Ok(model) => {
                info!(model = %model.name(), labels = model.labels().len(), "Modelo cargado correctamente");
                self.set_state(ModelState::Ready(model));
                self.set_status(StatusMessage::ready());
            }
            Err(err) => {
                let reason = format!("{:#}", err);
                error!(error = %reason, "Error al cargar el modelo");
                self.set_status(StatusMessage::load_failed(&reason));
                self.set_state(ModelState::Failed(reason));
            }
        }
    }

    /// New image picked: show it and drop whatever list is on display
    pub fn on_image_selected(&mut self, image: SelectedImage) {
        info!(image = %image.path.display(), bytes = image.len(), "Image selected");
        self.epoch += 1;
        self.metrics.record_image();
        self.view.show_preview(&image);
        self.view.render_list(&PredictionList::Empty);
        self.image = Some(image);
    }

    pub fn on_image_read_failed(&mut self, path: &Path, err: &std::io::Error) {
        warn!(image = %path.display(), error = %err, "Failed to read image");
        self.view
            .alert(&format!("No se pudo leer la imagen {}: {}", path.display(), err));
    }

    /// Predict trigger. Returns the job to run, or `None` if nothing should run.
    pub fn on_predict(&mut self) -> Option<InferenceJob> {
        let ModelState::Ready(model) = &self.state else {
            warn!(phase = ?self.phase(), "Predict requested before the model is ready");
            self.metrics.record_rejected();
            self.view.alert(MODEL_NOT_READY);
            return None;
        };

        if self.settings.single_flight && self.in_flight > 0 {
            debug!(in_flight = self.in_flight, "Predict ignored while an inference is running");
            return None;
        }

        let model = Arc::clone(model);
        self.ticket += 1;
        self.in_flight += 1;
        self.metrics.record_request();
        if self.settings.single_flight {
            self.view.set_predict_enabled(false);
        }

        debug!(ticket = self.ticket, epoch = self.epoch, "Inference scheduled");
        Some(InferenceJob {
            ticket: self.ticket,
            epoch: self.epoch,
            model,
            image: self.image.clone(),
            top_k: self.settings.top_k,
        })
    }

    pub fn on_inference_done(&mut self, outcome: InferenceOutcome) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if self.settings.single_flight && self.in_flight == 0 {
            self.view.set_predict_enabled(true);
        }

        if outcome.epoch != self.epoch || outcome.ticket < self.rendered_ticket {
            debug!(
                ticket = outcome.ticket,
                epoch = outcome.epoch,
                current_epoch = self.epoch,
                rendered_ticket = self.rendered_ticket,
                "Discarding superseded inference result"
            );
            self.metrics.record_stale();
            return;
        }
        self.rendered_ticket = outcome.ticket;

        match outcome.result {
            Ok(ranked) => {
                info!(
                    ticket = outcome.ticket,
                    inference_time_us = outcome.elapsed.as_micros(),
                    top1 = ?ranked.predictions.first().map(|p| p.class_name.as_str()),
                    "Prediction complete"
                );
                self.metrics.record_prediction(outcome.elapsed, ranked.top1);
                self.view
                    .render_list(&PredictionList::Ranked(ranked.predictions));
            }
            Err(err) => {
                error!(ticket = outcome.ticket, error = %err, "Error durante la predicción");
                self.metrics.record_failure();
                self.view.render_list(&PredictionList::Error(err.to_string()));
            }
        }
    }

    /// Re-show the status indicator
    pub fn on_status_requested(&mut self) {
        let status = self.status.clone();
        self.view.show_status(&status);
    }
}
