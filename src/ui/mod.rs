//! User-facing surface: status indicator, image preview, predict trigger and
//! the ranked prediction list.

pub mod app;
pub mod controller;
pub mod events;
pub mod terminal;

#[cfg(test)]
pub(crate) mod testing;

pub use app::App;
pub use controller::{Controller, ControllerSettings, ModelPhase, ModelState};
pub use events::UiEvent;
pub use terminal::TerminalView;

use crate::types::{PredictionList, SelectedImage, StatusMessage};

/// Alert shown when predict is triggered before the model is ready
pub const MODEL_NOT_READY: &str = "El modelo no ha sido cargado aún. Por favor, espera un momento.";

/// Rendering surface driven by the controller
pub trait View {
    /// Update the status indicator (text, colour, visibility)
    fn show_status(&mut self, status: &StatusMessage);

    /// Blocking notification
    fn alert(&mut self, message: &str);

    /// Show the selected image
    fn show_preview(&mut self, image: &SelectedImage);

    /// Replace the whole prediction list
    fn render_list(&mut self, list: &PredictionList);

    /// Enable or disable the predict trigger
    fn set_predict_enabled(&mut self, enabled: bool);
}
