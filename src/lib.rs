//! Image Classifier Library
//!
//! Loads an ONNX image-classification model through a dynamically loaded
//! ONNX Runtime, classifies user-selected images and ranks the top-5 classes.

pub mod config;
pub mod error;
pub mod labels;
pub mod metrics;
pub mod models;
pub mod types;
pub mod ui;

pub use config::AppConfig;
pub use error::{BootstrapError, PredictionError};
pub use labels::ClassLabels;
pub use models::{Classifier, OnnxModelSource, OrtBootstrap};
pub use types::{Prediction, PredictionList, SelectedImage};
pub use ui::{App, Controller, TerminalView, UiEvent, View};
