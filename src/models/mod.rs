//! ML model components

pub mod bootstrap;
pub mod inference;
pub mod loader;
pub mod preprocess;
pub mod ranking;

pub use bootstrap::{OrtBootstrap, RuntimeBootstrap, RuntimeHandle};
pub use inference::OnnxClassifier;
pub use loader::{ModelLoader, ModelSource, OnnxModelSource};
pub use preprocess::{ImageTensor, Preprocessor};

use crate::labels::ClassLabels;
use anyhow::Result;

/// A loaded model that maps one preprocessed image to a probability vector.
///
/// Implementations are immutable after loading and shared across inference workers.
pub trait Classifier: Send + Sync {
    /// Display name, used in logs and metrics
    fn name(&self) -> &str;

    /// Input preprocessing expected by the model
    fn preprocessor(&self) -> Preprocessor;

    /// Label table aligned with the output vector
    fn labels(&self) -> &ClassLabels;

    /// Run one forward pass and return the flat output vector
    fn classify(&self, input: &ImageTensor) -> Result<Vec<f32>>;
}
