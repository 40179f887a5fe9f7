//! ONNX model loader

use crate::config::ModelConfig;
use crate::labels::ClassLabels;
use crate::models::inference::OnnxClassifier;
use crate::models::preprocess::Preprocessor;
use crate::models::Classifier;
use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Loaded ONNX session with metadata
pub struct LoadedModel {
    /// Model name
    pub name: String,
    /// ONNX Runtime session
    pub session: Session,
    /// Input name for the model
    pub input_name: String,
    /// Output name for probabilities
    pub output_name: String,
}

/// Produces the classifier once the runtime is available
pub trait ModelSource {
    fn load(&self) -> impl Future<Output = Result<Arc<dyn Classifier>>>;
}

/// Loader for ONNX models
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Load a single ONNX model from file
    pub fn load_model<P: AsRef<Path>>(&self, path: P, name: &str) -> Result<LoadedModel> {
        let path = path.as_ref();

        if !path.is_file() {
            anyhow::bail!("model file not found: {}", path.display());
        }

        info!(model = %name, path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .context("model declares no inputs")?;

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob") || o.name.contains("softmax"))
            .or_else(|| session.outputs.first())
            .map(|o| o.name.clone())
            .context("model declares no outputs")?;

        info!(
            model = %name,
            input = %input_name,
            output = %output_name,
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            name: name.to_string(),
            session,
            input_name,
            output_name,
        })
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self { onnx_threads: 1 }
    }
}

/// Loads the configured model file and its label table
pub struct OnnxModelSource {
    config: ModelConfig,
}

impl OnnxModelSource {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn model_path(&self) -> &PathBuf {
        &self.config.path
    }

    fn load_blocking(config: ModelConfig) -> Result<Arc<dyn Classifier>> {
        let name = model_name(&config.path);
        let loader = ModelLoader::with_threads(config.onnx_threads);
        let model = loader.load_model(&config.path, &name)?;
        let labels = ClassLabels::load(&config.labels_path)?;
        let preprocessor = Preprocessor::new(config.input_size, config.input_layout);

        Ok(Arc::new(OnnxClassifier::new(model, labels, preprocessor)))
    }
}

impl ModelSource for OnnxModelSource {
    async fn load(&self) -> Result<Arc<dyn Classifier>> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || Self::load_blocking(config))
            .await
            .context("model loading task panicked")?
    }
}

/// Name of the model directory (e.g. `model_kerasnative_v4`), or the file stem
fn model_name(path: &Path) -> String {
    path.parent()
        .and_then(|dir| dir.file_name())
        .or_else(|| path.file_stem())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_name_prefers_directory() {
        assert_eq!(
            model_name(Path::new("./model_kerasnative_v4/model.onnx")),
            "model_kerasnative_v4"
        );
        assert_eq!(model_name(Path::new("resnet.onnx")), "resnet");
    }

    #[test]
    fn test_missing_model_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.onnx");

        let error = ModelLoader::default()
            .load_model(&path, "missing")
            .err()
            .unwrap();
        assert!(error.to_string().contains("model file not found"));
    }

    #[tokio::test]
    async fn test_source_surfaces_missing_model() {
        let dir = tempfile::tempdir().unwrap();
        let source = OnnxModelSource::new(&ModelConfig {
            path: dir.path().join("model_kerasnative_v4").join("model.onnx"),
            ..ModelConfig::default()
        });

        let error = source.load().await.err().unwrap();
        assert!(format!("{:#}", error).contains("model.onnx"));
    }
}
