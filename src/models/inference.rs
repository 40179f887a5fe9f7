//! ONNX Runtime classifier

use crate::labels::ClassLabels;
use crate::models::loader::LoadedModel;
use crate::models::preprocess::{ImageTensor, Preprocessor};
use crate::models::Classifier;
use anyhow::{Context, Result};
use ort::value::Tensor;
use std::sync::RwLock;
use tracing::{debug, warn};

/// Image classifier backed by one ONNX Runtime session
pub struct OnnxClassifier {
    /// Session needs exclusive access to run; wrapped for shared ownership
    model: RwLock<LoadedModel>,
    name: String,
    labels: ClassLabels,
    preprocessor: Preprocessor,
}

impl OnnxClassifier {
    pub fn new(model: LoadedModel, labels: ClassLabels, preprocessor: Preprocessor) -> Self {
        Self {
            name: model.name.clone(),
            model: RwLock::new(model),
            labels,
            preprocessor,
        }
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn preprocessor(&self) -> Preprocessor {
        self.preprocessor
    }

    fn labels(&self) -> &ClassLabels {
        &self.labels
    }

    fn classify(&self, input: &ImageTensor) -> Result<Vec<f32>> {
        let input_tensor = Tensor::from_array((input.shape_i64(), input.data.clone()))
            .context("Failed to create input tensor")?;

        let mut model = self
            .model
            .write()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        let LoadedModel {
            session,
            input_name,
            output_name,
            ..
        } = &mut *model;

        let outputs = session
            .run(ort::inputs![input_name.as_str() => input_tensor])
            .context("Forward pass failed")?;

        let output = outputs
            .get(output_name.as_str())
            .with_context(|| format!("model produced no output named {}", output_name))?;
        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .context("model output is not an f32 tensor")?;

        let dims: Vec<i64> = shape.iter().copied().collect();
        let probabilities = flatten_batch(&dims, data)?;

        if probabilities.len() != self.labels.len() {
            warn!(
                model = %self.name,
                outputs = probabilities.len(),
                labels = self.labels.len(),
                "Output size does not match label table"
            );
        }
        debug!(model = %self.name, outputs = probabilities.len(), "Forward pass complete");

        Ok(probabilities)
    }
}

/// Strip the batch dimension from a `[1, N]` or `[N]` output
pub fn flatten_batch(dims: &[i64], data: &[f32]) -> Result<Vec<f32>> {
    match dims {
        [n] if *n as usize == data.len() => Ok(data.to_vec()),
        [1, n] if *n as usize == data.len() => Ok(data.to_vec()),
        [batch, _] if *batch > 1 => anyhow::bail!("expected one batch row, got {}", batch),
        _ => anyhow::bail!("unexpected output shape {:?}", dims),
    }
}
