//! Test doubles for the view, the model and the startup collaborators

use crate::error::BootstrapError;
use crate::labels::ClassLabels;
use crate::models::{Classifier, ImageTensor, ModelSource, Preprocessor, RuntimeBootstrap, RuntimeHandle};
use crate::config::InputLayout;
use crate::types::{PredictionList, SelectedImage, StatusMessage};
use crate::ui::View;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// View that records every call
#[derive(Debug, Default)]
pub struct RecordingView {
    pub statuses: Vec<StatusMessage>,
    pub alerts: Vec<String>,
    pub previews: Vec<String>,
    pub lists: Vec<PredictionList>,
    pub predict_enabled: Vec<bool>,
}

impl RecordingView {
    pub fn last_entries(&self) -> Vec<String> {
        self.lists.last().map(PredictionList::entries).unwrap_or_default()
    }
}

impl View for RecordingView {
    fn show_status(&mut self, status: &StatusMessage) {
        self.statuses.push(status.clone());
    }

    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }

    fn show_preview(&mut self, image: &SelectedImage) {
        self.previews.push(image.file_name());
    }

    fn render_list(&mut self, list: &PredictionList) {
        self.lists.push(list.clone());
    }

    fn set_predict_enabled(&mut self, enabled: bool) {
        self.predict_enabled.push(enabled);
    }
}

/// Classifier returning a fixed output vector
pub struct FakeClassifier {
    output: Result<Vec<f32>, String>,
    labels: ClassLabels,
    calls: AtomicUsize,
    last_shape: Mutex<Option<[usize; 4]>>,
}

impl FakeClassifier {
    pub fn new(output: Vec<f32>) -> Arc<Self> {
        let labels = ClassLabels::new((0..output.len()).map(|i| format!("clase_{}", i)).collect());
        Arc::new(Self {
            output: Ok(output),
            labels,
            calls: AtomicUsize::new(0),
            last_shape: Mutex::new(None),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            output: Err(message.to_string()),
            labels: ClassLabels::default(),
            calls: AtomicUsize::new(0),
            last_shape: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_input_shape(&self) -> Option<[usize; 4]> {
        *self.last_shape.lock().unwrap()
    }
}

impl Classifier for FakeClassifier {
    fn name(&self) -> &str {
        "fake"
    }

    fn preprocessor(&self) -> Preprocessor {
        Preprocessor::new(224, InputLayout::Nhwc)
    }

    fn labels(&self) -> &ClassLabels {
        &self.labels
    }

    fn classify(&self, input: &ImageTensor) -> anyhow::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_shape.lock().unwrap() = Some(input.shape);
        self.output.clone().map_err(|message| anyhow::anyhow!(message))
    }
}

/// Bootstrap that succeeds or fails without touching the filesystem
pub struct FakeBootstrap {
    pub fail: bool,
    pub calls: Arc<AtomicUsize>,
}

impl RuntimeBootstrap for FakeBootstrap {
    async fn ensure(&self) -> Result<RuntimeHandle, BootstrapError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(BootstrapError::MissingUrl(PathBuf::from("runtime/libonnxruntime.so")))
        } else {
            Ok(RuntimeHandle::Present(PathBuf::from("runtime/libonnxruntime.so")))
        }
    }
}

/// Model source handing out a prepared classifier, or an error
pub struct FakeSource {
    pub model: Option<Arc<FakeClassifier>>,
    pub calls: Arc<AtomicUsize>,
}

impl ModelSource for FakeSource {
    async fn load(&self) -> anyhow::Result<Arc<dyn Classifier>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.model {
            Some(model) => Ok(model.clone() as Arc<dyn Classifier>),
            None => anyhow::bail!("model file not found: model_kerasnative_v4/model.onnx"),
        }
    }
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x * 20) as u8, (y * 20) as u8, 128]));
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

pub fn png_image(width: u32, height: u32) -> SelectedImage {
    SelectedImage::new("test.png", png_bytes(width, height))
}
