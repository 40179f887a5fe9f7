//! Configuration management for the image classifier

use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Memory layout of the model's input tensor
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputLayout {
    /// `[batch, height, width, channels]` - Keras/TF exports
    #[default]
    Nhwc,
    /// `[batch, channels, height, width]` - PyTorch exports
    Nchw,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// ONNX Runtime library location
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    /// Path of the ONNX Runtime shared library
    #[serde(default = "default_library_path")]
    pub library_path: PathBuf,
    /// Where to fetch the library (or its `.tgz` release archive) from when it
    /// is missing; an empty string disables the download
    #[serde(default = "default_download_url")]
    pub download_url: Option<String>,
}

/// ONNX Runtime release matching the `ort` bindings
pub const ONNX_RUNTIME_VERSION: &str = "1.22.0";

fn default_download_url() -> Option<String> {
    let platform = if cfg!(all(target_os = "linux", target_arch = "x86_64")) {
        "linux-x64"
    } else if cfg!(all(target_os = "linux", target_arch = "aarch64")) {
        "linux-aarch64"
    } else if cfg!(target_os = "macos") {
        "osx-universal2"
    } else {
        // Windows builds ship as .zip
        return None;
    };
    Some(format!(
        "https://github.com/microsoft/onnxruntime/releases/download/v{v}/onnxruntime-{p}-{v}.tgz",
        v = ONNX_RUNTIME_VERSION,
        p = platform
    ))
}

fn default_library_path() -> PathBuf {
    let file = if cfg!(target_os = "windows") {
        "onnxruntime.dll"
    } else if cfg!(target_os = "macos") {
        "libonnxruntime.dylib"
    } else {
        "libonnxruntime.so"
    };
    PathBuf::from("runtime").join(file)
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            library_path: default_library_path(),
            download_url: default_download_url(),
        }
    }
}

/// Model and label table configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// ONNX model file
    #[serde(default = "default_model_path")]
    pub path: PathBuf,
    /// Class labels, index-aligned with the model output (JSON array or one per line)
    #[serde(default = "default_labels_path")]
    pub labels_path: PathBuf,
    /// Side of the square input image
    #[serde(default = "default_input_size")]
    pub input_size: u32,
    #[serde(default)]
    pub input_layout: InputLayout,
    /// Number of ranked entries to display
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("./model_kerasnative_v4/model.onnx")
}

fn default_labels_path() -> PathBuf {
    PathBuf::from("./model_kerasnative_v4/classes.json")
}

fn default_input_size() -> u32 {
    224
}

fn default_top_k() -> usize {
    5
}

fn default_onnx_threads() -> usize {
    1
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            labels_path: default_labels_path(),
            input_size: default_input_size(),
            input_layout: InputLayout::Nhwc,
            top_k: default_top_k(),
            onnx_threads: default_onnx_threads(),
        }
    }
}

/// Front-end behaviour
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UiConfig {
    /// Disable predict while an inference is in flight
    #[serde(default)]
    pub single_flight: bool,
}

/// Metrics reporting
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MetricsConfig {
    /// Seconds between periodic summaries; 0 logs only the final summary
    #[serde(default)]
    pub report_interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file, falling back to defaults if it is absent
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path; a missing file yields the defaults
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(
            config.model.path,
            PathBuf::from("./model_kerasnative_v4/model.onnx")
        );
        assert_eq!(config.model.input_size, 224);
        assert_eq!(config.model.top_k, 5);
        assert_eq!(config.model.input_layout, InputLayout::Nhwc);
        assert!(!config.ui.single_flight);
    }

    #[test]
    #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
    fn test_default_runtime_download_url() {
        let config = AppConfig::default();
        assert_eq!(
            config.runtime.download_url.as_deref(),
            Some("https://github.com/microsoft/onnxruntime/releases/download/v1.22.0/onnxruntime-linux-x64-1.22.0.tgz")
        );

        let dir = tempfile::tempdir().unwrap();
        let loaded = AppConfig::load_from_path(dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded.runtime.download_url, config.runtime.download_url);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from_path(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.model.top_k, 5);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[model]
path = "models/resnet.onnx"
input_layout = "nchw"
top_k = 3

[ui]
single_flight = true
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.model.path, PathBuf::from("models/resnet.onnx"));
        assert_eq!(config.model.input_layout, InputLayout::Nchw);
        assert_eq!(config.model.top_k, 3);
        assert_eq!(config.model.input_size, 224);
        assert!(config.ui.single_flight);
        assert_eq!(config.logging.format, "pretty");
    }
}
