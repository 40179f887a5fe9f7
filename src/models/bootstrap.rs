//! ONNX Runtime bootstrap
//!
//! The runtime is loaded dynamically. If the shared library is already on disk it
//! is used as-is; otherwise it is downloaded once from the configured URL. Release
//! archives (`.tgz`) are unpacked and only the runtime library is kept.

use crate::config::RuntimeConfig;
use crate::error::BootstrapError;
use flate2::read::GzDecoder;
use std::future::Future;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where the runtime library came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeHandle {
    /// Library was already installed
    Present(PathBuf),
    /// Library was fetched during this start
    Fetched(PathBuf),
}

impl RuntimeHandle {
    pub fn library_path(&self) -> &Path {
        match self {
            RuntimeHandle::Present(path) | RuntimeHandle::Fetched(path) => path,
        }
    }
}

/// Makes the numerical runtime available before any model is loaded
pub trait RuntimeBootstrap {
    fn ensure(&self) -> impl Future<Output = Result<RuntimeHandle, BootstrapError>>;
}

/// Bootstrap for a dynamically loaded ONNX Runtime
pub struct OrtBootstrap {
    library_path: PathBuf,
    download_url: Option<String>,
    client: reqwest::Client,
}

impl OrtBootstrap {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            library_path: config.library_path.clone(),
            // An empty URL turns the download off
            download_url: config.download_url.clone().filter(|url| !url.is_empty()),
            client: reqwest::Client::new(),
        }
    }

    pub fn is_present(&self) -> bool {
        self.library_path.is_file()
    }

    /// Locate the library, downloading it if necessary, without initialising ONNX Runtime
    pub async fn resolve(&self) -> Result<RuntimeHandle, BootstrapError> {
        if self.is_present() {
            info!(path = %self.library_path.display(), "ONNX Runtime library already present");
            return Ok(RuntimeHandle::Present(self.library_path.clone()));
        }

        let url = self
            .download_url
            .as_deref()
            .ok_or_else(|| BootstrapError::MissingUrl(self.library_path.clone()))?;

        warn!(
            path = %self.library_path.display(),
            url = %url,
            "ONNX Runtime library missing, downloading"
        );
        self.fetch(url).await?;
        info!(path = %self.library_path.display(), "ONNX Runtime library downloaded");

        Ok(RuntimeHandle::Fetched(self.library_path.clone()))
    }

    async fn fetch(&self, url: &str) -> Result<(), BootstrapError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(BootstrapError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response.bytes().await?;
        debug!(bytes = body.len(), "Runtime download complete");

        let library = if is_archive(url) {
            let name = library_file_name(&self.library_path);
            tokio::task::spawn_blocking(move || extract_library(&body, &name))
                .await
                .map_err(|e| BootstrapError::Archive(e.to_string()))??
        } else {
            body.to_vec()
        };

        if let Some(parent) = self.library_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Write under a temporary name so a partial download never looks present
        let partial = self.library_path.with_extension("part");
        tokio::fs::write(&partial, &library).await?;
        tokio::fs::rename(&partial, &self.library_path).await?;

        Ok(())
    }

    fn install(library: &Path) -> Result<(), BootstrapError> {
        let path = library.to_string_lossy().into_owned();
        ort::init_from(path)
            .with_name("image-classifier")
            .commit()
            .map_err(|e| BootstrapError::Init(e.to_string()))?;
        info!("ONNX Runtime initialized");
        Ok(())
    }
}

impl RuntimeBootstrap for OrtBootstrap {
    async fn ensure(&self) -> Result<RuntimeHandle, BootstrapError> {
        let handle = self.resolve().await?;

        // ort panics when the file is not a loadable library
        let library = handle.library_path().to_path_buf();
        tokio::task::spawn_blocking(move || Self::install(&library))
            .await
            .map_err(|e| BootstrapError::Init(panic_reason(e)))??;

        Ok(handle)
    }
}

fn panic_reason(err: tokio::task::JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<String>()
            .cloned()
            .or_else(|| payload.downcast_ref::<&str>().map(|s| s.to_string()))
            .unwrap_or_else(|| "runtime library could not be loaded".to_string()),
        Err(err) => err.to_string(),
    }
}

fn is_archive(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.ends_with(".tgz") || path.ends_with(".tar.gz")
}

fn library_file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `libonnxruntime.so.1.22.0` and `libonnxruntime.1.22.0.dylib` both match
/// `libonnxruntime.so` / `libonnxruntime.dylib`; provider libraries do not.
fn is_runtime_library(candidate: &str, library: &str) -> bool {
    let stem = library.split('.').next().unwrap_or(library);
    candidate.split('.').next() == Some(stem)
        && candidate
            .split('.')
            .any(|part| matches!(part, "so" | "dylib" | "dll"))
}

/// Pull the runtime shared library out of a gzipped release tarball
fn extract_library(archive: &[u8], library: &str) -> Result<Vec<u8>, BootstrapError> {
    let mut archive = tar::Archive::new(GzDecoder::new(archive));

    for entry in archive.entries()? {
        let mut entry = entry?;
        // Versionless names in the archive are symlinks
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let path = entry.path()?.into_owned();
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if is_runtime_library(name, library) {
            debug!(entry = %path.display(), "Extracting runtime library");
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut bytes)?;
            return Ok(bytes);
        }
    }

    Err(BootstrapError::Archive(library.to_string()))
}
