//! Status indicator shown above the controls

use serde::Serialize;

/// Colour of the status indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTone {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub text: String,
    pub tone: StatusTone,
    pub visible: bool,
}

impl StatusMessage {
    pub const LOADING: &'static str = "Cargando modelo...";
    pub const READY: &'static str = "Modelo cargado. ¡Listo para hacer predicciones!";

    pub fn hidden() -> Self {
        Self {
            text: String::new(),
            tone: StatusTone::Info,
            visible: false,
        }
    }

    pub fn loading() -> Self {
        Self {
            text: Self::LOADING.to_string(),
            tone: StatusTone::Info,
            visible: true,
        }
    }

    pub fn ready() -> Self {
        Self {
            text: Self::READY.to_string(),
            tone: StatusTone::Success,
            visible: true,
        }
    }

    pub fn load_failed(reason: &str) -> Self {
        Self {
            text: format!("Error al cargar el modelo: {}", reason),
            tone: StatusTone::Error,
            visible: true,
        }
    }
}

impl Default for StatusMessage {
    fn default() -> Self {
        Self::hidden()
    }
}
