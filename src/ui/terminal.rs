//! Terminal rendering of the classifier view

use crate::types::{PredictionList, SelectedImage, StatusMessage, StatusTone};
use crate::ui::View;
use std::io::{self, Write};
use tracing::warn;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Characters of the data URL echoed in the preview line
const DATA_URL_PREVIEW: usize = 48;

/// Writes the view to a terminal (or any writer)
pub struct TerminalView<W: Write> {
    out: W,
    color: bool,
}

impl TerminalView<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout(), true)
    }
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, tone: StatusTone, text: &str) -> String {
        let code = match tone {
            StatusTone::Success => GREEN,
            StatusTone::Error => RED,
            StatusTone::Info => return text.to_string(),
        };
        if self.color {
            format!("{}{}{}", code, text, RESET)
        } else {
            text.to_string()
        }
    }

    fn write(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{}", text).and_then(|_| self.out.flush()) {
            warn!(error = %e, "Failed to write to terminal");
        }
    }
}

impl<W: Write> View for TerminalView<W> {
    fn show_status(&mut self, status: &StatusMessage) {
        if !status.visible {
            return;
        }
        let line = self.paint(status.tone, &status.text);
        self.write(&line);
    }

    fn alert(&mut self, message: &str) {
        self.write(&format!("[!] {}", message));
    }

    fn show_preview(&mut self, image: &SelectedImage) {
        let url: String = image.data_url().chars().take(DATA_URL_PREVIEW).collect();
        self.write(&format!(
            "Imagen: {} ({}, {} bytes) {}...",
            image.file_name(),
            image.mime_type(),
            image.len(),
            url
        ));
    }

    fn render_list(&mut self, list: &PredictionList) {
        if let PredictionList::Error(_) = list {
            for entry in list.entries() {
                let line = self.paint(StatusTone::Error, &format!("  • {}", entry));
                self.write(&line);
            }
            return;
        }
        for (rank, entry) in list.entries().iter().enumerate() {
            self.write(&format!("  {}. {}", rank + 1, entry));
        }
    }

    fn set_predict_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.write("(prediciendo...)");
        }
    }
}
