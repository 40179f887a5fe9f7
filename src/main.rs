//! Image Classifier - Main Entry Point
//!
//! Bootstraps ONNX Runtime, loads the model and classifies images chosen from
//! the terminal (`open <path>`, `predict`, `status`, `quit`).

use anyhow::Result;
use clap::Parser;
use image_classifier::{
    config::{AppConfig, LoggingConfig, DEFAULT_CONFIG_PATH},
    metrics::{InferenceMetrics, MetricsReporter},
    ui::{events, ControllerSettings},
    App, Controller, OnnxModelSource, OrtBootstrap, TerminalView, UiEvent,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

#[derive(Parser)]
#[command(name = "image-classifier")]
#[command(version)]
#[command(about = "Classify images with an ONNX model and show the top-5 classes", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Select this image once the model has loaded
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Run one prediction and exit instead of reading commands from stdin
    #[arg(short, long)]
    predict: bool,
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("image_classifier={}", logging.level).parse()?);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load_from_path(&cli.config)?;
    init_logging(&config.logging)?;

    info!("Starting Image Classifier");
    info!(
        model = %config.model.path.display(),
        labels = %config.model.labels_path.display(),
        runtime = %config.runtime.library_path.display(),
        "Configuration loaded from {}",
        cli.config.display()
    );

    let metrics = Arc::new(InferenceMetrics::new());
    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let controller = Controller::new(
        TerminalView::stdout(),
        ControllerSettings {
            top_k: config.model.top_k,
            single_flight: config.ui.single_flight,
        },
        metrics.clone(),
    );
    let phase = controller.subscribe();

    let app = App::new(
        controller,
        OrtBootstrap::new(&config.runtime),
        OnnxModelSource::new(&config.model),
    );

    let (tx, rx) = mpsc::channel(32);
    let mut scripted = Vec::new();
    if let Some(image) = cli.image {
        scripted.push(UiEvent::SelectImage(image));
    }

    if cli.predict {
        scripted.push(UiEvent::Predict);
        events::spawn_script(scripted, phase, tx);
    } else {
        if !scripted.is_empty() {
            events::spawn_preload(scripted, phase, tx.clone());
        }
        println!("Comandos: open <ruta>, predict, status, quit");
        events::spawn_stdin_reader(tx);
    }

    let controller = app.run(rx).await;
    info!(phase = ?controller.phase(), "Image Classifier shutting down...");
    metrics.print_summary();

    Ok(())
}
