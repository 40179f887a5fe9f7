//! Inference statistics for the classifier session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for predictions
pub struct InferenceMetrics {
    /// Predict requests that passed the model-ready check
    pub predictions_requested: AtomicU64,
    /// Predictions rendered as a ranked list
    pub predictions_completed: AtomicU64,
    /// Predictions that ended in an error entry
    pub predictions_failed: AtomicU64,
    /// Predict requests refused because no model was loaded
    pub predictions_rejected: AtomicU64,
    /// Finished inferences superseded before they could be shown
    pub stale_results: AtomicU64,
    /// Images selected
    pub images_selected: AtomicU64,
    /// Inference times (in microseconds)
    inference_times: RwLock<Vec<u64>>,
    /// Top-1 confidence distribution buckets
    confidence_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl InferenceMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            predictions_requested: AtomicU64::new(0),
            predictions_completed: AtomicU64::new(0),
            predictions_failed: AtomicU64::new(0),
            predictions_rejected: AtomicU64::new(0),
            stale_results: AtomicU64::new(0),
            images_selected: AtomicU64::new(0),
            inference_times: RwLock::new(Vec::with_capacity(256)),
            confidence_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    pub fn record_request(&self) {
        self.predictions_requested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.predictions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_image(&self) {
        self.images_selected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale(&self) {
        self.stale_results.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.predictions_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rendered prediction
    pub fn record_prediction(&self, inference_time: Duration, top1: Option<f32>) {
        self.predictions_completed.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.inference_times.write() {
            times.push(inference_time.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        if let Some(confidence) = top1 {
            let bucket = (confidence.clamp(0.0, 1.0) * 10.0).min(9.0) as usize;
            if let Ok(mut buckets) = self.confidence_buckets.write() {
                buckets[bucket] += 1;
            }
        }
    }

    /// Get inference time statistics
    pub fn get_inference_stats(&self) -> InferenceStats {
        let Ok(times) = self.inference_times.read() else {
            return InferenceStats::default();
        };
        if times.is_empty() {
            return InferenceStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();
        let percentile = |p: f64| sorted[((count as f64 * p) as usize).min(count - 1)];

        InferenceStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: percentile(0.95),
            p99_us: percentile(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Get top-1 confidence distribution
    pub fn get_confidence_distribution(&self) -> [u64; 10] {
        self.confidence_buckets
            .read()
            .map(|buckets| *buckets)
            .unwrap_or_default()
    }

    /// Predictions completed per minute since start
    pub fn get_rate_per_minute(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.predictions_completed.load(Ordering::Relaxed) as f64 * 60.0 / elapsed
        } else {
            0.0
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let requested = self.predictions_requested.load(Ordering::Relaxed);
        let completed = self.predictions_completed.load(Ordering::Relaxed);
        let failed = self.predictions_failed.load(Ordering::Relaxed);
        let rejected = self.predictions_rejected.load(Ordering::Relaxed);
        let stale = self.stale_results.load(Ordering::Relaxed);
        let images = self.images_selected.load(Ordering::Relaxed);
        let timing = self.get_inference_stats();
        let distribution = self.get_confidence_distribution();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║              IMAGE CLASSIFIER - SESSION SUMMARY              ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Images Selected: {:>6}  │  Predictions Requested: {:>6}     ║",
            images, requested
        );
        info!(
            "║ Completed: {:>6}  Failed: {:>6}  Rejected: {:>6}  Stale: {:>4} ║",
            completed, failed, rejected, stale
        );
        info!(
            "║ Rate: {:>6.1} predictions/min                                  ║",
            self.get_rate_per_minute()
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Inference Time (μs): mean={:>7} p50={:>7} p95={:>7} max={:>7} ║",
            timing.mean_us, timing.p50_us, timing.p95_us, timing.max_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Top-1 Confidence Distribution:                               ║");
        let total: u64 = distribution.iter().sum();
        for (i, &count) in distribution.iter().enumerate() {
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar: String = "█".repeat(((pct / 5.0) as usize).min(20));
            info!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for InferenceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Inference time statistics
#[derive(Debug, Default)]
pub struct InferenceStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Periodic metrics reporter
pub struct MetricsReporter {
    metrics: Arc<InferenceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<InferenceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = InferenceMetrics::new();

        metrics.record_request();
        metrics.record_request();
        metrics.record_prediction(Duration::from_micros(100), Some(0.95));
        metrics.record_failure();
        metrics.record_rejected();

        assert_eq!(metrics.predictions_requested.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.predictions_completed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.predictions_failed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.predictions_rejected.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.get_confidence_distribution()[9], 1);
    }

    #[test]
    fn test_inference_stats() {
        let metrics = InferenceMetrics::new();
        for us in [100, 200, 300, 400] {
            metrics.record_prediction(Duration::from_micros(us), None);
        }

        let stats = metrics.get_inference_stats();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean_us, 250);
        assert_eq!(stats.p50_us, 300);
        assert_eq!(stats.max_us, 400);
        assert_eq!(metrics.get_confidence_distribution().iter().sum::<u64>(), 0);
    }

    #[test]
    fn test_empty_stats() {
        let stats = InferenceMetrics::new().get_inference_stats();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.max_us, 0);
    }
}
