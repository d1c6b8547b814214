//! Performance sampling and reports.
//!
//! # Responsibility
//! - Pull samples from a [`MetricsSource`] while monitoring is on.
//! - Produce immutable report snapshots compared against configured thresholds.

use crate::config::PerformanceThresholds;
use crate::error::{KernelError, KernelResult};
use crate::event::{EventBus, KernelEvent};
use crate::model::file::now_epoch_ms;
use log::{debug, info};
use serde::Serialize;
use std::collections::VecDeque;

const SAMPLE_WINDOW: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsSample {
    pub memory_mb: f64,
    pub cpu_percent: f64,
    pub frame_time_ms: f64,
}

/// Host-provided metrics feed.
pub trait MetricsSource {
    fn sample(&mut self) -> MetricsSample;
}

/// Source that reports the same sample every time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedMetrics(pub MetricsSample);

impl Default for FixedMetrics {
    fn default() -> Self {
        Self(MetricsSample {
            memory_mb: 128.0,
            cpu_percent: 5.0,
            frame_time_ms: 8.0,
        })
    }
}

impl MetricsSource for FixedMetrics {
    fn sample(&mut self) -> MetricsSample {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub samples: usize,
    pub latest: Option<MetricsSample>,
    pub peak_memory_mb: f64,
    pub average_cpu_percent: f64,
    pub average_frame_time_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceIssue {
    pub metric: &'static str,
    pub value: f64,
    pub threshold: f64,
}

/// Snapshot taken at `get_report` time; later samples do not change it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub monitoring: bool,
    pub metrics: MetricsSummary,
    pub recommendations: Vec<String>,
    pub issues: Vec<PerformanceIssue>,
    /// Unix epoch milliseconds when the snapshot was taken.
    pub generated_at_ms: i64,
}

pub struct PerformanceManager {
    monitoring: bool,
    samples: VecDeque<MetricsSample>,
    thresholds: PerformanceThresholds,
    source: Box<dyn MetricsSource>,
    bus: EventBus,
}

impl PerformanceManager {
    pub fn new(bus: EventBus, thresholds: PerformanceThresholds) -> Self {
        Self::with_source(bus, thresholds, Box::new(FixedMetrics::default()))
    }

    pub fn with_source(
        bus: EventBus,
        thresholds: PerformanceThresholds,
        source: Box<dyn MetricsSource>,
    ) -> Self {
        Self {
            monitoring: false,
            samples: VecDeque::new(),
            thresholds,
            source,
            bus,
        }
    }

    pub fn set_source(&mut self, source: Box<dyn MetricsSource>) {
        self.source = source;
    }

    pub fn start_monitoring(&mut self) -> KernelResult<()> {
        if self.monitoring {
            return Err(KernelError::state("startMonitoring", "already monitoring"));
        }
        self.monitoring = true;
        info!("event=perf_monitor module=performance status=started");
        self.bus.emit(KernelEvent::MonitoringStarted);
        Ok(())
    }

    pub fn stop_monitoring(&mut self) -> KernelResult<()> {
        if !self.monitoring {
            return Err(KernelError::state("stopMonitoring", "not monitoring"));
        }
        self.monitoring = false;
        info!("event=perf_monitor module=performance status=stopped");
        self.bus.emit(KernelEvent::MonitoringStopped);
        Ok(())
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitoring
    }

    /// Takes one sample while monitoring; returns 1 if a sample was taken.
    pub fn run_pending(&mut self) -> usize {
        if !self.monitoring {
            return 0;
        }
        let sample = self.source.sample();
        self.samples.push_back(sample);
        while self.samples.len() > SAMPLE_WINDOW {
            self.samples.pop_front();
        }
        debug!(
            "event=perf_sample module=performance status=ok memory_mb={:.1} cpu={:.1}",
            sample.memory_mb, sample.cpu_percent
        );
        1
    }

    pub fn get_report(&self) -> PerformanceReport {
        let latest = self.samples.back().copied();
        let count = self.samples.len();
        let average = |pick: fn(&MetricsSample) -> f64| {
            if count == 0 {
                0.0
            } else {
                self.samples.iter().map(pick).sum::<f64>() / count as f64
            }
        };
        let metrics = MetricsSummary {
            samples: count,
            latest,
            peak_memory_mb: self
                .samples
                .iter()
                .map(|sample| sample.memory_mb)
                .fold(0.0, f64::max),
            average_cpu_percent: average(|sample| sample.cpu_percent),
            average_frame_time_ms: average(|sample| sample.frame_time_ms),
        };

        let mut issues = Vec::new();
        let mut recommendations = Vec::new();
        if let Some(sample) = latest {
            let checks = [
                (
                    "memory_mb",
                    sample.memory_mb,
                    self.thresholds.memory_mb,
                    "Close unused editors and terminals to release memory",
                ),
                (
                    "cpu_percent",
                    sample.cpu_percent,
                    self.thresholds.cpu_percent,
                    "Disable plugins that are not in use",
                ),
                (
                    "frame_time_ms",
                    sample.frame_time_ms,
                    self.thresholds.frame_time_ms,
                    "Reduce editor decorations and split groups",
                ),
            ];
            for (metric, value, threshold, advice) in checks {
                if value > threshold {
                    issues.push(PerformanceIssue {
                        metric,
                        value,
                        threshold,
                    });
                    recommendations.push(advice.to_string());
                }
            }
        }

        PerformanceReport {
            monitoring: self.monitoring,
            metrics,
            recommendations,
            issues,
            generated_at_ms: now_epoch_ms(),
        }
    }

    /// Applies the current recommendations and compacts the sample window.
    pub fn optimize(&mut self) -> Vec<String> {
        self.bus.emit(KernelEvent::OptimizationStarted);
        let mut actions = self.get_report().recommendations;
        if self.samples.len() > 1 {
            let dropped = self.samples.len() - 1;
            self.samples.drain(..dropped);
            actions.push(format!("Compacted {dropped} old sample(s)"));
        }
        self.bus.emit(KernelEvent::OptimizationCompleted {
            actions: actions.clone(),
        });
        actions
    }

    pub(crate) fn clear(&mut self) {
        self.monitoring = false;
        self.samples.clear();
    }
}
