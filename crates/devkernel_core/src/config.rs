//! Kernel configuration.
//!
//! # Responsibility
//! - Carry the tunables managers read at construction time.
//! - Parse host-provided JSON with defaults for omitted fields.

use crate::error::{KernelError, KernelResult};
use serde::{Deserialize, Serialize};

/// Thresholds the performance manager compares samples against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceThresholds {
    pub memory_mb: f64,
    pub cpu_percent: f64,
    pub frame_time_ms: f64,
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            memory_mb: 512.0,
            cpu_percent: 80.0,
            frame_time_ms: 16.7,
        }
    }
}

/// Top-level kernel configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub workspace_name: String,
    /// Working directory for new terminals.
    pub terminal_cwd: String,
    /// Commands kept per terminal history.
    pub terminal_history_limit: usize,
    /// Lines kept per terminal output log.
    pub terminal_output_limit: usize,
    pub search_max_results: usize,
    /// Install and enable the built-in plugins on `initialize`.
    pub builtin_plugins: bool,
    pub performance: PerformanceThresholds,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            workspace_name: "workspace".to_string(),
            terminal_cwd: "/".to_string(),
            terminal_history_limit: 500,
            terminal_output_limit: 5_000,
            search_max_results: 1_000,
            builtin_plugins: true,
            performance: PerformanceThresholds::default(),
        }
    }
}

impl KernelConfig {
    /// Parses and validates a JSON document; omitted fields take defaults.
    pub fn from_json_str(raw: &str) -> KernelResult<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|err| KernelError::validation(format!("invalid kernel config: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> KernelResult<()> {
        if self.terminal_cwd.trim().is_empty() {
            return Err(KernelError::validation("terminal_cwd must not be empty"));
        }
        for (field, value) in [
            ("terminal_history_limit", self.terminal_history_limit),
            ("terminal_output_limit", self.terminal_output_limit),
            ("search_max_results", self.search_max_results),
        ] {
            if value == 0 {
                return Err(KernelError::validation(format!("{field} must be > 0")));
            }
        }
        let thresholds = &self.performance;
        if thresholds.memory_mb <= 0.0
            || thresholds.cpu_percent <= 0.0
            || thresholds.frame_time_ms <= 0.0
        {
            return Err(KernelError::validation(
                "performance thresholds must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::KernelConfig;
    use crate::error::KernelError;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = KernelConfig::from_json_str(
            r#"{"workspace_name":"demo","performance":{"cpu_percent":50.0}}"#,
        )
        .expect("config should parse");
        assert_eq!(config.workspace_name, "demo");
        assert_eq!(config.performance.cpu_percent, 50.0);
        assert_eq!(config.performance.memory_mb, 512.0);
        assert_eq!(config.terminal_history_limit, 500);
    }

    #[test]
    fn rejects_zero_limits_and_empty_cwd() {
        let err = KernelConfig::from_json_str(r#"{"terminal_output_limit":0}"#)
            .expect_err("zero limit should fail");
        assert!(matches!(err, KernelError::Validation(_)));

        let config = KernelConfig {
            terminal_cwd: "  ".to_string(),
            ..KernelConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(KernelConfig::from_json_str("not json").is_err());
    }
}
