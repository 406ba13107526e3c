/*!
 * Kernel Configuration
 *
 * Runtime knobs for one consciousness instance. Defaults mirror the
 * constants in `core::limits`; presets and environment overrides follow
 * the same shape as the other configuration types in the kernel.
 */

use super::errors::{KernelError, Result};
use super::limits::*;
use super::types::Megabytes;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Kernel configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct KernelConfig {
    /// Simulated memory pool per character (default: 4096MB)
    pub total_memory: Megabytes,

    /// Soft reserve reported by the allocator (default: 256MB)
    pub reserved_memory: Megabytes,

    /// Free memory required after any allocation (default: 256MB)
    pub min_reserve: Megabytes,

    /// Largest share of total memory a single allocation may take (default: 0.4)
    pub max_allocation_percent: f64,

    /// Predicted fragmentation ceiling for allocations (default: 60)
    pub max_predicted_fragmentation: f64,

    /// Bias strategy selection and risk gates toward conservative outcomes
    pub safe_mode: bool,

    /// Global flag that disables CPU throttling
    pub system_unstable: bool,

    /// Hybrid optimization combined-risk ceiling (default: 0.7)
    pub max_combined_risk: f64,

    /// Undo stack depth kept by `CommandHistory` (default: 100)
    pub history_limit: usize,

    /// Process names that are never reclaimed from or killed without force
    pub critical_processes: Vec<String>,
}

impl KernelConfig {
    /// Create default configuration
    pub fn new() -> Self {
        Self {
            total_memory: DEFAULT_TOTAL_MEMORY,
            reserved_memory: DEFAULT_RESERVED_MEMORY,
            min_reserve: DEFAULT_MIN_RESERVE,
            max_allocation_percent: MAX_ALLOCATION_PERCENT,
            max_predicted_fragmentation: MAX_PREDICTED_FRAGMENTATION,
            safe_mode: false,
            system_unstable: false,
            max_combined_risk: MAX_COMBINED_RISK,
            history_limit: DEFAULT_HISTORY_LIMIT,
            critical_processes: CRITICAL_PROCESS_NAMES
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }

    /// Conservative configuration: safe mode on, larger reserve
    pub fn conservative() -> Self {
        Self {
            safe_mode: true,
            min_reserve: DEFAULT_MIN_RESERVE * 2,
            max_predicted_fragmentation: 45.0,
            ..Self::new()
        }
    }

    /// Permissive configuration for experiments and tests
    pub fn permissive() -> Self {
        Self {
            min_reserve: MIN_BLOCK_SIZE,
            max_predicted_fragmentation: 100.0,
            max_combined_risk: 1.0,
            ..Self::new()
        }
    }

    /// Builder-style total memory override
    #[must_use]
    pub fn with_total_memory(mut self, total: Megabytes) -> Self {
        self.total_memory = total;
        self
    }

    /// Builder-style safe mode override
    #[must_use]
    pub fn with_safe_mode(mut self, safe_mode: bool) -> Self {
        self.safe_mode = safe_mode;
        self
    }

    /// Default configuration with environment overrides applied
    ///
    /// Environment variables:
    /// - MIND_KERNEL_TOTAL_MEMORY: memory pool in MB
    /// - MIND_KERNEL_SAFE_MODE: "1" or "true" enables safe mode
    /// - MIND_KERNEL_HISTORY_LIMIT: undo stack depth
    pub fn from_env() -> Self {
        let mut config = Self::new();

        if let Ok(raw) = std::env::var("MIND_KERNEL_TOTAL_MEMORY") {
            match raw.parse() {
                Ok(total) => config.total_memory = total,
                Err(e) => warn!(value = %raw, error = %e, "Ignoring invalid MIND_KERNEL_TOTAL_MEMORY"),
            }
        }

        if let Ok(raw) = std::env::var("MIND_KERNEL_SAFE_MODE") {
            config.safe_mode = raw == "1" || raw.eq_ignore_ascii_case("true");
        }

        if let Ok(raw) = std::env::var("MIND_KERNEL_HISTORY_LIMIT") {
            match raw.parse() {
                Ok(limit) => config.history_limit = limit,
                Err(e) => warn!(value = %raw, error = %e, "Ignoring invalid MIND_KERNEL_HISTORY_LIMIT"),
            }
        }

        config
    }

    /// Reject settings the allocator and commands cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.total_memory < MIN_BLOCK_SIZE {
            return Err(KernelError::Configuration(format!(
                "total_memory {}MB is below the {}MB minimum block",
                self.total_memory, MIN_BLOCK_SIZE
            )));
        }
        if self.reserved_memory >= self.total_memory || self.min_reserve >= self.total_memory {
            return Err(KernelError::Configuration(format!(
                "reserves ({}MB reserved, {}MB minimum) must be below total_memory {}MB",
                self.reserved_memory, self.min_reserve, self.total_memory
            )));
        }
        if !(self.max_allocation_percent > 0.0 && self.max_allocation_percent <= 1.0) {
            return Err(KernelError::Configuration(format!(
                "max_allocation_percent {} must be in (0, 1]",
                self.max_allocation_percent
            )));
        }
        if !(0.0..=1.0).contains(&self.max_combined_risk) {
            return Err(KernelError::Configuration(format!(
                "max_combined_risk {} must be in [0, 1]",
                self.max_combined_risk
            )));
        }
        if self.history_limit == 0 {
            return Err(KernelError::Configuration(
                "history_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Largest single allocation permitted by the percentage cap
    #[inline]
    pub fn max_allocation(&self) -> f64 {
        self.total_memory as f64 * self.max_allocation_percent
    }

    /// Whether a process name is on the critical list
    pub fn is_critical(&self, name: &str) -> bool {
        self.critical_processes.iter().any(|critical| critical == name)
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::new()
    }
}
