//! Plan files: the operations a `tq run` feeds into a schedule

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// A set of operations to schedule, plus keys to cancel right after scheduling
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Plan {
    pub operations: Vec<PlannedOperation>,

    /// Keys removed once every operation has been added
    pub cancel: Vec<String>,
}

/// One operation in a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedOperation {
    pub key: String,

    /// Delay before the first firing, in milliseconds
    #[serde(rename = "delay-ms", default)]
    pub delay_ms: u64,

    /// Total number of firings; every re-add after the first uses backoff
    #[serde(default = "default_attempts")]
    pub attempts: u32,
}

fn default_attempts() -> u32 {
    1
}

impl PlannedOperation {
    /// Get the first delay as a Duration
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Plan {
    /// Load and validate a plan from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).context(format!("Failed to read plan {}", path.display()))?;
        let plan = Self::from_yaml(&content).context(format!("Invalid plan {}", path.display()))?;
        tracing::info!(operations = plan.operations.len(), "Loaded plan from: {}", path.display());
        Ok(plan)
    }

    /// Parse and validate a plan from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let plan: Self = serde_yaml::from_str(content).context("Failed to parse plan")?;
        plan.validate()?;
        Ok(plan)
    }

    /// Keys must be unique and every operation must fire at least once
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for op in &self.operations {
            if op.key.is_empty() {
                return Err(eyre!("Operation key must not be empty"));
            }
            if !seen.insert(op.key.as_str()) {
                return Err(eyre!("Duplicate operation key: {}", op.key));
            }
            if op.attempts == 0 {
                return Err(eyre!("Operation {} must have at least one attempt", op.key));
            }
        }
        Ok(())
    }
}
