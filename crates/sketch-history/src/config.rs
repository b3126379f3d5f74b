/// Configuration for the history buffer: defaults, validation, and loading.
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Number of layers between two consecutive checkpoints.
const DEFAULT_CHECKPOINT_GAP: usize = 5;

/// Upper bound on stored layers. Validated, but not enforced by the buffer.
const DEFAULT_MAX_COUNT: usize = usize::MAX;

/// Configuration for a `HistoryBuffer`.
///
/// Fixed for the lifetime of a buffer; there is no runtime reconfiguration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Layers folded into each checkpoint. Must be at least 1.
    pub checkpoint_gap: usize,
    /// Maximum layer count. Must be bigger than 1.
    pub max_count: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            checkpoint_gap: DEFAULT_CHECKPOINT_GAP,
            max_count: DEFAULT_MAX_COUNT,
        }
    }
}

impl HistoryConfig {
    /// Creates a config with the given checkpoint gap and the default maximum.
    pub fn with_gap(checkpoint_gap: usize) -> Self {
        Self {
            checkpoint_gap,
            ..Self::default()
        }
    }

    /// Checks the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns an error if the gap is zero or the maximum count is not bigger than 1.
    pub fn validate(&self) -> Result<()> {
        if self.checkpoint_gap == 0 {
            bail!("checkpoint gap should be bigger than 0");
        }
        if self.max_count <= 1 {
            bail!(
                "maximum count should be bigger than 1 (got {})",
                self.max_count
            );
        }
        Ok(())
    }

    /// Replaces invalid fields with their defaults.
    pub fn sanitize(&mut self) {
        if self.checkpoint_gap == 0 {
            tracing::warn!(
                "checkpoint_gap must be at least 1, using {DEFAULT_CHECKPOINT_GAP}"
            );
            self.checkpoint_gap = DEFAULT_CHECKPOINT_GAP;
        }
        if self.max_count <= 1 {
            tracing::warn!("max_count must be bigger than 1, using the default");
            self.max_count = DEFAULT_MAX_COUNT;
        }
    }

    /// Reads a JSON config from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// parsed values are invalid.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read history config: {}", path.display()))?;
        let config: HistoryConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse history config: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid history config: {}", path.display()))?;
        Ok(config)
    }

    /// Loads config from `path`, falling back to defaults on any error.
    ///
    /// A missing file yields the defaults silently. Unreadable or unparsable
    /// files are logged and ignored; out-of-range values are sanitized.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<HistoryConfig>(&contents) {
                Ok(mut config) => {
                    config.sanitize();
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to parse history config at {}: {e}", path.display());
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read history config at {}: {e}", path.display());
            }
        }
        Self::default()
    }

    /// Saves config to `path` as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write history config: {}", path.display()))
    }
}
