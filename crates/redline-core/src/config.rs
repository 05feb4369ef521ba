//! Engine configuration.
//!
//! Every field has a default, so a config file only needs to name the
//! values it changes. Loading goes through JSON, matching how policies are
//! supplied.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

/// Radius, in characters, of the context window kept around each match.
pub const DEFAULT_CONTEXT_RADIUS: usize = 50;

/// Inputs larger than this are truncated before scanning.
pub const DEFAULT_MAX_INPUT_BYTES: usize = 256 * 1024;

/// Session buffers retain at most this many trailing bytes.
pub const DEFAULT_SESSION_MAX_BYTES: usize = 50 * 1024;

/// Inactivity after which a session buffer is cleared on the next append.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 10 * 60;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scan: ScanConfig,
    pub session: SessionConfig,
}

impl EngineConfig {
    /// Read an engine configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }
}

/// Knobs for a single scan pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub context_radius: usize,
    /// Over-cap input is truncated at a char boundary, never rejected.
    pub max_input_bytes: usize,
    /// Run the evasion decoder and scan its candidates as well.
    pub decode_evasions: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            context_radius: DEFAULT_CONTEXT_RADIUS,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            decode_evasions: true,
        }
    }
}

/// Bounds of the per-session accumulation buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub max_bytes: usize,
    pub idle_timeout_secs: u64,
    /// Inserted between consecutive chunks.
    pub separator: String,
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_SESSION_MAX_BYTES,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            separator: " ".to_string(),
        }
    }
}
