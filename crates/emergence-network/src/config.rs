//! Network configuration
//!
//! All tunable parameters in one place. Loaded from TOML at startup,
//! falls back to defaults if no config file exists.

use emergence_core::{Attributes, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Top-level network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Attribute defaults for kinds without their own entry.
    pub default_kind: KindDefaults,
    /// Per-kind attribute defaults, keyed by kind name.
    pub kinds: BTreeMap<String, KindDefaults>,
    /// Weights for the built-in scoring model.
    pub scoring: ScoringConfig,
    /// Stream generator parameters.
    pub stream: StreamConfig,
    /// Event log parameters.
    pub events: EventConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindDefaults {
    pub level: f64,
    pub strength: f64,
    pub flow_enabled: bool,
    pub source_connected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Weight of level affinity (1 - |Δlevel|) in link resonance.
    pub affinity_weight: f64,
    /// Weight of the pair's mean strength in link resonance.
    pub strength_weight: f64,
    /// Added to link resonance when both ends have flow enabled.
    pub shared_flow_bonus: f64,

    /// Weight of the app's own attributes in app resonance.
    pub attribute_weight: f64,
    /// Weight of mean outgoing link resonance in app resonance.
    pub link_weight: f64,
    /// Added to app resonance per capability flag set.
    pub flag_bonus: f64,

    /// Level gained per evolution step before link influence.
    pub base_rate: f64,
    /// Strength gained per evolution step before link influence.
    pub strength_rate: f64,
    /// Extra level per unit of total outgoing link resonance.
    pub link_influence: f64,
    /// Cap on the extra level contributed by links in one step.
    pub max_link_boost: f64,
    /// Extra level per step when flow is enabled.
    pub flow_bonus: f64,
    /// Extra level per step when the source is connected.
    pub source_bonus: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Kind given to streamed apps.
    pub kind: String,
    /// Extra attempts after the first when an app misses the threshold.
    pub retry_cap: u32,
    /// RNG seed for sampled attributes. Unset means seeded from entropy.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Number of events retained in the in-memory event log.
    pub log_capacity: usize,
}

// ============================================================
// Defaults
// ============================================================

impl Default for NetworkConfig {
    fn default() -> Self {
        let mut kinds = BTreeMap::new();
        kinds.insert(
            "api_app".to_string(),
            KindDefaults { level: 0.3, strength: 0.6, flow_enabled: true, source_connected: true },
        );
        Self {
            default_kind: KindDefaults::default(),
            kinds,
            scoring: ScoringConfig::default(),
            stream: StreamConfig::default(),
            events: EventConfig::default(),
        }
    }
}

impl Default for KindDefaults {
    fn default() -> Self {
        Self { level: 0.1, strength: 0.5, flow_enabled: false, source_connected: false }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            affinity_weight: 0.5,
            strength_weight: 0.4,
            shared_flow_bonus: 0.1,

            attribute_weight: 0.5,
            link_weight: 0.4,
            flag_bonus: 0.05,

            base_rate: 0.1,
            strength_rate: 0.05,
            link_influence: 0.05,
            max_link_boost: 0.2,
            flow_bonus: 0.02,
            source_bonus: 0.02,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { kind: "emergent".into(), retry_cap: 64, seed: None }
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self { log_capacity: 1024 }
    }
}

impl KindDefaults {
    pub fn attributes(&self) -> Attributes {
        Attributes {
            level: self.level,
            strength: self.strength,
            flow_enabled: self.flow_enabled,
            source_connected: self.source_connected,
        }
        .clamped()
    }
}

// ============================================================
// Loading
// ============================================================

impl NetworkConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_toml_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Strict load: a missing or malformed file is an error.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(e.to_string()))
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// Attribute defaults for `kind`. Pure function of the kind name.
    pub fn attributes_for(&self, kind: &str) -> Attributes {
        self.kinds
            .get(kind)
            .unwrap_or(&self.default_kind)
            .attributes()
    }
}
