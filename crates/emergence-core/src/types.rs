//! Core types for the emergence network

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind assigned when a caller passes an empty kind.
pub const DEFAULT_KIND: &str = "default";

/// Clamp a scalar into [0, 1]. NaN collapses to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// App identifier - allocated by the registry, never reused
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(u64);

impl AppId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "app-{}", self.0)
    }
}

/// Link identifier - allocated by the registry, never reused
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(u64);

impl LinkId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link-{}", self.0)
    }
}

/// The scalar and boolean attributes of an app.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    pub level: f64,
    pub strength: f64,
    pub flow_enabled: bool,
    pub source_connected: bool,
}

impl Attributes {
    pub fn clamped(self) -> Self {
        Self {
            level: clamp_unit(self.level),
            strength: clamp_unit(self.strength),
            ..self
        }
    }
}

/// Caller-supplied values that replace per-kind defaults at creation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strength: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_connected: Option<bool>,
}

impl AttributeOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: f64) -> Self {
        self.level = Some(level);
        self
    }

    pub fn strength(mut self, strength: f64) -> Self {
        self.strength = Some(strength);
        self
    }

    pub fn flow_enabled(mut self, enabled: bool) -> Self {
        self.flow_enabled = Some(enabled);
        self
    }

    pub fn source_connected(mut self, connected: bool) -> Self {
        self.source_connected = Some(connected);
        self
    }

    /// Fill omitted fields from `defaults`, then clamp.
    pub fn apply(self, defaults: Attributes) -> Attributes {
        Attributes {
            level: self.level.unwrap_or(defaults.level),
            strength: self.strength.unwrap_or(defaults.strength),
            flow_enabled: self.flow_enabled.unwrap_or(defaults.flow_enabled),
            source_connected: self.source_connected.unwrap_or(defaults.source_connected),
        }
        .clamped()
    }
}

/// Evolution stage. A pure projection of `level`; never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Latent,
    Active,
    Resonant,
    Stable,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Latent, Stage::Active, Stage::Resonant, Stage::Stable];

    /// Minimum level required to occupy this stage.
    pub fn threshold(self) -> f64 {
        match self {
            Stage::Latent => 0.0,
            Stage::Active => 0.25,
            Stage::Resonant => 0.5,
            Stage::Stable => 0.75,
        }
    }

    /// Highest stage whose threshold the level satisfies.
    pub fn from_level(level: f64) -> Self {
        let level = clamp_unit(level);
        Self::ALL
            .iter()
            .rev()
            .copied()
            .find(|stage| level >= stage.threshold())
            .unwrap_or(Stage::Latent)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Latent => "latent",
            Stage::Active => "active",
            Stage::Resonant => "resonant",
            Stage::Stable => "stable",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an evolution history record describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    /// One evolution step changed level and/or strength.
    Evolve,
    /// Evolution was requested at the level ceiling; nothing changed.
    Saturated,
    /// The app was produced by merging two others.
    Merge,
}

/// Immutable record in an app's evolution history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvolutionStep {
    pub kind: StepKind,
    /// Applied change to `level` (after clamping).
    pub delta: f64,
    /// Applied change to `strength` (after clamping).
    pub strength_delta: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parents: Option<[AppId; 2]>,
}

impl EvolutionStep {
    pub fn evolve(delta: f64, strength_delta: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: StepKind::Evolve,
            delta,
            strength_delta,
            timestamp,
            parents: None,
        }
    }

    pub fn saturated(timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: StepKind::Saturated,
            delta: 0.0,
            strength_delta: 0.0,
            timestamp,
            parents: None,
        }
    }

    pub fn merge(parents: [AppId; 2], timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: StepKind::Merge,
            delta: 0.0,
            strength_delta: 0.0,
            timestamp,
            parents: Some(parents),
        }
    }
}

/// A directed, typed, weighted edge. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub source: AppId,
    pub target: AppId,
    pub link_type: String,
    pub resonance: f64,
    pub created_at: DateTime<Utc>,
}

impl Link {
    pub fn touches(&self, app: AppId) -> bool {
        self.source == app || self.target == app
    }
}

/// A node in the emergence network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct App {
    pub id: AppId,
    pub kind: String,
    #[serde(flatten)]
    pub attributes: Attributes,
    pub created_at: DateTime<Utc>,
    pub manifested: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifested_at: Option<DateTime<Utc>>,
    /// Outgoing links, in creation order.
    pub links: Vec<Link>,
    pub evolution_history: Vec<EvolutionStep>,
    /// Source apps, for apps produced by a merge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parents: Option<[AppId; 2]>,
}

impl App {
    pub fn new(id: AppId, kind: impl Into<String>, attributes: Attributes, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            kind: kind.into(),
            attributes: attributes.clamped(),
            created_at,
            manifested: false,
            manifested_at: None,
            links: Vec::new(),
            evolution_history: Vec::new(),
            parents: None,
        }
    }

    pub fn level(&self) -> f64 {
        self.attributes.level
    }

    pub fn strength(&self) -> f64 {
        self.attributes.strength
    }

    pub fn stage(&self) -> Stage {
        Stage::from_level(self.attributes.level)
    }

    /// Mark the app manifested. Returns `false` if it already was.
    pub fn manifest(&mut self, at: DateTime<Utc>) -> bool {
        if self.manifested {
            return false;
        }
        self.manifested = true;
        self.manifested_at = Some(at);
        true
    }
}
