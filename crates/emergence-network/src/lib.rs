//! Emergence Network: registry of apps linked, merged, evolved, and streamed
//!
//! Architecture:
//! - `EmergenceNetwork` (registry): owns apps, links, the event log
//! - `LinkManager`, `MergeEngine`, `EvolutionEngine`, `ResonanceEngine`: engines held by the registry
//! - `EventBus`: synchronous, panic-isolated listener dispatch
//! - `StreamGenerator`: Idle/Armed pull state machine for streamed apps
//! - `SharedNetwork`: single-mutex handle for multi-threaded hosts
//!
//! Scoring is configuration: `ScoringModel` is swappable through `NetworkBuilder`.

pub mod analysis;
pub mod config;
pub mod events;
pub mod evolution;
pub mod link;
pub mod merge;
pub mod registry;
pub mod scoring;
pub mod shared;
pub mod stream;

pub use analysis::{NetworkAnalysis, ResonanceEngine};
pub use config::{EventConfig, KindDefaults, NetworkConfig, ScoringConfig, StreamConfig};
pub use events::{EventBus, EventKind, EventRecord, Listener, ListenerId, NetworkEvent};
pub use evolution::{EvolutionEngine, EvolutionOutcome};
pub use link::{LinkManager, DEFAULT_LINK_TYPE};
pub use merge::MergeEngine;
pub use registry::{EmergenceNetwork, NetworkBuilder};
pub use scoring::{EvolutionDelta, LinkInfluence, ScoringModel, WeightedScoring};
pub use shared::SharedNetwork;
pub use stream::{StreamGenerator, StreamPull, StreamState};

pub use emergence_core::{
    App, AppId, AttributeOverrides, Attributes, Clock, Error, EvolutionStep, Link, LinkId,
    ManualClock, Result, Stage, StepKind, SystemClock,
};
