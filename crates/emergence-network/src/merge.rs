//! Merge engine: fuses two apps into a new one
//!
//! Policy:
//! - level/strength: arithmetic mean, clamped
//! - kind: shared kind, or "{a}+{b}" when they differ
//! - capability flags: logical OR
//! - manifestation: OR, keeping the earliest timestamp
//! - history: both histories interleaved chronologically, then one merge record
//!
//! The engine is pure. Removing the inputs and pruning their links is the
//! registry's job.

use chrono::{DateTime, Utc};
use emergence_core::{clamp_unit, App, AppId, Attributes, EvolutionStep};

#[derive(Clone, Copy, Debug, Default)]
pub struct MergeEngine;

impl MergeEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn merged_kind(a: &str, b: &str) -> String {
        if a == b {
            a.to_string()
        } else {
            format!("{a}+{b}")
        }
    }

    /// Build the app that replaces `a` and `b`. It starts with no links.
    pub fn fuse(&self, id: AppId, a: &App, b: &App, now: DateTime<Utc>) -> App {
        let attributes = Attributes {
            level: clamp_unit((a.level() + b.level()) / 2.0),
            strength: clamp_unit((a.strength() + b.strength()) / 2.0),
            flow_enabled: a.attributes.flow_enabled || b.attributes.flow_enabled,
            source_connected: a.attributes.source_connected || b.attributes.source_connected,
        };

        let mut merged = App::new(id, Self::merged_kind(&a.kind, &b.kind), attributes, now);

        let manifested_at = match (a.manifested_at, b.manifested_at) {
            (Some(x), Some(y)) => Some(x.min(y)),
            (x, y) => x.or(y),
        };
        if let Some(at) = manifested_at {
            merged.manifest(at);
        }

        let mut history = interleave(&a.evolution_history, &b.evolution_history);
        history.push(EvolutionStep::merge([a.id, b.id], now));
        merged.evolution_history = history;
        merged.parents = Some([a.id, b.id]);
        merged
    }
}

/// Stable two-way merge by timestamp; on ties `a` comes first.
fn interleave(a: &[EvolutionStep], b: &[EvolutionStep]) -> Vec<EvolutionStep> {
    let mut out = Vec::with_capacity(a.len() + b.len() + 1);
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i].timestamp <= b[j].timestamp {
            out.push(a[i].clone());
            i += 1;
        } else {
            out.push(b[j].clone());
            j += 1;
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}
