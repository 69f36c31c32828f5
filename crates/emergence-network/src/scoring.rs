//! Scoring functions: the opaque numeric core of resonance and evolution
//!
//! The registry treats scoring as configuration: it asks a [`ScoringModel`]
//! for a number and clamps whatever comes back. Swap in a deterministic stub
//! for tests via `NetworkBuilder::scoring`.

use crate::config::ScoringConfig;
use emergence_core::{clamp_unit, Attributes, Link};

/// Summary of an app's outgoing links, as seen by the scoring model.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LinkInfluence {
    pub count: usize,
    pub total_resonance: f64,
}

impl LinkInfluence {
    pub fn from_links(links: &[Link]) -> Self {
        Self {
            count: links.len(),
            total_resonance: links.iter().map(|l| l.resonance).sum(),
        }
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_resonance / self.count as f64
        }
    }
}

/// Signed per-step change proposed by the scoring model.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EvolutionDelta {
    pub level: f64,
    pub strength: f64,
}

pub trait ScoringModel: Send + Sync {
    /// Weight of a new link from `source` to `target`.
    fn pair_resonance(&self, source: &Attributes, target: &Attributes) -> f64;

    /// Resonance of a single app given its outgoing links.
    fn app_resonance(&self, attributes: &Attributes, links: &LinkInfluence) -> f64;

    /// Change to apply in one evolution step.
    fn evolution_delta(&self, attributes: &Attributes, links: &LinkInfluence) -> EvolutionDelta;
}

/// Default model: linear blends driven by [`ScoringConfig`].
#[derive(Clone, Debug, Default)]
pub struct WeightedScoring {
    config: ScoringConfig,
}

impl WeightedScoring {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }
}

fn flag(set: bool) -> f64 {
    if set {
        1.0
    } else {
        0.0
    }
}

impl ScoringModel for WeightedScoring {
    fn pair_resonance(&self, source: &Attributes, target: &Attributes) -> f64 {
        let c = &self.config;
        let affinity = 1.0 - (source.level - target.level).abs();
        let mean_strength = (source.strength + target.strength) / 2.0;
        let shared_flow = flag(source.flow_enabled && target.flow_enabled);
        clamp_unit(c.affinity_weight * affinity + c.strength_weight * mean_strength + c.shared_flow_bonus * shared_flow)
    }

    fn app_resonance(&self, attributes: &Attributes, links: &LinkInfluence) -> f64 {
        let c = &self.config;
        let own = (attributes.level + attributes.strength) / 2.0;
        let flags = flag(attributes.flow_enabled) + flag(attributes.source_connected);
        clamp_unit(c.attribute_weight * own + c.link_weight * links.mean() + c.flag_bonus * flags)
    }

    fn evolution_delta(&self, attributes: &Attributes, links: &LinkInfluence) -> EvolutionDelta {
        let c = &self.config;
        // Denser, stronger link sets evolve faster, up to the cap.
        let boost = (c.link_influence * links.total_resonance).min(c.max_link_boost);
        EvolutionDelta {
            level: c.base_rate
                + boost
                + c.flow_bonus * flag(attributes.flow_enabled)
                + c.source_bonus * flag(attributes.source_connected),
            strength: c.strength_rate + boost / 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(level: f64, strength: f64, flow: bool) -> Attributes {
        Attributes { level, strength, flow_enabled: flow, source_connected: false }
    }

    #[test]
    fn pair_resonance_is_bounded_and_symmetric() {
        let model = WeightedScoring::default();
        let a = attrs(0.2, 0.9, true);
        let b = attrs(0.8, 0.1, true);
        let ab = model.pair_resonance(&a, &b);
        assert_eq!(ab, model.pair_resonance(&b, &a));
        assert!((0.0..=1.0).contains(&ab));

        let maxed = model.pair_resonance(&attrs(1.0, 1.0, true), &attrs(1.0, 1.0, true));
        assert!(maxed > 0.999 && maxed <= 1.0);
    }

    #[test]
    fn identical_levels_resonate_more_than_distant_ones() {
        let model = WeightedScoring::default();
        let near = model.pair_resonance(&attrs(0.5, 0.5, false), &attrs(0.5, 0.5, false));
        let far = model.pair_resonance(&attrs(0.0, 0.5, false), &attrs(1.0, 0.5, false));
        assert!(near > far);
    }

    #[test]
    fn link_boost_is_capped() {
        let model = WeightedScoring::default();
        let a = attrs(0.1, 0.1, false);
        let none = model.evolution_delta(&a, &LinkInfluence::default());
        let some = model.evolution_delta(&a, &LinkInfluence { count: 2, total_resonance: 1.0 });
        let many = model.evolution_delta(&a, &LinkInfluence { count: 1000, total_resonance: 1000.0 });
        assert!(some.level > none.level);
        let cap = model.config().max_link_boost;
        assert!((many.level - (none.level + cap)).abs() < 1e-12);
    }

    #[test]
    fn influence_mean_handles_empty() {
        assert_eq!(LinkInfluence::default().mean(), 0.0);
        let inf = LinkInfluence { count: 4, total_resonance: 2.0 };
        assert_eq!(inf.mean(), 0.5);
    }
}
