//! Evolution engine: advances one app by one step
//!
//! Stage is never stored: it is read off `level` every time (see
//! [`emergence_core::Stage::from_level`]), so it cannot drift from the level.

use crate::scoring::{LinkInfluence, ScoringModel};
use chrono::{DateTime, Utc};
use emergence_core::{clamp_unit, App, EvolutionStep, Stage};
use std::sync::Arc;

/// What a single `advance` did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EvolutionOutcome {
    pub level_before: f64,
    pub level_after: f64,
    pub stage_before: Stage,
    pub stage_after: Stage,
    /// The app was already at the level ceiling; nothing changed.
    pub saturated: bool,
}

pub struct EvolutionEngine {
    scoring: Arc<dyn ScoringModel>,
}

impl EvolutionEngine {
    pub fn new(scoring: Arc<dyn ScoringModel>) -> Self {
        Self { scoring }
    }

    /// Apply one step to `app` in place and append a history record.
    pub fn advance(&self, app: &mut App, now: DateTime<Utc>) -> EvolutionOutcome {
        let level_before = app.level();
        let stage_before = app.stage();

        if level_before >= 1.0 {
            app.evolution_history.push(EvolutionStep::saturated(now));
            return EvolutionOutcome {
                level_before,
                level_after: level_before,
                stage_before,
                stage_after: stage_before,
                saturated: true,
            };
        }

        let influence = LinkInfluence::from_links(&app.links);
        let delta = self.scoring.evolution_delta(&app.attributes, &influence);

        let strength_before = app.strength();
        app.attributes.level = clamp_unit(level_before + finite(delta.level));
        app.attributes.strength = clamp_unit(strength_before + finite(delta.strength));

        app.evolution_history.push(EvolutionStep::evolve(
            app.level() - level_before,
            app.strength() - strength_before,
            now,
        ));

        EvolutionOutcome {
            level_before,
            level_after: app.level(),
            stage_before,
            stage_after: app.stage(),
            saturated: false,
        }
    }
}

fn finite(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}
