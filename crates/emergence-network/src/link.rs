//! Link manager: forges weighted, typed edges between apps

use crate::scoring::ScoringModel;
use chrono::{DateTime, Utc};
use emergence_core::{clamp_unit, App, AppId, Error, Link, LinkId, Result};
use std::sync::Arc;

/// Type given to links created with an empty type label.
pub const DEFAULT_LINK_TYPE: &str = "resonance";

pub struct LinkManager {
    scoring: Arc<dyn ScoringModel>,
}

impl LinkManager {
    pub fn new(scoring: Arc<dyn ScoringModel>) -> Self {
        Self { scoring }
    }

    /// Structural checks that don't need the registry.
    pub fn validate(&self, source: AppId, target: AppId) -> Result<()> {
        if source == target {
            return Err(Error::SelfLink(source));
        }
        Ok(())
    }

    /// Build a link from `source` to `target`. Resonance is scored from the
    /// two apps' current attributes and clamped.
    pub fn forge(&self, id: LinkId, source: &App, target: &App, link_type: &str, now: DateTime<Utc>) -> Link {
        let link_type = if link_type.trim().is_empty() { DEFAULT_LINK_TYPE } else { link_type };
        Link {
            id,
            source: source.id,
            target: target.id,
            link_type: link_type.to_string(),
            resonance: clamp_unit(self.scoring.pair_resonance(&source.attributes, &target.attributes)),
            created_at: now,
        }
    }
}

/// Split `links` into those untouched by `retired` and those that reference
/// a retired app. Order is preserved on both sides.
pub(crate) fn partition_retired(links: Vec<Link>, retired: [AppId; 2]) -> (Vec<Link>, Vec<Link>) {
    links
        .into_iter()
        .partition(|l| !retired.iter().any(|id| l.touches(*id)))
}
