//! Resonance and whole-network analysis
//!
//! Everything here is read-only and recomputed on demand. Iteration and
//! summation order are fixed (app id order, link creation order), so two
//! calls over the same state produce bit-identical results.

use crate::scoring::{LinkInfluence, ScoringModel};
use emergence_core::{clamp_unit, App, AppId, Link, Stage};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Aggregate snapshot of the network. Derived, never persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkAnalysis {
    pub total_apps: usize,
    pub total_links: usize,
    /// Mean resonance over live links; 0 when there are none.
    pub mean_resonance: f64,
    /// Mean of per-app resonance; 0 when there are no apps.
    pub mean_app_resonance: f64,
    pub manifested_apps: usize,
    /// Every stage, including empty ones.
    pub stage_histogram: BTreeMap<Stage, usize>,
    /// Apps that were never an endpoint of any link, in insertion order.
    /// Links later retired by a merge still count.
    pub unlinked_apps: Vec<AppId>,
    /// Links archived because an endpoint was merged away.
    pub retired_links: usize,
}

pub struct ResonanceEngine {
    scoring: Arc<dyn ScoringModel>,
}

impl ResonanceEngine {
    pub fn new(scoring: Arc<dyn ScoringModel>) -> Self {
        Self { scoring }
    }

    /// Current resonance of one app. Not cached.
    pub fn app_resonance(&self, app: &App) -> f64 {
        let influence = LinkInfluence::from_links(&app.links);
        clamp_unit(self.scoring.app_resonance(&app.attributes, &influence))
    }

    /// O(apps + links) aggregation. `apps` must be in insertion order.
    /// `ever_linked` holds every id that has been a link endpoint.
    pub fn analyze<'a>(
        &self,
        apps: impl IntoIterator<Item = &'a App>,
        links: &[Link],
        ever_linked: &HashSet<AppId>,
        retired_links: usize,
    ) -> NetworkAnalysis {
        let resonance_sum: f64 = links.iter().map(|l| l.resonance).sum();

        let mut stage_histogram: BTreeMap<Stage, usize> = Stage::ALL.iter().map(|s| (*s, 0)).collect();
        let mut unlinked_apps = Vec::new();
        let mut total_apps = 0;
        let mut manifested_apps = 0;
        let mut app_resonance_sum = 0.0;

        for app in apps {
            total_apps += 1;
            *stage_histogram.entry(app.stage()).or_insert(0) += 1;
            if app.manifested {
                manifested_apps += 1;
            }
            if !ever_linked.contains(&app.id) {
                unlinked_apps.push(app.id);
            }
            app_resonance_sum += self.app_resonance(app);
        }

        NetworkAnalysis {
            total_apps,
            total_links: links.len(),
            mean_resonance: mean(resonance_sum, links.len()),
            mean_app_resonance: mean(app_resonance_sum, total_apps),
            manifested_apps,
            stage_histogram,
            unlinked_apps,
            retired_links,
        }
    }
}

fn mean(sum: f64, n: usize) -> f64 {
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::WeightedScoring;
    use chrono::Utc;
    use emergence_core::{Attributes, LinkId};

    fn app(n: u64, level: f64) -> App {
        let attrs = Attributes { level, strength: 0.5, flow_enabled: false, source_connected: false };
        App::new(AppId::new(n), "x", attrs, Utc::now())
    }

    #[test]
    fn empty_network() {
        let engine = ResonanceEngine::new(Arc::new(WeightedScoring::default()));
        let a = engine.analyze(std::iter::empty(), &[], &HashSet::new(), 0);
        assert_eq!(a.total_apps, 0);
        assert_eq!(a.mean_resonance, 0.0);
        assert_eq!(a.stage_histogram.len(), Stage::ALL.len());
        assert!(a.stage_histogram.values().all(|n| *n == 0));
    }

    #[test]
    fn histogram_and_unlinked() {
        let engine = ResonanceEngine::new(Arc::new(WeightedScoring::default()));
        let apps = vec![app(1, 0.1), app(2, 0.6), app(3, 0.9)];
        let links = vec![Link {
            id: LinkId::new(1),
            source: AppId::new(1),
            target: AppId::new(2),
            link_type: "t".into(),
            resonance: 0.4,
            created_at: Utc::now(),
        }];
        let ever_linked: HashSet<AppId> = [AppId::new(1), AppId::new(2)].into_iter().collect();
        let a = engine.analyze(&apps, &links, &ever_linked, 2);
        assert_eq!(a.total_apps, 3);
        assert_eq!(a.total_links, 1);
        assert_eq!(a.mean_resonance, 0.4);
        assert_eq!(a.stage_histogram[&Stage::Latent], 1);
        assert_eq!(a.stage_histogram[&Stage::Active], 0);
        assert_eq!(a.stage_histogram[&Stage::Resonant], 1);
        assert_eq!(a.stage_histogram[&Stage::Stable], 1);
        assert_eq!(a.unlinked_apps, vec![AppId::new(3)]);
        assert_eq!(a.retired_links, 2);
    }

    #[test]
    fn unlinked_ignores_current_link_set() {
        let engine = ResonanceEngine::new(Arc::new(WeightedScoring::default()));
        let apps = vec![app(1, 0.1), app(2, 0.1)];
        // App 1 was linked once; the link has since been retired.
        let ever_linked: HashSet<AppId> = [AppId::new(1)].into_iter().collect();
        let a = engine.analyze(&apps, &[], &ever_linked, 1);
        assert_eq!(a.total_links, 0);
        assert_eq!(a.unlinked_apps, vec![AppId::new(2)]);
    }
}
