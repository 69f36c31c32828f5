//! Network registry: the single owner of apps, links, and lifecycle events
//!
//! Every mutating operation validates first, then commits, then emits. A
//! rejected operation leaves no trace; a listener always sees committed state.

use crate::analysis::{NetworkAnalysis, ResonanceEngine};
use crate::config::NetworkConfig;
use crate::events::{EventBus, EventKind, EventRecord, ListenerId, NetworkEvent};
use crate::evolution::EvolutionEngine;
use crate::link::{partition_retired, LinkManager};
use crate::merge::MergeEngine;
use crate::scoring::{ScoringModel, WeightedScoring};
use crate::stream::{StreamGenerator, StreamPull, StreamState};
use emergence_core::{
    App, AppId, AttributeOverrides, Clock, Error, Link, LinkId, Result, SystemClock, DEFAULT_KIND,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Assembles an [`EmergenceNetwork`] from its environment.
#[derive(Default)]
pub struct NetworkBuilder {
    config: NetworkConfig,
    clock: Option<Arc<dyn Clock>>,
    scoring: Option<Arc<dyn ScoringModel>>,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: NetworkConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replace the configured scoring model (e.g. with a deterministic stub).
    pub fn scoring(mut self, scoring: Arc<dyn ScoringModel>) -> Self {
        self.scoring = Some(scoring);
        self
    }

    pub fn build(self) -> EmergenceNetwork {
        let scoring = self
            .scoring
            .unwrap_or_else(|| Arc::new(WeightedScoring::new(self.config.scoring.clone())));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
        EmergenceNetwork {
            link_manager: LinkManager::new(scoring.clone()),
            merge_engine: MergeEngine::new(),
            evolution: EvolutionEngine::new(scoring.clone()),
            resonance: ResonanceEngine::new(scoring),
            bus: EventBus::new(self.config.events.log_capacity),
            stream: StreamGenerator::new(&self.config.stream),
            config: self.config,
            clock,
            apps: BTreeMap::new(),
            links: Vec::new(),
            retired_links: Vec::new(),
            retired: HashSet::new(),
            ever_linked: HashSet::new(),
            next_app: 0,
            next_link: 0,
        }
    }
}

pub struct EmergenceNetwork {
    config: NetworkConfig,
    clock: Arc<dyn Clock>,
    link_manager: LinkManager,
    merge_engine: MergeEngine,
    evolution: EvolutionEngine,
    resonance: ResonanceEngine,
    bus: EventBus,
    stream: StreamGenerator,
    /// Keyed by id. Ids are monotonic, so key order is insertion order.
    apps: BTreeMap<AppId, App>,
    /// Live links, in creation order.
    links: Vec<Link>,
    /// Links pruned because an endpoint was merged away.
    retired_links: Vec<Link>,
    retired: HashSet<AppId>,
    /// Every id that has been a link endpoint. Not pruned by merges.
    ever_linked: HashSet<AppId>,
    next_app: u64,
    next_link: u64,
}

impl Default for EmergenceNetwork {
    fn default() -> Self {
        NetworkBuilder::new().build()
    }
}

impl EmergenceNetwork {
    pub fn new(config: NetworkConfig) -> Self {
        NetworkBuilder::new().config(config).build()
    }

    pub fn builder() -> NetworkBuilder {
        NetworkBuilder::new()
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Apps
    // ------------------------------------------------------------------

    /// Create an app with the kind's default attributes.
    pub fn create_app(&mut self, kind: &str) -> &App {
        self.create_app_with(kind, AttributeOverrides::default())
    }

    /// Create an app, overriding any subset of the kind's defaults.
    pub fn create_app_with(&mut self, kind: &str, overrides: AttributeOverrides) -> &App {
        let kind = if kind.trim().is_empty() { DEFAULT_KIND } else { kind };
        let attributes = overrides.apply(self.config.attributes_for(kind));
        let id = self.allocate_app_id();
        let app = App::new(id, kind, attributes, self.clock.now());
        debug!("created {} kind={} level={:.3} stage={}", id, kind, app.level(), app.stage());
        self.apps.insert(id, app);

        self.emit(NetworkEvent::Created { app: id, kind: kind.to_string() });
        &self.apps[&id]
    }

    pub fn get_app(&self, id: AppId) -> Option<&App> {
        self.apps.get(&id)
    }

    /// Live apps in insertion order. Merged apps appear at the end.
    pub fn get_all_apps(&self) -> Vec<&App> {
        self.apps.values().collect()
    }

    pub fn app_count(&self) -> usize {
        self.apps.len()
    }

    /// Whether `id` was consumed by a merge.
    pub fn is_retired(&self, id: AppId) -> bool {
        self.retired.contains(&id)
    }

    /// Transition an app from latent to manifested. Idempotent.
    pub fn manifest_from_void(&mut self, id: AppId) -> Result<&App> {
        let now = self.clock.now();
        let changed = match self.apps.get_mut(&id) {
            Some(app) => app.manifest(now),
            None => return Err(self.missing(id)),
        };
        if changed {
            debug!("manifested {}", id);
            self.emit(NetworkEvent::Manifested { app: id, at: now });
        }
        Ok(&self.apps[&id])
    }

    // ------------------------------------------------------------------
    // Links
    // ------------------------------------------------------------------

    /// Create a directed link. Re-linking the same pair with the same type
    /// adds another, distinct link.
    pub fn link_apps(&mut self, source: AppId, target: AppId, link_type: &str) -> Result<Link> {
        if let Err(e) = self
            .link_manager
            .validate(source, target)
            .and_then(|_| self.require(source).map(|_| ()))
            .and_then(|_| self.require(target).map(|_| ()))
        {
            warn!("rejected link {} -> {}: {}", source, target, e);
            return Err(e);
        }

        let id = self.allocate_link_id();
        let now = self.clock.now();
        let link = self
            .link_manager
            .forge(id, &self.apps[&source], &self.apps[&target], link_type, now);

        self.links.push(link.clone());
        self.ever_linked.insert(source);
        self.ever_linked.insert(target);
        if let Some(app) = self.apps.get_mut(&source) {
            app.links.push(link.clone());
        }
        debug!("linked {} -> {} type={} resonance={:.3}", source, target, link.link_type, link.resonance);

        self.emit(NetworkEvent::Linked {
            link: link.id,
            source,
            target,
            link_type: link.link_type.clone(),
            resonance: link.resonance,
        });
        Ok(link)
    }

    /// Live links in creation order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Links archived by merges, in the order they were pruned.
    pub fn retired_links(&self) -> &[Link] {
        &self.retired_links
    }

    // ------------------------------------------------------------------
    // Merge
    // ------------------------------------------------------------------

    /// Consume `a` and `b`, producing a new app under a fresh id.
    ///
    /// Returns `None` without touching anything if either id is not live or
    /// if both ids are the same. Links touching either input are moved to the
    /// retired archive; unrelated links are untouched.
    pub fn merge_apps(&mut self, a: AppId, b: AppId) -> Option<&App> {
        if a == b {
            warn!("refusing to merge {} with itself", a);
            return None;
        }
        if !self.apps.contains_key(&a) || !self.apps.contains_key(&b) {
            warn!("merge {} + {}: unknown app", a, b);
            return None;
        }

        let id = self.allocate_app_id();
        let now = self.clock.now();
        let merged = self.merge_engine.fuse(id, &self.apps[&a], &self.apps[&b], now);

        self.apps.remove(&a);
        self.apps.remove(&b);
        self.retired.insert(a);
        self.retired.insert(b);

        let (kept, pruned) = partition_retired(std::mem::take(&mut self.links), [a, b]);
        self.links = kept;
        for app in self.apps.values_mut() {
            app.links.retain(|l| !l.touches(a) && !l.touches(b));
        }
        let pruned_links = pruned.len();
        self.retired_links.extend(pruned);

        info!(
            "merged {} + {} -> {} kind={} level={:.3} ({} links retired)",
            a, b, id, merged.kind, merged.level(), pruned_links
        );
        self.apps.insert(id, merged);

        self.emit(NetworkEvent::Merged { sources: [a, b], merged: id, pruned_links });
        self.bus.drop_app(a);
        self.bus.drop_app(b);
        Some(&self.apps[&id])
    }

    // ------------------------------------------------------------------
    // Evolution and resonance
    // ------------------------------------------------------------------

    /// Apply one evolution step. At the level ceiling this only appends a
    /// zero-delta record and raises no event.
    pub fn evolve_app(&mut self, id: AppId) -> Result<&App> {
        let now = self.clock.now();
        let outcome = match self.apps.get_mut(&id) {
            Some(app) => self.evolution.advance(app, now),
            None => return Err(self.missing(id)),
        };

        if outcome.saturated {
            debug!("{} already at ceiling, recorded saturated step", id);
        } else {
            debug!(
                "evolved {} level {:.3} -> {:.3} ({} -> {})",
                id, outcome.level_before, outcome.level_after, outcome.stage_before, outcome.stage_after
            );
            self.emit(NetworkEvent::Evolved {
                app: id,
                level_before: outcome.level_before,
                level_after: outcome.level_after,
                stage_before: outcome.stage_before,
                stage_after: outcome.stage_after,
            });
        }
        Ok(&self.apps[&id])
    }

    pub fn calculate_resonance(&self, id: AppId) -> Result<f64> {
        let app = self.require(id)?;
        Ok(self.resonance.app_resonance(app))
    }

    pub fn analyze_network(&self) -> NetworkAnalysis {
        self.resonance
            .analyze(self.apps.values(), &self.links, &self.ever_linked, self.retired_links.len())
    }

    // ------------------------------------------------------------------
    // Stream
    // ------------------------------------------------------------------

    pub fn start_stream(&mut self, filter_threshold: Option<f64>) {
        self.stream.start(filter_threshold);
        info!("stream armed (threshold={:?})", self.stream.filter_threshold());
    }

    pub fn stop_stream(&mut self) {
        if self.stream.is_armed() {
            info!("stream stopped");
        }
        self.stream.stop();
    }

    pub fn stream_state(&self) -> StreamState {
        self.stream.state()
    }

    /// Pull one app from the stream. Apps below the threshold are still
    /// created (and stay in the registry) but are not yielded.
    pub fn next_from_stream(&mut self) -> StreamPull<'_> {
        if !self.stream.is_armed() {
            return StreamPull::Idle;
        }
        let kind = self.stream.kind().to_string();
        let attempts = self.stream.max_attempts();
        for _ in 0..attempts {
            let overrides = self.stream.sample();
            let created = self.create_app_with(&kind, overrides);
            let (id, level) = (created.id, created.level());
            if self.stream.accepts(level) {
                return StreamPull::Yielded(&self.apps[&id]);
            }
        }
        warn!("stream exhausted after {} attempts", attempts);
        StreamPull::Exhausted { attempts }
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Subscribe to one kind of event across the whole network.
    pub fn on<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&NetworkEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe(Some(kind), Arc::new(listener))
    }

    /// Subscribe to every event across the whole network.
    pub fn on_any<F>(&mut self, listener: F) -> ListenerId
    where
        F: Fn(&NetworkEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe(None, Arc::new(listener))
    }

    /// Subscribe to one kind of event involving a live app. Dropped when the
    /// app is merged away.
    pub fn on_app<F>(&mut self, app: AppId, kind: EventKind, listener: F) -> Result<ListenerId>
    where
        F: Fn(&NetworkEvent) + Send + Sync + 'static,
    {
        self.require(app)?;
        Ok(self.bus.subscribe_app(app, Some(kind), Arc::new(listener)))
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Recent events, oldest first, bounded by `events.log_capacity`.
    pub fn event_log(&self) -> impl Iterator<Item = &EventRecord> {
        self.bus.log()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn allocate_app_id(&mut self) -> AppId {
        self.next_app += 1;
        AppId::new(self.next_app)
    }

    fn allocate_link_id(&mut self) -> LinkId {
        self.next_link += 1;
        LinkId::new(self.next_link)
    }

    fn require(&self, id: AppId) -> Result<&App> {
        self.apps.get(&id).ok_or_else(|| self.missing(id))
    }

    fn missing(&self, id: AppId) -> Error {
        if self.retired.contains(&id) {
            Error::RetiredApp(id)
        } else {
            Error::UnknownApp(id)
        }
    }

    fn emit(&mut self, event: NetworkEvent) {
        let at = self.clock.now();
        let failures = self.bus.emit(event, at);
        if failures > 0 {
            warn!("{} listener(s) failed during dispatch", failures);
        }
    }
}
