//! Seeded end-to-end run against the network library.
//!
//! One run: stream apps, chain them with links, evolve every streamed app for
//! a number of steps, manifest the ones that reached `resonant`, then merge the
//! two weakest. The report carries the final analysis.

use chrono::{DateTime, Utc};
use emergence_network::{
    AppId, EmergenceNetwork, NetworkAnalysis, NetworkConfig, Result, Stage, StreamPull,
    DEFAULT_LINK_TYPE,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SimulationOptions {
    /// Number of stream pulls.
    pub apps: usize,
    /// Evolution steps applied to every streamed app.
    pub steps: usize,
    pub threshold: Option<f64>,
    /// Overrides `[stream].seed` from the config when set.
    pub seed: Option<u64>,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self { apps: 8, steps: 5, threshold: None, seed: None }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub seed: Option<u64>,
    /// Apps yielded by the stream, in pull order.
    pub streamed: Vec<AppId>,
    /// Pulls that ran out of attempts without yielding.
    pub exhausted_pulls: usize,
    pub manifested: Vec<AppId>,
    pub merged: Option<AppId>,
    /// Events observed during the run, by kind.
    pub event_counts: BTreeMap<String, usize>,
    pub analysis: NetworkAnalysis,
}

pub fn run(mut config: NetworkConfig, options: &SimulationOptions) -> Result<SimulationReport> {
    if options.seed.is_some() {
        config.stream.seed = options.seed;
    }
    let seed = config.stream.seed;
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    info!(%run_id, apps = options.apps, steps = options.steps, "simulation starting");

    let mut net = EmergenceNetwork::new(config);

    let counts: Arc<Mutex<BTreeMap<String, usize>>> = Arc::default();
    let sink = Arc::clone(&counts);
    net.on_any(move |event| {
        if let Ok(mut counts) = sink.lock() {
            *counts.entry(event.kind().to_string()).or_default() += 1;
        }
    });

    // Stream
    net.start_stream(options.threshold);
    let mut streamed = Vec::with_capacity(options.apps);
    let mut exhausted_pulls = 0;
    for _ in 0..options.apps {
        match net.next_from_stream() {
            StreamPull::Yielded(app) => streamed.push(app.id),
            StreamPull::Exhausted { .. } => exhausted_pulls += 1,
            StreamPull::Idle => break,
        }
    }
    net.stop_stream();

    // Chain neighbours
    for pair in streamed.windows(2) {
        net.link_apps(pair[0], pair[1], DEFAULT_LINK_TYPE)?;
    }

    for step in 0..options.steps {
        for &id in &streamed {
            net.evolve_app(id)?;
        }
        debug!(step, "evolution step done");
    }

    let mut manifested = Vec::new();
    for &id in &streamed {
        if net.get_app(id).is_some_and(|app| app.stage() >= Stage::Resonant) {
            net.manifest_from_void(id)?;
            manifested.push(id);
        }
    }

    let merged = match weakest_pair(&net, &streamed)? {
        Some((a, b)) => net.merge_apps(a, b).map(|app| app.id),
        None => None,
    };

    let analysis = net.analyze_network();
    let event_counts = counts.lock().map(|c| c.clone()).unwrap_or_default();
    info!(
        %run_id,
        total_apps = analysis.total_apps,
        total_links = analysis.total_links,
        "simulation finished"
    );

    Ok(SimulationReport {
        run_id,
        started_at,
        seed,
        streamed,
        exhausted_pulls,
        manifested,
        merged,
        event_counts,
        analysis,
    })
}

/// The two lowest-resonance apps among `ids`, ties broken by id.
fn weakest_pair(net: &EmergenceNetwork, ids: &[AppId]) -> Result<Option<(AppId, AppId)>> {
    let mut scored = Vec::with_capacity(ids.len());
    for &id in ids {
        scored.push((net.calculate_resonance(id)?, id));
    }
    scored.sort_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)));
    Ok(match scored.as_slice() {
        [(_, a), (_, b), ..] => Some((*a, *b)),
        _ => None,
    })
}
