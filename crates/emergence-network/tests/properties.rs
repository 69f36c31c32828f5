//! Property tests: invariants that must hold across arbitrary operation sequences

use chrono::{TimeZone, Utc};
use emergence_network::*;
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Clone, Debug)]
enum Op {
    Create { level: f64, strength: f64, api: bool },
    Link { a: usize, b: usize },
    Merge { a: usize, b: usize },
    Evolve { a: usize },
    Manifest { a: usize },
    Stream { threshold: Option<f64> },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (-0.5f64..1.5, -0.5f64..1.5, any::<bool>())
            .prop_map(|(level, strength, api)| Op::Create { level, strength, api }),
        3 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::Link { a, b }),
        1 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::Merge { a, b }),
        3 => any::<usize>().prop_map(|a| Op::Evolve { a }),
        1 => any::<usize>().prop_map(|a| Op::Manifest { a }),
        1 => prop::option::of(0.0f64..1.0).prop_map(|threshold| Op::Stream { threshold }),
    ]
}

fn network() -> EmergenceNetwork {
    let mut config = NetworkConfig::default();
    config.stream.seed = Some(99);
    config.stream.retry_cap = 8;
    EmergenceNetwork::builder()
        .config(config)
        .clock(Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap())))
        .build()
}

fn pick(net: &EmergenceNetwork, i: usize) -> Option<AppId> {
    let apps = net.get_all_apps();
    if apps.is_empty() {
        None
    } else {
        Some(apps[i % apps.len()].id)
    }
}

fn apply(net: &mut EmergenceNetwork, op: &Op) {
    match *op {
        Op::Create { level, strength, api } => {
            let kind = if api { "api_app" } else { "default" };
            net.create_app_with(kind, AttributeOverrides::new().level(level).strength(strength));
        }
        Op::Link { a, b } => {
            if let (Some(a), Some(b)) = (pick(net, a), pick(net, b)) {
                let _ = net.link_apps(a, b, "t");
            }
        }
        Op::Merge { a, b } => {
            if let (Some(a), Some(b)) = (pick(net, a), pick(net, b)) {
                net.merge_apps(a, b);
            }
        }
        Op::Evolve { a } => {
            if let Some(a) = pick(net, a) {
                net.evolve_app(a).unwrap();
            }
        }
        Op::Manifest { a } => {
            if let Some(a) = pick(net, a) {
                net.manifest_from_void(a).unwrap();
            }
        }
        Op::Stream { threshold } => {
            net.start_stream(threshold);
            let _ = net.next_from_stream();
            net.stop_stream();
        }
    }
}

fn in_unit(x: f64) -> bool {
    (0.0..=1.0).contains(&x)
}

proptest! {
    #[test]
    fn invariants_hold_across_operation_sequences(ops in prop::collection::vec(arb_op(), 1..60)) {
        let mut net = network();
        let mut ever_seen: HashSet<AppId> = HashSet::new();
        let mut prev_history: HashMap<AppId, Vec<EvolutionStep>> = HashMap::new();
        let mut prev_manifested: HashSet<AppId> = HashSet::new();

        for op in &ops {
            apply(&mut net, op);

            let apps = net.get_all_apps();
            let mut live = HashSet::new();
            for app in &apps {
                // Uniqueness among live apps.
                prop_assert!(live.insert(app.id));
                // Bounds.
                prop_assert!(in_unit(app.level()));
                prop_assert!(in_unit(app.strength()));
                // manifested_at iff manifested.
                prop_assert_eq!(app.manifested, app.manifested_at.is_some());
                // Stage is a projection of level.
                prop_assert_eq!(app.stage(), Stage::from_level(app.level()));
                // History is append-only.
                if let Some(prev) = prev_history.get(&app.id) {
                    prop_assert!(app.evolution_history.len() >= prev.len());
                    prop_assert_eq!(&app.evolution_history[..prev.len()], prev.as_slice());
                }
                // Manifestation never reverts.
                if prev_manifested.contains(&app.id) {
                    prop_assert!(app.manifested);
                }
            }

            // Ids are never reused: a new id has never been seen before.
            for app in &apps {
                if !prev_history.contains_key(&app.id) {
                    prop_assert!(ever_seen.insert(app.id), "id {} reused", app.id);
                }
            }

            for link in net.links() {
                prop_assert!(in_unit(link.resonance));
                prop_assert!(live.contains(&link.source));
                prop_assert!(live.contains(&link.target));
            }

            prev_history = apps.iter().map(|a| (a.id, a.evolution_history.clone())).collect();
            prev_manifested = apps.iter().filter(|a| a.manifested).map(|a| a.id).collect();
        }

        prop_assert_eq!(net.analyze_network(), net.analyze_network());
    }

    #[test]
    fn merged_level_lies_between_inputs(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
        let mut net = network();
        let x = net.create_app_with("x", AttributeOverrides::new().level(a)).id;
        let y = net.create_app_with("y", AttributeOverrides::new().level(b)).id;
        let merged = net.merge_apps(x, y).unwrap().level();
        prop_assert!(merged >= a.min(b));
        prop_assert!(merged <= a.max(b));
    }

    #[test]
    fn streamed_apps_meet_threshold(threshold in 0.0f64..0.95, pulls in 1usize..20) {
        let mut net = network();
        net.start_stream(Some(threshold));
        for _ in 0..pulls {
            if let StreamPull::Yielded(app) = net.next_from_stream() {
                prop_assert!(app.level() >= threshold);
            }
        }
    }
}
