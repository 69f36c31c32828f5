//! Tests for emergence-core: ids, stages, entity serialization, errors

use chrono::{TimeZone, Utc};
use emergence_core::*;

// ===========================================================================
// Ids
// ===========================================================================

#[test]
fn ids_display_with_prefix() {
    assert_eq!(AppId::new(7).to_string(), "app-7");
    assert_eq!(LinkId::new(3).to_string(), "link-3");
}

#[test]
fn ids_serialize_transparently() {
    assert_eq!(serde_json::to_string(&AppId::new(12)).unwrap(), "12");
    let back: LinkId = serde_json::from_str("5").unwrap();
    assert_eq!(back, LinkId::new(5));
}

#[test]
fn ids_order_by_allocation() {
    assert!(AppId::new(1) < AppId::new(2));
}

// ===========================================================================
// Stage
// ===========================================================================

#[test]
fn stage_thresholds_are_increasing() {
    let thresholds: Vec<f64> = Stage::ALL.iter().map(|s| s.threshold()).collect();
    assert!(thresholds.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(thresholds[0], 0.0);
}

#[test]
fn stage_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&Stage::Resonant).unwrap(), r#""resonant""#);
    assert_eq!(Stage::Stable.to_string(), "stable");
}

// ===========================================================================
// App
// ===========================================================================

fn sample_app() -> App {
    let attrs = Attributes { level: 0.4, strength: 0.7, flow_enabled: true, source_connected: false };
    App::new(AppId::new(1), "api_app", attrs, Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap())
}

#[test]
fn app_json_flattens_attributes_and_skips_unset() {
    let json = serde_json::to_value(sample_app()).unwrap();
    assert_eq!(json["level"], 0.4);
    assert_eq!(json["flow_enabled"], true);
    assert_eq!(json["kind"], "api_app");
    assert!(json.get("manifested_at").is_none());
    assert!(json.get("parents").is_none());
}

#[test]
fn app_json_roundtrip() {
    let mut app = sample_app();
    app.manifest(app.created_at);
    app.evolution_history.push(EvolutionStep::evolve(0.1, 0.05, app.created_at));
    app.evolution_history.push(EvolutionStep::merge([AppId::new(2), AppId::new(3)], app.created_at));
    let json = serde_json::to_string(&app).unwrap();
    let back: App = serde_json::from_str(&json).unwrap();
    assert_eq!(back, app);
}

#[test]
fn app_new_clamps_attributes() {
    let attrs = Attributes { level: 1.5, strength: -0.5, flow_enabled: false, source_connected: false };
    let app = App::new(AppId::new(1), "x", attrs, Utc::now());
    assert_eq!(app.level(), 1.0);
    assert_eq!(app.strength(), 0.0);
}

#[test]
fn clamp_unit_handles_nan_and_infinities() {
    assert_eq!(clamp_unit(f64::NAN), 0.0);
    assert_eq!(clamp_unit(f64::INFINITY), 1.0);
    assert_eq!(clamp_unit(f64::NEG_INFINITY), 0.0);
    assert_eq!(clamp_unit(0.3), 0.3);
}

// ===========================================================================
// Error
// ===========================================================================

#[test]
fn invalid_operation_classification() {
    assert!(Error::SelfLink(AppId::new(1)).is_invalid_operation());
    assert!(Error::UnknownApp(AppId::new(1)).is_invalid_operation());
    assert!(Error::RetiredApp(AppId::new(1)).is_invalid_operation());
    assert!(!Error::config("bad").is_invalid_operation());
}

#[test]
fn error_display_and_app() {
    let err = Error::RetiredApp(AppId::new(4));
    assert_eq!(err.to_string(), "app was merged away: app-4");
    assert_eq!(err.app(), Some(AppId::new(4)));
    assert_eq!(Error::config("x").app(), None);
}
