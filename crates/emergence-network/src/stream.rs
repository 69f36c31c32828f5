//! Stream generator: pull-based sequence of freshly created apps
//!
//! An explicit state machine, not a coroutine:
//!
//! ```text
//!   Idle --start(threshold)--> Armed --stop()--> Idle
//! ```
//!
//! The generator only holds arming state, the threshold, and the RNG used to
//! sample attributes. The registry drives it: each pull samples overrides,
//! creates the app through the normal creation path, and asks the generator
//! whether the result qualifies.

use crate::config::StreamConfig;
use emergence_core::{clamp_unit, App, AttributeOverrides};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    Idle,
    Armed,
}

/// Result of one pull.
#[derive(Debug)]
pub enum StreamPull<'a> {
    /// A new app that meets the threshold.
    Yielded(&'a App),
    /// Every attempt within the retry cap fell below the threshold.
    Exhausted { attempts: u32 },
    /// The stream is not armed.
    Idle,
}

impl<'a> StreamPull<'a> {
    pub fn app(self) -> Option<&'a App> {
        match self {
            Self::Yielded(app) => Some(app),
            _ => None,
        }
    }
}

pub struct StreamGenerator {
    state: StreamState,
    filter_threshold: Option<f64>,
    retry_cap: u32,
    kind: String,
    rng: ChaCha8Rng,
}

impl StreamGenerator {
    pub fn new(config: &StreamConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            state: StreamState::Idle,
            filter_threshold: None,
            retry_cap: config.retry_cap,
            kind: config.kind.clone(),
            rng,
        }
    }

    /// Arm the stream. Re-arming replaces the threshold.
    pub fn start(&mut self, filter_threshold: Option<f64>) {
        self.filter_threshold = filter_threshold.map(clamp_unit);
        self.state = StreamState::Armed;
    }

    pub fn stop(&mut self) {
        self.state = StreamState::Idle;
        self.filter_threshold = None;
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state == StreamState::Armed
    }

    pub fn filter_threshold(&self) -> Option<f64> {
        self.filter_threshold
    }

    /// Total attempts allowed per pull: the first one plus the retries.
    pub fn max_attempts(&self) -> u32 {
        self.retry_cap.saturating_add(1)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Sample scalar attributes for the next streamed app. Flags come from
    /// the kind's defaults.
    pub fn sample(&mut self) -> AttributeOverrides {
        AttributeOverrides::new()
            .level(self.rng.gen_range(0.0..=1.0))
            .strength(self.rng.gen_range(0.0..=1.0))
    }

    pub fn accepts(&self, level: f64) -> bool {
        self.filter_threshold.map_or(true, |t| level >= t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(seed: u64) -> StreamConfig {
        StreamConfig { kind: "emergent".into(), retry_cap: 4, seed: Some(seed) }
    }

    #[test]
    fn starts_idle_and_arms() {
        let mut stream = StreamGenerator::new(&config(1));
        assert_eq!(stream.state(), StreamState::Idle);
        stream.start(Some(0.5));
        assert!(stream.is_armed());
        assert_eq!(stream.filter_threshold(), Some(0.5));
        stream.stop();
        assert_eq!(stream.state(), StreamState::Idle);
        assert_eq!(stream.filter_threshold(), None);
        stream.stop();
        assert_eq!(stream.state(), StreamState::Idle);
    }

    #[test]
    fn threshold_is_clamped() {
        let mut stream = StreamGenerator::new(&config(1));
        stream.start(Some(7.0));
        assert_eq!(stream.filter_threshold(), Some(1.0));
        assert!(stream.accepts(1.0));
        assert!(!stream.accepts(0.99));
    }

    #[test]
    fn same_seed_same_samples() {
        let mut a = StreamGenerator::new(&config(42));
        let mut b = StreamGenerator::new(&config(42));
        for _ in 0..10 {
            assert_eq!(a.sample(), b.sample());
        }
    }

    #[test]
    fn samples_stay_in_unit_range() {
        let mut s = StreamGenerator::new(&config(9));
        for _ in 0..200 {
            let o = s.sample();
            assert!((0.0..=1.0).contains(&o.level.unwrap()));
            assert!((0.0..=1.0).contains(&o.strength.unwrap()));
        }
    }

    #[test]
    fn max_attempts_saturates() {
        let s = StreamGenerator::new(&StreamConfig { retry_cap: u32::MAX, ..config(1) });
        assert_eq!(s.max_attempts(), u32::MAX);
    }
}
