//! Event bus: network-wide and per-app listener registries
//!
//! Dispatch is a plain synchronous loop in registration order. Every listener
//! call is isolated with `catch_unwind`: a panicking listener is logged and
//! skipped, later listeners still run. The registry only emits after a
//! mutation has been committed, so a listener can never observe (or cause)
//! half-applied state.

use chrono::{DateTime, Utc};
use emergence_core::{AppId, LinkId, Stage};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Created,
    Manifested,
    Linked,
    Merged,
    Evolved,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Manifested => "manifested",
            Self::Linked => "linked",
            Self::Merged => "merged",
            Self::Evolved => "evolved",
        };
        f.write_str(name)
    }
}

/// Lifecycle events raised by the registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum NetworkEvent {
    Created {
        app: AppId,
        kind: String,
    },
    Manifested {
        app: AppId,
        at: DateTime<Utc>,
    },
    Linked {
        link: LinkId,
        source: AppId,
        target: AppId,
        link_type: String,
        resonance: f64,
    },
    Merged {
        sources: [AppId; 2],
        merged: AppId,
        /// Links touching either source, moved to the retired archive.
        pruned_links: usize,
    },
    Evolved {
        app: AppId,
        level_before: f64,
        level_after: f64,
        stage_before: Stage,
        stage_after: Stage,
    },
}

impl NetworkEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Created { .. } => EventKind::Created,
            Self::Manifested { .. } => EventKind::Manifested,
            Self::Linked { .. } => EventKind::Linked,
            Self::Merged { .. } => EventKind::Merged,
            Self::Evolved { .. } => EventKind::Evolved,
        }
    }

    /// Apps whose per-app listeners hear this event.
    pub fn involved_apps(&self) -> Vec<AppId> {
        match self {
            Self::Created { app, .. } | Self::Manifested { app, .. } | Self::Evolved { app, .. } => vec![*app],
            Self::Linked { source, target, .. } => vec![*source, *target],
            Self::Merged { sources, .. } => sources.to_vec(),
        }
    }
}

/// An entry in the bounded event log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: NetworkEvent,
}

/// Handle returned by subscription, used to unsubscribe.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct ListenerId(u64);

pub type Listener = Arc<dyn Fn(&NetworkEvent) + Send + Sync>;

struct Subscription {
    id: ListenerId,
    /// `None` subscribes to every kind.
    kind: Option<EventKind>,
    listener: Listener,
}

impl Subscription {
    fn wants(&self, kind: EventKind) -> bool {
        self.kind.map_or(true, |k| k == kind)
    }
}

pub struct EventBus {
    network: Vec<Subscription>,
    per_app: HashMap<AppId, Vec<Subscription>>,
    log: VecDeque<EventRecord>,
    log_capacity: usize,
    next_listener: u64,
    next_seq: u64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            network: Vec::new(),
            per_app: HashMap::new(),
            log: VecDeque::with_capacity(log_capacity.min(4096)),
            log_capacity,
            next_listener: 0,
            next_seq: 0,
        }
    }

    fn allocate(&mut self) -> ListenerId {
        self.next_listener += 1;
        ListenerId(self.next_listener)
    }

    /// Subscribe at network scope. `kind = None` receives every event.
    pub fn subscribe(&mut self, kind: Option<EventKind>, listener: Listener) -> ListenerId {
        let id = self.allocate();
        self.network.push(Subscription { id, kind, listener });
        id
    }

    /// Subscribe to events involving one app.
    pub fn subscribe_app(&mut self, app: AppId, kind: Option<EventKind>, listener: Listener) -> ListenerId {
        let id = self.allocate();
        self.per_app
            .entry(app)
            .or_default()
            .push(Subscription { id, kind, listener });
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.network.len();
        self.network.retain(|s| s.id != id);
        if self.network.len() != before {
            return true;
        }
        for subs in self.per_app.values_mut() {
            let before = subs.len();
            subs.retain(|s| s.id != id);
            if subs.len() != before {
                return true;
            }
        }
        false
    }

    /// Drop every per-app listener for `app`. Returns how many were removed.
    pub fn drop_app(&mut self, app: AppId) -> usize {
        self.per_app.remove(&app).map_or(0, |subs| subs.len())
    }

    pub fn listener_count(&self) -> usize {
        self.network.len() + self.per_app.values().map(Vec::len).sum::<usize>()
    }

    pub fn log(&self) -> impl Iterator<Item = &EventRecord> {
        self.log.iter()
    }

    /// Record and dispatch. Returns the number of listeners that panicked.
    pub fn emit(&mut self, event: NetworkEvent, at: DateTime<Utc>) -> usize {
        self.next_seq += 1;
        if self.log_capacity > 0 {
            if self.log.len() == self.log_capacity {
                self.log.pop_front();
            }
            self.log.push_back(EventRecord { seq: self.next_seq, at, event: event.clone() });
        }

        let kind = event.kind();
        let mut failures = 0;
        for sub in self.network.iter().filter(|s| s.wants(kind)) {
            failures += usize::from(!invoke(sub, &event));
        }
        for app in event.involved_apps() {
            let Some(subs) = self.per_app.get(&app) else { continue };
            for sub in subs.iter().filter(|s| s.wants(kind)) {
                failures += usize::from(!invoke(sub, &event));
            }
        }
        failures
    }
}

fn invoke(sub: &Subscription, event: &NetworkEvent) -> bool {
    let listener = &sub.listener;
    match panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
        Ok(()) => true,
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic".into());
            error!("listener {:?} panicked on {} event: {}", sub.id, event.kind(), reason);
            false
        }
    }
}
