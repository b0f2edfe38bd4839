//! Listener registry: which nodes are tracked for which interaction kind.
//!
//! Only bindings created here are ever removed here; handlers the host or
//! other code attached are not visible to the registry.

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::composer::{Baseline, MoreProperties};
use crate::dom::Node;
use crate::events::{EventType, TrackKind};

/// One tracked (node, kind) pair.
#[derive(Debug, Clone)]
pub struct ListenerBinding<N> {
    pub node: N,
    pub kind: TrackKind,
    pub more: MoreProperties<N>,
    /// Value(s) at the moment tracking was enabled.
    pub baseline: Baseline,
}

pub struct ListenerRegistry<N> {
    bindings: Mutex<Vec<ListenerBinding<N>>>,
}

impl<N: Node> Default for ListenerRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Node> ListenerRegistry<N> {
    pub fn new() -> Self {
        Self {
            bindings: Mutex::new(Vec::new()),
        }
    }

    /// Bind `kind` on every node, capturing baselines now. A node already
    /// bound for `kind` gets a fresh binding in place of the old one.
    /// Returns the number of bindings created.
    pub fn attach(&self, kind: TrackKind, nodes: &[N], more: &MoreProperties<N>) -> usize {
        let mut bindings = self.bindings.lock();
        for node in nodes {
            let binding = ListenerBinding {
                node: node.clone(),
                kind,
                more: more.clone(),
                baseline: Baseline::capture(kind, node),
            };
            match bindings
                .iter_mut()
                .find(|b| b.kind == kind && &b.node == node)
            {
                Some(existing) => {
                    debug!(kind = ?kind, "replacing existing binding");
                    *existing = binding;
                }
                None => bindings.push(binding),
            }
        }
        info!(kind = ?kind, nodes = nodes.len(), total = bindings.len(), "tracking enabled");
        nodes.len()
    }

    /// Remove the bindings of `kind` on `nodes`. Unbound nodes are ignored.
    /// Returns the number of bindings removed.
    pub fn detach(&self, kind: TrackKind, nodes: &[N]) -> usize {
        let mut bindings = self.bindings.lock();
        let before = bindings.len();
        bindings.retain(|b| !(b.kind == kind && nodes.contains(&b.node)));
        let removed = before - bindings.len();
        info!(kind = ?kind, removed, "tracking disabled");
        removed
    }

    /// Bindings on `node` that react to `event_type`, in attach order.
    pub fn bindings_for(&self, node: &N, event_type: EventType) -> Vec<ListenerBinding<N>> {
        self.bindings
            .lock()
            .iter()
            .filter(|b| &b.node == node && b.kind.event_type() == event_type)
            .cloned()
            .collect()
    }

    pub fn count(&self, kind: TrackKind) -> usize {
        self.bindings.lock().iter().filter(|b| b.kind == kind).count()
    }

    pub fn is_bound(&self, node: &N, kind: TrackKind) -> bool {
        self.bindings
            .lock()
            .iter()
            .any(|b| b.kind == kind && &b.node == node)
    }
}
