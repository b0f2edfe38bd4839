//! Click navigation gate.
//!
//! A tracking beacon is asynchronous, so a click that unloads the page can
//! tear the document down before the record leaves. Clicks that would unload
//! are held: the host is told to suppress the default action, the record is
//! sent, and navigation is replayed from the transport's completion.
//!
//! There is no timeout. A transport that never completes means the deferred
//! navigation never happens.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};
use url::Url;
use webtrack_core::{PropertyRecord, Transport};

use crate::dom::Node;
use crate::events::InteractionEvent;

/// The host's location.
pub trait Navigator: Send + Sync {
    fn current_href(&self) -> String;

    fn referrer(&self) -> String {
        String::new()
    }

    fn assign(&self, href: &str);
}

/// What the gate decided for one click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationPlan {
    /// Let the browser's default action run now.
    Proceed,
    /// Suppress the default action and navigate to `destination` once the
    /// record has been sent.
    Deferred {
        destination: String,
        reason: DeferReason,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferReason {
    FollowLink,
    /// Submit controls reload the current location; the form's own
    /// submission (method, query parameters) is not replayed.
    Reload,
}

impl NavigationPlan {
    pub fn prevents_default(&self) -> bool {
        matches!(self, NavigationPlan::Deferred { .. })
    }
}

/// Would this click unload the page?
pub fn will_unload<N: Node>(node: &N, event: &InteractionEvent) -> bool {
    let follows_link = node.href().is_some()
        && node.target().as_deref() != Some("_blank")
        && !event.modifiers.any();
    follows_link || is_submit(node)
}

fn is_submit<N: Node>(node: &N) -> bool {
    node.control_type().as_deref() == Some("submit")
}

pub struct NavigationGate {
    navigator: Arc<dyn Navigator>,
}

impl NavigationGate {
    pub fn new(navigator: Arc<dyn Navigator>) -> Self {
        Self { navigator }
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    pub fn plan<N: Node>(&self, node: &N, event: &InteractionEvent) -> NavigationPlan {
        if !will_unload(node, event) {
            return NavigationPlan::Proceed;
        }
        let current = self.navigator.current_href();
        if is_submit(node) {
            return NavigationPlan::Deferred {
                destination: current,
                reason: DeferReason::Reload,
            };
        }
        let href = node.href().unwrap_or_default();
        NavigationPlan::Deferred {
            destination: resolve_href(&current, &href),
            reason: DeferReason::FollowLink,
        }
    }

    /// Send `record`, navigating from the completion when `plan` defers.
    pub fn emit(&self, transport: &dyn Transport, record: PropertyRecord, plan: &NavigationPlan) {
        match plan {
            NavigationPlan::Proceed => transport.send(record, None),
            NavigationPlan::Deferred {
                destination,
                reason,
            } => {
                debug!(destination = %destination, reason = ?reason, "navigation deferred until record is sent");
                let navigator = self.navigator.clone();
                let destination = destination.clone();
                let reason = *reason;
                transport.send(
                    record,
                    Some(Box::new(move || {
                        info!(destination = %destination, reason = ?reason, "resuming deferred navigation");
                        navigator.assign(&destination);
                    })),
                );
            }
        }
    }
}

/// Resolve `href` against `base` the way an anchor's `href` property does;
/// falls back to the raw attribute when either side does not parse.
pub fn resolve_href(base: &str, href: &str) -> String {
    Url::parse(base)
        .and_then(|base| base.join(href))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// In-memory location that records every navigation.
#[derive(Debug)]
pub struct MemoryLocation {
    href: Mutex<String>,
    referrer: String,
    history: Mutex<Vec<String>>,
}

impl MemoryLocation {
    pub fn new(href: impl Into<String>) -> Self {
        Self::with_referrer(href, "")
    }

    pub fn with_referrer(href: impl Into<String>, referrer: impl Into<String>) -> Self {
        Self {
            href: Mutex::new(href.into()),
            referrer: referrer.into(),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Every `assign` so far, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.history.lock().clone()
    }
}

impl Navigator for MemoryLocation {
    fn current_href(&self) -> String {
        self.href.lock().clone()
    }

    fn referrer(&self) -> String {
        self.referrer.clone()
    }

    fn assign(&self, href: &str) {
        *self.href.lock() = href.to_string();
        self.history.lock().push(href.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::events::Modifiers;
    use crate::memory::MemoryDocument;
    use webtrack_core::transport::CaptureTransport;

    fn gate() -> (NavigationGate, Arc<MemoryLocation>) {
        let location = Arc::new(MemoryLocation::new("https://shop.test/catalog/list"));
        (NavigationGate::new(location.clone()), location)
    }

    #[test]
    fn test_plain_link_defers() {
        let doc = MemoryDocument::new();
        let link = doc.append(&doc.body().unwrap(), "a", &[("href", "/x")]);
        let (gate, _) = gate();

        assert_eq!(
            gate.plan(&link, &InteractionEvent::click()),
            NavigationPlan::Deferred {
                destination: "https://shop.test/x".into(),
                reason: DeferReason::FollowLink,
            }
        );
    }

    #[test]
    fn test_empty_href_reloads_current_location() {
        let doc = MemoryDocument::new();
        let link = doc.append(&doc.body().unwrap(), "a", &[("href", "")]);
        let (gate, location) = gate();
        let transport = CaptureTransport::deferred();

        let plan = gate.plan(&link, &InteractionEvent::click());
        assert!(plan.prevents_default());
        assert_eq!(
            plan,
            NavigationPlan::Deferred {
                destination: "https://shop.test/catalog/list".into(),
                reason: DeferReason::FollowLink,
            }
        );

        gate.emit(&transport, PropertyRecord::new(), &plan);
        assert!(location.history().is_empty());
        transport.release_pending();
        assert_eq!(location.history(), vec!["https://shop.test/catalog/list".to_string()]);
    }

    #[test]
    fn test_modifier_or_blank_target_proceeds() {
        let doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let link = doc.append(&body, "a", &[("href", "/x")]);
        let blank = doc.append(&body, "a", &[("href", "/x"), ("target", "_blank")]);
        let bare = doc.append(&body, "a", &[]);
        let (gate, _) = gate();

        let ctrl = InteractionEvent::click().with_modifiers(Modifiers {
            ctrl: true,
            ..Modifiers::none()
        });
        assert_eq!(gate.plan(&link, &ctrl), NavigationPlan::Proceed);
        assert_eq!(gate.plan(&blank, &InteractionEvent::click()), NavigationPlan::Proceed);
        assert_eq!(gate.plan(&bare, &InteractionEvent::click()), NavigationPlan::Proceed);
    }

    #[test]
    fn test_submit_reloads_regardless_of_modifiers() {
        let doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let submit = doc.append(&body, "input", &[("type", "submit")]);
        let plain_button = doc.append(&body, "button", &[("type", "button")]);
        let (gate, _) = gate();

        let meta = InteractionEvent::click().with_modifiers(Modifiers {
            meta: true,
            ..Modifiers::none()
        });
        assert_eq!(
            gate.plan(&submit, &meta),
            NavigationPlan::Deferred {
                destination: "https://shop.test/catalog/list".into(),
                reason: DeferReason::Reload,
            }
        );
        assert_eq!(gate.plan(&plain_button, &meta), NavigationPlan::Proceed);
    }

    #[test]
    fn test_navigation_waits_for_completion() {
        let doc = MemoryDocument::new();
        let link = doc.append(&doc.body().unwrap(), "a", &[("href", "/x")]);
        let (gate, location) = gate();
        let transport = CaptureTransport::deferred();

        let plan = gate.plan(&link, &InteractionEvent::click());
        gate.emit(&transport, PropertyRecord::new(), &plan);

        assert_eq!(transport.count(), 1);
        assert!(location.history().is_empty());

        transport.release_pending();
        assert_eq!(location.history(), vec!["https://shop.test/x".to_string()]);
        assert_eq!(location.current_href(), "https://shop.test/x");
    }

    #[test]
    fn test_resolve_href_falls_back_to_raw() {
        assert_eq!(resolve_href("not a url", "/x"), "/x");
        assert_eq!(
            resolve_href("https://shop.test/a/b", "c?d=1"),
            "https://shop.test/a/c?d=1"
        );
        assert_eq!(
            resolve_href("https://shop.test/", "https://other.test/"),
            "https://other.test/"
        );
    }
}
