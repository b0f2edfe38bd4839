//! Replays a recorded page fixture through the tracker.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info, warn};
use webtrack_core::{Completion, PropertyRecord, TrackError, TrackResult, TrackerConfig, Transport};
use webtrack_web_sdk::{
    Document, EventType, FixtureElement, InteractionEvent, MemoryCookieJar, MemoryDocument,
    MemoryLocation, MemoryNode, Modifiers, MoreProperties, Navigator, NodeAddresser, NodeKind,
    TrackKind, Tracker,
};

/// A page, its cookies, and the interactions to play against it.
#[derive(Debug, Clone, Deserialize)]
pub struct PageFixture {
    pub page: PageInfo,
    pub document: FixtureElement,
    #[serde(default)]
    pub session: Option<SessionStep>,
    #[serde(default)]
    pub globals: PropertyRecord,
    #[serde(default)]
    pub pageview: bool,
    #[serde(default)]
    pub track: Vec<TrackKind>,
    #[serde(default)]
    pub interactions: Vec<InteractionStep>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageInfo {
    pub url: String,
    #[serde(default)]
    pub referrer: String,
    /// `name=value; name=value`
    #[serde(default)]
    pub cookies: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionStep {
    pub cookie_name: Option<String>,
    pub default_identifier: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionStep {
    /// Target by `id` attribute.
    #[serde(default)]
    pub id: Option<String>,
    /// Target by node path, as printed by `webtrack paths`.
    #[serde(default)]
    pub path: Option<String>,
    pub event: EventType,
    #[serde(default)]
    pub modifiers: Modifiers,
    /// New field value applied before a change event.
    #[serde(default)]
    pub value: Option<String>,
    /// Option value selected before a change event.
    #[serde(default)]
    pub select: Option<String>,
}

/// Outcome of a replay run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    pub interactions: usize,
    pub records: usize,
    pub prevented: usize,
    pub final_location: String,
    pub session_id: Option<String>,
}

/// Writes each record as one JSON line on stdout and completes at once.
pub struct StdoutTransport;

impl Transport for StdoutTransport {
    fn send(&self, record: PropertyRecord, on_complete: Option<Completion>) {
        match serde_json::to_string(&record) {
            Ok(line) => println!("{line}"),
            Err(e) => error!(error = %e, "failed to serialize record"),
        }
        if let Some(done) = on_complete {
            done();
        }
    }
}

pub fn load_fixture(path: &Path) -> TrackResult<PageFixture> {
    let raw = std::fs::read_to_string(path)?;
    let fixture: PageFixture = serde_json::from_str(&raw)?;
    Ok(fixture)
}

pub fn replay(
    fixture: &PageFixture,
    config: TrackerConfig,
    transport: Arc<dyn Transport>,
) -> TrackResult<ReplaySummary> {
    let doc = Arc::new(MemoryDocument::from_fixture(&fixture.document)?);
    let location = Arc::new(MemoryLocation::with_referrer(
        fixture.page.url.clone(),
        fixture.page.referrer.clone(),
    ));
    let cookies = Arc::new(MemoryCookieJar::from_cookie_string(&fixture.page.cookies));
    let tracker = Tracker::new(doc, transport, location.clone(), cookies, config);

    if let Some(session) = &fixture.session {
        tracker.track_session(
            session.cookie_name.as_deref(),
            session.default_identifier.as_deref(),
        );
    }
    if !fixture.globals.is_empty() {
        tracker.add_global_properties(fixture.globals.clone());
    }
    if fixture.pageview {
        tracker.track_pageview(MoreProperties::None);
    }
    for kind in &fixture.track {
        tracker.track(*kind, true, None, MoreProperties::None);
    }

    let mut summary = ReplaySummary {
        interactions: 0,
        records: 0,
        prevented: 0,
        final_location: String::new(),
        session_id: tracker.session_id(),
    };
    if fixture.pageview {
        summary.records += 1;
    }

    for (index, step) in fixture.interactions.iter().enumerate() {
        let node = resolve_target(&tracker, step)
            .ok_or_else(|| TrackError::Fixture(format!("interaction {index}: target not found")))?;

        if let Some(value) = &step.value {
            node.set_value(value);
        }
        if let Some(option) = &step.select {
            if !node.select_value(option) {
                warn!(index, option = %option, "no option with that value");
            }
        }

        let event = InteractionEvent {
            event_type: step.event,
            timestamp: Utc::now(),
            modifiers: step.modifiers,
        };
        let outcome = tracker.dispatch(&node, &event);
        summary.interactions += 1;
        summary.records += outcome.emitted;
        if outcome.default_prevented {
            summary.prevented += 1;
        }
    }

    summary.final_location = location.current_href();
    info!(
        interactions = summary.interactions,
        records = summary.records,
        prevented = summary.prevented,
        final_location = %summary.final_location,
        "replay finished"
    );
    Ok(summary)
}

fn resolve_target(tracker: &Tracker<MemoryDocument>, step: &InteractionStep) -> Option<MemoryNode> {
    if let Some(id) = &step.id {
        return tracker.document().get_element_by_id(id);
    }
    let path = step.path.as_ref()?;
    tracker
        .document()
        .query_all(&[NodeKind::Any])
        .into_iter()
        .find(|node| &tracker.path_of(node) == path)
}

/// Path of every element in document order.
pub fn list_paths(fixture: &PageFixture, config: &TrackerConfig) -> TrackResult<Vec<String>> {
    let doc = MemoryDocument::from_fixture(&fixture.document)?;
    let addresser = NodeAddresser::new(config.normalize_identifiers);
    Ok(doc
        .query_all(&[NodeKind::Any])
        .iter()
        .map(|node| addresser.path_of(&doc, node))
        .collect())
}
