//! Tracker, the public surface. Owns global properties, the session, the
//! listener registry and the navigation gate for one document.
//!
//! The tracker is the page's process-wide tracking state: globals are seeded
//! with `page_url` and `referrer_url` at construction and live until the
//! tracker is dropped.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info};
use webtrack_core::record::record_from_value;
use webtrack_core::{PropertyRecord, TrackResult, TrackerConfig, Transport};

use crate::addresser::NodeAddresser;
use crate::composer::{DefaultTransformations, MoreProperties, PropertyComposer, Transformations};
use crate::dom::Document;
use crate::events::{InteractionEvent, TrackKind};
use crate::globals::GlobalProperties;
use crate::listeners::ListenerRegistry;
use crate::navigation::{NavigationGate, NavigationPlan, Navigator};
use crate::session::{CookieStore, SessionIdentity};

/// Result of dispatching one interaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dispatch {
    /// The host must suppress the browser's default action; navigation will
    /// be replayed once the record is sent.
    pub default_prevented: bool,
    /// Records handed to the transport.
    pub emitted: usize,
}

pub struct Tracker<D: Document> {
    document: Arc<D>,
    config: TrackerConfig,
    globals: GlobalProperties,
    addresser: NodeAddresser,
    registry: ListenerRegistry<D::Node>,
    gate: NavigationGate,
    session: SessionIdentity,
    transport: Arc<dyn Transport>,
    transformations: Arc<dyn Transformations<D>>,
}

impl<D: Document> Tracker<D> {
    pub fn new(
        document: Arc<D>,
        transport: Arc<dyn Transport>,
        navigator: Arc<dyn Navigator>,
        cookies: Arc<dyn CookieStore>,
        config: TrackerConfig,
    ) -> Self {
        let mut initial = PropertyRecord::new();
        initial.insert("page_url".into(), json!(navigator.current_href()));
        initial.insert("referrer_url".into(), json!(navigator.referrer()));

        info!(
            page_url = %navigator.current_href(),
            cookie_name = %config.cookie_name,
            normalize_identifiers = config.normalize_identifiers,
            "tracker initialized"
        );

        Self {
            document,
            globals: GlobalProperties::new(initial),
            addresser: NodeAddresser::new(config.normalize_identifiers),
            registry: ListenerRegistry::new(),
            gate: NavigationGate::new(navigator),
            session: SessionIdentity::new(cookies, config.cookie_name.clone(), config.cookie_path.clone()),
            transport,
            transformations: Arc::new(DefaultTransformations),
            config,
        }
    }

    /// Replace the hooks that build element and event layers.
    pub fn with_transformations(mut self, transformations: Arc<dyn Transformations<D>>) -> Self {
        self.transformations = transformations;
        self
    }

    pub fn document(&self) -> &Arc<D> {
        &self.document
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn registry(&self) -> &ListenerRegistry<D::Node> {
        &self.registry
    }

    pub fn add_global_properties(&self, properties: PropertyRecord) {
        self.globals.add(properties);
    }

    /// Like [`Tracker::add_global_properties`], for arbitrary JSON. Anything
    /// other than an object is rejected.
    pub fn add_global_properties_json(&self, value: Value) -> TrackResult<()> {
        self.globals.add(record_from_value(value)?);
        Ok(())
    }

    pub fn global_properties(&self) -> PropertyRecord {
        self.globals.snapshot()
    }

    /// Read or create the session identifier and expose it as the `guid`
    /// global property.
    pub fn track_session(&self, cookie_name: Option<&str>, default_identifier: Option<&str>) -> String {
        let guid = self.session.ensure(cookie_name, default_identifier);
        let mut properties = PropertyRecord::new();
        properties.insert("guid".into(), json!(guid));
        self.globals.add(properties);
        guid
    }

    pub fn session_id(&self) -> Option<String> {
        self.session.current()
    }

    pub fn track_pageview(&self, more: MoreProperties<D::Node>) {
        let record = self.composer().pageview(&more);
        debug!(keys = record.len(), "pageview");
        self.transport.send(record, None);
    }

    /// Link clicks; defaults to every anchor.
    pub fn track_clicks(&self, enable: bool, nodes: Option<Vec<D::Node>>, more: MoreProperties<D::Node>) -> usize {
        self.track(TrackKind::Click, enable, nodes, more)
    }

    /// Button, submit and icon clicks.
    pub fn track_clicks_passive(&self, enable: bool, nodes: Option<Vec<D::Node>>, more: MoreProperties<D::Node>) -> usize {
        self.track(TrackKind::ClickPassive, enable, nodes, more)
    }

    /// Input and textarea value changes.
    pub fn track_input_changes(&self, enable: bool, nodes: Option<Vec<D::Node>>, more: MoreProperties<D::Node>) -> usize {
        self.track(TrackKind::InputChange, enable, nodes, more)
    }

    /// Select box changes.
    pub fn track_select_input_changes(
        &self,
        enable: bool,
        nodes: Option<Vec<D::Node>>,
        more: MoreProperties<D::Node>,
    ) -> usize {
        self.track(TrackKind::SelectChange, enable, nodes, more)
    }

    /// Enable or disable `kind` on `nodes` (or the kind's default node set).
    /// Returns the number of bindings created or removed.
    pub fn track(
        &self,
        kind: TrackKind,
        enable: bool,
        nodes: Option<Vec<D::Node>>,
        more: MoreProperties<D::Node>,
    ) -> usize {
        let nodes = nodes.unwrap_or_else(|| self.document.query_all(&kind.default_targets()));
        if enable {
            self.registry.attach(kind, &nodes, &more)
        } else {
            self.registry.detach(kind, &nodes)
        }
    }

    pub fn path_of(&self, node: &D::Node) -> String {
        self.addresser.path_of(self.document.as_ref(), node)
    }

    /// Entry point for the host: run every binding on `node` that listens for
    /// this event type. Only the first deferring click schedules navigation.
    pub fn dispatch(&self, node: &D::Node, event: &InteractionEvent) -> Dispatch {
        let bindings = self.registry.bindings_for(node, event.event_type);
        let composer = self.composer();
        let mut outcome = Dispatch::default();

        for binding in bindings {
            let record = composer.compose(
                self.document.as_ref(),
                binding.kind,
                event,
                node,
                &binding.more,
                &binding.baseline,
            );
            if binding.kind.is_click() && !outcome.default_prevented {
                let plan = self.gate.plan(node, event);
                outcome.default_prevented = plan.prevents_default();
                self.gate.emit(self.transport.as_ref(), record, &plan);
            } else {
                self.gate
                    .emit(self.transport.as_ref(), record, &NavigationPlan::Proceed);
            }
            outcome.emitted += 1;
        }

        debug!(
            event_type = event.event_type.as_str(),
            emitted = outcome.emitted,
            default_prevented = outcome.default_prevented,
            "interaction dispatched"
        );
        outcome
    }

    fn composer(&self) -> PropertyComposer<'_, D> {
        PropertyComposer::new(&self.globals, &self.addresser)
            .with_transformations(self.transformations.as_ref())
    }
}
