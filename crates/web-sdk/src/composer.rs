//! Property composition: turns an interaction into one outgoing record.
//!
//! Layers, least specific first; later layers win and nested objects merge
//! key by key:
//!
//! 1. global properties snapshot
//! 2. caller-supplied more-properties (static or computed per event)
//! 3. `element`: tag, path, classes, attributes, kind-specific fields and the
//!    enclosing form, if any
//! 4. `event`: timestamp, type, target offset and modifier keys
//!
//! Layers 3 and 4 come from a [`Transformations`] implementation, so callers
//! can reshape them without forking the composer.

use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;
use webtrack_core::record::{deep_merge, merge_layers};
use webtrack_core::PropertyRecord;

use crate::addresser::NodeAddresser;
use crate::dom::{Document, Node, NodeKind};
use crate::events::{InteractionEvent, TrackKind};
use crate::globals::GlobalProperties;

/// Signature of a computed more-properties callback. Pageviews call it with
/// `(None, None)`.
pub type ComputeFn<N> = dyn Fn(Option<&InteractionEvent>, Option<&N>) -> PropertyRecord + Send + Sync;

/// Extra properties a caller attaches to a tracked kind.
pub enum MoreProperties<N> {
    None,
    Static(PropertyRecord),
    Computed(Arc<ComputeFn<N>>),
}

impl<N> MoreProperties<N> {
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(Option<&InteractionEvent>, Option<&N>) -> PropertyRecord + Send + Sync + 'static,
    {
        MoreProperties::Computed(Arc::new(f))
    }

    pub fn resolve(&self, event: Option<&InteractionEvent>, node: Option<&N>) -> PropertyRecord {
        match self {
            MoreProperties::None => PropertyRecord::new(),
            MoreProperties::Static(properties) => properties.clone(),
            MoreProperties::Computed(f) => f(event, node),
        }
    }
}

impl<N> Default for MoreProperties<N> {
    fn default() -> Self {
        MoreProperties::None
    }
}

impl<N> Clone for MoreProperties<N> {
    fn clone(&self) -> Self {
        match self {
            MoreProperties::None => MoreProperties::None,
            MoreProperties::Static(properties) => MoreProperties::Static(properties.clone()),
            MoreProperties::Computed(f) => MoreProperties::Computed(f.clone()),
        }
    }
}

impl<N> fmt::Debug for MoreProperties<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoreProperties::None => f.write_str("None"),
            MoreProperties::Static(properties) => f.debug_tuple("Static").field(properties).finish(),
            MoreProperties::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl<N> From<PropertyRecord> for MoreProperties<N> {
    fn from(properties: PropertyRecord) -> Self {
        MoreProperties::Static(properties)
    }
}

/// State captured when a binding is attached, compared against at fire time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Baseline {
    #[default]
    None,
    Value(String),
    Selection { value: String, text: String },
}

impl Baseline {
    pub fn capture<N: Node>(kind: TrackKind, node: &N) -> Self {
        match kind {
            TrackKind::Click | TrackKind::ClickPassive => Baseline::None,
            TrackKind::InputChange => Baseline::Value(node.value()),
            TrackKind::SelectChange => Baseline::Selection {
                value: node.value(),
                text: node.selected_option_text().unwrap_or_default(),
            },
        }
    }
}

/// Control types left out of form serialization.
const UNSERIALIZED_TYPES: [&str; 5] = ["submit", "button", "image", "reset", "file"];

/// Hooks that turn events and elements into record layers.
///
/// Every method has a default; override one to add or drop properties for
/// all tracked kinds. The free functions of this module hold the default
/// bodies so an override can start from them.
pub trait Transformations<D: Document>: Send + Sync {
    /// The `event` layer.
    fn event_properties(&self, event: &InteractionEvent, node: &D::Node) -> PropertyRecord {
        event_properties(event, node)
    }

    /// Tag, path, classes and attributes of one element.
    fn element_properties(&self, doc: &D, addresser: &NodeAddresser, node: &D::Node) -> PropertyRecord {
        element_properties(doc, addresser, node)
    }

    /// Fields that depend on the tracked kind; written over the attributes.
    fn kind_properties(&self, kind: TrackKind, node: &D::Node, baseline: &Baseline) -> PropertyRecord {
        kind_properties(kind, node, baseline)
    }

    /// `form_values` and `form` for an enclosing form.
    fn form_properties(&self, doc: &D, addresser: &NodeAddresser, form: &D::Node) -> PropertyRecord {
        let mut layer = PropertyRecord::new();
        layer.insert("form_values".into(), Value::Array(serialize_form(doc, form)));
        layer.insert(
            "form".into(),
            Value::Object(self.element_properties(doc, addresser, form)),
        );
        layer
    }

    /// Properties added to every element layer after the kind fields. The
    /// form decoration replaces a control's own `form` attribute.
    fn append_properties(&self, doc: &D, addresser: &NodeAddresser, node: &D::Node, element: &mut PropertyRecord) {
        if let Some(form) = doc.closest(node, &NodeKind::Form) {
            deep_merge(element, &self.form_properties(doc, addresser, &form));
        }
    }
}

/// The stock hooks.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTransformations;

impl<D: Document> Transformations<D> for DefaultTransformations {}

/// Builds records from global state plus per-event layers.
pub struct PropertyComposer<'a, D: Document> {
    globals: &'a GlobalProperties,
    addresser: &'a NodeAddresser,
    transformations: &'a dyn Transformations<D>,
}

impl<'a, D: Document> PropertyComposer<'a, D> {
    pub fn new(globals: &'a GlobalProperties, addresser: &'a NodeAddresser) -> Self {
        Self {
            globals,
            addresser,
            transformations: &DefaultTransformations,
        }
    }

    pub fn with_transformations(mut self, transformations: &'a dyn Transformations<D>) -> Self {
        self.transformations = transformations;
        self
    }

    /// Globals plus more-properties; no element or event layer.
    pub fn pageview(&self, more: &MoreProperties<D::Node>) -> PropertyRecord {
        merge_layers([&self.globals.snapshot(), &more.resolve(None, None)])
    }

    pub fn compose(
        &self,
        doc: &D,
        kind: TrackKind,
        event: &InteractionEvent,
        node: &D::Node,
        more: &MoreProperties<D::Node>,
        baseline: &Baseline,
    ) -> PropertyRecord {
        let hooks = self.transformations;

        let mut element = hooks.element_properties(doc, self.addresser, node);
        deep_merge(&mut element, &hooks.kind_properties(kind, node, baseline));
        hooks.append_properties(doc, self.addresser, node, &mut element);

        let mut layers = PropertyRecord::new();
        layers.insert("element".into(), Value::Object(element));
        layers.insert("event".into(), Value::Object(hooks.event_properties(event, node)));

        let record = merge_layers([
            &self.globals.snapshot(),
            &more.resolve(Some(event), Some(node)),
            &layers,
        ]);
        debug!(kind = ?kind, keys = record.len(), "record composed");
        record
    }
}

/// Tag, path, classes and every attribute of `node`.
pub fn element_properties<D: Document>(doc: &D, addresser: &NodeAddresser, node: &D::Node) -> PropertyRecord {
    let mut layer = PropertyRecord::new();
    layer.insert("tagName".into(), json!(node.tag_name()));
    layer.insert("path".into(), json!(addresser.path_of(doc, node)));

    if let Some(classes) = node.class_name().filter(|c| !c.is_empty()) {
        let classes: Vec<&str> = classes.split_whitespace().collect();
        layer.insert("classes".into(), json!(classes));
    }

    for (name, value) in node.attributes() {
        layer.insert(name, Value::String(value));
    }
    layer
}

pub fn kind_properties<N: Node>(kind: TrackKind, node: &N, baseline: &Baseline) -> PropertyRecord {
    let mut fields = PropertyRecord::new();
    match kind {
        TrackKind::Click => {
            fields.insert("text".into(), json!(node.inner_text()));
        }
        TrackKind::ClickPassive => match node.tag_name().as_str() {
            "BUTTON" => {
                fields.insert("text".into(), json!(node.inner_text()));
            }
            "INPUT" => {
                fields.insert("value".into(), json!(node.value()));
            }
            _ => {}
        },
        TrackKind::InputChange => {
            fields.insert("value".into(), json!(node.value()));
            if let Baseline::Value(previous) = baseline {
                fields.insert("previousValue".into(), json!(previous));
            }
        }
        TrackKind::SelectChange => {
            fields.insert("value".into(), json!(node.value()));
            fields.insert(
                "text".into(),
                json!(node.selected_option_text().unwrap_or_default()),
            );
            if let Baseline::Selection { value, text } = baseline {
                fields.insert("previousValue".into(), json!(value));
                fields.insert("previousText".into(), json!(text));
            }
        }
    }
    fields
}

pub fn event_properties<N: Node>(event: &InteractionEvent, node: &N) -> PropertyRecord {
    let mut layer = PropertyRecord::new();
    layer.insert("timeStamp".into(), json!(event.timestamp.timestamp_millis()));
    layer.insert("type".into(), json!(event.event_type.as_str()));
    layer.insert("scrollTop".into(), json!(node.offset_top()));
    layer.insert("metaKey".into(), json!(event.modifiers.meta));
    layer.insert("altKey".into(), json!(event.modifiers.alt));
    layer.insert("ctrlKey".into(), json!(event.modifiers.ctrl));
    layer.insert("shiftKey".into(), json!(event.modifiers.shift));
    layer
}

/// Successful controls of `form` as `[{name, value}]`, in document order.
pub fn serialize_form<D: Document>(doc: &D, form: &D::Node) -> Vec<Value> {
    doc.query_within(form, &[NodeKind::FormControl])
        .into_iter()
        .filter_map(|control| {
            let name = control.attribute("name").filter(|n| !n.is_empty())?;
            if control.has_attribute("disabled") {
                return None;
            }
            let control_type = control.control_type().unwrap_or_default();
            if UNSERIALIZED_TYPES.contains(&control_type.as_str()) {
                return None;
            }
            let checkable = matches!(control_type.as_str(), "checkbox" | "radio");
            if checkable && !control.checked() {
                return None;
            }
            let mut value = control.value();
            if checkable && value.is_empty() {
                value = "on".to_string();
            }
            Some(json!({"name": name, "value": value}))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Modifiers;
    use crate::memory::{MemoryDocument, MemoryNode};

    fn rec(value: Value) -> PropertyRecord {
        value.as_object().cloned().unwrap()
    }

    fn compose(
        doc: &MemoryDocument,
        globals: &GlobalProperties,
        kind: TrackKind,
        event: &InteractionEvent,
        node: &MemoryNode,
        more: &MoreProperties<MemoryNode>,
        baseline: &Baseline,
    ) -> PropertyRecord {
        let addresser = NodeAddresser::default();
        PropertyComposer::<MemoryDocument>::new(globals, &addresser).compose(doc, kind, event, node, more, baseline)
    }

    #[test]
    fn test_click_record_layers() {
        let doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let link = doc.append(&body, "a", &[("href", "/x"), ("class", "btn  primary")]);
        link.set_text("Buy");
        link.set_offset_top(120.0);

        let globals = GlobalProperties::new(rec(json!({"page_url": "https://shop.test/"})));
        let event = InteractionEvent::click().with_modifiers(Modifiers {
            shift: true,
            ..Modifiers::none()
        });
        let record = compose(
            &doc,
            &globals,
            TrackKind::Click,
            &event,
            &link,
            &MoreProperties::Static(rec(json!({"campaign": "spring"}))),
            &Baseline::None,
        );

        assert_eq!(record["page_url"], json!("https://shop.test/"));
        assert_eq!(record["campaign"], json!("spring"));

        let element = &record["element"];
        assert_eq!(element["tagName"], json!("A"));
        assert_eq!(element["path"], json!("BODY > A:nth-child(1)"));
        assert_eq!(element["classes"], json!(["btn", "primary"]));
        assert_eq!(element["href"], json!("/x"));
        assert_eq!(element["text"], json!("Buy"));

        let ev = &record["event"];
        assert_eq!(ev["type"], json!("click"));
        assert_eq!(ev["scrollTop"], json!(120.0));
        assert_eq!(ev["shiftKey"], json!(true));
        assert_eq!(ev["metaKey"], json!(false));
        assert_eq!(ev["timeStamp"], json!(event.timestamp.timestamp_millis()));
    }

    #[test]
    fn test_more_properties_override_globals_and_layers_override_more() {
        let doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let link = doc.append(&body, "a", &[]);
        let globals = GlobalProperties::new(rec(json!({"source": "global", "element": {"x": 1}})));

        let record = compose(
            &doc,
            &globals,
            TrackKind::Click,
            &InteractionEvent::click(),
            &link,
            &MoreProperties::Static(rec(json!({"source": "call", "element": {"tagName": "fake"}}))),
            &Baseline::None,
        );

        assert_eq!(record["source"], json!("call"));
        // Nested maps merge: the global `x` survives, the element layer wins on tagName.
        assert_eq!(record["element"]["x"], json!(1));
        assert_eq!(record["element"]["tagName"], json!("A"));
    }

    #[test]
    fn test_computed_more_properties_see_event_and_node() {
        let doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let link = doc.append(&body, "a", &[("data-sku", "42")]);
        let more = MoreProperties::computed(|event, node: Option<&MemoryNode>| {
            let mut out = PropertyRecord::new();
            out.insert("had_event".into(), json!(event.is_some()));
            out.insert("sku".into(), json!(node.and_then(|n| n.attribute("data-sku"))));
            out
        });

        let record = compose(
            &doc,
            &GlobalProperties::default(),
            TrackKind::Click,
            &InteractionEvent::click(),
            &link,
            &more,
            &Baseline::None,
        );
        assert_eq!(record["had_event"], json!(true));
        assert_eq!(record["sku"], json!("42"));
    }

    #[test]
    fn test_change_record_has_current_and_previous_value() {
        let doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let input = doc.append(&body, "input", &[("name", "q"), ("value", "foo")]);
        let baseline = Baseline::capture(TrackKind::InputChange, &input);
        input.set_value("bar");

        let record = compose(
            &doc,
            &GlobalProperties::default(),
            TrackKind::InputChange,
            &InteractionEvent::change(),
            &input,
            &MoreProperties::None,
            &baseline,
        );
        // The live value wins over the reflected `value` attribute.
        assert_eq!(record["element"]["value"], json!("bar"));
        assert_eq!(record["element"]["previousValue"], json!("foo"));
        assert_eq!(record["event"]["type"], json!("change"));
    }

    #[test]
    fn test_select_change_record() {
        let doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let select = doc.append(&body, "select", &[("name", "size")]);
        doc.append(&select, "option", &[("value", "s")]).set_text("Small");
        doc.append(&select, "option", &[("value", "l")]).set_text("Large");
        let baseline = Baseline::capture(TrackKind::SelectChange, &select);
        select.select_value("l");

        let record = compose(
            &doc,
            &GlobalProperties::default(),
            TrackKind::SelectChange,
            &InteractionEvent::change(),
            &select,
            &MoreProperties::None,
            &baseline,
        );
        let element = &record["element"];
        assert_eq!(element["value"], json!("l"));
        assert_eq!(element["text"], json!("Large"));
        assert_eq!(element["previousValue"], json!("s"));
        assert_eq!(element["previousText"], json!("Small"));
    }

    #[test]
    fn test_passive_click_fields() {
        let doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let button = doc.append(&body, "button", &[("type", "button")]);
        button.set_text("Open");
        let submit = doc.append(&body, "input", &[("type", "submit"), ("value", "Send")]);
        let icon = doc.append(&body, "i", &[("class", "icon-star")]);

        let passive = |node: &MemoryNode| {
            compose(
                &doc,
                &GlobalProperties::default(),
                TrackKind::ClickPassive,
                &InteractionEvent::click(),
                node,
                &MoreProperties::None,
                &Baseline::None,
            )
        };

        assert_eq!(passive(&button)["element"]["text"], json!("Open"));
        assert_eq!(passive(&submit)["element"]["value"], json!("Send"));
        let icon_record = passive(&icon);
        assert!(icon_record["element"].get("text").is_none());
        assert!(icon_record["element"].get("value").is_none());
    }

    #[test]
    fn test_form_decoration() {
        let doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let form = doc.append(&body, "form", &[("id", "signup"), ("action", "/join")]);
        let email = doc.append(&form, "input", &[("name", "email")]);
        email.set_value("a@b.test");
        doc.append(&form, "input", &[("name", "promo"), ("type", "checkbox")]);
        let terms = doc.append(&form, "input", &[("name", "terms"), ("type", "checkbox")]);
        terms.set_checked(true);
        doc.append(&form, "input", &[("name", "secret"), ("disabled", "")]);
        let submit = doc.append(&form, "button", &[("name", "go")]);

        let record = compose(
            &doc,
            &GlobalProperties::default(),
            TrackKind::ClickPassive,
            &InteractionEvent::click(),
            &submit,
            &MoreProperties::None,
            &Baseline::None,
        );
        let element = &record["element"];
        assert_eq!(
            element["form_values"],
            json!([
                {"name": "email", "value": "a@b.test"},
                {"name": "terms", "value": "on"}
            ])
        );
        assert_eq!(element["form"]["tagName"], json!("FORM"));
        assert_eq!(element["form"]["path"], json!("FORM#signup"));
        assert_eq!(element["form"]["action"], json!("/join"));
        assert!(element["form"].get("form").is_none());
    }

    #[test]
    fn test_form_object_replaces_form_attribute() {
        let doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let form = doc.append(&body, "form", &[("id", "checkout")]);
        let inside = doc.append(&form, "input", &[("name", "zip"), ("form", "checkout")]);
        let outside = doc.append(&body, "input", &[("name", "note"), ("form", "checkout")]);

        let change = |node: &MemoryNode| {
            compose(
                &doc,
                &GlobalProperties::default(),
                TrackKind::InputChange,
                &InteractionEvent::change(),
                node,
                &MoreProperties::None,
                &Baseline::None,
            )
        };

        let record = change(&inside);
        assert_eq!(record["element"]["form"]["tagName"], json!("FORM"));
        assert_eq!(record["element"]["form"]["path"], json!("FORM#checkout"));
        // No enclosing form: the attribute is reflected as-is.
        let record = change(&outside);
        assert_eq!(record["element"]["form"], json!("checkout"));
        assert!(record["element"].get("form_values").is_none());
    }

    struct RoleInsteadOfPath;

    impl Transformations<MemoryDocument> for RoleInsteadOfPath {
        fn element_properties(
            &self,
            doc: &MemoryDocument,
            addresser: &NodeAddresser,
            node: &MemoryNode,
        ) -> PropertyRecord {
            let mut props = element_properties(doc, addresser, node);
            props.remove("path");
            props.insert("role".into(), json!(node.attribute("data-role").unwrap_or_default()));
            props
        }
    }

    #[test]
    fn test_overridden_transformations_add_and_remove_keys() {
        let doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let form = doc.append(&body, "form", &[("data-role", "search")]);
        let button = doc.append(&form, "button", &[("data-role", "go")]);

        let globals = GlobalProperties::default();
        let addresser = NodeAddresser::default();
        let hooks = RoleInsteadOfPath;
        let record = PropertyComposer::<MemoryDocument>::new(&globals, &addresser)
            .with_transformations(&hooks)
            .compose(
                &doc,
                TrackKind::ClickPassive,
                &InteractionEvent::click(),
                &button,
                &MoreProperties::None,
                &Baseline::None,
            );

        let element = &record["element"];
        assert!(element.get("path").is_none());
        assert_eq!(element["role"], json!("go"));
        assert_eq!(element["tagName"], json!("BUTTON"));
        // The form layer goes through the same hook.
        assert!(element["form"].get("path").is_none());
        assert_eq!(element["form"]["role"], json!("search"));
        // Untouched hooks keep their defaults.
        assert_eq!(record["event"]["type"], json!("click"));
    }

    #[test]
    fn test_pageview_has_no_element_or_event() {
        let globals = GlobalProperties::new(rec(json!({"page_url": "https://shop.test/"})));
        let addresser = NodeAddresser::default();
        let composer = PropertyComposer::<MemoryDocument>::new(&globals, &addresser);
        let more = MoreProperties::<MemoryNode>::computed(|event, node| {
            let mut out = PropertyRecord::new();
            out.insert("blank".into(), json!(event.is_none() && node.is_none()));
            out
        });

        let record = composer.pageview(&more);
        assert_eq!(record["page_url"], json!("https://shop.test/"));
        assert_eq!(record["blank"], json!(true));
        assert!(record.get("element").is_none());
        assert!(record.get("event").is_none());
    }
}
