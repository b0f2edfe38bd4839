//! Host tree capability: the narrow view of the document the tracker needs.
//!
//! Hosts implement [`Node`] for their element handle and [`Document`] for
//! tree-wide queries. Handles are cheap to clone and compare by identity.
//! Mutation goes through `&self`, the same way DOM element handles work.

use std::fmt;

/// Handle to one element of the host tree.
pub trait Node: Clone + PartialEq + fmt::Debug + Send + Sync {
    /// Upper-case tag name, e.g. `"A"`, `"INPUT"`.
    fn tag_name(&self) -> String;

    /// Attributes in document order.
    fn attributes(&self) -> Vec<(String, String)>;

    fn set_attribute(&self, name: &str, value: &str);

    fn parent_element(&self) -> Option<Self>;

    fn previous_element_sibling(&self) -> Option<Self>;

    /// Rendered text of the element and its descendants.
    fn inner_text(&self) -> String;

    /// Current form-field value; empty for elements without one.
    fn value(&self) -> String;

    fn checked(&self) -> bool;

    /// Text of the currently selected option, for select elements.
    fn selected_option_text(&self) -> Option<String>;

    /// Vertical offset of the element within its offset parent.
    fn offset_top(&self) -> f64;

    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes()
            .into_iter()
            .find(|(attr, _)| attr.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    fn id(&self) -> Option<String> {
        self.attribute("id").filter(|id| !id.trim().is_empty())
    }

    fn class_name(&self) -> Option<String> {
        self.attribute("class")
    }

    /// Raw `href` attribute. An empty value still counts: it points at the
    /// current document.
    fn href(&self) -> Option<String> {
        self.attribute("href")
    }

    fn target(&self) -> Option<String> {
        self.attribute("target")
    }

    /// Form control type as HTML reports it: inputs default to `text`,
    /// buttons to `submit`.
    fn control_type(&self) -> Option<String> {
        let declared = self.attribute("type").map(|t| t.to_ascii_lowercase());
        match self.tag_name().as_str() {
            "INPUT" => Some(declared.unwrap_or_else(|| "text".to_string())),
            "BUTTON" => Some(declared.unwrap_or_else(|| "submit".to_string())),
            "SELECT" if self.has_attribute("multiple") => Some("select-multiple".to_string()),
            "SELECT" => Some("select-one".to_string()),
            "TEXTAREA" => Some("textarea".to_string()),
            _ => None,
        }
    }
}

/// Element kinds the tracker asks the host to find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Any,
    Anchor,
    Button,
    /// `input` or `button` whose control type is `submit`.
    SubmitControl,
    Icon,
    Input,
    TextArea,
    Select,
    Form,
    /// `input`, `select` or `textarea`.
    FormControl,
    /// Elements whose `id` attribute starts with this token.
    WithId(String),
}

impl NodeKind {
    pub fn matches<N: Node>(&self, node: &N) -> bool {
        let tag = node.tag_name();
        match self {
            NodeKind::Any => true,
            NodeKind::Anchor => tag == "A",
            NodeKind::Button => tag == "BUTTON",
            NodeKind::SubmitControl => {
                matches!(tag.as_str(), "INPUT" | "BUTTON")
                    && node.control_type().as_deref() == Some("submit")
            }
            NodeKind::Icon => tag == "I",
            NodeKind::Input => tag == "INPUT",
            NodeKind::TextArea => tag == "TEXTAREA",
            NodeKind::Select => tag == "SELECT",
            NodeKind::Form => tag == "FORM",
            NodeKind::FormControl => matches!(tag.as_str(), "INPUT" | "SELECT" | "TEXTAREA"),
            NodeKind::WithId(wanted) => node
                .attribute("id")
                .and_then(|id| id.split_whitespace().next().map(str::to_string))
                .is_some_and(|token| &token == wanted),
        }
    }

    pub fn matches_any<N: Node>(kinds: &[NodeKind], node: &N) -> bool {
        kinds.iter().any(|kind| kind.matches(node))
    }
}

/// Tree-wide queries over the host document.
pub trait Document: Send + Sync {
    type Node: Node;

    /// The root (`html`) element.
    fn document_element(&self) -> Option<Self::Node>;

    fn body(&self) -> Option<Self::Node>;

    /// Every element matching any of `kinds`, in document order.
    fn query_all(&self, kinds: &[NodeKind]) -> Vec<Self::Node>;

    /// Descendants of `scope` matching any of `kinds`, in document order.
    fn query_within(&self, scope: &Self::Node, kinds: &[NodeKind]) -> Vec<Self::Node>;

    /// Nearest inclusive ancestor of `node` matching `kind`.
    fn closest(&self, node: &Self::Node, kind: &NodeKind) -> Option<Self::Node> {
        let mut current = Some(node.clone());
        while let Some(element) = current {
            if kind.matches(&element) {
                return Some(element);
            }
            current = element.parent_element();
        }
        None
    }
}
