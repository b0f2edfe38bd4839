//! Arena-backed in-memory document.
//!
//! Used by the test suites and the replay binary as a stand-in host tree.
//! Elements live in one shared arena; [`MemoryNode`] is an index into it.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use webtrack_core::{TrackError, TrackResult};

use crate::dom::{Document, Node, NodeKind};

#[derive(Debug, Default)]
struct Arena {
    elements: Vec<ElementData>,
    root: Option<usize>,
    body: Option<usize>,
}

#[derive(Debug, Clone, Default)]
struct ElementData {
    tag: String,
    attributes: Vec<(String, String)>,
    parent: Option<usize>,
    children: Vec<usize>,
    text: String,
    value: Option<String>,
    checked: bool,
    selected: bool,
    offset_top: f64,
}

impl Arena {
    fn push(&mut self, tag: &str, parent: Option<usize>) -> usize {
        let index = self.elements.len();
        self.elements.push(ElementData {
            tag: tag.to_ascii_uppercase(),
            parent,
            ..ElementData::default()
        });
        if let Some(parent) = parent {
            self.elements[parent].children.push(index);
        }
        index
    }

    /// Pre-order walk below `start`, excluding `start` itself.
    fn descendants(&self, start: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.elements[start].children.iter().rev().copied().collect();
        while let Some(index) = stack.pop() {
            out.push(index);
            stack.extend(self.elements[index].children.iter().rev().copied());
        }
        out
    }

    fn options_of(&self, select: usize) -> Vec<usize> {
        self.descendants(select)
            .into_iter()
            .filter(|&i| self.elements[i].tag == "OPTION")
            .collect()
    }

    fn selected_option(&self, select: usize) -> Option<usize> {
        let options = self.options_of(select);
        options
            .iter()
            .copied()
            .find(|&i| self.elements[i].selected)
            .or_else(|| options.first().copied())
    }

    fn inner_text(&self, index: usize) -> String {
        let element = &self.elements[index];
        let mut text = element.text.clone();
        for &child in &element.children {
            text.push_str(&self.inner_text(child));
        }
        text
    }

    fn attribute(&self, index: usize, name: &str) -> Option<String> {
        self.elements[index]
            .attributes
            .iter()
            .find(|(attr, _)| attr.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    }

    fn option_value(&self, option: usize) -> String {
        self.attribute(option, "value")
            .unwrap_or_else(|| self.inner_text(option))
    }
}

/// Element description used to build a [`MemoryDocument`] from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureElement {
    pub tag: String,
    #[serde(default)]
    pub attributes: serde_json::Map<String, Value>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub offset_top: Option<f64>,
    #[serde(default)]
    pub children: Vec<FixtureElement>,
}

/// In-memory host document.
#[derive(Clone, Default)]
pub struct MemoryDocument {
    arena: Arc<RwLock<Arena>>,
}

impl MemoryDocument {
    /// A document with the usual `html > head, body` skeleton.
    pub fn new() -> Self {
        let doc = Self::default();
        {
            let mut arena = doc.arena.write();
            let html = arena.push("html", None);
            arena.push("head", Some(html));
            let body = arena.push("body", Some(html));
            arena.root = Some(html);
            arena.body = Some(body);
        }
        doc
    }

    /// Build a document whose root element is `root`. The first `body` child
    /// of the root becomes the body.
    pub fn from_fixture(root: &FixtureElement) -> TrackResult<Self> {
        let doc = Self::default();
        {
            let mut arena = doc.arena.write();
            let index = Self::load_fixture(&mut arena, root, None)?;
            let body = arena.elements[index]
                .children
                .iter()
                .copied()
                .find(|&child| arena.elements[child].tag == "BODY");
            arena.root = Some(index);
            arena.body = body;
        }
        Ok(doc)
    }

    fn load_fixture(
        arena: &mut Arena,
        fixture: &FixtureElement,
        parent: Option<usize>,
    ) -> TrackResult<usize> {
        if fixture.tag.trim().is_empty() {
            return Err(TrackError::Fixture("element with empty tag".into()));
        }
        let index = arena.push(&fixture.tag, parent);
        let mut attributes = Vec::with_capacity(fixture.attributes.len());
        for (name, value) in &fixture.attributes {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(true) => String::new(),
                other => {
                    return Err(TrackError::Fixture(format!(
                        "attribute `{name}` on <{}> must be a string, got {other}",
                        fixture.tag
                    )))
                }
            };
            attributes.push((name.clone(), value));
        }
        {
            let element = &mut arena.elements[index];
            element.attributes = attributes;
            element.text = fixture.text.clone().unwrap_or_default();
            element.value = fixture.value.clone();
            element.checked = fixture.checked;
            element.selected = fixture.selected;
            element.offset_top = fixture.offset_top.unwrap_or_default();
        }
        for child in &fixture.children {
            Self::load_fixture(arena, child, Some(index))?;
        }
        Ok(index)
    }

    fn node(&self, index: usize) -> MemoryNode {
        MemoryNode {
            index,
            arena: self.arena.clone(),
        }
    }

    /// Append a new element under `parent`.
    pub fn append(&self, parent: &MemoryNode, tag: &str, attributes: &[(&str, &str)]) -> MemoryNode {
        let index = {
            let mut arena = self.arena.write();
            let index = arena.push(tag, Some(parent.index));
            arena.elements[index].attributes = attributes
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect();
            index
        };
        self.node(index)
    }

    /// A parentless element that is not part of the tree.
    pub fn create_detached(&self, tag: &str) -> MemoryNode {
        let index = self.arena.write().push(tag, None);
        self.node(index)
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<MemoryNode> {
        self.query_all(&[NodeKind::WithId(id.to_string())])
            .into_iter()
            .next()
    }

    fn attached(&self) -> Vec<usize> {
        let arena = self.arena.read();
        match arena.root {
            Some(root) => {
                let mut all = vec![root];
                all.extend(arena.descendants(root));
                all
            }
            None => Vec::new(),
        }
    }
}

impl Document for MemoryDocument {
    type Node = MemoryNode;

    fn document_element(&self) -> Option<MemoryNode> {
        let root = self.arena.read().root;
        root.map(|index| self.node(index))
    }

    fn body(&self) -> Option<MemoryNode> {
        let body = self.arena.read().body;
        body.map(|index| self.node(index))
    }

    fn query_all(&self, kinds: &[NodeKind]) -> Vec<MemoryNode> {
        self.attached()
            .into_iter()
            .map(|index| self.node(index))
            .filter(|node| NodeKind::matches_any(kinds, node))
            .collect()
    }

    fn query_within(&self, scope: &MemoryNode, kinds: &[NodeKind]) -> Vec<MemoryNode> {
        let indices = self.arena.read().descendants(scope.index);
        indices
            .into_iter()
            .map(|index| self.node(index))
            .filter(|node| NodeKind::matches_any(kinds, node))
            .collect()
    }
}

/// Handle to an element of a [`MemoryDocument`].
#[derive(Clone)]
pub struct MemoryNode {
    index: usize,
    arena: Arc<RwLock<Arena>>,
}

impl MemoryNode {
    pub fn set_text(&self, text: &str) {
        self.arena.write().elements[self.index].text = text.to_string();
    }

    /// Edit the live value, as a user typing would.
    pub fn set_value(&self, value: &str) {
        self.arena.write().elements[self.index].value = Some(value.to_string());
    }

    pub fn set_checked(&self, checked: bool) {
        self.arena.write().elements[self.index].checked = checked;
    }

    pub fn set_offset_top(&self, offset_top: f64) {
        self.arena.write().elements[self.index].offset_top = offset_top;
    }

    /// Select the option whose value is `value`. Returns `false` when no
    /// option matches, leaving the selection unchanged.
    pub fn select_value(&self, value: &str) -> bool {
        let mut arena = self.arena.write();
        let options = arena.options_of(self.index);
        let Some(target) = options.iter().copied().find(|&o| arena.option_value(o) == value) else {
            return false;
        };
        for option in options {
            arena.elements[option].selected = option == target;
        }
        true
    }

    /// Detach the element (and its subtree) from its parent.
    pub fn remove(&self) {
        let mut arena = self.arena.write();
        if let Some(parent) = arena.elements[self.index].parent.take() {
            arena.elements[parent].children.retain(|&c| c != self.index);
        }
    }
}

impl PartialEq for MemoryNode {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && Arc::ptr_eq(&self.arena, &other.arena)
    }
}

impl fmt::Debug for MemoryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = self.arena.read().elements[self.index].tag.clone();
        write!(f, "MemoryNode({} <{}>)", self.index, tag)
    }
}

impl Node for MemoryNode {
    fn tag_name(&self) -> String {
        self.arena.read().elements[self.index].tag.clone()
    }

    fn attributes(&self) -> Vec<(String, String)> {
        self.arena.read().elements[self.index].attributes.clone()
    }

    fn set_attribute(&self, name: &str, value: &str) {
        let mut arena = self.arena.write();
        let attributes = &mut arena.elements[self.index].attributes;
        match attributes.iter_mut().find(|(attr, _)| attr.eq_ignore_ascii_case(name)) {
            Some((_, existing)) => *existing = value.to_string(),
            None => attributes.push((name.to_string(), value.to_string())),
        }
    }

    fn parent_element(&self) -> Option<Self> {
        let parent = self.arena.read().elements[self.index].parent;
        parent.map(|index| MemoryNode {
            index,
            arena: self.arena.clone(),
        })
    }

    fn previous_element_sibling(&self) -> Option<Self> {
        let arena = self.arena.read();
        let parent = arena.elements[self.index].parent?;
        let siblings = &arena.elements[parent].children;
        let position = siblings.iter().position(|&c| c == self.index)?;
        let previous = position.checked_sub(1).map(|p| siblings[p])?;
        Some(MemoryNode {
            index: previous,
            arena: self.arena.clone(),
        })
    }

    fn inner_text(&self) -> String {
        self.arena.read().inner_text(self.index)
    }

    fn value(&self) -> String {
        let arena = self.arena.read();
        let element = &arena.elements[self.index];
        if element.tag == "SELECT" {
            return arena
                .selected_option(self.index)
                .map(|option| arena.option_value(option))
                .unwrap_or_default();
        }
        element
            .value
            .clone()
            .or_else(|| arena.attribute(self.index, "value"))
            .unwrap_or_default()
    }

    fn checked(&self) -> bool {
        let arena = self.arena.read();
        arena.elements[self.index].checked || arena.attribute(self.index, "checked").is_some()
    }

    fn selected_option_text(&self) -> Option<String> {
        let arena = self.arena.read();
        if arena.elements[self.index].tag != "SELECT" {
            return None;
        }
        arena
            .selected_option(self.index)
            .map(|option| arena.inner_text(option))
    }

    fn offset_top(&self) -> f64 {
        self.arena.read().elements[self.index].offset_top
    }
}
