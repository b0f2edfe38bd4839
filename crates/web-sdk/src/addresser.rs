//! Node addressing: a readable, deterministic path for any element.
//!
//! Paths avoid class names, which change with styling. Each segment is either
//! `TAG#id` (when the id is unique in the document, which also ends the walk),
//! `TAG:nth-child(k)` for ordinary elements, or a bare `TAG` for the element
//! that ends the walk (document root, body, or a parentless node).
//!
//! ```text
//! BODY > DIV:nth-child(2) > UL:nth-child(1) > LI:nth-child(3) > A:nth-child(1)
//! ```

use std::collections::VecDeque;

use tracing::debug;

use crate::dom::{Document, Node, NodeKind};

pub const SEGMENT_SEPARATOR: &str = " > ";

/// Computes node paths.
#[derive(Debug, Clone)]
pub struct NodeAddresser {
    normalize_identifiers: bool,
}

impl Default for NodeAddresser {
    fn default() -> Self {
        Self::new(true)
    }
}

impl NodeAddresser {
    /// `normalize_identifiers` controls whether multi-token `id` attributes
    /// are rewritten to their first token while addressing.
    pub fn new(normalize_identifiers: bool) -> Self {
        Self {
            normalize_identifiers,
        }
    }

    pub fn path_of<D: Document>(&self, doc: &D, node: &D::Node) -> String {
        let root = doc.document_element();
        let body = doc.body();
        let mut segments = VecDeque::new();
        let mut current = Some(node.clone());

        while let Some(element) = current {
            let tag = element.tag_name();

            if let Some(id) = self.normalize_identifier(&element) {
                let matches = doc.query_all(&[NodeKind::WithId(id.clone())]).len();
                if matches <= 1 {
                    segments.push_front(format!("{tag}#{id}"));
                    break;
                }
                debug!(id = %id, matches, "duplicate element id, using ordinal segment");
            }

            let parent = element.parent_element();
            let terminal = parent.is_none()
                || root.as_ref() == Some(&element)
                || body.as_ref() == Some(&element);
            if terminal {
                segments.push_front(tag);
                break;
            }

            segments.push_front(format!("{tag}:nth-child({})", ordinal(&element)));
            current = parent;
        }

        Vec::from(segments).join(SEGMENT_SEPARATOR)
    }

    /// First whitespace token of the element's id, written back onto the
    /// element when normalization is on.
    fn normalize_identifier<N: Node>(&self, element: &N) -> Option<String> {
        let raw = element.id()?;
        let token = raw.split_whitespace().next()?.to_string();
        if self.normalize_identifiers && token != raw {
            debug!(raw = %raw, normalized = %token, "normalizing multi-token element id");
            element.set_attribute("id", &token);
        }
        Some(token)
    }
}

/// 1-based position among sibling elements.
fn ordinal<N: Node>(element: &N) -> usize {
    let mut position = 1;
    let mut sibling = element.previous_element_sibling();
    while let Some(previous) = sibling {
        position += 1;
        sibling = previous.previous_element_sibling();
    }
    position
}
