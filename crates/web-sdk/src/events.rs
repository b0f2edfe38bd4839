//! Interaction types: what the host reports when a user clicks or edits a
//! field, and the tracking kinds the registry binds against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dom::NodeKind;

/// DOM event type an interaction arrives as.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Click,
    Change,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Click => "click",
            EventType::Change => "change",
        }
    }
}

/// Interaction family a listener binding tracks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    /// Link clicks.
    Click,
    /// Clicks on buttons, submit controls and icons.
    ClickPassive,
    /// Value changes on inputs and textareas.
    InputChange,
    /// Selection changes on select boxes.
    SelectChange,
}

impl TrackKind {
    pub fn event_type(&self) -> EventType {
        match self {
            TrackKind::Click | TrackKind::ClickPassive => EventType::Click,
            TrackKind::InputChange | TrackKind::SelectChange => EventType::Change,
        }
    }

    /// Node set used when enable/disable is called without one.
    pub fn default_targets(&self) -> Vec<NodeKind> {
        match self {
            TrackKind::Click => vec![NodeKind::Anchor],
            TrackKind::ClickPassive => {
                vec![NodeKind::Button, NodeKind::SubmitControl, NodeKind::Icon]
            }
            TrackKind::InputChange => vec![NodeKind::Input, NodeKind::TextArea],
            TrackKind::SelectChange => vec![NodeKind::Select],
        }
    }

    pub fn is_click(&self) -> bool {
        self.event_type() == EventType::Click
    }
}

/// Modifier keys held during an interaction.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Modifiers {
    #[serde(default)]
    pub meta: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub shift: bool,
}

impl Modifiers {
    pub fn none() -> Self {
        Self::default()
    }

    /// Any key that asks the browser to open the target somewhere else.
    pub fn any(&self) -> bool {
        self.meta || self.alt || self.ctrl || self.shift
    }
}

/// A single user interaction dispatched by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl InteractionEvent {
    pub fn click() -> Self {
        Self {
            event_type: EventType::Click,
            timestamp: Utc::now(),
            modifiers: Modifiers::none(),
        }
    }

    pub fn change() -> Self {
        Self {
            event_type: EventType::Change,
            timestamp: Utc::now(),
            modifiers: Modifiers::none(),
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_event_types() {
        assert_eq!(TrackKind::Click.event_type(), EventType::Click);
        assert_eq!(TrackKind::ClickPassive.event_type(), EventType::Click);
        assert_eq!(TrackKind::InputChange.event_type(), EventType::Change);
        assert_eq!(TrackKind::SelectChange.event_type(), EventType::Change);
        assert!(TrackKind::ClickPassive.is_click());
        assert!(!TrackKind::SelectChange.is_click());
    }

    #[test]
    fn test_modifiers_any() {
        assert!(!Modifiers::none().any());
        for modifiers in [
            Modifiers { meta: true, ..Modifiers::none() },
            Modifiers { alt: true, ..Modifiers::none() },
            Modifiers { ctrl: true, ..Modifiers::none() },
            Modifiers { shift: true, ..Modifiers::none() },
        ] {
            assert!(modifiers.any());
        }
    }

    #[test]
    fn test_interaction_event_serde() {
        let json = r#"{"event_type":"click","timestamp":"2024-01-01T00:00:00Z","modifiers":{"ctrl":true}}"#;
        let parsed: InteractionEvent = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.event_type, EventType::Click);
        assert!(parsed.modifiers.ctrl);
        assert!(!parsed.modifiers.meta);
    }
}
