//! Browser-side behavioral tracking: pageviews, clicks and value changes
//! stamped with an anonymous session id and a stable node path.
//!
//! # Modules
//!
//! - [`dom`]: host tree capability (`Node`, `Document`, `NodeKind`)
//! - [`addresser`]: stable, class-free node paths
//! - [`composer`]: layered property records
//! - [`listeners`]: enable/disable bookkeeping with captured baselines
//! - [`navigation`]: deferring page-unloading clicks until the record is sent
//! - [`session`]: cookie-backed anonymous session identifier
//! - [`tracker`]: the public surface tying it together
//! - [`memory`]: in-memory host document for tests and replay

pub mod addresser;
pub mod composer;
pub mod dom;
pub mod events;
pub mod globals;
pub mod listeners;
pub mod memory;
pub mod navigation;
pub mod session;
pub mod tracker;

pub use addresser::NodeAddresser;
pub use composer::{Baseline, DefaultTransformations, MoreProperties, PropertyComposer, Transformations};
pub use dom::{Document, Node, NodeKind};
pub use events::{EventType, InteractionEvent, Modifiers, TrackKind};
pub use globals::GlobalProperties;
pub use listeners::{ListenerBinding, ListenerRegistry};
pub use memory::{FixtureElement, MemoryDocument, MemoryNode};
pub use navigation::{MemoryLocation, NavigationGate, NavigationPlan, Navigator};
pub use session::{CookieStore, MemoryCookieJar, SessionIdentity};
pub use tracker::{Dispatch, Tracker};
