//! Process-wide properties merged under every composed record.

use parking_lot::RwLock;
use tracing::debug;
use webtrack_core::PropertyRecord;

/// Additive-only property map. Readers take a snapshot so a record never
/// observes a half-applied update.
#[derive(Debug, Default)]
pub struct GlobalProperties {
    inner: RwLock<PropertyRecord>,
}

impl GlobalProperties {
    pub fn new(initial: PropertyRecord) -> Self {
        Self {
            inner: RwLock::new(initial),
        }
    }

    /// Shallow merge: each top-level key in `properties` replaces the stored one.
    pub fn add(&self, properties: PropertyRecord) {
        let mut inner = self.inner.write();
        for (key, value) in properties {
            debug!(key = %key, "global property set");
            inner.insert(key, value);
        }
    }

    pub fn snapshot(&self) -> PropertyRecord {
        self.inner.read().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
