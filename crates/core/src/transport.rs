//! Transport seam: where composed records leave the tracker.
//!
//! The tracker only relies on two things: that `send` accepts the record, and
//! that a supplied completion eventually runs. Deferred navigation waits on
//! that completion and has no timeout of its own.

use parking_lot::Mutex;

use crate::record::PropertyRecord;

/// Callback run once a record has been handed off.
pub type Completion = Box<dyn FnOnce() + Send>;

/// Destination for composed property records (beacon, collector client, ...).
pub trait Transport: Send + Sync {
    fn send(&self, record: PropertyRecord, on_complete: Option<Completion>);
}

/// In-memory transport that captures records for testing.
///
/// In deferred mode completions are parked until [`CaptureTransport::release_pending`]
/// is called, which models a beacon still in flight.
#[derive(Default)]
pub struct CaptureTransport {
    records: Mutex<Vec<PropertyRecord>>,
    pending: Mutex<Vec<Completion>>,
    deferred: bool,
}

impl CaptureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deferred() -> Self {
        Self {
            deferred: true,
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<PropertyRecord> {
        self.records.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.records.lock().len()
    }

    pub fn last(&self) -> Option<PropertyRecord> {
        self.records.lock().last().cloned()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Run every parked completion. Returns how many ran.
    pub fn release_pending(&self) -> usize {
        let pending = std::mem::take(&mut *self.pending.lock());
        let count = pending.len();
        for done in pending {
            done();
        }
        count
    }
}

impl Transport for CaptureTransport {
    fn send(&self, record: PropertyRecord, on_complete: Option<Completion>) {
        self.records.lock().push(record);
        if let Some(done) = on_complete {
            if self.deferred {
                self.pending.lock().push(done);
            } else {
                done();
            }
        }
    }
}
