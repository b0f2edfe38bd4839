pub mod config;
pub mod error;
pub mod record;
pub mod transport;

pub use config::TrackerConfig;
pub use error::{TrackError, TrackResult};
pub use record::PropertyRecord;
pub use transport::{Completion, Transport};
