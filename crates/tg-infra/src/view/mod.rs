mod snapshot;

pub use snapshot::{ElementSpec, SnapshotView, ViewSnapshot};
