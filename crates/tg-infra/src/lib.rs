//! tourguide infrastructure adapters
//!
//! File-backed state cache and document store, an in-memory document store,
//! the system clock and a headless view that stands in for a rendered UI.

pub mod fs;
pub mod store;
pub mod time;
pub mod view;

pub use fs::{app_data_dir, remote_dir, state_dir};
pub use store::{
    FileDocumentStore, FileEventOutbox, FileLocalStateRepository, InMemoryDocumentStore,
    InMemoryEventOutbox,
};
pub use time::SystemClock;
pub use view::{SnapshotView, ViewSnapshot};
