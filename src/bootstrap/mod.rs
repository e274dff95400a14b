//! Bootstrap module - application initialization and wiring.

pub mod config;
pub mod tracing;
pub mod wiring;

pub use self::config::{load_config, load_or_default};
pub use self::tracing::init_tracing_subscriber;
pub use wiring::{build_session, load_catalog, resolve_storage_paths, StoragePaths, Stores};
