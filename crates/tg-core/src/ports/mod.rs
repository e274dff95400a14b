//! Port interfaces for the application layer
//!
//! Ports define the contract between the tour use cases and the host
//! environment (rendered view, router, storage). Adapters live in
//! `tg-infra` or in the embedding application.

mod clock;
pub mod document_store;
pub mod element_lookup;
pub mod event_outbox;
pub mod geometry;
pub mod local_state;
pub mod router;

pub use clock::ClockPort;
pub use document_store::DocumentStorePort;
pub use element_lookup::ElementLookupPort;
pub use event_outbox::EventOutboxPort;
pub use geometry::GeometryPort;
pub use local_state::LocalStatePort;
pub use router::RouterPort;
