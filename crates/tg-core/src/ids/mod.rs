//! ID type wrappers for type safety.

mod id_macro;

pub mod event_id;
pub mod tour_ids;
pub mod view;

pub use event_id::EventId;
pub use tour_ids::{PathId, StepId, TourId, UserId};
pub use view::{ElementHandle, Locator, Route};
