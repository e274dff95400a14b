//! Business logic use cases

pub mod tour;

pub use tour::TourOrchestrator;
