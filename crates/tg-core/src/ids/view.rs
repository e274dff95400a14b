//! Opaque view references.
//!
//! The core never inspects these values; they are handed verbatim to the
//! element-lookup and router ports.

use serde::{Deserialize, Serialize};

use super::id_macro::impl_id;

/// Reference used to find a target element in the rendered view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

/// Application view route.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Route(String);

/// Handle to a concrete element returned by the element-lookup port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementHandle(String);

impl_id!(Locator, Route, ElementHandle);
