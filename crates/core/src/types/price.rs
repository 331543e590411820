//! Product price representation.
//!
//! Prices travel through the document store as plain floats. The catalog
//! distinguishes "free" from "price unknown" only by presence: an absent,
//! zero, or non-finite stored value collapses to "no price" (`None`), so a
//! `Price` always holds a positive, finite amount.

use serde::{Deserialize, Serialize};

/// A known product price.
///
/// Construct via [`Price::from_stored`], which applies the collapsing
/// convention. Callers that need "no price" carry `Option<Price>`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(f64);

impl Price {
    /// Interpret a raw stored value.
    ///
    /// Returns `None` for absent, zero, negative, or non-finite values -
    /// all of which mean "price unknown" in stored records.
    #[must_use]
    pub fn from_stored(raw: Option<f64>) -> Option<Self> {
        match raw {
            Some(v) if v.is_finite() && v > 0.0 => Some(Self(v)),
            _ => None,
        }
    }

    /// The price as a float, for serialization back into a record.
    #[must_use]
    pub const fn as_f64(self) -> f64 {
        self.0
    }
}

impl core::fmt::Display for Price {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
