//! Precipitation unit tagging
//!
//! Forecast providers report precipitation as a probability while historical
//! providers report an accumulated amount. Samples carry their unit so the two
//! are never averaged together.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit conversion error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitError {
    #[error("Mixed precipitation units: expected {expected}, found {found}")]
    MixedPrecipitationUnits {
        expected: PrecipitationUnit,
        found: PrecipitationUnit,
    },

    #[error("Unknown precipitation unit: {0}")]
    UnknownPrecipitationUnit(String),
}

/// Unit of a sample's precipitation value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrecipitationUnit {
    /// Chance of precipitation in [0, 1]
    Probability,
    /// Accumulated amount in millimeters
    Millimeters,
}

impl PrecipitationUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrecipitationUnit::Probability => "probability",
            PrecipitationUnit::Millimeters => "millimeters",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnitError> {
        match value {
            "probability" => Ok(PrecipitationUnit::Probability),
            "millimeters" | "mm" => Ok(PrecipitationUnit::Millimeters),
            other => Err(UnitError::UnknownPrecipitationUnit(other.to_string())),
        }
    }
}

impl fmt::Display for PrecipitationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check that every unit matches the first one.
///
/// Returns `Ok(None)` for an empty iterator.
pub fn common_precipitation_unit<I>(units: I) -> Result<Option<PrecipitationUnit>, UnitError>
where
    I: IntoIterator<Item = PrecipitationUnit>,
{
    let mut iter = units.into_iter();
    let Some(expected) = iter.next() else {
        return Ok(None);
    };

    for found in iter {
        if found != expected {
            return Err(UnitError::MixedPrecipitationUnits { expected, found });
        }
    }

    Ok(Some(expected))
}
