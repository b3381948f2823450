//! Occupancy snapshots and color classification

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{Palette, Rgb};
use crate::error::DataFetchError;
use crate::location::{coerce_number, json_kind};

/// Fill percentage meaning "no load expected" for this bin
pub const NO_LOAD_SENTINEL: f64 = -1.0;

/// Inventory snapshot for a single bin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OccupancyState {
    pub has_quantity: bool,
    /// May exceed 100 (overload) or equal the sentinel
    pub fill_percent: f64,
}

impl OccupancyState {
    /// Decode a quantity response `[has_quantity, fill_percent]`.
    ///
    /// `has_quantity` may be `0|1` or a boolean; `fill_percent` must be a finite number.
    pub fn decode(value: &Value) -> Result<Self, DataFetchError> {
        let Value::Array(items) = value else {
            return Err(DataFetchError::Malformed(format!(
                "occupancy must be an array, got {}",
                json_kind(value)
            )));
        };
        if items.len() < 2 {
            return Err(DataFetchError::Malformed(format!(
                "occupancy needs 2 fields, got {}",
                items.len()
            )));
        }

        let has_quantity = match &items[0] {
            Value::Bool(b) => *b,
            other => coerce_number(other)
                .map(|n| n != 0.0)
                .ok_or_else(|| DataFetchError::Malformed("has_quantity is not a flag".to_string()))?,
        };
        let fill_percent = coerce_number(&items[1])
            .ok_or_else(|| DataFetchError::Malformed("fill percentage is not a number".to_string()))?;

        Ok(Self { has_quantity, fill_percent })
    }
}

/// Display tier of a bin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupancyTier {
    /// Not part of the active location; dimmed and not pickable
    Inactive,
    /// Occupancy could not be fetched or decoded
    Unknown,
    /// Filled beyond 100%
    Overload,
    /// Between the almost-full threshold and 100%
    AlmostFull,
    /// At or below the almost-full threshold, or no load expected
    FreeSpace,
    /// Waiting for stock
    Empty,
}

impl OccupancyTier {
    pub const ALL: [OccupancyTier; 6] = [
        OccupancyTier::Overload,
        OccupancyTier::AlmostFull,
        OccupancyTier::FreeSpace,
        OccupancyTier::Empty,
        OccupancyTier::Inactive,
        OccupancyTier::Unknown,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            OccupancyTier::Inactive => "Other location",
            OccupancyTier::Unknown => "Unknown",
            OccupancyTier::Overload => "Overload",
            OccupancyTier::AlmostFull => "Almost full",
            OccupancyTier::FreeSpace => "Free space",
            OccupancyTier::Empty => "Empty / awaiting load",
        }
    }
}

/// Thresholds used by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OccupancyRules {
    pub sentinel: f64,
    pub overload_above: f64,
    pub almost_full_above: f64,
}

impl Default for OccupancyRules {
    fn default() -> Self {
        Self {
            sentinel: NO_LOAD_SENTINEL,
            overload_above: 100.0,
            almost_full_above: 50.0,
        }
    }
}

impl OccupancyRules {
    /// Classify a bin. Rules are evaluated in order:
    /// inactive location, then stocked fill bands, then the unstocked sentinel check.
    pub fn classify(&self, is_owning_location: bool, has_quantity: bool, fill_percent: f64) -> OccupancyTier {
        if !is_owning_location {
            return OccupancyTier::Inactive;
        }
        if !fill_percent.is_finite() {
            return OccupancyTier::Unknown;
        }
        if has_quantity {
            if fill_percent > self.overload_above {
                OccupancyTier::Overload
            } else if fill_percent > self.almost_full_above {
                OccupancyTier::AlmostFull
            } else {
                OccupancyTier::FreeSpace
            }
        } else if fill_percent == self.sentinel {
            OccupancyTier::FreeSpace
        } else {
            OccupancyTier::Empty
        }
    }

    /// Classify from a fetch outcome; a failed fetch degrades to [`OccupancyTier::Unknown`]
    pub fn classify_fetch(
        &self,
        is_owning_location: bool,
        fetched: Option<&Result<OccupancyState, DataFetchError>>,
    ) -> OccupancyTier {
        if !is_owning_location {
            return OccupancyTier::Inactive;
        }
        match fetched {
            Some(Ok(state)) => self.classify(true, state.has_quantity, state.fill_percent),
            _ => OccupancyTier::Unknown,
        }
    }
}

/// Classify with the standard 100/50 thresholds and a caller-supplied sentinel
pub fn classify(is_owning_location: bool, has_quantity: bool, fill_percent: f64, status_sentinel: f64) -> OccupancyTier {
    OccupancyRules {
        sentinel: status_sentinel,
        ..OccupancyRules::default()
    }
    .classify(is_owning_location, has_quantity, fill_percent)
}

/// Color and opacity assigned to a bin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinAppearance {
    pub tier: OccupancyTier,
    pub color: Rgb,
    pub opacity: f32,
}

impl Palette {
    /// Resolve the color and opacity tier for a classification
    pub fn appearance(&self, tier: OccupancyTier) -> BinAppearance {
        let (color, opacity) = match tier {
            OccupancyTier::Inactive | OccupancyTier::Unknown => (self.inactive, self.opacity.low),
            OccupancyTier::Overload => (self.overload, self.opacity.high),
            OccupancyTier::AlmostFull => (self.almost_full, self.opacity.medium),
            OccupancyTier::FreeSpace => (self.free_space, self.opacity.medium),
            OccupancyTier::Empty => (self.empty, self.opacity.medium),
        };
        BinAppearance { tier, color, opacity }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inactive_ignores_inventory() {
        for has_quantity in [true, false] {
            for fill in [-1.0, 0.0, 50.0, 75.0, 100.0, 250.0] {
                assert_eq!(classify(false, has_quantity, fill, -1.0), OccupancyTier::Inactive);
            }
        }
    }

    #[test]
    fn test_stocked_boundaries() {
        assert_eq!(classify(true, true, 100.5, -1.0), OccupancyTier::Overload);
        assert_eq!(classify(true, true, 100.0, -1.0), OccupancyTier::AlmostFull);
        assert_eq!(classify(true, true, 75.0, -1.0), OccupancyTier::AlmostFull);
        assert_eq!(classify(true, true, 50.0, -1.0), OccupancyTier::FreeSpace);
        assert_eq!(classify(true, true, 0.0, -1.0), OccupancyTier::FreeSpace);
    }

    #[test]
    fn test_unstocked_sentinel() {
        assert_eq!(classify(true, false, -1.0, -1.0), OccupancyTier::FreeSpace);
        assert_eq!(classify(true, false, 0.0, -1.0), OccupancyTier::Empty);
        assert_eq!(classify(true, false, 80.0, -1.0), OccupancyTier::Empty);
        assert_eq!(classify(true, false, 0.0, 0.0), OccupancyTier::FreeSpace);
    }

    #[test]
    fn test_failed_fetch_is_unknown() {
        let rules = OccupancyRules::default();
        let failed = Err(DataFetchError::Transport("offline".to_string()));
        assert_eq!(rules.classify_fetch(true, Some(&failed)), OccupancyTier::Unknown);
        assert_eq!(rules.classify_fetch(true, None), OccupancyTier::Unknown);
        assert_eq!(rules.classify_fetch(false, Some(&failed)), OccupancyTier::Inactive);
    }

    #[test]
    fn test_decode_occupancy() {
        assert_eq!(
            OccupancyState::decode(&json!([1, 75])).unwrap(),
            OccupancyState { has_quantity: true, fill_percent: 75.0 }
        );
        assert_eq!(
            OccupancyState::decode(&json!([false, -1])).unwrap(),
            OccupancyState { has_quantity: false, fill_percent: -1.0 }
        );
        assert!(OccupancyState::decode(&json!([1])).is_err());
        assert!(OccupancyState::decode(&json!({"qty": 1})).is_err());
        assert!(OccupancyState::decode(&json!([1, "lots"])).is_err());
    }

    #[test]
    fn test_palette_tiers() {
        let palette = Palette::default();
        let amber = palette.appearance(OccupancyTier::AlmostFull);
        assert_eq!(amber.color, palette.almost_full);
        assert_eq!(amber.opacity, palette.opacity.medium);
        assert_eq!(palette.appearance(OccupancyTier::Overload).opacity, palette.opacity.high);
        assert_eq!(palette.appearance(OccupancyTier::Unknown).color, palette.inactive);
        assert_eq!(palette.appearance(OccupancyTier::Inactive).opacity, palette.opacity.low);
    }
}
