//! Location records and the layout decoding boundary
//!
//! The ERP returns a layout as a JSON object mapping each location code to a
//! row `[x, y, z, dx, dz, dy, owner]`. Values may be numbers, numeric strings,
//! `false` or `null`. All presence/numeric/finite coercion happens here, once;
//! everything downstream works with a validated [`LocationRecord`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::DataFetchError;

/// Reasons a single layout row is rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("location code is empty")]
    EmptyCode,
    #[error("row is not an array")]
    NotAnArray,
    #[error("all geometry fields are zero or absent")]
    NoGeometry,
    #[error("degenerate extents: width={width}, depth={depth}, height={height}")]
    DegenerateExtent { width: f64, depth: f64, height: f64 },
}

/// Identifier of an owning stock location.
///
/// The ERP sends integers in layouts while the session store holds strings, so
/// ids are normalized to their decimal text form before comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationId(pub String);

impl LocationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parse an id from a JSON value. `false`, `null`, empty strings and
    /// non-integral numbers yield `None`; a many2one pair `[id, name]` yields its id.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Self(i.to_string()))
                } else if let Some(u) = n.as_u64() {
                    Some(Self(u.to_string()))
                } else {
                    let f = n.as_f64()?;
                    (f.is_finite() && f.fract() == 0.0).then(|| Self(format!("{}", f as i64)))
                }
            }
            Value::String(s) => Self::parse(s),
            Value::Array(items) => items.first().and_then(Self::from_json),
            _ => None,
        }
    }

    /// Parse an id from stored text, trimming whitespace
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() || text == "false" || text == "null" || text == "undefined" {
            None
        } else {
            Some(Self(text.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated storage bin from a layout snapshot.
///
/// Coordinates are in the warehouse floor frame with `y` as height. Extents are
/// strictly positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub code: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub width: f64,
    pub depth: f64,
    pub height: f64,
    pub owner: Option<LocationId>,
}

impl LocationRecord {
    /// Validate one layout row `[x, y, z, dx, dz, dy, owner]`.
    ///
    /// Absent or non-finite values default to zero. A row whose six geometry
    /// values are all zero is rejected as [`RecordError::NoGeometry`]; any
    /// remaining non-positive extent is [`RecordError::DegenerateExtent`].
    pub fn from_row(code: &str, row: &Value) -> Result<Self, RecordError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(RecordError::EmptyCode);
        }
        let Value::Array(fields) = row else {
            return Err(RecordError::NotAnArray);
        };

        let raw: [Option<f64>; 6] = std::array::from_fn(|i| fields.get(i).and_then(coerce_number));
        if raw.iter().all(|v| v.unwrap_or(0.0) == 0.0) {
            return Err(RecordError::NoGeometry);
        }

        let [x, y, z, width, depth, height] = raw.map(|v| v.unwrap_or(0.0));
        if width <= 0.0 || depth <= 0.0 || height <= 0.0 {
            return Err(RecordError::DegenerateExtent { width, depth, height });
        }

        Ok(Self {
            code: code.to_string(),
            x,
            y,
            z,
            width,
            depth,
            height,
            owner: fields.get(6).and_then(LocationId::from_json),
        })
    }

    /// Whether this bin belongs to the given active location
    pub fn is_owned_by(&self, active: Option<&LocationId>) -> bool {
        match (&self.owner, active) {
            (Some(owner), Some(active)) => owner == active,
            _ => false,
        }
    }

    /// Largest of the three extents
    pub fn max_extent(&self) -> f64 {
        self.width.max(self.depth).max(self.height)
    }
}

/// Result of decoding a layout: the accepted records plus the rejected codes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    pub records: Vec<LocationRecord>,
    pub rejected: Vec<(String, RecordError)>,
}

impl Layout {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Decode a layout response (`{code: [x, y, z, dx, dz, dy, owner]}`).
///
/// A payload that is not an object fails as a whole; individual bad rows are
/// collected in [`Layout::rejected`] and logged.
pub fn decode_layout(value: &Value) -> Result<Layout, DataFetchError> {
    let rows = match value {
        Value::Object(rows) => rows,
        // Odoo sends `false` for "nothing to show"
        Value::Null | Value::Bool(false) => return Ok(Layout::default()),
        Value::Array(items) if items.is_empty() => return Ok(Layout::default()),
        other => {
            return Err(DataFetchError::Malformed(format!(
                "layout must be an object, got {}",
                json_kind(other)
            )))
        }
    };

    let mut layout = Layout::default();
    for (code, row) in rows {
        match LocationRecord::from_row(code, row) {
            Ok(record) => layout.records.push(record),
            Err(err) => {
                tracing::debug!(code = %code, error = %err, "Skipping layout row");
                layout.rejected.push((code.clone(), err));
            }
        }
    }
    if !layout.rejected.is_empty() {
        tracing::warn!(
            accepted = layout.records.len(),
            rejected = layout.rejected.len(),
            "Layout contained unusable rows"
        );
    }
    Ok(layout)
}

/// Coerce a JSON scalar into a finite number
pub(crate) fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_field_order() {
        let record = LocationRecord::from_row("A1", &json!([1, 2, 3, 100, 80, 50, 7])).unwrap();
        assert_eq!(record.code, "A1");
        assert_eq!((record.x, record.y, record.z), (1.0, 2.0, 3.0));
        // dx, dz, dy on the wire
        assert_eq!(record.width, 100.0);
        assert_eq!(record.depth, 80.0);
        assert_eq!(record.height, 50.0);
        assert_eq!(record.owner, Some(LocationId::new("7")));
    }

    #[test]
    fn test_numeric_strings_and_false() {
        let record =
            LocationRecord::from_row("B2", &json!(["10.5", false, null, "2", "3", "4", false])).unwrap();
        assert_eq!(record.x, 10.5);
        assert_eq!(record.y, 0.0);
        assert_eq!(record.z, 0.0);
        assert_eq!(record.owner, None);
    }

    #[test]
    fn test_all_zero_is_no_geometry() {
        assert_eq!(
            LocationRecord::from_row("Z", &json!([0, 0, 0, 0, 0, 0, 1])),
            Err(RecordError::NoGeometry)
        );
        assert_eq!(
            LocationRecord::from_row("Z", &json!([null, false, "", null])),
            Err(RecordError::NoGeometry)
        );
    }

    #[test]
    fn test_non_positive_extent_rejected() {
        for row in [
            json!([5, 0, 5, 0, 10, 10, 1]),
            json!([5, 0, 5, 10, -1, 10, 1]),
            json!([5, 0, 5, 10, 10, "nan", 1]),
        ] {
            assert!(matches!(
                LocationRecord::from_row("C", &row),
                Err(RecordError::DegenerateExtent { .. })
            ));
        }
    }

    #[test]
    fn test_owner_forms() {
        assert_eq!(LocationId::from_json(&json!(12)), Some(LocationId::new("12")));
        assert_eq!(LocationId::from_json(&json!(12.0)), Some(LocationId::new("12")));
        assert_eq!(LocationId::from_json(&json!("WH/Stock")), Some(LocationId::new("WH/Stock")));
        assert_eq!(LocationId::from_json(&json!([4, "WH/Stock"])), Some(LocationId::new("4")));
        assert_eq!(LocationId::from_json(&json!(false)), None);
        assert_eq!(LocationId::from_json(&json!(1.5)), None);
        assert_eq!(LocationId::parse("  "), None);
    }

    #[test]
    fn test_ownership_requires_both_sides() {
        let record = LocationRecord::from_row("A", &json!([0, 0, 0, 1, 1, 1, 3])).unwrap();
        assert!(record.is_owned_by(Some(&LocationId::new("3"))));
        assert!(!record.is_owned_by(Some(&LocationId::new("4"))));
        assert!(!record.is_owned_by(None));
    }

    #[test]
    fn test_decode_layout_collects_rejections() {
        let layout = decode_layout(&json!({
            "A1": [0, 0, 0, 100, 100, 50, 1],
            "GHOST": [0, 0, 0, 0, 0, 0, 1],
            "BAD": "oops",
        }))
        .unwrap();
        assert_eq!(layout.records.len(), 1);
        assert_eq!(layout.records[0].code, "A1");
        assert_eq!(layout.rejected.len(), 2);
    }

    #[test]
    fn test_decode_layout_empty_forms() {
        assert!(decode_layout(&json!({})).unwrap().is_empty());
        assert!(decode_layout(&json!(false)).unwrap().is_empty());
        assert!(decode_layout(&json!(null)).unwrap().is_empty());
        assert!(matches!(decode_layout(&json!(42)), Err(DataFetchError::Malformed(_))));
    }
}
