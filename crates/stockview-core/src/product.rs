//! Product descriptors shown in the inspection dialog

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DataFetchError;
use crate::location::{coerce_number, json_kind};

/// A product stored in a bin, as returned by the product endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProductDescriptor {
    /// Preformatted text, shown verbatim
    Text(String),
    Structured {
        name: String,
        quantity: Option<f64>,
        uom: Option<String>,
    },
}

impl ProductDescriptor {
    /// Parse one entry: a string, an object with `name`/`qty`/`uom`, or `[name, qty, uom]`
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| Self::Text(s.to_string()))
            }
            Value::Object(map) => {
                let name = ["name", "display_name", "product"]
                    .iter()
                    .find_map(|key| map.get(*key).and_then(text_of))?;
                let quantity = ["qty", "quantity", "product_qty"]
                    .iter()
                    .find_map(|key| map.get(*key).and_then(coerce_number));
                let uom = ["uom", "product_uom"].iter().find_map(|key| map.get(*key).and_then(text_of));
                Some(Self::Structured { name, quantity, uom })
            }
            Value::Array(items) => {
                let name = items.first().and_then(text_of)?;
                Some(Self::Structured {
                    name,
                    quantity: items.get(1).and_then(coerce_number),
                    uom: items.get(2).and_then(text_of),
                })
            }
            Value::Number(n) => Some(Self::Text(n.to_string())),
            _ => None,
        }
    }

    /// Single display line for the dialog
    pub fn display(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Structured { name, quantity: None, .. } => name.clone(),
            Self::Structured { name, quantity: Some(qty), uom } => {
                let qty = format_quantity(*qty);
                match uom {
                    Some(uom) => format!("{} × {} {}", name, qty, uom),
                    None => format!("{} × {}", name, qty),
                }
            }
        }
    }
}

/// Decode a product response. `false`/`null` mean "no products".
pub fn decode_products(value: &Value) -> Result<Vec<ProductDescriptor>, DataFetchError> {
    match value {
        Value::Array(items) => Ok(items.iter().filter_map(ProductDescriptor::from_json).collect()),
        Value::Null | Value::Bool(false) => Ok(Vec::new()),
        // Some controllers return a single preformatted string
        Value::String(_) => Ok(ProductDescriptor::from_json(value).into_iter().collect()),
        other => Err(DataFetchError::Malformed(format!(
            "products must be an array, got {}",
            json_kind(other)
        ))),
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        // many2one pairs: [id, "display name"]
        Value::Array(pair) => pair.get(1).and_then(text_of),
        _ => None,
    }
}

fn format_quantity(qty: f64) -> String {
    if qty.fract() == 0.0 {
        format!("{}", qty as i64)
    } else {
        format!("{:.2}", qty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mixed_descriptors() {
        let products = decode_products(&json!([
            "[FURN_7800] Desk Combination",
            {"name": "Cable Management Box", "qty": 12, "uom": "Units"},
            {"product": [42, "Office Chair"], "quantity": 2.5},
            ["Drawer", 3],
            null,
            {"qty": 4},
        ]))
        .unwrap();

        let lines: Vec<String> = products.iter().map(|p| p.display()).collect();
        assert_eq!(
            lines,
            vec![
                "[FURN_7800] Desk Combination".to_string(),
                "Cable Management Box × 12 Units".to_string(),
                "Office Chair × 2.50".to_string(),
                "Drawer × 3".to_string(),
            ]
        );
    }

    #[test]
    fn test_empty_forms() {
        assert!(decode_products(&json!(false)).unwrap().is_empty());
        assert!(decode_products(&json!([])).unwrap().is_empty());
        assert_eq!(decode_products(&json!("Only one")).unwrap().len(), 1);
        assert!(decode_products(&json!({"a": 1})).is_err());
    }
}
