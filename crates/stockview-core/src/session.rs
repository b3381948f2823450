//! Session context: which company and location the viewer is showing
//!
//! Values come from the action context first and from a persisted key-value
//! store second. Explicit action context values are written back so a reload
//! without context lands on the same location.

use std::collections::HashMap;

use crate::location::LocationId;

pub const COMPANY_KEY: &str = "company_id";
pub const LOCATION_KEY: &str = "location_id";

/// Persisted string store (browser localStorage in the front-end)
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
}

/// In-memory store, used natively and in tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

/// Context supplied explicitly by the host action
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionContext {
    pub company_id: Option<String>,
    pub loc_id: Option<String>,
}

/// Resolved session context
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionContext {
    pub company_id: Option<String>,
    pub location_id: Option<LocationId>,
}

impl SessionContext {
    /// Resolve from the action context, falling back to the store, and write
    /// explicit values back to the store
    pub fn resolve(action: &ActionContext, store: &mut dyn KeyValueStore) -> Self {
        let company_id = non_empty(action.company_id.as_deref());
        let location_id = action.loc_id.as_deref().and_then(LocationId::parse);

        if let Some(company) = &company_id {
            store.set(COMPANY_KEY, company);
        }
        if let Some(location) = &location_id {
            store.set(LOCATION_KEY, location.as_str());
        }

        let resolved = Self {
            company_id: company_id.or_else(|| non_empty(store.get(COMPANY_KEY).as_deref())),
            location_id: location_id.or_else(|| store.get(LOCATION_KEY).as_deref().and_then(LocationId::parse)),
        };
        tracing::debug!(
            company = ?resolved.company_id,
            location = ?resolved.location_id,
            "Resolved session context"
        );
        resolved
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "false")
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_context_wins_and_is_persisted() {
        let mut store = MemoryStore::default();
        store.set(LOCATION_KEY, "3");

        let ctx = SessionContext::resolve(
            &ActionContext {
                company_id: Some("1".to_string()),
                loc_id: Some("8".to_string()),
            },
            &mut store,
        );

        assert_eq!(ctx.company_id.as_deref(), Some("1"));
        assert_eq!(ctx.location_id, Some(LocationId::new("8")));
        assert_eq!(store.get(LOCATION_KEY).as_deref(), Some("8"));
        assert_eq!(store.get(COMPANY_KEY).as_deref(), Some("1"));
    }

    #[test]
    fn test_store_fallback() {
        let mut store = MemoryStore::default();
        store.set(COMPANY_KEY, "2");
        store.set(LOCATION_KEY, "5");

        let ctx = SessionContext::resolve(&ActionContext::default(), &mut store);
        assert_eq!(ctx.company_id.as_deref(), Some("2"));
        assert_eq!(ctx.location_id, Some(LocationId::new("5")));
    }

    #[test]
    fn test_blank_values_ignored() {
        let mut store = MemoryStore::default();
        let ctx = SessionContext::resolve(
            &ActionContext {
                company_id: Some(" ".to_string()),
                loc_id: Some("false".to_string()),
            },
            &mut store,
        );
        assert_eq!(ctx, SessionContext::default());
        assert!(store.get(LOCATION_KEY).is_none());
    }
}
