//! Page query parameters and the localStorage-backed session store

use stockview_core::session::{ActionContext, KeyValueStore, MemoryStore, SessionContext};

/// Read a query parameter from the page URL
pub fn query_param(name: &str) -> Option<String> {
    #[cfg(target_arch = "wasm32")]
    {
        let href = web_sys::window()?.location().href().ok()?;
        let url = web_sys::Url::new(&href).ok()?;
        url.search_params().get(name)
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = name;
        None
    }
}

/// Session values persisted in the browser's localStorage
pub struct BrowserStore {
    #[cfg(target_arch = "wasm32")]
    storage: Option<web_sys::Storage>,
    fallback: MemoryStore,
}

impl BrowserStore {
    pub fn open() -> Self {
        #[cfg(target_arch = "wasm32")]
        {
            let storage = web_sys::window().and_then(|w| w.local_storage().ok().flatten());
            if storage.is_none() {
                tracing::warn!("localStorage unavailable, session will not persist");
            }
            Self {
                storage,
                fallback: MemoryStore::default(),
            }
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            Self {
                fallback: MemoryStore::default(),
            }
        }
    }
}

impl KeyValueStore for BrowserStore {
    fn get(&self, key: &str) -> Option<String> {
        #[cfg(target_arch = "wasm32")]
        {
            if let Some(storage) = &self.storage {
                return storage.get_item(key).ok().flatten();
            }
        }
        self.fallback.get(key)
    }

    fn set(&mut self, key: &str, value: &str) {
        #[cfg(target_arch = "wasm32")]
        {
            if let Some(storage) = &self.storage {
                if let Err(err) = storage.set_item(key, value) {
                    tracing::warn!(key = %key, error = ?err, "Failed to persist session value");
                }
                return;
            }
        }
        self.fallback.set(key, value);
    }
}

/// Resolve the session from the page URL (`company_id`, `loc_id`) and localStorage
pub fn resolve_session() -> SessionContext {
    let action = ActionContext {
        company_id: query_param("company_id"),
        loc_id: query_param("loc_id"),
    };
    let mut store = BrowserStore::open();
    SessionContext::resolve(&action, &mut store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_page_url_off_the_web() {
        assert_eq!(query_param("loc_id"), None);
        assert_eq!(resolve_session().location_id, None);
    }

    #[test]
    fn test_native_store_round_trip() {
        let mut store = BrowserStore::open();
        store.set("location_id", "8");
        assert_eq!(store.get("location_id").as_deref(), Some("8"));
    }
}
