//! JSON-RPC client for the ERP endpoints
//!
//! Requests run as browser futures and hand their results back through a
//! shared queue that an Update system drains into the controller. A mounted
//! flag is checked before a result is queued so nothing lands after unmount.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bevy::prelude::*;
use stockview_core::config::RpcConfig;
use stockview_core::{DataFetchError, Layout, OccupancyState, ProductDescriptor, ViewerConfig};
use stockview_scene::{FetchRequest, InteractionController, Phase, UnmountRequested};

use crate::session;

pub struct NetworkPlugin;

/// A completed fetch
#[derive(Debug, Clone)]
pub enum FetchResult {
    Layout(Result<Layout, DataFetchError>),
    Occupancy(String, Result<OccupancyState, DataFetchError>),
    Products(String, Result<Vec<ProductDescriptor>, DataFetchError>),
}

/// Pending fetch results from async requests
#[derive(Resource, Default)]
pub struct PendingResults(pub Arc<Mutex<Vec<FetchResult>>>);

/// Cleared on unmount; in-flight requests drop their results when it is false
#[derive(Resource)]
pub struct Mounted(pub Arc<AtomicBool>);

impl Default for Mounted {
    fn default() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }
}

/// Configuration override fetched from `?config=<url>`
#[derive(Resource, Default)]
pub struct PendingConfig {
    /// `Some` once the fetch has finished (successfully or not)
    pub result: Arc<Mutex<Option<Option<ViewerConfig>>>>,
    pub requested: bool,
}

/// Monotonic JSON-RPC request id
#[derive(Resource, Default)]
pub struct RequestCounter(pub u64);

impl RequestCounter {
    pub fn next(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }
}

impl Plugin for NetworkPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PendingResults>()
            .init_resource::<Mounted>()
            .init_resource::<PendingConfig>()
            .init_resource::<RequestCounter>()
            .add_systems(Startup, fetch_config_override)
            .add_systems(
                Update,
                (poll_unmount, mount_when_ready, dispatch_requests, apply_results).chain(),
            );
    }
}

fn fetch_config_override(mut pending: ResMut<PendingConfig>) {
    let Some(url) = session::query_param("config") else {
        return;
    };
    pending.requested = true;
    tracing::info!(url = %url, "Fetching viewer configuration");

    #[cfg(target_arch = "wasm32")]
    {
        use wasm_bindgen_futures::spawn_local;

        let slot = pending.result.clone();
        spawn_local(async move {
            let config = match fetch_text(&url).await {
                Ok(text) => match ViewerConfig::from_toml_str(&text) {
                    Ok(config) => Some(config),
                    Err(e) => {
                        tracing::warn!(error = %e, "Invalid viewer configuration, using defaults");
                        None
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to fetch viewer configuration, using defaults");
                    None
                }
            };
            if let Ok(mut slot) = slot.lock() {
                *slot = Some(config);
            }
        });
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Ok(mut slot) = pending.result.lock() {
            *slot = Some(None);
        }
    }
}

/// Mount once the window exists and any configuration override has arrived
fn mount_when_ready(
    mut controller: ResMut<InteractionController>,
    pending_config: Res<PendingConfig>,
    windows: Query<&Window>,
    mut requests: MessageWriter<FetchRequest>,
) {
    if controller.phase() != Phase::Uninitialized || windows.single().is_err() {
        return;
    }
    if pending_config.requested {
        let Ok(mut slot) = pending_config.result.lock() else {
            return;
        };
        match slot.take() {
            None => return,
            Some(Some(config)) => {
                controller.reconfigure(config);
            }
            Some(None) => {}
        }
    }

    let session = session::resolve_session();
    for request in controller.mount(session) {
        requests.write(request);
    }
}

fn poll_unmount(mounted: Res<Mounted>, mut unmount: MessageWriter<UnmountRequested>) {
    if crate::take_unmount_request() {
        tracing::info!("Unmount requested by host page");
        mounted.0.store(false, Ordering::SeqCst);
        unmount.write(UnmountRequested);
    }
}

/// Start a fetch for every request the controller emitted
fn dispatch_requests(
    mut requests: MessageReader<FetchRequest>,
    controller: Res<InteractionController>,
    pending: Res<PendingResults>,
    mounted: Res<Mounted>,
    mut counter: ResMut<RequestCounter>,
) {
    let rpc = &controller.config().rpc;
    for request in requests.read() {
        tracing::debug!(request = ?request, "Dispatching fetch");
        spawn_fetch(rpc, request.clone(), counter.next(), &pending, &mounted);
    }
}

/// Feed completed fetches to the controller
fn apply_results(
    pending: Res<PendingResults>,
    mut controller: ResMut<InteractionController>,
    mut requests: MessageWriter<FetchRequest>,
) {
    let results = match pending.0.lock() {
        Ok(mut queue) => std::mem::take(&mut *queue),
        Err(_) => return,
    };

    for result in results {
        match result {
            FetchResult::Layout(layout) => {
                for request in controller.layout_loaded(layout) {
                    requests.write(request);
                }
            }
            FetchResult::Occupancy(code, occupancy) => controller.occupancy_loaded(&code, occupancy),
            FetchResult::Products(code, products) => controller.products_loaded(&code, products),
        }
    }
}

fn spawn_fetch(
    rpc: &RpcConfig,
    request: FetchRequest,
    id: u64,
    pending: &PendingResults,
    mounted: &Mounted,
) {
    #[cfg(target_arch = "wasm32")]
    {
        use wasm_bindgen_futures::spawn_local;

        let queue = pending.0.clone();
        let mounted = mounted.0.clone();
        let rpc = rpc.clone();
        spawn_local(async move {
            let result = run_fetch(&rpc, request, id).await;
            if !mounted.load(Ordering::SeqCst) {
                tracing::debug!("Dropping fetch result after unmount");
                return;
            }
            if let Ok(mut queue) = queue.lock() {
                queue.push(result);
            }
        });
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = (rpc, id);
        if !mounted.0.load(Ordering::SeqCst) {
            return;
        }
        let err = DataFetchError::Transport("no HTTP client on this target".to_string());
        if let Ok(mut queue) = pending.0.lock() {
            queue.push(failed(request, err));
        }
    }
}

/// Result carrying `err` for a request
pub fn failed(request: FetchRequest, err: DataFetchError) -> FetchResult {
    match request {
        FetchRequest::Layout(_) => FetchResult::Layout(Err(err)),
        FetchRequest::Occupancy { code } => FetchResult::Occupancy(code, Err(err)),
        FetchRequest::Products { code } => FetchResult::Products(code, Err(err)),
    }
}

#[cfg(target_arch = "wasm32")]
async fn run_fetch(rpc: &RpcConfig, request: FetchRequest, id: u64) -> FetchResult {
    use stockview_core::decode_layout;
    use stockview_core::product::decode_products;
    use stockview_core::rpc::LocationCodeParams;

    let value = match &request {
        FetchRequest::Layout(params) => call_rpc(&rpc.url(&rpc.layout), id, params).await,
        FetchRequest::Occupancy { code } => {
            let params = LocationCodeParams { loc_code: code.clone() };
            call_rpc(&rpc.url(&rpc.quantity), id, params).await
        }
        FetchRequest::Products { code } => {
            let params = LocationCodeParams { loc_code: code.clone() };
            call_rpc(&rpc.url(&rpc.product), id, params).await
        }
    };
    let value = match value {
        Ok(value) => value,
        Err(err) => return failed(request, err),
    };

    match request {
        FetchRequest::Layout(_) => FetchResult::Layout(decode_layout(&value)),
        FetchRequest::Occupancy { code } => FetchResult::Occupancy(code, OccupancyState::decode(&value)),
        FetchRequest::Products { code } => FetchResult::Products(code, decode_products(&value)),
    }
}

/// POST a JSON-RPC call and return its `result`
#[cfg(target_arch = "wasm32")]
async fn call_rpc<P: serde::Serialize>(url: &str, id: u64, params: P) -> Result<serde_json::Value, DataFetchError> {
    use stockview_core::rpc::{unwrap_response, RpcRequest};

    let body = serde_json::to_string(&RpcRequest::call(id, params))?;
    let response = gloo_net::http::Request::post(url)
        .header("Content-Type", "application/json")
        .body(body)
        .map_err(|e| DataFetchError::Transport(e.to_string()))?
        .send()
        .await
        .map_err(|e| DataFetchError::Transport(e.to_string()))?;

    if !response.ok() {
        return Err(DataFetchError::Http {
            status: response.status(),
            text: response.status_text(),
        });
    }
    let text = response
        .text()
        .await
        .map_err(|e| DataFetchError::Transport(e.to_string()))?;
    unwrap_response(&text)
}

#[cfg(target_arch = "wasm32")]
async fn fetch_text(url: &str) -> Result<String, DataFetchError> {
    let response = gloo_net::http::Request::get(url)
        .send()
        .await
        .map_err(|e| DataFetchError::Transport(e.to_string()))?;
    if !response.ok() {
        return Err(DataFetchError::Http {
            status: response.status(),
            text: response.status_text(),
        });
    }
    response
        .text()
        .await
        .map_err(|e| DataFetchError::Transport(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockview_core::rpc::LayoutParams;

    #[test]
    fn test_failed_result_keeps_code() {
        let err = DataFetchError::Transport("offline".to_string());
        match failed(FetchRequest::Occupancy { code: "A1".to_string() }, err.clone()) {
            FetchResult::Occupancy(code, Err(e)) => {
                assert_eq!(code, "A1");
                assert_eq!(e, err);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            failed(FetchRequest::Layout(LayoutParams::new(None, None)), err),
            FetchResult::Layout(Err(_))
        ));
    }

    #[test]
    fn test_request_ids_increase() {
        let mut counter = RequestCounter::default();
        assert_eq!(counter.next(), 1);
        assert_eq!(counter.next(), 2);
    }

    #[test]
    fn test_results_are_dropped_after_unmount() {
        let pending = PendingResults::default();
        let mounted = Mounted::default();
        let rpc = RpcConfig::default();

        spawn_fetch(&rpc, FetchRequest::Products { code: "A1".to_string() }, 1, &pending, &mounted);
        assert_eq!(pending.0.lock().unwrap().len(), 1);

        mounted.0.store(false, Ordering::SeqCst);
        spawn_fetch(&rpc, FetchRequest::Products { code: "A1".to_string() }, 2, &pending, &mounted);
        assert_eq!(pending.0.lock().unwrap().len(), 1);
    }
}
