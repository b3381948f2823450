//! Interaction controller: the viewer's lifecycle state machine
//!
//! `Uninitialized → Loading → Ready ⇄ Inspecting → TornDown`
//!
//! The controller owns the [`SceneGraph`] and is the only place that mutates
//! it outside the render mirror. Fetches are described as [`FetchRequest`]s
//! and their results are fed back in; anything arriving in the wrong phase,
//! or after teardown, is dropped.

use std::collections::{HashMap, HashSet};

use bevy::prelude::*;
use stockview_core::rpc::LayoutParams;
use stockview_core::{
    DataFetchError, Layout, OccupancyState, ProductDescriptor, SessionContext, ViewerConfig,
};
use tracing::{debug, info, warn};

use crate::camera::{fit, CameraPose, ViewportContext};
use crate::geometry::BinBuilder;
use crate::picking::{pick, ViewportRect};
use crate::scene::{BinMeta, MeshId, SceneGraph};

/// Lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Loading,
    Ready,
    Inspecting,
    TornDown,
}

/// Data the controller needs fetched
#[derive(Debug, Clone, PartialEq, Message)]
pub enum FetchRequest {
    Layout(LayoutParams),
    Occupancy { code: String },
    Products { code: String },
}

/// Modal shown for an inspected bin
#[derive(Debug, Clone, PartialEq)]
pub struct InspectionDialog {
    pub code: String,
    /// `None` while the product fetch is in flight
    pub products: Option<Vec<ProductDescriptor>>,
    pub error: Option<String>,
}

impl InspectionDialog {
    pub fn title(&self) -> &str {
        &self.code
    }

    pub fn is_loading(&self) -> bool {
        self.products.is_none() && self.error.is_none()
    }

    /// Display strings, one per product
    pub fn lines(&self) -> Vec<String> {
        self.products
            .iter()
            .flatten()
            .map(ProductDescriptor::display)
            .collect()
    }
}

/// Layout and occupancy collected while loading
#[derive(Debug, Default)]
struct PendingBuild {
    layout: Option<Layout>,
    occupancy: HashMap<String, Result<OccupancyState, DataFetchError>>,
    awaiting: HashSet<String>,
}

#[derive(Debug, Resource)]
pub struct InteractionController {
    phase: Phase,
    config: ViewerConfig,
    session: SessionContext,
    scene: SceneGraph,
    pending: Option<PendingBuild>,
    selection: Option<MeshId>,
    dialog: Option<InspectionDialog>,
    framed: Option<CameraPose>,
    fit_generation: u64,
}

impl InteractionController {
    pub fn new(config: ViewerConfig) -> Self {
        let scene = SceneGraph::new(ViewportContext::with_fov(config.camera.fov_degrees));
        Self {
            phase: Phase::Uninitialized,
            config,
            session: SessionContext::default(),
            scene,
            pending: None,
            selection: None,
            dialog: None,
            framed: None,
            fit_generation: 0,
        }
    }

    /// Replace the configuration. Only possible before mounting.
    pub fn reconfigure(&mut self, config: ViewerConfig) -> bool {
        if self.phase != Phase::Uninitialized {
            warn!(phase = ?self.phase, "Ignoring configuration change after mount");
            return false;
        }
        self.scene.camera.fov_y = config.camera.fov_degrees.to_radians();
        self.config = config;
        true
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    pub fn selection(&self) -> Option<MeshId> {
        self.selection
    }

    pub fn dialog(&self) -> Option<&InspectionDialog> {
        self.dialog.as_ref()
    }

    /// Last framed pose and a counter that changes every time the camera is refit
    pub fn framed_pose(&self) -> Option<(u64, CameraPose)> {
        self.framed.map(|pose| (self.fit_generation, pose))
    }

    /// Pointer and resize handling is attached only once bins are built
    pub fn accepts_input(&self) -> bool {
        matches!(self.phase, Phase::Ready | Phase::Inspecting)
    }

    /// Frames are drawn from Ready onward until teardown
    pub fn is_rendering(&self) -> bool {
        self.accepts_input()
    }

    /// Start loading for a session once a render target exists
    pub fn mount(&mut self, session: SessionContext) -> Vec<FetchRequest> {
        if self.phase != Phase::Uninitialized {
            warn!(phase = ?self.phase, "Mount ignored");
            return Vec::new();
        }
        let params = LayoutParams::new(session.company_id.as_deref(), session.location_id.as_ref());
        info!(
            company = ?session.company_id,
            location = ?session.location_id,
            "Mounting stock viewer"
        );
        self.session = session;
        self.pending = Some(PendingBuild::default());
        self.phase = Phase::Loading;
        vec![FetchRequest::Layout(params)]
    }

    /// Apply the layout fetch. Failures degrade to an empty layout.
    pub fn layout_loaded(&mut self, result: Result<Layout, DataFetchError>) -> Vec<FetchRequest> {
        if self.phase != Phase::Loading {
            debug!(phase = ?self.phase, "Dropping late layout result");
            return Vec::new();
        }
        let Some(pending) = self.pending.as_mut() else {
            return Vec::new();
        };
        if pending.layout.is_some() {
            debug!("Layout already applied");
            return Vec::new();
        }

        let layout = result.unwrap_or_else(|err| {
            warn!(error = %err, "Layout fetch failed, showing an empty warehouse");
            Layout::default()
        });

        let active = self.session.location_id.as_ref();
        let requests: Vec<FetchRequest> = layout
            .records
            .iter()
            .filter(|record| record.is_owned_by(active))
            .map(|record| FetchRequest::Occupancy {
                code: record.code.clone(),
            })
            .collect();
        pending.awaiting = requests
            .iter()
            .filter_map(|request| match request {
                FetchRequest::Occupancy { code } => Some(code.clone()),
                _ => None,
            })
            .collect();
        info!(
            bins = layout.records.len(),
            owned = pending.awaiting.len(),
            "Layout loaded"
        );
        pending.layout = Some(layout);

        if pending.awaiting.is_empty() {
            self.finish_loading();
        }
        requests
    }

    /// Apply one occupancy fetch. The scene is built once every owned bin has answered.
    pub fn occupancy_loaded(&mut self, code: &str, result: Result<OccupancyState, DataFetchError>) {
        if self.phase != Phase::Loading {
            debug!(code = %code, phase = ?self.phase, "Dropping late occupancy result");
            return;
        }
        let Some(pending) = self.pending.as_mut() else {
            return;
        };
        if !pending.awaiting.remove(code) {
            debug!(code = %code, "Unexpected occupancy result");
            return;
        }
        if let Err(err) = &result {
            warn!(code = %code, error = %err, "Occupancy fetch failed");
        }
        pending.occupancy.insert(code.to_string(), result);

        if pending.awaiting.is_empty() {
            self.finish_loading();
        }
    }

    fn finish_loading(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let layout = pending.layout.unwrap_or_default();

        let builder = BinBuilder::new(&self.config, self.session.location_id.as_ref());
        let bins = if layout.is_empty() {
            info!("No usable locations, showing placeholder bin");
            vec![builder.fallback()]
        } else {
            layout
                .records
                .iter()
                .map(|record| builder.build(record, pending.occupancy.get(&record.code)))
                .collect()
        };
        for bin in bins {
            self.scene.add_bin(bin);
        }

        match fit(self.scene.bounds(), self.scene.camera.fov_y, self.config.camera.padding) {
            Some(pose) => {
                self.scene.camera.apply_pose(&pose);
                self.framed = Some(pose);
                self.fit_generation += 1;
            }
            None => debug!("Nothing to frame"),
        }

        self.phase = Phase::Ready;
        info!(bins = self.scene.pickable().len(), "Stock viewer ready");
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        if self.phase == Phase::TornDown {
            return;
        }
        self.scene.resize(width, height);
    }

    /// Bin under the pointer, with no state change
    pub fn hover(&self, pointer: Vec2, rect: &ViewportRect) -> Option<&BinMeta> {
        if !self.accepts_input() {
            return None;
        }
        let hit = pick(pointer, rect, &self.scene.camera, self.scene.pickable())?;
        self.scene.meta(hit.id)
    }

    /// Inspect the bin under the pointer if it belongs to the active location
    pub fn double_click(&mut self, pointer: Vec2, rect: &ViewportRect) -> Vec<FetchRequest> {
        if self.phase != Phase::Ready {
            return Vec::new();
        }
        let Some(hit) = pick(pointer, rect, &self.scene.camera, self.scene.pickable()) else {
            return Vec::new();
        };
        let Some(meta) = self.scene.meta(hit.id) else {
            return Vec::new();
        };
        let active = self.session.location_id.as_ref();
        if active.is_none() || meta.owner.as_ref() != active {
            debug!(code = %meta.code, "Bin belongs to another location");
            return Vec::new();
        }

        let code = meta.code.clone();
        info!(code = %code, "Inspecting bin");
        self.selection = Some(hit.id);
        self.dialog = Some(InspectionDialog {
            code: code.clone(),
            products: None,
            error: None,
        });
        self.phase = Phase::Inspecting;
        vec![FetchRequest::Products { code }]
    }

    /// Fill the open dialog. Failures show an empty list.
    pub fn products_loaded(&mut self, code: &str, result: Result<Vec<ProductDescriptor>, DataFetchError>) {
        if self.phase != Phase::Inspecting {
            debug!(code = %code, phase = ?self.phase, "Dropping late product result");
            return;
        }
        let Some(dialog) = self.dialog.as_mut().filter(|d| d.code == code) else {
            debug!(code = %code, "Product result for a closed dialog");
            return;
        };
        match result {
            Ok(products) => {
                debug!(code = %code, count = products.len(), "Products loaded");
                dialog.products = Some(products);
            }
            Err(err) => {
                warn!(code = %code, error = %err, "Product fetch failed");
                dialog.products = Some(Vec::new());
                dialog.error = Some(err.to_string());
            }
        }
    }

    /// Close the dialog and drop the selection
    pub fn dismiss_dialog(&mut self) {
        if self.phase != Phase::Inspecting {
            return;
        }
        self.dialog = None;
        self.selection = None;
        self.phase = Phase::Ready;
    }

    /// Release the scene and stop accepting results. Returns false if already torn down.
    pub fn teardown(&mut self) -> bool {
        if self.phase == Phase::TornDown {
            return false;
        }
        let released = self.scene.clear();
        self.pending = None;
        self.dialog = None;
        self.selection = None;
        self.framed = None;
        self.phase = Phase::TornDown;
        info!(released, "Stock viewer torn down");
        true
    }
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(ViewerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stockview_core::{decode_layout, LocationId, OccupancyTier};

    use crate::geometry::FALLBACK_CODE;
    use crate::scene::SceneChange;

    fn session(location: &str) -> SessionContext {
        SessionContext {
            company_id: Some("1".to_string()),
            location_id: Some(LocationId::new(location)),
        }
    }

    fn rect() -> ViewportRect {
        ViewportRect::from_size(800.0, 600.0)
    }

    fn screen_of(controller: &InteractionController, world: Vec3) -> Vec2 {
        let ndc = controller.scene().camera.project(world).unwrap();
        Vec2::new((ndc.x + 1.0) * 400.0, (1.0 - ndc.y) * 300.0)
    }

    fn mounted(location: &str) -> InteractionController {
        let mut controller = InteractionController::default();
        controller.resize(800.0, 600.0);
        let requests = controller.mount(session(location));
        assert_eq!(
            requests,
            vec![FetchRequest::Layout(LayoutParams {
                company_id: Some("1".to_string()),
                loc_id: Some(location.to_string()),
            })]
        );
        assert_eq!(controller.phase(), Phase::Loading);
        controller
    }

    #[test]
    fn test_single_bin_scenario() {
        let mut controller = mounted("1");
        let layout = decode_layout(&json!({"A1": [0, 0, 0, 100, 100, 50, 1]})).unwrap();

        let requests = controller.layout_loaded(Ok(layout));
        assert_eq!(requests, vec![FetchRequest::Occupancy { code: "A1".to_string() }]);
        assert_eq!(controller.phase(), Phase::Loading);

        let state = OccupancyState::decode(&json!([1, 75])).unwrap();
        controller.occupancy_loaded("A1", Ok(state));
        assert_eq!(controller.phase(), Phase::Ready);

        let scene = controller.scene();
        let (id, geometry) = *scene.pickable().iter().next().unwrap();
        let meta = scene.meta(id).unwrap();
        assert_eq!(meta.code, "A1");
        assert_eq!(meta.appearance.tier, OccupancyTier::AlmostFull);
        assert_eq!(meta.appearance.opacity, controller.config().palette.opacity.medium);
        assert_eq!(meta.appearance.color, controller.config().palette.almost_full);

        let pointer = screen_of(&controller, geometry.center);
        let requests = controller.double_click(pointer, &rect());
        assert_eq!(requests, vec![FetchRequest::Products { code: "A1".to_string() }]);
        assert_eq!(controller.phase(), Phase::Inspecting);
        assert_eq!(controller.selection(), Some(id));
        assert!(controller.dialog().unwrap().is_loading());

        controller.products_loaded(
            "A1",
            Ok(vec![ProductDescriptor::Text("[DESK] Desk".to_string())]),
        );
        let dialog = controller.dialog().unwrap();
        assert_eq!(dialog.title(), "A1");
        assert_eq!(dialog.lines(), vec!["[DESK] Desk".to_string()]);

        controller.dismiss_dialog();
        assert_eq!(controller.phase(), Phase::Ready);
        assert!(controller.selection().is_none());
        assert!(controller.dialog().is_none());
    }

    #[test]
    fn test_empty_layout_shows_fallback() {
        let mut controller = mounted("1");
        let requests = controller.layout_loaded(decode_layout(&json!({})));
        assert!(requests.is_empty());
        assert_eq!(controller.phase(), Phase::Ready);

        let scene = controller.scene();
        assert_eq!(scene.pickable().len(), 1);
        let (id, geometry) = *scene.pickable().iter().next().unwrap();
        assert_eq!(scene.meta(id).unwrap().code, FALLBACK_CODE);
        assert!(controller.framed_pose().is_some());

        let pointer = screen_of(&controller, geometry.center);
        assert!(controller.hover(pointer, &rect()).is_some());
        assert!(controller.double_click(pointer, &rect()).is_empty());
        assert_eq!(controller.phase(), Phase::Ready);
    }

    #[test]
    fn test_failed_layout_is_empty_layout() {
        let mut controller = mounted("1");
        controller.layout_loaded(Err(DataFetchError::Http {
            status: 500,
            text: "Internal Server Error".to_string(),
        }));
        assert_eq!(controller.phase(), Phase::Ready);
        assert_eq!(controller.scene().pickable().len(), 1);
    }

    #[test]
    fn test_teardown_before_layout() {
        let mut controller = mounted("1");
        assert!(controller.teardown());
        assert!(!controller.teardown());

        let requests = controller.layout_loaded(decode_layout(&json!({"A1": [0, 0, 0, 100, 100, 50, 1]})));
        assert!(requests.is_empty());
        controller.occupancy_loaded("A1", Ok(OccupancyState { has_quantity: true, fill_percent: 10.0 }));

        assert_eq!(controller.phase(), Phase::TornDown);
        assert_eq!(controller.scene().node_count(), 0);
        assert!(controller.scene().pickable().is_empty());
    }

    #[test]
    fn test_teardown_releases_scene() {
        let mut controller = mounted("1");
        controller.layout_loaded(decode_layout(&json!({"B1": [0, 0, 0, 100, 100, 50, 2]})));
        assert_eq!(controller.phase(), Phase::Ready);
        let added = controller.scene_mut().drain_changes().len();

        controller.teardown();
        let released = controller.scene_mut().drain_changes();
        assert_eq!(released.len(), added);
        assert!(released.iter().all(|c| matches!(c, SceneChange::Released(_))));
        assert!(!controller.accepts_input());
    }

    #[test]
    fn test_other_location_is_inactive_and_not_inspectable() {
        let mut controller = mounted("1");
        let requests = controller.layout_loaded(decode_layout(&json!({
            "A1": [0, 0, 0, 100, 100, 50, 1],
            "B1": [300, 0, 0, 100, 100, 50, 2],
        })));
        assert_eq!(requests, vec![FetchRequest::Occupancy { code: "A1".to_string() }]);

        controller.occupancy_loaded("B1", Ok(OccupancyState { has_quantity: true, fill_percent: 10.0 }));
        assert_eq!(controller.phase(), Phase::Loading);
        controller.occupancy_loaded("A1", Err(DataFetchError::Transport("offline".to_string())));
        assert_eq!(controller.phase(), Phase::Ready);

        let scene = controller.scene();
        let mut tiers = HashMap::new();
        let mut b1_center = Vec3::ZERO;
        for (id, geometry) in scene.pickable().iter() {
            let meta = scene.meta(*id).unwrap();
            tiers.insert(meta.code.clone(), meta.appearance.tier);
            if meta.code == "B1" {
                b1_center = geometry.center;
            }
        }
        assert_eq!(tiers["A1"], OccupancyTier::Unknown);
        assert_eq!(tiers["B1"], OccupancyTier::Inactive);

        let pointer = screen_of(&controller, b1_center);
        assert!(controller.double_click(pointer, &rect()).is_empty());
        assert_eq!(controller.phase(), Phase::Ready);
    }

    #[test]
    fn test_product_failure_opens_empty_dialog() {
        let mut controller = mounted("1");
        controller.layout_loaded(decode_layout(&json!({"A1": [0, 0, 0, 100, 100, 50, 1]})));
        controller.occupancy_loaded("A1", Ok(OccupancyState { has_quantity: false, fill_percent: 0.0 }));

        let center = controller.scene().pickable().iter().next().unwrap().1.center;
        let pointer = screen_of(&controller, center);
        controller.double_click(pointer, &rect());
        controller.products_loaded("A2", Ok(Vec::new()));
        assert!(controller.dialog().unwrap().is_loading());

        controller.products_loaded("A1", Err(DataFetchError::Malformed("bad".to_string())));
        let dialog = controller.dialog().unwrap();
        assert!(dialog.lines().is_empty());
        assert!(dialog.error.is_some());
        assert!(!dialog.is_loading());
    }

    #[test]
    fn test_mount_twice_and_reconfigure() {
        let mut controller = InteractionController::default();
        let mut config = ViewerConfig::default();
        config.camera.fov_degrees = 45.0;
        assert!(controller.reconfigure(config));
        assert!((controller.scene().camera.fov_y - 45f32.to_radians()).abs() < 1e-6);

        assert_eq!(controller.mount(session("1")).len(), 1);
        assert!(controller.mount(session("1")).is_empty());
        assert!(!controller.reconfigure(ViewerConfig::default()));
    }
}
