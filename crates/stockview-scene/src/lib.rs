//! Stockview Scene - 3D warehouse bins, camera framing and picking
//!
//! The domain logic (geometry builder, scene graph, framer, picking and the
//! interaction controller) is plain Rust over `bevy::math` so it runs in
//! tests without a window. The plugins mirror it into the Bevy world.

pub mod camera;
pub mod controller;
pub mod geometry;
pub mod labels;
pub mod picking;
pub mod render;
pub mod scene;
pub mod types;
pub mod ui;

use bevy::prelude::*;
use stockview_core::ViewerConfig;

/// Plugin that sets up the viewer: controller, render mirror, camera, labels and UI
pub struct StockviewScenePlugin {
    pub config: ViewerConfig,
}

impl Plugin for StockviewScenePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(controller::InteractionController::new(self.config.clone()))
            .insert_resource(camera::CameraSettings::from_config(&self.config.camera))
            .add_plugins(render::RenderPlugin)
            .add_plugins(camera::CameraPlugin)
            .add_plugins(labels::LabelPlugin)
            .add_plugins(ui::UiPlugin);
    }
}

// Re-export commonly used types
pub use camera::{fit, CameraPose, CameraSettings, ViewportContext};
pub use controller::{FetchRequest, InspectionDialog, InteractionController, Phase};
pub use geometry::{BinBuilder, RenderedBin};
pub use picking::{pick, ViewportRect};
pub use render::UnmountRequested;
pub use scene::{MeshId, SceneGraph};
pub use types::*;
