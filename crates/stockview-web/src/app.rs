//! Bevy application setup

use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use bevy_picking::DefaultPickingPlugins;
use stockview_core::ViewerConfig;
use stockview_scene::StockviewScenePlugin;

use crate::network::NetworkPlugin;

/// Run the Bevy application
pub fn run() {
    App::new()
        .add_plugins(DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Stock Locations".to_string(),
                    canvas: Some("#stockview-canvas".to_string()),
                    fit_canvas_to_parent: true,
                    prevent_default_event_handling: false,
                    ..default()
                }),
                ..default()
            })
            .set(AssetPlugin {
                // Fonts are served next to the wasm bundle
                file_path: "".to_string(),
                // Don't look for .meta files - server doesn't have them
                meta_check: bevy::asset::AssetMetaCheck::Never,
                ..default()
            })
        )
        // DefaultPickingPlugins must be added BEFORE EguiPlugin so it can detect PickingPlugin
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(EguiPlugin::default())
        // Defaults until a `?config=` override arrives; the controller is reconfigured before mount
        .add_plugins(StockviewScenePlugin {
            config: ViewerConfig::default(),
        })
        .add_plugins(NetworkPlugin)
        .run();
}
