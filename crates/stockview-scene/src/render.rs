//! Render mirror: keeps Bevy entities in step with the scene graph
//!
//! Lights, floor and camera are spawned once. Every frame the pending scene
//! changes are applied, the camera is synced to the scene's viewport and
//! pointer input is routed to the controller.

use std::collections::HashMap;

use bevy::prelude::*;
use bevy::window::WindowResized;
use stockview_core::Rgb;

use crate::camera::MainCamera;
use crate::controller::{FetchRequest, InteractionController, Phase};
use crate::geometry::{box_mesh, outline_mesh};
use crate::labels::{label_bundle, LabelFont};
use crate::picking::{DoubleClickDetector, ViewportRect};
use crate::scene::{MeshId, NodeVisual, SceneChange};
use crate::types::{DoubleClickState, HoveredBin, UiLayout};

/// Links an entity to its scene graph node
#[derive(Component)]
pub struct SceneNode(pub MeshId);

/// Marker for the floor plane
#[derive(Component)]
pub struct Floor;

/// Scene node → spawned entity
#[derive(Debug, Default, Resource)]
pub struct NodeEntities(pub HashMap<MeshId, Entity>);

/// Ask the viewer to tear down and stop rendering
#[derive(Debug, Clone, Message)]
pub struct UnmountRequested;

pub struct RenderPlugin;

impl Plugin for RenderPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<NodeEntities>()
            .init_resource::<HoveredBin>()
            .init_resource::<DoubleClickState>()
            .init_resource::<UiLayout>()
            .add_message::<FetchRequest>()
            .add_message::<UnmountRequested>()
            .add_systems(Startup, setup_scene)
            .add_systems(
                Update,
                (
                    apply_viewer_config,
                    handle_unmount,
                    handle_resize,
                    handle_pointer,
                    sync_scene_graph,
                    update_floor,
                    render_frame,
                )
                    .chain(),
            );
    }
}

fn color_of(rgb: Rgb, alpha: f32) -> Color {
    let [r, g, b] = rgb.0;
    Color::srgba(r, g, b, alpha)
}

fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut controller: ResMut<InteractionController>,
    windows: Query<&Window>,
) {
    let palette = controller.config().palette.clone();
    commands.insert_resource(ClearColor(color_of(palette.background, 1.0)));

    let camera = controller.scene().camera;
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: camera.fov_y,
            near: camera.near,
            far: camera.far,
            ..default()
        }),
        Transform::from_translation(camera.position).looking_at(camera.target, Vec3::Y),
        MainCamera,
    ));

    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 400.0,
        ..default()
    });

    commands.spawn((
        DirectionalLight {
            illuminance: 6000.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(1.0, 3.0, 2.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    // Unit plane, scaled to the layout once bins are framed
    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(1.0, 1.0))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: color_of(palette.floor, 1.0),
            perceptual_roughness: 1.0,
            ..default()
        })),
        Transform::from_scale(Vec3::new(800.0, 1.0, 800.0)),
        Floor,
    ));

    if let Ok(window) = windows.single() {
        controller.resize(window.width(), window.height());
    }
}

/// Apply palette and gesture settings once mounted, when the configuration is final
fn apply_viewer_config(
    controller: Res<InteractionController>,
    mut applied: Local<bool>,
    mut clear_color: ResMut<ClearColor>,
    mut detector: ResMut<DoubleClickState>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    floor: Query<&MeshMaterial3d<StandardMaterial>, With<Floor>>,
) {
    if *applied || controller.phase() == Phase::Uninitialized {
        return;
    }
    *applied = true;

    let config = controller.config();
    clear_color.0 = color_of(config.palette.background, 1.0);
    *detector = DoubleClickState(DoubleClickDetector::new(&config.interaction));
    for handle in &floor {
        if let Some(material) = materials.get_mut(handle.0.id()) {
            material.base_color = color_of(config.palette.floor, 1.0);
        }
    }
}

fn handle_unmount(
    mut unmount: MessageReader<UnmountRequested>,
    mut controller: ResMut<InteractionController>,
    mut exit: MessageWriter<AppExit>,
) {
    if unmount.read().count() == 0 {
        return;
    }
    if controller.teardown() {
        exit.write(AppExit::Success);
    }
}

fn handle_resize(
    mut resized: MessageReader<WindowResized>,
    mut controller: ResMut<InteractionController>,
    mut ui_layout: ResMut<UiLayout>,
) {
    if let Some(event) = resized.read().last() {
        controller.resize(event.width, event.height);
        ui_layout.update_from_window(event.width, event.height);
    }
}

/// Hover readout and double-click inspection
fn handle_pointer(
    mut controller: ResMut<InteractionController>,
    mut detector: ResMut<DoubleClickState>,
    mut hovered: ResMut<HoveredBin>,
    windows: Query<&Window>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    touch_input: Res<Touches>,
    time: Res<Time>,
    mut contexts: bevy_egui::EguiContexts,
    mut requests: MessageWriter<FetchRequest>,
) {
    if !controller.accepts_input() {
        hovered.0 = None;
        return;
    }
    let Ok(window) = windows.single() else {
        return;
    };
    let egui_wants_pointer = match contexts.ctx_mut() {
        Ok(ctx) => ctx.wants_pointer_input(),
        Err(_) => false,
    };
    if egui_wants_pointer {
        return;
    }

    let rect = ViewportRect::from_size(window.width(), window.height());
    let cursor = window.cursor_position();
    hovered.0 = cursor
        .and_then(|pos| controller.hover(pos, &rect))
        .map(|meta| meta.code.clone());

    let press = if mouse_button.just_pressed(MouseButton::Left) {
        cursor
    } else {
        touch_input.iter_just_pressed().next().map(|touch| touch.position())
    };
    let Some(position) = press else {
        return;
    };
    if detector.0.press(time.elapsed_secs_f64(), position) {
        for request in controller.double_click(position, &rect) {
            requests.write(request);
        }
    }
}

/// Spawn entities for added nodes and release the assets of removed ones
fn sync_scene_graph(
    mut commands: Commands,
    mut controller: ResMut<InteractionController>,
    mut entities: ResMut<NodeEntities>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    font: Res<LabelFont>,
    handles: Query<(Option<&Mesh3d>, Option<&MeshMaterial3d<StandardMaterial>>)>,
) {
    let changes = controller.scene_mut().drain_changes();
    if changes.is_empty() {
        return;
    }
    let scene = controller.scene();

    for change in changes {
        match change {
            SceneChange::Added(id) => {
                let Some(visual) = scene.node(id) else {
                    continue;
                };
                let entity = match visual {
                    NodeVisual::Solid { geometry, appearance } => commands
                        .spawn((
                            Mesh3d(meshes.add(box_mesh(geometry))),
                            MeshMaterial3d(materials.add(StandardMaterial {
                                base_color: color_of(appearance.color, appearance.opacity),
                                alpha_mode: AlphaMode::Blend,
                                perceptual_roughness: 0.9,
                                ..default()
                            })),
                            Transform::from_translation(geometry.center),
                            SceneNode(id),
                        ))
                        .id(),
                    NodeVisual::Outline { geometry, color } => commands
                        .spawn((
                            Mesh3d(meshes.add(outline_mesh(geometry))),
                            MeshMaterial3d(materials.add(StandardMaterial {
                                base_color: color_of(*color, 1.0),
                                unlit: true,
                                ..default()
                            })),
                            Transform::from_translation(geometry.center),
                            SceneNode(id),
                        ))
                        .id(),
                    NodeVisual::Label(placement) => {
                        if !font.usable() {
                            continue;
                        }
                        commands
                            .spawn((label_bundle(id, placement.clone(), &font), SceneNode(id)))
                            .id()
                    }
                };
                entities.0.insert(id, entity);
            }
            SceneChange::Released(id) => {
                let Some(entity) = entities.0.remove(&id) else {
                    continue;
                };
                if let Ok((mesh, material)) = handles.get(entity) {
                    if let Some(mesh) = mesh {
                        meshes.remove(mesh.0.id());
                    }
                    if let Some(material) = material {
                        materials.remove(material.0.id());
                    }
                }
                commands.entity(entity).despawn();
            }
        }
    }
    tracing::debug!(entities = entities.0.len(), "Scene mirror synced");
}

/// Size the floor to the framed layout
fn update_floor(
    controller: Res<InteractionController>,
    mut seen: Local<u64>,
    mut floor: Query<&mut Transform, With<Floor>>,
) {
    let Some((generation, _)) = controller.framed_pose() else {
        return;
    };
    if generation == *seen {
        return;
    }
    *seen = generation;
    let Some(bounds) = controller.scene().bounds() else {
        return;
    };
    let size = bounds.size();
    let span = (size.x.max(size.z) * 4.0).max(1.0);
    let center = bounds.center();
    for mut transform in &mut floor {
        // Slightly below the lowest bin so bases don't z-fight with the floor
        transform.translation = Vec3::new(center.x, bounds.min.y - span * 1e-4, center.z);
        transform.scale = Vec3::new(span, 1.0, span);
    }
}

/// Present the scene's camera
fn render_frame(
    mut controller: ResMut<InteractionController>,
    mut camera: Query<(&mut Transform, &mut Projection), With<MainCamera>>,
) {
    if !controller.is_rendering() {
        return;
    }
    let snapshot = controller.scene_mut().render_frame();
    let Ok((mut transform, mut projection)) = camera.single_mut() else {
        return;
    };
    let view = snapshot.camera;
    *transform = Transform::from_translation(view.position).looking_at(view.target, Vec3::Y);
    if let Projection::Perspective(perspective) = projection.as_mut() {
        perspective.fov = view.fov_y;
        perspective.near = view.near;
        perspective.far = view.far;
    }
}
