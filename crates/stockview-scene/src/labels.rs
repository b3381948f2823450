//! Bin code labels drawn as screen-space text
//!
//! Labels follow their anchor every frame. If the label font fails to load the
//! labels are dropped; boxes and outlines are unaffected.

use bevy::asset::LoadState;
use bevy::prelude::*;
use thiserror::Error;

use crate::camera::ViewportContext;
use crate::controller::{InteractionController, Phase};
use crate::geometry::LabelPlacement;
use crate::scene::MeshId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssetLoadError {
    #[error("label font {path} failed to load")]
    Font { path: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontStatus {
    #[default]
    Disabled,
    Loading,
    Ready,
    Failed,
}

/// Font shared by every label
#[derive(Debug, Default, Resource)]
pub struct LabelFont {
    pub handle: Option<Handle<Font>>,
    pub path: String,
    pub status: FontStatus,
    requested: bool,
}

impl LabelFont {
    /// Bevy's embedded font, usable immediately
    pub fn builtin() -> Self {
        Self {
            handle: Some(Handle::default()),
            path: String::new(),
            status: FontStatus::Ready,
            requested: true,
        }
    }

    /// Labels may be spawned while the font is loading or ready
    pub fn usable(&self) -> bool {
        matches!(self.status, FontStatus::Loading | FontStatus::Ready)
    }
}

/// A label's UI node
#[derive(Component)]
pub struct BinLabel {
    pub node: MeshId,
    pub placement: LabelPlacement,
}

pub struct LabelPlugin;

impl Plugin for LabelPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LabelFont>()
            .add_systems(Update, (load_label_font, track_font_state, position_labels).chain());
    }
}

/// Start loading the font once mounted, when the configuration is final
fn load_label_font(
    controller: Res<InteractionController>,
    asset_server: Res<AssetServer>,
    mut font: ResMut<LabelFont>,
) {
    if font.requested || controller.phase() == Phase::Uninitialized {
        return;
    }
    font.requested = true;
    let geometry = &controller.config().geometry;
    if !geometry.show_labels {
        return;
    }
    if geometry.label_font.is_empty() {
        *font = LabelFont::builtin();
        return;
    }
    font.path = geometry.label_font.clone();
    font.handle = Some(asset_server.load(font.path.clone()));
    font.status = FontStatus::Loading;
}

fn track_font_state(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut font: ResMut<LabelFont>,
    labels: Query<Entity, With<BinLabel>>,
) {
    if font.status != FontStatus::Loading {
        return;
    }
    let Some(handle) = &font.handle else {
        return;
    };
    match asset_server.get_load_state(handle.id()) {
        Some(LoadState::Loaded) => {
            tracing::debug!(path = %font.path, "Label font loaded");
            font.status = FontStatus::Ready;
        }
        Some(LoadState::Failed(_)) => {
            let err = AssetLoadError::Font { path: font.path.clone() };
            tracing::warn!(error = %err, "Labels disabled");
            font.status = FontStatus::Failed;
            for entity in &labels {
                commands.entity(entity).despawn();
            }
        }
        _ => {}
    }
}

/// UI components for a new label. The node starts hidden until positioned.
pub fn label_bundle(node: MeshId, placement: LabelPlacement, font: &LabelFont) -> impl Bundle {
    (
        Text::new(placement.text.clone()),
        TextFont {
            font: font.handle.clone().unwrap_or_default(),
            font_size: 14.0,
            ..default()
        },
        TextColor(Color::srgb(0.15, 0.15, 0.15)),
        Node {
            position_type: PositionType::Absolute,
            ..default()
        },
        Visibility::Hidden,
        BinLabel { node, placement },
    )
}

/// Screen position (logical px, top-left origin) and pixel height of a label,
/// or `None` when it is behind the camera or faces away from it
pub fn label_screen_rect(camera: &ViewportContext, placement: &LabelPlacement) -> Option<(Vec2, f32)> {
    if placement.facing.dot(camera.position - placement.position) <= 0.0 {
        return None;
    }
    let anchor = camera.project(placement.position)?;
    let top = camera.project(placement.position + Vec3::Y * placement.size)?;

    let to_screen = |ndc: Vec2| {
        Vec2::new(
            (ndc.x + 1.0) * 0.5 * camera.width,
            (1.0 - ndc.y) * 0.5 * camera.height,
        )
    };
    let anchor_px = to_screen(anchor);
    let height_px = (anchor_px - to_screen(top)).length();
    Some((anchor_px, height_px))
}

fn position_labels(
    controller: Res<InteractionController>,
    font: Res<LabelFont>,
    mut labels: Query<(&BinLabel, &mut Node, &mut TextFont, &mut Visibility)>,
) {
    let camera = &controller.scene().camera;
    let visible = font.status == FontStatus::Ready && controller.is_rendering();

    for (label, mut node, mut text_font, mut visibility) in &mut labels {
        let placed = visible.then(|| label_screen_rect(camera, &label.placement)).flatten();
        let Some((anchor, height)) = placed.filter(|(_, h)| *h >= 6.0) else {
            *visibility = Visibility::Hidden;
            continue;
        };
        let font_size = height.clamp(6.0, 48.0);
        // Center on the anchor; glyphs average about 0.6 em wide
        let half_width = label.placement.text.chars().count() as f32 * font_size * 0.3;
        node.left = Val::Px(anchor.x - half_width);
        node.top = Val::Px(anchor.y - font_size * 0.5);
        text_font.font_size = font_size;
        *visibility = Visibility::Inherited;
    }
}
