//! Camera framing and orbit navigation
//!
//! The scene is Y-up. Framing places the camera on the (+1, +1, +1) diagonal
//! of the bins' bounding box at a distance that keeps the largest extent in
//! view; orbit controls then move it around that target.

use bevy::input::mouse::{MouseMotion, MouseWheel};
use bevy::prelude::*;
use stockview_core::config::CameraConfig;

use crate::controller::InteractionController;
use crate::scene::Bounds;

/// Where the camera sits and what it looks at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub target: Vec3,
    pub near: f32,
    pub far: f32,
}

/// Perspective camera parameters the scene is drawn and picked with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportContext {
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
    /// Viewport size in logical pixels
    pub width: f32,
    pub height: f32,
}

impl Default for ViewportContext {
    fn default() -> Self {
        Self::with_fov(60.0)
    }
}

impl ViewportContext {
    pub fn with_fov(fov_degrees: f32) -> Self {
        Self {
            fov_y: fov_degrees.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 10_000.0,
            position: Vec3::splat(300.0),
            target: Vec3::ZERO,
            width: 1280.0,
            height: 720.0,
        }
    }

    /// Update size and aspect ratio; a zero-sized viewport is ignored
    pub fn set_viewport_size(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.width = width;
            self.height = height;
            self.aspect = width / height;
        }
    }

    pub fn apply_pose(&mut self, pose: &CameraPose) {
        self.position = pose.position;
        self.target = pose.target;
        self.near = pose.near;
        self.far = pose.far;
    }

    /// Forward, right and up unit vectors of the view
    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let forward = (self.target - self.position).try_normalize().unwrap_or(Vec3::NEG_Z);
        let right = forward.cross(Vec3::Y).try_normalize().unwrap_or(Vec3::X);
        let up = right.cross(forward);
        (forward, right, up)
    }

    /// Ray from the eye through a point in normalized device coordinates
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Option<Ray3d> {
        let (forward, right, up) = self.basis();
        let half = (self.fov_y * 0.5).tan();
        let direction = forward + right * (ndc.x * half * self.aspect) + up * (ndc.y * half);
        Dir3::new(direction)
            .ok()
            .map(|direction| Ray3d::new(self.position, direction))
    }

    /// Project a world point to normalized device coordinates.
    /// `None` when the point is behind the near plane.
    pub fn project(&self, world: Vec3) -> Option<Vec2> {
        let (forward, right, up) = self.basis();
        let relative = world - self.position;
        let depth = relative.dot(forward);
        if depth <= self.near {
            return None;
        }
        let half = (self.fov_y * 0.5).tan();
        Some(Vec2::new(
            relative.dot(right) / (depth * half * self.aspect),
            relative.dot(up) / (depth * half),
        ))
    }
}

/// Frame a bounding box. Returns `None` for an empty or degenerate group.
pub fn fit(bounds: Option<Bounds>, fov_y: f32, padding: f32) -> Option<CameraPose> {
    let bounds = bounds?;
    let max_extent = bounds.size().max_element();
    if !(max_extent.is_finite() && max_extent > 0.0) {
        return None;
    }
    let half_tan = (fov_y * 0.5).tan();
    if !(half_tan.is_finite() && half_tan > 0.0) {
        return None;
    }

    let distance = padding * max_extent / (2.0 * half_tan);
    let target = bounds.center();
    Some(CameraPose {
        position: target + Vec3::splat(distance),
        target,
        near: distance / 100.0,
        far: distance * 1000.0,
    })
}

/// Orbit controller state
#[derive(Debug, Clone, Resource)]
pub struct CameraSettings {
    pub distance: f32,
    pub target_distance: f32,
    pub azimuth: f32,
    pub elevation: f32,
    pub target: Vec3,
    pub target_focus: Vec3,
    pub sensitivity: f32,
    pub zoom_speed: f32,
    pub smooth_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl CameraSettings {
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            distance: 520.0,
            target_distance: 520.0,
            azimuth: std::f32::consts::FRAC_PI_4,
            elevation: 0.6155,
            target: Vec3::ZERO,
            target_focus: Vec3::ZERO,
            sensitivity: config.sensitivity,
            zoom_speed: config.zoom_speed,
            smooth_factor: config.smooth_factor,
            min_distance: 1.0,
            max_distance: 100_000.0,
        }
    }

    /// Jump to a framed pose without animating
    pub fn frame(&mut self, pose: &CameraPose) {
        let offset = pose.position - pose.target;
        let distance = offset.length();
        if distance <= 0.0 {
            return;
        }
        self.distance = distance;
        self.target_distance = distance;
        self.azimuth = offset.z.atan2(offset.x);
        self.elevation = (offset.y / distance).clamp(-1.0, 1.0).asin();
        self.target = pose.target;
        self.target_focus = pose.target;
        self.min_distance = distance * 0.05;
        self.max_distance = distance * 20.0;
    }

    /// Eye position on the orbit sphere (Y-up)
    pub fn position(&self) -> Vec3 {
        let horizontal = self.distance * self.elevation.cos();
        self.target
            + Vec3::new(
                horizontal * self.azimuth.cos(),
                self.distance * self.elevation.sin(),
                horizontal * self.azimuth.sin(),
            )
    }

    pub fn zoom(&mut self, factor: f32) {
        self.target_distance = (self.target_distance * factor).clamp(self.min_distance, self.max_distance);
    }

    /// Ease distance and target toward their goals
    pub fn step(&mut self, dt: f32) {
        let lerp_factor = 1.0 - (-self.smooth_factor * 60.0 * dt).exp();
        self.distance += (self.target_distance - self.distance) * lerp_factor;
        self.target += (self.target_focus - self.target) * lerp_factor;
    }
}

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

/// Plugin for orbit controls
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CameraSettings>()
            .add_systems(Update, update_camera);
    }
}

/// Orbit with left drag, pan with right drag, zoom with the wheel or a pinch
fn update_camera(
    mut controller: ResMut<InteractionController>,
    mut settings: ResMut<CameraSettings>,
    mut framed: Local<u64>,
    mut mouse_motion: MessageReader<MouseMotion>,
    mut mouse_wheel: MessageReader<MouseWheel>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    touch_input: Res<Touches>,
    time: Res<Time>,
    mut contexts: bevy_egui::EguiContexts,
) {
    if let Some((generation, pose)) = controller.framed_pose() {
        if generation != *framed {
            *framed = generation;
            let config = &controller.config().camera;
            settings.sensitivity = config.sensitivity;
            settings.zoom_speed = config.zoom_speed;
            settings.smooth_factor = config.smooth_factor;
            settings.frame(&pose);
        }
    }

    let total_motion: Vec2 = mouse_motion.read().map(|m| m.delta).sum();
    let scroll: f32 = mouse_wheel.read().map(|w| w.y).sum();

    if !controller.accepts_input() {
        return;
    }
    let egui_wants_pointer = match contexts.ctx_mut() {
        Ok(ctx) => ctx.wants_pointer_input(),
        Err(_) => false,
    };

    if !egui_wants_pointer {
        if mouse_button.pressed(MouseButton::Left) {
            settings.azimuth += total_motion.x * settings.sensitivity;
            settings.elevation = (settings.elevation + total_motion.y * settings.sensitivity).clamp(0.05, 1.5);
        }

        if mouse_button.pressed(MouseButton::Right) {
            // Horizontal right vector of the current view, and world up
            let right = Vec3::new(settings.azimuth.sin(), 0.0, -settings.azimuth.cos());
            let pan_speed = settings.distance * 0.002;
            let pan = right * -total_motion.x * pan_speed + Vec3::Y * total_motion.y * pan_speed;
            settings.target_focus += pan;
        }

        if scroll != 0.0 {
            let factor = 1.0 - scroll * settings.zoom_speed * 0.3;
            settings.zoom(factor);
        }

        if touch_input.iter().count() == 1 {
            for touch in touch_input.iter() {
                let delta = touch.delta();
                settings.azimuth += delta.x * settings.sensitivity;
                settings.elevation = (settings.elevation + delta.y * settings.sensitivity).clamp(0.05, 1.5);
            }
        }
    }

    // Pinch to zoom
    let touches: Vec<_> = touch_input.iter().collect();
    if let [t1, t2] = touches.as_slice() {
        let curr_dist = t1.position().distance(t2.position());
        let prev_dist = (t1.position() - t1.delta()).distance(t2.position() - t2.delta());
        settings.zoom(prev_dist / curr_dist.max(1.0));
    }

    settings.step(time.delta_secs());

    let position = settings.position();
    let target = settings.target;
    let camera = &mut controller.scene_mut().camera;
    camera.position = position;
    camera.target = target;
}
