//! Pointer hit testing against the pickable group

use bevy::prelude::*;
use stockview_core::config::InteractionConfig;

use crate::camera::ViewportContext;
use crate::scene::{MeshId, PickableGroup};

/// Canvas rectangle in the same coordinate space as pointer positions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl ViewportRect {
    pub fn from_size(width: f32, height: f32) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width,
            height,
        }
    }
}

/// Map a pointer position to normalized device coordinates, y pointing up.
/// Positions outside the rectangle map to `None`.
pub fn normalize_pointer(pointer: Vec2, rect: &ViewportRect) -> Option<Vec2> {
    if !(rect.width > 0.0 && rect.height > 0.0) {
        return None;
    }
    let x = (pointer.x - rect.left) / rect.width * 2.0 - 1.0;
    let y = -((pointer.y - rect.top) / rect.height * 2.0 - 1.0);
    ((-1.0..=1.0).contains(&x) && (-1.0..=1.0).contains(&y)).then_some(Vec2::new(x, y))
}

/// Slab-method ray/AABB intersection. Returns the distance along the ray to the
/// first face hit, or to the exit face when the origin is inside the box.
pub fn ray_aabb_hit_t(ray_origin: Vec3, ray_direction: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    // Division by a zero component yields ±inf, which the slab compare handles
    let inv = ray_direction.recip();
    let t0 = (min - ray_origin) * inv;
    let t1 = (max - ray_origin) * inv;

    let t_enter = t0.min(t1).max_element();
    let t_exit = t0.max(t1).min_element();

    if t_exit < 0.0 || t_enter > t_exit {
        return None;
    }
    Some(if t_enter >= 0.0 { t_enter } else { t_exit })
}

/// Closest intersected solid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    pub id: MeshId,
    pub distance: f32,
}

/// Cast a ray through `pointer` and return the nearest solid it hits
pub fn pick(pointer: Vec2, rect: &ViewportRect, camera: &ViewportContext, group: &PickableGroup) -> Option<PickHit> {
    let ndc = normalize_pointer(pointer, rect)?;
    let ray = camera.ray_from_ndc(ndc)?;
    let direction = *ray.direction;

    group
        .iter()
        .filter_map(|(id, geometry)| {
            ray_aabb_hit_t(ray.origin, direction, geometry.min(), geometry.max())
                .map(|distance| PickHit { id: *id, distance })
        })
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

/// Recognizes two presses close in time and space
#[derive(Debug, Clone)]
pub struct DoubleClickDetector {
    window_secs: f64,
    slop: f32,
    last_press: Option<(f64, Vec2)>,
}

impl DoubleClickDetector {
    pub fn new(config: &InteractionConfig) -> Self {
        Self {
            window_secs: config.double_click_ms as f64 / 1000.0,
            slop: config.double_click_slop,
            last_press: None,
        }
    }

    /// Register a press at `now` seconds. Returns true when it completes a double-click.
    pub fn press(&mut self, now: f64, position: Vec2) -> bool {
        let is_double = matches!(
            self.last_press,
            Some((at, from)) if now - at <= self.window_secs && from.distance(position) <= self.slop
        );
        // A completed double-click does not seed a third press
        self.last_press = if is_double { None } else { Some((now, position)) };
        is_double
    }

    pub fn reset(&mut self) {
        self.last_press = None;
    }
}

impl Default for DoubleClickDetector {
    fn default() -> Self {
        Self::new(&InteractionConfig::default())
    }
}
