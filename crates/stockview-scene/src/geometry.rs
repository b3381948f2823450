//! Bin geometry: boxes, outlines, and label placement built from location records
//!
//! Coordinates are Y-up: a record's `y` is the floor level the bin stands on,
//! `width` runs along X, `depth` along Z and `height` along Y.

use bevy::asset::RenderAssetUsages;
use bevy::prelude::*;
use bevy::render::render_resource::PrimitiveTopology;
use stockview_core::config::{GeometryConfig, Palette, Rgb};
use stockview_core::{BinAppearance, DataFetchError, LocationId, LocationRecord, OccupancyState, ViewerConfig};

/// Code given to the placeholder bin shown for an empty layout
pub const FALLBACK_CODE: &str = "__fallback__";

/// Axis-aligned box in scene units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinGeometry {
    pub center: Vec3,
    /// Full extents along X (width), Y (height), Z (depth)
    pub size: Vec3,
}

impl BinGeometry {
    /// Box standing on `base`, extruding upward by `size.y`
    pub fn on_floor(base: Vec3, size: Vec3) -> Self {
        Self {
            center: base + Vec3::new(0.0, size.y * 0.5, 0.0),
            size,
        }
    }

    pub fn min(&self) -> Vec3 {
        self.center - self.size * 0.5
    }

    pub fn max(&self) -> Vec3 {
        self.center + self.size * 0.5
    }

    /// The 12 box edges as line segment endpoints, relative to the center
    pub fn edge_segments(&self) -> Vec<[f32; 3]> {
        let h = self.size * 0.5;
        let corners = [
            Vec3::new(-h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, h.z),
            Vec3::new(-h.x, -h.y, h.z),
            Vec3::new(-h.x, h.y, -h.z),
            Vec3::new(h.x, h.y, -h.z),
            Vec3::new(h.x, h.y, h.z),
            Vec3::new(-h.x, h.y, h.z),
        ];
        const EDGES: [(usize, usize); 12] = [
            (0, 1), (1, 2), (2, 3), (3, 0),
            (4, 5), (5, 6), (6, 7), (7, 4),
            (0, 4), (1, 5), (2, 6), (3, 7),
        ];
        EDGES
            .iter()
            .flat_map(|&(a, b)| [corners[a].to_array(), corners[b].to_array()])
            .collect()
    }
}

/// Where a bin's code label goes
#[derive(Debug, Clone, PartialEq)]
pub struct LabelPlacement {
    pub text: String,
    pub position: Vec3,
    /// Outward horizontal normal the text faces
    pub facing: Vec3,
    /// Text height in scene units
    pub size: f32,
}

/// Visual projection of a location record
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBin {
    pub code: String,
    pub owner: Option<LocationId>,
    pub appearance: BinAppearance,
    pub geometry: BinGeometry,
    pub outline_color: Rgb,
    pub label: Option<LabelPlacement>,
}

/// Builds [`RenderedBin`]s for one layout against the active location
pub struct BinBuilder<'a> {
    pub config: &'a ViewerConfig,
    pub active_location: Option<&'a LocationId>,
}

impl<'a> BinBuilder<'a> {
    pub fn new(config: &'a ViewerConfig, active_location: Option<&'a LocationId>) -> Self {
        Self {
            config,
            active_location,
        }
    }

    /// Build the box, outline and label for a record, classifying its occupancy.
    /// `occupancy` is `None` when nothing was fetched for the bin.
    pub fn build(
        &self,
        record: &LocationRecord,
        occupancy: Option<&Result<OccupancyState, DataFetchError>>,
    ) -> RenderedBin {
        let is_owning = record.is_owned_by(self.active_location);
        let tier = self.config.occupancy.classify_fetch(is_owning, occupancy);
        let appearance = self.config.palette.appearance(tier);

        let scaled = scale_to_scene_units(record, &self.config.geometry);
        let geometry = BinGeometry::on_floor(
            Vec3::new(scaled.x as f32, scaled.y as f32, scaled.z as f32),
            Vec3::new(scaled.width as f32, scaled.height as f32, scaled.depth as f32),
        );
        let label = self
            .config
            .geometry
            .show_labels
            .then(|| place_label(&record.code, &geometry, &self.config.geometry));

        tracing::debug!(code = %record.code, tier = ?tier, "Built bin");

        RenderedBin {
            code: record.code.clone(),
            owner: record.owner.clone(),
            appearance,
            geometry,
            outline_color: self.config.palette.outline,
            label,
        }
    }

    /// Placeholder cube for a layout with no usable records. It has no owner,
    /// so it never passes the active-location filter.
    pub fn fallback(&self) -> RenderedBin {
        fallback_bin(&self.config.geometry, &self.config.palette)
    }
}

/// Placeholder cube of `fallback_size` standing on the origin
pub fn fallback_bin(config: &GeometryConfig, palette: &Palette) -> RenderedBin {
    let edge = config.fallback_size.max(f64::EPSILON) as f32;
    RenderedBin {
        code: FALLBACK_CODE.to_string(),
        owner: None,
        appearance: palette.appearance(stockview_core::OccupancyTier::Inactive),
        geometry: BinGeometry::on_floor(Vec3::ZERO, Vec3::splat(edge)),
        outline_color: palette.outline,
        label: None,
    }
}

/// Rescale a record that looks like it is in meters rather than scene units.
///
/// The factor applies to position and extents together so bins keep their
/// relative placement.
pub fn scale_to_scene_units(record: &LocationRecord, config: &GeometryConfig) -> LocationRecord {
    if record.max_extent() >= config.unit_scale_threshold {
        return record.clone();
    }
    let f = config.unit_scale_factor;
    LocationRecord {
        x: record.x * f,
        y: record.y * f,
        z: record.z * f,
        width: record.width * f,
        depth: record.depth * f,
        height: record.height * f,
        ..record.clone()
    }
}

/// Place a label facing out of the longer horizontal side, just outside the footprint
pub fn place_label(text: &str, geometry: &BinGeometry, config: &GeometryConfig) -> LabelPlacement {
    let size = (geometry.size.x.min(geometry.size.z) * config.label_scale as f32).max(f32::EPSILON);
    // The long side along X faces +Z, and vice versa
    let (facing, half_extent) = if geometry.size.x >= geometry.size.z {
        (Vec3::Z, geometry.size.z * 0.5)
    } else {
        (Vec3::X, geometry.size.x * 0.5)
    };
    let offset = half_extent + size * (0.5 + config.label_gap as f32);

    LabelPlacement {
        text: text.to_string(),
        position: geometry.center + facing * offset,
        facing,
        size,
    }
}

/// Solid box mesh for a bin
pub fn box_mesh(geometry: &BinGeometry) -> Mesh {
    Mesh::from(Cuboid::from_size(geometry.size))
}

/// Edge-only mesh derived from the same box
pub fn outline_mesh(geometry: &BinGeometry) -> Mesh {
    Mesh::new(PrimitiveTopology::LineList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, geometry.edge_segments())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stockview_core::OccupancyTier;

    fn record(row: serde_json::Value) -> LocationRecord {
        LocationRecord::from_row("A1", &row).unwrap()
    }

    #[test]
    fn test_base_sits_on_record_y() {
        let config = ViewerConfig::default();
        let active = LocationId::new("1");
        let bin = BinBuilder::new(&config, Some(&active)).build(&record(json!([10, 20, 30, 100, 80, 50, 1])), None);

        assert_eq!(bin.geometry.size, Vec3::new(100.0, 50.0, 80.0));
        assert_eq!(bin.geometry.center, Vec3::new(10.0, 45.0, 30.0));
        assert_eq!(bin.geometry.min().y, 20.0);
    }

    #[test]
    fn test_small_records_are_scaled_atomically() {
        let config = GeometryConfig::default();
        let scaled = scale_to_scene_units(&record(json!([1.5, 0, 2, 1.25, 0.75, 2.0, 1])), &config);
        assert_eq!((scaled.x, scaled.y, scaled.z), (150.0, 0.0, 200.0));
        assert_eq!((scaled.width, scaled.depth, scaled.height), (125.0, 75.0, 200.0));

        let large = record(json!([1.5, 0, 2, 120, 80, 200, 1]));
        assert_eq!(scale_to_scene_units(&large, &config), large);
    }

    #[test]
    fn test_outline_shares_box() {
        let geometry = BinGeometry::on_floor(Vec3::ZERO, Vec3::new(2.0, 4.0, 6.0));
        let segments = geometry.edge_segments();
        assert_eq!(segments.len(), 24);
        for p in segments {
            assert_eq!(p[0].abs(), 1.0);
            assert_eq!(p[1].abs(), 2.0);
            assert_eq!(p[2].abs(), 3.0);
        }
    }

    #[test]
    fn test_label_sits_outside_footprint() {
        let config = GeometryConfig::default();

        let wide = BinGeometry::on_floor(Vec3::ZERO, Vec3::new(200.0, 50.0, 80.0));
        let label = place_label("W", &wide, &config);
        assert_eq!(label.facing, Vec3::Z);
        assert_eq!(label.size, 80.0 * 0.25);
        assert!(label.position.z > wide.max().z);
        assert_eq!(label.position.x, wide.center.x);

        let deep = BinGeometry::on_floor(Vec3::ZERO, Vec3::new(60.0, 50.0, 300.0));
        let label = place_label("D", &deep, &config);
        assert_eq!(label.facing, Vec3::X);
        assert!(label.position.x > deep.max().x);
    }

    #[test]
    fn test_classification_feeds_appearance() {
        let config = ViewerConfig::default();
        let active = LocationId::new("1");
        let builder = BinBuilder::new(&config, Some(&active));

        let owned = record(json!([0, 0, 0, 100, 100, 50, 1]));
        let fetched = Ok(OccupancyState { has_quantity: true, fill_percent: 120.0 });
        assert_eq!(builder.build(&owned, Some(&fetched)).appearance.tier, OccupancyTier::Overload);

        let failed = Err(DataFetchError::Transport("timeout".to_string()));
        let bin = builder.build(&owned, Some(&failed));
        assert_eq!(bin.appearance.tier, OccupancyTier::Unknown);
        assert_eq!(bin.appearance.opacity, config.palette.opacity.low);

        let other = record(json!([0, 0, 0, 100, 100, 50, 2]));
        assert_eq!(builder.build(&other, Some(&fetched)).appearance.tier, OccupancyTier::Inactive);
    }

    #[test]
    fn test_fallback_bin() {
        let config = ViewerConfig::default();
        let bin = BinBuilder::new(&config, None).fallback();
        assert_eq!(bin.code, FALLBACK_CODE);
        assert_eq!(bin.owner, None);
        assert_eq!(bin.geometry.size, Vec3::splat(100.0));
        assert_eq!(bin.geometry.min().y, 0.0);
    }
}
