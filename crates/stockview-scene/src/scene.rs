//! Scene graph: bins, their pickable group and the metadata side table
//!
//! The graph is plain data. A Bevy mirror system (see [`crate::render`])
//! drains [`SceneChange`]s and keeps ECS entities and GPU assets in step,
//! so the graph is the single owner of every node it hands out.

use std::collections::HashMap;

use bevy::prelude::*;
use stockview_core::{BinAppearance, LocationId};

use crate::camera::ViewportContext;
use crate::geometry::{BinGeometry, LabelPlacement, RenderedBin};

/// Handle of a node in the scene graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub u32);

/// Metadata attached to a pickable solid
#[derive(Debug, Clone, PartialEq)]
pub struct BinMeta {
    pub code: String,
    pub owner: Option<LocationId>,
    pub appearance: BinAppearance,
}

/// Renderable payload of a node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeVisual {
    Solid {
        geometry: BinGeometry,
        appearance: BinAppearance,
    },
    Outline {
        geometry: BinGeometry,
        color: stockview_core::Rgb,
    },
    Label(LabelPlacement),
}

/// Mutation the render mirror has to apply
#[derive(Debug, Clone, PartialEq)]
pub enum SceneChange {
    Added(MeshId),
    /// The node is gone and its GPU resources must be released
    Released(MeshId),
}

/// World-space bounds of a set of boxes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn union(self, other: Bounds) -> Bounds {
        Bounds {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

impl From<&BinGeometry> for Bounds {
    fn from(geometry: &BinGeometry) -> Self {
        Bounds {
            min: geometry.min(),
            max: geometry.max(),
        }
    }
}

/// Solids eligible for hit testing, in insertion order
#[derive(Debug, Clone, Default)]
pub struct PickableGroup {
    members: Vec<(MeshId, BinGeometry)>,
}

impl PickableGroup {
    pub fn iter(&self) -> impl Iterator<Item = &(MeshId, BinGeometry)> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.members
            .iter()
            .map(|(_, geometry)| Bounds::from(geometry))
            .reduce(Bounds::union)
    }
}

/// State of the last presented frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSnapshot {
    pub frame: u64,
    pub camera: ViewportContext,
}

/// Scene root, pickable group and the id → metadata side table
#[derive(Debug, Clone, Resource)]
pub struct SceneGraph {
    next_id: u32,
    /// Outlines and labels hang off the root; solids live in the pickable group
    root: Vec<MeshId>,
    pickable: PickableGroup,
    nodes: HashMap<MeshId, NodeVisual>,
    pick_table: HashMap<MeshId, BinMeta>,
    changes: Vec<SceneChange>,
    pub camera: ViewportContext,
    frame: u64,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new(ViewportContext::default())
    }
}

impl SceneGraph {
    pub fn new(camera: ViewportContext) -> Self {
        Self {
            next_id: 0,
            root: Vec::new(),
            pickable: PickableGroup::default(),
            nodes: HashMap::new(),
            pick_table: HashMap::new(),
            changes: Vec::new(),
            camera,
            frame: 0,
        }
    }

    fn allocate(&mut self, visual: NodeVisual) -> MeshId {
        let id = MeshId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, visual);
        self.changes.push(SceneChange::Added(id));
        id
    }

    /// Add a bin's solid to the pickable group and its outline and label to the root
    pub fn add_bin(&mut self, bin: RenderedBin) {
        let solid = self.allocate(NodeVisual::Solid {
            geometry: bin.geometry,
            appearance: bin.appearance,
        });
        self.pickable.members.push((solid, bin.geometry));
        self.pick_table.insert(
            solid,
            BinMeta {
                code: bin.code,
                owner: bin.owner,
                appearance: bin.appearance,
            },
        );

        let outline = self.allocate(NodeVisual::Outline {
            geometry: bin.geometry,
            color: bin.outline_color,
        });
        self.root.push(outline);

        if let Some(label) = bin.label {
            let id = self.allocate(NodeVisual::Label(label));
            self.root.push(id);
        }
    }

    /// Remove every node and queue its release. Returns the number of nodes released.
    pub fn clear(&mut self) -> usize {
        let mut released: Vec<MeshId> = self.nodes.keys().copied().collect();
        released.sort();
        // Adds not yet mirrored are dropped outright
        self.changes.retain(|change| !matches!(change, SceneChange::Added(_)));
        self.changes.extend(released.iter().copied().map(SceneChange::Released));

        self.root.clear();
        self.pickable.members.clear();
        self.nodes.clear();
        self.pick_table.clear();

        if !released.is_empty() {
            tracing::debug!(count = released.len(), "Released scene nodes");
        }
        released.len()
    }

    /// Track a viewport size change
    pub fn resize(&mut self, width: f32, height: f32) {
        self.camera.set_viewport_size(width, height);
    }

    /// Mark a frame as presented and return what it should show
    pub fn render_frame(&mut self) -> FrameSnapshot {
        self.frame += 1;
        FrameSnapshot {
            frame: self.frame,
            camera: self.camera,
        }
    }

    pub fn node(&self, id: MeshId) -> Option<&NodeVisual> {
        self.nodes.get(&id)
    }

    pub fn meta(&self, id: MeshId) -> Option<&BinMeta> {
        self.pick_table.get(&id)
    }

    pub fn pickable(&self) -> &PickableGroup {
        &self.pickable
    }

    /// Outline and label nodes attached to the root
    pub fn root_nodes(&self) -> &[MeshId] {
        &self.root
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.pickable.bounds()
    }

    /// Hand pending mutations to the render mirror
    pub fn drain_changes(&mut self) -> Vec<SceneChange> {
        std::mem::take(&mut self.changes)
    }
}
