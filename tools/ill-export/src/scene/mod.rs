//! In-memory scene model
//!
//! The exporter never touches importer types directly. An importer (see
//! [`gltf`](self::gltf)) converts its document into a [`Scene`]: a node arena
//! with local transforms and parent links, meshes with optional attribute
//! arrays and per-bone weight lists, and animation clips whose key times are in
//! ticks.

pub mod gltf;

use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

/// Index of a node in [`Scene::nodes`]
pub type NodeId = usize;

/// Position of a scene in the import order of one run
pub type SceneId = usize;

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    /// Transform relative to the parent node
    pub transform: Mat4,
    pub parent: Option<NodeId>,
}

/// Vertices influenced by one bone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBone {
    /// Name of the node driving this bone
    pub name: String,
    /// (vertex id, weight) pairs
    pub weights: Vec<(u32, f32)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneMesh {
    pub name: String,
    pub material_name: String,
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    /// Tangent and bitangent per vertex
    pub tangents: Option<Vec<(Vec3, Vec3)>>,
    /// First texture coordinate channel
    pub tex_coords: Option<Vec<Vec2>>,
    /// First vertex color channel, RGBA
    pub colors: Option<Vec<Vec4>>,
    pub bones: Vec<MeshBone>,
    pub faces: Vec<[u32; 3]>,
}

impl SceneMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn has_bones(&self) -> bool {
        !self.bones.is_empty()
    }
}

/// Keys of one animated node, times in ticks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeChannel {
    pub node_name: String,
    pub position_keys: Vec<(f64, Vec3)>,
    pub rotation_keys: Vec<(f64, Quat)>,
    pub scale_keys: Vec<(f64, Vec3)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneAnimation {
    pub name: String,
    pub duration_ticks: f64,
    pub ticks_per_second: f64,
    pub channels: Vec<NodeChannel>,
}

impl SceneAnimation {
    /// Convert ticks to seconds, treating a missing rate as one tick per second
    pub fn seconds(&self, ticks: f64) -> f32 {
        let rate = if self.ticks_per_second > 0.0 {
            self.ticks_per_second
        } else {
            1.0
        };
        (ticks / rate) as f32
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub nodes: Vec<SceneNode>,
    pub meshes: Vec<SceneMesh>,
    pub animations: Vec<SceneAnimation>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node and return its id
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        transform: Mat4,
        parent: Option<NodeId>,
    ) -> NodeId {
        self.nodes.push(SceneNode {
            name: name.into(),
            transform,
            parent,
        });
        self.nodes.len() - 1
    }

    /// First node with the given name, in arena order
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name)
    }

    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }
}
