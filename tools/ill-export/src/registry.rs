//! Bone registry (scenes -> .ilanset)
//!
//! Assigns every bone name a dense u16 index that stays the same across all
//! scenes of a run, and across runs once the registry file exists. Indices are
//! handed out in first-seen order: meshes in scene order, bones in mesh order,
//! then each bone's ancestors walking up to the scene root. The same scenes in
//! a different order may therefore produce different indices.
//!
//! The parent map is rebuilt from the scenes on every run and is not part of
//! the registry file.

use hashbrown::HashMap;
use ill_common::{BinaryReader, BinaryWriter, FormatError, RegistryData};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{ExportError, Result};
use crate::files;
use crate::scene::{NodeId, Scene, SceneId};

/// Most bones the u16 count field of the registry file can describe
pub const MAX_BONES: usize = u16::MAX as usize;

/// Whether unknown bone names may still be allocated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryMode {
    /// New names get the next free index
    Creating,
    /// Every referenced name must already exist
    Fixed,
}

#[derive(Debug, Clone)]
pub struct BoneRegistry {
    name_to_index: HashMap<String, u16>,
    /// Child index -> parent index; roots have no entry or point at themselves
    parent_of_index: BTreeMap<u16, u16>,
    mode: RegistryMode,
    /// Node that each bone resolved to in each scene
    scene_nodes: HashMap<(SceneId, u16), NodeId>,
}

impl Default for BoneRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BoneRegistry {
    /// Empty registry in [`RegistryMode::Creating`]
    pub fn new() -> Self {
        Self {
            name_to_index: HashMap::new(),
            parent_of_index: BTreeMap::new(),
            mode: RegistryMode::Creating,
            scene_nodes: HashMap::new(),
        }
    }

    /// Build a fixed registry from decoded file contents
    pub fn from_data(data: RegistryData) -> Result<Self> {
        let mut registry = Self::new();
        for name in data.names {
            registry.register(&name)?;
        }
        registry.mode = RegistryMode::Fixed;
        Ok(registry)
    }

    pub fn read_from<R: Read>(r: &mut BinaryReader<R>) -> Result<Self> {
        Self::from_data(RegistryData::read_from(r)?)
    }

    /// Load a registry file. The result is always [`RegistryMode::Fixed`].
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let registry = files::read_file(path, Self::read_from)?;
        tracing::info!("Loaded bone registry {:?}: {} bones", path, registry.len());
        Ok(registry)
    }

    pub fn mode(&self) -> RegistryMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.name_to_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name_to_index.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<u16> {
        self.name_to_index.get(name).copied()
    }

    /// Index of a bone that must already be registered
    pub fn require(&self, name: &str) -> Result<u16> {
        self.index_of(name).ok_or_else(|| {
            ExportError::RegistryConflict(format!(
                "no bone named '{}' in the registry; it must be built from every scene that \
                 contributes meshes or animation",
                name
            ))
        })
    }

    /// Parent of a bone, or `None` for a root
    pub fn parent_of(&self, index: u16) -> Option<u16> {
        match self.parent_of_index.get(&index) {
            Some(&parent) if parent != index => Some(parent),
            _ => None,
        }
    }

    /// Parent index as stored on disk, where a root refers to itself
    pub fn parent_or_self(&self, index: u16) -> u16 {
        self.parent_of(index).unwrap_or(index)
    }

    /// Scene node a bone resolved to while resolving `scene_id`
    pub fn scene_node(&self, scene_id: SceneId, index: u16) -> Option<NodeId> {
        self.scene_nodes.get(&(scene_id, index)).copied()
    }

    /// Allocate an index for a new name.
    ///
    /// Fails if the name is already registered or the registry is fixed.
    pub fn register(&mut self, name: &str) -> Result<u16> {
        if self.mode == RegistryMode::Fixed {
            return Err(ExportError::RegistryConflict(format!(
                "cannot register bone '{}': registry is fixed",
                name
            )));
        }
        if self.name_to_index.contains_key(name) {
            return Err(ExportError::RegistryConflict(format!(
                "duplicate bone name '{}'",
                name
            )));
        }
        self.allocate(name)
    }

    fn allocate(&mut self, name: &str) -> Result<u16> {
        let count = self.name_to_index.len();
        if count >= MAX_BONES {
            return Err(ExportError::CapacityExceeded {
                what: "bone",
                count: count + 1,
                max: MAX_BONES,
            });
        }
        let index = count as u16;
        self.name_to_index.insert(name.to_string(), index);
        tracing::debug!("Bone '{}' assigned index {}", name, index);
        Ok(index)
    }

    /// Existing index for a name, or a new one while still creating
    fn resolve_name(&mut self, name: &str) -> Result<u16> {
        if let Some(index) = self.index_of(name) {
            return Ok(index);
        }
        match self.mode {
            RegistryMode::Creating => self.allocate(name),
            RegistryMode::Fixed => Err(ExportError::RegistryConflict(format!(
                "registry doesn't have bone with name '{}'; generate a new registry and start \
                 from scratch",
                name
            ))),
        }
    }

    /// Register every mesh bone of a scene plus all of its ancestors, and
    /// record the parent links and scene nodes found on the way.
    pub fn resolve_scene(&mut self, scene_id: SceneId, scene: &Scene) -> Result<()> {
        let before = self.len();

        for mesh in &scene.meshes {
            for bone in &mesh.bones {
                let mut node = scene.find_node(&bone.name).ok_or_else(|| {
                    FormatError::Invalid(format!(
                        "bone '{}' of mesh '{}' has no node in the scene",
                        bone.name, mesh.name
                    ))
                })?;
                let mut child = self.resolve_name(&bone.name)?;
                self.scene_nodes.insert((scene_id, child), node);

                // A well-formed tree is never deeper than its node count
                let mut depth = 0;
                while let Some(parent_node) = scene.parent(node) {
                    depth += 1;
                    if depth > scene.nodes.len() {
                        return Err(ExportError::HierarchyCycle { bone: child });
                    }

                    let parent = self.resolve_name(&scene.node(parent_node).name)?;
                    self.parent_of_index.insert(child, parent);
                    self.scene_nodes.insert((scene_id, parent), parent_node);
                    tracing::debug!("Bone {} is a child of bone {}", child, parent);

                    node = parent_node;
                    child = parent;
                }
            }
        }

        tracing::info!(
            "Resolved scene {}: {} bones ({} new)",
            scene_id,
            self.len(),
            self.len() - before
        );
        Ok(())
    }

    /// Stop allocating. Called once every scene has been resolved.
    pub fn freeze(&mut self) {
        self.mode = RegistryMode::Fixed;
    }

    /// Bone names in index order
    pub fn names(&self) -> Result<Vec<String>> {
        let mut slots: Vec<Option<&str>> = vec![None; self.len()];
        for (name, &index) in &self.name_to_index {
            let Some(slot) = slots
                .get_mut(index as usize)
                .filter(|slot| slot.is_none())
            else {
                return Err(FormatError::Invalid(format!(
                    "bone index {} is out of range or assigned twice",
                    index
                ))
                .into());
            };
            *slot = Some(name.as_str());
        }
        Ok(slots
            .into_iter()
            .map(|name| name.unwrap_or_default().to_string())
            .collect())
    }

    pub fn to_data(&self) -> Result<RegistryData> {
        Ok(RegistryData {
            names: self.names()?,
        })
    }

    pub fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> Result<()> {
        self.to_data()?.write_to(w)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        files::encode(|w| self.write_to(w))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        files::write_file(path, &self.to_bytes()?)?;
        tracing::info!("Saved bone registry {:?}: {} bones", path, self.len());
        Ok(())
    }
}
