//! Skeleton builder (scene + registry -> .illskel)
//!
//! Each bone carries its bind-pose transform relative to its parent and the
//! offset transform, the inverse of the full root-to-bone bind pose.
//!
//! The skeleton file has a parent list, but it is only written for runtime
//! loaders. [`Skeleton::load`] skips it, and the hierarchy used here always
//! comes from the [`BoneRegistry`]. A skeleton file is therefore only valid
//! next to the registry file it was exported with.

use glam::{Mat4, Quat, Vec3};
use ill_common::{BinaryReader, BinaryWriter, BoneTransforms, FormatError, SkeletonData};
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{ExportError, Result};
use crate::files;
use crate::registry::BoneRegistry;
use crate::scene::{Scene, SceneId};

/// Bind pose of one bone, decomposed and inverted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BindPoseInverse {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Skeleton {
    bones: Vec<BoneTransforms>,
}

impl Skeleton {
    /// Build the skeleton of one resolved scene.
    ///
    /// Bones the registry knows but this scene lacks get an identity relative
    /// transform.
    pub fn import(scene_id: SceneId, scene: &Scene, registry: &BoneRegistry) -> Result<Self> {
        let bones = (0..registry.len())
            .map(|index| {
                let relative = registry
                    .scene_node(scene_id, index as u16)
                    .map_or(Mat4::IDENTITY, |node| scene.node(node).transform);
                BoneTransforms {
                    relative,
                    offset: Mat4::IDENTITY,
                }
            })
            .collect();
        let mut skeleton = Self { bones };

        let offsets = (0..skeleton.len())
            .map(|index| {
                skeleton
                    .full_transform(index as u16, registry)
                    .map(|full| full.inverse())
            })
            .collect::<Result<Vec<_>>>()?;
        for (bone, offset) in skeleton.bones.iter_mut().zip(offsets) {
            bone.offset = offset;
        }

        tracing::info!(
            "Built skeleton for scene {}: {} bones",
            scene_id,
            skeleton.len()
        );
        Ok(skeleton)
    }

    /// Skeleton from decoded file contents. The stored parent list is
    /// dropped.
    pub fn from_data(data: SkeletonData) -> Self {
        Self { bones: data.bones }
    }

    pub fn read_from<R: Read>(r: &mut BinaryReader<R>) -> Result<Self> {
        Ok(Self::from_data(SkeletonData::read_from(r)?))
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let skeleton = files::read_file(path, Self::read_from)?;
        tracing::info!("Loaded skeleton {:?}: {} bones", path, skeleton.len());
        Ok(skeleton)
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn bones(&self) -> &[BoneTransforms] {
        &self.bones
    }

    pub fn bone(&self, index: u16) -> Option<&BoneTransforms> {
        self.bones.get(index as usize)
    }

    /// Root-to-bone bind-pose transform, `full(parent) * relative(bone)`.
    ///
    /// Walks the registry's parent map iteratively. A chain longer than the
    /// bone count can only be a cycle.
    pub fn full_transform(&self, index: u16, registry: &BoneRegistry) -> Result<Mat4> {
        let relative = |bone: u16| {
            self.bone(bone).map(|b| b.relative).ok_or_else(|| {
                ExportError::from(FormatError::Invalid(format!(
                    "bone {} is outside the {}-bone skeleton",
                    bone,
                    self.len()
                )))
            })
        };

        let mut full = relative(index)?;
        let mut current = index;
        let mut depth = 0;
        while let Some(parent) = registry.parent_of(current) {
            depth += 1;
            if depth > self.len() {
                return Err(ExportError::HierarchyCycle { bone: index });
            }
            full = relative(parent)? * full;
            current = parent;
        }
        Ok(full)
    }

    /// Inverse of a bone's relative bind pose as separate position, rotation
    /// and scale.
    ///
    /// Exported animation keys stay in authored space; this is what a runtime
    /// would apply to move them into bind-pose-relative space.
    pub fn bind_pose_inverse(&self, index: u16) -> Option<BindPoseInverse> {
        let bone = self.bone(index)?;
        let (scale, rotation, position) = bone.relative.to_scale_rotation_translation();
        Some(BindPoseInverse {
            position: -position,
            rotation: rotation.inverse(),
            scale: scale.recip(),
        })
    }

    /// File contents, with each root written as its own parent
    pub fn to_data(&self, registry: &BoneRegistry) -> SkeletonData {
        let parents = (0..self.len())
            .map(|index| registry.parent_or_self(index as u16))
            .collect();
        SkeletonData {
            bones: self.bones.clone(),
            parents,
        }
    }

    pub fn write_to<W: Write>(
        &self,
        w: &mut BinaryWriter<W>,
        registry: &BoneRegistry,
    ) -> Result<()> {
        self.to_data(registry).write_to(w)?;
        Ok(())
    }

    pub fn to_bytes(&self, registry: &BoneRegistry) -> Result<Vec<u8>> {
        files::encode(|w| self.write_to(w, registry))
    }

    pub fn save(&self, path: &Path, registry: &BoneRegistry) -> anyhow::Result<()> {
        files::write_file(path, &self.to_bytes(registry)?)?;
        tracing::info!("Exported skeleton {:?}: {} bones", path, self.len());
        Ok(())
    }
}
