//! Skeleton binary format (.illskel)
//!
//! # Layout
//! ```text
//! 0x00: magic "ILLSKEL0" (u64 big-endian)
//! 0x08: bone_count u16
//! 0x0A: bone_count × (relative mat4, offset mat4), 16 f32 each, column-major
//! var:  bone_count × parent u16 (a bone's own index marks a root)
//! ```
//!
//! The parent list is written for runtime convenience only. Loaders in the
//! pipeline take the hierarchy from the bone registry, so a skeleton file must
//! always travel with the registry file it was exported against.

use glam::Mat4;
use std::io::{Read, Write};

use super::SKELETON_MAGIC;
use crate::{BinaryReader, BinaryWriter, FormatError};

/// Size of one bone record in bytes (2 × 16 floats)
pub const BONE_RECORD_SIZE: usize = 128;

/// Bind-pose transforms of one bone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneTransforms {
    /// Transform relative to the parent bone in the bind pose
    pub relative: Mat4,
    /// Inverse of the full (root-to-bone) bind-pose transform
    pub offset: Mat4,
}

impl Default for BoneTransforms {
    fn default() -> Self {
        Self {
            relative: Mat4::IDENTITY,
            offset: Mat4::IDENTITY,
        }
    }
}

/// Full contents of a skeleton file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkeletonData {
    pub bones: Vec<BoneTransforms>,
    /// Parent index per bone; `parents[i] == i` for roots
    pub parents: Vec<u16>,
}

impl SkeletonData {
    pub fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> Result<(), FormatError> {
        if self.parents.len() != self.bones.len() {
            return Err(FormatError::Invalid(format!(
                "skeleton has {} bones but {} parent entries",
                self.bones.len(),
                self.parents.len()
            )));
        }

        w.write_magic(SKELETON_MAGIC)?;
        w.write_count_u16("bone", self.bones.len())?;

        for bone in &self.bones {
            w.write_mat4(&bone.relative)?;
            w.write_mat4(&bone.offset)?;
        }

        for &parent in &self.parents {
            w.write_u16(parent)?;
        }

        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut BinaryReader<R>) -> Result<Self, FormatError> {
        r.expect_magic(SKELETON_MAGIC)?;
        let count = r.read_u16()? as usize;

        let mut bones = Vec::with_capacity(count);
        for _ in 0..count {
            let relative = r.read_mat4()?;
            let offset = r.read_mat4()?;
            bones.push(BoneTransforms { relative, offset });
        }

        let parents = (0..count)
            .map(|_| r.read_u16())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { bones, parents })
    }

    /// Total encoded size in bytes
    pub fn file_size(&self) -> usize {
        8 + 2 + self.bones.len() * (BONE_RECORD_SIZE + 2)
    }
}
