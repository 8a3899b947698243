//! Animation clip binary format (.illanim)
//!
//! Keys are sparse and stored per bone, per channel, in ascending time.
//!
//! # Layout
//! ```text
//! 0x00: magic "ILLANIM0" (u64 big-endian)
//! 0x08: duration f32 (seconds)
//! 0x0C: track_count u16
//! per track:
//!   bone_index u16
//!   position_key_count u16, × (time f32, x, y, z)
//!   rotation_key_count u16, × (time f32, x, y, z, w)
//!   scale_key_count u16,    × (time f32, x, y, z)
//! ```

use glam::{Quat, Vec3};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::io::{Read, Write};

use super::ANIMATION_MAGIC;
use crate::{BinaryReader, BinaryWriter, FormatError};

/// Key time in seconds with a total order, usable as a map key.
///
/// Ordering follows `f32::total_cmp`, so two keys collide only when their
/// times are bit-identical.
#[derive(Debug, Clone, Copy)]
pub struct KeyTime(pub f32);

impl PartialEq for KeyTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for KeyTime {}

impl PartialOrd for KeyTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Sparse keys of one bone. Inserting at an existing time replaces the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoneTrack {
    pub position_keys: BTreeMap<KeyTime, Vec3>,
    pub rotation_keys: BTreeMap<KeyTime, Quat>,
    pub scale_keys: BTreeMap<KeyTime, Vec3>,
}

impl BoneTrack {
    pub fn is_empty(&self) -> bool {
        self.position_keys.is_empty() && self.rotation_keys.is_empty() && self.scale_keys.is_empty()
    }
}

/// Full contents of an animation file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationData {
    /// Clip length in seconds
    pub duration: f32,
    /// Tracks by bone index, written in ascending bone order
    pub tracks: BTreeMap<u16, BoneTrack>,
}

impl AnimationData {
    pub fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> Result<(), FormatError> {
        w.write_magic(ANIMATION_MAGIC)?;
        w.write_f32(self.duration)?;
        w.write_count_u16("bone track", self.tracks.len())?;

        for (&bone, track) in &self.tracks {
            w.write_u16(bone)?;

            w.write_count_u16("position key", track.position_keys.len())?;
            for (time, value) in &track.position_keys {
                w.write_f32(time.0)?;
                w.write_vec3(*value)?;
            }

            w.write_count_u16("rotation key", track.rotation_keys.len())?;
            for (time, value) in &track.rotation_keys {
                w.write_f32(time.0)?;
                w.write_quat(*value)?;
            }

            w.write_count_u16("scale key", track.scale_keys.len())?;
            for (time, value) in &track.scale_keys {
                w.write_f32(time.0)?;
                w.write_vec3(*value)?;
            }
        }

        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut BinaryReader<R>) -> Result<Self, FormatError> {
        r.expect_magic(ANIMATION_MAGIC)?;
        let duration = r.read_f32()?;
        let track_count = r.read_u16()?;

        let mut tracks = BTreeMap::new();
        for _ in 0..track_count {
            let bone = r.read_u16()?;
            let mut track = BoneTrack::default();

            for _ in 0..r.read_u16()? {
                let time = KeyTime(r.read_f32()?);
                track.position_keys.insert(time, r.read_vec3()?);
            }
            for _ in 0..r.read_u16()? {
                let time = KeyTime(r.read_f32()?);
                track.rotation_keys.insert(time, r.read_quat()?);
            }
            for _ in 0..r.read_u16()? {
                let time = KeyTime(r.read_f32()?);
                track.scale_keys.insert(time, r.read_vec3()?);
            }

            if tracks.insert(bone, track).is_some() {
                return Err(FormatError::Invalid(format!(
                    "bone {bone} has more than one track"
                )));
            }
        }

        Ok(Self { duration, tracks })
    }
}
