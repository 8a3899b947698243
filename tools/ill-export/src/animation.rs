//! Animation track builder (scene clip -> .illanim)
//!
//! Keys are copied as authored. Only their times change, from ticks to
//! seconds. Each bone gets one sparse track with separate position, rotation
//! and scale keys ordered by time; a key landing on a time that already holds
//! a key replaces it.

use ill_common::{AnimationData, BinaryReader, BinaryWriter, BoneTrack, FormatError, KeyTime};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::Result;
use crate::files;
use crate::registry::BoneRegistry;
use crate::scene::SceneAnimation;
use crate::skeleton::Skeleton;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Animation {
    pub name: String,
    data: AnimationData,
}

impl Animation {
    /// Collect the keys of every channel of a clip into per-bone tracks.
    ///
    /// Every animated node must be a registered bone covered by `skeleton`.
    pub fn import(
        clip: &SceneAnimation,
        skeleton: &Skeleton,
        registry: &BoneRegistry,
    ) -> Result<Self> {
        let mut tracks: BTreeMap<u16, BoneTrack> = BTreeMap::new();

        for channel in &clip.channels {
            let bone = registry.require(&channel.node_name)?;
            if skeleton.bone(bone).is_none() {
                return Err(FormatError::Invalid(format!(
                    "animated bone '{}' ({}) is outside the {}-bone skeleton",
                    channel.node_name,
                    bone,
                    skeleton.len()
                ))
                .into());
            }

            if tracks.contains_key(&bone) {
                tracing::debug!(
                    "Clip '{}' has several channels for bone '{}', merging keys",
                    clip.name,
                    channel.node_name
                );
            }
            let track = tracks.entry(bone).or_default();

            for &(ticks, value) in &channel.position_keys {
                track.position_keys.insert(KeyTime(clip.seconds(ticks)), value);
            }
            for &(ticks, value) in &channel.rotation_keys {
                track.rotation_keys.insert(KeyTime(clip.seconds(ticks)), value);
            }
            for &(ticks, value) in &channel.scale_keys {
                track.scale_keys.insert(KeyTime(clip.seconds(ticks)), value);
            }
        }

        let animation = Self {
            name: clip.name.clone(),
            data: AnimationData {
                duration: clip.seconds(clip.duration_ticks),
                tracks,
            },
        };
        tracing::info!(
            "Imported animation '{}': {} bone tracks, {:.2}s",
            animation.name,
            animation.data.tracks.len(),
            animation.data.duration
        );
        Ok(animation)
    }

    pub fn from_data(name: impl Into<String>, data: AnimationData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Clip length in seconds
    pub fn duration(&self) -> f32 {
        self.data.duration
    }

    pub fn tracks(&self) -> &BTreeMap<u16, BoneTrack> {
        &self.data.tracks
    }

    pub fn track(&self, bone: u16) -> Option<&BoneTrack> {
        self.data.tracks.get(&bone)
    }

    pub fn data(&self) -> &AnimationData {
        &self.data
    }

    pub fn read_from<R: Read>(r: &mut BinaryReader<R>) -> Result<Self> {
        Ok(Self::from_data(String::new(), AnimationData::read_from(r)?))
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut animation = files::read_file(path, Self::read_from)?;
        if let Some(stem) = path.file_stem() {
            animation.name = stem.to_string_lossy().into_owned();
        }
        Ok(animation)
    }

    pub fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> Result<()> {
        self.data.write_to(w)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        files::encode(|w| self.write_to(w))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        files::write_file(path, &self.to_bytes()?)?;
        tracing::info!(
            "Exported animation '{}' to {:?}: {} bone tracks",
            self.name,
            path,
            self.data.tracks.len()
        );
        Ok(())
    }
}
