//! Bone registry binary format (.ilanset)
//!
//! # Layout
//! ```text
//! 0x00: magic "ILANSET0" (u64 big-endian)
//! 0x08: bone_count u16
//! 0x0A: bone_count × name (u16 length + UTF-8 bytes), in bone index order
//! ```

use std::io::{Read, Write};

use super::REGISTRY_MAGIC;
use crate::{BinaryReader, BinaryWriter, FormatError};

/// Bone names in index order, as stored on disk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryData {
    /// `names[i]` is the name of bone `i`
    pub names: Vec<String>,
}

impl RegistryData {
    pub fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> Result<(), FormatError> {
        w.write_magic(REGISTRY_MAGIC)?;
        w.write_count_u16("bone", self.names.len())?;
        for name in &self.names {
            w.write_string(name)?;
        }
        Ok(())
    }

    /// Decode a registry file. Duplicate names are returned as-is; rejecting
    /// them is the registry's job.
    pub fn read_from<R: Read>(r: &mut BinaryReader<R>) -> Result<Self, FormatError> {
        r.expect_magic(REGISTRY_MAGIC)?;
        let count = r.read_u16()?;
        let names = (0..count)
            .map(|_| r.read_string())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { names })
    }
}
