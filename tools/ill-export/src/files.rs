//! Whole-file encode/decode helpers
//!
//! Outputs are always encoded into memory first and written in one call, so a
//! failed encode never leaves a half-written file behind.

use anyhow::{Context, Result};
use ill_common::{BinaryReader, BinaryWriter};
use std::fs;
use std::io::Cursor;
use std::path::Path;

use crate::error::ExportError;

/// Encode into a byte vector
pub fn encode(
    f: impl FnOnce(&mut BinaryWriter<Vec<u8>>) -> Result<(), ExportError>,
) -> Result<Vec<u8>, ExportError> {
    let mut writer = BinaryWriter::new(Vec::new());
    f(&mut writer)?;
    Ok(writer.into_inner())
}

/// Reader over a fully buffered file
pub type FileReader = BinaryReader<Cursor<Vec<u8>>>;

/// Decode a buffered file, rejecting anything left over after the last field
pub fn decode<T>(
    bytes: Vec<u8>,
    f: impl FnOnce(&mut FileReader) -> Result<T, ExportError>,
) -> Result<T, ExportError> {
    let mut reader = BinaryReader::new(Cursor::new(bytes));
    let value = f(&mut reader)?;
    reader.finish()?;
    Ok(value)
}

/// Read and decode a whole file
pub fn read_file<T>(
    path: &Path,
    f: impl FnOnce(&mut FileReader) -> Result<T, ExportError>,
) -> Result<T> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    decode(bytes, f).with_context(|| format!("Failed to decode {:?}", path))
}

/// Write an encoded file, creating parent directories as needed
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    fs::write(path, bytes).with_context(|| format!("Failed to write {:?}", path))
}
