//! Primitive codec shared by every illmesh format
//!
//! All multi-byte fields are little-endian except the leading 8-byte magic
//! tag, which is stored big-endian so the file starts with the readable ASCII
//! tag (`ILLMESH1`, ...).
//!
//! Strings are a u16 little-endian byte length followed by UTF-8 bytes, with
//! no terminator.

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::{Mat4, Quat, Vec3};
use std::io::{Read, Write};

use crate::FormatError;

/// Longest string the u16 length prefix can describe
pub const MAX_STRING_LEN: usize = u16::MAX as usize;

/// Writer for the illmesh binary formats
pub struct BinaryWriter<W: Write> {
    writer: W,
}

impl<W: Write> BinaryWriter<W> {
    /// Create a new binary writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Unwrap the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Write the 8-byte big-endian file tag
    pub fn write_magic(&mut self, magic: u64) -> Result<(), FormatError> {
        self.writer.write_u64::<BigEndian>(magic)?;
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<(), FormatError> {
        self.writer.write_u8(value)?;
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<(), FormatError> {
        self.writer.write_u16::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<(), FormatError> {
        self.writer.write_u32::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_f32(&mut self, value: f32) -> Result<(), FormatError> {
        self.writer.write_f32::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write a count into a u16 field, failing instead of truncating
    pub fn write_count_u16(&mut self, what: &'static str, count: usize) -> Result<(), FormatError> {
        let value = u16::try_from(count).map_err(|_| FormatError::TooMany {
            what,
            count,
            max: u16::MAX as usize,
        })?;
        self.write_u16(value)
    }

    /// Write a length-prefixed UTF-8 string
    pub fn write_string(&mut self, value: &str) -> Result<(), FormatError> {
        self.write_count_u16("string byte", value.len())?;
        self.writer.write_all(value.as_bytes())?;
        Ok(())
    }

    pub fn write_vec3(&mut self, value: Vec3) -> Result<(), FormatError> {
        for f in value.to_array() {
            self.write_f32(f)?;
        }
        Ok(())
    }

    /// Write a quaternion as x, y, z, w
    pub fn write_quat(&mut self, value: Quat) -> Result<(), FormatError> {
        for f in value.to_array() {
            self.write_f32(f)?;
        }
        Ok(())
    }

    /// Write a 4x4 matrix as 16 floats, column-major
    pub fn write_mat4(&mut self, value: &Mat4) -> Result<(), FormatError> {
        for f in value.to_cols_array() {
            self.write_f32(f)?;
        }
        Ok(())
    }
}

/// Reader for the illmesh binary formats
pub struct BinaryReader<R: Read> {
    reader: R,
}

impl<R: Read> BinaryReader<R> {
    /// Create a new binary reader
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read the 8-byte big-endian file tag
    pub fn read_magic(&mut self) -> Result<u64, FormatError> {
        Ok(self.reader.read_u64::<BigEndian>()?)
    }

    /// Read the file tag and check it against `expected`
    pub fn expect_magic(&mut self, expected: u64) -> Result<(), FormatError> {
        let found = self.read_magic()?;
        if found != expected {
            return Err(FormatError::BadMagic { expected, found });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, FormatError> {
        Ok(self.reader.read_u8()?)
    }

    pub fn read_u16(&mut self) -> Result<u16, FormatError> {
        Ok(self.reader.read_u16::<LittleEndian>()?)
    }

    pub fn read_u32(&mut self) -> Result<u32, FormatError> {
        Ok(self.reader.read_u32::<LittleEndian>()?)
    }

    pub fn read_f32(&mut self) -> Result<f32, FormatError> {
        Ok(self.reader.read_f32::<LittleEndian>()?)
    }

    /// Read a length-prefixed UTF-8 string
    pub fn read_string(&mut self) -> Result<String, FormatError> {
        let len = self.read_u16()? as usize;
        let mut bytes = vec![0u8; len];
        self.reader.read_exact(&mut bytes)?;
        Ok(String::from_utf8(bytes)?)
    }

    pub fn read_vec3(&mut self) -> Result<Vec3, FormatError> {
        Ok(Vec3::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    /// Read a quaternion stored as x, y, z, w
    pub fn read_quat(&mut self) -> Result<Quat, FormatError> {
        Ok(Quat::from_xyzw(
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
        ))
    }

    /// Read a column-major 4x4 matrix
    pub fn read_mat4(&mut self) -> Result<Mat4, FormatError> {
        let mut cols = [0.0f32; 16];
        for f in cols.iter_mut() {
            *f = self.read_f32()?;
        }
        Ok(Mat4::from_cols_array(&cols))
    }

    /// Fail if anything follows the last decoded field
    pub fn finish(mut self) -> Result<(), FormatError> {
        let mut rest = Vec::new();
        self.reader.read_to_end(&mut rest)?;
        if !rest.is_empty() {
            return Err(FormatError::TrailingData(rest.len()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_magic_is_big_endian_ascii() {
        let mut writer = BinaryWriter::new(Vec::new());
        writer
            .write_magic(u64::from_be_bytes(*b"ILLMESH1"))
            .unwrap();
        assert_eq!(writer.into_inner(), b"ILLMESH1");
    }

    #[test]
    fn test_fields_are_little_endian() {
        let mut writer = BinaryWriter::new(Vec::new());
        writer.write_u16(0x0102).unwrap();
        writer.write_u32(0x0304_0506).unwrap();
        writer.write_f32(1.0).unwrap();
        let bytes = writer.into_inner();
        assert_eq!(&bytes[0..2], &[0x02, 0x01]);
        assert_eq!(&bytes[2..6], &[0x06, 0x05, 0x04, 0x03]);
        assert_eq!(&bytes[6..10], &1.0f32.to_le_bytes());
    }

    #[test]
    fn test_string_layout() {
        let mut writer = BinaryWriter::new(Vec::new());
        writer.write_string("spine").unwrap();
        let bytes = writer.into_inner();
        assert_eq!(&bytes[0..2], &5u16.to_le_bytes());
        assert_eq!(&bytes[2..], b"spine");

        let mut reader = BinaryReader::new(Cursor::new(bytes));
        assert_eq!(reader.read_string().unwrap(), "spine");
        reader.finish().unwrap();
    }

    #[test]
    fn test_string_too_long() {
        let long = "x".repeat(MAX_STRING_LEN + 1);
        let mut writer = BinaryWriter::new(Vec::new());
        let err = writer.write_string(&long).unwrap_err();
        assert!(matches!(err, FormatError::TooMany { .. }));
    }

    #[test]
    fn test_mat4_is_column_major() {
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let mut writer = BinaryWriter::new(Vec::new());
        writer.write_mat4(&m).unwrap();
        let bytes = writer.into_inner();
        assert_eq!(bytes.len(), 64);
        // Translation lives in the 4th column: floats 12..15
        let tx = f32::from_le_bytes(bytes[48..52].try_into().unwrap());
        assert_eq!(tx, 1.0);

        let mut reader = BinaryReader::new(Cursor::new(bytes));
        assert_eq!(reader.read_mat4().unwrap(), m);
    }

    #[test]
    fn test_bad_magic() {
        let mut reader = BinaryReader::new(Cursor::new(b"ILLSKEL0".to_vec()));
        let err = reader
            .expect_magic(u64::from_be_bytes(*b"ILLMESH1"))
            .unwrap_err();
        assert!(matches!(err, FormatError::BadMagic { .. }));
    }

    #[test]
    fn test_truncated_read() {
        let mut reader = BinaryReader::new(Cursor::new(vec![0x01]));
        assert!(matches!(reader.read_u16(), Err(FormatError::Truncated)));
    }

    #[test]
    fn test_trailing_data() {
        let reader = BinaryReader::new(Cursor::new(vec![0u8; 3]));
        assert!(matches!(reader.finish(), Err(FormatError::TrailingData(3))));
    }
}
