//! Mesh binary format (.illmesh)
//!
//! Interleaved f32 vertex buffer plus a u16 index buffer split into primitive
//! groups.
//!
//! # Layout
//! ```text
//! 0x00: magic "ILLMESH1" (u64 big-endian)
//! 0x08: feature_mask u8
//! 0x09: group_count u8
//! 0x0A: vertex_count u32
//! 0x0E: index_count u16
//! 0x10: group_count × (type u8, start u16, count u16)
//! var:  vertex_count × interleaved vertex (attributes in VERTEX_LAYOUT order)
//! var:  index_count × u16
//! ```
//!
//! Indices are u16 and the vertex count must fit in 16 bits, so a mesh
//! holds at most 65535 vertices.

use std::io::{Read, Write};

use super::MESH_MAGIC;
use crate::{BinaryReader, BinaryWriter, FormatError};

// ============================================================================
// Feature Mask
// ============================================================================

/// Feature flag: position (3 floats)
pub const FEATURE_POSITION: u8 = 1 << 0;
/// Feature flag: normal (3 floats)
pub const FEATURE_NORMAL: u8 = 1 << 1;
/// Feature flag: tangent + binormal (6 floats)
pub const FEATURE_TANGENT: u8 = 1 << 2;
/// Feature flag: texture coordinates, channel 0 (2 floats)
pub const FEATURE_TEX_COORD: u8 = 1 << 3;
/// Feature flag: blend data, 4 bone indices as floats + 4 weights (8 floats)
pub const FEATURE_BLEND: u8 = 1 << 4;
/// Feature flag: vertex color RGBA, channel 0 (4 floats)
pub const FEATURE_COLOR: u8 = 1 << 5;

/// Number of (index, weight) pairs stored per vertex with [`FEATURE_BLEND`]
pub const BLEND_SLOTS: usize = 4;

/// Largest vertex count that fits in 16 bits
pub const MAX_VERTICES: usize = u16::MAX as usize;
/// Largest index count the u16 header field can hold
pub const MAX_INDICES: usize = u16::MAX as usize;

/// One optional vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub flag: u8,
    /// Number of f32 components
    pub floats: usize,
    pub name: &'static str,
}

/// Interleaving order of vertex attributes. Only attributes present in the
/// feature mask are emitted, always in this order.
pub const VERTEX_LAYOUT: [VertexAttribute; 6] = [
    VertexAttribute {
        flag: FEATURE_POSITION,
        floats: 3,
        name: "position",
    },
    VertexAttribute {
        flag: FEATURE_NORMAL,
        floats: 3,
        name: "normal",
    },
    VertexAttribute {
        flag: FEATURE_TANGENT,
        floats: 6,
        name: "tangent",
    },
    VertexAttribute {
        flag: FEATURE_BLEND,
        floats: 2 * BLEND_SLOTS,
        name: "blend",
    },
    VertexAttribute {
        flag: FEATURE_TEX_COORD,
        floats: 2,
        name: "tex_coord",
    },
    VertexAttribute {
        flag: FEATURE_COLOR,
        floats: 4,
        name: "color",
    },
];

/// Vertex stride in floats for a feature mask
#[inline]
pub fn vertex_stride(features: u8) -> usize {
    VERTEX_LAYOUT
        .iter()
        .filter(|a| features & a.flag != 0)
        .map(|a| a.floats)
        .sum()
}

// ============================================================================
// Primitive Groups
// ============================================================================

/// Draw topology of a primitive group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PrimitiveType {
    Points = 0,
    Lines = 1,
    LineLoop = 2,
    Triangles = 3,
    TriangleStrip = 4,
    TriangleFan = 5,
}

impl PrimitiveType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Points),
            1 => Some(Self::Lines),
            2 => Some(Self::LineLoop),
            3 => Some(Self::Triangles),
            4 => Some(Self::TriangleStrip),
            5 => Some(Self::TriangleFan),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Points => "Points",
            Self::Lines => "Lines",
            Self::LineLoop => "Line Loop",
            Self::Triangles => "Triangles",
            Self::TriangleStrip => "Triangle Strip",
            Self::TriangleFan => "Triangle Fan",
        }
    }
}

/// Contiguous run of indices sharing one topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitiveGroup {
    pub kind: PrimitiveType,
    pub start: u16,
    pub count: u16,
}

// ============================================================================
// Mesh Buffer
// ============================================================================

/// Decoded contents of a mesh file
#[derive(Debug, Clone, PartialEq)]
pub struct MeshBuffer {
    pub features: u8,
    pub groups: Vec<PrimitiveGroup>,
    pub vertex_count: u32,
    /// Interleaved vertex floats, `vertex_count × vertex_stride(features)`
    pub vertex_data: Vec<f32>,
    pub indices: Vec<u16>,
}

impl MeshBuffer {
    /// Floats per vertex
    pub fn stride(&self) -> usize {
        vertex_stride(self.features)
    }

    /// Floats of one vertex, or `None` if `index` is past the vertex data
    pub fn vertex(&self, index: usize) -> Option<&[f32]> {
        let stride = self.stride();
        let start = index.checked_mul(stride)?;
        self.vertex_data.get(start..start.checked_add(stride)?)
    }

    /// Check the buffer against the limits and invariants of the format
    pub fn validate(&self) -> Result<(), FormatError> {
        if self.vertex_count as usize > MAX_VERTICES {
            return Err(FormatError::TooMany {
                what: "vertex",
                count: self.vertex_count as usize,
                max: MAX_VERTICES,
            });
        }
        if self.indices.len() > MAX_INDICES {
            return Err(FormatError::TooMany {
                what: "index",
                count: self.indices.len(),
                max: MAX_INDICES,
            });
        }
        if self.groups.len() > u8::MAX as usize {
            return Err(FormatError::TooMany {
                what: "primitive group",
                count: self.groups.len(),
                max: u8::MAX as usize,
            });
        }

        let expected = self.vertex_count as usize * self.stride();
        if self.vertex_data.len() != expected {
            return Err(FormatError::Invalid(format!(
                "vertex buffer holds {} floats, expected {} ({} vertices × {} floats)",
                self.vertex_data.len(),
                expected,
                self.vertex_count,
                self.stride()
            )));
        }

        for group in &self.groups {
            let end = group.start as usize + group.count as usize;
            if end > self.indices.len() {
                return Err(FormatError::Invalid(format!(
                    "primitive group {}..{} exceeds {} indices",
                    group.start,
                    end,
                    self.indices.len()
                )));
            }
        }

        if let Some(&index) = self
            .indices
            .iter()
            .find(|&&i| i as u32 >= self.vertex_count)
        {
            return Err(FormatError::Invalid(format!(
                "index {index} out of range for {} vertices",
                self.vertex_count
            )));
        }

        Ok(())
    }

    pub fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> Result<(), FormatError> {
        self.validate()?;

        w.write_magic(MESH_MAGIC)?;
        w.write_u8(self.features)?;
        w.write_u8(self.groups.len() as u8)?;
        w.write_u32(self.vertex_count)?;
        w.write_u16(self.indices.len() as u16)?;

        for group in &self.groups {
            w.write_u8(group.kind as u8)?;
            w.write_u16(group.start)?;
            w.write_u16(group.count)?;
        }

        for &f in &self.vertex_data {
            w.write_f32(f)?;
        }

        for &index in &self.indices {
            w.write_u16(index)?;
        }

        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut BinaryReader<R>) -> Result<Self, FormatError> {
        r.expect_magic(MESH_MAGIC)?;
        let features = r.read_u8()?;
        let group_count = r.read_u8()?;
        let vertex_count = r.read_u32()?;
        let index_count = r.read_u16()?;

        let mut groups = Vec::with_capacity(group_count as usize);
        for _ in 0..group_count {
            let raw_kind = r.read_u8()?;
            let kind = PrimitiveType::from_u8(raw_kind).ok_or_else(|| {
                FormatError::Invalid(format!("unknown primitive type {raw_kind}"))
            })?;
            let start = r.read_u16()?;
            let count = r.read_u16()?;
            groups.push(PrimitiveGroup { kind, start, count });
        }

        let float_count = vertex_count as usize * vertex_stride(features);
        let mut vertex_data = Vec::new();
        for _ in 0..float_count {
            vertex_data.push(r.read_f32()?);
        }

        let indices = (0..index_count)
            .map(|_| r.read_u16())
            .collect::<Result<Vec<_>, _>>()?;

        let mesh = Self {
            features,
            groups,
            vertex_count,
            vertex_data,
            indices,
        };
        mesh.validate()?;
        Ok(mesh)
    }
}
