//! Diagnostic decoder for illmesh asset files
//!
//! Reads any of the four file kinds field by field, in exactly the order the
//! writers emit them, and keeps every value so it can be rendered as text or
//! compared in tests. This module deliberately does not reuse the typed
//! `read_from` decoders: it is a second, independent reading of each layout,
//! so a field reordered in a writer shows up here as a desync.

use std::fmt;
use std::io::Read;

use crate::formats::{
    BLEND_SLOTS, FEATURE_BLEND, FEATURE_COLOR, FEATURE_NORMAL, FEATURE_POSITION, FEATURE_TANGENT,
    FEATURE_TEX_COORD, FileKind, PrimitiveType,
};
use crate::{BinaryReader, FormatError};

/// Decoded view of one asset file
#[derive(Debug, Clone, PartialEq)]
pub enum Reflection {
    Registry(RegistryDump),
    Skeleton(SkeletonDump),
    Animation(AnimationDump),
    Mesh(MeshDump),
}

impl Reflection {
    pub fn kind(&self) -> FileKind {
        match self {
            Reflection::Registry(_) => FileKind::Registry,
            Reflection::Skeleton(_) => FileKind::Skeleton,
            Reflection::Animation(_) => FileKind::Animation,
            Reflection::Mesh(_) => FileKind::Mesh,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegistryDump {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonDump {
    /// Relative matrix per bone, 16 floats column-major
    pub relative: Vec<[f32; 16]>,
    /// Offset matrix per bone, 16 floats column-major
    pub offset: Vec<[f32; 16]>,
    pub parents: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackDump {
    pub bone: u16,
    pub position_keys: Vec<(f32, [f32; 3])>,
    pub rotation_keys: Vec<(f32, [f32; 4])>,
    pub scale_keys: Vec<(f32, [f32; 3])>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationDump {
    pub duration: f32,
    pub tracks: Vec<TrackDump>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupDump {
    pub kind: u8,
    pub start: u16,
    pub count: u16,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexDump {
    pub position: Option<[f32; 3]>,
    pub normal: Option<[f32; 3]>,
    pub tangent: Option<[f32; 3]>,
    pub binormal: Option<[f32; 3]>,
    /// Bone indices, stored as floats
    pub blend_indices: Option<[f32; BLEND_SLOTS]>,
    pub blend_weights: Option<[f32; BLEND_SLOTS]>,
    pub tex_coord: Option<[f32; 2]>,
    pub color: Option<[f32; 4]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshDump {
    pub features: u8,
    pub groups: Vec<GroupDump>,
    pub vertex_count: u32,
    pub index_count: u16,
    pub vertices: Vec<VertexDump>,
    pub indices: Vec<u16>,
}

/// Decode a complete asset file of any kind
pub fn reflect<R: Read>(reader: R) -> Result<Reflection, FormatError> {
    let mut r = BinaryReader::new(reader);
    let magic = r.read_magic()?;
    let kind = FileKind::from_magic(magic).ok_or(FormatError::UnknownMagic(magic))?;

    let reflection = match kind {
        FileKind::Registry => Reflection::Registry(reflect_registry(&mut r)?),
        FileKind::Skeleton => Reflection::Skeleton(reflect_skeleton(&mut r)?),
        FileKind::Animation => Reflection::Animation(reflect_animation(&mut r)?),
        FileKind::Mesh => Reflection::Mesh(reflect_mesh(&mut r)?),
    };

    r.finish()?;
    Ok(reflection)
}

fn read_floats<R: Read, const N: usize>(r: &mut BinaryReader<R>) -> Result<[f32; N], FormatError> {
    let mut out = [0.0f32; N];
    for f in out.iter_mut() {
        *f = r.read_f32()?;
    }
    Ok(out)
}

fn reflect_registry<R: Read>(r: &mut BinaryReader<R>) -> Result<RegistryDump, FormatError> {
    let count = r.read_u16()?;
    let mut names = Vec::with_capacity(count as usize);
    for _ in 0..count {
        names.push(r.read_string()?);
    }
    Ok(RegistryDump { names })
}

fn reflect_skeleton<R: Read>(r: &mut BinaryReader<R>) -> Result<SkeletonDump, FormatError> {
    let count = r.read_u16()?;
    let mut relative = Vec::with_capacity(count as usize);
    let mut offset = Vec::with_capacity(count as usize);

    for _ in 0..count {
        relative.push(read_floats::<_, 16>(r)?);
        offset.push(read_floats::<_, 16>(r)?);
    }

    let mut parents = Vec::with_capacity(count as usize);
    for _ in 0..count {
        parents.push(r.read_u16()?);
    }

    Ok(SkeletonDump {
        relative,
        offset,
        parents,
    })
}

fn reflect_animation<R: Read>(r: &mut BinaryReader<R>) -> Result<AnimationDump, FormatError> {
    let duration = r.read_f32()?;
    let track_count = r.read_u16()?;

    let mut tracks = Vec::with_capacity(track_count as usize);
    for _ in 0..track_count {
        let bone = r.read_u16()?;

        let mut position_keys = Vec::new();
        for _ in 0..r.read_u16()? {
            position_keys.push((r.read_f32()?, read_floats::<_, 3>(r)?));
        }

        let mut rotation_keys = Vec::new();
        for _ in 0..r.read_u16()? {
            rotation_keys.push((r.read_f32()?, read_floats::<_, 4>(r)?));
        }

        let mut scale_keys = Vec::new();
        for _ in 0..r.read_u16()? {
            scale_keys.push((r.read_f32()?, read_floats::<_, 3>(r)?));
        }

        tracks.push(TrackDump {
            bone,
            position_keys,
            rotation_keys,
            scale_keys,
        });
    }

    Ok(AnimationDump { duration, tracks })
}

fn reflect_mesh<R: Read>(r: &mut BinaryReader<R>) -> Result<MeshDump, FormatError> {
    let features = r.read_u8()?;
    let group_count = r.read_u8()?;
    let vertex_count = r.read_u32()?;
    let index_count = r.read_u16()?;

    let mut groups = Vec::with_capacity(group_count as usize);
    for _ in 0..group_count {
        groups.push(GroupDump {
            kind: r.read_u8()?,
            start: r.read_u16()?,
            count: r.read_u16()?,
        });
    }

    let mut vertices = Vec::new();
    for _ in 0..vertex_count {
        let mut v = VertexDump::default();
        if features & FEATURE_POSITION != 0 {
            v.position = Some(read_floats(r)?);
        }
        if features & FEATURE_NORMAL != 0 {
            v.normal = Some(read_floats(r)?);
        }
        if features & FEATURE_TANGENT != 0 {
            v.tangent = Some(read_floats(r)?);
            v.binormal = Some(read_floats(r)?);
        }
        if features & FEATURE_BLEND != 0 {
            v.blend_indices = Some(read_floats(r)?);
            v.blend_weights = Some(read_floats(r)?);
        }
        if features & FEATURE_TEX_COORD != 0 {
            v.tex_coord = Some(read_floats(r)?);
        }
        if features & FEATURE_COLOR != 0 {
            v.color = Some(read_floats(r)?);
        }
        vertices.push(v);
    }

    let mut indices = Vec::with_capacity(index_count as usize);
    for _ in 0..index_count {
        indices.push(r.read_u16()?);
    }

    Ok(MeshDump {
        features,
        groups,
        vertex_count,
        index_count,
        vertices,
        indices,
    })
}

// ============================================================================
// Text rendering
// ============================================================================

fn write_matrix(f: &mut fmt::Formatter<'_>, m: &[f32; 16]) -> fmt::Result {
    // Column-major storage, printed one row per line
    for row in 0..4 {
        writeln!(
            f,
            "[{:7.4} {:7.4} {:7.4} {:7.4}]",
            m[row],
            m[4 + row],
            m[8 + row],
            m[12 + row]
        )?;
    }
    Ok(())
}

impl fmt::Display for Reflection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reflection::Registry(dump) => dump.fmt(f),
            Reflection::Skeleton(dump) => dump.fmt(f),
            Reflection::Animation(dump) => dump.fmt(f),
            Reflection::Mesh(dump) => dump.fmt(f),
        }
    }
}

impl fmt::Display for RegistryDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} bones", self.names.len())?;
        for (bone, name) in self.names.iter().enumerate() {
            writeln!(f, "Bone: {bone} Name: {name}")?;
        }
        writeln!(f, "End of animation set file")
    }
}

impl fmt::Display for SkeletonDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} bones", self.relative.len())?;
        for (bone, (relative, offset)) in self.relative.iter().zip(&self.offset).enumerate() {
            writeln!(f, "Bone: {bone}")?;
            writeln!(f, "Bind pose relative transform")?;
            write_matrix(f, relative)?;
            writeln!(f, "Offset matrix (inverse of full bind pose transform)")?;
            write_matrix(f, offset)?;
        }

        writeln!(f, "Bone parent list")?;
        for (bone, &parent) in self.parents.iter().enumerate() {
            if parent as usize == bone {
                writeln!(f, "Bone: {bone} Root")?;
            } else {
                writeln!(f, "Bone: {bone} Parent: {parent}")?;
            }
        }
        writeln!(f, "End of skeleton file")
    }
}

impl fmt::Display for AnimationDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Duration {} seconds", self.duration)?;
        writeln!(f, "{} bones", self.tracks.len())?;

        for track in &self.tracks {
            writeln!(f, "Bone index {}", track.bone)?;

            writeln!(f, "{} Position Keys", track.position_keys.len())?;
            for (time, [x, y, z]) in &track.position_keys {
                writeln!(f, "Time {time} Position ({x}, {y}, {z})")?;
            }

            writeln!(f, "{} Rotation Keys", track.rotation_keys.len())?;
            for (time, [x, y, z, w]) in &track.rotation_keys {
                writeln!(f, "Time {time} Rotation quat XYZW ({x}, {y}, {z}, {w})")?;
            }

            writeln!(f, "{} Scaling Keys", track.scale_keys.len())?;
            for (time, [x, y, z]) in &track.scale_keys {
                writeln!(f, "Time {time} Scale ({x}, {y}, {z})")?;
            }
        }
        writeln!(f, "End of animation file")
    }
}

impl fmt::Display for MeshDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [
            (FEATURE_POSITION, "positions"),
            (FEATURE_NORMAL, "normals"),
            (FEATURE_TANGENT, "tangents and binormals"),
            (FEATURE_TEX_COORD, "texture coords"),
            (FEATURE_BLEND, "blend data"),
            (FEATURE_COLOR, "colors"),
        ];
        for (flag, name) in flags {
            if self.features & flag != 0 {
                writeln!(f, "Has {name}")?;
            } else {
                writeln!(f, "Doesn't have {name}")?;
            }
        }

        writeln!(f, "{} Primitive Groups", self.groups.len())?;
        writeln!(f, "{} Vertices", self.vertex_count)?;
        writeln!(f, "{} Indices", self.index_count)?;

        for (i, group) in self.groups.iter().enumerate() {
            let kind = PrimitiveType::from_u8(group.kind).map_or("Unknown", |k| k.name());
            writeln!(f, "Group {i}")?;
            writeln!(f, "{}: {kind}", group.kind)?;
            writeln!(f, "Starting Index: {}", group.start)?;
            writeln!(f, "Number of elements: {}", group.count)?;
        }

        for (i, v) in self.vertices.iter().enumerate() {
            writeln!(f, "Vertex {i}")?;
            if let Some([x, y, z]) = v.position {
                writeln!(f, "Position ({x}, {y}, {z})")?;
            }
            if let Some([x, y, z]) = v.normal {
                writeln!(f, "Normal ({x}, {y}, {z})")?;
            }
            if let (Some([tx, ty, tz]), Some([bx, by, bz])) = (v.tangent, v.binormal) {
                writeln!(f, "Tangent ({tx}, {ty}, {tz})")?;
                writeln!(f, "Binormal ({bx}, {by}, {bz})")?;
            }
            if let (Some(ind), Some(wt)) = (v.blend_indices, v.blend_weights) {
                writeln!(f, "Blend indices in float {ind:?}")?;
                writeln!(f, "Blend weights {wt:?}")?;
            }
            if let Some([s, t]) = v.tex_coord {
                writeln!(f, "Texture Coordinates ({s}, {t})")?;
            }
            if let Some([r, g, b, a]) = v.color {
                writeln!(f, "Vertex Color RGBA ({r}, {g}, {b}, {a})")?;
            }
        }

        for (i, index) in self.indices.iter().enumerate() {
            writeln!(f, "Index {i} {index}")?;
        }
        writeln!(f, "End of mesh file")
    }
}
