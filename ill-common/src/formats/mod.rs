//! illmesh binary asset formats
//!
//! Every file starts with an 8-byte big-endian magic tag that names its kind.
//! All other fields are little-endian; see [`crate::codec`].
//!
//! | Kind      | Magic      | Extension |
//! |-----------|------------|-----------|
//! | Registry  | `ILANSET0` | `.ilanset` |
//! | Skeleton  | `ILLSKEL0` | `.illskel` |
//! | Animation | `ILLANIM0` | `.illanim` |
//! | Mesh      | `ILLMESH1` | `.illmesh` |
//!
//! The skeleton file carries a parent list, but the hierarchy is owned by the
//! bone registry. A skeleton is only meaningful next to the registry it was
//! exported with.

pub mod animation;
pub mod mesh;
pub mod registry;
pub mod skeleton;

pub use animation::*;
pub use mesh::*;
pub use registry::*;
pub use skeleton::*;

/// Bone registry (animset) magic: `ILANSET0`
pub const REGISTRY_MAGIC: u64 = u64::from_be_bytes(*b"ILANSET0");
/// Skeleton magic: `ILLSKEL0`
pub const SKELETON_MAGIC: u64 = u64::from_be_bytes(*b"ILLSKEL0");
/// Animation clip magic: `ILLANIM0`
pub const ANIMATION_MAGIC: u64 = u64::from_be_bytes(*b"ILLANIM0");
/// Mesh magic: `ILLMESH1`
pub const MESH_MAGIC: u64 = u64::from_be_bytes(*b"ILLMESH1");

/// Kind of asset file, identified by its magic tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Registry,
    Skeleton,
    Animation,
    Mesh,
}

impl FileKind {
    pub fn from_magic(magic: u64) -> Option<Self> {
        match magic {
            REGISTRY_MAGIC => Some(Self::Registry),
            SKELETON_MAGIC => Some(Self::Skeleton),
            ANIMATION_MAGIC => Some(Self::Animation),
            MESH_MAGIC => Some(Self::Mesh),
            _ => None,
        }
    }

    pub fn magic(self) -> u64 {
        match self {
            Self::Registry => REGISTRY_MAGIC,
            Self::Skeleton => SKELETON_MAGIC,
            Self::Animation => ANIMATION_MAGIC,
            Self::Mesh => MESH_MAGIC,
        }
    }

    /// Default file extension (without the dot)
    pub fn extension(self) -> &'static str {
        match self {
            Self::Registry => "ilanset",
            Self::Skeleton => "illskel",
            Self::Animation => "illanim",
            Self::Mesh => "illmesh",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Registry => "Animation Set",
            Self::Skeleton => "Skeleton",
            Self::Animation => "Animation",
            Self::Mesh => "Mesh",
        }
    }
}

/// Render a magic value as its 8-character tag, escaping non-printable bytes
pub fn magic_tag(magic: u64) -> String {
    magic
        .to_be_bytes()
        .iter()
        .flat_map(|b| std::ascii::escape_default(*b))
        .map(char::from)
        .collect()
}
