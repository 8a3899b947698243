//! Shared binary formats for illmesh assets
//!
//! This crate holds everything that both sides of a file agree on:
//! - `ill-export` (asset pipeline) writes these formats
//! - runtime loaders and the `dump` tool read them back
//!
//! # Modules
//!
//! - [`codec`] - Fixed-endianness primitive reader/writer shared by every format
//! - [`formats`] - Bone registry, skeleton, animation and mesh file layouts
//! - [`reflect`] - Diagnostic decoder that renders any asset file as text

pub mod codec;
mod error;
pub mod formats;
pub mod reflect;

pub use codec::{BinaryReader, BinaryWriter};
pub use error::FormatError;

// Re-export commonly used format items
pub use formats::{
    // Animation
    AnimationData,
    BoneTrack,
    // Skeleton
    BoneTransforms,
    FileKind,
    KeyTime,
    // Mesh
    MeshBuffer,
    PrimitiveGroup,
    PrimitiveType,
    // Registry
    RegistryData,
    SkeletonData,
    VERTEX_LAYOUT,
    VertexAttribute,
    // Constants
    ANIMATION_MAGIC,
    FEATURE_BLEND,
    FEATURE_COLOR,
    FEATURE_NORMAL,
    FEATURE_POSITION,
    FEATURE_TANGENT,
    FEATURE_TEX_COORD,
    MESH_MAGIC,
    REGISTRY_MAGIC,
    SKELETON_MAGIC,
    vertex_stride,
};
