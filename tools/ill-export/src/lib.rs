//! ill-export library
//!
//! Turns imported scenes into illmesh asset files: a shared bone registry,
//! per-scene skeletons, animation clips and meshes. Also merges existing mesh
//! files and dumps any asset file as text.

pub mod animation;
pub mod error;
pub mod files;
pub mod manifest;
pub mod merge;
pub mod mesh;
pub mod naming;
pub mod pipeline;
pub mod registry;
pub mod scene;
pub mod skeleton;

pub use error::{ExportError, Result};

// Re-export the builders
pub use animation::Animation;
pub use merge::merge;
pub use mesh::AssembledMesh;
pub use registry::{BoneRegistry, RegistryMode};
pub use skeleton::{BindPoseInverse, Skeleton};

// Re-export the importer contract
pub use scene::{MeshBone, NodeChannel, Scene, SceneAnimation, SceneMesh, SceneNode};

// Re-export pipeline entry points
pub use pipeline::{ExportJob, SceneJob, dump_files, merge_files};
