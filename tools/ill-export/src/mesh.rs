//! Mesh assembler (scene mesh -> .illmesh)
//!
//! Interleaves the attributes a scene mesh actually has into one float buffer
//! and flattens its triangles into u16 indices, keeping the original winding.
//! Skinned meshes get exactly four (bone, weight) slots per vertex, zero
//! padded. A vertex influenced by more than four bones is rejected rather
//! than trimmed.

use ill_common::{
    BinaryReader, BinaryWriter, FEATURE_BLEND, FEATURE_COLOR, FEATURE_NORMAL, FEATURE_POSITION,
    FEATURE_TANGENT, FEATURE_TEX_COORD, FormatError, MeshBuffer, PrimitiveGroup, PrimitiveType,
};
use ill_common::formats::{BLEND_SLOTS, MAX_INDICES, MAX_VERTICES};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{ExportError, Result};
use crate::files;
use crate::registry::BoneRegistry;
use crate::scene::SceneMesh;

/// A mesh ready to be written, always a single triangle group when freshly
/// imported
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledMesh {
    pub name: String,
    buffer: MeshBuffer,
}

/// Bone index -> weight for one vertex
type BlendMap = BTreeMap<u16, f32>;

fn check_len<T>(what: &str, values: &Option<Vec<T>>, vertex_count: usize) -> Result<()> {
    match values {
        Some(values) if values.len() != vertex_count => Err(FormatError::Invalid(format!(
            "mesh has {} {} for {} vertices",
            values.len(),
            what,
            vertex_count
        ))
        .into()),
        _ => Ok(()),
    }
}

/// Per-vertex blend maps built from every bone's weight list
fn blend_maps(mesh: &SceneMesh, registry: &BoneRegistry) -> Result<Vec<BlendMap>> {
    let mut maps = vec![BlendMap::new(); mesh.vertex_count()];

    for bone in &mesh.bones {
        let index = registry.require(&bone.name)?;
        for &(vertex, weight) in &bone.weights {
            let map = maps.get_mut(vertex as usize).ok_or_else(|| {
                FormatError::Invalid(format!(
                    "bone '{}' weights vertex {} but mesh '{}' has {} vertices",
                    bone.name,
                    vertex,
                    mesh.name,
                    mesh.vertex_count()
                ))
            })?;
            map.insert(index, weight);
        }
    }

    for (vertex, map) in maps.iter().enumerate() {
        if map.len() > BLEND_SLOTS {
            tracing::error!(
                "Vertex {} of mesh '{}' is influenced by bones {:?}",
                vertex,
                mesh.name,
                map.keys().collect::<Vec<_>>()
            );
            return Err(ExportError::CapacityExceeded {
                what: "bone influence",
                count: map.len(),
                max: BLEND_SLOTS,
            });
        }
    }

    Ok(maps)
}

impl AssembledMesh {
    /// Build the vertex and index buffers of one scene mesh
    pub fn import(mesh: &SceneMesh, registry: &BoneRegistry) -> Result<Self> {
        let vertex_count = mesh.vertex_count();
        if vertex_count > MAX_VERTICES {
            return Err(ExportError::CapacityExceeded {
                what: "vertex",
                count: vertex_count,
                max: MAX_VERTICES,
            });
        }
        let index_count = mesh.faces.len() * 3;
        if index_count > MAX_INDICES {
            return Err(ExportError::CapacityExceeded {
                what: "index",
                count: index_count,
                max: MAX_INDICES,
            });
        }

        check_len("normals", &mesh.normals, vertex_count)?;
        check_len("tangents", &mesh.tangents, vertex_count)?;
        check_len("texture coordinates", &mesh.tex_coords, vertex_count)?;
        check_len("colors", &mesh.colors, vertex_count)?;

        let blend = if mesh.has_bones() {
            Some(blend_maps(mesh, registry)?)
        } else {
            None
        };

        let mut features = FEATURE_POSITION;
        if mesh.normals.is_some() {
            features |= FEATURE_NORMAL;
        }
        if mesh.tangents.is_some() {
            features |= FEATURE_TANGENT;
        }
        if blend.is_some() {
            features |= FEATURE_BLEND;
        }
        if mesh.tex_coords.is_some() {
            features |= FEATURE_TEX_COORD;
        }
        if mesh.colors.is_some() {
            features |= FEATURE_COLOR;
        }

        let mut vertex_data = Vec::with_capacity(vertex_count * ill_common::vertex_stride(features));
        for v in 0..vertex_count {
            vertex_data.extend_from_slice(&mesh.positions[v].to_array());
            if let Some(normals) = &mesh.normals {
                vertex_data.extend_from_slice(&normals[v].to_array());
            }
            if let Some(tangents) = &mesh.tangents {
                let (tangent, bitangent) = tangents[v];
                vertex_data.extend_from_slice(&tangent.to_array());
                vertex_data.extend_from_slice(&bitangent.to_array());
            }
            if let Some(blend) = &blend {
                let mut indices = [0.0f32; BLEND_SLOTS];
                let mut weights = [0.0f32; BLEND_SLOTS];
                for (slot, (&bone, &weight)) in blend[v].iter().enumerate() {
                    indices[slot] = bone as f32;
                    weights[slot] = weight;
                }
                vertex_data.extend_from_slice(&indices);
                vertex_data.extend_from_slice(&weights);
            }
            if let Some(tex_coords) = &mesh.tex_coords {
                vertex_data.extend_from_slice(&tex_coords[v].to_array());
            }
            if let Some(colors) = &mesh.colors {
                vertex_data.extend_from_slice(&colors[v].to_array());
            }
        }

        let mut indices = Vec::with_capacity(index_count);
        for face in &mesh.faces {
            for &vertex in face {
                if vertex as usize >= vertex_count {
                    return Err(FormatError::Invalid(format!(
                        "face of mesh '{}' references vertex {} of {}",
                        mesh.name, vertex, vertex_count
                    ))
                    .into());
                }
                indices.push(vertex as u16);
            }
        }

        let buffer = MeshBuffer {
            features,
            groups: vec![PrimitiveGroup {
                kind: PrimitiveType::Triangles,
                start: 0,
                count: index_count as u16,
            }],
            vertex_count: vertex_count as u32,
            vertex_data,
            indices,
        };
        buffer.validate()?;

        tracing::info!(
            "Assembled mesh '{}': {} vertices, {} indices, features={:#04x}",
            mesh.name,
            vertex_count,
            index_count,
            features
        );

        Ok(Self {
            name: mesh.name.clone(),
            buffer,
        })
    }

    pub fn from_buffer(name: impl Into<String>, buffer: MeshBuffer) -> Self {
        Self {
            name: name.into(),
            buffer,
        }
    }

    pub fn buffer(&self) -> &MeshBuffer {
        &self.buffer
    }

    pub fn to_buffer(&self) -> MeshBuffer {
        self.buffer.clone()
    }

    pub fn into_buffer(self) -> MeshBuffer {
        self.buffer
    }

    pub fn read_from<R: Read>(r: &mut BinaryReader<R>) -> Result<MeshBuffer> {
        Ok(MeshBuffer::read_from(r)?)
    }

    /// Load a mesh file, named after its file stem
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let buffer = files::read_file(path, Self::read_from)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::from_buffer(name, buffer))
    }

    pub fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> Result<()> {
        self.buffer.write_to(w)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        files::encode(|w| self.write_to(w))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        files::write_file(path, &self.to_bytes()?)?;
        tracing::info!(
            "Exported mesh '{}' to {:?}: {} vertices, {} indices",
            self.name,
            path,
            self.buffer.vertex_count,
            self.buffer.indices.len()
        );
        Ok(())
    }
}
