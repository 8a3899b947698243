//! Mesh merger (N single-group meshes -> one multi-group mesh)
//!
//! Inputs are laid out back to back in input order, without sharing
//! vertices. Each input becomes one primitive group; its indices are shifted
//! by the vertex count of every mesh before it and its group start by their
//! index count.
//!
//! The merged feature mask is the union of the inputs. An input lacking one
//! of the union's attributes gets zeros in that slot so every vertex has the
//! same layout.

use ill_common::formats::{MAX_INDICES, MAX_VERTICES};
use ill_common::{FormatError, MeshBuffer, PrimitiveGroup, VERTEX_LAYOUT, vertex_stride};

use crate::error::{ExportError, Result};

/// Merge single-group meshes into one buffer with one group per input
pub fn merge(meshes: &[MeshBuffer]) -> Result<MeshBuffer> {
    if meshes.is_empty() {
        return Err(FormatError::Invalid("no meshes to merge".to_string()).into());
    }

    for (i, mesh) in meshes.iter().enumerate() {
        if mesh.groups.len() != 1 {
            return Err(FormatError::Invalid(format!(
                "mesh {} has {} primitive groups, only single-group meshes can be merged",
                i,
                mesh.groups.len()
            ))
            .into());
        }
        mesh.validate()?;
    }

    let features = meshes.iter().fold(0u8, |acc, m| acc | m.features);
    let vertex_total: usize = meshes.iter().map(|m| m.vertex_count as usize).sum();
    let index_total: usize = meshes.iter().map(|m| m.indices.len()).sum();

    if vertex_total > MAX_VERTICES {
        return Err(ExportError::CapacityExceeded {
            what: "vertex",
            count: vertex_total,
            max: MAX_VERTICES,
        });
    }
    if index_total > MAX_INDICES {
        return Err(ExportError::CapacityExceeded {
            what: "index",
            count: index_total,
            max: MAX_INDICES,
        });
    }
    if meshes.len() > u8::MAX as usize {
        return Err(ExportError::CapacityExceeded {
            what: "primitive group",
            count: meshes.len(),
            max: u8::MAX as usize,
        });
    }

    let mut groups = Vec::with_capacity(meshes.len());
    let mut vertex_data = Vec::with_capacity(vertex_total * vertex_stride(features));
    let mut indices = Vec::with_capacity(index_total);

    // Totals were checked above, so both offsets fit their fields
    let mut vertex_offset = 0usize;
    let mut index_offset = 0usize;

    for mesh in meshes {
        let group = mesh.groups[0];
        groups.push(PrimitiveGroup {
            kind: group.kind,
            start: (group.start as usize + index_offset) as u16,
            count: group.count,
        });

        for v in 0..mesh.vertex_count as usize {
            let mut source = mesh.vertex(v).ok_or_else(|| {
                FormatError::Invalid(format!("vertex {v} missing from mesh vertex data"))
            })?;
            for attribute in VERTEX_LAYOUT.iter().filter(|a| features & a.flag != 0) {
                if mesh.features & attribute.flag != 0 {
                    let (values, rest) = source.split_at(attribute.floats);
                    vertex_data.extend_from_slice(values);
                    source = rest;
                } else {
                    vertex_data.extend(std::iter::repeat_n(0.0f32, attribute.floats));
                }
            }
        }

        indices.extend(
            mesh.indices
                .iter()
                .map(|&index| (index as usize + vertex_offset) as u16),
        );

        vertex_offset += mesh.vertex_count as usize;
        index_offset += mesh.indices.len();
    }

    let merged = MeshBuffer {
        features,
        groups,
        vertex_count: vertex_total as u32,
        vertex_data,
        indices,
    };
    merged.validate()?;

    tracing::info!(
        "Merged {} meshes: {} vertices, {} indices, features={:#04x}",
        meshes.len(),
        vertex_total,
        index_total,
        features
    );
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ill_common::{FEATURE_NORMAL, FEATURE_POSITION, FEATURE_TEX_COORD, PrimitiveType};

    fn triangles(features: u8, vertex_data: Vec<f32>, indices: Vec<u16>) -> MeshBuffer {
        let vertex_count = (vertex_data.len() / vertex_stride(features)) as u32;
        MeshBuffer {
            features,
            groups: vec![PrimitiveGroup {
                kind: PrimitiveType::Triangles,
                start: 0,
                count: indices.len() as u16,
            }],
            vertex_count,
            vertex_data,
            indices,
        }
    }

    /// 4 vertices, 6 indices
    fn quad() -> MeshBuffer {
        triangles(
            FEATURE_POSITION,
            vec![
                0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0,
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    /// 5 vertices, 9 indices
    fn fan() -> MeshBuffer {
        triangles(
            FEATURE_POSITION,
            (0..15).map(|i| i as f32).collect(),
            vec![0, 1, 2, 0, 2, 3, 0, 3, 4],
        )
    }

    #[test]
    fn test_offsets_with_differing_sizes() {
        let a = fan();
        let b = quad();
        let merged = merge(&[a.clone(), b.clone()]).unwrap();

        assert_eq!(merged.vertex_count, 9);
        assert_eq!(merged.indices.len(), 15);
        assert_eq!(merged.groups.len(), 2);
        assert_eq!((merged.groups[0].start, merged.groups[0].count), (0, 9));
        assert_eq!((merged.groups[1].start, merged.groups[1].count), (9, 6));

        assert_eq!(&merged.indices[..9], &a.indices[..]);
        for (merged_index, original) in merged.indices[9..].iter().zip(&b.indices) {
            assert_eq!(*merged_index, original + 5);
        }
        assert_eq!(merged.vertex(5).unwrap(), b.vertex(0).unwrap());
        assert_eq!(merged.vertex(8).unwrap(), b.vertex(3).unwrap());
    }

    #[test]
    fn test_three_way_offsets() {
        let merged = merge(&[quad(), fan(), quad()]).unwrap();
        let starts: Vec<u16> = merged.groups.iter().map(|g| g.start).collect();
        assert_eq!(starts, vec![0, 6, 15]);
        assert_eq!(merged.indices[15], 9);
        assert_eq!(*merged.indices.last().unwrap(), 3 + 9);
    }

    #[test]
    fn test_feature_union_zero_fills() {
        let lit = triangles(
            FEATURE_POSITION | FEATURE_NORMAL,
            vec![1.0, 2.0, 3.0, 0.0, 0.0, 1.0],
            vec![0, 0, 0],
        );
        let textured = triangles(
            FEATURE_POSITION | FEATURE_TEX_COORD,
            vec![4.0, 5.0, 6.0, 0.5, 0.5],
            vec![0, 0, 0],
        );
        let merged = merge(&[lit, textured]).unwrap();

        assert_eq!(
            merged.features,
            FEATURE_POSITION | FEATURE_NORMAL | FEATURE_TEX_COORD
        );
        assert_eq!(merged.vertex(0).unwrap(), &[1.0, 2.0, 3.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        assert_eq!(merged.vertex(1).unwrap(), &[4.0, 5.0, 6.0, 0.0, 0.0, 0.0, 0.5, 0.5]);
    }

    #[test]
    fn test_multi_group_input_rejected() {
        let merged = merge(&[quad(), fan()]).unwrap();
        assert!(matches!(
            merge(&[merged, quad()]),
            Err(ExportError::Format(FormatError::Invalid(_)))
        ));
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(
            merge(&[]),
            Err(ExportError::Format(FormatError::Invalid(_)))
        ));
    }

    #[test]
    fn test_vertex_overflow() {
        let big = MeshBuffer {
            features: 0,
            groups: vec![PrimitiveGroup {
                kind: PrimitiveType::Points,
                start: 0,
                count: 0,
            }],
            vertex_count: 40000,
            vertex_data: Vec::new(),
            indices: Vec::new(),
        };
        assert!(matches!(
            merge(&[big.clone(), big]),
            Err(ExportError::CapacityExceeded { what: "vertex", .. })
        ));
    }
}
