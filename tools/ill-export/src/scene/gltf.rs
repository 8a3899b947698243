//! glTF/GLB importer
//!
//! Converts a glTF document into a [`Scene`]:
//! - every node, with its local matrix and parent link
//! - every triangle primitive of every mesh node, with its skin turned into
//!   per-bone weight lists
//! - every animation, one channel per animated node
//!
//! glTF key times are already in seconds, so clips use one tick per second.

use anyhow::{Context, Result, bail};
use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
use gltf::animation::Interpolation;
use gltf::animation::util::ReadOutputs;
use gltf::mesh::Mode;
use hashbrown::HashMap;
use std::path::Path;

use super::{MeshBone, NodeChannel, NodeId, Scene, SceneAnimation, SceneMesh, SceneNode};

impl Scene {
    /// Import a glTF or GLB file
    pub fn from_gltf(path: &Path) -> Result<Scene> {
        let (document, buffers, _images) =
            gltf::import(path).with_context(|| format!("Failed to load glTF: {:?}", path))?;

        let nodes = read_nodes(&document);
        let mut scene = Scene {
            nodes,
            meshes: Vec::new(),
            animations: Vec::new(),
        };

        for node in document.nodes() {
            let Some(mesh) = node.mesh() else {
                continue;
            };
            for primitive in mesh.primitives() {
                if primitive.mode() != Mode::Triangles {
                    tracing::warn!(
                        "Skipping primitive {} of mesh '{}': {:?} is not supported",
                        primitive.index(),
                        mesh.name().unwrap_or("unnamed"),
                        primitive.mode()
                    );
                    continue;
                }
                let scene_mesh = read_primitive(&scene, &node, &mesh, &primitive, &buffers)
                    .with_context(|| {
                        format!(
                            "Failed to read primitive {} of mesh '{}'",
                            primitive.index(),
                            mesh.name().unwrap_or("unnamed")
                        )
                    })?;
                scene.meshes.push(scene_mesh);
            }
        }

        for animation in document.animations() {
            scene
                .animations
                .push(read_animation(&scene, &animation, &buffers)?);
        }

        tracing::info!(
            "Imported {:?}: {} nodes, {} meshes, {} animations",
            path,
            scene.nodes.len(),
            scene.meshes.len(),
            scene.animations.len()
        );
        Ok(scene)
    }
}

fn node_name(node: &gltf::Node) -> String {
    node.name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node{}", node.index()))
}

fn read_nodes(document: &gltf::Document) -> Vec<SceneNode> {
    let mut nodes: Vec<SceneNode> = document
        .nodes()
        .map(|node| SceneNode {
            name: node_name(&node),
            transform: Mat4::from_cols_array_2d(&node.transform().matrix()),
            parent: None,
        })
        .collect();

    for node in document.nodes() {
        for child in node.children() {
            nodes[child.index()].parent = Some(node.index());
        }
    }
    nodes
}

fn read_primitive(
    scene: &Scene,
    node: &gltf::Node,
    mesh: &gltf::Mesh,
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
) -> Result<SceneMesh> {
    let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

    let positions: Vec<Vec3> = reader
        .read_positions()
        .context("No positions in mesh")?
        .map(Vec3::from_array)
        .collect();
    let vertex_count = positions.len();

    let normals: Option<Vec<Vec3>> = reader
        .read_normals()
        .map(|iter| iter.map(Vec3::from_array).collect());

    // Tangents need normals to derive the bitangent: cross(n, t) * w
    let tangents = match (&normals, reader.read_tangents()) {
        (Some(normals), Some(iter)) => Some(
            iter.zip(normals)
                .map(|(t, n)| {
                    let tangent = Vec3::new(t[0], t[1], t[2]);
                    (tangent, n.cross(tangent) * t[3])
                })
                .collect::<Vec<_>>(),
        ),
        (None, Some(_)) => {
            tracing::warn!("Mesh has tangents but no normals, ignoring tangents");
            None
        }
        _ => None,
    };

    let tex_coords: Option<Vec<Vec2>> = reader
        .read_tex_coords(0)
        .map(|iter| iter.into_f32().map(Vec2::from_array).collect());

    let colors: Option<Vec<Vec4>> = reader
        .read_colors(0)
        .map(|iter| iter.into_rgba_f32().map(Vec4::from_array).collect());

    let indices: Vec<u32> = match reader.read_indices() {
        Some(iter) => iter.into_u32().collect(),
        None => (0..vertex_count as u32).collect(),
    };
    if indices.len() % 3 != 0 {
        bail!("Triangle list has {} indices", indices.len());
    }
    let faces = indices
        .chunks_exact(3)
        .map(|f| [f[0], f[1], f[2]])
        .collect();

    let bones = match node.skin() {
        Some(skin) => read_skin_weights(
            scene,
            &skin,
            reader.read_joints(0).map(|iter| iter.into_u16().collect()),
            reader.read_weights(0).map(|iter| iter.into_f32().collect()),
        )?,
        None => Vec::new(),
    };

    Ok(SceneMesh {
        name: mesh.name().unwrap_or_default().to_string(),
        material_name: primitive.material().name().unwrap_or_default().to_string(),
        positions,
        normals,
        tangents,
        tex_coords,
        colors,
        bones,
        faces,
    })
}

/// Turn JOINTS_0/WEIGHTS_0 into one weight list per skin joint. Zero weights
/// and joints that end up with no weights are dropped.
fn read_skin_weights(
    scene: &Scene,
    skin: &gltf::Skin,
    joint_sets: Option<Vec<[u16; 4]>>,
    weight_sets: Option<Vec<[f32; 4]>>,
) -> Result<Vec<MeshBone>> {
    let joints: Vec<NodeId> = skin.joints().map(|j| j.index()).collect();

    let (Some(joint_sets), Some(weight_sets)) = (joint_sets, weight_sets) else {
        tracing::warn!(
            "Skin '{}' is bound but the mesh has no JOINTS_0/WEIGHTS_0, ignoring skinning",
            skin.name().unwrap_or("unnamed")
        );
        return Ok(Vec::new());
    };

    let mut weights: Vec<Vec<(u32, f32)>> = vec![Vec::new(); joints.len()];
    for (vertex, (joint_set, weight_set)) in joint_sets.iter().zip(&weight_sets).enumerate() {
        for (&joint, &weight) in joint_set.iter().zip(weight_set) {
            if weight == 0.0 {
                continue;
            }
            let Some(list) = weights.get_mut(joint as usize) else {
                bail!(
                    "Joint {} at vertex {} is outside the {}-joint skin",
                    joint,
                    vertex,
                    joints.len()
                );
            };
            list.push((vertex as u32, weight));
        }
    }

    Ok(joints
        .into_iter()
        .zip(weights)
        .filter(|(_, weights)| !weights.is_empty())
        .map(|(node, weights)| MeshBone {
            name: scene.node(node).name.clone(),
            weights,
        })
        .collect())
}

fn read_animation(
    scene: &Scene,
    animation: &gltf::Animation,
    buffers: &[gltf::buffer::Data],
) -> Result<SceneAnimation> {
    let name = animation
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("animation{}", animation.index()));

    let mut channels: Vec<NodeChannel> = Vec::new();
    let mut channel_of_node: HashMap<NodeId, usize> = HashMap::new();
    let mut duration = 0.0f64;

    for channel in animation.channels() {
        let node = channel.target().node().index();
        let reader = channel.reader(|buffer| Some(&buffers[buffer.index()]));

        let times: Vec<f64> = reader
            .read_inputs()
            .with_context(|| format!("Animation '{}' channel has no key times", name))?
            .map(f64::from)
            .collect();
        if let Some(&last) = times.last() {
            duration = duration.max(last);
        }

        // Cubic spline outputs hold (in-tangent, value, out-tangent) per key
        let cubic = channel.sampler().interpolation() == Interpolation::CubicSpline;
        let pick = |i: usize| if cubic { i * 3 + 1 } else { i };

        let slot = *channel_of_node.entry(node).or_insert_with(|| {
            channels.push(NodeChannel {
                node_name: scene.node(node).name.clone(),
                ..Default::default()
            });
            channels.len() - 1
        });
        let target = &mut channels[slot];

        match reader.read_outputs() {
            Some(ReadOutputs::Translations(iter)) => {
                let values: Vec<[f32; 3]> = iter.collect();
                for (i, &t) in times.iter().enumerate() {
                    if let Some(&v) = values.get(pick(i)) {
                        target.position_keys.push((t, Vec3::from_array(v)));
                    }
                }
            }
            Some(ReadOutputs::Rotations(iter)) => {
                let values: Vec<[f32; 4]> = iter.into_f32().collect();
                for (i, &t) in times.iter().enumerate() {
                    if let Some(&v) = values.get(pick(i)) {
                        target.rotation_keys.push((t, Quat::from_array(v)));
                    }
                }
            }
            Some(ReadOutputs::Scales(iter)) => {
                let values: Vec<[f32; 3]> = iter.collect();
                for (i, &t) in times.iter().enumerate() {
                    if let Some(&v) = values.get(pick(i)) {
                        target.scale_keys.push((t, Vec3::from_array(v)));
                    }
                }
            }
            _ => {} // Morph target weights are not exported
        }
    }

    Ok(SceneAnimation {
        name,
        duration_ticks: duration,
        ticks_per_second: 1.0,
        channels,
    })
}
