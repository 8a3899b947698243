//! Integration tests for the export pipeline.
//!
//! Scenes are built in memory, exported to a temporary directory and read
//! back through the typed loaders and the reflector.

use glam::{Mat4, Quat, Vec3};
use std::path::Path;
use tempfile::tempdir;

use ill_common::reflect::Reflection;
use ill_common::{FEATURE_BLEND, FEATURE_POSITION, PrimitiveType};
use ill_export::pipeline::dump_file;
use ill_export::{
    AssembledMesh, BoneRegistry, ExportError, ExportJob, MeshBone, NodeChannel, RegistryMode,
    Scene, SceneAnimation, SceneJob, SceneMesh, Skeleton, merge_files,
};

/// Unit quad: 4 vertices, 2 triangles, positions only
fn quad_scene(name: &str) -> Scene {
    let mut scene = Scene::new();
    scene.add_node("root", Mat4::IDENTITY, None);
    scene.meshes.push(SceneMesh {
        name: name.into(),
        positions: vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ],
        faces: vec![[0, 1, 2], [0, 2, 3]],
        ..Default::default()
    });
    scene
}

/// root -> spine -> head, with a mesh skinned to the head only
fn chain_scene() -> Scene {
    let mut scene = Scene::new();
    let root = scene.add_node("root", Mat4::from_translation(Vec3::Y), None);
    let spine = scene.add_node("spine", Mat4::from_translation(Vec3::Y), Some(root));
    scene.add_node(
        "head",
        Mat4::from_translation(Vec3::new(0.0, 0.5, 0.0)),
        Some(spine),
    );
    scene.meshes.push(SceneMesh {
        name: "face".into(),
        positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
        bones: vec![MeshBone {
            name: "head".into(),
            weights: vec![(0, 1.0), (1, 1.0), (2, 1.0)],
        }],
        faces: vec![[0, 1, 2]],
        ..Default::default()
    });
    scene.animations.push(SceneAnimation {
        name: "nod".into(),
        duration_ticks: 30.0,
        ticks_per_second: 30.0,
        channels: vec![NodeChannel {
            node_name: "head".into(),
            rotation_keys: vec![
                (0.0, Quat::IDENTITY),
                (15.0, Quat::from_rotation_x(0.5)),
                (30.0, Quat::IDENTITY),
            ],
            ..Default::default()
        }],
    });
    scene
}

fn single_scene_job(registry: &Path, scene: SceneJob) -> ExportJob {
    let mut job = ExportJob::new(registry);
    job.scenes.push(scene);
    job
}

#[test]
fn quad_mesh_reflects_positions_only() {
    let dir = tempdir().unwrap();
    let mut scene = SceneJob::new("quad.glb");
    scene.mesh = Some(dir.path().join("quad.illmesh"));
    let job = single_scene_job(&dir.path().join("quad.ilanset"), scene);

    let written = job.run_with_scenes(&[quad_scene("")]).unwrap();
    assert_eq!(
        written,
        vec![dir.path().join("quad.ilanset"), dir.path().join("quad.illmesh")]
    );

    let Reflection::Mesh(dump) = dump_file(&dir.path().join("quad.illmesh")).unwrap() else {
        panic!("expected a mesh file");
    };
    assert_eq!(dump.features, FEATURE_POSITION);
    assert_eq!(dump.groups.len(), 1);
    assert_eq!(dump.groups[0].kind, PrimitiveType::Triangles as u8);
    assert_eq!(dump.vertex_count, 4);
    assert_eq!(dump.index_count, 6);
    assert_eq!(dump.indices, vec![0, 1, 2, 0, 2, 3]);
    assert_eq!(dump.vertices[2].position, Some([1.0, 1.0, 0.0]));
    assert!(dump.vertices.iter().all(|v| v.normal.is_none()));

    let text = dump.to_string();
    assert!(text.contains("Has positions"));
    assert!(text.contains("Doesn't have normals"));

    // Nothing was skinned, so the registry is empty
    let Reflection::Registry(registry) = dump_file(&dir.path().join("quad.ilanset")).unwrap()
    else {
        panic!("expected a registry file");
    };
    assert!(registry.names.is_empty());
}

#[test]
fn bone_chain_exports_parents_and_offsets() {
    let dir = tempdir().unwrap();
    let mut scene = SceneJob::new("chain.glb");
    scene.skeleton = Some(dir.path().join("chain.illskel"));
    scene.mesh = Some(dir.path().join("chain.illmesh"));
    let job = single_scene_job(&dir.path().join("chain.ilanset"), scene);
    job.run_with_scenes(&[chain_scene()]).unwrap();

    // Mesh bones first, then ancestors walking up
    let registry = BoneRegistry::load(&dir.path().join("chain.ilanset")).unwrap();
    assert_eq!(registry.mode(), RegistryMode::Fixed);
    assert_eq!(registry.names().unwrap(), vec!["head", "spine", "root"]);

    let Reflection::Skeleton(dump) = dump_file(&dir.path().join("chain.illskel")).unwrap() else {
        panic!("expected a skeleton file");
    };
    assert_eq!(dump.parents, vec![1, 2, 2]);

    let skeleton = Skeleton::load(&dir.path().join("chain.illskel")).unwrap();
    let expected_offsets = [
        Mat4::from_translation(Vec3::new(0.0, -2.5, 0.0)),
        Mat4::from_translation(Vec3::new(0.0, -2.0, 0.0)),
        Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0)),
    ];
    for (index, expected) in expected_offsets.iter().enumerate() {
        let bone = skeleton.bone(index as u16).unwrap();
        assert!(
            bone.offset.abs_diff_eq(*expected, 1e-6),
            "bone {} offset {:?}",
            index,
            bone.offset
        );
    }
    assert_eq!(
        skeleton.bone(0).unwrap().relative,
        Mat4::from_translation(Vec3::new(0.0, 0.5, 0.0))
    );

    // The head's vertices point at bone 0 with full weight
    let Reflection::Mesh(mesh) = dump_file(&dir.path().join("chainface.illmesh")).unwrap() else {
        panic!("expected a mesh file");
    };
    assert_eq!(mesh.features, FEATURE_POSITION | FEATURE_BLEND);
    assert_eq!(mesh.vertices[0].blend_indices, Some([0.0, 0.0, 0.0, 0.0]));
    assert_eq!(mesh.vertices[0].blend_weights, Some([1.0, 0.0, 0.0, 0.0]));
}

#[test]
fn animation_keys_exported_in_seconds() {
    let dir = tempdir().unwrap();
    let mut scene = SceneJob::new("chain.glb");
    scene.animation = Some(dir.path().join("chain.illanim"));
    let job = single_scene_job(&dir.path().join("chain.ilanset"), scene);
    job.run_with_scenes(&[chain_scene()]).unwrap();

    let Reflection::Animation(dump) = dump_file(&dir.path().join("chainnod.illanim")).unwrap()
    else {
        panic!("expected an animation file");
    };
    assert_eq!(dump.duration, 1.0);
    assert_eq!(dump.tracks.len(), 1);

    let track = &dump.tracks[0];
    assert_eq!(track.bone, 0);
    let times: Vec<f32> = track.rotation_keys.iter().map(|(t, _)| *t).collect();
    assert_eq!(times, vec![0.0, 0.5, 1.0]);
    assert!(track.position_keys.is_empty());
    assert!(track.scale_keys.is_empty());
}

#[test]
fn existing_registry_keeps_indices_and_is_not_rewritten() {
    let dir = tempdir().unwrap();
    let registry_path = dir.path().join("actor.ilanset");

    let mut first = SceneJob::new("chain.glb");
    first.skeleton = Some(dir.path().join("first.illskel"));
    single_scene_job(&registry_path, first)
        .run_with_scenes(&[chain_scene()])
        .unwrap();
    let original = std::fs::read(&registry_path).unwrap();

    // Same bones declared in a different order
    let mut reordered = chain_scene();
    reordered.meshes[0].bones = vec![
        MeshBone {
            name: "root".into(),
            weights: vec![(0, 1.0)],
        },
        MeshBone {
            name: "head".into(),
            weights: vec![(1, 1.0), (2, 1.0)],
        },
    ];
    let mut second = SceneJob::new("chain.glb");
    second.skeleton = Some(dir.path().join("second.illskel"));
    let written = single_scene_job(&registry_path, second)
        .run_with_scenes(&[reordered])
        .unwrap();

    assert_eq!(written, vec![dir.path().join("second.illskel")]);
    assert_eq!(std::fs::read(&registry_path).unwrap(), original);
    assert_eq!(
        std::fs::read(dir.path().join("first.illskel")).unwrap(),
        std::fs::read(dir.path().join("second.illskel")).unwrap()
    );
}

#[test]
fn fixed_registry_rejects_new_bone_without_writing() {
    let dir = tempdir().unwrap();
    let registry_path = dir.path().join("actor.ilanset");
    single_scene_job(&registry_path, SceneJob::new("chain.glb"))
        .run_with_scenes(&[chain_scene()])
        .unwrap();

    let mut tailed = chain_scene();
    let root = tailed.find_node("root").unwrap();
    tailed.add_node("tail", Mat4::IDENTITY, Some(root));
    tailed.meshes[0].bones.push(MeshBone {
        name: "tail".into(),
        weights: vec![(0, 0.5)],
    });

    let mut scene = SceneJob::new("tailed.glb");
    scene.mesh = Some(dir.path().join("tailed.illmesh"));
    scene.skeleton = Some(dir.path().join("tailed.illskel"));
    let err = single_scene_job(&registry_path, scene)
        .run_with_scenes(&[tailed])
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ExportError>(),
        Some(ExportError::RegistryConflict(_))
    ));
    assert!(!dir.path().join("tailedface.illmesh").exists());
    assert!(!dir.path().join("tailed.illskel").exists());
}

#[test]
fn failing_scene_leaves_no_partial_output() {
    let dir = tempdir().unwrap();

    let mut broken = quad_scene("broken");
    broken.meshes[0].faces.push([0, 1, 7]);

    let mut good = SceneJob::new("good.glb");
    good.mesh = Some(dir.path().join("good.illmesh"));
    let mut bad = SceneJob::new("bad.glb");
    bad.mesh = Some(dir.path().join("bad.illmesh"));

    let mut job = ExportJob::new(dir.path().join("actor.ilanset"));
    job.scenes = vec![good, bad];
    assert!(job.run_with_scenes(&[quad_scene("ok"), broken]).is_err());

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn merged_scene_meshes_become_groups() {
    let dir = tempdir().unwrap();
    let mut scene = quad_scene("left");
    scene.meshes.push(quad_scene("right").meshes.remove(0));

    let mut scene_job = SceneJob::new("pair.glb");
    scene_job.mesh = Some(dir.path().join("pair.illmesh"));
    scene_job.merge = true;
    single_scene_job(&dir.path().join("pair.ilanset"), scene_job)
        .run_with_scenes(&[scene])
        .unwrap();

    let merged = AssembledMesh::load(&dir.path().join("pair.illmesh")).unwrap();
    let buffer = merged.buffer();
    assert_eq!(buffer.vertex_count, 8);
    assert_eq!(buffer.groups.len(), 2);
    assert_eq!((buffer.groups[1].start, buffer.groups[1].count), (6, 6));
    assert_eq!(&buffer.indices[6..], &[4, 5, 6, 4, 6, 7]);
}

#[test]
fn merge_files_combines_exported_meshes() {
    let dir = tempdir().unwrap();
    let mut scene_job = SceneJob::new("parts.glb");
    scene_job.mesh = Some(dir.path().join("part.illmesh"));
    let mut scene = quad_scene("a");
    scene.meshes.push(quad_scene("b").meshes.remove(0));
    single_scene_job(&dir.path().join("parts.ilanset"), scene_job)
        .run_with_scenes(&[scene])
        .unwrap();

    let inputs = vec![dir.path().join("parta.illmesh"), dir.path().join("partb.illmesh")];
    let output = dir.path().join("merged.illmesh");
    merge_files(&inputs, &output).unwrap();

    let Reflection::Mesh(dump) = dump_file(&output).unwrap() else {
        panic!("expected a mesh file");
    };
    assert_eq!(dump.groups.len(), 2);
    assert_eq!(dump.vertex_count, 8);
    assert_eq!(dump.index_count, 12);

    // A merged mesh can't be merged again
    assert!(merge_files(&[output.clone(), inputs[0].clone()], &dir.path().join("again.illmesh")).is_err());
}

#[test]
fn skeleton_input_drives_animations() {
    let dir = tempdir().unwrap();
    let registry_path = dir.path().join("actor.ilanset");
    let skeleton_path = dir.path().join("actor.illskel");

    let mut first = SceneJob::new("chain.glb");
    first.skeleton = Some(skeleton_path.clone());
    single_scene_job(&registry_path, first)
        .run_with_scenes(&[chain_scene()])
        .unwrap();

    let mut second = SceneJob::new("chain.glb");
    second.skeleton_in = Some(skeleton_path.clone());
    second.animation = Some(dir.path().join("actor.illanim"));
    let mut job = single_scene_job(&registry_path, second);
    job.normalize().unwrap();
    let written = job.run_with_scenes(&[chain_scene()]).unwrap();
    assert_eq!(written, vec![dir.path().join("actornod.illanim")]);
}

#[test]
fn skeleton_input_without_registry_fails() {
    let dir = tempdir().unwrap();
    let mut scene = SceneJob::new("chain.glb");
    scene.skeleton_in = Some(dir.path().join("actor.illskel"));
    let job = single_scene_job(&dir.path().join("actor.ilanset"), scene);

    let err = job.run_with_scenes(&[chain_scene()]).unwrap_err();
    assert!(err.to_string().contains("generate a registry first"));
    assert!(!dir.path().join("actor.ilanset").exists());
}
