//! Export pipeline
//!
//! One run imports every scene, resolves the bone registry across all of them
//! and freezes it, then builds and encodes every requested output in memory.
//! Files are only written once every output of the run has encoded, so a
//! failing scene leaves the output directory untouched.
//!
//! Animations are always built against the main scene's skeleton. A skeleton
//! loaded from disk replaces the imported one of its scene and makes that
//! scene the main one.

use anyhow::{Context, Result, bail};
use ill_common::reflect::{self, Reflection};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::animation::Animation;
use crate::files;
use crate::merge::merge;
use crate::mesh::AssembledMesh;
use crate::naming::{OutputNamer, mesh_item_name};
use crate::registry::{BoneRegistry, RegistryMode};
use crate::scene::{Scene, SceneId};
use crate::skeleton::Skeleton;

/// Outputs requested for one input scene
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneJob {
    pub input: PathBuf,
    /// Base path for mesh files, one per scene mesh unless merged
    pub mesh: Option<PathBuf>,
    /// Write all meshes of the scene as a single multi-group mesh
    pub merge: bool,
    /// Base path for the scene's skeleton file
    pub skeleton: Option<PathBuf>,
    /// Existing skeleton file used instead of the imported one
    pub skeleton_in: Option<PathBuf>,
    /// Base path for animation files, one per clip
    pub animation: Option<PathBuf>,
}

impl SceneJob {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            ..Default::default()
        }
    }
}

/// A whole export run
#[derive(Debug, Clone, PartialEq)]
pub struct ExportJob {
    /// Registry file, loaded when it exists and created otherwise
    pub registry: PathBuf,
    pub scenes: Vec<SceneJob>,
    /// Scene whose skeleton animations are built against
    pub main: usize,
}

/// An encoded output waiting to be written
#[derive(Debug, Clone)]
pub struct EncodedFile {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

impl ExportJob {
    pub fn new(registry: impl Into<PathBuf>) -> Self {
        Self {
            registry: registry.into(),
            scenes: Vec::new(),
            main: 0,
        }
    }

    /// Check the job and settle conflicting options.
    ///
    /// A skeleton input beats a skeleton output on the same scene. Only the
    /// last skeleton input is kept, and its scene becomes the main scene.
    pub fn normalize(&mut self) -> Result<()> {
        if self.scenes.is_empty() {
            bail!("No scenes to import");
        }

        for job in &mut self.scenes {
            if let (Some(input), Some(output)) = (&job.skeleton_in, &job.skeleton) {
                tracing::warn!(
                    "{:?}: skeleton input {:?} replaces skeleton output {:?}",
                    job.input,
                    input,
                    output
                );
                job.skeleton = None;
            }
        }

        let with_input: Vec<usize> = self
            .scenes
            .iter()
            .enumerate()
            .filter(|(_, job)| job.skeleton_in.is_some())
            .map(|(i, _)| i)
            .collect();
        if let Some((&last, earlier)) = with_input.split_last() {
            for &i in earlier {
                tracing::warn!(
                    "{:?}: skeleton input {:?} overridden by the one given for {:?}",
                    self.scenes[i].input,
                    self.scenes[i].skeleton_in,
                    self.scenes[last].input
                );
                self.scenes[i].skeleton_in = None;
            }
            if self.main != last {
                tracing::info!(
                    "Using {:?} as the main skeleton scene",
                    self.scenes[last].input
                );
                self.main = last;
            }
        }

        if self.main >= self.scenes.len() {
            bail!(
                "Main scene {} is out of range, only {} scenes given",
                self.main,
                self.scenes.len()
            );
        }
        Ok(())
    }

    /// Import every scene from disk and run the export
    pub fn run(&self) -> Result<Vec<PathBuf>> {
        let scenes = self
            .scenes
            .iter()
            .map(|job| Scene::from_gltf(&job.input))
            .collect::<Result<Vec<_>>>()?;
        self.run_with_scenes(&scenes)
    }

    /// Run the export on already imported scenes, one per [`SceneJob`]
    pub fn run_with_scenes(&self, scenes: &[Scene]) -> Result<Vec<PathBuf>> {
        let outputs = self.encode_outputs(scenes)?;

        let mut written = Vec::with_capacity(outputs.len());
        for output in outputs {
            files::write_file(&output.path, &output.bytes)?;
            tracing::info!("Wrote {:?} ({} bytes)", output.path, output.bytes.len());
            written.push(output.path);
        }
        Ok(written)
    }

    /// Build and encode every output of the run without touching the disk
    pub fn encode_outputs(&self, scenes: &[Scene]) -> Result<Vec<EncodedFile>> {
        if scenes.len() != self.scenes.len() {
            bail!(
                "Expected {} imported scenes, got {}",
                self.scenes.len(),
                scenes.len()
            );
        }

        let mut registry = if self.registry.exists() {
            BoneRegistry::load(&self.registry)?
        } else {
            tracing::info!("Creating bone registry {:?}", self.registry);
            BoneRegistry::new()
        };
        let creating = registry.mode() == RegistryMode::Creating;

        if creating && self.scenes.iter().any(|job| job.skeleton_in.is_some()) {
            bail!(
                "Cannot import a skeleton without an existing bone registry {:?}, generate a registry first so bone indices stay consistent",
                self.registry
            );
        }

        for (id, (job, scene)) in self.scenes.iter().zip(scenes).enumerate() {
            registry
                .resolve_scene(id, scene)
                .with_context(|| format!("Failed to resolve bones of {:?}", job.input))?;
        }
        registry.freeze();

        let skeletons = self
            .scenes
            .iter()
            .zip(scenes)
            .enumerate()
            .map(|(id, (job, scene))| self.skeleton_for(id, job, scene, &registry))
            .collect::<Result<Vec<_>>>()?;
        let main_skeleton = skeletons
            .get(self.main)
            .with_context(|| format!("Main scene {} is out of range", self.main))?;

        let mut outputs = Vec::new();
        if creating {
            outputs.push(EncodedFile {
                path: self.registry.clone(),
                bytes: registry.to_bytes()?,
            });
        }

        let mut skeleton_names = OutputNamer::new();
        let mut mesh_names = OutputNamer::new();
        let mut animation_names = OutputNamer::new();

        for ((job, scene), skeleton) in self.scenes.iter().zip(scenes).zip(&skeletons) {
            if let Some(base) = &job.skeleton {
                outputs.push(EncodedFile {
                    path: skeleton_names.base_path(base),
                    bytes: skeleton.to_bytes(&registry)?,
                });
            }

            if let Some(base) = &job.mesh {
                encode_meshes(job, base, scene, &registry, &mut mesh_names, &mut outputs)?;
            }

            if let Some(base) = &job.animation {
                if scene.animations.is_empty() {
                    tracing::warn!("{:?} has no animations to export", job.input);
                }
                for clip in &scene.animations {
                    let animation = Animation::import(clip, main_skeleton, &registry)
                        .with_context(|| {
                            format!("Failed to build animation '{}' of {:?}", clip.name, job.input)
                        })?;
                    outputs.push(EncodedFile {
                        path: animation_names.path_for(base, &animation.name),
                        bytes: animation.to_bytes()?,
                    });
                }
            }
        }

        tracing::info!(
            "Encoded {} files from {} scenes, {} registered bones",
            outputs.len(),
            scenes.len(),
            registry.len()
        );
        Ok(outputs)
    }

    fn skeleton_for(
        &self,
        id: SceneId,
        job: &SceneJob,
        scene: &Scene,
        registry: &BoneRegistry,
    ) -> Result<Skeleton> {
        match &job.skeleton_in {
            Some(path) => {
                let skeleton = Skeleton::load(path)?;
                if skeleton.len() != registry.len() {
                    tracing::warn!(
                        "Skeleton {:?} has {} bones but the registry has {}",
                        path,
                        skeleton.len(),
                        registry.len()
                    );
                }
                Ok(skeleton)
            }
            None => Skeleton::import(id, scene, registry)
                .with_context(|| format!("Failed to build skeleton of {:?}", job.input)),
        }
    }
}

fn encode_meshes(
    job: &SceneJob,
    base: &Path,
    scene: &Scene,
    registry: &BoneRegistry,
    names: &mut OutputNamer,
    outputs: &mut Vec<EncodedFile>,
) -> Result<()> {
    if scene.meshes.is_empty() {
        tracing::warn!("{:?} has no meshes to export", job.input);
        return Ok(());
    }

    let meshes = scene
        .meshes
        .iter()
        .map(|mesh| {
            let mut assembled = AssembledMesh::import(mesh, registry).with_context(|| {
                format!("Failed to assemble mesh '{}' of {:?}", mesh.name, job.input)
            })?;
            assembled.name = mesh_item_name(mesh);
            Ok(assembled)
        })
        .collect::<Result<Vec<_>>>()?;

    if job.merge {
        let buffers: Vec<_> = meshes.into_iter().map(AssembledMesh::into_buffer).collect();
        let merged = merge(&buffers)
            .with_context(|| format!("Failed to merge the meshes of {:?}", job.input))?;
        outputs.push(EncodedFile {
            path: names.base_path(base),
            bytes: AssembledMesh::from_buffer("", merged).to_bytes()?,
        });
    } else {
        for mesh in meshes {
            outputs.push(EncodedFile {
                path: names.path_for(base, &mesh.name),
                bytes: mesh.to_bytes()?,
            });
        }
    }
    Ok(())
}

/// Merge existing single-group mesh files into one file
pub fn merge_files(inputs: &[PathBuf], output: &Path) -> Result<()> {
    let buffers = inputs
        .iter()
        .map(|path| AssembledMesh::load(path).map(AssembledMesh::into_buffer))
        .collect::<Result<Vec<_>>>()?;
    let merged = merge(&buffers).context("Failed to merge meshes")?;

    let name = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    AssembledMesh::from_buffer(name, merged).save(output)
}

/// Decode any asset file into its text form
pub fn dump_file(path: &Path) -> Result<Reflection> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    reflect::reflect(BufReader::new(file)).with_context(|| format!("Failed to decode {:?}", path))
}

/// Log the text form of every file
pub fn dump_files(paths: &[PathBuf]) -> Result<()> {
    for path in paths {
        let reflection = dump_file(path)?;
        tracing::info!("{:?}: {} file", path, reflection.kind().name());
        for line in reflection.to_string().lines() {
            tracing::info!("{}", line);
        }
    }
    Ok(())
}
