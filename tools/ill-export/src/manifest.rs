//! Manifest parsing
//!
//! Parses ill-export.toml into an [`ExportJob`]. Relative paths are resolved
//! against the manifest's directory.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::pipeline::{ExportJob, SceneJob};

/// Root manifest structure
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Bone registry file, loaded if present and created otherwise
    pub registry: PathBuf,
    #[serde(default, rename = "scene")]
    pub scenes: Vec<SceneEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneEntry {
    pub input: PathBuf,
    #[serde(default)]
    pub mesh: Option<PathBuf>,
    #[serde(default)]
    pub merge: bool,
    #[serde(default)]
    pub skeleton: Option<PathBuf>,
    #[serde(default)]
    pub skeleton_in: Option<PathBuf>,
    #[serde(default)]
    pub main: bool,
    #[serde(default)]
    pub animation: Option<PathBuf>,
}

/// Load and parse a manifest file
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {:?}", path))?;
    let mut manifest: Manifest = toml::from_str(&content)
        .with_context(|| format!("Failed to parse manifest: {:?}", path))?;

    if let Some(dir) = path.parent() {
        manifest.resolve_paths(dir);
    }
    Ok(manifest)
}

impl Manifest {
    /// Make every relative path relative to `dir`
    pub fn resolve_paths(&mut self, dir: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = dir.join(&*p);
            }
        };

        resolve(&mut self.registry);
        for scene in &mut self.scenes {
            resolve(&mut scene.input);
            for path in [
                &mut scene.mesh,
                &mut scene.skeleton,
                &mut scene.skeleton_in,
                &mut scene.animation,
            ]
            .into_iter()
            .flatten()
            {
                resolve(path);
            }
        }
    }

    /// Turn the manifest into a checked export job
    pub fn to_job(&self) -> Result<ExportJob> {
        let mut job = ExportJob::new(self.registry.clone());
        let mut main: Option<usize> = None;

        for (i, entry) in self.scenes.iter().enumerate() {
            if entry.main {
                if let Some(previous) = main {
                    tracing::warn!(
                        "{:?} is already the main scene, overriding with {:?}",
                        self.scenes[previous].input,
                        entry.input
                    );
                }
                main = Some(i);
            }
            if entry.merge && entry.mesh.is_none() {
                tracing::warn!("{:?}: merge has no effect without a mesh output", entry.input);
            }

            job.scenes.push(SceneJob {
                input: entry.input.clone(),
                mesh: entry.mesh.clone(),
                merge: entry.merge,
                skeleton: entry.skeleton.clone(),
                skeleton_in: entry.skeleton_in.clone(),
                animation: entry.animation.clone(),
            });
        }

        job.main = main.unwrap_or(0);
        job.normalize()?;
        Ok(job)
    }
}

/// Validate a manifest without building
pub fn validate(manifest: &Manifest) -> Result<()> {
    for entry in &manifest.scenes {
        if !entry.input.exists() {
            anyhow::bail!("Scene source not found: {:?}", entry.input);
        }
        if let Some(skeleton) = &entry.skeleton_in {
            if !skeleton.exists() {
                anyhow::bail!("Skeleton input not found: {:?}", skeleton);
            }
        }
    }
    manifest.to_job()?;
    Ok(())
}

/// Build every output of a manifest
pub fn build_all(manifest: &Manifest) -> Result<Vec<PathBuf>> {
    validate(manifest)?;
    manifest.to_job()?.run()
}
