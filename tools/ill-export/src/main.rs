//! ill-export - illmesh asset export tool
//!
//! Converts glTF scenes into illmesh binary assets
//! (.ilanset, .illskel, .illanim, .illmesh)

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ill_export::manifest;
use ill_export::pipeline::{self, ExportJob, SceneJob};

#[derive(Parser)]
#[command(name = "ill-export")]
#[command(about = "illmesh asset export tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import scenes and export registry, skeletons, animations and meshes
    Import {
        /// Bone registry (.ilanset), loaded if it exists and created otherwise
        #[arg(short, long)]
        registry: PathBuf,

        /// Input scenes (glTF/GLB)
        #[arg(required = true)]
        scenes: Vec<PathBuf>,

        /// Base path for mesh files
        #[arg(long)]
        mesh: Option<PathBuf>,

        /// Merge each scene's meshes into one multi-group mesh
        #[arg(long)]
        merge: bool,

        /// Base path for animation files
        #[arg(long)]
        anim: Option<PathBuf>,

        /// Base path for skeleton files
        #[arg(long)]
        skel: Option<PathBuf>,

        /// Existing skeleton used for the main scene instead of importing one
        #[arg(long)]
        skel_in: Option<PathBuf>,

        /// Index of the scene whose skeleton animations are built against
        #[arg(long, default_value_t = 0)]
        main: usize,
    },

    /// Build assets from a manifest file
    Build {
        /// Path to ill-export.toml manifest
        #[arg(default_value = "ill-export.toml")]
        manifest: PathBuf,
    },

    /// Validate manifest without building
    Check {
        /// Path to ill-export.toml manifest
        #[arg(default_value = "ill-export.toml")]
        manifest: PathBuf,
    },

    /// Merge single-group mesh files into one multi-group mesh
    Merge {
        /// Output .illmesh file
        #[arg(short, long)]
        output: PathBuf,

        /// Input .illmesh files, in group order
        #[arg(required = true)]
        meshes: Vec<PathBuf>,
    },

    /// Print any illmesh asset file as text
    Dump {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Import {
            registry,
            scenes,
            mesh,
            merge,
            anim,
            skel,
            skel_in,
            main,
        } => {
            let mut job = ExportJob::new(registry);
            job.main = main;
            job.scenes = scenes
                .into_iter()
                .map(|input| SceneJob {
                    input,
                    mesh: mesh.clone(),
                    merge,
                    skeleton: skel.clone(),
                    skeleton_in: None,
                    animation: anim.clone(),
                })
                .collect();
            if let Some(path) = skel_in {
                let Some(scene) = job.scenes.get_mut(main) else {
                    anyhow::bail!("--main {} is out of range for {} scenes", main, job.scenes.len());
                };
                tracing::info!("Using skeleton {:?} for {:?}", path, scene.input);
                scene.skeleton_in = Some(path);
            }

            job.normalize()?;
            job.run()?;
            tracing::info!("Done!");
        }

        Commands::Build { manifest } => {
            tracing::info!("Building assets from {:?}", manifest);
            let config = manifest::load_manifest(&manifest)?;
            let written = manifest::build_all(&config)?;
            tracing::info!("Build complete! {} files written", written.len());
        }

        Commands::Check { manifest } => {
            tracing::info!("Checking manifest {:?}", manifest);
            let config = manifest::load_manifest(&manifest)?;
            manifest::validate(&config)?;
            tracing::info!("Manifest is valid!");
        }

        Commands::Merge { output, meshes } => {
            tracing::info!("Merging {} meshes -> {:?}", meshes.len(), output);
            pipeline::merge_files(&meshes, &output)?;
            tracing::info!("Done!");
        }

        Commands::Dump { files } => {
            pipeline::dump_files(&files)?;
        }
    }

    Ok(())
}
