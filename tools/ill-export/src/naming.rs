//! Output file naming
//!
//! Every exported item gets its own file named `<base stem><item name><ext>`
//! next to the base path the user gave. The item name alone is made unique
//! among the items of the same kind handed out in the run, so an item name
//! taken under one base is suffixed under any other base too. Outputs with
//! no item name (skeletons, merged meshes) make the base stem unique
//! instead.

use hashbrown::HashSet;
use std::path::{Path, PathBuf};

use crate::scene::SceneMesh;

/// Return `candidate` if unused, else the first free `candidate0`,
/// `candidate1`, ...
pub fn uniquify(candidate: &str, used: &HashSet<String>) -> String {
    if !used.contains(candidate) {
        return candidate.to_string();
    }
    (0u64..)
        .map(|n| format!("{candidate}{n}"))
        .find(|name| !used.contains(name))
        .unwrap_or_else(|| candidate.to_string())
}

/// Make an item name usable inside a file name
pub fn sanitize(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}

/// Mesh name, else its material name, else empty
pub fn mesh_item_name(mesh: &SceneMesh) -> String {
    if !mesh.name.is_empty() {
        sanitize(&mesh.name)
    } else {
        sanitize(&mesh.material_name)
    }
}

/// Hands out unique output paths for one kind of output
#[derive(Debug, Default)]
pub struct OutputNamer {
    items: HashSet<String>,
    stems: HashSet<String>,
}

impl OutputNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path for `item` under `base`: the base's extension is moved behind the
    /// item name, and the item name is made unique among earlier items.
    pub fn path_for(&mut self, base: &Path, item: &str) -> PathBuf {
        let name = uniquify(&sanitize(item), &self.items);
        self.items.insert(name.clone());
        with_stem(base, |stem| format!("{stem}{name}"))
    }

    /// Path for an output named after `base` alone, with the stem made
    /// unique among earlier calls.
    pub fn base_path(&mut self, base: &Path) -> PathBuf {
        let stems = &mut self.stems;
        with_stem(base, |stem| {
            let name = uniquify(stem, stems);
            stems.insert(name.clone());
            name
        })
    }
}

/// `base` with its stem replaced by `rename(stem)`, extension kept
fn with_stem(base: &Path, rename: impl FnOnce(&str) -> String) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = rename(&stem);
    let file_name = match base.extension() {
        Some(ext) => format!("{name}.{}", ext.to_string_lossy()),
        None => name,
    };
    base.with_file_name(file_name)
}
