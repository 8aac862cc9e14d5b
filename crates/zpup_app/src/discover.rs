use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use walkdir::WalkDir;
use zpup_logging::{zpup_debug, zpup_warn};

/// Flattens `files` and the regular files under `directories` into one list,
/// in argument order, without duplicates.
///
/// A named file or directory that does not exist is an error; unreadable
/// entries deep inside a directory are skipped with a warning.
pub fn collect_files(files: &[PathBuf], directories: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut found = Found::default();

    for file in files {
        if !file.is_file() {
            bail!("{} is not an existing file", file.display());
        }
        found.push(file.clone())?;
    }

    for dir in directories {
        if !dir.is_dir() {
            bail!("{} is not an existing directory", dir.display());
        }
        for path in walk(dir) {
            found.push(path)?;
        }
    }

    Ok(found.paths)
}

fn walk(dir: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                zpup_warn!("Skipping unreadable entry: {}", err);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            zpup_debug!("{} found", entry.path().display());
            entry.into_path()
        })
}

#[derive(Default)]
struct Found {
    seen: HashSet<PathBuf>,
    paths: Vec<PathBuf>,
}

impl Found {
    fn push(&mut self, path: PathBuf) -> Result<()> {
        let canonical = path
            .canonicalize()
            .with_context(|| format!("resolving {}", path.display()))?;
        if self.seen.insert(canonical) {
            self.paths.push(path);
        }
        Ok(())
    }
}
