//! Replace-then-copy of a game directory tree

use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{PackError, Result};

/// Copy `source` to `dest`, removing `dest` first if it exists.
///
/// The destination never merges with a previous copy. Symlinks inside the
/// source are followed and their targets copied. Permission bits travel
/// with each file. A destination that is the source, lies inside it or
/// contains it is rejected before anything is removed.
pub fn copy_and_overwrite(source: &Path, dest: &Path) -> Result<()> {
    if !source.is_dir() {
        return Err(PackError::MissingSource(source.to_path_buf()));
    }

    if overlaps(source, dest) {
        return Err(PackError::Overlap {
            source_dir: source.to_path_buf(),
            dest: dest.to_path_buf(),
        });
    }

    if dest.exists() || dest.is_symlink() {
        remove_existing(dest)?;
    }

    copy_tree(source, dest)
}

fn overlaps(source: &Path, dest: &Path) -> bool {
    let (Ok(source), Some(dest)) = (fs::canonicalize(source), canonical_dest(dest)) else {
        return false;
    };
    dest.starts_with(&source) || source.starts_with(&dest)
}

/// Canonical form of a destination that may not exist yet.
fn canonical_dest(dest: &Path) -> Option<PathBuf> {
    if let Ok(path) = fs::canonicalize(dest) {
        return Some(path);
    }
    let parent = dest.parent()?;
    let name = dest.file_name()?;
    fs::canonicalize(parent).ok().map(|parent| parent.join(name))
}

fn remove_existing(dest: &Path) -> Result<()> {
    let result = if dest.is_dir() && !dest.is_symlink() {
        fs::remove_dir_all(dest)
    } else {
        fs::remove_file(dest)
    };

    result.map_err(|source| PackError::RemoveExisting {
        path: dest.to_path_buf(),
        source,
    })
}

fn copy_tree(source: &Path, dest: &Path) -> Result<()> {
    // Directory permissions are applied last so read-only directories can
    // still be filled.
    let mut dir_permissions = Vec::new();

    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry.map_err(|err| {
            let from = err.path().unwrap_or(source).to_path_buf();
            PackError::Copy {
                from,
                to: dest.to_path_buf(),
                source: err.into(),
            }
        })?;

        // WalkDir yields paths under the root it was given
        let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let target = dest.join(relative);

        let copy_err = |source| PackError::Copy {
            from: entry.path().to_path_buf(),
            to: target.clone(),
            source,
        };

        if entry.file_type().is_dir() {
            fs::create_dir(&target).map_err(copy_err)?;
            let permissions = entry.metadata().map_err(|e| copy_err(e.into()))?.permissions();
            dir_permissions.push((entry.path().to_path_buf(), target.clone(), permissions));
        } else {
            fs::copy(entry.path(), &target).map_err(copy_err)?;
        }
    }

    for (from, to, permissions) in dir_permissions.into_iter().rev() {
        fs::set_permissions(&to, permissions)
            .map_err(|source| PackError::Copy { from, to, source })?;
    }

    Ok(())
}
