//! Discovery of configuration files across search directories.

use std::path::{Path, PathBuf};

use super::source::FileSystem;

/// How many of the candidate files take part in a load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Resolution {
    /// Use only the first existing candidate.
    #[default]
    FirstMatch,
    /// Use every existing candidate; later ones override earlier ones.
    MergeAll,
}

/// Returns existing candidate paths in discovery order.
///
/// Directories form the outer loop and file names the inner loop, so every
/// name in the first directory is tried before the second directory. Finding
/// nothing is not an error.
pub fn resolve_files<D, N>(
    fs: &dyn FileSystem,
    dirs: &[D],
    names: &[N],
    resolution: Resolution,
) -> Vec<PathBuf>
where
    D: AsRef<Path>,
    N: AsRef<Path>,
{
    let mut found = Vec::new();

    for dir in dirs {
        for name in names {
            let path = dir.as_ref().join(name);
            if !fs.exists(&path) {
                continue;
            }
            found.push(path);
            if resolution == Resolution::FirstMatch {
                return found;
            }
        }
    }

    found
}
