//! Enumerates `.bgi` index files under the configured search directories
//! and orders them for dispatch.

use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::cli::IndexOrder;

/// The fixed seed used for `--index-order shuffle`, so repeated runs visit
/// indexes in the same order (useful for performance comparisons).
const SHUFFLE_SEED: u64 = 1;

/// Collect every `.bgi` file under `directories`, recursing when
/// `recursive` is set, then apply `order`.
pub fn collect(directories: &[PathBuf], recursive: bool, order: IndexOrder) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for dir in directories {
        if recursive {
            for entry in walkdir::WalkDir::new(dir).into_iter().filter_map(Result::ok) {
                if is_bgi(entry.path()) {
                    files.push(entry.into_path());
                }
            }
        } else {
            for entry in std::fs::read_dir(dir)? {
                let entry = entry?;
                if is_bgi(&entry.path()) {
                    files.push(entry.path());
                }
            }
        }
    }

    match order {
        IndexOrder::Undefined => {}
        IndexOrder::Alpha => files.sort_by(|a, b| {
            a.file_name().unwrap_or_default().cmp(b.file_name().unwrap_or_default())
        }),
        IndexOrder::Shuffle => {
            let mut rng = rand::rngs::StdRng::seed_from_u64(SHUFFLE_SEED);
            files.shuffle(&mut rng);
        }
    }

    Ok(files)
}

fn is_bgi(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == "bgi")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_order_sorts_by_basename() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.bgi", "a.bgi", "b.bgi"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let files = collect(&[dir.path().to_path_buf()], false, IndexOrder::Alpha).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.bgi", "b.bgi", "c.bgi"]);
    }

    #[test]
    fn non_bgi_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();
        std::fs::write(dir.path().join("index.bgi"), b"").unwrap();
        let files = collect(&[dir.path().to_path_buf()], false, IndexOrder::Undefined).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn recursive_descends_into_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/nested.bgi"), b"").unwrap();
        let files = collect(&[dir.path().to_path_buf()], true, IndexOrder::Undefined).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn shuffle_is_deterministic_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..20 {
            std::fs::write(dir.path().join(format!("{i}.bgi")), b"").unwrap();
        }
        let first = collect(&[dir.path().to_path_buf()], false, IndexOrder::Shuffle).unwrap();
        let second = collect(&[dir.path().to_path_buf()], false, IndexOrder::Shuffle).unwrap();
        assert_eq!(first, second);
    }
}
