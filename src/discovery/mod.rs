#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Entry point detectors.
pub mod detector;
/// Thin wrapper over tree-sitter for querying Java source.
pub mod parser;

use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use serde::Serialize;
use tracing::{debug, info, warn};

pub use detector::{DetectorKind, EntryPointDetector, LineTokenDetector, SyntaxDetector};

/// One student's submission folder and the file that starts the program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    /// Name of the submission folder.
    pub name:        String,
    /// Source file containing the entry point.
    pub entry_point: PathBuf,
}

impl Submission {
    /// Folder the entry point lives in; compile and run happen here.
    pub fn working_dir(&self) -> &Path {
        self.entry_point.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Entry point file name, e.g. `Main.java`.
    pub fn entry_file_name(&self) -> OsString {
        self.entry_point
            .file_name()
            .map(ToOwned::to_owned)
            .unwrap_or_default()
    }

    /// Class to run, the entry point's file stem.
    pub fn class_name(&self) -> String {
        self.entry_point
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Submissions found under a root folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Discovery {
    /// Runnable submissions, in folder name order.
    pub submissions: Vec<Submission>,
    /// Folders with no entry point, in folder name order.
    pub skipped:     Vec<String>,
}

/// Why discovery could not scan a root folder.
#[derive(thiserror::Error, Debug)]
pub enum DiscoveryError {
    /// The root folder is missing or not a directory.
    #[error("{} is not a directory", .0.display())]
    RootNotDirectory(PathBuf),
}

/// Sorted entries of `dir` that satisfy `keep`. Unreadable folders yield
/// nothing.
fn sorted_entries(dir: &Path, keep: impl Fn(&Path) -> bool) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("could not read {}: {e}", dir.display());
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| keep(path))
        .collect();
    paths.sort();
    paths
}

/// Returns the first file in `dir` with extension `source_ext` that
/// `detector` accepts.
fn find_entry_point(
    dir: &Path,
    source_ext: &str,
    detector: &dyn EntryPointDetector,
) -> Option<PathBuf> {
    let candidates = sorted_entries(dir, |path| {
        path.is_file() && path.extension().is_some_and(|ext| ext == source_ext)
    });

    candidates.into_iter().find(|path| match fs::read(path) {
        Ok(bytes) => detector.is_entry_point(&String::from_utf8_lossy(&bytes)),
        Err(e) => {
            debug!("could not read {}: {e}", path.display());
            false
        }
    })
}

/// Lists the submissions under `root`.
///
/// Every immediate subfolder of `root` is one submission. Its entry point is
/// searched for in `subfolder/code_sub_path`, or the subfolder itself when
/// `code_sub_path` is blank. Folders without one are reported as skipped.
pub fn discover(
    root: &Path,
    code_sub_path: &str,
    source_ext: &str,
    detector: &dyn EntryPointDetector,
) -> Result<Discovery, DiscoveryError> {
    if !root.is_dir() {
        return Err(DiscoveryError::RootNotDirectory(root.to_path_buf()));
    }

    let code_sub_path = code_sub_path.trim();
    let mut discovery = Discovery::default();

    for folder in sorted_entries(root, Path::is_dir) {
        let name = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let search_dir = if code_sub_path.is_empty() {
            folder.clone()
        } else {
            folder.join(code_sub_path)
        };

        match find_entry_point(&search_dir, source_ext, detector) {
            Some(entry_point) => {
                debug!("{name}: entry point {}", entry_point.display());
                discovery.submissions.push(Submission { name, entry_point });
            }
            None => {
                warn!("{name}: no entry point found in {}", search_dir.display());
                discovery.skipped.push(name);
            }
        }
    }

    info!(
        "found {} submission(s), {} skipped, under {}",
        discovery.submissions.len(),
        discovery.skipped.len(),
        root.display()
    );
    Ok(discovery)
}
