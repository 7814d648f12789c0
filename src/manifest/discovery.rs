//! Solution and central manifest discovery
//!
//! Only the given directory is listed; nothing is read or recursed into.

use std::fs;
use std::path::{Path, PathBuf};

/// Central package management file name
pub const MANIFEST_FILENAME: &str = "Directory.Packages.props";

const SOLUTION_EXTENSIONS: &[&str] = &["sln", "slnx"];

/// Result of looking for a solution file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolutionLookup {
    /// Exactly one solution file
    Found(PathBuf),
    /// No solution file
    Missing,
    /// More than one solution file, sorted by path
    Ambiguous(Vec<PathBuf>),
}

/// Find the solution file in `dir`
pub fn find_solution(dir: &Path) -> SolutionLookup {
    let Ok(entries) = fs::read_dir(dir) else {
        return SolutionLookup::Missing;
    };

    let mut solutions: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_solution(path))
        .collect();
    solutions.sort();

    match solutions.len() {
        0 => SolutionLookup::Missing,
        1 => SolutionLookup::Found(solutions.remove(0)),
        _ => SolutionLookup::Ambiguous(solutions),
    }
}

/// `Directory.Packages.props` in the solution's directory
pub fn manifest_beside(solution: &Path) -> PathBuf {
    solution
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(MANIFEST_FILENAME)
}

fn is_solution(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SOLUTION_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}
