use anyhow::{bail, Result};
use globset::{GlobBuilder, GlobMatcher};
use std::path::PathBuf;
use walkdir::WalkDir;

use crate::config::InputConfig;

/// Input files under `input.root` matching `input.pattern`, sorted by path.
pub fn discover(input: &InputConfig) -> Result<Vec<PathBuf>> {
    let root = &input.root;
    if !root.exists() {
        bail!("Input root does not exist: {}", root.display());
    }

    let matcher = build_matcher(&input.pattern)?;

    let mut walker = WalkDir::new(root);
    if let Some(depth) = pattern_depth(&input.pattern) {
        walker = walker.max_depth(depth);
    }

    let mut paths = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable path during discovery");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        if matcher.is_match(relative) {
            paths.push(path.to_path_buf());
        }
    }

    // Sort for deterministic ordering
    paths.sort();

    Ok(paths)
}

/// Directory depth a pattern can reach, or `None` when `**` makes it unbounded.
fn pattern_depth(pattern: &str) -> Option<usize> {
    if pattern.contains("**") {
        None
    } else {
        Some(pattern.split('/').count())
    }
}

fn build_matcher(pattern: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(pattern).literal_separator(true).build()?;
    Ok(glob.compile_matcher())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn input(root: PathBuf, pattern: &str) -> InputConfig {
        InputConfig {
            root,
            pattern: pattern.to_string(),
        }
    }

    fn setup() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("b.pdf"), b"b").unwrap();
        fs::write(root.join("a.pdf"), b"a").unwrap();
        fs::write(root.join("notes.txt"), b"n").unwrap();
        fs::write(root.join("nested/c.pdf"), b"c").unwrap();
        tmp
    }

    #[test]
    fn single_star_stays_in_root_and_sorts() {
        let tmp = setup();
        let found = discover(&input(tmp.path().to_path_buf(), "*.pdf")).unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf"]);
    }

    #[test]
    fn double_star_recurses() {
        let tmp = setup();
        let found = discover(&input(tmp.path().to_path_buf(), "**/*.pdf")).unwrap();
        assert_eq!(found.len(), 3);
        assert!(found.iter().any(|p| p.ends_with("nested/c.pdf")));
    }

    #[test]
    fn pattern_depth_follows_separators() {
        assert_eq!(pattern_depth("*.pdf"), Some(1));
        assert_eq!(pattern_depth("papers/*.pdf"), Some(2));
        assert_eq!(pattern_depth("**/*.pdf"), None);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subdirectory_does_not_abort_discovery() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = setup();
        let locked = tmp.path().join("locked");
        fs::create_dir_all(&locked).unwrap();
        fs::write(locked.join("d.pdf"), b"d").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let shallow = discover(&input(tmp.path().to_path_buf(), "*.pdf"));
        let deep = discover(&input(tmp.path().to_path_buf(), "**/*.pdf"));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(shallow.unwrap().len(), 2);
        let deep = deep.unwrap();
        assert!(deep.iter().any(|p| p.ends_with("nested/c.pdf")));
    }

    #[test]
    fn missing_root_is_an_error() {
        let err = discover(&input(PathBuf::from("/nonexistent/input"), "*.pdf")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let tmp = setup();
        assert!(discover(&input(tmp.path().to_path_buf(), "[unclosed")).is_err());
    }
}
