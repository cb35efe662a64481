//! Path utilities for project files.
//!
//! MSBuild writes paths with backslashes and compares them case-insensitively;
//! these helpers convert between that notation and native paths and build the
//! lookup keys used for path-based identity.

use std::path::{Component, Path, PathBuf};

/// Normalize a path by resolving . and .. components
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {
                // Skip current directory
            },
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                },
                // Cannot go above the root
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {},
                _ => components.push(component),
            },
            other => {
                components.push(other);
            },
        }
    }

    components.iter().collect()
}

/// Make a path absolute against the current directory and normalize it.
///
/// Existing paths are canonicalized so symlinked roots compare equal.
pub fn absolutize(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    normalize_path(&joined)
}

/// Case-insensitive lookup key for a project path
pub fn path_key(path: &Path) -> String {
    normalize_path(path)
        .to_string_lossy()
        .replace('\\', "/")
        .to_lowercase()
}

/// Case-insensitive key for an item include relative to its project
pub fn item_key(include: &str) -> String {
    let native = msbuild_to_native(include.trim());
    normalize_path(&native)
        .to_string_lossy()
        .replace('\\', "/")
        .to_lowercase()
}

/// Convert an MSBuild path (backslash separated) into a native path
pub fn msbuild_to_native(path: &str) -> PathBuf {
    PathBuf::from(path.replace('\\', "/"))
}

/// Render a relative path the way MSBuild writes it
pub fn to_msbuild(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .filter(|c| c != "/")
        .collect::<Vec<_>>()
        .join("\\")
}

/// Path of `target` relative to `base_dir`, in MSBuild notation.
///
/// Falls back to the absolute target when no relative path exists.
pub fn relative_msbuild_path(target: &Path, base_dir: &Path) -> String {
    match pathdiff::diff_paths(target, base_dir) {
        Some(relative) => to_msbuild(&relative),
        None => target.to_string_lossy().into_owned(),
    }
}

/// Get the file extension as a lowercase string
pub fn get_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn item_key_ignores_case_and_separators(
            segments in prop::collection::vec("[A-Za-z0-9_]{1,8}", 1..5)
        ) {
            let backslashed = segments.join("\\");
            let slashed = segments.join("/").to_uppercase();
            prop_assert_eq!(item_key(&backslashed), item_key(&slashed));
        }

        #[test]
        fn normalize_path_is_idempotent(
            segments in prop::collection::vec(prop_oneof!["[a-z]{1,6}", Just("..".to_string()), Just(".".to_string())], 0..8)
        ) {
            let path = PathBuf::from(format!("/{}", segments.join("/")));
            let once = normalize_path(&path);
            prop_assert_eq!(normalize_path(&once), once.clone());
            prop_assert!(once.components().all(|c| !matches!(c, Component::CurDir | Component::ParentDir)));
        }
    }
}
