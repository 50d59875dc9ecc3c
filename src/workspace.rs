//! Locating and loading `mindtree.cfg` for a document.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::parser::config::{self, Config};

/// Walk upward from `start` to the nearest directory holding a config file.
pub fn find_config_from(start: &Path) -> Option<PathBuf> {
    let mut dir = start;
    loop {
        let candidate = dir.join(config::FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
}

/// Directory the config search starts from for `document`: its parent
/// directory, or the working directory for bare file names.
pub fn search_start(document: Option<&Path>) -> Result<PathBuf> {
    let parent = document
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty());
    match parent {
        Some(dir) => Ok(dir.to_path_buf()),
        None => std::env::current_dir().context("cannot determine the working directory"),
    }
}

/// Settings for `document`, or the defaults when no config file is found.
pub fn load_config(document: Option<&Path>) -> Result<Config> {
    let start = search_start(document)?;
    let Some(path) = find_config_from(&start) else {
        tracing::debug!(start = %start.display(), "no config file found; using defaults");
        return Ok(Config::default());
    };
    let text =
        fs::read_to_string(&path).with_context(|| format!("cannot read {}", path.display()))?;
    let config =
        config::parse(&text).with_context(|| format!("invalid config in {}", path.display()))?;
    tracing::info!(path = %path.display(), "loaded config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn finds_config_in_the_same_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(config::FILE_NAME), "move_step: 4\n").unwrap();
        let found = find_config_from(dir.path()).unwrap();
        assert_eq!(found, dir.path().join(config::FILE_NAME));
    }

    #[test]
    fn finds_config_in_a_parent_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(config::FILE_NAME), "move_step: 4\n").unwrap();
        fs::create_dir_all(dir.path().join("maps/2024")).unwrap();
        let doc = dir.path().join("maps/2024/plan.mm");
        let config = load_config(Some(&doc)).unwrap();
        assert_eq!(config.move_step, 4.0);
    }

    #[test]
    fn missing_config_gives_defaults() {
        let dir = TempDir::new().unwrap();
        // A config file above the temp directory would be found too.
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        if find_config_from(&nested).is_none() {
            let config = load_config(Some(&nested.join("x.mm"))).unwrap();
            assert_eq!(config, Config::default());
        }
    }

    #[test]
    fn broken_config_is_an_error_naming_the_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(config::FILE_NAME), "scale_factor: big\n").unwrap();
        let err = load_config(Some(&dir.path().join("map.mm"))).unwrap_err();
        assert!(format!("{err:#}").contains(config::FILE_NAME), "{err:#}");
        assert!(format!("{err:#}").contains("line 1"), "{err:#}");
    }

    #[test]
    fn bare_file_names_search_from_the_working_directory() {
        let start = search_start(Some(Path::new("map.mm"))).unwrap();
        assert_eq!(start, std::env::current_dir().unwrap());
    }
}
