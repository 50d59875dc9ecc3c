//! `mindtree init`: write a fresh document holding only its root node.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use crossterm::style::Stylize;

use crate::parser::config::{self, Config};
use crate::parser::document;
use crate::workspace;

/// Entry point called from `main`.
pub fn run(file: &Path, title: &str) -> Result<()> {
    let created_config = write_blank(file, title)?;
    println!("  {} {}", "Created".green().bold(), file.display());
    if let Some(path) = created_config {
        println!(
            "  {} {} {}",
            "Created".green().bold(),
            path.display(),
            "(default settings)".dark_grey()
        );
    }
    Ok(())
}

/// Write the document. When no config file applies to it yet, a default one
/// is written next to it; its path is returned.
fn write_blank(file: &Path, title: &str) -> Result<Option<PathBuf>> {
    if file.exists() {
        bail!(
            "{} already exists. Open it with `mindtree view {}` instead.",
            file.display(),
            file.display()
        );
    }
    if let Some(dir) = file.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("cannot create directory {}", dir.display()))?;
    }

    let start = workspace::search_start(Some(file))?;
    let created_config = match workspace::find_config_from(&start) {
        Some(_) => None,
        None => {
            let path = start.join(config::FILE_NAME);
            fs::write(&path, config::serialize(&Config::default()))
                .with_context(|| format!("cannot write {}", path.display()))?;
            Some(path)
        }
    };

    let config = workspace::load_config(Some(file))?;
    let graph = document::blank(title, config.node_background, config.node_text);
    document::save(&graph, file)?;
    Ok(created_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::model::Rgb;
    use tempfile::TempDir;

    #[test]
    fn creates_a_document_with_only_a_root() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("ideas.mm");
        let had_config = workspace::find_config_from(dir.path()).is_some();
        let created = write_blank(&file, "Ideas").unwrap();
        if !had_config {
            let path = created.unwrap();
            assert_eq!(path, dir.path().join(config::FILE_NAME));
            let text = fs::read_to_string(&path).unwrap();
            assert_eq!(config::parse(&text).unwrap(), Config::default());
        }

        let graph = document::load(&file).unwrap();
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.edge_count(), 0);
        let root = graph.node(graph.root().unwrap()).unwrap();
        assert_eq!(root.content, "Ideas");
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("maps/2024/plan.mm");
        write_blank(&file, "").unwrap();
        assert!(file.is_file());
    }

    #[test]
    fn uses_configured_colours_for_the_root() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(config::FILE_NAME),
            "node_background: 10,20,30\nnode_text: 200,200,200\n",
        )
        .unwrap();
        let file = dir.path().join("map.mm");
        assert_eq!(write_blank(&file, "x").unwrap(), None);
        assert!(
            fs::read_to_string(dir.path().join(config::FILE_NAME))
                .unwrap()
                .starts_with("node_background: 10,20,30")
        );

        let graph = document::load(&file).unwrap();
        let root = graph.node(graph.root().unwrap()).unwrap();
        assert_eq!(root.background, Rgb::new(10, 20, 30));
        assert_eq!(root.text_color, Rgb::new(200, 200, 200));
    }

    #[test]
    fn refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("map.mm");
        fs::write(&file, "precious").unwrap();
        assert!(write_blank(&file, "x").is_err());
        assert_eq!(fs::read_to_string(&file).unwrap(), "precious");
    }
}
