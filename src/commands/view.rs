use std::path::PathBuf;

use anyhow::Result;

use crate::tui::canvas;

pub fn run(file: Option<PathBuf>, demo: bool) -> Result<()> {
    tracing::info!(file = ?file, demo, "opening editor");
    canvas::run(file, demo)
}
