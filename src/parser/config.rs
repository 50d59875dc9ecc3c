//! Reader and writer for `mindtree.cfg`.
//!
//! The format is one `key: value` pair per line. Blank lines and lines
//! starting with `#` are skipped.

use anyhow::{Context, Result, bail};

use crate::graph::model::Rgb;

pub const FILE_NAME: &str = "mindtree.cfg";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// World units a node moves per keyboard step.
    pub move_step: f64,
    pub pan_step: f64,
    /// Factor applied by one scale-up step; scale-down divides by it.
    pub scale_factor: f64,
    /// Distance between a parent's centre and a freshly inserted child.
    pub placement_distance: f64,
    pub node_background: Rgb,
    pub node_text: Rgb,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            move_step: 20.0,
            pan_step: 20.0,
            scale_factor: 1.2,
            placement_distance: 100.0,
            node_background: Rgb::WHITE,
            node_text: Rgb::BLACK,
        }
    }
}

pub fn parse(input: &str) -> Result<Config> {
    let mut config = Config::default();
    for (line_num, raw) in input.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            bail!("expected `key: value` at line {}", line_num + 1);
        };
        let (key, value) = (key.trim(), value.trim());
        apply(&mut config, key, value)
            .with_context(|| format!("invalid value for `{key}` at line {}", line_num + 1))?;
    }
    Ok(config)
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "move_step" => config.move_step = positive(value)?,
        "pan_step" => config.pan_step = positive(value)?,
        "scale_factor" => {
            let factor = positive(value)?;
            if factor <= 1.0 {
                bail!("scale factor must be greater than 1, got {factor}");
            }
            config.scale_factor = factor;
        }
        "placement_distance" => config.placement_distance = positive(value)?,
        "node_background" => config.node_background = color(value)?,
        "node_text" => config.node_text = color(value)?,
        other => tracing::warn!(key = other, "ignoring unknown config key"),
    }
    Ok(())
}

fn positive(value: &str) -> Result<f64> {
    let number: f64 = value
        .parse()
        .with_context(|| format!("{value:?} is not a number"))?;
    if !number.is_finite() || number <= 0.0 {
        bail!("expected a positive number, got {value}");
    }
    Ok(number)
}

fn color(value: &str) -> Result<Rgb> {
    match Rgb::parse(value) {
        Some(rgb) => Ok(rgb),
        None => bail!("expected `r,g,b` or `#rrggbb`, got {value:?}"),
    }
}

pub fn serialize(config: &Config) -> String {
    let rgb = |c: Rgb| format!("{},{},{}", c.r, c.g, c.b);
    format!(
        "\
# mindtree configuration

# Distance a node moves per Ctrl+arrow press
move_step: {}

# Distance the view scrolls per arrow press
pan_step: {}

# Factor used by Ctrl+plus / Ctrl+minus and view zoom
scale_factor: {}

# Distance between a parent and a newly inserted child
placement_distance: {}

# Colours of the root node in new documents (r,g,b)
node_background: {}
node_text: {}
",
        config.move_step,
        config.pan_step,
        config.scale_factor,
        config.placement_distance,
        rgb(config.node_background),
        rgb(config.node_text),
    )
}
