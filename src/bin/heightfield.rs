//! Height-field lab
//!
//! Renders a tessellated grid displaced by a height map.
//!
//! # Usage
//!
//! ```bash
//! heightfield --tessellation 128
//! heightfield --height-field terrain.png --diffuse terrain.jpg
//! ```
//!
//! # Keyboard Shortcuts
//!
//! - ESC: Quit
//! - G: Toggle the control panel

use std::path::PathBuf;

use clap::Parser;
use terrain_labs::labs::HeightFieldLab;
use terrain_labs::LabConfig;

#[derive(Parser)]
#[command(name = "heightfield")]
#[command(version, about = "Height-field terrain lab")]
struct Args {
    /// Triangle edges per side of the terrain grid
    #[arg(long, short = 't', value_parser = clap::value_parser!(i32).range(1..))]
    tessellation: Option<i32>,

    /// Single-channel height map
    #[arg(long)]
    height_field: Option<PathBuf>,

    /// Diffuse colour map
    #[arg(long)]
    diffuse: Option<PathBuf>,

    /// Initial window width
    #[arg(long)]
    width: Option<u32>,

    /// Initial window height
    #[arg(long)]
    height: Option<u32>,

    /// Present without waiting for vertical sync
    #[arg(long)]
    no_vsync: bool,
}

fn main() {
    env_logger::init();

    let args = Args::parse();
    let defaults = LabConfig::default();
    let config = LabConfig {
        width: args.width.unwrap_or(defaults.width),
        height: args.height.unwrap_or(defaults.height),
        vsync: !args.no_vsync,
        tessellation: args.tessellation.unwrap_or(defaults.tessellation),
        height_field_path: args.height_field.unwrap_or(defaults.height_field_path),
        diffuse_path: args.diffuse.unwrap_or(defaults.diffuse_path),
        ..defaults
    };

    let lab = HeightFieldLab::new(
        config.height_field_path.clone(),
        config.diffuse_path.clone(),
        config.tessellation,
    );

    if let Err(e) = terrain_labs::engine::run(&config, lab) {
        log::error!("Height-field lab failed: {}", e);
        std::process::exit(1);
    }
}
