//! Textured quad lab
//!
//! Compares magnification, minification and anisotropic filtering on a
//! long textured ground quad.
//!
//! # Usage
//!
//! ```bash
//! textured_quad
//! textured_quad --texture road.jpg --no-vsync
//! ```
//!
//! # Keyboard Shortcuts
//!
//! - ESC: Quit
//! - G: Toggle the control panel

use std::path::PathBuf;

use clap::Parser;
use terrain_labs::labs::TexturedQuadLab;
use terrain_labs::LabConfig;

#[derive(Parser)]
#[command(name = "textured_quad")]
#[command(version, about = "Texture sampling lab")]
struct Args {
    /// Texture drawn on the quad
    #[arg(long)]
    texture: Option<PathBuf>,

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
        texture_path: args.texture.unwrap_or(defaults.texture_path),
        ..defaults
    };

    let lab = TexturedQuadLab::new(config.texture_path.clone());

    if let Err(e) = terrain_labs::engine::run(&config, lab) {
        log::error!("Textured quad lab failed: {}", e);
        std::process::exit(1);
    }
}
