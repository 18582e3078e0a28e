//! VMD motion command implementations

use anyhow::{Context, Result};
use clap::Subcommand;
use console::style;
use mmd_vmd::VmdMotion;
use mmd_vmd::track::frame_to_seconds;
use std::path::{Path, PathBuf};

use crate::commands::pmx::load_model;
use crate::utils::{add_table_row, create_table, format_bytes, format_seconds};

#[derive(Subcommand)]
pub enum VmdCommands {
    /// Display information about a VMD motion
    Info {
        /// Path to the VMD file
        file: PathBuf,

        /// List every bone and morph track
        #[arg(short, long)]
        tracks: bool,

        /// Report which bone tracks match the bones of this PMX model
        #[arg(short, long, value_name = "PMX")]
        model: Option<PathBuf>,
    },
}

pub fn execute(command: VmdCommands) -> Result<()> {
    match command {
        VmdCommands::Info {
            file,
            tracks,
            model,
        } => execute_info(&file, tracks, model.as_deref()),
    }
}

/// Load a VMD motion, attaching the path to any error.
pub fn load_motion(path: &Path) -> Result<VmdMotion> {
    VmdMotion::load(path).with_context(|| format!("Failed to load VMD motion: {}", path.display()))
}

fn execute_info(path: &Path, list_tracks: bool, model: Option<&Path>) -> Result<()> {
    let motion = load_motion(path)?;
    let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    let bone_tracks = motion.bone_tracks();
    let morph_tracks = motion.morph_tracks();
    let last_frame = motion.last_frame();

    println!("\n{}", style("VMD Motion Information").bold().underlined());
    println!("File: {} ({})", style(path.display()).cyan(), format_bytes(size));
    println!("Version: {}", style(format!("{:?}", motion.header.version)).yellow());
    println!("Model: {}", motion.header.model_name);
    println!(
        "Length: {} frames ({})",
        style(last_frame).green(),
        format_seconds(frame_to_seconds(last_frame))
    );
    println!(
        "Bone keyframes: {} in {} tracks",
        style(motion.bone_keyframes.len()).green(),
        bone_tracks.len()
    );
    println!(
        "Morph keyframes: {} in {} tracks",
        style(motion.morph_keyframes.len()).green(),
        morph_tracks.len()
    );

    if let Some(model_path) = model {
        let model = load_model(model_path)?;
        let missing: Vec<&str> = bone_tracks
            .iter()
            .filter(|t| model.skeleton.find(&t.bone_name).is_none())
            .map(|t| t.bone_name.as_str())
            .collect();
        println!(
            "Matched bones: {} of {}",
            style(bone_tracks.len() - missing.len()).green(),
            bone_tracks.len()
        );
        if !missing.is_empty() {
            println!("Missing: {}", style(missing.join(", ")).red());
        }
    }

    if list_tracks {
        println!("\n{}", style("Bone tracks").bold());
        let mut table = create_table(&["Bone", "Keys", "Duration"]);
        for track in &bone_tracks {
            add_table_row(
                &mut table,
                vec![
                    track.bone_name.clone(),
                    track.keyframes.len().to_string(),
                    format_seconds(track.duration()),
                ],
            );
        }
        table.printstd();

        if !morph_tracks.is_empty() {
            println!("\n{}", style("Morph tracks").bold());
            let mut table = create_table(&["Morph", "Keys"]);
            for track in &morph_tracks {
                add_table_row(
                    &mut table,
                    vec![track.morph_name.clone(), track.keyframes.len().to_string()],
                );
            }
            table.printstd();
        }
    }

    Ok(())
}
