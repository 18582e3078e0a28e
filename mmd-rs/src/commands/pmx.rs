//! PMX model command implementations

use anyhow::{Context, Result};
use clap::Subcommand;
use console::style;
use mmd_pmx::{PmxModel, RigidbodyMode};
use std::path::{Path, PathBuf};

use crate::utils::{
    TreeOptions, add_table_row, create_table, format_bytes, format_index, format_vec3,
    render_tree, skeleton_tree,
};

#[derive(Subcommand)]
pub enum PmxCommands {
    /// Display information about a PMX model
    Info {
        /// Path to the PMX file
        file: PathBuf,

        /// Also list materials
        #[arg(short, long)]
        detailed: bool,
    },

    /// List the bones of a PMX model
    Bones {
        /// Path to the PMX file
        file: PathBuf,

        /// Show the bone hierarchy as a tree
        #[arg(short, long)]
        tree: bool,

        /// Maximum tree depth to display
        #[arg(long)]
        depth: Option<usize>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// List the rigidbodies and joints of a PMX model
    Physics {
        /// Path to the PMX file
        file: PathBuf,
    },
}

pub fn execute(command: PmxCommands) -> Result<()> {
    match command {
        PmxCommands::Info { file, detailed } => execute_info(&file, detailed),
        PmxCommands::Bones {
            file,
            tree,
            depth,
            no_color,
        } => execute_bones(&file, tree, depth, no_color),
        PmxCommands::Physics { file } => execute_physics(&file),
    }
}

/// Load a PMX model, attaching the path to any error.
pub fn load_model(path: &Path) -> Result<PmxModel> {
    PmxModel::load(path).with_context(|| format!("Failed to load PMX model: {}", path.display()))
}

fn execute_info(path: &Path, detailed: bool) -> Result<()> {
    let model = load_model(path)?;
    let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    let header = &model.header;

    println!("\n{}", style("PMX Model Information").bold().underlined());
    println!("File: {} ({})", style(path.display()).cyan(), format_bytes(size));
    println!("Version: {}", style(format!("{:.1}", header.version)).yellow());
    println!("Encoding: {:?}", header.encoding);
    println!("Name: {}", header.name);
    if !header.english_name.is_empty() {
        println!("English name: {}", header.english_name);
    }
    if !header.comment.is_empty() {
        println!("Comment: {}", header.comment.trim());
    }

    println!("\n{}", style("Contents").bold());
    println!("Vertices: {}", style(model.vertices.len()).green());
    println!("Triangles: {}", style(model.triangle_count()).green());
    println!("Textures: {}", style(model.textures.len()).green());
    println!("Materials: {}", style(model.materials.len()).green());
    println!("Bones: {}", style(model.skeleton.len()).green());
    println!("Morphs: {}", style(model.morph_count).green());
    println!("Display frames: {}", style(model.display_frame_count).green());
    println!("Rigidbodies: {}", style(model.rigidbodies.len()).green());
    println!("Joints: {}", style(model.joints.len()).green());

    if detailed && !model.materials.is_empty() {
        println!("\n{}", style("Materials").bold());
        let mut table = create_table(&["Index", "Name", "Texture", "Faces"]);
        for (index, material) in model.materials.iter().enumerate() {
            let texture = material
                .texture
                .and_then(|t| model.textures.get(t))
                .cloned()
                .unwrap_or_else(|| "-".to_string());
            add_table_row(
                &mut table,
                vec![
                    index.to_string(),
                    material.name.clone(),
                    texture,
                    material.face_count.to_string(),
                ],
            );
        }
        table.printstd();
    }

    Ok(())
}

/// Per bone, whether a dynamic rigidbody drives it.
fn physics_bones(model: &PmxModel) -> Vec<bool> {
    let mut driven = vec![false; model.skeleton.len()];
    for rigidbody in &model.rigidbodies {
        if rigidbody.mode != RigidbodyMode::FollowBone
            && let Some(slot) = rigidbody.bone.and_then(|b| driven.get_mut(b))
        {
            *slot = true;
        }
    }
    driven
}

fn execute_bones(path: &Path, tree: bool, depth: Option<usize>, no_color: bool) -> Result<()> {
    let model = load_model(path)?;

    if tree {
        let name = path
            .file_name()
            .map_or_else(|| model.header.name.clone(), |n| n.to_string_lossy().into_owned());
        let root = skeleton_tree(&name, &model.skeleton, &physics_bones(&model));
        let options = TreeOptions {
            max_depth: depth,
            no_color,
            show_metadata: true,
        };
        print!("{}", render_tree(&root, &options));
        return Ok(());
    }

    let mut table = create_table(&["Index", "Name", "Parent", "Position", "Append", "IK"]);
    for (index, bone) in model.skeleton.bones().iter().enumerate() {
        let append = bone.append.as_ref().map_or_else(
            || "-".to_string(),
            |a| format!("{} × {:.2}", format_index(a.parent), a.ratio),
        );
        let ik = bone
            .ik
            .as_ref()
            .map_or_else(|| "-".to_string(), |ik| format!("{} links", ik.links.len()));
        add_table_row(
            &mut table,
            vec![
                index.to_string(),
                bone.name.clone(),
                format_index(bone.parent),
                format_vec3(bone.position),
                append,
                ik,
            ],
        );
    }
    table.printstd();
    Ok(())
}

fn execute_physics(path: &Path) -> Result<()> {
    let model = load_model(path)?;
    let bones = model.skeleton.bones();
    let bone_name = |index: Option<usize>| {
        index
            .and_then(|i| bones.get(i))
            .map_or_else(|| "-".to_string(), |b| b.name.clone())
    };

    println!("\n{}", style("Rigidbodies").bold());
    let mut table = create_table(&["Index", "Name", "Bone", "Shape", "Mode", "Mass", "Group"]);
    for (index, rigidbody) in model.rigidbodies.iter().enumerate() {
        add_table_row(
            &mut table,
            vec![
                index.to_string(),
                rigidbody.name.clone(),
                bone_name(rigidbody.bone),
                format!("{:?}", rigidbody.shape),
                format!("{:?}", rigidbody.mode),
                format!("{:.3}", rigidbody.mass),
                format!("{} / {:#06x}", rigidbody.group, rigidbody.collision_mask),
            ],
        );
    }
    table.printstd();

    println!("\n{}", style("Joints").bold());
    let body_name = |index: Option<usize>| {
        index
            .and_then(|i| model.rigidbodies.get(i))
            .map_or_else(|| "-".to_string(), |r| r.name.clone())
    };
    let mut table = create_table(&["Index", "Name", "Body A", "Body B", "Position"]);
    for (index, joint) in model.joints.iter().enumerate() {
        add_table_row(
            &mut table,
            vec![
                index.to_string(),
                joint.name.clone(),
                body_name(joint.rigidbody_a),
                body_name(joint.rigidbody_b),
                format_vec3(joint.position),
            ],
        );
    }
    table.printstd();
    Ok(())
}
