//! Offline playback of a motion on a model

use anyhow::{Context, Result, bail};
use clap::Args;
use console::style;
use glam::Mat4;
use mmd_runtime::{PhysicsConfig, RuntimeConfig, SchedulerConfig, Session, TransitionMode};
use std::path::PathBuf;

use crate::utils::{add_table_row, create_table, format_rotation, format_vec3};

#[derive(Args)]
pub struct SimulateArgs {
    /// Path to the PMX model
    pub model: PathBuf,

    /// Path to a VMD motion to play
    pub motion: Option<PathBuf>,

    /// Number of frames to simulate
    #[arg(short, long, default_value = "60")]
    pub frames: u32,

    /// Frames per second
    #[arg(long, default_value = "30")]
    pub fps: f32,

    /// Bone to report (can be repeated, defaults to every bone)
    #[arg(short, long = "bone", value_name = "NAME")]
    pub bones: Vec<String>,

    /// Report every N frames instead of only the last one
    #[arg(long, value_name = "N")]
    pub every: Option<u32>,

    /// Disable rigidbody simulation
    #[arg(long)]
    pub no_physics: bool,

    /// Restart the motion after its last keyframe
    #[arg(long = "loop")]
    pub looping: bool,

    /// Slerp between keyframes instead of snapping to them
    #[arg(long)]
    pub linear: bool,
}

impl SimulateArgs {
    fn config(&self) -> RuntimeConfig {
        RuntimeConfig {
            physics: PhysicsConfig {
                enabled: !self.no_physics,
                ..Default::default()
            },
            scheduler: SchedulerConfig {
                transition: if self.linear {
                    TransitionMode::Linear
                } else {
                    TransitionMode::Snap
                },
                looping: self.looping,
            },
        }
    }
}

pub fn execute(args: SimulateArgs) -> Result<()> {
    if !(args.fps.is_finite() && args.fps > 0.0) {
        bail!("Frame rate must be positive, got {}", args.fps);
    }

    let mut session = Session::new(args.config());

    let data = std::fs::read(&args.model)
        .with_context(|| format!("Failed to read model: {}", args.model.display()))?;
    session
        .load_model(&data)
        .with_context(|| format!("Failed to load PMX model: {}", args.model.display()))?;

    if let Some(motion) = &args.motion {
        let data = std::fs::read(motion)
            .with_context(|| format!("Failed to read motion: {}", motion.display()))?;
        let tracks = session
            .load_animation(&data)
            .with_context(|| format!("Failed to load VMD motion: {}", motion.display()))?;
        log::info!("Loaded {} bone tracks", tracks.len());
    }

    let bones = resolve_bones(&session, &args.bones)?;
    session.play()?;

    if let Some(physics) = session.physics() {
        println!(
            "Physics: {} of {} rigidbodies, {} joints",
            style(physics.enabled_body_count()).green(),
            physics.body_count(),
            style(physics.joints().len()).green()
        );
    }

    let dt = 1.0 / args.fps;
    let every = args.every.filter(|&n| n > 0);
    for frame in 1..=args.frames {
        session.update(dt);
        let report = frame == args.frames || every.is_some_and(|n| frame % n == 0);
        if report {
            print_frame(&session, frame, frame as f32 * dt, &bones);
        }
    }

    Ok(())
}

/// Bone indices for the requested names, every bone when none are given.
fn resolve_bones(session: &Session, names: &[String]) -> Result<Vec<usize>> {
    let Some(model) = session.model() else {
        bail!("No model loaded");
    };
    if names.is_empty() {
        return Ok((0..model.skeleton.len()).collect());
    }
    names
        .iter()
        .map(|name| {
            model
                .skeleton
                .find(name)
                .with_context(|| format!("Model has no bone named '{name}'"))
        })
        .collect()
}

fn print_frame(session: &Session, frame: u32, seconds: f32, bones: &[usize]) {
    let Some(model) = session.model() else {
        return;
    };
    let world = session.world_matrices();

    println!(
        "\n{}",
        style(format!("Frame {frame} ({seconds:.2}s)")).bold()
    );
    let mut table = create_table(&["Index", "Bone", "Position", "Rotation"]);
    for &index in bones {
        let matrix = world.get(index).copied().unwrap_or(Mat4::IDENTITY);
        let (_, rotation, translation) = matrix.to_scale_rotation_translation();
        let name = model
            .skeleton
            .bone(index)
            .map_or("", |bone| bone.name.as_str());
        add_table_row(
            &mut table,
            vec![
                index.to_string(),
                name.to_string(),
                format_vec3(translation),
                format_rotation(rotation),
            ],
        );
    }
    table.printstd();
}
