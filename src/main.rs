use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use metaball_particles::{MeshShape, RunError, SceneConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "GPU particles rendered as ray-marched metaballs", long_about = None)]
struct Args {
    /// TOML scene file. Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Particle count. Must be a perfect square.
    #[arg(long)]
    particles: Option<u32>,
    /// Directory holding px/nx/py/ny/pz/nz sky faces.
    #[arg(long)]
    sky: Option<PathBuf>,
    /// Ray march at 1/RATE resolution.
    #[arg(long, value_name = "RATE")]
    downsample: Option<f32>,
    /// Debug mesh shape: none, cube, octahedron or icosphere.
    #[arg(long, value_parser = parse_mesh)]
    mesh: Option<MeshShape>,
    #[arg(long)]
    no_mesh: bool,
    #[arg(long)]
    no_raymarch: bool,
    /// Print the resolved scene as TOML and exit.
    #[arg(long)]
    dump_config: bool,
}

fn parse_mesh(name: &str) -> Result<MeshShape, String> {
    MeshShape::from_name(name).ok_or_else(|| format!("unknown mesh shape '{}'", name))
}

fn build_config(args: &Args) -> Result<SceneConfig, RunError> {
    let mut config = match &args.config {
        Some(path) => SceneConfig::load(path)?,
        None => SceneConfig::default(),
    };

    if let Some(count) = args.particles {
        config = config.with_particle_count(count);
    }
    if let Some(dir) = &args.sky {
        config = config.with_sky(dir);
    }
    if let Some(rate) = args.downsample {
        config = config.with_downsample(rate);
    }
    if let Some(shape) = args.mesh {
        config = config.with_debug_mesh(shape);
    }
    if args.no_mesh {
        config = config.with_debug_mesh_enabled(false);
    }
    if args.no_raymarch {
        config = config.with_raymarch_enabled(false);
    }
    Ok(config.sanitized())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.dump_config {
        return match config.to_toml_string() {
            Ok(text) => {
                print!("{}", text);
                ExitCode::SUCCESS
            }
            Err(e) => {
                log::error!("{}", e);
                ExitCode::FAILURE
            }
        };
    }

    match metaball_particles::run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
