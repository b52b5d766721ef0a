//! rk-ik-sim entry point

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rk_ik_sim::{Runner, Scene};

/// Run the IK chains of a RON scene headlessly
#[derive(Parser, Debug)]
#[command(name = "rk-ik-sim", version, about)]
struct Args {
    /// Scene file to load
    scene: PathBuf,
    /// Number of ticks to run, overriding the scene
    #[arg(long)]
    ticks: Option<u32>,
    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rk_ik=info,rk_ik_sim=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let scene = match Scene::load(&args.scene) {
        Ok(scene) => scene,
        Err(e) => {
            tracing::error!("Failed to load {}: {}", args.scene.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let mut runner = match Runner::from_scene(&scene) {
        Ok(runner) => runner,
        Err(e) => {
            tracing::error!("Failed to set up scene '{}': {}", scene.name, e);
            return ExitCode::FAILURE;
        }
    };

    let summary = runner.run(args.ticks.unwrap_or(scene.ticks), None);

    if args.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                tracing::error!("Failed to serialize summary: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        for chain in &summary.chains {
            match (&chain.skipped, chain.distance) {
                (Some(reason), _) => println!("{}: skipped ({reason})", chain.name),
                (None, Some(distance)) => println!(
                    "{}: distance {distance:.4}, {} rotations, {}",
                    chain.name,
                    chain.rotations,
                    match chain.converged_at {
                        Some(tick) => format!("converged at tick {tick}"),
                        None => "not converged".to_owned(),
                    }
                ),
                (None, None) => println!("{}: no pose", chain.name),
            }
        }
    }

    ExitCode::SUCCESS
}
