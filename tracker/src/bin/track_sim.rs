//! Closed-loop tracking simulation.
//!
//! Wires the tracker to simulated servos, a simulated camera and a scene in
//! which a target sweeps back and forth, then runs the loop for a while and
//! reports how well the target was kept centered.
//!
//! ```text
//! RUST_LOG=info track_sim --duration 20 --target-speed 15
//! RUST_LOG=tracker=debug track_sim --config tracker.json
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use hardware::sim::SimulatedServo;
use serde_json::json;
use shared::{BaseControlConfig, TrackerConfig};
use tracing::info;
use tracker::sim::{SceneParams, SimulatedCamera, SimulatedScene};
use tracker::{base_from_config, CommandDispatcher, ControlParams, Dependencies, TrackingController};

/// Pan-tilt tracking simulator
#[derive(Parser, Debug)]
#[command(name = "track_sim")]
#[command(about = "Run the tracking loop against a simulated rig and scene")]
#[command(version)]
struct Args {
    /// Tracker attribute file (JSON); defaults to a built-in rig
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulation length in seconds
    #[arg(short, long, default_value = "10")]
    duration: f64,

    /// Proportional gain on both axes
    #[arg(long, default_value = "2.0")]
    gain: f64,

    /// Centered-region half-width in normalized frame units
    #[arg(long, default_value = "0.05")]
    deadband: f64,

    /// Control loop period in milliseconds
    #[arg(long, default_value = "100")]
    tick_ms: u64,

    /// Peak target speed in degrees per second (0 holds it still)
    #[arg(long, default_value = "10.0")]
    target_speed: f64,

    /// Seconds between progress reports
    #[arg(long, default_value = "1.0")]
    report_interval: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => TrackerConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => TrackerConfig::new("rig", "cam", "scene"),
    };

    let pan = Arc::new(SimulatedServo::new("pan"));
    let tilt = Arc::new(SimulatedServo::new("tilt"));
    let scene = Arc::new(SimulatedScene::new(
        config.vision_name.clone(),
        pan.clone(),
        tilt.clone(),
        SceneParams {
            label: config.object_label.clone(),
            target_speed_dps: args.target_speed,
            ..Default::default()
        },
    ));

    let servos = Dependencies::new()
        .with_servo(pan.clone())
        .with_servo(tilt.clone());
    let base_config = BaseControlConfig::from_attributes(&json!({"pan": "pan", "tilt": "tilt"}))?;

    let params = ControlParams {
        gain_pan: args.gain,
        gain_tilt: args.gain,
        deadband: args.deadband,
        tick_interval: Duration::from_millis(args.tick_ms),
        ..Default::default()
    };
    let base = base_from_config(&config.base_name, &base_config, &servos, params.io_timeout)?;

    let deps = servos
        .with_base(Arc::new(base))
        .with_camera(Arc::new(SimulatedCamera::new(config.camera_name.clone())))
        .with_vision(scene.clone());

    let controller =
        Arc::new(TrackingController::from_config("tracker", &config, &deps, params).await?);
    let dispatcher = CommandDispatcher::new(controller.clone());

    info!("Simulating {:.1}s of tracking", args.duration);
    let reply = dispatcher.do_command(&json!({"start": {}})).await?;
    info!("start -> {}", reply);

    let deadline = tokio::time::Instant::now() + Duration::from_secs_f64(args.duration);
    let mut report = tokio::time::interval(Duration::from_secs_f64(args.report_interval));
    let mut worst_error: f64 = 0.0;
    while tokio::time::Instant::now() < deadline {
        report.tick().await;
        let (x, y) = scene.target_in_frame();
        let error = (x - 0.5).abs().max((y - 0.5).abs());
        worst_error = worst_error.max(error);
        info!(
            "target at ({:.3}, {:.3}) pan={:.1}° tilt={:.1}°",
            x,
            y,
            pan.angle_deg(),
            tilt.angle_deg()
        );
    }

    let reply = dispatcher.do_command(&json!({"stop": {}})).await?;
    info!("stop -> {}", reply);

    let stats = controller.stats();
    info!(
        "{} ticks, {} detections, {} vision failures, {} command failures",
        stats.ticks, stats.detections, stats.vision_failures, stats.command_failures
    );
    info!("Worst centering error: {:.3}", worst_error);
    info!(
        "Servo commands: pan={} tilt={}",
        pan.command_count(),
        tilt.command_count()
    );

    Ok(())
}
