use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use log::{info, warn};
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};

use ride_telemetry_rs::config::{EngineConfig, ExerciseType};
use ride_telemetry_rs::engine::{EngineHandle, OutputFrame};
use ride_telemetry_rs::sensors::{self, RouteSimulator};

#[derive(Parser, Debug)]
#[command(name = "ride_tracker")]
#[command(about = "Live 1 Hz telemetry from simulated GPS, inertial and barometer sources", long_about = None)]
struct Args {
    /// Duration in seconds (0 = until Ctrl-C)
    #[arg(value_name = "SECONDS", default_value = "0")]
    duration: u64,

    /// Exercise mode (bicycle, running, hiking, walking)
    #[arg(long, default_value = "running")]
    exercise: ExerciseType,

    /// Disable accelerometer processing
    #[arg(long)]
    no_accel: bool,

    /// Disable gyroscope processing
    #[arg(long)]
    no_gyro: bool,

    /// Disable barometer processing
    #[arg(long)]
    no_baro: bool,

    /// Output directory
    #[arg(long, default_value = "ride_sessions")]
    output_dir: PathBuf,

    /// Do not write the replayable session log
    #[arg(long)]
    no_record: bool,
}

fn default_speed(exercise: ExerciseType) -> f64 {
    match exercise {
        ExerciseType::Bicycle => 6.5,
        ExerciseType::Running => 3.0,
        ExerciseType::Hiking => 1.2,
        ExerciseType::Walking => 1.4,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = EngineConfig::new(args.exercise).with_sensors(!args.no_accel, !args.no_gyro, !args.no_baro);
    info!("Ride tracker starting");
    info!("  Duration: {} seconds (0=continuous)", args.duration);
    info!("  Exercise: {}", config.exercise_type);
    info!(
        "  Sensors: accel={} gyro={} baro={}",
        config.accelerometer, config.gyroscope, config.barometer
    );

    fs::create_dir_all(&args.output_dir)?;
    let session_id = format!("session_{}", Utc::now().format("%Y%m%d_%H%M%S"));
    let frames_path = args.output_dir.join(format!("{}_frames.ndjson", session_id));
    let status_path = args.output_dir.join("status.json");
    let summary_path = args.output_dir.join(format!("{}_summary.json", session_id));
    let log_path = args.output_dir.join(format!("{}.json.gz", session_id));

    let handle = EngineHandle::new(config.clone())?;
    handle.set_recording(!args.no_record)?;
    handle.start()?;

    let route = RouteSimulator::new(37.5665, 126.9780, 38.0, default_speed(config.exercise_type));
    let start = Instant::now();
    let mut producers = vec![tokio::spawn(sensors::gps_loop(handle.clone(), route.clone(), start))];
    if config.motion_enabled() {
        producers.push(tokio::spawn(sensors::inertial_loop(handle.clone(), route.clone(), start)));
    }
    if config.barometer {
        producers.push(tokio::spawn(sensors::baro_loop(handle.clone(), route, start)));
    }

    // 1 Hz ticker, independent of fix arrival
    let (frame_tx, mut frame_rx) = mpsc::channel::<OutputFrame>(64);
    let ticker_handle = handle.clone();
    let ticker = tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match ticker_handle.tick() {
                Ok(Some(frame)) => {
                    if frame_tx.send(frame).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    if !ticker_handle.is_tracking().unwrap_or(false) {
                        break;
                    }
                }
                Err(e) => {
                    warn!("[tick] {}", e);
                    break;
                }
            }
        }
    });

    let mut writer = BufWriter::new(File::create(&frames_path)?);
    let deadline = (args.duration > 0).then(|| start + Duration::from_secs(args.duration));
    let shutdown = async {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    };
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Stopping...");
                break;
            }
            frame = frame_rx.recv() => {
                let Some(frame) = frame else { break };
                serde_json::to_writer(&mut writer, &frame)?;
                writer.write_all(b"\n")?;
                handle.status()?.save(&status_path)?;

                let s = &frame.session;
                info!(
                    "#{} {:.1} m | {:.0}/{:.0} s | +{:.1}/-{:.1} m | grade {} | {}",
                    frame.sequence,
                    s.distance,
                    s.moving_time,
                    s.elapsed_time,
                    s.elevation_gain,
                    s.elevation_loss,
                    frame
                        .grade
                        .map(|g| format!("{:.1}%", g.grade_percent))
                        .unwrap_or_else(|| "-".to_string()),
                    if frame.is_new_fix { "new fix" } else { "held" },
                );
            }
        }
    }

    let summary = handle.stop()?;
    handle.status()?.save(&status_path)?;
    ticker.await?;
    for producer in producers {
        producer.await?;
    }
    writer.flush()?;

    match handle.take_recording()? {
        Some(log) if log.event_count() > 0 => {
            log.save(&log_path)?;
            info!("Session log: {} ({} events)", log_path.display(), log.event_count());
        }
        Some(_) => warn!("No sensor input recorded, session log not written"),
        None => {}
    }

    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;
    info!(
        "Session complete: {:.1} m, avg {:.2} m/s, max {:.2} m/s",
        summary.distance, summary.avg_speed, summary.max_speed
    );
    info!("Frames: {}", frames_path.display());
    info!("Summary: {}", summary_path.display());
    Ok(())
}
