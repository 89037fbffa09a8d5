use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use log::info;
use serde_json::json;

use ride_telemetry_rs::config::ExerciseType;
use ride_telemetry_rs::recording::{ReplayOutput, SessionLog};

#[derive(Parser, Debug)]
struct Args {
    /// Path to a session_*.json[.gz] log
    #[arg(long, conflicts_with = "golden_dir")]
    log: Option<PathBuf>,

    /// Directory of logs to batch replay (session_*.json[.gz], summaries skipped)
    #[arg(long)]
    golden_dir: Option<PathBuf>,

    /// Override the exercise mode recorded in the log
    #[arg(long)]
    exercise: Option<ExerciseType>,

    /// Write every emitted frame as NDJSON next to the log
    #[arg(long, default_value_t = false)]
    write_frames: bool,
}

fn replay_one(path: &Path, args: &Args) -> anyhow::Result<serde_json::Value> {
    let mut log = SessionLog::load(path)?;
    if let Some(exercise) = args.exercise {
        log.config.exercise_type = exercise;
    }
    let ReplayOutput { frames, summary } = log.replay()?;

    if args.write_frames {
        let out_path = path.with_extension("frames.ndjson");
        let mut writer = BufWriter::new(File::create(&out_path)?);
        for frame in &frames {
            serde_json::to_writer(&mut writer, frame)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        info!("Frames written to {}", out_path.display());
    }

    let max_grade = frames
        .iter()
        .filter_map(|f| f.grade.map(|g| g.grade_percent.abs()))
        .fold(0.0_f64, f64::max);
    let motion_frames = frames.iter().filter(|f| f.motion.is_some()).count();

    Ok(json!({
        "log": path.display().to_string(),
        "exercise_type": log.config.exercise_type,
        "events": log.event_count(),
        "frames": frames.len(),
        "frames_with_motion": motion_frames,
        "max_abs_grade_percent": max_grade,
        "summary": summary,
    }))
}

/// `session_<ts>.json[.gz]` as written by ride_tracker; its `_summary.json` is not a log.
fn is_session_log(name: &str) -> bool {
    name.starts_with("session_")
        && !name.ends_with("_summary.json")
        && (name.ends_with(".json") || name.ends_with(".json.gz"))
}

fn collect_logs(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut logs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.file_name().and_then(|n| n.to_str()).is_some_and(is_session_log))
        .collect();
    logs.sort();
    Ok(logs)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let logs = match (&args.log, &args.golden_dir) {
        (Some(log), _) => vec![log.clone()],
        (None, Some(dir)) => collect_logs(dir)?,
        (None, None) => anyhow::bail!("Provide --log or --golden-dir"),
    };
    if logs.is_empty() {
        anyhow::bail!("No session logs found");
    }

    let mut results = Vec::with_capacity(logs.len());
    for path in &logs {
        info!("Replaying {}", path.display());
        results.push(replay_one(path, &args)?);
    }

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_session_logs_are_collected() {
        assert!(is_session_log("session_20260101_000000.json.gz"));
        assert!(is_session_log("session_20260101_000000.json"));
        assert!(!is_session_log("session_20260101_000000_summary.json"));
        assert!(!is_session_log("session_20260101_000000_frames.ndjson"));
        assert!(!is_session_log("status.json"));
    }
}
