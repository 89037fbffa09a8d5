//! Recorded sessions and deterministic replay through the engine.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::info;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::engine::{FusionEngine, OutputFrame};
use crate::error::{TResult, TelemetryError};
use crate::session::SessionSummary;
use crate::types::{InertialSample, LocationFix, PressureSample};

/// Tick spacing on the log's clock.
pub const TICK_INTERVAL_MS: i64 = 1_000;

/// Every input of one session, as fed to the engine.
///
/// Unknown keys are rejected so that summary or status JSON lying next to a
/// log is not mistaken for an empty session.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionLog {
    #[serde(default)]
    pub config: EngineConfig,
    #[serde(default)]
    pub fixes: Vec<LocationFix>,
    #[serde(default)]
    pub inertial: Vec<InertialSample>,
    #[serde(default)]
    pub pressure: Vec<PressureSample>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplayOutput {
    pub frames: Vec<OutputFrame>,
    pub summary: SessionSummary,
}

enum Event<'a> {
    Pressure(&'a PressureSample),
    Inertial(&'a InertialSample),
    Fix(&'a LocationFix),
}

impl Event<'_> {
    /// Sort key: sensor state at a given instant is applied before a fix at the same instant.
    fn key(&self) -> (i64, u8) {
        match self {
            Event::Pressure(p) => (p.timestamp_ms, 0),
            Event::Inertial(s) => (s.timestamp_ms, 1),
            Event::Fix(f) => (f.timestamp_ms, 2),
        }
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

impl SessionLog {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Load a `.json` or `.json.gz` log.
    pub fn load(path: impl AsRef<Path>) -> TResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut reader: Box<dyn Read> = if is_gzip(path) {
            Box::new(GzDecoder::new(BufReader::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };
        let mut json = String::new();
        reader.read_to_string(&mut json)?;
        let log: SessionLog = serde_json::from_str(&json)?;
        log.config.validate()?;
        if log.event_count() == 0 {
            return Err(TelemetryError::InvalidLog(format!(
                "{} has no fixes, inertial or pressure samples",
                path.display()
            )));
        }
        Ok(log)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> TResult<()> {
        let path = path.as_ref();
        let file = BufWriter::new(File::create(path)?);
        if is_gzip(path) {
            let mut encoder = GzEncoder::new(file, Compression::default());
            serde_json::to_writer(&mut encoder, self)?;
            encoder.finish()?.flush()?;
        } else {
            let mut file = file;
            serde_json::to_writer(&mut file, self)?;
            file.flush()?;
        }
        Ok(())
    }

    pub fn event_count(&self) -> usize {
        self.fixes.len() + self.inertial.len() + self.pressure.len()
    }

    fn events(&self) -> Vec<Event<'_>> {
        let mut events: Vec<Event<'_>> = Vec::with_capacity(self.event_count());
        events.extend(self.pressure.iter().map(Event::Pressure));
        events.extend(self.inertial.iter().map(Event::Inertial));
        events.extend(self.fixes.iter().map(Event::Fix));
        events.sort_by_key(|e| e.key());
        events
    }

    /// Feed every event in time order and tick once per second of log time.
    pub fn replay(&self) -> TResult<ReplayOutput> {
        let mut engine = FusionEngine::new(self.config.clone())?;
        engine.start()?;

        let events = self.events();
        let mut frames = Vec::new();
        let mut next_tick = events.first().map(|e| e.key().0 + TICK_INTERVAL_MS);

        for event in &events {
            let (timestamp, _) = event.key();
            while let Some(due) = next_tick.filter(|due| *due <= timestamp) {
                frames.extend(engine.tick());
                next_tick = Some(due + TICK_INTERVAL_MS);
            }
            match event {
                Event::Pressure(p) => engine.on_pressure_sample((*p).clone()),
                Event::Inertial(s) => engine.on_inertial_sample((*s).clone()),
                Event::Fix(f) => engine.on_fix_received((*f).clone()),
            }
        }
        // Flush the state left by the last events
        frames.extend(engine.tick());

        let summary = engine.stop()?;
        info!(
            "Replayed {} events into {} frames ({:.1} m)",
            events.len(),
            frames.len(),
            summary.distance
        );
        Ok(ReplayOutput { frames, summary })
    }
}
