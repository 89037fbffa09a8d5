use serde::{Deserialize, Serialize};

use crate::geodesy::fix_distance;
use crate::types::LocationFix;

pub const MAX_GRADE_PERCENT: f64 = 30.0;
/// Below this horizontal run (m) the grade is reported as flat.
pub const MIN_GRADE_DISTANCE_M: f64 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeCategory {
    Flat,
    Gentle,
    Moderate,
    Steep,
    VerySteep,
}

impl GradeCategory {
    pub fn from_grade(grade_percent: f64) -> Self {
        let magnitude = grade_percent.abs();
        if magnitude < 2.0 {
            GradeCategory::Flat
        } else if magnitude < 5.0 {
            GradeCategory::Gentle
        } else if magnitude < 8.0 {
            GradeCategory::Moderate
        } else if magnitude < 12.0 {
            GradeCategory::Steep
        } else {
            GradeCategory::VerySteep
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradeResult {
    pub grade_percent: f64,
    pub category: GradeCategory,
}

impl GradeResult {
    pub fn flat() -> Self {
        Self {
            grade_percent: 0.0,
            category: GradeCategory::Flat,
        }
    }

    /// Grade for a given rise over run, clamped to ±30 %.
    pub fn from_rise_run(rise_m: f64, run_m: f64) -> Self {
        if run_m.is_nan() || run_m < MIN_GRADE_DISTANCE_M {
            return Self::flat();
        }
        let grade_percent = (rise_m / run_m * 100.0).clamp(-MAX_GRADE_PERCENT, MAX_GRADE_PERCENT);
        Self {
            grade_percent,
            category: GradeCategory::from_grade(grade_percent),
        }
    }
}

pub struct GradeCalculator;

impl GradeCalculator {
    pub fn compute(
        current_fix: &LocationFix,
        current_altitude: f64,
        previous_fix: Option<&LocationFix>,
        previous_altitude: f64,
    ) -> GradeResult {
        let Some(previous_fix) = previous_fix else {
            return GradeResult::flat();
        };
        let run = fix_distance(previous_fix, current_fix);
        GradeResult::from_rise_run(current_altitude - previous_altitude, run)
    }
}

/// Grade between consecutive fixes that carried an altitude.
///
/// Rise and run are both measured from the same anchor fix, so a fix without
/// altitude in between does not shorten the run.
#[derive(Clone, Debug, Default)]
pub struct GradeTracker {
    anchor: Option<(LocationFix, f64)>,
}

impl GradeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// None when `altitude` is None; the anchor is kept for the next fix.
    pub fn update(&mut self, fix: &LocationFix, altitude: Option<f64>) -> Option<GradeResult> {
        let altitude = altitude?;
        let result = match &self.anchor {
            Some((anchor_fix, anchor_altitude)) => {
                GradeCalculator::compute(fix, altitude, Some(anchor_fix), *anchor_altitude)
            }
            None => GradeResult::flat(),
        };
        self.anchor = Some((fix.clone(), altitude));
        Some(result)
    }

    pub fn reset(&mut self) {
        self.anchor = None;
    }
}
