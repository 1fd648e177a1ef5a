//! Simulated live crane sensor readings.
//!
//! Nothing here talks to hardware: a reading is a random snapshot drawn from
//! fixed per-sensor ranges and rendered into response templates.

use std::ops::Range;

use rand::Rng;
use serde::{Deserialize, Serialize};

pub const PLACEHOLDER_VIBRATION: &str = "{vibration}";
pub const PLACEHOLDER_TEMPERATURE: &str = "{temperature}";
pub const PLACEHOLDER_LOAD: &str = "{load}";
pub const PLACEHOLDER_TORQUE: &str = "{torque}";

/// Vibration in Hz.
pub const VIBRATION_RANGE: Range<f64> = 5.0..15.0;
/// Temperature in °F.
pub const TEMPERATURE_RANGE: Range<f64> = 65.0..85.0;
/// Load in percent of rated capacity.
pub const LOAD_RANGE: Range<f64> = 20.0..100.0;
/// Torque in Nm.
pub const TORQUE_RANGE: Range<f64> = 100.0..250.0;

/// Markers whose presence flags a message as carrying live data.
pub const LIVE_DATA_MARKERS: &[&str] = &["📊", "🔴"];

/// Whether rendered text should be styled as live data.
pub fn has_live_marker(text: &str) -> bool {
    LIVE_DATA_MARKERS.iter().any(|m| text.contains(m))
}

/// One simulated sensor snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiveReading {
    pub vibration: f64,
    pub temperature: f64,
    pub load: f64,
    pub torque: f64,
}

impl LiveReading {
    /// Draw a reading with every field uniform in its range.
    pub fn sample<R: Rng>(rng: &mut R) -> Self {
        Self {
            vibration: rng.random_range(VIBRATION_RANGE),
            temperature: rng.random_range(TEMPERATURE_RANGE),
            load: rng.random_range(LOAD_RANGE),
            torque: rng.random_range(TORQUE_RANGE),
        }
    }

    /// Substitute all four placeholders in `template` from this reading.
    pub fn render(&self, template: &str) -> String {
        template
            .replace(PLACEHOLDER_VIBRATION, &format!("{:.2}", self.vibration))
            .replace(PLACEHOLDER_TEMPERATURE, &format!("{:.1}", self.temperature))
            .replace(PLACEHOLDER_LOAD, &format!("{:.0}", self.load))
            .replace(PLACEHOLDER_TORQUE, &format!("{:.0}", self.torque))
    }
}

/// Produces live readings for template substitution.
pub trait ReadingSource: Send + Sync {
    fn next_reading(&self) -> LiveReading;
}

/// Thread-local RNG backed readings. The default source.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomReadings;

impl ReadingSource for RandomReadings {
    fn next_reading(&self) -> LiveReading {
        LiveReading::sample(&mut rand::rng())
    }
}

/// Always yields the same reading. Used for deterministic rendering.
#[derive(Debug, Clone, Copy)]
pub struct FixedReading(pub LiveReading);

impl ReadingSource for FixedReading {
    fn next_reading(&self) -> LiveReading {
        self.0
    }
}
