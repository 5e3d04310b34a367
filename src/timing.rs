//! Simulated time keeping and periodic frame-rate reporting.

use std::fmt;
use std::time::Instant;

use nalgebra::Vector3;

/// Frames between two diagnostic reports.
pub const REPORT_INTERVAL_FRAMES: u64 = 1000;

/// Diagnostic emitted every [`REPORT_INTERVAL_FRAMES`] frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FrameReport {
    /// Issued at the first checkpoint, before any rate can be measured.
    InitialPosition(Vector3<f64>),
    /// Average frames per simulated second since the previous checkpoint.
    FramesPerSecond(f64),
}

impl fmt::Display for FrameReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameReport::InitialPosition(position) => write!(
                f,
                "Initial position {:.6} {:.6} {:.6}",
                position.x, position.y, position.z
            ),
            FrameReport::FramesPerSecond(fps) => write!(f, "{:.2} FPS", fps),
        }
    }
}

/// Tracks wall-clock ticks and the simulated time they represent.
///
/// Each tick advances simulated time by the wall-clock gap since the previous
/// tick multiplied by the speedup factor.
#[derive(Clone, Debug)]
pub struct FrameClock {
    speedup: f64,
    last_tick: Option<Instant>,
    time_now_us: u64,
    frame_count: u64,
    last_report_us: Option<u64>,
}

impl FrameClock {
    pub fn new(speedup: f64) -> Self {
        FrameClock {
            speedup,
            last_tick: None,
            time_now_us: 0,
            frame_count: 0,
            last_report_us: None,
        }
    }

    /// Record a tick at `now` and return the simulated step in seconds.
    ///
    /// The first tick, and any tick whose clock ran backwards, has a step of zero.
    pub fn advance(&mut self, now: Instant) -> f64 {
        let dt_us = match self.last_tick {
            Some(last) => {
                (now.saturating_duration_since(last).as_micros() as f64 * self.speedup) as u64
            }
            None => 0,
        };

        self.last_tick = Some(now);
        self.time_now_us += dt_us;
        dt_us as f64 * 1.0e-6
    }

    /// Simulated time since the first tick, in microseconds.
    pub fn time_now_us(&self) -> u64 {
        self.time_now_us
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Count a frame and, every [`REPORT_INTERVAL_FRAMES`] frames, produce a report.
    pub fn checkpoint(&mut self, position: &Vector3<f64>) -> Option<FrameReport> {
        let frame = self.frame_count;
        self.frame_count += 1;
        if frame % REPORT_INTERVAL_FRAMES != 0 {
            return None;
        }

        let report = match self.last_report_us {
            None => Some(FrameReport::InitialPosition(*position)),
            Some(last) if self.time_now_us > last => {
                let elapsed = (self.time_now_us - last) as f64 * 1.0e-6;
                Some(FrameReport::FramesPerSecond(
                    REPORT_INTERVAL_FRAMES as f64 / elapsed,
                ))
            }
            Some(_) => None,
        };
        self.last_report_us = Some(self.time_now_us);
        report
    }
}
