//! Data model shared by the measurement engine and presentation sinks.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Phase of a speed test run.
///
/// Progression is one-directional: `Ready` → `Latency` → `Download` →
/// `Upload` → `Complete`, with an explicit reset returning to `Ready` from
/// any phase. No phase is revisited within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Idle, no run in progress.
    Ready,
    /// Round-trip latency probes in flight.
    Latency,
    /// Download throughput measurement.
    Download,
    /// Upload throughput measurement.
    Upload,
    /// Run finished; results are final.
    Complete,
}

impl Phase {
    /// Human-readable status line for this phase.
    pub fn status(self) -> &'static str {
        match self {
            Phase::Ready => "READY TO SCAN",
            Phase::Latency => "LATENCY CHECK...",
            Phase::Download => "CALCULATING DOWNLOAD SPEED",
            Phase::Upload => "CALCULATING UPLOAD SPEED",
            Phase::Complete => "DIAGNOSTIC FINALIZED",
        }
    }
}

/// Round-trip latency statistics over one run's probe set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyStats {
    /// Mean round-trip time, rounded to whole milliseconds.
    pub mean_ms: u64,
    /// Spread (max − min) across the probes, rounded to whole milliseconds.
    pub jitter_ms: u64,
}

/// One smoothed instantaneous throughput reading, emitted for live display.
///
/// Samples drive the gauge and chart only; the phase's headline figure is
/// computed from total bytes over total elapsed time, never from these.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThroughputSample {
    /// Position within the phase, starting at 0 and strictly increasing.
    pub sequence: u64,
    /// Smoothed throughput in Mbit/s.
    pub mbps: f64,
}

/// Accumulated results of one run.
///
/// Created empty when the run starts; each phase fills in its own fields as
/// it resolves. A failed phase leaves its fields at 0. Final once the run
/// reaches [`Phase::Complete`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Download throughput in Mbit/s.
    pub download_mbps: f64,
    /// Upload throughput in Mbit/s.
    pub upload_mbps: f64,
    /// Mean round-trip latency in milliseconds.
    pub ping_ms: u64,
    /// Latency spread in milliseconds.
    pub jitter_ms: u64,
    /// Creation time of this record, milliseconds since the Unix epoch.
    /// Stamped once, not updated per phase.
    pub timestamp_ms: u64,
}

impl RunResult {
    /// An empty result stamped with the current time.
    pub fn new() -> Self {
        RunResult {
            download_mbps: 0.0,
            upload_mbps: 0.0,
            ping_ms: 0,
            jitter_ms: 0,
            timestamp_ms: epoch_ms(),
        }
    }
}

impl Default for RunResult {
    fn default() -> Self {
        RunResult::new()
    }
}

/// Events published by a run, in the order they occur.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum TestEvent {
    /// A new phase has begun. Sent before any of the phase's measurement
    /// work starts, so observers can show "in progress" immediately.
    PhaseChanged {
        /// The phase being entered.
        phase: Phase,
        /// Status line for display.
        status: &'static str,
    },
    /// Latency probing resolved.
    Latency {
        /// Mean and spread over the probe set.
        stats: LatencyStats,
    },
    /// A live throughput sample. Hosts wanting audible or haptic feedback
    /// cues should trigger them on this event.
    Sample {
        /// Phase the sample belongs to.
        phase: Phase,
        /// The smoothed reading.
        sample: ThroughputSample,
    },
    /// A throughput phase resolved with its headline figure.
    PhaseThroughput {
        /// The phase that resolved.
        phase: Phase,
        /// End-to-end average throughput in Mbit/s; 0 on failure.
        mbps: f64,
    },
    /// A phase failed. The run continues; the failed phase reports 0.
    PhaseFailed {
        /// The phase that failed.
        phase: Phase,
        /// User-visible error marker.
        message: String,
    },
    /// The run finished; `result` is final.
    Complete {
        /// The fully populated result record.
        result: RunResult,
    },
}

/// Milliseconds since the Unix epoch. Falls back to 0 if the system clock
/// reads before the epoch.
pub(crate) fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_event_tagged() {
        let event = TestEvent::PhaseChanged {
            phase: Phase::Download,
            status: Phase::Download.status(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"PhaseChanged""#));
        assert!(json.contains(r#""phase":"download""#));
    }

    #[test]
    fn result_round_trip() {
        let result = RunResult {
            download_mbps: 87.5,
            upload_mbps: 12.25,
            ping_ms: 23,
            jitter_ms: 4,
            timestamp_ms: 1_700_000_000_000,
        };
        let json = serde_json::to_string(&result).unwrap();
        let back: RunResult = serde_json::from_str(&json).unwrap();
        assert_eq!(result, back);
    }

    #[test]
    fn new_result_is_zeroed_but_stamped() {
        let result = RunResult::new();
        assert_eq!(result.download_mbps, 0.0);
        assert_eq!(result.upload_mbps, 0.0);
        assert_eq!(result.ping_ms, 0);
        assert_eq!(result.jitter_ms, 0);
        assert!(result.timestamp_ms > 0);
    }
}
