//! Presentation sinks for run events.
//!
//! The [`Emitter`] trait is the seam between the measurement engine and a
//! host's presentation layer. Two implementations are provided:
//! - [`HumanReadableEmitter`] — live progress and a formatted summary on a
//!   terminal.
//! - [`JsonEmitter`] — one JSON object per line, suitable for machine
//!   consumption.
//!
//! GUI hosts typically implement the trait themselves (or fold events into a
//! [`crate::state::RunState`]) and trigger their own chart updates and
//! feedback cues from [`Emitter::on_sample`].

use std::io::Write;

use serde::Serialize;

use crate::error::Result;
use crate::model::{LatencyStats, Phase, RunResult, TestEvent, ThroughputSample};

/// Callbacks for speed test lifecycle events.
pub trait Emitter {
    /// Called when a new phase begins, before its measurement work starts.
    fn on_phase(&mut self, phase: Phase, status: &str) -> Result<()>;
    /// Called when latency probing resolves.
    fn on_latency(&mut self, stats: LatencyStats) -> Result<()>;
    /// Called for each live throughput sample.
    fn on_sample(&mut self, phase: Phase, sample: ThroughputSample) -> Result<()>;
    /// Called when a throughput phase resolves with its headline figure.
    fn on_throughput(&mut self, phase: Phase, mbps: f64) -> Result<()>;
    /// Called when a phase fails. The run continues.
    fn on_error(&mut self, phase: Phase, message: &str) -> Result<()>;
    /// Called once the run completes, with the final result.
    fn on_complete(&mut self, result: &RunResult) -> Result<()>;

    /// Dispatch one event from a run's channel to the callback it maps to.
    fn handle(&mut self, event: &TestEvent) -> Result<()> {
        match event {
            TestEvent::PhaseChanged { phase, status } => self.on_phase(*phase, status),
            TestEvent::Latency { stats } => self.on_latency(*stats),
            TestEvent::Sample { phase, sample } => self.on_sample(*phase, *sample),
            TestEvent::PhaseThroughput { phase, mbps } => self.on_throughput(*phase, *mbps),
            TestEvent::PhaseFailed { phase, message } => self.on_error(*phase, message),
            TestEvent::Complete { result } => self.on_complete(result),
        }
    }
}

/// Emits human-readable progress and results to a writer.
pub struct HumanReadableEmitter<W: Write> {
    out: W,
}

impl<W: Write> HumanReadableEmitter<W> {
    /// Create a new emitter writing to `out`.
    pub fn new(out: W) -> Self {
        HumanReadableEmitter { out }
    }
}

impl<W: Write> Emitter for HumanReadableEmitter<W> {
    fn on_phase(&mut self, _phase: Phase, status: &str) -> Result<()> {
        writeln!(self.out, "{status}")?;
        Ok(())
    }

    fn on_latency(&mut self, stats: LatencyStats) -> Result<()> {
        writeln!(
            self.out,
            "ping {} ms, jitter {} ms",
            stats.mean_ms, stats.jitter_ms
        )?;
        Ok(())
    }

    fn on_sample(&mut self, phase: Phase, sample: ThroughputSample) -> Result<()> {
        write!(self.out, "\r{:?}: {:>7.1} Mbit/s", phase, sample.mbps)?;
        self.out.flush()?;
        Ok(())
    }

    fn on_throughput(&mut self, phase: Phase, mbps: f64) -> Result<()> {
        writeln!(self.out, "\r{phase:?}: {mbps:>7.1} Mbit/s")?;
        Ok(())
    }

    fn on_error(&mut self, phase: Phase, message: &str) -> Result<()> {
        writeln!(self.out, "\n{phase:?} failed: {message}")?;
        Ok(())
    }

    fn on_complete(&mut self, result: &RunResult) -> Result<()> {
        writeln!(self.out, "\nTest results\n")?;
        writeln!(
            self.out,
            "{:>10}: {:>7.1} Mbit/s",
            "Download", result.download_mbps
        )?;
        writeln!(
            self.out,
            "{:>10}: {:>7.1} Mbit/s",
            "Upload", result.upload_mbps
        )?;
        writeln!(self.out, "{:>10}: {:>7} ms", "Ping", result.ping_ms)?;
        writeln!(self.out, "{:>10}: {:>7} ms", "Jitter", result.jitter_ms)?;
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum Line<'a> {
    Phase {
        phase: Phase,
        status: &'a str,
    },
    Latency {
        stats: LatencyStats,
    },
    Sample {
        phase: Phase,
        sample: ThroughputSample,
    },
    Throughput {
        phase: Phase,
        mbps: f64,
    },
    Error {
        phase: Phase,
        message: &'a str,
    },
    Complete {
        result: &'a RunResult,
    },
}

/// Emits one JSON object per line for each event.
pub struct JsonEmitter<W: Write> {
    out: W,
}

impl<W: Write> JsonEmitter<W> {
    /// Create a new JSON emitter writing to `out`.
    pub fn new(out: W) -> Self {
        JsonEmitter { out }
    }

    fn emit(&mut self, line: &Line) -> Result<()> {
        let json = serde_json::to_string(line)?;
        writeln!(self.out, "{json}")?;
        Ok(())
    }
}

impl<W: Write> Emitter for JsonEmitter<W> {
    fn on_phase(&mut self, phase: Phase, status: &str) -> Result<()> {
        self.emit(&Line::Phase { phase, status })
    }

    fn on_latency(&mut self, stats: LatencyStats) -> Result<()> {
        self.emit(&Line::Latency { stats })
    }

    fn on_sample(&mut self, phase: Phase, sample: ThroughputSample) -> Result<()> {
        self.emit(&Line::Sample { phase, sample })
    }

    fn on_throughput(&mut self, phase: Phase, mbps: f64) -> Result<()> {
        self.emit(&Line::Throughput { phase, mbps })
    }

    fn on_error(&mut self, phase: Phase, message: &str) -> Result<()> {
        self.emit(&Line::Error { phase, message })
    }

    fn on_complete(&mut self, result: &RunResult) -> Result<()> {
        self.emit(&Line::Complete { result })
    }
}
