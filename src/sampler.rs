//! Incremental conversion of byte-delivery events into throughput readings.
//!
//! The same sampler serves both directions: the download loop feeds it chunk
//! sizes, the upload loop feeds it progress deltas. Emission is time-gated so
//! the sample rate is bounded regardless of how finely the transport chunks
//! the transfer.

use std::time::Duration;

use tokio::time::Instant;

use crate::model::ThroughputSample;
use crate::params;

/// Convert a byte count over an elapsed window to Mbit/s.
///
/// A zero or negative window yields 0, so degenerate timings can never
/// surface as NaN or infinity in an emitted metric.
pub fn mbps(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    (bytes as f64 * 8.0) / (secs * 1e6)
}

/// Accumulates byte deliveries for one throughput phase and periodically
/// produces smoothed instantaneous samples.
///
/// Emitted samples blend the short-window reading with the cumulative
/// average ([`params::INSTANT_WEIGHT`]) to damp transport burstiness; the
/// phase's headline figure comes from [`ThroughputSampler::final_mbps`],
/// which ignores the smoothing entirely.
#[derive(Debug)]
pub struct ThroughputSampler {
    started: Instant,
    gate: Duration,
    total_bytes: u64,
    last_sample_at: Instant,
    bytes_at_last_sample: u64,
    sequence: u64,
}

impl ThroughputSampler {
    /// Begin a phase at `now`, emitting at most one sample per `gate`.
    pub fn start(now: Instant, gate: Duration) -> Self {
        ThroughputSampler {
            started: now,
            gate,
            total_bytes: 0,
            last_sample_at: now,
            bytes_at_last_sample: 0,
            sequence: 0,
        }
    }

    /// Record `bytes` more delivered as of `now`.
    ///
    /// Returns a sample when at least the gate interval has passed since the
    /// previous one; sequence numbers start at 0 and are strictly increasing
    /// within the phase.
    pub fn record(&mut self, now: Instant, bytes: u64) -> Option<ThroughputSample> {
        self.total_bytes += bytes;
        let window = now.saturating_duration_since(self.last_sample_at);
        if window < self.gate {
            return None;
        }
        let delta = self.total_bytes - self.bytes_at_last_sample;
        let instant = mbps(delta, window);
        let average = self.running_estimate(now);
        let sample = ThroughputSample {
            sequence: self.sequence,
            mbps: params::INSTANT_WEIGHT * instant + (1.0 - params::INSTANT_WEIGHT) * average,
        };
        self.sequence += 1;
        self.last_sample_at = now;
        self.bytes_at_last_sample = self.total_bytes;
        Some(sample)
    }

    /// Total bytes recorded so far.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Cumulative average throughput since the phase started.
    pub fn running_estimate(&self, now: Instant) -> f64 {
        mbps(
            self.total_bytes,
            now.saturating_duration_since(self.started),
        )
    }

    /// End-to-end average throughput, the phase's headline figure.
    pub fn final_mbps(&self, now: Instant) -> f64 {
        self.running_estimate(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[test]
    fn mbps_reference_value() {
        assert_eq!(mbps(10_000_000, Duration::from_secs(2)), 40.0);
    }

    #[test]
    fn mbps_guards_zero_elapsed() {
        assert_eq!(mbps(1_000_000, Duration::ZERO), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn emission_is_time_gated() {
        let mut sampler = ThroughputSampler::start(Instant::now(), Duration::from_millis(60));

        advance(Duration::from_millis(10)).await;
        assert!(sampler.record(Instant::now(), 10_000).is_none());

        advance(Duration::from_millis(55)).await;
        assert!(sampler.record(Instant::now(), 10_000).is_some());

        // gate restarts after an emission
        advance(Duration::from_millis(10)).await;
        assert!(sampler.record(Instant::now(), 10_000).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn sequence_numbers_are_monotonic_from_zero() {
        let mut sampler = ThroughputSampler::start(Instant::now(), Duration::from_millis(50));
        let mut sequences = Vec::new();
        for _ in 0..4 {
            advance(Duration::from_millis(50)).await;
            if let Some(sample) = sampler.record(Instant::now(), 1_000) {
                sequences.push(sample.sequence);
            }
        }
        assert_eq!(sequences, vec![0, 1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn samples_blend_instant_with_average() {
        let mut sampler = ThroughputSampler::start(Instant::now(), Duration::from_millis(60));

        advance(Duration::from_secs(1)).await;
        sampler.record(Instant::now(), 500_000);

        // second window is three times faster than the first
        advance(Duration::from_secs(1)).await;
        let sample = sampler.record(Instant::now(), 1_500_000).unwrap();

        // instant 12.0 Mbps, cumulative average 8.0 Mbps
        let expected = 0.3 * 12.0 + 0.7 * 8.0;
        assert!((sample.mbps - expected).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn headline_figure_ignores_smoothing() {
        let mut sampler = ThroughputSampler::start(Instant::now(), Duration::from_millis(60));
        for _ in 0..4 {
            advance(Duration::from_millis(500)).await;
            sampler.record(Instant::now(), 2_500_000);
        }
        assert_eq!(sampler.total_bytes(), 10_000_000);
        assert_eq!(sampler.final_mbps(Instant::now()), 40.0);
    }
}
