//! Default endpoints and tuning parameters.

use std::time::Duration;

/// Default latency probe target: small, stable, globally cached.
pub const DEFAULT_PING_URL: &str = "https://www.google.com/favicon.ico";

/// Default download source: a large image served with a streamable body.
pub const DEFAULT_DOWNLOAD_URL: &str =
    "https://images.unsplash.com/photo-1451187580459-43490279c0fa?auto=format&fit=crop&w=2000&q=80";

/// Default upload target: accepts an arbitrary POST body.
pub const DEFAULT_UPLOAD_URL: &str = "https://httpbin.org/post";

/// Number of latency probes per run.
pub const PING_SAMPLES: usize = 3;

/// Pause between latency probes, so connection reuse does not skew timings.
pub const PING_GAP: Duration = Duration::from_millis(50);

/// Base value of a synthetic latency sample substituted for a failed probe.
pub const PING_FALLBACK_MS: f64 = 10.0;

/// Width of the random jitter added to a synthetic latency sample.
pub const PING_FALLBACK_SPREAD_MS: f64 = 5.0;

/// Wall-clock cap on the download phase.
pub const DOWNLOAD_CAP: Duration = Duration::from_secs(4);

/// Minimum time between download throughput samples.
pub const DOWNLOAD_SAMPLE_GATE: Duration = Duration::from_millis(60);

/// Size of the upload payload (2 MiB).
pub const UPLOAD_PAYLOAD_BYTES: usize = 2 * 1024 * 1024;

/// Wall-clock cap on the upload phase. Hitting it resolves the phase with
/// the running estimate rather than failing it.
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(3);

/// Minimum time between upload throughput samples.
pub const UPLOAD_SAMPLE_GATE: Duration = Duration::from_millis(50);

/// Chunk size for random payload generation (64 KiB), bounding peak load on
/// the entropy source.
pub const ENTROPY_CHUNK: usize = 64 * 1024;

/// Weight of the instantaneous reading in an emitted sample; the remainder
/// comes from the cumulative average. Tunable; 0.3/0.7 keeps the live gauge
/// steady without hiding real rate changes.
pub const INSTANT_WEIGHT: f64 = 0.3;

/// Capacity of the live sample history kept for charting.
pub const HISTORY_CAPACITY: usize = 40;

/// Capacity of the per-run event channel.
pub const EVENT_CHANNEL_SIZE: usize = 64;
