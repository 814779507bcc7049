//! Download throughput measurement.
//!
//! Streams a large payload and feeds chunk sizes through a
//! [`ThroughputSampler`] until the body ends or the wall-clock cap expires,
//! whichever comes first. The cap is authoritative: dropping the stream at
//! expiry cancels the underlying connection.

use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{Stream, StreamExt};
use tokio::time::{Instant, timeout};
use tracing::debug;

use crate::error::{Result, SpeedProbeError};
use crate::model::ThroughputSample;
use crate::sampler::ThroughputSampler;

/// Open a streaming read of `url` with caching disabled.
///
/// Callers append a cache-busting query parameter so repeated runs never
/// measure a cached copy.
pub(crate) async fn open(
    client: &reqwest::Client,
    url: url::Url,
) -> Result<BoxStream<'static, reqwest::Result<Bytes>>> {
    let response = client
        .get(url)
        .header(reqwest::header::CACHE_CONTROL, "no-cache")
        .send()
        .await?
        .error_for_status()?;
    Ok(response.bytes_stream().boxed())
}

/// Consume `stream` for at most `cap`, emitting one smoothed sample per
/// `gate` interval, and return the end-to-end average Mbit/s over the bytes
/// actually received.
///
/// A mid-stream transport error propagates; the caller converts it into a
/// zero-valued phase result.
pub async fn measure<S, E>(
    mut stream: S,
    cap: Duration,
    gate: Duration,
    mut emit: impl FnMut(ThroughputSample),
) -> Result<f64>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    SpeedProbeError: From<E>,
{
    let start = Instant::now();
    let mut sampler = ThroughputSampler::start(start, gate);

    loop {
        let Some(remaining) = cap.checked_sub(start.elapsed()) else {
            debug!(
                total_bytes = sampler.total_bytes(),
                "download cap reached"
            );
            break;
        };
        match timeout(remaining, stream.next()).await {
            Err(_) => {
                debug!(
                    total_bytes = sampler.total_bytes(),
                    "download cap reached while waiting for data"
                );
                break;
            }
            Ok(None) => break,
            Ok(Some(Ok(chunk))) => {
                if let Some(sample) = sampler.record(Instant::now(), chunk.len() as u64) {
                    emit(sample);
                }
            }
            Ok(Some(Err(err))) => return Err(err.into()),
        }
    }

    // dropping the stream here cancels the connection if the body is unread
    Ok(sampler.final_mbps(Instant::now()))
}
