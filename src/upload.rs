//! Upload throughput measurement.
//!
//! POSTs a randomly generated payload and samples throughput from body
//! progress. Hitting the phase timeout is a designed outcome: the transfer is
//! aborted and the phase resolves with the running estimate accumulated so
//! far, never with a failure.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::error::Result;
use crate::model::ThroughputSample;
use crate::params;
use crate::sampler::{ThroughputSampler, mbps};

/// Generate `len` random bytes as a chunk list.
///
/// Random content defeats upstream compression that would otherwise inflate
/// the measured rate; chunked generation bounds peak load on the entropy
/// source.
pub fn random_payload(len: usize) -> Vec<Bytes> {
    let mut rng = StdRng::from_os_rng();
    let mut chunks = Vec::with_capacity(len.div_ceil(params::ENTROPY_CHUNK));
    let mut remaining = len;
    while remaining > 0 {
        let size = remaining.min(params::ENTROPY_CHUNK);
        let mut buf = vec![0u8; size];
        rng.fill_bytes(&mut buf);
        chunks.push(Bytes::from(buf));
        remaining -= size;
    }
    chunks
}

/// POST `payload_len` random bytes to `url`, emitting one smoothed sample
/// per `gate` interval.
///
/// Resolves with the payload-over-total-elapsed figure on completion, or the
/// last running estimate if `cap` expires first. A genuine transport error
/// propagates; the caller converts it into a zero-valued phase result.
pub async fn measure(
    client: &reqwest::Client,
    url: url::Url,
    payload_len: usize,
    cap: Duration,
    gate: Duration,
    emit: impl FnMut(ThroughputSample),
) -> Result<f64> {
    let chunks = random_payload(payload_len);
    let (progress_tx, progress_rx) = mpsc::unbounded_channel();

    // each chunk reports its size as it is handed to the transport
    let body = reqwest::Body::wrap_stream(futures_util::stream::unfold(
        (chunks.into_iter(), progress_tx),
        |(mut it, tx)| async move {
            let chunk = it.next()?;
            let _ = tx.send(chunk.len());
            Some((Ok::<Bytes, std::io::Error>(chunk), (it, tx)))
        },
    ));

    let request = client
        .post(url)
        .header(reqwest::header::CACHE_CONTROL, "no-cache")
        .body(body)
        .send();
    let transfer = async move {
        request.await?.error_for_status()?;
        Ok(())
    };

    drive(transfer, progress_rx, payload_len, cap, gate, emit).await
}

/// Run the sampling loop against an in-flight transfer.
///
/// Dropping `transfer` on timeout aborts the request, so no connection
/// outlives the phase.
async fn drive<F>(
    transfer: F,
    mut progress: mpsc::UnboundedReceiver<usize>,
    payload_len: usize,
    cap: Duration,
    gate: Duration,
    mut emit: impl FnMut(ThroughputSample),
) -> Result<f64>
where
    F: Future<Output = Result<()>>,
{
    let start = Instant::now();
    let mut sampler = ThroughputSampler::start(start, gate);
    let mut estimate = 0.0;
    let deadline = sleep(cap);
    tokio::pin!(deadline, transfer);

    loop {
        tokio::select! {
            result = &mut transfer => {
                result?;
                // natural completion supersedes the running estimate
                return Ok(mbps(payload_len as u64, start.elapsed()));
            }
            Some(bytes) = progress.recv() => {
                let now = Instant::now();
                if let Some(sample) = sampler.record(now, bytes as u64) {
                    emit(sample);
                    estimate = sampler.running_estimate(now);
                }
            }
            _ = &mut deadline => {
                debug!(estimate, "upload timeout, resolving with running estimate");
                return Ok(estimate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpeedProbeError;

    #[test]
    fn payload_is_chunked_to_full_length() {
        let chunks = random_payload(150_000);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), params::ENTROPY_CHUNK);
        assert_eq!(chunks.iter().map(Bytes::len).sum::<usize>(), 150_000);
    }

    #[test]
    fn empty_payload_has_no_chunks() {
        assert!(random_payload(0).is_empty());
    }

    fn feed_progress(deltas: Vec<(u64, usize)>) -> mpsc::UnboundedReceiver<usize> {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            for (delay_ms, bytes) in deltas {
                sleep(Duration::from_millis(delay_ms)).await;
                let _ = tx.send(bytes);
            }
            // keep the sender alive so the channel stays open past the cap
            sleep(Duration::from_secs(600)).await;
        });
        rx
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_resolves_with_running_estimate() {
        // 1 MB of progress over the first second, then a stall
        let progress = feed_progress(vec![(250, 250_000); 4]);
        let start = Instant::now();
        let result = drive(
            std::future::pending::<Result<()>>(),
            progress,
            5_000_000,
            Duration::from_secs(3),
            Duration::from_millis(50),
            |_| {},
        )
        .await
        .unwrap();

        // did not block past the timeout, and reported the estimate, not 0
        assert_eq!(start.elapsed(), Duration::from_secs(3));
        assert_eq!(result, 8.0);
    }

    #[tokio::test(start_paused = true)]
    async fn completion_supersedes_the_estimate() {
        let progress = feed_progress(vec![(400, 800_000); 5]);
        let transfer = async {
            sleep(Duration::from_secs(2)).await;
            Ok(())
        };
        let result = drive(
            transfer,
            progress,
            4_000_000,
            Duration::from_secs(3),
            Duration::from_millis(50),
            |_| {},
        )
        .await
        .unwrap();

        // 4 MB over 2.0 s
        assert_eq!(result, 16.0);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_propagates() {
        let progress = feed_progress(vec![(100, 100_000)]);
        let transfer = async {
            sleep(Duration::from_millis(200)).await;
            Err(SpeedProbeError::IoError(std::io::Error::other(
                "connection closed",
            )))
        };
        let result = drive(
            transfer,
            progress,
            1_000_000,
            Duration::from_secs(3),
            Duration::from_millis(50),
            |_| {},
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_with_no_progress_yields_zero() {
        let (_tx, progress) = mpsc::unbounded_channel();
        let result = drive(
            std::future::pending::<Result<()>>(),
            progress,
            1_000_000,
            Duration::from_millis(100),
            Duration::from_millis(50),
            |_| {},
        )
        .await
        .unwrap();
        assert_eq!(result, 0.0);
    }
}
