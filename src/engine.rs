//! Run orchestration: sequences the phases of one speed test.
//!
//! A run walks `Latency` → `Download` → `Upload` → `Complete`, one phase at
//! a time. Each phase's failure is caught locally and converted into a
//! zero-valued result plus a [`TestEvent::PhaseFailed`] marker, so a run that
//! starts always reaches `Complete` unless it is cancelled.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::Result;
use crate::model::{Phase, RunResult, TestEvent, epoch_ms};
use crate::{download, latency, params, upload};

/// Endpoints and tuning for a [`SpeedTest`].
///
/// The endpoints are plain HTTP URLs: any stable small-response endpoint for
/// latency, any large streamable payload for download, anything accepting an
/// arbitrary POST body for upload. Only timing is used; response bodies are
/// ignored.
#[derive(Debug, Clone)]
pub struct Config {
    /// Latency probe target.
    pub ping_url: String,
    /// Download source.
    pub download_url: String,
    /// Upload target.
    pub upload_url: String,
    /// Number of latency probes.
    pub ping_samples: usize,
    /// Pause between latency probes.
    pub ping_gap: Duration,
    /// Wall-clock cap on the download phase.
    pub download_cap: Duration,
    /// Minimum interval between download samples.
    pub download_sample_gate: Duration,
    /// Upload payload size in bytes.
    pub upload_payload_bytes: usize,
    /// Wall-clock cap on the upload phase.
    pub upload_timeout: Duration,
    /// Minimum interval between upload samples.
    pub upload_sample_gate: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            ping_url: params::DEFAULT_PING_URL.into(),
            download_url: params::DEFAULT_DOWNLOAD_URL.into(),
            upload_url: params::DEFAULT_UPLOAD_URL.into(),
            ping_samples: params::PING_SAMPLES,
            ping_gap: params::PING_GAP,
            download_cap: params::DOWNLOAD_CAP,
            download_sample_gate: params::DOWNLOAD_SAMPLE_GATE,
            upload_payload_bytes: params::UPLOAD_PAYLOAD_BYTES,
            upload_timeout: params::UPLOAD_TIMEOUT,
            upload_sample_gate: params::UPLOAD_SAMPLE_GATE,
        }
    }
}

/// A reusable speed test engine. Each [`SpeedTest::start`] call launches an
/// independent run.
pub struct SpeedTest {
    client: reqwest::Client,
    config: Config,
}

impl SpeedTest {
    /// Build an engine with the given configuration.
    pub fn new(config: Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(SpeedTest { client, config })
    }

    /// Start a run.
    ///
    /// Phases execute sequentially inside one spawned task and publish
    /// [`TestEvent`]s on the returned handle's channel.
    pub fn start(&self) -> RunHandle {
        let (tx, rx) = mpsc::channel(params::EVENT_CHANNEL_SIZE);
        let client = self.client.clone();
        let config = self.config.clone();
        let task = tokio::spawn(async move {
            run_phases(client, config, tx).await;
        });
        RunHandle { events: rx, task }
    }
}

/// Handle to an in-flight run.
///
/// The channel and task are owned by this run alone: aborting (or dropping)
/// the handle cancels any in-flight transfer by dropping its future, and a
/// superseded run's remaining events land in a closed channel — they can
/// never leak into a newer run's state.
pub struct RunHandle {
    events: mpsc::Receiver<TestEvent>,
    task: JoinHandle<()>,
}

impl RunHandle {
    /// Receive the next event; `None` once the run has finished or was
    /// cancelled.
    pub async fn recv(&mut self) -> Option<TestEvent> {
        self.events.recv().await
    }

    /// Cancel the run, releasing any in-flight transport resource.
    pub fn abort(&self) {
        self.task.abort();
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Append a cache-busting query parameter so repeated runs never measure a
/// cached copy.
fn cache_busted(url: &str) -> Result<url::Url> {
    let mut url = url::Url::parse(url)?;
    url.query_pairs_mut()
        .append_pair("cb", &epoch_ms().to_string());
    Ok(url)
}

async fn enter(tx: &mpsc::Sender<TestEvent>, phase: Phase) {
    debug!(?phase, "entering phase");
    let _ = tx
        .send(TestEvent::PhaseChanged {
            phase,
            status: phase.status(),
        })
        .await;
}

async fn run_phases(client: reqwest::Client, config: Config, tx: mpsc::Sender<TestEvent>) {
    let mut result = RunResult::new();

    enter(&tx, Phase::Latency).await;
    let stats = latency::measure(
        || {
            let client = client.clone();
            let url = config.ping_url.clone();
            async move {
                // only timing matters, any response counts as a round trip
                client
                    .get(cache_busted(&url)?)
                    .header(reqwest::header::CACHE_CONTROL, "no-cache")
                    .send()
                    .await?;
                Ok(())
            }
        },
        config.ping_samples,
        config.ping_gap,
    )
    .await;
    result.ping_ms = stats.mean_ms;
    result.jitter_ms = stats.jitter_ms;
    let _ = tx.send(TestEvent::Latency { stats }).await;

    enter(&tx, Phase::Download).await;
    result.download_mbps = match run_download(&client, &config, &tx).await {
        Ok(mbps) => mbps,
        Err(err) => {
            warn!("download failed: {err}");
            let _ = tx
                .send(TestEvent::PhaseFailed {
                    phase: Phase::Download,
                    message: "Downlink Aborted".into(),
                })
                .await;
            0.0
        }
    };
    let _ = tx
        .send(TestEvent::PhaseThroughput {
            phase: Phase::Download,
            mbps: result.download_mbps,
        })
        .await;

    enter(&tx, Phase::Upload).await;
    result.upload_mbps = match run_upload(&client, &config, &tx).await {
        Ok(mbps) => mbps,
        Err(err) => {
            warn!("upload failed: {err}");
            let _ = tx
                .send(TestEvent::PhaseFailed {
                    phase: Phase::Upload,
                    message: "Uplink Failure".into(),
                })
                .await;
            0.0
        }
    };
    let _ = tx
        .send(TestEvent::PhaseThroughput {
            phase: Phase::Upload,
            mbps: result.upload_mbps,
        })
        .await;

    enter(&tx, Phase::Complete).await;
    let _ = tx.send(TestEvent::Complete { result }).await;
}

async fn run_download(
    client: &reqwest::Client,
    config: &Config,
    tx: &mpsc::Sender<TestEvent>,
) -> Result<f64> {
    let stream = download::open(client, cache_busted(&config.download_url)?).await?;
    let tx = tx.clone();
    download::measure(
        stream,
        config.download_cap,
        config.download_sample_gate,
        // samples are display-only, drop them rather than stall the
        // transfer loop when the consumer lags
        move |sample| {
            let _ = tx.try_send(TestEvent::Sample {
                phase: Phase::Download,
                sample,
            });
        },
    )
    .await
}

async fn run_upload(
    client: &reqwest::Client,
    config: &Config,
    tx: &mpsc::Sender<TestEvent>,
) -> Result<f64> {
    let tx = tx.clone();
    upload::measure(
        client,
        cache_busted(&config.upload_url)?,
        config.upload_payload_bytes,
        config.upload_timeout,
        config.upload_sample_gate,
        move |sample| {
            let _ = tx.try_send(TestEvent::Sample {
                phase: Phase::Upload,
                sample,
            });
        },
    )
    .await
}
