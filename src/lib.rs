//! An HTTP speed test engine.
//!
//! Estimates a client's download bandwidth, upload bandwidth, round-trip
//! latency and latency jitter using nothing but transfers to ordinary public
//! HTTP endpoints — no dedicated measurement server or protocol. A run walks
//! latency probing, a capped streaming download and a capped upload in
//! sequence, publishing live throughput samples and per-phase results for a
//! host UI to render. Failed phases degrade to zero-valued results; a run
//! that starts always completes.
//!
//! # Quick start
//!
//! ```no_run
//! use speedprobe::engine::{Config, SpeedTest};
//! use speedprobe::state::RunState;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = SpeedTest::new(Config::default())?;
//! let mut state = RunState::new();
//!
//! let mut run = engine.start();
//! while let Some(event) = run.recv().await {
//!     state.apply(&event);
//!     println!("{}: {:.1} Mbit/s", state.status(), state.current_mbps());
//! }
//! println!("{:?}", state.result());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod download;
pub mod emitter;
pub mod engine;
pub mod error;
pub mod history;
pub mod latency;
pub mod model;
pub mod params;
pub mod sampler;
pub mod state;
pub mod upload;
