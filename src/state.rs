//! Host-side view of a run.
//!
//! [`RunState`] folds the engine's event stream into the full display state a
//! presentation layer needs: current phase and status line, live speed,
//! bounded sample history, accumulated results and the current error marker.
//! It performs no I/O and carries no rendering dependencies.

use crate::history::SampleHistory;
use crate::model::{Phase, RunResult, TestEvent};
use crate::params;

/// Accumulated presentation state for one run.
#[derive(Debug, Clone)]
pub struct RunState {
    phase: Phase,
    status: &'static str,
    current_mbps: f64,
    history: SampleHistory,
    result: RunResult,
    error: Option<String>,
}

impl RunState {
    /// Fresh state in the `Ready` phase.
    pub fn new() -> Self {
        RunState {
            phase: Phase::Ready,
            status: Phase::Ready.status(),
            current_mbps: 0.0,
            history: SampleHistory::new(params::HISTORY_CAPACITY),
            result: RunResult::new(),
            error: None,
        }
    }

    /// Fold one event into the state.
    ///
    /// Call [`RunState::reset`] before feeding a new run's events; events
    /// within a run arrive in order over the run's channel.
    pub fn apply(&mut self, event: &TestEvent) {
        match event {
            TestEvent::PhaseChanged { phase, status } => {
                self.phase = *phase;
                self.status = status;
                match phase {
                    // sample history is phase-scoped
                    Phase::Download | Phase::Upload => {
                        self.history.clear();
                        self.current_mbps = 0.0;
                    }
                    Phase::Latency => self.error = None,
                    _ => {}
                }
            }
            TestEvent::Latency { stats } => {
                self.result.ping_ms = stats.mean_ms;
                self.result.jitter_ms = stats.jitter_ms;
            }
            TestEvent::Sample { sample, .. } => {
                self.current_mbps = sample.mbps;
                self.history.push(*sample);
            }
            TestEvent::PhaseThroughput { phase, mbps } => match phase {
                Phase::Download => self.result.download_mbps = *mbps,
                Phase::Upload => self.result.upload_mbps = *mbps,
                _ => {}
            },
            TestEvent::PhaseFailed { message, .. } => {
                // a later phase's failure replaces an earlier one
                self.error = Some(message.clone());
            }
            TestEvent::Complete { result } => {
                self.result = *result;
                // the gauge shows total capacity once the run is done
                self.current_mbps = result.download_mbps + result.upload_mbps;
            }
        }
    }

    /// Return to `Ready` with zeroed results, an empty history and no error.
    ///
    /// Cancelling the in-flight run (dropping its handle) is the caller's
    /// responsibility; a cancelled run's channel is gone, so its late events
    /// can never reach a reset state.
    pub fn reset(&mut self) {
        self.phase = Phase::Ready;
        self.status = Phase::Ready.status();
        self.current_mbps = 0.0;
        self.history.clear();
        self.result = RunResult::new();
        self.error = None;
    }

    /// Currently active phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Status line for the active phase.
    pub fn status(&self) -> &'static str {
        self.status
    }

    /// Latest smoothed live speed in Mbit/s.
    pub fn current_mbps(&self) -> f64 {
        self.current_mbps
    }

    /// Bounded sample history for charting, oldest first.
    pub fn history(&self) -> &SampleHistory {
        &self.history
    }

    /// Results accumulated so far; fully populated once `Complete`.
    pub fn result(&self) -> &RunResult {
        &self.result
    }

    /// Current user-visible error marker, if any phase failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl Default for RunState {
    fn default() -> Self {
        RunState::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LatencyStats, ThroughputSample};

    fn sample(sequence: u64, mbps: f64) -> TestEvent {
        TestEvent::Sample {
            phase: Phase::Download,
            sample: ThroughputSample { sequence, mbps },
        }
    }

    fn entered(phase: Phase) -> TestEvent {
        TestEvent::PhaseChanged {
            phase,
            status: phase.status(),
        }
    }

    #[test]
    fn full_run_populates_every_field() {
        let mut state = RunState::new();
        let events = [
            entered(Phase::Latency),
            TestEvent::Latency {
                stats: LatencyStats {
                    mean_ms: 23,
                    jitter_ms: 4,
                },
            },
            entered(Phase::Download),
            sample(0, 80.0),
            TestEvent::PhaseThroughput {
                phase: Phase::Download,
                mbps: 87.5,
            },
            entered(Phase::Upload),
            TestEvent::PhaseThroughput {
                phase: Phase::Upload,
                mbps: 12.5,
            },
            entered(Phase::Complete),
            TestEvent::Complete {
                result: RunResult {
                    download_mbps: 87.5,
                    upload_mbps: 12.5,
                    ping_ms: 23,
                    jitter_ms: 4,
                    timestamp_ms: 1,
                },
            },
        ];
        for event in &events {
            state.apply(event);
        }

        assert_eq!(state.phase(), Phase::Complete);
        assert_eq!(state.result().download_mbps, 87.5);
        assert_eq!(state.result().upload_mbps, 12.5);
        assert_eq!(state.result().ping_ms, 23);
        assert_eq!(state.result().jitter_ms, 4);
        // gauge shows total capacity at completion
        assert_eq!(state.current_mbps(), 100.0);
        assert!(state.error().is_none());
    }

    #[test]
    fn reset_is_idempotent_from_any_state() {
        let mut state = RunState::new();
        state.apply(&entered(Phase::Download));
        state.apply(&sample(0, 120.0));
        state.apply(&TestEvent::PhaseFailed {
            phase: Phase::Download,
            message: "Downlink Aborted".into(),
        });

        for _ in 0..2 {
            state.reset();
            assert_eq!(state.phase(), Phase::Ready);
            assert_eq!(state.status(), Phase::Ready.status());
            assert_eq!(state.current_mbps(), 0.0);
            assert_eq!(state.result().download_mbps, 0.0);
            assert_eq!(state.result().upload_mbps, 0.0);
            assert_eq!(state.result().ping_ms, 0);
            assert_eq!(state.result().jitter_ms, 0);
            assert!(state.history().is_empty());
            assert!(state.error().is_none());
        }
    }

    #[test]
    fn entering_a_throughput_phase_clears_the_history() {
        let mut state = RunState::new();
        state.apply(&entered(Phase::Download));
        state.apply(&sample(0, 50.0));
        state.apply(&sample(1, 60.0));
        assert_eq!(state.history().len(), 2);

        state.apply(&entered(Phase::Upload));
        assert!(state.history().is_empty());
        assert_eq!(state.current_mbps(), 0.0);
    }

    #[test]
    fn history_respects_capacity() {
        let mut state = RunState::new();
        state.apply(&entered(Phase::Download));
        for i in 0..(params::HISTORY_CAPACITY as u64 + 10) {
            state.apply(&sample(i, 10.0));
        }
        assert_eq!(state.history().len(), params::HISTORY_CAPACITY);
        let first = state.history().iter().next().unwrap().sequence;
        assert_eq!(first, 10);
    }

    #[test]
    fn last_failure_wins_and_restart_clears_it() {
        let mut state = RunState::new();
        state.apply(&TestEvent::PhaseFailed {
            phase: Phase::Download,
            message: "Downlink Aborted".into(),
        });
        state.apply(&TestEvent::PhaseFailed {
            phase: Phase::Upload,
            message: "Uplink Failure".into(),
        });
        assert_eq!(state.error(), Some("Uplink Failure"));

        state.apply(&entered(Phase::Latency));
        assert!(state.error().is_none());
    }
}
