//! Macro playback scheduler.
//!
//! `MacroPlayer` runs a parsed step list as a tokio task.  Progress is
//! published through a `watch` channel so a UI (or the CLI) can render
//! "step 3 of 7" without polling the player.
//!
//! Every suspension (sleep, wait-for-text poll, inter-step delay) races
//! the timer against a cancellation channel, so `stop()` takes effect at
//! the next suspension point instead of after the timer runs out.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::sink::MacroSink;
use super::step::MacroStep;

/// Status message after a playback ran to the end.
pub const STATUS_COMPLETED: &str = "Completed";

/// Status message after `stop()`.
pub const STATUS_STOPPED: &str = "Stopped";

/// Timing knobs for playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackConfig {
    /// Pause after every step so sinks can process input.
    pub inter_step_delay: Duration,
    /// How often `WaitFor` re-reads the sinks.
    pub wait_poll_interval: Duration,
    /// Initial delay for run-on-connect playback.
    pub connect_delay: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            inter_step_delay: Duration::from_millis(50),
            wait_poll_interval: Duration::from_millis(500),
            connect_delay: Duration::from_secs(1),
        }
    }
}

/// Progress of the current (or last) playback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackState {
    pub is_playing: bool,
    /// 1-based index of the step being executed.
    pub current_step_index: usize,
    pub total_steps: usize,
    pub status_message: Option<String>,
    pub cancelled: bool,
}

/// Plays one macro at a time against a set of sinks.
pub struct MacroPlayer {
    config: PlaybackConfig,
    state_tx: Arc<watch::Sender<PlaybackState>>,
    cancel_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl MacroPlayer {
    pub fn new(config: PlaybackConfig) -> Self {
        let (state_tx, _) = watch::channel(PlaybackState::default());
        Self {
            config,
            state_tx: Arc::new(state_tx),
            cancel_tx: None,
            task: None,
        }
    }

    /// Start playing `steps` against every sink in `sinks`.
    ///
    /// Returns `false` without doing anything if a playback is already
    /// running.  Must be called from within a tokio runtime.
    pub fn play(&mut self, steps: Vec<MacroStep>, sinks: Vec<Arc<dyn MacroSink>>) -> bool {
        self.start(steps, sinks, Duration::ZERO)
    }

    /// Run-on-connect variant: wait `connect_delay`, then play against a
    /// single freshly connected session.  The delay is cancellable.
    pub fn play_on_connect(&mut self, steps: Vec<MacroStep>, sink: Arc<dyn MacroSink>) -> bool {
        let delay = self.config.connect_delay;
        self.start(steps, vec![sink], delay)
    }

    /// Cancel the running playback.
    ///
    /// Sets the cancellation flag, aborts the task and marks the state as
    /// stopped.  No-op when nothing is playing.
    pub fn stop(&mut self) {
        if let Some(cancel) = &self.cancel_tx {
            cancel.send_replace(true);
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }

        let stopped = self.state_tx.send_if_modified(|s| {
            if !s.is_playing {
                return false;
            }
            mark_stopped(s);
            true
        });
        if stopped {
            info!("macro playback stopped");
        }
    }

    /// Wait until the current playback finishes or is stopped.
    pub async fn wait(&mut self) {
        if let Some(task) = self.task.take() {
            // A JoinError here only means the task was aborted by `stop`.
            let _ = task.await;
        }
    }

    /// Returns `true` while a playback is running.
    pub fn is_playing(&self) -> bool {
        self.state_tx.borrow().is_playing
    }

    /// Snapshot of the playback state.
    pub fn state(&self) -> PlaybackState {
        self.state_tx.borrow().clone()
    }

    /// Subscribe to progress updates.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state_tx.subscribe()
    }

    fn start(
        &mut self,
        steps: Vec<MacroStep>,
        sinks: Vec<Arc<dyn MacroSink>>,
        initial_delay: Duration,
    ) -> bool {
        if self.is_playing() {
            debug!("macro playback already running; ignoring play request");
            return false;
        }

        let total_steps = steps.len();
        let waiting = !initial_delay.is_zero();
        self.state_tx.send_replace(PlaybackState {
            is_playing: true,
            current_step_index: 0,
            total_steps,
            status_message: Some(if waiting {
                "Waiting for connection".to_string()
            } else {
                "Playing".to_string()
            }),
            cancelled: false,
        });

        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.cancel_tx = Some(cancel_tx);

        info!(total_steps, sinks = sinks.len(), "macro playback started");

        let run = Playback {
            steps,
            sinks,
            config: self.config,
            state: Arc::clone(&self.state_tx),
            cancel: cancel_rx,
        };
        self.task = Some(tokio::spawn(run.run(initial_delay)));
        true
    }
}

impl Default for MacroPlayer {
    fn default() -> Self {
        Self::new(PlaybackConfig::default())
    }
}

impl Drop for MacroPlayer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn mark_stopped(state: &mut PlaybackState) {
    state.is_playing = false;
    state.cancelled = true;
    state.status_message = Some(STATUS_STOPPED.to_string());
}

enum WaitOutcome {
    Found,
    TimedOut,
    Cancelled,
}

/// Everything the spawned task owns.
struct Playback {
    steps: Vec<MacroStep>,
    sinks: Vec<Arc<dyn MacroSink>>,
    config: PlaybackConfig,
    state: Arc<watch::Sender<PlaybackState>>,
    cancel: watch::Receiver<bool>,
}

/// Marks the playback stopped if the task ends without reaching a
/// terminal state, e.g. because a sink panicked.
struct ExitGuard {
    state: Arc<watch::Sender<PlaybackState>>,
    cancel: watch::Receiver<bool>,
    armed: bool,
}

impl ExitGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        // A cancelled run was already finished by `stop()`, and the shared
        // state may belong to a newer playback by now.
        if !self.armed || *self.cancel.borrow() {
            return;
        }
        let changed = self.state.send_if_modified(|s| {
            if !s.is_playing {
                return false;
            }
            mark_stopped(s);
            true
        });
        if changed {
            warn!("macro playback ended unexpectedly");
        }
    }
}

impl Playback {
    async fn run(self, initial_delay: Duration) {
        let guard = ExitGuard {
            state: Arc::clone(&self.state),
            cancel: self.cancel.clone(),
            armed: true,
        };
        self.play_steps(initial_delay).await;
        guard.disarm();
    }

    async fn play_steps(mut self, initial_delay: Duration) {
        if !initial_delay.is_zero() && !self.pause(initial_delay).await {
            self.finish_cancelled();
            return;
        }

        let total = self.steps.len();
        let steps = std::mem::take(&mut self.steps);

        for (index, step) in steps.iter().enumerate() {
            if self.is_cancelled() {
                self.finish_cancelled();
                return;
            }

            let number = index + 1;
            self.update(|s| {
                s.current_step_index = number;
                s.total_steps = total;
                s.status_message = Some(format!("Step {number} of {total}"));
            });
            debug!(step = number, total, "macro step: {step}");

            match step {
                MacroStep::Sleep(secs) => {
                    if !self.pause(seconds(*secs)).await {
                        self.finish_cancelled();
                        return;
                    }
                }
                MacroStep::WaitFor { text, timeout_secs } => {
                    self.update(|s| s.status_message = Some(format!("Waiting for '{text}'")));
                    match self.wait_for_text(text, seconds(*timeout_secs)).await {
                        WaitOutcome::Found => debug!(text = %text, "wait-for text found"),
                        WaitOutcome::TimedOut => {
                            warn!(text = %text, timeout_secs, "timed out waiting for text; continuing");
                            self.update(|s| {
                                s.status_message = Some(format!("Timed out waiting for '{text}'"));
                            });
                        }
                        WaitOutcome::Cancelled => {
                            self.finish_cancelled();
                            return;
                        }
                    }
                }
                _ => {
                    let bytes = step.to_bytes();
                    if !bytes.is_empty() {
                        for sink in &self.sinks {
                            sink.send_bytes(&bytes);
                        }
                    }
                }
            }

            if !self.pause(self.config.inter_step_delay).await {
                self.finish_cancelled();
                return;
            }
        }

        self.update(|s| {
            s.is_playing = false;
            s.status_message = Some(STATUS_COMPLETED.to_string());
        });
        info!(total, "macro playback completed");
    }

    /// Poll the sinks until one shows `text`, the timeout passes, or the
    /// playback is cancelled.
    async fn wait_for_text(&mut self, text: &str, timeout: Duration) -> WaitOutcome {
        let now = Instant::now();
        let deadline = now.checked_add(timeout).unwrap_or_else(|| far_future(now));
        loop {
            if self.is_cancelled() {
                return WaitOutcome::Cancelled;
            }
            let found = self.sinks.iter().any(|sink| {
                sink.current_visible_text()
                    .is_some_and(|visible| visible.contains(text))
            });
            if found {
                return WaitOutcome::Found;
            }

            let now = Instant::now();
            if now >= deadline {
                return WaitOutcome::TimedOut;
            }
            let tick = self.config.wait_poll_interval.min(deadline - now);
            if !self.pause(tick).await {
                return WaitOutcome::Cancelled;
            }
        }
    }

    /// Sleep for `duration` unless cancelled first.
    ///
    /// Returns `true` if the full duration elapsed without cancellation.
    async fn pause(&mut self, duration: Duration) -> bool {
        if self.is_cancelled() {
            return false;
        }
        let elapsed = tokio::select! {
            () = tokio::time::sleep(duration) => true,
            // Err means the player was dropped, which also ends playback.
            _ = self.cancel.wait_for(|cancelled| *cancelled) => false,
        };
        elapsed && !self.is_cancelled()
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Apply `f` unless this playback was cancelled or already finished.
    ///
    /// The check happens under the state lock, so a task that lost the
    /// race with `stop()` (or with a newer playback) cannot overwrite it.
    fn update(&self, f: impl FnOnce(&mut PlaybackState)) {
        let cancel = &self.cancel;
        self.state.send_if_modified(|s| {
            if *cancel.borrow() || !s.is_playing {
                return false;
            }
            f(s);
            true
        });
    }

    fn finish_cancelled(&self) {
        let changed = self.state.send_if_modified(|s| {
            if !s.is_playing || s.cancelled {
                return false;
            }
            mark_stopped(s);
            true
        });
        if changed {
            info!("macro playback cancelled");
        }
    }
}

/// Seconds as a `Duration`.  Negative values and NaN become zero; values
/// too large to represent saturate.
fn seconds(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

/// Roughly 30 years from `now`, the same horizon tokio uses for timers.
fn far_future(now: Instant) -> Instant {
    now + Duration::from_secs(86_400 * 365 * 30)
}
