//! Mode-gated wrapper around the external session recorder.
//!
//! Call sites read as unconditional lifecycle calls; the controller absorbs
//! the playback-mode conditional so no caller has to branch on it.

use tracing::warn;

/// Whether session recording is active for the run. Configured externally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    #[default]
    Disabled,
    Record,
}

/// Contract of the external session recorder.
#[cfg_attr(test, mockall::automock)]
pub trait SessionRecorder: Send {
    /// Prepares the recorder for the given trial.
    fn initialize(&mut self, trial: u32);

    /// Starts recording. Returns false if the recorder refuses.
    fn record(&mut self) -> bool;

    /// Stops recording. Returns false if the recorder refuses.
    fn stop(&mut self) -> bool;

    /// Whether the recorder has been initialized.
    fn is_initialized(&self) -> bool;

    /// Whether the recorder is idle, i.e. not actively recording.
    fn is_waiting(&self) -> bool;
}

/// Wraps the recorder behind the playback mode. A no-op pass-through when
/// the mode is [`PlaybackMode::Disabled`].
pub struct PlaybackController {
    mode: PlaybackMode,
    recorder: Box<dyn SessionRecorder>,
}

impl PlaybackController {
    pub fn new(mode: PlaybackMode, recorder: Box<dyn SessionRecorder>) -> Self {
        Self { mode, recorder }
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    /// Forwards to the recorder when recording is enabled.
    pub fn initialize(&mut self, trial: u32) {
        if self.mode == PlaybackMode::Record {
            self.recorder.initialize(trial);
        }
    }

    /// Attempts to start recording; a refusal is logged, not propagated.
    pub fn start(&mut self) {
        if self.mode == PlaybackMode::Record && !self.recorder.record() {
            warn!("Cannot start the session recording");
        }
    }

    /// Attempts to stop recording; a refusal is logged, not propagated.
    pub fn stop(&mut self) {
        if self.mode == PlaybackMode::Record && !self.recorder.stop() {
            warn!("Cannot stop the session recording");
        }
    }

    /// True unconditionally unless recording, in which case the recorder's
    /// initialized flag decides.
    pub fn is_initialized(&self) -> bool {
        self.mode != PlaybackMode::Record || self.recorder.is_initialized()
    }

    /// True unconditionally unless recording, in which case true iff the
    /// recorder is idle again.
    pub fn is_finished(&self) -> bool {
        self.mode != PlaybackMode::Record || self.recorder.is_waiting()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_mode_never_touches_the_recorder() {
        // No expectations configured: any call into the recorder would panic.
        let recorder = MockSessionRecorder::new();
        let mut playback = PlaybackController::new(PlaybackMode::Disabled, Box::new(recorder));

        playback.initialize(1);
        playback.start();
        playback.stop();
        assert!(playback.is_initialized());
        assert!(playback.is_finished());
    }

    #[test]
    fn record_mode_forwards_the_lifecycle() {
        let mut recorder = MockSessionRecorder::new();
        recorder
            .expect_initialize()
            .withf(|trial| *trial == 7)
            .times(1)
            .return_const(());
        recorder.expect_record().times(1).return_const(true);
        recorder.expect_stop().times(1).return_const(true);

        let mut playback = PlaybackController::new(PlaybackMode::Record, Box::new(recorder));
        playback.initialize(7);
        playback.start();
        playback.stop();
    }

    #[test]
    fn record_mode_delegates_the_state_queries() {
        let mut recorder = MockSessionRecorder::new();
        recorder.expect_is_initialized().return_const(false);
        recorder.expect_is_waiting().return_const(false);

        let playback = PlaybackController::new(PlaybackMode::Record, Box::new(recorder));
        assert!(!playback.is_initialized());
        assert!(!playback.is_finished());
    }

    #[test]
    fn recorder_refusal_is_absorbed() {
        let mut recorder = MockSessionRecorder::new();
        recorder.expect_record().times(1).return_const(false);
        recorder.expect_stop().times(1).return_const(false);

        let mut playback = PlaybackController::new(PlaybackMode::Record, Box::new(recorder));
        // Refusals are logged as warnings and must not propagate.
        playback.start();
        playback.stop();
    }
}
