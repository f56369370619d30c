//! Session bootstrap: ties the loaders and controllers together for one
//! trial and enforces the startup invariants.

use crate::connection::{Connection, ConnectionMonitor};
use crate::playback::{PlaybackController, PlaybackMode, SessionRecorder};
use crate::speech::{SpeechProcess, SpeechQueue};
use crate::task::{TaskError, TaskImage, TaskInfo, TaskLoader};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// Errors that abort session bootstrap. All are unrecoverable: the trial
/// cannot proceed without a valid configuration.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("There is a name conflict of graspable objects. name={0}")]
    DuplicateName(String),
    #[error("The item with that name does not exist. targetName={0}")]
    UnknownTarget(String),
    #[error(transparent)]
    Task(#[from] TaskError),
}

/// Monotonic per-run trial counter.
///
/// Threaded explicitly through bootstrap rather than hidden in a global;
/// it persists across trials within a run and resets only when the host
/// reloads its configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrialCounter(u32);

impl TrialCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances to the next trial and returns its number. The first trial
    /// is number 1.
    pub fn next(&mut self) -> u32 {
        self.0 += 1;
        self.0
    }

    pub fn current(&self) -> u32 {
        self.0
    }
}

/// Everything the host supplies to bootstrap one trial.
pub struct SessionContext {
    pub loader: TaskLoader,
    /// Candidate graspable-object names discovered by the host scene.
    pub graspables: Vec<String>,
    /// External links discovered by the host; fixed for the session.
    pub connections: Vec<Arc<dyn Connection>>,
    pub recorder: Box<dyn SessionRecorder>,
    pub playback_mode: PlaybackMode,
    pub speech_process: Box<dyn SpeechProcess>,
    /// Whether the synthesizer executable was found at startup.
    pub speech_available: bool,
}

/// The moderator core of one trial, produced by [`Moderator::bootstrap`].
pub struct Moderator {
    trial: u32,
    task_info: TaskInfo,
    task_image: Option<TaskImage>,
    target: String,
    graspables: Vec<String>,
    speech: SpeechQueue,
    connections: ConnectionMonitor,
    playback: PlaybackController,
}

impl Moderator {
    /// Bootstraps one trial: increments the trial counter, checks the
    /// candidate names for conflicts, loads the task definition and resolves
    /// its target, then assembles the sub-controllers.
    pub fn bootstrap(
        context: SessionContext,
        counter: &mut TrialCounter,
    ) -> Result<Self, SessionError> {
        let trial = counter.next();

        // Names are used as a lookup key elsewhere and must be unique.
        let mut seen = HashSet::new();
        for name in &context.graspables {
            if !seen.insert(name.as_str()) {
                return Err(SessionError::DuplicateName(name.clone()));
            }
        }
        info!(count = context.graspables.len(), "Count of graspables");

        let (task_info, task_image) = context.loader.load(trial)?;

        let target = context
            .graspables
            .iter()
            .find(|name| **name == task_info.target_name)
            .cloned()
            .ok_or_else(|| SessionError::UnknownTarget(task_info.target_name.clone()))?;

        let connections = ConnectionMonitor::new(context.connections);
        info!(count = connections.len(), "Connections established");

        let speech = SpeechQueue::new(context.speech_process, context.speech_available);
        let playback = PlaybackController::new(context.playback_mode, context.recorder);

        Ok(Self {
            trial,
            task_info,
            task_image,
            target,
            graspables: context.graspables,
            speech,
            connections,
            playback,
        })
    }

    pub fn trial(&self) -> u32 {
        self.trial
    }

    pub fn task_info(&self) -> &TaskInfo {
        &self.task_info
    }

    pub fn task_image(&self) -> Option<&TaskImage> {
        self.task_image.as_ref()
    }

    /// The resolved target object name.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn graspables(&self) -> &[String] {
        &self.graspables
    }

    pub fn speech(&mut self) -> &mut SpeechQueue {
        &mut self.speech
    }

    pub fn connections(&self) -> &ConnectionMonitor {
        &self.connections
    }

    pub fn playback(&mut self) -> &mut PlaybackController {
        &mut self.playback
    }

    /// Initializes the recorder for this trial; a no-op when playback is
    /// disabled.
    pub fn initialize_playback(&mut self) {
        let trial = self.trial;
        self.playback.initialize(trial);
    }
}
