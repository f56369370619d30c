//! Speech queue controller.
//!
//! Owns an ordered queue of pending utterances and a single external
//! text-to-speech process slot. Utterances are started strictly in FIFO
//! order, at most one is ever in flight, and cancellable utterances are
//! terminated (or silently dropped) once the task-finished signal arrives.
//! All process-control failures are logged and absorbed; a degraded speech
//! side channel must never stop the trial.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use tracing::{info, warn};

/// Longest message accepted by the synthesizer; longer text is truncated.
pub const MAX_MESSAGE_LENGTH: usize = 1000;
/// Language code passed to the synthesizer (English, `en-US`).
pub const SPEECH_LANGUAGE: &str = "409";

/// Which configured voice speaks an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Voice {
    /// The moderator's voice.
    Moderator,
    /// The robot's voice, used when replaying the robot's side of a dialog.
    Robot,
}

impl Voice {
    /// The `Gender=` parameter value the synthesizer expects for this voice.
    pub fn gender(self) -> &'static str {
        match self {
            Voice::Moderator => "Male",
            Voice::Robot => "Female",
        }
    }
}

/// One queued unit of speech output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechInfo {
    pub message: String,
    pub voice: Voice,
    pub can_cancel: bool,
}

/// Control surface over the external synthesizer process.
///
/// The production implementation drives a real OS process; tests substitute
/// a mock so nothing is spawned. The queue is the exclusive owner of the
/// handle: no other component may start or stop it.
#[cfg_attr(test, mockall::automock)]
pub trait SpeechProcess: Send {
    /// Starts the synthesizer with the message and parameter strings.
    fn spawn(&mut self, message: &str, params: &str) -> anyhow::Result<()>;

    /// Requests termination of the running process, best effort.
    fn terminate(&mut self) -> anyhow::Result<()>;

    /// True when no synthesizer process is running, including before the
    /// first spawn.
    fn has_exited(&mut self) -> bool;
}

/// [`SpeechProcess`] backed by the external synthesizer executable.
pub struct TtsProcess {
    exe: PathBuf,
    child: Option<Child>,
}

impl TtsProcess {
    pub fn new(exe: impl Into<PathBuf>) -> Self {
        Self {
            exe: exe.into(),
            child: None,
        }
    }

    /// Whether the synthesizer executable is present on disk. Checked once at
    /// startup; absence silently disables all speech operations.
    pub fn is_available(&self) -> bool {
        self.exe.is_file()
    }
}

impl SpeechProcess for TtsProcess {
    fn spawn(&mut self, message: &str, params: &str) -> anyhow::Result<()> {
        let child = Command::new(&self.exe)
            .arg(message)
            .arg(params)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        self.child = Some(child);
        Ok(())
    }

    fn terminate(&mut self) -> anyhow::Result<()> {
        if let Some(child) = self.child.as_mut() {
            child.kill()?;
        }
        Ok(())
    }

    fn has_exited(&mut self) -> bool {
        match self.child.as_mut() {
            None => true,
            Some(child) => !matches!(child.try_wait(), Ok(None)),
        }
    }
}

/// FIFO queue of utterances bound to a single synthesizer process slot.
///
/// Driven by the host scheduler through [`SpeechQueue::tick`]; the queue
/// never blocks on process teardown.
pub struct SpeechQueue {
    process: Box<dyn SpeechProcess>,
    enabled: bool,
    queue: VecDeque<SpeechInfo>,
    /// The utterance currently bound to the process slot, if any. Stays set
    /// after the process exits until the next utterance replaces it.
    active: Option<SpeechInfo>,
}

impl SpeechQueue {
    /// Creates the queue. When `enabled` is false (the synthesizer executable
    /// was not found at startup) every operation is a silent no-op.
    pub fn new(process: Box<dyn SpeechProcess>, enabled: bool) -> Self {
        Self {
            process,
            enabled,
            queue: VecDeque::new(),
            active: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of utterances waiting behind the active slot.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Appends an utterance, truncating it to [`MAX_MESSAGE_LENGTH`]
    /// characters.
    pub fn enqueue(&mut self, message: &str, voice: Voice, can_cancel: bool) {
        if !self.enabled {
            return;
        }

        let mut message = message.to_owned();
        if message.chars().count() > MAX_MESSAGE_LENGTH {
            message = message.chars().take(MAX_MESSAGE_LENGTH).collect();
            warn!(
                limit = MAX_MESSAGE_LENGTH,
                "Length of message is over the limit, truncated"
            );
        }

        self.queue.push_back(SpeechInfo {
            message,
            voice,
            can_cancel,
        });
    }

    /// Queues an utterance on the moderator's voice.
    pub fn enqueue_moderator(&mut self, message: &str, can_cancel: bool) {
        self.enqueue(message, Voice::Moderator, can_cancel);
    }

    /// Queues an utterance on the robot's voice.
    pub fn enqueue_robot(&mut self, message: &str, can_cancel: bool) {
        self.enqueue(message, Voice::Robot, can_cancel);
    }

    /// Queues the fixed failure announcement on the moderator's voice.
    pub fn enqueue_moderator_failed(&mut self, can_cancel: bool) {
        self.enqueue("That's too bad", Voice::Moderator, can_cancel);
    }

    /// Advances the queue by one step. Invoked at a steady cadence by the
    /// host scheduler.
    ///
    /// When `is_task_finished` is set, a cancellable active utterance is
    /// terminated and cancellable utterances reaching the head of the queue
    /// are dropped without being spoken.
    pub fn tick(&mut self, is_task_finished: bool) {
        if !self.enabled {
            return;
        }

        // Cancel the current speech if the task finished and it allows it.
        if is_task_finished
            && self.active.as_ref().is_some_and(|active| active.can_cancel)
            && !self.process.has_exited()
        {
            if let Err(error) = self.process.terminate() {
                warn!(%error, "Couldn't terminate the speech process, but do nothing");
            }
        }

        if self.queue.is_empty() {
            return;
        }

        // The current speech is not over yet; no preemption.
        if self.active.is_some() && !self.process.has_exited() {
            return;
        }

        let Some(speech) = self.queue.pop_front() else {
            return;
        };

        // Cancellable utterances are never started after task completion.
        // Drop, don't requeue.
        if is_task_finished && speech.can_cancel {
            return;
        }

        let message = speech.message.replace('_', " ");
        let params = format!(
            "Language={}; Gender={}",
            SPEECH_LANGUAGE,
            speech.voice.gender()
        );

        // The slot counts as taken even if the spawn fails, so a broken
        // synthesizer does not turn into a tight retry loop.
        self.active = Some(speech);

        match self.process.spawn(&message, &params) {
            Ok(()) => info!(%message, "Spoke"),
            Err(error) => warn!(%message, %error, "Could not speak"),
        }
    }

    /// Clears every pending utterance and terminates the active process.
    pub fn stop_forcefully(&mut self) {
        if !self.enabled {
            return;
        }

        self.queue.clear();

        if !self.process.has_exited() {
            match self.process.terminate() {
                Ok(()) => warn!("Terminated the speech process"),
                Err(error) => {
                    warn!(%error, "Couldn't terminate the speech process, but do nothing");
                }
            }
        }
    }

    /// True while utterances are pending or the active one is still running.
    pub fn is_speaking(&mut self) -> bool {
        !self.queue.is_empty() || (self.active.is_some() && !self.process.has_exited())
    }
}
