//! File-backed session recorder.
//!
//! Records one JSON-lines file per trial under the record directory. The
//! recorder walks an `Idle → Initialized → Recording → Waiting` state
//! machine; out-of-order lifecycle calls are refused (returning false), not
//! errors, because the playback controller absorbs refusals.

use chrono::Local;
use ics_core::playback::SessionRecorder;
use serde_json::json;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecorderState {
    Idle,
    Initialized,
    Recording,
    Waiting,
}

pub struct FileRecorder {
    record_dir: PathBuf,
    writer: Option<BufWriter<File>>,
    state: RecorderState,
    trial: u32,
}

impl FileRecorder {
    pub fn new(record_dir: impl Into<PathBuf>) -> Self {
        Self {
            record_dir: record_dir.into(),
            writer: None,
            state: RecorderState::Idle,
            trial: 0,
        }
    }

    /// Path of the recording for the given trial.
    pub fn recording_path(&self, trial: u32) -> PathBuf {
        self.record_dir.join(format!("trial{trial:02}.jsonl"))
    }

    fn write_event(&mut self, event: &str) -> bool {
        let trial = self.trial;
        let Some(writer) = self.writer.as_mut() else {
            return false;
        };
        let line = json!({
            "time": Local::now().to_rfc3339(),
            "trial": trial,
            "event": event,
        });
        match writeln!(writer, "{line}").and_then(|_| writer.flush()) {
            Ok(()) => true,
            Err(err) => {
                error!(error = %err, "Failed to write a recorder event");
                false
            }
        }
    }
}

impl SessionRecorder for FileRecorder {
    fn initialize(&mut self, trial: u32) {
        self.trial = trial;
        let path = self.recording_path(trial);

        let file = std::fs::create_dir_all(&self.record_dir).and_then(|_| File::create(&path));
        match file {
            Ok(file) => {
                self.writer = Some(BufWriter::new(file));
                self.state = RecorderState::Initialized;
                info!(path = %path.display(), "Session recorder initialized");
            }
            Err(err) => {
                error!(path = %path.display(), error = %err, "Could not initialize the session recorder");
                self.writer = None;
                self.state = RecorderState::Idle;
            }
        }
    }

    fn record(&mut self) -> bool {
        if self.state != RecorderState::Initialized || !self.write_event("start") {
            return false;
        }
        self.state = RecorderState::Recording;
        true
    }

    fn stop(&mut self) -> bool {
        if self.state != RecorderState::Recording || !self.write_event("stop") {
            return false;
        }
        self.state = RecorderState::Waiting;
        true
    }

    fn is_initialized(&self) -> bool {
        self.state != RecorderState::Idle
    }

    fn is_waiting(&self) -> bool {
        self.state != RecorderState::Recording
    }
}
