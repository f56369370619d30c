//! Moderator-side orchestration core for an interactive-customer-service
//! simulation trial.
//!
//! This crate owns the coordination logic of one trial: loading the per-trial
//! task definition, driving a queued external text-to-speech process,
//! aggregating the health of the external links, and gating the session
//! recorder behind the playback mode. Everything engine-specific (scene
//! lookup, texture upload, physics) lives in the host and reaches this crate
//! only through the trait seams in [`speech`], [`connection`] and
//! [`playback`].

pub mod connection;
pub mod playback;
pub mod session;
pub mod speech;
pub mod task;

pub use session::{Moderator, SessionContext, SessionError, TrialCounter};
pub use task::{TaskImage, TaskInfo, TaskLoader};
