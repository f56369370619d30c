//! ICS Moderator Service Library
//!
//! This library wires the orchestration core to real collaborators: the
//! external text-to-speech executable, rosbridge-style websocket links, and
//! a file-backed session recorder. The `bin/moderator.rs` binary is a thin
//! wrapper around this library.

pub mod config;
pub mod links;
pub mod recorder;
pub mod runner;
